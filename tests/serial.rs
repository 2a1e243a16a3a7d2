#![cfg(target_os = "linux")]

mod common;

use std::io::{Read, Write};
use std::thread;
use std::time::{Duration, Instant};

use common::Pty;
use fieldlink::{
	Endpoint, EndpointConfig, EndpointType, Error, NetAddr, Parity, Rs485Config, SerialConfig, SerialEndpoint, TerminalError,
};

fn open_line(pty: &Pty, read_timeout: Duration) -> SerialEndpoint {
	let mut line = SerialEndpoint::new();
	line.open(&SerialConfig::new(&pty.path).baud_rate(19200).parity(Parity::Even).read_timeout(read_timeout))
		.unwrap();
	line
}

#[test]
fn open_reports_line_state() {
	let pty = Pty::open().unwrap();
	let line = open_line(&pty, Duration::ZERO);
	assert!(line.is_open());
	assert_eq!(line.net_addr(), Some(&NetAddr::Serial(pty.path.clone())));
	assert_eq!(line.read_timeout(), Duration::from_millis(5000));
	assert_eq!(line.write_timeout(), Duration::from_millis(1000));
	assert_eq!(Endpoint::endpoint_type(&line), EndpointType::Serial);
	assert!(Endpoint::sock_addr(&line).is_none());
}

#[test]
fn read_gathers_bursts() {
	let mut pty = Pty::open().unwrap();
	let mut line = open_line(&pty, Duration::from_millis(200));

	let writer = thread::spawn(move || {
		for chunk in [&b"abc"[..], b"def", b"ghi", b"j"] {
			pty.master.write_all(chunk).unwrap();
			thread::sleep(Duration::from_millis(10));
		}
		pty
	});

	let mut buf = [0u8; 10];
	assert_eq!(line.read(&mut buf).unwrap(), 10);
	assert_eq!(&buf, b"abcdefghij");
	writer.join().unwrap();
}

#[test]
fn short_frame_returns_on_timeout() {
	let mut pty = Pty::open().unwrap();
	let mut line = open_line(&pty, Duration::from_millis(5));
	pty.master.write_all(b"\x01\x83\x02").unwrap();
	thread::sleep(Duration::from_millis(20));

	let mut buf = [0u8; 10];
	assert_eq!(line.read(&mut buf).unwrap(), 3);
	assert_eq!(&buf[..3], b"\x01\x83\x02");
}

#[test]
fn silence_is_a_timeout() {
	let pty = Pty::open().unwrap();
	let mut line = open_line(&pty, Duration::from_millis(50));
	let started = Instant::now();
	let mut buf = [0u8; 4];
	let err = line.read(&mut buf).unwrap_err();
	assert!(matches!(err, Error::Timeout { .. }), "{err}");
	assert!(started.elapsed() >= Duration::from_millis(50));
}

#[test]
fn inter_byte_gap_ends_the_read() {
	let mut pty = Pty::open().unwrap();
	let mut line = open_line(&pty, Duration::from_secs(2));
	line.set_inter_byte_timeout(Duration::from_millis(20));

	pty.master.write_all(b"ab").unwrap();
	let started = Instant::now();
	let mut buf = [0u8; 16];
	assert_eq!(line.read(&mut buf).unwrap(), 2);
	assert!(started.elapsed() < Duration::from_secs(1));
}

#[test]
fn write_reaches_the_far_end() {
	let mut pty = Pty::open().unwrap();
	let mut line = open_line(&pty, Duration::ZERO);
	let frame = [0x01, 0x03, 0x00, 0x00, 0x00, 0x0a, 0xc5, 0xcd];
	assert_eq!(line.write(&frame).unwrap(), frame.len());

	let mut got = [0u8; 8];
	pty.master.read_exact(&mut got).unwrap();
	assert_eq!(got, frame);
}

#[test]
fn flush_and_close() {
	let pty = Pty::open().unwrap();
	let mut line = open_line(&pty, Duration::ZERO);
	line.flush().unwrap();

	line.close().unwrap();
	line.close().unwrap();
	assert!(!line.is_open());
	let mut buf = [0u8; 1];
	assert!(matches!(line.read(&mut buf), Err(Error::NotOpen)));
	assert!(matches!(line.write(b"x"), Err(Error::NotOpen)));
	assert!(matches!(line.flush(), Err(Error::NotOpen)));
}

#[test]
fn rs485_on_a_pty_fails_and_closes() {
	let pty = Pty::open().unwrap();
	let mut line = SerialEndpoint::new();
	let config = SerialConfig::new(&pty.path).rs485(Rs485Config::enabled().rts_high_during_send(true));
	let err = line.open(&config).unwrap_err();
	assert!(matches!(err, Error::Rs485 { .. }), "{err}");
	assert!(!line.is_open());
	assert!(line.fd().is_none());
}

#[test]
fn unsupported_settings() {
	let pty = Pty::open().unwrap();
	let mut line = SerialEndpoint::new();
	let err = line.open(&SerialConfig::new(&pty.path).data_bits(9)).unwrap_err();
	assert!(matches!(err, Error::Terminal(TerminalError::DataBits(9))));
	assert!(!line.is_open());
}

#[test]
fn close_restores_previous_attributes() {
	let pty = Pty::open().unwrap();
	// hold the slave open so its attributes survive between opens
	let keeper = std::fs::OpenOptions::new().read(true).write(true).open(&pty.path).unwrap();
	let before = fieldlink::serial::termios::capture(std::os::fd::AsRawFd::as_raw_fd(&keeper)).unwrap();

	let mut line = open_line(&pty, Duration::ZERO);
	let during = fieldlink::serial::termios::capture(line.fd().unwrap()).unwrap();
	assert_ne!(during.c_lflag, before.c_lflag);
	line.close().unwrap();

	let after = fieldlink::serial::termios::capture(std::os::fd::AsRawFd::as_raw_fd(&keeper)).unwrap();
	assert_eq!(after.c_cflag, before.c_cflag);
	assert_eq!(after.c_lflag, before.c_lflag);
	assert_eq!(after.c_iflag, before.c_iflag);
}

#[test]
fn factory_opens_serial() {
	let pty = Pty::open().unwrap();
	let config: EndpointConfig = SerialConfig::new(&pty.path).into();
	let mut line = fieldlink::open(&config).unwrap();
	assert_eq!(line.endpoint_type(), EndpointType::Serial);
	line.close().unwrap();
}

#[test]
fn attributes_that_cannot_be_applied_release_the_device() {
	// /dev/null opens fine but is not a terminal
	let mut line = SerialEndpoint::new();
	let err = line.open(&SerialConfig::new("/dev/null")).unwrap_err();
	assert!(matches!(err, Error::Terminal(TerminalError::Apply { errno: libc::ENOTTY })), "{err}");
	assert!(!line.is_open());
	assert!(line.fd().is_none());
	assert!(line.net_addr().is_none());
}

#[test]
fn cancel_ends_a_blocked_read() {
	let pty = Pty::open().unwrap();
	let mut line = open_line(&pty, Duration::from_secs(5));
	let canceller = line.canceller().clone();

	let reader = thread::spawn(move || {
		let started = Instant::now();
		let mut buf = [0u8; 4];
		let result = line.read(&mut buf);
		(result, started.elapsed(), line)
	});
	thread::sleep(Duration::from_millis(50));
	canceller.cancel();

	let (result, elapsed, mut line) = reader.join().unwrap();
	assert!(matches!(result, Err(Error::Cancelled)), "{result:?}");
	assert!(elapsed < Duration::from_secs(2), "{elapsed:?}");
	line.close().unwrap();
}
