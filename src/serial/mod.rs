//! Serial line endpoint.
//!
//! The descriptor is opened non-blocking; every read and write is a poll-driven
//! loop bounded by the endpoint's timeouts (see `line`). Terminal attributes in
//! force before `open` are captured and put back on `close`.

pub mod termios;
pub(crate) mod rs485;
mod line;

use std::ffi::CString;
use std::fmt;
use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::time::Duration;

use tracing::{debug, warn};

use crate::addr::NetAddr;
use crate::cancel::Canceller;
use crate::config::SerialConfig;
use crate::error::{Error, Result, TerminalError, errno};
use crate::sys;

use self::line::FdLine;

/// Read budget used when the configuration leaves it at zero.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(5000);
/// Write budget used when the configuration leaves it at zero.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_millis(1000);

/// A serial device, optionally in RS-485 mode.
pub struct SerialEndpoint {
	fd: Option<OwnedFd>,
	addr: Option<NetAddr>,
	/// Attributes in force before `open`.
	saved: Option<libc::termios>,
	canceller: Canceller,
	wake: Option<RawFd>,
	read_timeout: Duration,
	write_timeout: Duration,
	inter_byte_timeout: Duration,
}

impl fmt::Debug for SerialEndpoint {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SerialEndpoint")
			.field("fd", &self.fd)
			.field("addr", &self.addr)
			.field("saved", &self.saved.is_some())
			.field("canceller", &self.canceller)
			.field("read_timeout", &self.read_timeout)
			.field("write_timeout", &self.write_timeout)
			.field("inter_byte_timeout", &self.inter_byte_timeout)
			.finish()
	}
}

impl Default for SerialEndpoint {
	fn default() -> Self {
		Self::new()
	}
}

impl SerialEndpoint {
	/// Creates an unopened endpoint.
	pub fn new() -> Self {
		Self {
			fd: None,
			addr: None,
			saved: None,
			canceller: Canceller::default(),
			wake: None,
			read_timeout: DEFAULT_READ_TIMEOUT,
			write_timeout: DEFAULT_WRITE_TIMEOUT,
			inter_byte_timeout: Duration::ZERO,
		}
	}

	/// Opens and configures the device named by `config`.
	///
	/// On failure the endpoint stays unopened and no descriptor is left behind.
	/// Re-opening an open endpoint closes the previous line first.
	pub fn open(&mut self, config: &SerialConfig) -> Result<()> {
		if self.fd.is_some() {
			self.close()?;
		}

		let attrs = termios::build(config)?;
		let wake = self.canceller.arm()?;
		let fd = open_device(&config.address)?;
		let raw = fd.as_raw_fd();

		let saved = match termios::capture(raw) {
			Ok(t) => Some(t),
			Err(e) => {
				warn!(path = %config.address, error = %e, "could not back up terminal attributes");
				None
			}
		};

		if let Err(e) = termios::apply(raw, &attrs) {
			// fd dropped here: nothing was changed, nothing to restore
			return Err(TerminalError::Apply { errno: e.raw_os_error().unwrap_or(0) }.into());
		}

		self.fd = Some(fd);
		self.wake = Some(wake);
		self.saved = saved;
		self.addr = Some(NetAddr::Serial(config.address.clone()));

		if let Err(e) = rs485::enable(raw, &config.rs485) {
			if let Err(close_err) = self.close() {
				warn!(path = %config.address, error = %close_err, "close after RS-485 failure");
			}
			return Err(e);
		}

		self.read_timeout = or_default(config.read_timeout, DEFAULT_READ_TIMEOUT);
		self.write_timeout = or_default(config.write_timeout, DEFAULT_WRITE_TIMEOUT);
		self.inter_byte_timeout = config.inter_byte_timeout;

		debug!(
			path = %config.address,
			baud = config.baud_rate,
			data_bits = config.data_bits,
			stop_bits = config.stop_bits,
			parity = %config.parity,
			rs485 = config.rs485.enabled,
			"serial line open"
		);
		Ok(())
	}

	fn raw(&self) -> Result<RawFd> {
		self.fd.as_ref().map(|fd| fd.as_raw_fd()).ok_or(Error::NotOpen)
	}

	fn fd_line(&self) -> Result<FdLine> {
		Ok(FdLine { fd: self.raw()?, wake: self.wake })
	}

	/// Reads up to `buf.len()` bytes within the read timeout.
	///
	/// Returns early with what has arrived once the line has gone quiet; fails
	/// with `Error::Timeout` only if nothing arrived at all.
	pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
		let mut fd_line = self.fd_line()?;
		if buf.is_empty() {
			return Ok(0);
		}
		line::read_line(&mut fd_line, buf, self.read_timeout, self.inter_byte_timeout)
	}

	/// Writes all of `buf` within the write timeout.
	pub fn write(&mut self, buf: &[u8]) -> Result<usize> {
		line::write_line(&mut self.fd_line()?, buf, self.write_timeout)
	}

	/// Discards data pending in both directions.
	pub fn flush(&mut self) -> Result<()> {
		let fd = self.raw()?;
		match sys::flush_line(fd) {
			Ok(0) => Ok(()),
			Ok(status) => Err(Error::UnknownFlush(status)),
			Err(e) => Err(Error::Flush { errno: e.raw_os_error().unwrap_or(0) }),
		}
	}

	/// Restores the saved attributes and releases the descriptor. Idempotent.
	pub fn close(&mut self) -> Result<()> {
		let Some(fd) = self.fd.take() else {
			return Ok(());
		};
		if let Some(saved) = self.saved.take()
			&& let Err(e) = termios::apply(fd.as_raw_fd(), &saved)
		{
			warn!(addr = ?self.addr, error = %e, "could not restore terminal attributes");
		}
		debug!(addr = ?self.addr, "serial line closed");
		sys::close_fd(fd)
	}

	pub fn is_open(&self) -> bool {
		self.fd.is_some()
	}

	pub fn fd(&self) -> Option<RawFd> {
		self.fd.as_ref().map(|fd| fd.as_raw_fd())
	}

	/// Handle that fails a blocked read or write from another thread.
	pub fn canceller(&self) -> &Canceller {
		&self.canceller
	}

	/// `NetAddr::Serial` with the device path, once opened.
	pub fn net_addr(&self) -> Option<&NetAddr> {
		self.addr.as_ref()
	}

	pub fn read_timeout(&self) -> Duration {
		self.read_timeout
	}

	pub fn write_timeout(&self) -> Duration {
		self.write_timeout
	}

	pub fn inter_byte_timeout(&self) -> Duration {
		self.inter_byte_timeout
	}

	/// Zero selects the default.
	pub fn set_read_timeout(&mut self, timeout: Duration) {
		self.read_timeout = or_default(timeout, DEFAULT_READ_TIMEOUT);
	}

	/// Zero selects the default.
	pub fn set_write_timeout(&mut self, timeout: Duration) {
		self.write_timeout = or_default(timeout, DEFAULT_WRITE_TIMEOUT);
	}

	pub fn set_inter_byte_timeout(&mut self, timeout: Duration) {
		self.inter_byte_timeout = timeout;
	}
}

impl Drop for SerialEndpoint {
	fn drop(&mut self) {
		if let Err(e) = self.close() {
			warn!(error = %e, "close on drop");
		}
	}
}

impl io::Read for SerialEndpoint {
	fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
		SerialEndpoint::read(self, buf).map_err(Into::into)
	}
}

impl io::Write for SerialEndpoint {
	fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
		SerialEndpoint::write(self, buf).map_err(Into::into)
	}

	/// Output is unbuffered here; discarding the line is `SerialEndpoint::flush`.
	fn flush(&mut self) -> io::Result<()> {
		Ok(())
	}
}

fn or_default(timeout: Duration, default: Duration) -> Duration {
	if timeout.is_zero() { default } else { timeout }
}

fn open_device(path: &str) -> Result<OwnedFd> {
	let c_path = CString::new(path).map_err(|_| Error::SerialOpen { errno: libc::EINVAL, path: path.to_string() })?;
	loop {
		let fd = unsafe { libc::open(c_path.as_ptr(), sys::SERIAL_OPEN_FLAGS) };
		if fd >= 0 {
			return Ok(unsafe { OwnedFd::from_raw_fd(fd) });
		}
		match errno() {
			libc::EINTR => continue,
			e @ (libc::EMFILE | libc::ENFILE) => return Err(Error::TooManyFiles { errno: e, path: path.to_string() }),
			e => return Err(Error::SerialOpen { errno: e, path: path.to_string() }),
		}
	}
}
