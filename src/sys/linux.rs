use std::os::fd::RawFd;

use crate::serial::rs485::SerialRs485;

/// Flags OR-ed into the socket type for atomic creation.
pub(crate) const SOCKET_CREATE_FLAGS: Option<libc::c_int> = Some(libc::SOCK_NONBLOCK | libc::SOCK_CLOEXEC);

/// TCP option for the idle time before the first keep-alive probe.
pub(crate) const TCP_KEEPIDLE: libc::c_int = libc::TCP_KEEPIDLE;

/// Mark/space parity bit.
pub(crate) const CMSPAR: Option<libc::tcflag_t> = Some(libc::CMSPAR);

/// Looks up the speed constant for a baud rate.
pub(crate) fn baud_flag(rate: u32) -> Option<libc::speed_t> {
	let flag = match rate {
		50 => libc::B50,
		75 => libc::B75,
		110 => libc::B110,
		134 => libc::B134,
		150 => libc::B150,
		200 => libc::B200,
		300 => libc::B300,
		600 => libc::B600,
		1200 => libc::B1200,
		1800 => libc::B1800,
		2400 => libc::B2400,
		4800 => libc::B4800,
		9600 => libc::B9600,
		19200 => libc::B19200,
		38400 => libc::B38400,
		57600 => libc::B57600,
		115200 => libc::B115200,
		230400 => libc::B230400,
		460800 => libc::B460800,
		500000 => libc::B500000,
		576000 => libc::B576000,
		921600 => libc::B921600,
		1000000 => libc::B1000000,
		1152000 => libc::B1152000,
		1500000 => libc::B1500000,
		2000000 => libc::B2000000,
		2500000 => libc::B2500000,
		3000000 => libc::B3000000,
		3500000 => libc::B3500000,
		4000000 => libc::B4000000,
		_ => return None,
	};
	Some(flag)
}

/// Issues TIOCSRS485. Returns the raw ioctl result on success.
pub(crate) fn set_rs485(fd: RawFd, opts: &SerialRs485) -> std::io::Result<libc::c_int> {
	let r = unsafe { libc::ioctl(fd, libc::TIOCSRS485 as _, opts as *const SerialRs485) };
	if r == -1 {
		return Err(std::io::Error::last_os_error());
	}
	Ok(r)
}

/// Discards pending input and output (TCFLSH, TCIOFLUSH).
pub(crate) fn flush_line(fd: RawFd) -> std::io::Result<libc::c_int> {
	let r = unsafe { libc::ioctl(fd, libc::TCFLSH as _, libc::TCIOFLUSH) };
	if r == -1 {
		return Err(std::io::Error::last_os_error());
	}
	Ok(r)
}
