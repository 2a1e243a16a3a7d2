use std::os::fd::RawFd;

use crate::serial::rs485::SerialRs485;

#[cfg(any(target_os = "freebsd", target_os = "dragonfly", target_os = "netbsd", target_os = "openbsd"))]
pub(crate) const SOCKET_CREATE_FLAGS: Option<libc::c_int> = Some(libc::SOCK_NONBLOCK | libc::SOCK_CLOEXEC);

// Darwin has no creation flags; every socket takes the fallback path.
#[cfg(not(any(target_os = "freebsd", target_os = "dragonfly", target_os = "netbsd", target_os = "openbsd")))]
pub(crate) const SOCKET_CREATE_FLAGS: Option<libc::c_int> = None;

#[cfg(any(target_os = "macos", target_os = "ios"))]
pub(crate) const TCP_KEEPIDLE: libc::c_int = libc::TCP_KEEPALIVE;

#[cfg(not(any(target_os = "macos", target_os = "ios")))]
pub(crate) const TCP_KEEPIDLE: libc::c_int = libc::TCP_KEEPIDLE;

pub(crate) const CMSPAR: Option<libc::tcflag_t> = None;

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
		_ => return None,
	};
	Some(flag)
}

/// RS-485 direction control is a Linux serial core feature.
pub(crate) fn set_rs485(_fd: RawFd, _opts: &SerialRs485) -> std::io::Result<libc::c_int> {
	Err(std::io::Error::from_raw_os_error(libc::ENOTTY))
}

pub(crate) fn flush_line(fd: RawFd) -> std::io::Result<libc::c_int> {
	let r = unsafe { libc::tcflush(fd, libc::TCIOFLUSH) };
	if r == -1 {
		return Err(std::io::Error::last_os_error());
	}
	Ok(r)
}
