use std::os::fd::AsRawFd;
use std::time::Duration;

use crate::error::{Error, Result, errno};
use crate::sys;

fn setsockopt_int<S: AsRawFd>(socket: &S, level: libc::c_int, name: libc::c_int, val: libc::c_int, option: &'static str) -> Result<()> {
	let result = unsafe {
		libc::setsockopt(
			socket.as_raw_fd(),
			level,
			name,
			&val as *const _ as *const libc::c_void,
			std::mem::size_of::<libc::c_int>() as libc::socklen_t,
		)
	};
	if result == -1 {
		Err(Error::SocketOption { errno: errno(), option })
	} else {
		Ok(())
	}
}

/// Sets TCP_NODELAY on a socket.
///
/// Disables Nagle's algorithm so small request frames leave immediately.
pub fn set_tcp_nodelay<S: AsRawFd>(socket: &S, enable: bool) -> Result<()> {
	setsockopt_int(socket, libc::IPPROTO_TCP, libc::TCP_NODELAY, enable as libc::c_int, "TCP_NODELAY")
}

/// Enables keep-alive with `period` as both the idle time and the probe interval.
///
/// A zero period leaves keep-alive untouched. Sub-second periods round up to
/// one second, the kernel's granularity.
pub fn set_keepalive<S: AsRawFd>(socket: &S, period: Duration) -> Result<()> {
	if period.is_zero() {
		return Ok(());
	}
	let secs = period.as_secs().max(1).min(libc::c_int::MAX as u64) as libc::c_int;

	setsockopt_int(socket, libc::SOL_SOCKET, libc::SO_KEEPALIVE, 1, "SO_KEEPALIVE")?;
	setsockopt_int(socket, libc::IPPROTO_TCP, libc::TCP_KEEPINTVL, secs, "TCP_KEEPINTVL")?;
	setsockopt_int(socket, libc::IPPROTO_TCP, sys::TCP_KEEPIDLE, secs, "TCP_KEEPIDLE")
}

/// Sets SO_SNDTIMEO. Zero removes the timeout.
///
/// Only blocking calls observe it; the crate uses it to bound a blocking
/// Unix connect.
pub fn set_send_timeout<S: AsRawFd>(socket: &S, timeout: Duration) -> Result<()> {
	let tv = libc::timeval {
		tv_sec: timeout.as_secs().min(libc::time_t::MAX as u64) as libc::time_t,
		tv_usec: timeout.subsec_micros() as libc::suseconds_t,
	};
	let result = unsafe {
		libc::setsockopt(
			socket.as_raw_fd(),
			libc::SOL_SOCKET,
			libc::SO_SNDTIMEO,
			&tv as *const _ as *const libc::c_void,
			std::mem::size_of::<libc::timeval>() as libc::socklen_t,
		)
	};
	if result == -1 {
		Err(Error::SocketOption { errno: errno(), option: "SO_SNDTIMEO" })
	} else {
		Ok(())
	}
}

/// Sets or clears O_NONBLOCK.
pub fn set_nonblocking<S: AsRawFd>(socket: &S, nonblocking: bool) -> Result<()> {
	let flags = unsafe { libc::fcntl(socket.as_raw_fd(), libc::F_GETFL) };
	if flags == -1 {
		return Err(Error::SocketOption { errno: errno(), option: "F_GETFL" });
	}

	let new_flags = if nonblocking {
		flags | libc::O_NONBLOCK
	} else {
		flags & !libc::O_NONBLOCK
	};

	let result = unsafe { libc::fcntl(socket.as_raw_fd(), libc::F_SETFL, new_flags) };
	if result == -1 {
		return Err(Error::SocketOption { errno: errno(), option: "O_NONBLOCK" });
	}
	Ok(())
}

/// Sets FD_CLOEXEC.
pub fn set_cloexec<S: AsRawFd>(socket: &S) -> Result<()> {
	let flags = unsafe { libc::fcntl(socket.as_raw_fd(), libc::F_GETFD) };
	if flags == -1 {
		return Err(Error::SocketOption { errno: errno(), option: "F_GETFD" });
	}
	let result = unsafe { libc::fcntl(socket.as_raw_fd(), libc::F_SETFD, flags | libc::FD_CLOEXEC) };
	if result == -1 {
		return Err(Error::SocketOption { errno: errno(), option: "FD_CLOEXEC" });
	}
	Ok(())
}
