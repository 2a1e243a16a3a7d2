//! Platform layer.
//!
//! Everything that differs between kernels lives here: socket creation flags,
//! the baud rate table, mark/space parity support, the RS-485 ioctl and the
//! line flush. Transport code only calls the functions re-exported below.

#[cfg(any(target_os = "linux", target_os = "android"))]
mod linux;
#[cfg(any(target_os = "linux", target_os = "android"))]
pub(crate) use self::linux::*;

#[cfg(not(any(target_os = "linux", target_os = "android")))]
mod bsd;
#[cfg(not(any(target_os = "linux", target_os = "android")))]
pub(crate) use self::bsd::*;

/// Flags every serial device is opened with.
pub(crate) const SERIAL_OPEN_FLAGS: libc::c_int =
	libc::O_RDWR | libc::O_NOCTTY | libc::O_NONBLOCK | libc::O_CLOEXEC;

/// Closes `fd` explicitly so the error is visible; dropping an `OwnedFd`
/// would swallow it. `EINTR` is not an error: the descriptor is gone anyway.
pub(crate) fn close_fd(fd: std::os::fd::OwnedFd) -> crate::error::Result<()> {
	use std::os::fd::IntoRawFd;

	if unsafe { libc::close(fd.into_raw_fd()) } == -1 {
		let e = crate::error::errno();
		if e != libc::EINTR {
			return Err(crate::error::Error::Close { errno: e });
		}
	}
	Ok(())
}
