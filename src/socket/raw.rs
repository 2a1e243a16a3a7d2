use std::io;
use std::os::fd::{FromRawFd, OwnedFd, RawFd};

use parking_lot::{RwLock, RwLockWriteGuard};

use crate::error::{Error, Result};
use crate::socket::options::{set_cloexec, set_nonblocking};
use crate::sys;

/// Process-wide lock held (shared) between creating a descriptor and marking it
/// close-on-exec. Code that forks takes it exclusively via [`fork_lock`].
static FORK_LOCK: RwLock<()> = parking_lot::const_rwlock(());

/// Takes the fork lock exclusively. Hold the guard across `fork`/`exec` so no
/// descriptor created by the fallback path can leak into the child.
pub fn fork_lock() -> RwLockWriteGuard<'static, ()> {
	FORK_LOCK.write()
}

/// Creates a non-blocking, close-on-exec socket.
///
/// Tries `socket()` with `SOCK_NONBLOCK | SOCK_CLOEXEC` first. Kernels that
/// reject the combined flags (`EPROTONOSUPPORT`, `EINVAL`) get the fallback:
/// plain `socket()` under the fork lock, `FD_CLOEXEC`, then `O_NONBLOCK`.
pub fn build_socket(family: libc::c_int, ty: libc::c_int, protocol: libc::c_int) -> Result<OwnedFd> {
	build_socket_with(family, ty, protocol, |family, ty, protocol| {
		let fd = unsafe { libc::socket(family, ty, protocol) };
		if fd == -1 {
			Err(io::Error::last_os_error())
		} else {
			Ok(fd)
		}
	})
}

/// Same as [`build_socket`] with the `socket()` call supplied by the caller.
pub(crate) fn build_socket_with<F>(family: libc::c_int, ty: libc::c_int, protocol: libc::c_int, mut create: F) -> Result<OwnedFd>
where
	F: FnMut(libc::c_int, libc::c_int, libc::c_int) -> io::Result<RawFd>,
{
	if let Some(flags) = sys::SOCKET_CREATE_FLAGS {
		match create(family, ty | flags, protocol) {
			Ok(fd) => return Ok(unsafe { OwnedFd::from_raw_fd(fd) }),
			Err(e) => match e.raw_os_error() {
				Some(libc::EPROTONOSUPPORT) | Some(libc::EINVAL) => {
					tracing::debug!("socket flags rejected ({}), falling back", e);
				}
				errno => {
					return Err(Error::SocketCreation { errno: errno.unwrap_or(0), call: "socket" });
				}
			},
		}
	}

	let fd = {
		let _guard = FORK_LOCK.read();
		let fd = create(family, ty, protocol)
			.map_err(|e| Error::SocketCreation { errno: e.raw_os_error().unwrap_or(0), call: "socket" })?;
		let fd = unsafe { OwnedFd::from_raw_fd(fd) };
		// on failure `fd` is dropped, and closed, before the guard is released
		set_cloexec(&fd)?;
		fd
	};

	set_nonblocking(&fd, true)?;
	Ok(fd)
}

/*
 ---
  Fallback sequence:
  ┌───────────────────────────┬──────────────────────────────────────────┐
  │ Step                      │ On failure                               │
  ├───────────────────────────┼──────────────────────────────────────────┤
  │ socket(ty | flags)        │ EINVAL/EPROTONOSUPPORT → next; else fail │
  │ socket(ty) + FD_CLOEXEC   │ fd dropped (closed), SocketCreation      │
  │ O_NONBLOCK                │ fd dropped (closed), SocketOption        │
  └───────────────────────────┴──────────────────────────────────────────┘
  ---
*/
