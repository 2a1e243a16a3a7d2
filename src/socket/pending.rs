use std::io;
use std::os::fd::{AsRawFd, BorrowedFd};
use std::time::{Duration, Instant};

use crate::addr::{SockAddr, ToSockAddr};
use crate::error::{Error, Result, errno};
use crate::socket::io::{Interest, remaining, wait_error, wait_fd};
use crate::socket::options::{set_nonblocking, set_send_timeout};

/// A connect started on a non-blocking socket.
///
/// On a non-blocking descriptor `connect()` usually answers `EINPROGRESS`;
/// that is not a failure. The outcome is read from `SO_ERROR` once the socket
/// turns writable.
pub(crate) struct PendingConnect<'a> {
	fd: BorrowedFd<'a>,
	addr: &'a SockAddr,
}

impl<'a> PendingConnect<'a> {
	/// Issues `connect()`. Returns `None` if the connection completed at once.
	pub(crate) fn start(fd: BorrowedFd<'a>, addr: &'a SockAddr) -> Result<Option<Self>> {
		let result = addr.with_raw(|ptr, len| unsafe { libc::connect(fd.as_raw_fd(), ptr, len) });

		match result {
			Some(0) => Ok(None),
			Some(_) => match errno() {
				// an interrupted connect keeps going in the background
				libc::EINPROGRESS | libc::EINTR => Ok(Some(Self { fd, addr })),
				e => Err(Error::Connect { errno: e, addr: addr.to_string() }),
			},
			None => Err(Error::Connect { errno: libc::ENAMETOOLONG, addr: addr.to_string() }),
		}
	}

	/// Reads and clears the socket error status.
	///
	/// Returns `None` if no error (connect succeeded).
	pub(crate) fn take_error(&self) -> io::Result<Option<io::Error>> {
		let mut error: libc::c_int = 0;
		let mut len = std::mem::size_of::<libc::c_int>() as libc::socklen_t;

		let result = unsafe {
			libc::getsockopt(
				self.fd.as_raw_fd(),
				libc::SOL_SOCKET,
				libc::SO_ERROR,
				&mut error as *mut _ as *mut libc::c_void,
				&mut len,
			)
		};

		if result == -1 {
			return Err(io::Error::last_os_error());
		}

		if error == 0 {
			Ok(None)
		} else {
			Ok(Some(io::Error::from_raw_os_error(error)))
		}
	}

	/// Waits for the connection to complete. A zero `timeout` waits without bound.
	pub(crate) fn finish(self, timeout: Duration) -> Result<()> {
		let deadline = (!timeout.is_zero()).then(|| Instant::now() + timeout);
		let fail = |errno: i32| Error::Connect { errno, addr: self.addr.to_string() };

		loop {
			let left = remaining(deadline);
			if left == Some(Duration::ZERO) {
				return Err(fail(libc::ETIMEDOUT));
			}
			match wait_fd(self.fd.as_raw_fd(), Interest::Write, left, None) {
				Ok(true) => break,
				Ok(false) => return Err(fail(libc::ETIMEDOUT)),
				Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
				Err(e) => return Err(wait_error(&e)),
			}
		}

		match self.take_error() {
			Ok(None) => Ok(()),
			Ok(Some(e)) | Err(e) => Err(fail(e.raw_os_error().unwrap_or(0))),
		}
	}
}

/// Connects `fd` to `addr`, tolerating an in-progress status.
pub(crate) fn connect(fd: BorrowedFd<'_>, addr: &SockAddr, timeout: Duration) -> Result<()> {
	match PendingConnect::start(fd, addr)? {
		None => Ok(()),
		Some(pending) => pending.finish(timeout),
	}
}

/// Connects a Unix stream socket in blocking mode, bounded by `SO_SNDTIMEO`.
///
/// A non-blocking `AF_UNIX` connect to a listener with a full backlog fails
/// with `EAGAIN` and starts nothing, so there is no completion to wait for. In
/// blocking mode the kernel queues the caller until the backlog has room or
/// the send timeout (zero means unbounded) expires. The descriptor is put back
/// in non-blocking mode afterwards.
pub(crate) fn connect_blocking(fd: BorrowedFd<'_>, addr: &SockAddr, timeout: Duration) -> Result<()> {
	let fail = |errno: i32| Error::Connect { errno, addr: addr.to_string() };

	set_nonblocking(&fd, false)?;
	set_send_timeout(&fd, timeout)?;
	loop {
		let result = addr.with_raw(|ptr, len| unsafe { libc::connect(fd.as_raw_fd(), ptr, len) });
		match result {
			Some(0) => break,
			Some(_) => match errno() {
				libc::EINTR => continue,
				libc::EISCONN => break,
				// only the send timeout makes a blocking connect answer EAGAIN
				e if e == libc::EAGAIN || e == libc::EWOULDBLOCK => return Err(fail(libc::ETIMEDOUT)),
				e => return Err(fail(e)),
			},
			None => return Err(fail(libc::ENAMETOOLONG)),
		}
	}
	set_send_timeout(&fd, Duration::ZERO)?;
	set_nonblocking(&fd, true)
}

/*
 ┌─────────────────────────┬──────────────────────────────────────────┐
 │ connect() result        │ Meaning                                  │
 ├─────────────────────────┼──────────────────────────────────────────┤
 │ 0                       │ connected (loopback, Unix sockets)       │
 │ -1 / EINPROGRESS, EINTR │ pending, wait for POLLOUT then SO_ERROR  │
 │ -1 / anything else      │ failed, descriptor is dropped by caller  │
 ├─────────────────────────┼──────────────────────────────────────────┤
 │ AF_UNIX, blocking       │ waits for backlog room up to SO_SNDTIMEO │
 │ -1 / EAGAIN (blocking)  │ send timeout expired, ETIMEDOUT          │
 └─────────────────────────┴──────────────────────────────────────────┘
 */
