//! Readiness waits and timeout-bounded descriptor I/O.

use std::io;
use std::os::fd::RawFd;
use std::time::{Duration, Instant};

use crate::error::{Error, Result, errno};

/// Direction a readiness wait is interested in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Interest {
	Read,
	Write,
}

/// Waits until `fd` is ready for `interest`.
///
/// Returns `Ok(false)` when the wait expired without the descriptor being
/// ready. `None` waits without bound. An interrupted wait surfaces as
/// `ErrorKind::Interrupted` so callers can retry with a fresh remaining time.
/// A readable `wake` descriptor ends the wait with `ECANCELED`.
pub(crate) fn wait_fd(fd: RawFd, interest: Interest, timeout: Option<Duration>, wake: Option<RawFd>) -> io::Result<bool> {
	let events = match interest {
		Interest::Read => libc::POLLIN,
		Interest::Write => libc::POLLOUT,
	};
	// a negative fd is ignored by poll(2)
	let mut fds = [
		libc::pollfd { fd, events, revents: 0 },
		libc::pollfd { fd: wake.unwrap_or(-1), events: libc::POLLIN, revents: 0 },
	];
	let n = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, poll_timeout(timeout)) };
	if n == -1 {
		return Err(io::Error::last_os_error());
	}
	if fds[1].revents != 0 {
		return Err(io::Error::from_raw_os_error(libc::ECANCELED));
	}
	Ok(n > 0 && fds[0].revents & (events | libc::POLLERR | libc::POLLHUP) != 0)
}

/// Maps a failed [`wait_fd`] to the crate error.
pub(crate) fn wait_error(e: &io::Error) -> Error {
	match e.raw_os_error() {
		Some(libc::ECANCELED) => Error::Cancelled,
		errno => Error::Wait { errno: errno.unwrap_or(0) },
	}
}

/// Milliseconds for poll(2), rounded up so a short remaining time never turns
/// into a zero (non-blocking) poll.
fn poll_timeout(timeout: Option<Duration>) -> libc::c_int {
	match timeout {
		None => -1,
		Some(d) => d.as_nanos().div_ceil(1_000_000).min(libc::c_int::MAX as u128) as libc::c_int,
	}
}

/// Time left until `deadline`, or `None` for an unbounded operation.
pub(crate) fn remaining(deadline: Option<Instant>) -> Option<Duration> {
	deadline.map(|d| d.saturating_duration_since(Instant::now()))
}

/// An open descriptor together with the wake end of its canceller.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Waitable {
	pub fd: RawFd,
	pub wake: Option<RawFd>,
}

/// Runs `syscall` until it succeeds, retrying `EINTR` and waiting on `EAGAIN`.
///
/// A zero `timeout` blocks without bound, which is what a descriptor in
/// blocking mode would do.
fn retry_io<F>(fd: Waitable, interest: Interest, timeout: Duration, op: &'static str, mut syscall: F, fail: fn(i32) -> Error) -> Result<usize>
where
	F: FnMut() -> isize,
{
	let deadline = (!timeout.is_zero()).then(|| Instant::now() + timeout);
	loop {
		let n = syscall();
		if n >= 0 {
			return Ok(n as usize);
		}
		match errno() {
			libc::EINTR => continue,
			e if e == libc::EAGAIN || e == libc::EWOULDBLOCK => {}
			e => return Err(fail(e)),
		}

		loop {
			let left = remaining(deadline);
			if left == Some(Duration::ZERO) {
				return Err(Error::Timeout { op, timeout });
			}
			match wait_fd(fd.fd, interest, left, fd.wake) {
				Ok(true) => break,
				Ok(false) => return Err(Error::Timeout { op, timeout }),
				Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
				Err(e) => return Err(wait_error(&e)),
			}
		}
	}
}

pub(crate) fn read_fd(fd: Waitable, buf: &mut [u8], timeout: Duration) -> Result<usize> {
	retry_io(fd, Interest::Read, timeout, "read", || unsafe {
		libc::read(fd.fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len())
	}, |errno| Error::Read { errno })
}

pub(crate) fn write_fd(fd: Waitable, buf: &[u8], timeout: Duration) -> Result<usize> {
	retry_io(fd, Interest::Write, timeout, "write", || unsafe {
		libc::write(fd.fd, buf.as_ptr() as *const libc::c_void, buf.len())
	}, |errno| Error::Write { errno })
}

/// Receives one datagram, discarding the sender address.
pub(crate) fn recv_fd(fd: Waitable, buf: &mut [u8], timeout: Duration) -> Result<usize> {
	retry_io(fd, Interest::Read, timeout, "recv", || unsafe {
		libc::recvfrom(
			fd.fd,
			buf.as_mut_ptr() as *mut libc::c_void,
			buf.len(),
			0,
			std::ptr::null_mut(),
			std::ptr::null_mut(),
		)
	}, |errno| Error::Read { errno })
}

/// Sends one datagram to `ptr`/`len`.
pub(crate) fn send_to_fd(fd: Waitable, buf: &[u8], ptr: *const libc::sockaddr, len: libc::socklen_t, timeout: Duration) -> Result<usize> {
	retry_io(fd, Interest::Write, timeout, "send", || unsafe {
		libc::sendto(fd.fd, buf.as_ptr() as *const libc::c_void, buf.len(), 0, ptr, len)
	}, |errno| Error::Write { errno })
}
