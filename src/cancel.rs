//! Waking a blocked read or write from another thread.
//!
//! Every endpoint owns a [`Canceller`]. Its readiness waits poll the wake end
//! of a socket pair next to the endpoint descriptor, so `cancel` can end a
//! wait without touching the endpoint itself (and without its lock). A
//! cancelled endpoint stays cancelled until it is opened again.

use std::fmt;
use std::io::{self, Read, Write};
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::net::UnixStream;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::error::{Error, Result};

struct WakePair {
	rx: UnixStream,
	tx: UnixStream,
}

#[derive(Default)]
struct Inner {
	cancelled: AtomicBool,
	/// Created on first open; nothing can be waiting before that.
	pair: Mutex<Option<WakePair>>,
}

/// Cancels the I/O of one endpoint.
#[derive(Clone, Default)]
pub struct Canceller {
	inner: Arc<Inner>,
}

impl fmt::Debug for Canceller {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Canceller").field("cancelled", &self.is_cancelled()).finish()
	}
}

impl Canceller {
	/// Makes the current and every later wait fail with `Error::Cancelled`.
	pub fn cancel(&self) {
		let pair = self.inner.pair.lock();
		self.inner.cancelled.store(true, Ordering::Release);
		if let Some(pair) = pair.as_ref() {
			// WouldBlock: a wake-up is already queued
			let _ = (&pair.tx).write(&[1]);
		}
	}

	pub fn is_cancelled(&self) -> bool {
		self.inner.cancelled.load(Ordering::Acquire)
	}

	/// Clears an earlier cancel and returns the descriptor waits must poll.
	///
	/// Called by `open`. The descriptor lives as long as any clone of the
	/// canceller, which the endpoint itself holds.
	pub(crate) fn arm(&self) -> Result<RawFd> {
		let mut slot = self.inner.pair.lock();
		let pair = match &mut *slot {
			Some(pair) => pair,
			empty => empty.insert(wake_pair()?),
		};

		let mut sink = [0u8; 64];
		loop {
			match (&pair.rx).read(&mut sink) {
				Ok(0) => break,
				Ok(_) => continue,
				Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
				Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
				Err(e) => return Err(Error::Read { errno: e.raw_os_error().unwrap_or(0) }),
			}
		}
		self.inner.cancelled.store(false, Ordering::Release);
		Ok(pair.rx.as_raw_fd())
	}
}

fn wake_pair() -> Result<WakePair> {
	let creation = |e: io::Error| Error::SocketCreation { errno: e.raw_os_error().unwrap_or(0), call: "socketpair" };
	let (rx, tx) = UnixStream::pair().map_err(creation)?;
	rx.set_nonblocking(true).map_err(creation)?;
	tx.set_nonblocking(true).map_err(creation)?;
	Ok(WakePair { rx, tx })
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::socket::io::{Interest, wait_fd};
	use std::time::Duration;

	#[test]
	fn cancel_before_arm_is_cleared_by_it() {
		let c = Canceller::default();
		c.cancel();
		assert!(c.is_cancelled());
		c.arm().unwrap();
		assert!(!c.is_cancelled());
	}

	#[test]
	fn cancel_wakes_a_wait() {
		let (idle, _peer) = UnixStream::pair().unwrap();
		let c = Canceller::default();
		let wake = c.arm().unwrap();
		assert!(!wait_fd(idle.as_raw_fd(), Interest::Read, Some(Duration::from_millis(10)), Some(wake)).unwrap());

		c.cancel();
		c.cancel();
		let err = wait_fd(idle.as_raw_fd(), Interest::Read, Some(Duration::from_secs(5)), Some(wake)).unwrap_err();
		assert_eq!(err.raw_os_error(), Some(libc::ECANCELED));

		// re-arming drains both wake-ups
		assert_eq!(c.arm().unwrap(), wake);
		assert!(!wait_fd(idle.as_raw_fd(), Interest::Read, Some(Duration::from_millis(10)), Some(wake)).unwrap());
	}
}
