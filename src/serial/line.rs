//! Timeout-bounded read and write loops for the serial line.
//!
//! Both loops measure against one absolute deadline taken on entry; progress
//! never extends it. Interrupted waits and interrupted transfers are retried
//! in place and never reach the caller.

use std::io;
use std::os::fd::RawFd;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::socket::io::{Interest, wait_error, wait_fd};

/// Descriptor operations the loops are written against.
pub(crate) trait LineIo {
	/// Waits for readiness; `Ok(false)` when `timeout` expired first.
	fn wait(&mut self, interest: Interest, timeout: Duration) -> io::Result<bool>;
	fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
	fn write(&mut self, buf: &[u8]) -> io::Result<usize>;
}

/// A raw serial descriptor and the wake end of its canceller.
pub(crate) struct FdLine {
	pub fd: RawFd,
	pub wake: Option<RawFd>,
}

impl LineIo for FdLine {
	fn wait(&mut self, interest: Interest, timeout: Duration) -> io::Result<bool> {
		wait_fd(self.fd, interest, Some(timeout), self.wake)
	}

	fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
		let n = unsafe { libc::read(self.fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len()) };
		if n == -1 {
			return Err(io::Error::last_os_error());
		}
		Ok(n as usize)
	}

	fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
		let n = unsafe { libc::write(self.fd, buf.as_ptr() as *const libc::c_void, buf.len()) };
		if n == -1 {
			return Err(io::Error::last_os_error());
		}
		Ok(n as usize)
	}
}

fn retryable(e: &io::Error) -> bool {
	matches!(e.kind(), io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock)
}

fn os_errno(e: &io::Error) -> i32 {
	e.raw_os_error().unwrap_or(0)
}

/// Reads until `buf` is full, the deadline passes, or the line goes quiet.
///
/// Once at least one byte has arrived, an expired wait returns what was
/// gathered: whether a short frame is complete is for the protocol above to
/// decide. With no byte at all, expiry is `Error::Timeout`. A non-zero
/// `inter_byte` additionally bounds each wait after the first byte.
pub(crate) fn read_line<L: LineIo>(io: &mut L, buf: &mut [u8], timeout: Duration, inter_byte: Duration) -> Result<usize> {
	let deadline = Instant::now() + timeout;
	let mut filled = 0;
	let expired = |filled: usize| {
		if filled > 0 {
			Ok(filled)
		} else {
			Err(Error::Timeout { op: "serial read", timeout })
		}
	};

	loop {
		if filled == buf.len() {
			return Ok(filled);
		}

		let left = deadline.saturating_duration_since(Instant::now());
		if left.is_zero() {
			return expired(filled);
		}
		let bound = if filled > 0 && !inter_byte.is_zero() {
			left.min(inter_byte)
		} else {
			left
		};

		match io.wait(Interest::Read, bound) {
			Ok(true) => {}
			Ok(false) => return expired(filled),
			Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
			Err(e) => return Err(wait_error(&e)),
		}

		match io.read(&mut buf[filled..]) {
			// readable but empty: not EOF on a tty, something is wrong with the line
			Ok(0) => return Err(Error::NoData),
			Ok(n) => filled += n.min(buf.len() - filled),
			Err(e) if retryable(&e) => continue,
			Err(e) => return Err(Error::Read { errno: os_errno(&e) }),
		}
	}
}

/// Writes all of `buf`, waiting for the line to drain between attempts.
pub(crate) fn write_line<L: LineIo>(io: &mut L, buf: &[u8], timeout: Duration) -> Result<usize> {
	let deadline = Instant::now() + timeout;
	let timed_out = || Error::Timeout { op: "serial write", timeout };
	let mut written = 0;

	loop {
		match io.write(&buf[written..]) {
			Ok(n) => written += n,
			Err(e) if retryable(&e) => {}
			Err(e) => return Err(Error::Write { errno: os_errno(&e) }),
		}

		if written == buf.len() {
			return Ok(written);
		}
		if written > buf.len() {
			return Err(Error::Overflow { written, requested: buf.len() });
		}

		loop {
			let left = deadline.saturating_duration_since(Instant::now());
			if left.is_zero() {
				return Err(timed_out());
			}
			match io.wait(Interest::Write, left) {
				Ok(true) => break,
				Ok(false) => return Err(timed_out()),
				Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
				Err(e) => return Err(wait_error(&e)),
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::VecDeque;

	/// Scripted line: each read step is either data or a quiet wait.
	#[derive(Default)]
	struct Script {
		reads: VecDeque<Step>,
		write_cap: usize,
		write_extra: usize,
		written: Vec<u8>,
		write_calls: usize,
		interrupt_next_wait: bool,
		cancelled: bool,
	}

	enum Step {
		Data(&'static [u8]),
		Quiet,
		ReadInterrupted,
		Empty,
	}

	impl LineIo for Script {
		fn wait(&mut self, interest: Interest, _timeout: Duration) -> io::Result<bool> {
			if std::mem::take(&mut self.interrupt_next_wait) {
				return Err(io::ErrorKind::Interrupted.into());
			}
			if self.cancelled {
				return Err(io::Error::from_raw_os_error(libc::ECANCELED));
			}
			match interest {
				Interest::Write => Ok(true),
				Interest::Read => match self.reads.front() {
					None | Some(Step::Quiet) => {
						self.reads.pop_front();
						Ok(false)
					}
					Some(_) => Ok(true),
				},
			}
		}

		fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
			match self.reads.pop_front() {
				Some(Step::Data(d)) => {
					buf[..d.len()].copy_from_slice(d);
					Ok(d.len())
				}
				Some(Step::ReadInterrupted) => Err(io::ErrorKind::Interrupted.into()),
				Some(Step::Empty) => Ok(0),
				_ => unreachable!("read without readiness"),
			}
		}

		fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
			self.write_calls += 1;
			let n = buf.len().min(self.write_cap);
			self.written.extend_from_slice(&buf[..n]);
			Ok(n + self.write_extra)
		}
	}

	const LONG: Duration = Duration::from_secs(5);

	#[test]
	fn read_gathers_bursts_until_full() {
		let mut io = Script {
			reads: VecDeque::from([
				Step::Data(b"abc"),
				Step::Data(b"def"),
				Step::ReadInterrupted,
				Step::Data(b"ghi"),
				Step::Data(b"j"),
			]),
			..Script::default()
		};
		let mut buf = [0u8; 10];
		assert_eq!(read_line(&mut io, &mut buf, LONG, Duration::ZERO).unwrap(), 10);
		assert_eq!(&buf, b"abcdefghij");
	}

	#[test]
	fn read_returns_partial_data_on_quiet_line() {
		let mut io = Script {
			reads: VecDeque::from([Step::Data(b"abc"), Step::Quiet]),
			..Script::default()
		};
		let mut buf = [0u8; 10];
		assert_eq!(read_line(&mut io, &mut buf, LONG, Duration::ZERO).unwrap(), 3);
	}

	#[test]
	fn read_without_data_times_out() {
		let mut io = Script {
			reads: VecDeque::from([Step::Quiet]),
			interrupt_next_wait: true,
			..Script::default()
		};
		let mut buf = [0u8; 4];
		let err = read_line(&mut io, &mut buf, LONG, Duration::ZERO).unwrap_err();
		assert!(err.is_timeout());
	}

	#[test]
	fn ready_but_empty_is_an_error() {
		let mut io = Script {
			reads: VecDeque::from([Step::Empty]),
			..Script::default()
		};
		let mut buf = [0u8; 4];
		assert!(matches!(read_line(&mut io, &mut buf, LONG, Duration::ZERO), Err(Error::NoData)));
	}

	#[test]
	fn expired_deadline_with_nothing_read() {
		let mut io = Script::default();
		let mut buf = [0u8; 4];
		let err = read_line(&mut io, &mut buf, Duration::ZERO, Duration::ZERO).unwrap_err();
		assert!(err.is_timeout());
	}

	#[test]
	fn write_drains_in_chunks() {
		let payload: Vec<u8> = (0..8192u32).map(|i| i as u8).collect();
		let mut io = Script { write_cap: 1024, interrupt_next_wait: true, ..Script::default() };
		assert_eq!(write_line(&mut io, &payload, LONG).unwrap(), 8192);
		assert_eq!(io.write_calls, 8);
		assert_eq!(io.written, payload);
	}

	#[test]
	fn write_accounting_overflow() {
		let mut io = Script { write_cap: 1024, write_extra: 1, ..Script::default() };
		let payload = [0u8; 1024];
		let err = write_line(&mut io, &payload, LONG).unwrap_err();
		assert!(matches!(err, Error::Overflow { written: 1025, requested: 1024 }));
	}

	#[test]
	fn cancel_ends_both_loops() {
		let mut io = Script {
			reads: VecDeque::from([Step::Data(b"ab"), Step::Data(b"cd")]),
			write_cap: 1,
			..Script::default()
		};
		io.cancelled = true;
		let mut buf = [0u8; 8];
		assert!(matches!(read_line(&mut io, &mut buf, LONG, Duration::ZERO), Err(Error::Cancelled)));
		// the first write lands before the line waits for room
		assert!(matches!(write_line(&mut io, b"xyz", LONG), Err(Error::Cancelled)));
		assert_eq!(io.written, b"x");
	}

	#[test]
	fn empty_write_is_immediate() {
		let mut io = Script::default();
		assert_eq!(write_line(&mut io, &[], LONG).unwrap(), 0);
	}
}
