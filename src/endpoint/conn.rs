use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use std::time::Duration;

use tracing::debug;

use crate::addr::{NetAddr, SockAddr};
use crate::cancel::Canceller;
use crate::error::{Error, Result};
use crate::socket::io::Waitable;
use crate::sys;

/// Descriptor and addresses shared by the socket transports.
///
/// `fd` is `None` until opened and again after `close`; every I/O path goes
/// through [`Conn::raw`] and so fails with `Error::NotOpen` in that state.
#[derive(Debug, Default)]
pub(crate) struct Conn {
	fd: Option<OwnedFd>,
	net_addr: Option<NetAddr>,
	sock_addr: Option<SockAddr>,
	canceller: Canceller,
	wake: Option<RawFd>,
	pub read_timeout: Duration,
	pub write_timeout: Duration,
}

impl Conn {
	/// Takes ownership of a connected descriptor and re-arms the canceller.
	pub fn attach(&mut self, fd: OwnedFd, net_addr: NetAddr, sock_addr: SockAddr) -> Result<()> {
		self.wake = Some(self.canceller.arm()?);
		self.fd = Some(fd);
		self.net_addr = Some(net_addr);
		self.sock_addr = Some(sock_addr);
		Ok(())
	}

	pub fn raw(&self) -> Result<RawFd> {
		self.fd.as_ref().map(|fd| fd.as_raw_fd()).ok_or(Error::NotOpen)
	}

	/// The descriptor for a blocking transfer, cancellable through [`Conn::canceller`].
	pub fn io(&self) -> Result<Waitable> {
		Ok(Waitable { fd: self.raw()?, wake: self.wake })
	}

	pub fn canceller(&self) -> &Canceller {
		&self.canceller
	}

	pub fn fd(&self) -> Option<RawFd> {
		self.fd.as_ref().map(|fd| fd.as_raw_fd())
	}

	pub fn is_open(&self) -> bool {
		self.fd.is_some()
	}

	pub fn net_addr(&self) -> Option<&NetAddr> {
		self.net_addr.as_ref()
	}

	pub fn sock_addr(&self) -> Option<&SockAddr> {
		self.sock_addr.as_ref()
	}

	/// Releases the descriptor once; later calls are no-ops.
	pub fn close(&mut self) -> Result<()> {
		let Some(fd) = self.fd.take() else {
			return Ok(());
		};
		if let Some(addr) = &self.net_addr {
			debug!(network = addr.network(), %addr, "endpoint closed");
		}
		sys::close_fd(fd)
	}
}
