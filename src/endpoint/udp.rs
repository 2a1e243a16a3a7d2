use std::io;
use std::os::fd::RawFd;
use std::time::Duration;

use tracing::{debug, warn};

use crate::addr::resolve::resolve_udp;
use crate::addr::{NetAddr, SockAddr, ToSockAddr};
use crate::cancel::Canceller;
use crate::config::UdpConfig;
use crate::endpoint::conn::Conn;
use crate::error::{Error, Result};
use crate::socket::{self, build_socket};

/// An unconnected UDP socket talking to one peer.
///
/// No `connect()` is issued: every write is a `sendto` to the resolved peer and
/// reads accept datagrams from anyone.
#[derive(Debug, Default)]
pub struct UdpEndpoint {
	conn: Conn,
}

impl UdpEndpoint {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn open(&mut self, config: &UdpConfig) -> Result<()> {
		self.close()?;

		let (net_addr, sock_addr) = resolve_udp(config.network, &config.address)?;
		let fd = build_socket(sock_addr.family(), libc::SOCK_DGRAM, libc::IPPROTO_UDP)?;

		debug!(%net_addr, "udp socket ready");
		self.conn.attach(fd, net_addr, sock_addr)?;
		self.conn.read_timeout = config.read_timeout;
		self.conn.write_timeout = config.write_timeout;
		Ok(())
	}

	/// Receives one datagram. Bytes beyond `buf.len()` are discarded by the kernel.
	pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
		let fd = self.conn.io()?;
		socket::io::recv_fd(fd, buf, self.conn.read_timeout)
	}

	/// Sends `buf` as one datagram. A short send is an error, never retried.
	pub fn write(&mut self, buf: &[u8]) -> Result<usize> {
		let fd = self.conn.io()?;
		let peer = self.conn.sock_addr().ok_or(Error::NotOpen)?;
		let timeout = self.conn.write_timeout;

		let sent = peer
			.with_raw(|ptr, len| socket::io::send_to_fd(fd, buf, ptr, len, timeout))
			.ok_or_else(|| Error::Write { errno: libc::EINVAL })??;

		if sent != buf.len() {
			return Err(Error::ShortSend { sent, requested: buf.len() });
		}
		Ok(sent)
	}

	pub fn flush(&mut self) -> Result<()> {
		self.conn.raw().map(|_| ())
	}

	pub fn close(&mut self) -> Result<()> {
		self.conn.close()
	}

	pub fn is_open(&self) -> bool {
		self.conn.is_open()
	}

	pub fn fd(&self) -> Option<RawFd> {
		self.conn.fd()
	}

	pub fn net_addr(&self) -> Option<&NetAddr> {
		self.conn.net_addr()
	}

	/// The peer datagrams are sent to.
	pub fn sock_addr(&self) -> Option<&SockAddr> {
		self.conn.sock_addr()
	}

	/// Handle that fails a blocked read or write from another thread.
	pub fn canceller(&self) -> &Canceller {
		self.conn.canceller()
	}

	pub fn read_timeout(&self) -> Duration {
		self.conn.read_timeout
	}

	pub fn write_timeout(&self) -> Duration {
		self.conn.write_timeout
	}

	pub fn set_read_timeout(&mut self, timeout: Duration) {
		self.conn.read_timeout = timeout;
	}

	pub fn set_write_timeout(&mut self, timeout: Duration) {
		self.conn.write_timeout = timeout;
	}
}

impl Drop for UdpEndpoint {
	fn drop(&mut self) {
		if let Err(e) = self.close() {
			warn!(error = %e, "close on drop");
		}
	}
}

impl io::Read for UdpEndpoint {
	fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
		UdpEndpoint::read(self, buf).map_err(Into::into)
	}
}

impl io::Write for UdpEndpoint {
	fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
		UdpEndpoint::write(self, buf).map_err(Into::into)
	}

	fn flush(&mut self) -> io::Result<()> {
		UdpEndpoint::flush(self).map_err(Into::into)
	}
}
