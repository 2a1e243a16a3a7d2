use std::io;
use std::os::fd::{AsFd, RawFd};
use std::time::Duration;

use tracing::{debug, warn};

use crate::addr::resolve::resolve_tcp;
use crate::addr::{NetAddr, SockAddr};
use crate::cancel::Canceller;
use crate::config::TcpConfig;
use crate::endpoint::conn::Conn;
use crate::error::Result;
use crate::socket::{self, build_socket, set_keepalive, set_nonblocking, set_tcp_nodelay};

/// A TCP client connection.
#[derive(Debug, Default)]
pub struct TcpEndpoint {
	conn: Conn,
}

impl TcpEndpoint {
	/// Creates an unopened endpoint.
	pub fn new() -> Self {
		Self::default()
	}

	/// Resolves, connects and configures the socket.
	///
	/// The connect is bounded by the write timeout (unbounded when zero). If
	/// any step fails the descriptor is released and the endpoint stays
	/// unopened.
	pub fn open(&mut self, config: &TcpConfig) -> Result<()> {
		self.close()?;

		let (net_addr, sock_addr) = resolve_tcp(config.network, &config.address)?;
		let fd = build_socket(sock_addr.family(), libc::SOCK_STREAM, libc::IPPROTO_TCP)?;

		set_tcp_nodelay(&fd, config.no_delay)?;
		set_keepalive(&fd, config.keep_alive)?;

		socket::pending::connect(fd.as_fd(), &sock_addr, config.write_timeout)?;
		set_nonblocking(&fd, true)?;

		debug!(%net_addr, no_delay = config.no_delay, keep_alive = ?config.keep_alive, "tcp connected");
		self.conn.attach(fd, net_addr, sock_addr)?;
		self.conn.read_timeout = config.read_timeout;
		self.conn.write_timeout = config.write_timeout;
		Ok(())
	}

	/// Reads what is available, waiting up to the read timeout for the first byte.
	/// Returns 0 at end of stream.
	pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
		let fd = self.conn.io()?;
		socket::io::read_fd(fd, buf, self.conn.read_timeout)
	}

	/// Writes once, possibly short, waiting up to the write timeout for room.
	pub fn write(&mut self, buf: &[u8]) -> Result<usize> {
		let fd = self.conn.io()?;
		socket::io::write_fd(fd, buf, self.conn.write_timeout)
	}

	/// Nothing is buffered; succeeds on an open endpoint.
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

	/// Zero blocks without bound.
	pub fn set_read_timeout(&mut self, timeout: Duration) {
		self.conn.read_timeout = timeout;
	}

	/// Zero blocks without bound.
	pub fn set_write_timeout(&mut self, timeout: Duration) {
		self.conn.write_timeout = timeout;
	}
}

impl Drop for TcpEndpoint {
	fn drop(&mut self) {
		if let Err(e) = self.close() {
			warn!(error = %e, "close on drop");
		}
	}
}

impl io::Read for TcpEndpoint {
	fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
		TcpEndpoint::read(self, buf).map_err(Into::into)
	}
}

impl io::Write for TcpEndpoint {
	fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
		TcpEndpoint::write(self, buf).map_err(Into::into)
	}

	fn flush(&mut self) -> io::Result<()> {
		TcpEndpoint::flush(self).map_err(Into::into)
	}
}
