use std::io;
use std::os::fd::{AsFd, RawFd};
use std::time::Duration;

use tracing::{debug, warn};

use crate::addr::resolve::resolve_unix;
use crate::addr::{NetAddr, SockAddr};
use crate::cancel::Canceller;
use crate::config::UnixConfig;
use crate::endpoint::conn::Conn;
use crate::error::Result;
use crate::socket::{self, build_socket};

/// A connected Unix-domain stream socket.
#[derive(Debug, Default)]
pub struct UnixEndpoint {
	conn: Conn,
}

impl UnixEndpoint {
	pub fn new() -> Self {
		Self::default()
	}

	/// Connects to the socket at `config.address`. Only the `unix` network is
	/// accepted; datagram and seqpacket sockets are not.
	///
	/// A listener with a full backlog is waited on for up to the write timeout
	/// (unbounded when zero).
	pub fn open(&mut self, config: &UnixConfig) -> Result<()> {
		self.close()?;

		let (net_addr, sock_addr) = resolve_unix(config.network, &config.address)?;
		let fd = build_socket(libc::AF_UNIX, libc::SOCK_STREAM, 0)?;

		socket::pending::connect_blocking(fd.as_fd(), &sock_addr, config.write_timeout)?;

		debug!(%net_addr, "unix socket connected");
		self.conn.attach(fd, net_addr, sock_addr)?;
		self.conn.read_timeout = config.read_timeout;
		self.conn.write_timeout = config.write_timeout;
		Ok(())
	}

	pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
		let fd = self.conn.io()?;
		socket::io::read_fd(fd, buf, self.conn.read_timeout)
	}

	pub fn write(&mut self, buf: &[u8]) -> Result<usize> {
		let fd = self.conn.io()?;
		socket::io::write_fd(fd, buf, self.conn.write_timeout)
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

	/// The `sockaddr_un` the socket connected to.
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

impl Drop for UnixEndpoint {
	fn drop(&mut self) {
		if let Err(e) = self.close() {
			warn!(error = %e, "close on drop");
		}
	}
}

impl io::Read for UnixEndpoint {
	fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
		UnixEndpoint::read(self, buf).map_err(Into::into)
	}
}

impl io::Write for UnixEndpoint {
	fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
		UnixEndpoint::write(self, buf).map_err(Into::into)
	}

	fn flush(&mut self) -> io::Result<()> {
		UnixEndpoint::flush(self).map_err(Into::into)
	}
}
