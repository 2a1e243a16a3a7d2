//! Transport endpoints behind one contract.
//!
//! Every transport is created unopened, opened from its configuration and then
//! used through the [`Endpoint`] trait. [`AnyEndpoint`] is the closed set of
//! transports the factory can build.

mod conn;
mod factory;
mod tcp;
mod udp;
mod unix;

use std::os::fd::RawFd;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};

use crate::addr::{NetAddr, SockAddr};
use crate::cancel::Canceller;
use crate::config::EndpointType;
use crate::error::Result;
use crate::serial::SerialEndpoint;

pub use self::factory::{open, open_registered};
pub use self::tcp::TcpEndpoint;
pub use self::udp::UdpEndpoint;
pub use self::unix::UnixEndpoint;

/// Operations common to every transport.
///
/// All I/O is blocking on the caller's thread and bounded by the endpoint's
/// timeouts. After `close`, I/O fails with `Error::NotOpen`.
pub trait Endpoint: Send {
	fn endpoint_type(&self) -> EndpointType;

	fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

	fn write(&mut self, buf: &[u8]) -> Result<usize>;

	/// No-op for sockets; discards pending line data for serial.
	fn flush(&mut self) -> Result<()>;

	/// Releases the descriptor. Idempotent.
	fn close(&mut self) -> Result<()>;

	/// The native descriptor while open.
	fn fd(&self) -> Option<RawFd>;

	fn net_addr(&self) -> Option<&NetAddr>;

	/// Raw socket address; always `None` for serial lines.
	fn sock_addr(&self) -> Option<&SockAddr>;

	fn read_timeout(&self) -> Duration;

	fn write_timeout(&self) -> Duration;

	fn set_read_timeout(&mut self, timeout: Duration);

	fn set_write_timeout(&mut self, timeout: Duration);

	/// Fails the current and later blocking waits with `Error::Cancelled`
	/// until the endpoint is opened again. Usable without `&mut self`.
	fn canceller(&self) -> &Canceller;
}

/// Handle shared between the registry and its users.
///
/// I/O goes through [`SharedEndpoint::lock`]. [`SharedEndpoint::cancel`] and
/// [`SharedEndpoint::close`] work while another thread holds the lock in a
/// blocking read or write: the cancel wakes that call, which then releases it.
#[derive(Debug, Clone)]
pub struct SharedEndpoint {
	endpoint: Arc<Mutex<AnyEndpoint>>,
	canceller: Canceller,
}

impl SharedEndpoint {
	pub fn new(endpoint: AnyEndpoint) -> Self {
		let canceller = endpoint.canceller().clone();
		Self { endpoint: Arc::new(Mutex::new(endpoint)), canceller }
	}

	pub fn lock(&self) -> MutexGuard<'_, AnyEndpoint> {
		self.endpoint.lock()
	}

	/// Wakes a blocked transfer without taking the lock.
	pub fn cancel(&self) {
		self.canceller.cancel();
	}

	/// Cancels in-flight I/O, then closes.
	pub fn close(&self) -> Result<()> {
		self.cancel();
		self.lock().close()
	}

	/// True if both handles refer to the same endpoint.
	pub fn ptr_eq(a: &Self, b: &Self) -> bool {
		Arc::ptr_eq(&a.endpoint, &b.endpoint)
	}
}

impl Endpoint for TcpEndpoint {
	fn endpoint_type(&self) -> EndpointType {
		EndpointType::Tcp
	}

	fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
		TcpEndpoint::read(self, buf)
	}

	fn write(&mut self, buf: &[u8]) -> Result<usize> {
		TcpEndpoint::write(self, buf)
	}

	fn flush(&mut self) -> Result<()> {
		TcpEndpoint::flush(self)
	}

	fn close(&mut self) -> Result<()> {
		TcpEndpoint::close(self)
	}

	fn fd(&self) -> Option<RawFd> {
		TcpEndpoint::fd(self)
	}

	fn net_addr(&self) -> Option<&NetAddr> {
		TcpEndpoint::net_addr(self)
	}

	fn sock_addr(&self) -> Option<&SockAddr> {
		TcpEndpoint::sock_addr(self)
	}

	fn read_timeout(&self) -> Duration {
		TcpEndpoint::read_timeout(self)
	}

	fn write_timeout(&self) -> Duration {
		TcpEndpoint::write_timeout(self)
	}

	fn set_read_timeout(&mut self, timeout: Duration) {
		TcpEndpoint::set_read_timeout(self, timeout)
	}

	fn set_write_timeout(&mut self, timeout: Duration) {
		TcpEndpoint::set_write_timeout(self, timeout)
	}

	fn canceller(&self) -> &Canceller {
		TcpEndpoint::canceller(self)
	}
}

impl Endpoint for UdpEndpoint {
	fn endpoint_type(&self) -> EndpointType {
		EndpointType::Udp
	}

	fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
		UdpEndpoint::read(self, buf)
	}

	fn write(&mut self, buf: &[u8]) -> Result<usize> {
		UdpEndpoint::write(self, buf)
	}

	fn flush(&mut self) -> Result<()> {
		UdpEndpoint::flush(self)
	}

	fn close(&mut self) -> Result<()> {
		UdpEndpoint::close(self)
	}

	fn fd(&self) -> Option<RawFd> {
		UdpEndpoint::fd(self)
	}

	fn net_addr(&self) -> Option<&NetAddr> {
		UdpEndpoint::net_addr(self)
	}

	fn sock_addr(&self) -> Option<&SockAddr> {
		UdpEndpoint::sock_addr(self)
	}

	fn read_timeout(&self) -> Duration {
		UdpEndpoint::read_timeout(self)
	}

	fn write_timeout(&self) -> Duration {
		UdpEndpoint::write_timeout(self)
	}

	fn set_read_timeout(&mut self, timeout: Duration) {
		UdpEndpoint::set_read_timeout(self, timeout)
	}

	fn set_write_timeout(&mut self, timeout: Duration) {
		UdpEndpoint::set_write_timeout(self, timeout)
	}

	fn canceller(&self) -> &Canceller {
		UdpEndpoint::canceller(self)
	}
}

impl Endpoint for UnixEndpoint {
	fn endpoint_type(&self) -> EndpointType {
		EndpointType::Unix
	}

	fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
		UnixEndpoint::read(self, buf)
	}

	fn write(&mut self, buf: &[u8]) -> Result<usize> {
		UnixEndpoint::write(self, buf)
	}

	fn flush(&mut self) -> Result<()> {
		UnixEndpoint::flush(self)
	}

	fn close(&mut self) -> Result<()> {
		UnixEndpoint::close(self)
	}

	fn fd(&self) -> Option<RawFd> {
		UnixEndpoint::fd(self)
	}

	fn net_addr(&self) -> Option<&NetAddr> {
		UnixEndpoint::net_addr(self)
	}

	fn sock_addr(&self) -> Option<&SockAddr> {
		UnixEndpoint::sock_addr(self)
	}

	fn read_timeout(&self) -> Duration {
		UnixEndpoint::read_timeout(self)
	}

	fn write_timeout(&self) -> Duration {
		UnixEndpoint::write_timeout(self)
	}

	fn set_read_timeout(&mut self, timeout: Duration) {
		UnixEndpoint::set_read_timeout(self, timeout)
	}

	fn set_write_timeout(&mut self, timeout: Duration) {
		UnixEndpoint::set_write_timeout(self, timeout)
	}

	fn canceller(&self) -> &Canceller {
		UnixEndpoint::canceller(self)
	}
}

impl Endpoint for SerialEndpoint {
	fn endpoint_type(&self) -> EndpointType {
		EndpointType::Serial
	}

	fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
		SerialEndpoint::read(self, buf)
	}

	fn write(&mut self, buf: &[u8]) -> Result<usize> {
		SerialEndpoint::write(self, buf)
	}

	fn flush(&mut self) -> Result<()> {
		SerialEndpoint::flush(self)
	}

	fn close(&mut self) -> Result<()> {
		SerialEndpoint::close(self)
	}

	fn fd(&self) -> Option<RawFd> {
		SerialEndpoint::fd(self)
	}

	fn net_addr(&self) -> Option<&NetAddr> {
		SerialEndpoint::net_addr(self)
	}

	fn sock_addr(&self) -> Option<&SockAddr> {
		None
	}

	fn read_timeout(&self) -> Duration {
		SerialEndpoint::read_timeout(self)
	}

	fn write_timeout(&self) -> Duration {
		SerialEndpoint::write_timeout(self)
	}

	fn set_read_timeout(&mut self, timeout: Duration) {
		SerialEndpoint::set_read_timeout(self, timeout)
	}

	fn set_write_timeout(&mut self, timeout: Duration) {
		SerialEndpoint::set_write_timeout(self, timeout)
	}

	fn canceller(&self) -> &Canceller {
		SerialEndpoint::canceller(self)
	}
}

/// One endpoint of any transport.
#[derive(Debug)]
pub enum AnyEndpoint {
	Tcp(TcpEndpoint),
	Udp(UdpEndpoint),
	Unix(UnixEndpoint),
	Serial(SerialEndpoint),
}

impl AnyEndpoint {
	fn inner(&self) -> &dyn Endpoint {
		match self {
			AnyEndpoint::Tcp(e) => e,
			AnyEndpoint::Udp(e) => e,
			AnyEndpoint::Unix(e) => e,
			AnyEndpoint::Serial(e) => e,
		}
	}

	fn inner_mut(&mut self) -> &mut dyn Endpoint {
		match self {
			AnyEndpoint::Tcp(e) => e,
			AnyEndpoint::Udp(e) => e,
			AnyEndpoint::Unix(e) => e,
			AnyEndpoint::Serial(e) => e,
		}
	}

	/// Wraps the endpoint in a [`SharedEndpoint`] handle.
	pub fn shared(self) -> SharedEndpoint {
		SharedEndpoint::new(self)
	}
}

impl Endpoint for AnyEndpoint {
	fn endpoint_type(&self) -> EndpointType {
		self.inner().endpoint_type()
	}

	fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
		self.inner_mut().read(buf)
	}

	fn write(&mut self, buf: &[u8]) -> Result<usize> {
		self.inner_mut().write(buf)
	}

	fn flush(&mut self) -> Result<()> {
		self.inner_mut().flush()
	}

	fn close(&mut self) -> Result<()> {
		self.inner_mut().close()
	}

	fn fd(&self) -> Option<RawFd> {
		self.inner().fd()
	}

	fn net_addr(&self) -> Option<&NetAddr> {
		self.inner().net_addr()
	}

	fn sock_addr(&self) -> Option<&SockAddr> {
		self.inner().sock_addr()
	}

	fn read_timeout(&self) -> Duration {
		self.inner().read_timeout()
	}

	fn write_timeout(&self) -> Duration {
		self.inner().write_timeout()
	}

	fn set_read_timeout(&mut self, timeout: Duration) {
		self.inner_mut().set_read_timeout(timeout)
	}

	fn set_write_timeout(&mut self, timeout: Duration) {
		self.inner_mut().set_write_timeout(timeout)
	}

	fn canceller(&self) -> &Canceller {
		self.inner().canceller()
	}
}

impl From<TcpEndpoint> for AnyEndpoint {
	fn from(e: TcpEndpoint) -> Self {
		AnyEndpoint::Tcp(e)
	}
}

impl From<UdpEndpoint> for AnyEndpoint {
	fn from(e: UdpEndpoint) -> Self {
		AnyEndpoint::Udp(e)
	}
}

impl From<UnixEndpoint> for AnyEndpoint {
	fn from(e: UnixEndpoint) -> Self {
		AnyEndpoint::Unix(e)
	}
}

impl From<SerialEndpoint> for AnyEndpoint {
	fn from(e: SerialEndpoint) -> Self {
		AnyEndpoint::Serial(e)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::Error;

	#[test]
	fn unopened_endpoints_report_their_type() {
		let cases: [(AnyEndpoint, EndpointType); 4] = [
			(TcpEndpoint::new().into(), EndpointType::Tcp),
			(UdpEndpoint::new().into(), EndpointType::Udp),
			(UnixEndpoint::new().into(), EndpointType::Unix),
			(SerialEndpoint::new().into(), EndpointType::Serial),
		];
		for (mut ep, ty) in cases {
			assert_eq!(ep.endpoint_type(), ty);
			assert!(ep.fd().is_none());
			assert!(ep.net_addr().is_none());
			assert!(ep.sock_addr().is_none());
			assert!(matches!(ep.write(b"x"), Err(Error::NotOpen)));
			ep.close().unwrap();
		}
	}

	#[test]
	fn shared_handles_share_one_canceller() {
		let a = AnyEndpoint::from(UdpEndpoint::new()).shared();
		let b = a.clone();
		let other = AnyEndpoint::from(UdpEndpoint::new()).shared();
		assert!(SharedEndpoint::ptr_eq(&a, &b));
		assert!(!SharedEndpoint::ptr_eq(&a, &other));

		b.cancel();
		assert!(a.lock().canceller().is_cancelled());
		assert!(!other.lock().canceller().is_cancelled());
		a.close().unwrap();
	}

	#[test]
	fn timeout_setters() {
		let mut ep: AnyEndpoint = TcpEndpoint::new().into();
		ep.set_read_timeout(Duration::from_millis(150));
		ep.set_write_timeout(Duration::from_millis(40));
		assert_eq!(ep.read_timeout(), Duration::from_millis(150));
		assert_eq!(ep.write_timeout(), Duration::from_millis(40));
	}
}
