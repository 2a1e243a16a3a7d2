use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use crate::addr::ToSockAddr;

/// `sockaddr_in` counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketAddrV4 {
	ip: Ipv4Addr,
	port: u16,
}

impl SocketAddrV4 {
	pub fn new(ip: Ipv4Addr, port: u16) -> Self {
		Self { ip, port }
	}

	/// `0.0.0.0:port`.
	pub fn unspecified(port: u16) -> Self {
		Self::new(Ipv4Addr::UNSPECIFIED, port)
	}

	/// Keeps the last four bytes of a v4-mapped IPv6 address.
	pub(crate) fn from_mapped(ip: Ipv6Addr, port: u16) -> Self {
		let o = ip.octets();
		Self::new(Ipv4Addr::new(o[12], o[13], o[14], o[15]), port)
	}

	pub fn ip(&self) -> Ipv4Addr {
		self.ip
	}

	pub fn port(&self) -> u16 {
		self.port
	}

	pub(crate) fn to_raw(&self) -> libc::sockaddr_in {
		let mut raw: libc::sockaddr_in = unsafe { std::mem::zeroed() };
		raw.sin_family = libc::AF_INET as libc::sa_family_t;
		raw.sin_port = self.port.to_be();
		// octets are already in network order
		raw.sin_addr.s_addr = u32::from_ne_bytes(self.ip.octets());
		raw
	}
}

impl fmt::Display for SocketAddrV4 {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}:{}", self.ip, self.port)
	}
}

impl ToSockAddr for SocketAddrV4 {
	fn with_raw<F, R>(&self, f: F) -> Option<R>
	where
		F: FnOnce(*const libc::sockaddr, libc::socklen_t) -> R,
	{
		let raw = self.to_raw();
		Some(f(
			(&raw as *const libc::sockaddr_in).cast(),
			std::mem::size_of_val(&raw) as libc::socklen_t,
		))
	}
}

/*
 sockaddr_in is zeroed first: BSD kernels carry an extra sin_len byte and
 every platform has the sin_zero padding.
  - sin_port: port in network byte order
  - sin_addr: address in network byte order
 */
