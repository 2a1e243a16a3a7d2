use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use crate::addr::ToSockAddr;

/// `sockaddr_in6` counterpart: address, port and interface index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketAddrV6 {
	ip: Ipv6Addr,
	port: u16,
	scope_id: u32,
}

impl SocketAddrV6 {
	/// `scope_id` is the interface index a link-local (`fe80::/10`) peer is
	/// reached through; 0 lets the kernel choose.
	pub fn new(ip: Ipv6Addr, port: u16, scope_id: u32) -> Self {
		Self { ip, port, scope_id }
	}

	/// The unspecified address `[::]:port`.
	pub fn unspecified(port: u16, scope_id: u32) -> Self {
		Self::new(Ipv6Addr::UNSPECIFIED, port, scope_id)
	}

	pub fn ip(&self) -> Ipv6Addr {
		self.ip
	}

	pub fn port(&self) -> u16 {
		self.port
	}

	pub fn scope_id(&self) -> u32 {
		self.scope_id
	}

	/// The embedded IPv4 address of a `::ffff:a.b.c.d` address.
	pub fn ipv4_mapped(&self) -> Option<Ipv4Addr> {
		self.ip.to_ipv4_mapped()
	}

	pub(crate) fn to_raw(&self) -> libc::sockaddr_in6 {
		// zeroed: flow info stays 0, BSD's sin6_len is set by the kernel
		let mut raw: libc::sockaddr_in6 = unsafe { std::mem::zeroed() };
		raw.sin6_family = libc::AF_INET6 as libc::sa_family_t;
		raw.sin6_port = self.port.to_be();
		raw.sin6_addr.s6_addr = self.ip.octets();
		raw.sin6_scope_id = self.scope_id;
		raw
	}
}

impl fmt::Display for SocketAddrV6 {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.scope_id {
			0 => write!(f, "[{}]:{}", self.ip, self.port),
			zone => write!(f, "[{}%{}]:{}", self.ip, zone, self.port),
		}
	}
}

impl ToSockAddr for SocketAddrV6 {
	fn with_raw<F, R>(&self, f: F) -> Option<R>
	where
		F: FnOnce(*const libc::sockaddr, libc::socklen_t) -> R,
	{
		let raw = self.to_raw();
		Some(f(
			(&raw as *const libc::sockaddr_in6).cast(),
			std::mem::size_of_val(&raw) as libc::socklen_t,
		))
	}
}
