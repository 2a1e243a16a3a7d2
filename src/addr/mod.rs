//! Network kinds, resolved addresses and raw socket addresses.
//!
//! Three low-level address types are supported:
//! - `SocketAddrV4`: `sockaddr_in`
//! - `SocketAddrV6`: `sockaddr_in6`, with zone index
//! - `UnixAddr`: `sockaddr_un`, filesystem or abstract
//!
//! `resolve` turns the textual configuration into a [`NetAddr`] for display
//! and a [`SockAddr`] for the syscalls.

mod ipv4;
mod ipv6;
mod unix;
pub(crate) mod resolve;

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

pub use self::ipv4::SocketAddrV4;
pub use self::ipv6::SocketAddrV6;
pub use self::unix::UnixAddr;

/// Network kind declared by a configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
	Tcp,
	Tcp4,
	Tcp6,
	Udp,
	Udp4,
	Udp6,
	Unix,
	Unixgram,
	Unixpacket,
}

impl Network {
	pub fn as_str(&self) -> &'static str {
		match self {
			Network::Tcp => "tcp",
			Network::Tcp4 => "tcp4",
			Network::Tcp6 => "tcp6",
			Network::Udp => "udp",
			Network::Udp4 => "udp4",
			Network::Udp6 => "udp6",
			Network::Unix => "unix",
			Network::Unixgram => "unixgram",
			Network::Unixpacket => "unixpacket",
		}
	}

	/// True for the kinds that only accept IPv4 addresses.
	pub fn is_v4_only(&self) -> bool {
		matches!(self, Network::Tcp4 | Network::Udp4)
	}

	/// True for the kinds that only accept IPv6 addresses.
	pub fn is_v6_only(&self) -> bool {
		matches!(self, Network::Tcp6 | Network::Udp6)
	}
}

impl fmt::Display for Network {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Network {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"tcp" => Ok(Network::Tcp),
			"tcp4" => Ok(Network::Tcp4),
			"tcp6" => Ok(Network::Tcp6),
			"udp" => Ok(Network::Udp),
			"udp4" => Ok(Network::Udp4),
			"udp6" => Ok(Network::Udp6),
			"unix" => Ok(Network::Unix),
			"unixgram" => Ok(Network::Unixgram),
			"unixpacket" => Ok(Network::Unixpacket),
			other => Err(Error::UnsupportedNetwork {
				network: other.to_string(),
				expected: "tcp, udp or unix variants",
			}),
		}
	}
}

/// A resolved IP endpoint. `ip` is `None` when the host part was empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InetAddr {
	pub ip: Option<IpAddr>,
	pub port: u16,
	pub zone: Option<String>,
}

impl fmt::Display for InetAddr {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match (&self.ip, &self.zone) {
			(None, _) => write!(f, ":{}", self.port),
			(Some(IpAddr::V4(ip)), _) => write!(f, "{}:{}", ip, self.port),
			(Some(IpAddr::V6(ip)), Some(zone)) => write!(f, "[{}%{}]:{}", ip, zone, self.port),
			(Some(IpAddr::V6(ip)), None) => write!(f, "[{}]:{}", ip, self.port),
		}
	}
}

/// Network address of an endpoint, as reported by `Endpoint::net_addr`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetAddr {
	Tcp(InetAddr),
	Udp(InetAddr),
	Unix(UnixAddr),
	Serial(String),
}

impl NetAddr {
	/// Name of the network, e.g. `"tcp"` or `"serial"`.
	pub fn network(&self) -> &'static str {
		match self {
			NetAddr::Tcp(_) => "tcp",
			NetAddr::Udp(_) => "udp",
			NetAddr::Unix(_) => "unix",
			NetAddr::Serial(_) => "serial",
		}
	}
}

impl fmt::Display for NetAddr {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			NetAddr::Tcp(a) | NetAddr::Udp(a) => a.fmt(f),
			NetAddr::Unix(a) => a.fmt(f),
			NetAddr::Serial(path) => f.write_str(path),
		}
	}
}

/// Low-level socket address handed to `connect`/`sendto`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SockAddr {
	V4(SocketAddrV4),
	V6(SocketAddrV6),
	Unix(UnixAddr),
}

impl SockAddr {
	/// Returns the address family constant (`AF_INET`, `AF_INET6`, `AF_UNIX`).
	pub fn family(&self) -> libc::c_int {
		match self {
			SockAddr::V4(_) => libc::AF_INET,
			SockAddr::V6(_) => libc::AF_INET6,
			SockAddr::Unix(_) => libc::AF_UNIX,
		}
	}
}

impl fmt::Display for SockAddr {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SockAddr::V4(a) => a.fmt(f),
			SockAddr::V6(a) => a.fmt(f),
			SockAddr::Unix(a) => a.fmt(f),
		}
	}
}

/// Trait for address types that can be converted to raw sockaddr for syscalls.
pub trait ToSockAddr {
	/// Calls the provided closure with a pointer to the raw sockaddr and its size.
	/// Returns None if the address is invalid (e.g., path too long for Unix).
	fn with_raw<F, R>(&self, f: F) -> Option<R>
	where
		F: FnOnce(*const libc::sockaddr, libc::socklen_t) -> R;
}
/*
The closure keeps sockaddr_in / sockaddr_in6 / sockaddr_un on the callee's
stack frame for exactly as long as the syscall needs the pointer.
 */

impl ToSockAddr for SockAddr {
	fn with_raw<F, R>(&self, f: F) -> Option<R>
	where
		F: FnOnce(*const libc::sockaddr, libc::socklen_t) -> R,
	{
		match self {
			SockAddr::V4(a) => a.with_raw(f),
			SockAddr::V6(a) => a.with_raw(f),
			SockAddr::Unix(a) => a.with_raw(f),
		}
	}
}
