//! Textual address resolution for the socket transports.
//!
//! The effective IP version comes from the resolved address itself: an IPv4
//! (or v4-mapped IPv6) address always yields a `sockaddr_in`, whatever variant
//! was declared. Only when the host part is empty does the declared variant
//! pick the family.

use std::ffi::CString;
use std::net::{IpAddr, SocketAddr, ToSocketAddrs};

use crate::addr::{InetAddr, NetAddr, Network, SockAddr, SocketAddrV4, SocketAddrV6, UnixAddr};
use crate::error::{Error, Result};

/// Which protocol family of network kinds a resolution accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Proto {
	Tcp,
	Udp,
}

impl Proto {
	fn accepts(&self, network: Network) -> bool {
		match self {
			Proto::Tcp => matches!(network, Network::Tcp | Network::Tcp4 | Network::Tcp6),
			Proto::Udp => matches!(network, Network::Udp | Network::Udp4 | Network::Udp6),
		}
	}

	fn expected(&self) -> &'static str {
		match self {
			Proto::Tcp => "tcp, tcp4 or tcp6",
			Proto::Udp => "udp, udp4 or udp6",
		}
	}
}

fn resolution_error(network: Network, address: &str, reason: impl Into<String>) -> Error {
	Error::AddressResolution {
		network: network.to_string(),
		address: address.to_string(),
		reason: reason.into(),
	}
}

/// Resolves a TCP address into its network and socket address.
pub fn resolve_tcp(network: Network, address: &str) -> Result<(NetAddr, SockAddr)> {
	let (inet, sa) = resolve_inet(Proto::Tcp, network, address)?;
	Ok((NetAddr::Tcp(inet), sa))
}

/// Resolves a UDP address into its network and socket address.
pub fn resolve_udp(network: Network, address: &str) -> Result<(NetAddr, SockAddr)> {
	let (inet, sa) = resolve_inet(Proto::Udp, network, address)?;
	Ok((NetAddr::Udp(inet), sa))
}

/// Resolves a Unix socket path. Only the `unix` (stream) kind is accepted.
pub fn resolve_unix(network: Network, address: &str) -> Result<(NetAddr, SockAddr)> {
	if network != Network::Unix {
		return Err(Error::UnsupportedNetwork {
			network: network.to_string(),
			expected: "unix",
		});
	}
	let addr = UnixAddr::parse(address);
	if !addr.fits() {
		return Err(resolution_error(network, address, "path too long"));
	}
	Ok((NetAddr::Unix(addr.clone()), SockAddr::Unix(addr)))
}

pub(crate) fn resolve_inet(proto: Proto, network: Network, address: &str) -> Result<(InetAddr, SockAddr)> {
	if !proto.accepts(network) {
		return Err(resolution_error(network, address, format!("network must be {}", proto.expected())));
	}

	let (host, port) = split_host_port(address).map_err(|reason| resolution_error(network, address, reason))?;
	let port: u16 = port
		.parse()
		.map_err(|_| resolution_error(network, address, format!("invalid port {:?}", port)))?;

	let (host, zone) = match host.split_once('%') {
		Some((h, z)) => (h, Some(z.to_string())),
		None => (host, None),
	};

	let ip = if host.is_empty() {
		None
	} else {
		Some(lookup_host(network, address, host, port, zone.is_some())?)
	};

	let sa = match ip {
		Some(IpAddr::V4(v4)) => SockAddr::V4(SocketAddrV4::new(v4, port)),
		Some(IpAddr::V6(v6)) if v6.to_ipv4_mapped().is_some() => SockAddr::V4(SocketAddrV4::from_mapped(v6, port)),
		Some(IpAddr::V6(v6)) => SockAddr::V6(SocketAddrV6::new(v6, port, zone_index(zone.as_deref())?)),
		None if network.is_v6_only() => SockAddr::V6(SocketAddrV6::unspecified(port, zone_index(zone.as_deref())?)),
		None => SockAddr::V4(SocketAddrV4::unspecified(port)),
	};

	Ok((InetAddr { ip, port, zone }, sa))
}

/// Splits `host:port` or `[host]:port`.
fn split_host_port(address: &str) -> std::result::Result<(&str, &str), &'static str> {
	if let Some(rest) = address.strip_prefix('[') {
		let (host, tail) = rest.split_once(']').ok_or("missing ']' in address")?;
		let port = tail.strip_prefix(':').ok_or("missing port in address")?;
		return Ok((host, port));
	}
	let (host, port) = address.rsplit_once(':').ok_or("missing port in address")?;
	if host.contains(':') {
		return Err("too many colons in address");
	}
	if host.contains('[') || host.contains(']') {
		return Err("unexpected bracket in address");
	}
	Ok((host, port))
}

/// Turns the host part into one IP, honoring the declared family.
fn lookup_host(network: Network, address: &str, host: &str, port: u16, zoned: bool) -> Result<IpAddr> {
	// literals are taken as written; the family check applies to lookups only
	let candidates: Vec<IpAddr> = match host.parse::<IpAddr>() {
		Ok(ip) => return Ok(ip),
		Err(_) if zoned => return Err(resolution_error(network, address, "zone on a non-literal host")),
		Err(_) => (host, port)
			.to_socket_addrs()
			.map_err(|e| resolution_error(network, address, e.to_string()))?
			.map(|sa: SocketAddr| sa.ip())
			.collect(),
	};

	let is_v4 = |ip: &IpAddr| match ip {
		IpAddr::V4(_) => true,
		IpAddr::V6(v6) => v6.to_ipv4_mapped().is_some(),
	};

	let picked = if network.is_v4_only() {
		candidates.iter().find(|ip| is_v4(ip))
	} else if network.is_v6_only() {
		candidates.iter().find(|ip| !is_v4(ip))
	} else {
		candidates.iter().find(|ip| is_v4(ip)).or(candidates.first())
	};

	picked
		.copied()
		.ok_or_else(|| resolution_error(network, address, "no suitable address found"))
}

/// Resolves an IPv6 zone to an interface index.
///
/// A numeric zone must name an existing interface; `0` means no zone.
fn zone_index(zone: Option<&str>) -> Result<u32> {
	let Some(zone) = zone else {
		return Ok(0);
	};
	if zone.is_empty() {
		return Ok(0);
	}

	let unknown = || Error::UnsupportedInterface { zone: zone.to_string() };
	if let Ok(index) = zone.parse::<u32>() {
		if index == 0 {
			return Ok(0);
		}
		let mut name = [0 as libc::c_char; libc::IF_NAMESIZE];
		if unsafe { libc::if_indextoname(index, name.as_mut_ptr()) }.is_null() {
			return Err(unknown());
		}
		return Ok(index);
	}

	let name = CString::new(zone).map_err(|_| unknown())?;
	let index = unsafe { libc::if_nametoindex(name.as_ptr()) };
	if index == 0 {
		return Err(unknown());
	}
	Ok(index)
}
