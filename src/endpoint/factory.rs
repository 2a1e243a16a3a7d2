use crate::config::EndpointConfig;
use crate::endpoint::{AnyEndpoint, SharedEndpoint, TcpEndpoint, UdpEndpoint, UnixEndpoint};
use crate::error::Result;
use crate::registry::ConnectionRegistry;
use crate::serial::SerialEndpoint;

/// Builds and opens the transport `config` describes.
pub fn open(config: &EndpointConfig) -> Result<AnyEndpoint> {
	match config {
		EndpointConfig::Tcp(c) => {
			let mut ep = TcpEndpoint::new();
			ep.open(c)?;
			Ok(ep.into())
		}
		EndpointConfig::Udp(c) => {
			let mut ep = UdpEndpoint::new();
			ep.open(c)?;
			Ok(ep.into())
		}
		EndpointConfig::Unix(c) => {
			let mut ep = UnixEndpoint::new();
			ep.open(c)?;
			Ok(ep.into())
		}
		EndpointConfig::Serial(c) => {
			let mut ep = SerialEndpoint::new();
			ep.open(c)?;
			Ok(ep.into())
		}
	}
}

/// Opens the endpoint and records it in `registry`.
///
/// A serial path is claimed before the device is touched: a second open of a
/// registered (or concurrently opening) path fails with
/// `Error::DuplicateResource` and leaves the line alone.
pub fn open_registered(config: &EndpointConfig, registry: &ConnectionRegistry) -> Result<SharedEndpoint> {
	match config {
		EndpointConfig::Serial(_) => {
			let claim = registry.reserve(config)?;
			let ep = open(config)?.shared();
			claim.commit(ep.clone());
			Ok(ep)
		}
		_ => {
			let ep = open(config)?.shared();
			registry.register(config, ep.clone())?;
			Ok(ep)
		}
	}
}
