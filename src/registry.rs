//! Process-wide bookkeeping of open endpoints.
//!
//! Endpoints are keyed by the address name of their configuration. Socket
//! transports may share a key (several connections to one PLC); a serial device
//! path is exclusive. All per-key mutation happens under one lock, so
//! concurrent appends are never lost and the serial uniqueness check is atomic
//! with the insertion it guards.

use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::config::{EndpointConfig, EndpointType};
use crate::endpoint::{Endpoint, SharedEndpoint};
use crate::error::{Error, Result};

#[derive(Default)]
struct Entries {
	open: HashMap<String, Vec<SharedEndpoint>>,
	/// Serial paths whose device is being opened right now.
	opening: HashSet<String>,
}

impl Entries {
	fn claimed(&self, key: &str) -> bool {
		self.open.contains_key(key) || self.opening.contains(key)
	}
}

/// Map from address name to the endpoints open on it.
#[derive(Default)]
pub struct ConnectionRegistry {
	entries: Mutex<Entries>,
}

impl ConnectionRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Records `endpoint` under the address name of `config`.
	///
	/// A serial path already registered, or being opened, is refused with
	/// `Error::DuplicateResource`.
	pub fn register(&self, config: &EndpointConfig, endpoint: SharedEndpoint) -> Result<()> {
		let key = config.address_name();
		let mut entries = self.entries.lock();
		if config.endpoint_type() == EndpointType::Serial && entries.claimed(key) {
			return Err(Error::DuplicateResource { address: key.to_string() });
		}
		entries.open.entry(key.to_string()).or_default().push(endpoint);
		debug!(address = key, "endpoint registered");
		Ok(())
	}

	/// Endpoints registered under the address name of `config`, in
	/// registration order.
	pub fn lookup(&self, config: &EndpointConfig) -> Option<Vec<SharedEndpoint>> {
		self.entries.lock().open.get(config.address_name()).cloned()
	}

	/// Removes and returns the whole entry. The endpoints stay open.
	pub fn unregister(&self, config: &EndpointConfig) -> Option<Vec<SharedEndpoint>> {
		let removed = self.entries.lock().open.remove(config.address_name());
		if removed.is_some() {
			debug!(address = config.address_name(), "endpoints unregistered");
		}
		removed
	}

	/// Unregisters the entry and closes every endpoint in it.
	///
	/// Reads and writes blocked on these endpoints in other threads are
	/// cancelled first, so eviction does not wait for their timeouts. All
	/// endpoints are closed even if some fail; the first error is returned.
	/// Returns how many endpoints were evicted.
	pub fn evict(&self, config: &EndpointConfig) -> Result<usize> {
		let Some(endpoints) = self.unregister(config) else {
			return Ok(0);
		};
		for endpoint in &endpoints {
			endpoint.cancel();
		}
		let mut first_err = None;
		for endpoint in &endpoints {
			if let Err(e) = endpoint.lock().close() {
				warn!(address = config.address_name(), error = %e, "close during eviction");
				first_err.get_or_insert(e);
			}
		}
		match first_err {
			Some(e) => Err(e),
			None => Ok(endpoints.len()),
		}
	}

	/// Number of address names with at least one endpoint.
	pub fn len(&self) -> usize {
		self.entries.lock().open.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Claims a serial path before its device is opened.
	///
	/// Fails if the path is registered or already claimed. The claim is
	/// released when the returned guard is dropped or committed.
	pub(crate) fn reserve(&self, config: &EndpointConfig) -> Result<Reservation<'_>> {
		let key = config.address_name();
		let mut entries = self.entries.lock();
		if entries.claimed(key) {
			return Err(Error::DuplicateResource { address: key.to_string() });
		}
		entries.opening.insert(key.to_string());
		Ok(Reservation { registry: self, key: key.to_string() })
	}
}

/// A claimed serial path; see [`ConnectionRegistry::reserve`].
pub(crate) struct Reservation<'a> {
	registry: &'a ConnectionRegistry,
	key: String,
}

impl Reservation<'_> {
	/// Registers `endpoint` and drops the claim in one step.
	pub(crate) fn commit(self, endpoint: SharedEndpoint) {
		let mut entries = self.registry.entries.lock();
		entries.opening.remove(&self.key);
		entries.open.entry(self.key.clone()).or_default().push(endpoint);
		debug!(address = %self.key, "endpoint registered");
		// `self` drops after the lock guard; the claim is already gone
	}
}

impl Drop for Reservation<'_> {
	fn drop(&mut self) {
		self.registry.entries.lock().opening.remove(&self.key);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::{SerialConfig, TcpConfig};
	use crate::endpoint::{AnyEndpoint, TcpEndpoint};
	use crate::serial::SerialEndpoint;

	fn tcp(addr: &str) -> EndpointConfig {
		TcpConfig::new(addr).into()
	}

	fn serial(path: &str) -> EndpointConfig {
		SerialConfig::new(path).into()
	}

	fn unopened_tcp() -> SharedEndpoint {
		AnyEndpoint::from(TcpEndpoint::new()).shared()
	}

	#[test]
	fn socket_addresses_accumulate() {
		let reg = ConnectionRegistry::new();
		let cfg = tcp("10.0.0.5:502");
		let (a, b) = (unopened_tcp(), unopened_tcp());
		reg.register(&cfg, a.clone()).unwrap();
		reg.register(&cfg, b.clone()).unwrap();

		let found = reg.lookup(&cfg).unwrap();
		assert_eq!(found.len(), 2);
		assert!(SharedEndpoint::ptr_eq(&found[0], &a));
		assert!(SharedEndpoint::ptr_eq(&found[1], &b));
	}

	#[test]
	fn serial_path_is_exclusive() {
		let reg = ConnectionRegistry::new();
		let cfg = serial("/dev/ttyS7");
		reg.register(&cfg, AnyEndpoint::from(SerialEndpoint::new()).shared()).unwrap();
		let err = reg.register(&cfg, AnyEndpoint::from(SerialEndpoint::new()).shared()).unwrap_err();
		assert!(matches!(err, Error::DuplicateResource { address } if address == "/dev/ttyS7"));
		assert!(reg.reserve(&cfg).is_err());
	}

	#[test]
	fn unregister_removes_whole_entry() {
		let reg = ConnectionRegistry::new();
		let cfg = tcp("10.0.0.5:502");
		reg.register(&cfg, unopened_tcp()).unwrap();
		reg.register(&cfg, unopened_tcp()).unwrap();
		assert_eq!(reg.unregister(&cfg).map(|v| v.len()), Some(2));
		assert!(reg.lookup(&cfg).is_none());
		assert!(reg.unregister(&cfg).is_none());
		assert!(reg.is_empty());
	}

	#[test]
	fn reservation_blocks_until_released() {
		let reg = ConnectionRegistry::new();
		let cfg = serial("/dev/ttyUSB3");
		let claim = reg.reserve(&cfg).unwrap();
		assert!(matches!(reg.reserve(&cfg), Err(Error::DuplicateResource { .. })));
		assert!(reg.register(&cfg, unopened_tcp()).is_err());
		drop(claim);
		assert!(reg.lookup(&cfg).is_none());

		let claim = reg.reserve(&cfg).unwrap();
		claim.commit(AnyEndpoint::from(SerialEndpoint::new()).shared());
		assert_eq!(reg.lookup(&cfg).map(|v| v.len()), Some(1));
		assert!(reg.reserve(&cfg).is_err());
	}

	#[test]
	fn evict_closes_and_forgets() {
		let reg = ConnectionRegistry::new();
		let cfg = tcp("10.0.0.5:502");
		reg.register(&cfg, unopened_tcp()).unwrap();
		assert_eq!(reg.evict(&cfg).unwrap(), 1);
		assert_eq!(reg.evict(&cfg).unwrap(), 0);
		assert!(reg.lookup(&cfg).is_none());
	}
}
