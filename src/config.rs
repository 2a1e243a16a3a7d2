//! Endpoint configuration.
//!
//! Each transport has its own struct with builder-style setters; the closed
//! [`EndpointConfig`] sum type is what the factory and the registry consume.
//! All structs deserialize with camelCase field names and millisecond
//! durations, e.g.
//!
//! ```json
//! { "type": "serial", "address": "/dev/ttyS1", "baudRate": 19200, "parity": "even",
//!   "rs485": { "enabled": true, "rtsHighDuringSend": true } }
//! ```

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::addr::Network;
use crate::error::Error;

/// Transport kind of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointType {
	Tcp,
	Unix,
	Udp,
	Serial,
}

impl EndpointType {
	pub fn as_str(&self) -> &'static str {
		match self {
			EndpointType::Tcp => "tcp",
			EndpointType::Unix => "unix",
			EndpointType::Udp => "udp",
			EndpointType::Serial => "serial",
		}
	}
}

impl fmt::Display for EndpointType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for EndpointType {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"tcp" => Ok(EndpointType::Tcp),
			"unix" => Ok(EndpointType::Unix),
			"udp" => Ok(EndpointType::Udp),
			"serial" => Ok(EndpointType::Serial),
			other => Err(Error::UnknownType(other.to_string())),
		}
	}
}

/// Configuration of any endpoint, tagged by `"type"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EndpointConfig {
	Tcp(TcpConfig),
	Unix(UnixConfig),
	Udp(UdpConfig),
	Serial(SerialConfig),
}

impl EndpointConfig {
	pub fn endpoint_type(&self) -> EndpointType {
		match self {
			EndpointConfig::Tcp(_) => EndpointType::Tcp,
			EndpointConfig::Unix(_) => EndpointType::Unix,
			EndpointConfig::Udp(_) => EndpointType::Udp,
			EndpointConfig::Serial(_) => EndpointType::Serial,
		}
	}

	/// Registry key: the host address, socket path or device path.
	pub fn address_name(&self) -> &str {
		match self {
			EndpointConfig::Tcp(c) => &c.address,
			EndpointConfig::Unix(c) => &c.address,
			EndpointConfig::Udp(c) => &c.address,
			EndpointConfig::Serial(c) => &c.address,
		}
	}
}

impl From<TcpConfig> for EndpointConfig {
	fn from(c: TcpConfig) -> Self {
		EndpointConfig::Tcp(c)
	}
}

impl From<UdpConfig> for EndpointConfig {
	fn from(c: UdpConfig) -> Self {
		EndpointConfig::Udp(c)
	}
}

impl From<UnixConfig> for EndpointConfig {
	fn from(c: UnixConfig) -> Self {
		EndpointConfig::Unix(c)
	}
}

impl From<SerialConfig> for EndpointConfig {
	fn from(c: SerialConfig) -> Self {
		EndpointConfig::Serial(c)
	}
}

// ============================================================================
// Socket transports
// ============================================================================

/// TCP client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TcpConfig {
	/// tcp, tcp4 or tcp6.
	pub network: Network,
	/// `host:port`, e.g. `192.168.1.1:502`.
	pub address: String,
	/// Keep-alive period; zero disables keep-alive.
	#[serde(with = "millis")]
	pub keep_alive: Duration,
	pub no_delay: bool,
	#[serde(with = "millis")]
	pub read_timeout: Duration,
	#[serde(with = "millis")]
	pub write_timeout: Duration,
}

impl Default for TcpConfig {
	fn default() -> Self {
		Self {
			network: Network::Tcp,
			address: String::new(),
			keep_alive: Duration::ZERO,
			no_delay: true,
			read_timeout: Duration::ZERO,
			write_timeout: Duration::ZERO,
		}
	}
}

impl TcpConfig {
	pub fn new(address: impl Into<String>) -> Self {
		Self {
			address: address.into(),
			..Self::default()
		}
	}

	pub fn network(mut self, network: Network) -> Self {
		self.network = network;
		self
	}

	pub fn keep_alive(mut self, period: Duration) -> Self {
		self.keep_alive = period;
		self
	}

	pub fn no_delay(mut self, enable: bool) -> Self {
		self.no_delay = enable;
		self
	}

	pub fn read_timeout(mut self, timeout: Duration) -> Self {
		self.read_timeout = timeout;
		self
	}

	pub fn write_timeout(mut self, timeout: Duration) -> Self {
		self.write_timeout = timeout;
		self
	}
}

/// UDP peer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UdpConfig {
	/// udp, udp4 or udp6.
	pub network: Network,
	pub address: String,
	#[serde(with = "millis")]
	pub read_timeout: Duration,
	#[serde(with = "millis")]
	pub write_timeout: Duration,
}

impl Default for UdpConfig {
	fn default() -> Self {
		Self {
			network: Network::Udp,
			address: String::new(),
			read_timeout: Duration::ZERO,
			write_timeout: Duration::ZERO,
		}
	}
}

impl UdpConfig {
	pub fn new(address: impl Into<String>) -> Self {
		Self {
			address: address.into(),
			..Self::default()
		}
	}

	pub fn network(mut self, network: Network) -> Self {
		self.network = network;
		self
	}

	pub fn read_timeout(mut self, timeout: Duration) -> Self {
		self.read_timeout = timeout;
		self
	}

	pub fn write_timeout(mut self, timeout: Duration) -> Self {
		self.write_timeout = timeout;
		self
	}
}

/// Unix stream socket configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UnixConfig {
	/// Must be `unix`.
	pub network: Network,
	/// Socket path, e.g. `/tmp/gateway.sock`; `@name` for an abstract socket.
	pub address: String,
	#[serde(with = "millis")]
	pub read_timeout: Duration,
	#[serde(with = "millis")]
	pub write_timeout: Duration,
}

impl Default for UnixConfig {
	fn default() -> Self {
		Self {
			network: Network::Unix,
			address: String::new(),
			read_timeout: Duration::ZERO,
			write_timeout: Duration::ZERO,
		}
	}
}

impl UnixConfig {
	pub fn new(address: impl Into<String>) -> Self {
		Self {
			address: address.into(),
			..Self::default()
		}
	}

	pub fn network(mut self, network: Network) -> Self {
		self.network = network;
		self
	}

	pub fn read_timeout(mut self, timeout: Duration) -> Self {
		self.read_timeout = timeout;
		self
	}

	pub fn write_timeout(mut self, timeout: Duration) -> Self {
		self.write_timeout = timeout;
		self
	}
}

// ============================================================================
// Serial line
// ============================================================================

/// Parity mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
	#[default]
	None,
	Odd,
	Even,
	/// Parity bit always 1.
	Mark,
	/// Parity bit always 0.
	Space,
}

impl TryFrom<u8> for Parity {
	type Error = Error;

	/// Numeric codes 0..=4: none, odd, even, mark, space.
	fn try_from(code: u8) -> Result<Self, Self::Error> {
		match code {
			0 => Ok(Parity::None),
			1 => Ok(Parity::Odd),
			2 => Ok(Parity::Even),
			3 => Ok(Parity::Mark),
			4 => Ok(Parity::Space),
			other => Err(crate::error::TerminalError::Parity(other.to_string()).into()),
		}
	}
}

impl fmt::Display for Parity {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Parity::None => "none",
			Parity::Odd => "odd",
			Parity::Even => "even",
			Parity::Mark => "mark",
			Parity::Space => "space",
		})
	}
}

/// RS-485 direction control.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Rs485Config {
	pub enabled: bool,
	/// RTS delay before send, in milliseconds.
	pub delay_rts_before_send: u32,
	/// RTS delay after send, in milliseconds.
	pub delay_rts_after_send: u32,
	pub rts_high_during_send: bool,
	pub rts_high_after_send: bool,
	/// Keep receiving while transmitting.
	pub rx_during_tx: bool,
}

impl Rs485Config {
	pub fn enabled() -> Self {
		Self { enabled: true, ..Self::default() }
	}

	pub fn delays(mut self, before_send_ms: u32, after_send_ms: u32) -> Self {
		self.delay_rts_before_send = before_send_ms;
		self.delay_rts_after_send = after_send_ms;
		self
	}

	pub fn rts_high_during_send(mut self, enable: bool) -> Self {
		self.rts_high_during_send = enable;
		self
	}

	pub fn rts_high_after_send(mut self, enable: bool) -> Self {
		self.rts_high_after_send = enable;
		self
	}

	pub fn rx_during_tx(mut self, enable: bool) -> Self {
		self.rx_during_tx = enable;
		self
	}
}

/// Serial line configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SerialConfig {
	/// Device path, e.g. `/dev/ttyS0`.
	pub address: String,
	pub baud_rate: u32,
	/// 5, 6, 7 or 8.
	pub data_bits: u8,
	/// 1 or 2 (0 is taken as 1).
	pub stop_bits: u8,
	pub parity: Parity,
	/// Budget for one complete read; zero selects 5000 ms.
	#[serde(with = "millis")]
	pub read_timeout: Duration,
	/// Budget for one complete write; zero selects 1000 ms.
	#[serde(with = "millis")]
	pub write_timeout: Duration,
	/// Once data has arrived, a quiet gap this long ends the read. Zero disables.
	#[serde(with = "millis")]
	pub inter_byte_timeout: Duration,
	pub rs485: Rs485Config,
}

impl Default for SerialConfig {
	fn default() -> Self {
		Self {
			address: String::new(),
			baud_rate: 9600,
			data_bits: 8,
			stop_bits: 1,
			parity: Parity::None,
			read_timeout: Duration::ZERO,
			write_timeout: Duration::ZERO,
			inter_byte_timeout: Duration::ZERO,
			rs485: Rs485Config::default(),
		}
	}
}

impl SerialConfig {
	pub fn new(address: impl Into<String>) -> Self {
		Self {
			address: address.into(),
			..Self::default()
		}
	}

	pub fn baud_rate(mut self, rate: u32) -> Self {
		self.baud_rate = rate;
		self
	}

	pub fn data_bits(mut self, bits: u8) -> Self {
		self.data_bits = bits;
		self
	}

	pub fn stop_bits(mut self, bits: u8) -> Self {
		self.stop_bits = bits;
		self
	}

	pub fn parity(mut self, parity: Parity) -> Self {
		self.parity = parity;
		self
	}

	pub fn read_timeout(mut self, timeout: Duration) -> Self {
		self.read_timeout = timeout;
		self
	}

	pub fn write_timeout(mut self, timeout: Duration) -> Self {
		self.write_timeout = timeout;
		self
	}

	pub fn inter_byte_timeout(mut self, timeout: Duration) -> Self {
		self.inter_byte_timeout = timeout;
		self
	}

	pub fn rs485(mut self, config: Rs485Config) -> Self {
		self.rs485 = config;
		self
	}
}

/// Durations as integer milliseconds.
mod millis {
	use std::time::Duration;

	use serde::{Deserialize, Deserializer, Serializer};

	pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
		s.serialize_u64(d.as_millis().min(u64::MAX as u128) as u64)
	}

	/// Negative values are accepted and read as zero, i.e. "use the default".
	pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
		let ms = i64::deserialize(d)?;
		Ok(Duration::from_millis(ms.max(0) as u64))
	}
}
