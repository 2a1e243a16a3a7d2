//! Field-bus transport endpoints.
//!
//! One blocking, timeout-bounded read/write contract over TCP, UDP, Unix
//! stream sockets and serial lines (with RS-485 direction control), plus a
//! registry of open connections keyed by address.
//!
//! ```no_run
//! use fieldlink::{Endpoint, EndpointConfig, SerialConfig, Parity};
//!
//! let config: EndpointConfig = SerialConfig::new("/dev/ttyS1")
//!     .baud_rate(19200)
//!     .parity(Parity::Even)
//!     .into();
//! let mut line = fieldlink::open(&config)?;
//! line.write(&[0x01, 0x03, 0x00, 0x00, 0x00, 0x0a, 0xc5, 0xcd])?;
//! let mut reply = [0u8; 256];
//! let n = line.read(&mut reply)?;
//! # Ok::<(), fieldlink::Error>(())
//! ```

pub mod addr;
pub mod cancel;
pub mod config;
pub mod endpoint;
mod error;
pub mod registry;
pub mod serial;
pub mod socket;
mod sys;

pub use self::error::{Error, Result, TerminalError, errno};
pub use self::addr::{InetAddr, NetAddr, Network, SockAddr, SocketAddrV4, SocketAddrV6, ToSockAddr, UnixAddr};
pub use self::addr::resolve::{resolve_tcp, resolve_udp, resolve_unix};
pub use self::cancel::Canceller;
pub use self::config::{EndpointConfig, EndpointType, Parity, Rs485Config, SerialConfig, TcpConfig, UdpConfig, UnixConfig};
pub use self::endpoint::{AnyEndpoint, Endpoint, SharedEndpoint, TcpEndpoint, UdpEndpoint, UnixEndpoint, open, open_registered};
pub use self::registry::ConnectionRegistry;
pub use self::serial::SerialEndpoint;
