use std::time::Duration;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Endpoint errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("resolve {network} {address:?}: {reason}")]
	AddressResolution { network: String, address: String, reason: String },

	#[error("network {network:?} is not supported here, only {expected}")]
	UnsupportedNetwork { network: String, expected: &'static str },

	#[error("no network interface named {zone:?}")]
	UnsupportedInterface { zone: String },

	#[error("{call}() failed: {}", errno_to_str(*.errno))]
	SocketCreation { errno: i32, call: &'static str },

	#[error("setsockopt({option}) failed: {}", errno_to_str(*.errno))]
	SocketOption { errno: i32, option: &'static str },

	#[error("connect({addr}) failed: {}", errno_to_str(*.errno))]
	Connect { errno: i32, addr: String },

	#[error("open serial {path}: {}", errno_to_str(*.errno))]
	SerialOpen { errno: i32, path: String },

	#[error("open serial {path}: {} (too many files open)", errno_to_str(*.errno))]
	TooManyFiles { errno: i32, path: String },

	#[error("serial: {0}")]
	Terminal(#[from] TerminalError),

	#[error("serial: RS-485 ioctl failed: {}", errno_to_str(*.errno))]
	Rs485 { errno: i32 },

	#[error("serial: RS-485 ioctl returned unknown status {0}")]
	UnknownRs485(i32),

	#[error("{op} timed out after {timeout:?}")]
	Timeout { op: &'static str, timeout: Duration },

	#[error("write overflow: {written} > {requested}")]
	Overflow { written: usize, requested: usize },

	#[error("{address} is already open")]
	DuplicateResource { address: String },

	#[error("unknown endpoint type {0:?}")]
	UnknownType(String),

	#[error("read() failed: {}", errno_to_str(*.errno))]
	Read { errno: i32 },

	#[error("write() failed: {}", errno_to_str(*.errno))]
	Write { errno: i32 },

	#[error("short send: {sent} of {requested} bytes")]
	ShortSend { sent: usize, requested: usize },

	#[error("descriptor was ready but read no data")]
	NoData,

	#[error("poll() failed: {}", errno_to_str(*.errno))]
	Wait { errno: i32 },

	#[error("flush failed: {}", errno_to_str(*.errno))]
	Flush { errno: i32 },

	#[error("flush returned unknown status {0}")]
	UnknownFlush(i32),

	#[error("close() failed: {}", errno_to_str(*.errno))]
	Close { errno: i32 },

	#[error("endpoint is not open")]
	NotOpen,

	#[error("operation cancelled")]
	Cancelled,
}

/// Serial line configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TerminalError {
	#[error("unsupported baud rate {0}")]
	BaudRate(u32),

	#[error("unsupported character size {0}")]
	DataBits(u8),

	#[error("unsupported stop bits {0}")]
	StopBits(u8),

	#[error("unsupported parity {0}")]
	Parity(String),

	#[error("could not apply terminal attributes: {}", errno_to_str(*.errno))]
	Apply { errno: i32 },
}

/// Returns current errno value.
#[inline]
pub fn errno() -> i32 {
	std::io::Error::last_os_error().raw_os_error().unwrap_or(0)
}

/// Converts errno to human-readable string.
fn errno_to_str(errno: i32) -> String {
	match errno {
		libc::EACCES => "permission denied".into(),
		libc::EADDRINUSE => "address already in use".into(),
		libc::EADDRNOTAVAIL => "address not available".into(),
		libc::EAFNOSUPPORT => "address family not supported".into(),
		libc::EAGAIN => "resource temporarily unavailable".into(),
		libc::EBADF => "bad file descriptor".into(),
		libc::EBUSY => "device or resource busy".into(),
		libc::ECONNREFUSED => "connection refused".into(),
		libc::ECONNRESET => "connection reset by peer".into(),
		libc::EINPROGRESS => "operation in progress".into(),
		libc::EINTR => "interrupted by signal".into(),
		libc::EINVAL => "invalid argument".into(),
		libc::EIO => "input/output error".into(),
		libc::EMFILE => "too many open files".into(),
		libc::ENFILE => "too many open files in system".into(),
		libc::ENOENT => "no such file or directory".into(),
		libc::ENETUNREACH => "network unreachable".into(),
		libc::ENOBUFS => "no buffer space available".into(),
		libc::ENOTCONN => "not connected".into(),
		libc::ENOTTY => "inappropriate ioctl for device".into(),
		libc::EPIPE => "broken pipe".into(),
		libc::EPROTONOSUPPORT => "protocol not supported".into(),
		libc::ETIMEDOUT => "connection timed out".into(),
		_ => format!("errno {}", errno),
	}
}

/// Maps errno to std::io::ErrorKind.
fn errno_to_kind(errno: i32) -> std::io::ErrorKind {
	match errno {
		libc::EACCES | libc::EPERM => std::io::ErrorKind::PermissionDenied,
		libc::EADDRINUSE => std::io::ErrorKind::AddrInUse,
		libc::EADDRNOTAVAIL => std::io::ErrorKind::AddrNotAvailable,
		libc::EAGAIN => std::io::ErrorKind::WouldBlock,
		libc::ECONNREFUSED => std::io::ErrorKind::ConnectionRefused,
		libc::ECONNRESET => std::io::ErrorKind::ConnectionReset,
		libc::EINTR => std::io::ErrorKind::Interrupted,
		libc::EINVAL => std::io::ErrorKind::InvalidInput,
		libc::ENOENT => std::io::ErrorKind::NotFound,
		libc::ENOTCONN => std::io::ErrorKind::NotConnected,
		libc::EPIPE => std::io::ErrorKind::BrokenPipe,
		libc::ETIMEDOUT => std::io::ErrorKind::TimedOut,
		_ => std::io::ErrorKind::Other,
	}
}

impl Error {
	/// Returns the OS error code carried by this error, if any.
	pub fn raw_os_error(&self) -> Option<i32> {
		match self {
			Error::SocketCreation { errno, .. }
			| Error::SocketOption { errno, .. }
			| Error::Connect { errno, .. }
			| Error::SerialOpen { errno, .. }
			| Error::TooManyFiles { errno, .. }
			| Error::Rs485 { errno }
			| Error::Read { errno }
			| Error::Write { errno }
			| Error::Wait { errno }
			| Error::Flush { errno }
			| Error::Close { errno } => Some(*errno),
			Error::Terminal(TerminalError::Apply { errno }) => Some(*errno),
			_ => None,
		}
	}

	/// True for the deadline errors of read and write.
	pub fn is_timeout(&self) -> bool {
		matches!(self, Error::Timeout { .. })
	}
}

impl From<Error> for std::io::Error {
	fn from(err: Error) -> Self {
		let kind = match &err {
			Error::AddressResolution { .. }
			| Error::UnsupportedNetwork { .. }
			| Error::UnsupportedInterface { .. }
			| Error::UnknownType(_)
			| Error::Terminal(TerminalError::BaudRate(_))
			| Error::Terminal(TerminalError::DataBits(_))
			| Error::Terminal(TerminalError::StopBits(_))
			| Error::Terminal(TerminalError::Parity(_)) => std::io::ErrorKind::InvalidInput,
			Error::Timeout { .. } => std::io::ErrorKind::TimedOut,
			Error::DuplicateResource { .. } => std::io::ErrorKind::AlreadyExists,
			Error::NotOpen => std::io::ErrorKind::NotConnected,
			Error::Cancelled => std::io::ErrorKind::ConnectionAborted,
			Error::NoData => std::io::ErrorKind::UnexpectedEof,
			Error::ShortSend { .. } => std::io::ErrorKind::WriteZero,
			other => match other.raw_os_error() {
				Some(errno) => errno_to_kind(errno),
				None => std::io::ErrorKind::Other,
			},
		};
		std::io::Error::new(kind, err)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn io_error_kinds() {
		let timeout: std::io::Error = Error::Timeout { op: "read", timeout: Duration::from_millis(5) }.into();
		assert_eq!(timeout.kind(), std::io::ErrorKind::TimedOut);

		let refused: std::io::Error = Error::Connect { errno: libc::ECONNREFUSED, addr: "127.0.0.1:1".into() }.into();
		assert_eq!(refused.kind(), std::io::ErrorKind::ConnectionRefused);

		let dup: std::io::Error = Error::DuplicateResource { address: "/dev/ttyS0".into() }.into();
		assert_eq!(dup.kind(), std::io::ErrorKind::AlreadyExists);

		// not Interrupted: read_exact would retry it forever
		let cancelled: std::io::Error = Error::Cancelled.into();
		assert_eq!(cancelled.kind(), std::io::ErrorKind::ConnectionAborted);
	}

	#[test]
	fn too_many_files_is_labeled() {
		let err = Error::TooManyFiles { errno: libc::EMFILE, path: "/dev/ttyS1".into() };
		assert!(err.to_string().contains("too many files open"));
		assert_eq!(err.raw_os_error(), Some(libc::EMFILE));
	}
}
