use std::fmt;

use crate::addr::ToSockAddr;

/// Where a Unix stream socket lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnixAddr {
	path: Vec<u8>,
	/// Linux abstract namespace: no filesystem entry, gone with the last descriptor.
	is_abstract: bool,
}

impl UnixAddr {
	/// A filesystem socket path.
	pub fn new(path: impl Into<Vec<u8>>) -> Self {
		Self { path: path.into(), is_abstract: false }
	}

	/// A name in the Linux abstract namespace, without the leading NUL.
	pub fn abstract_socket(name: impl Into<Vec<u8>>) -> Self {
		Self { path: name.into(), is_abstract: true }
	}

	/// Parses the configured form. On Linux a leading `@` selects the abstract
	/// namespace; elsewhere it is part of the path.
	pub fn parse(address: &str) -> Self {
		match address.strip_prefix('@') {
			Some(name) if cfg!(any(target_os = "linux", target_os = "android")) => Self::abstract_socket(name),
			_ => Self::new(address),
		}
	}

	pub fn is_abstract(&self) -> bool {
		self.is_abstract
	}

	/// Path or abstract name bytes.
	pub fn path(&self) -> &[u8] {
		&self.path
	}

	/// Bytes of `sun_path` this address occupies, including the terminator
	/// or the leading NUL of an abstract name.
	fn used_len(&self) -> usize {
		self.path.len() + 1
	}

	/// True if the address fits in `sun_path`.
	pub fn fits(&self) -> bool {
		self.to_raw().is_some()
	}

	/// Converts to the raw sockaddr_un for syscalls.
	pub(crate) fn to_raw(&self) -> Option<libc::sockaddr_un> {
		let mut addr: libc::sockaddr_un = unsafe { std::mem::zeroed() };
		addr.sun_family = libc::AF_UNIX as libc::sa_family_t;

		if self.used_len() > addr.sun_path.len() {
			return None;
		}
		// sun_path is zeroed: the abstract marker and the terminator are already there
		let start = if self.is_abstract { 1 } else { 0 };
		for (i, &byte) in self.path.iter().enumerate() {
			addr.sun_path[start + i] = byte as libc::c_char;
		}

		Some(addr)
	}
}

impl fmt::Display for UnixAddr {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.is_abstract {
			f.write_str("@")?;
		}
		f.write_str(&String::from_utf8_lossy(&self.path))
	}
}

/*
 No port, a path instead. sun_path is ~108 bytes on Linux and 104 on the BSDs;
 a path that does not fit is rejected rather than truncated.
 The length passed to the kernel counts only the used part of sun_path:
 for abstract names every byte is significant, trailing NULs included.
*/

impl ToSockAddr for UnixAddr {
	fn with_raw<F, R>(&self, f: F) -> Option<R>
	where
		F: FnOnce(*const libc::sockaddr, libc::socklen_t) -> R,
	{
		let raw = self.to_raw()?;
		let ptr = &raw as *const _ as *const libc::sockaddr;
		let offset = std::mem::offset_of!(libc::sockaddr_un, sun_path);
		let len = if self.is_abstract {
			offset + self.used_len()
		} else {
			std::mem::size_of::<libc::sockaddr_un>()
		};
		Some(f(ptr, len as libc::socklen_t))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn path_too_long_is_rejected() {
		let long = "x".repeat(200);
		assert!(!UnixAddr::new(long.as_str()).fits());
		assert!(UnixAddr::new("/tmp/ok.sock").fits());
	}

	#[cfg(target_os = "linux")]
	#[test]
	fn abstract_names_are_length_exact() {
		let addr = UnixAddr::parse("@gateway");
		assert!(addr.is_abstract());
		assert_eq!(addr.to_string(), "@gateway");
		let len = addr.with_raw(|_, len| len).unwrap();
		let offset = std::mem::offset_of!(libc::sockaddr_un, sun_path);
		assert_eq!(len as usize, offset + 1 + "gateway".len());
	}
}
