//! Pseudo-terminal pair standing in for a serial line.

use std::fs::File;
use std::io;
use std::os::fd::{FromRawFd, OwnedFd};

pub struct Pty {
	/// The far end of the line: what a field device would see.
	pub master: File,
	/// Device path the endpoint opens.
	pub path: String,
}

impl Pty {
	pub fn open() -> io::Result<Self> {
		let fd = unsafe { libc::posix_openpt(libc::O_RDWR | libc::O_NOCTTY) };
		if fd == -1 {
			return Err(io::Error::last_os_error());
		}
		let master = unsafe { OwnedFd::from_raw_fd(fd) };

		if unsafe { libc::grantpt(fd) } == -1 || unsafe { libc::unlockpt(fd) } == -1 {
			return Err(io::Error::last_os_error());
		}

		let mut name = [0 as libc::c_char; 128];
		let rc = unsafe { libc::ptsname_r(fd, name.as_mut_ptr(), name.len()) };
		if rc != 0 {
			return Err(io::Error::from_raw_os_error(rc));
		}
		let path = unsafe { std::ffi::CStr::from_ptr(name.as_ptr()) }.to_string_lossy().into_owned();

		Ok(Self { master: File::from(master), path })
	}
}
