//! Serial configuration to terminal attributes.

use std::io;
use std::os::fd::RawFd;

use crate::config::{Parity, SerialConfig};
use crate::error::TerminalError;
use crate::sys;

/// Builds the terminal attributes for `config`.
///
/// Starts from an all-zero `termios`: raw mode, no echo, no output
/// processing, `VMIN = VTIME = 0` (reads never block, the descriptor is
/// non-blocking and waits are done with poll). Only the control and input
/// flags below are set.
pub fn build(config: &SerialConfig) -> Result<libc::termios, TerminalError> {
	let mut t: libc::termios = unsafe { std::mem::zeroed() };

	let speed = sys::baud_flag(config.baud_rate).ok_or(TerminalError::BaudRate(config.baud_rate))?;
	let (ri, ro) = unsafe { (libc::cfsetispeed(&mut t, speed), libc::cfsetospeed(&mut t, speed)) };
	if ri != 0 || ro != 0 {
		return Err(TerminalError::BaudRate(config.baud_rate));
	}

	let size = match config.data_bits {
		5 => libc::CS5,
		6 => libc::CS6,
		7 => libc::CS7,
		8 => libc::CS8,
		other => return Err(TerminalError::DataBits(other)),
	};
	t.c_cflag &= !libc::CSIZE;
	t.c_cflag |= size;

	match config.stop_bits {
		0 | 1 => t.c_cflag &= !libc::CSTOPB,
		2 => t.c_cflag |= libc::CSTOPB,
		other => return Err(TerminalError::StopBits(other)),
	}

	apply_parity(&mut t, config.parity)?;

	// receiver on, modem control lines ignored
	t.c_cflag |= libc::CREAD | libc::CLOCAL;

	Ok(t)
}

fn apply_parity(t: &mut libc::termios, parity: Parity) -> Result<(), TerminalError> {
	let mark_space = || sys::CMSPAR.ok_or_else(|| TerminalError::Parity(parity.to_string()));

	match parity {
		Parity::None => {
			t.c_cflag &= !libc::PARENB;
			t.c_iflag &= !libc::INPCK;
		}
		Parity::Odd => {
			t.c_cflag |= libc::PARENB | libc::PARODD;
			t.c_cflag &= !sys::CMSPAR.unwrap_or(0);
			t.c_iflag |= libc::INPCK;
		}
		Parity::Even => {
			t.c_cflag |= libc::PARENB;
			t.c_cflag &= !(libc::PARODD | sys::CMSPAR.unwrap_or(0));
			t.c_iflag |= libc::INPCK;
		}
		Parity::Mark => {
			let cmspar = mark_space()?;
			t.c_cflag |= libc::PARENB | libc::PARODD | cmspar;
			t.c_iflag |= libc::INPCK;
		}
		Parity::Space => {
			let cmspar = mark_space()?;
			t.c_cflag |= libc::PARENB | cmspar;
			t.c_cflag &= !libc::PARODD;
			t.c_iflag |= libc::INPCK;
		}
	}
	Ok(())
}

/*
  ┌────────┬────────┬────────┬────────┬───────┐
  │ Parity │ PARENB │ PARODD │ CMSPAR │ INPCK │
  ├────────┼────────┼────────┼────────┼───────┤
  │ none   │ 0      │ -      │ -      │ 0     │
  │ odd    │ 1      │ 1      │ 0      │ 1     │
  │ even   │ 1      │ 0      │ 0      │ 1     │
  │ mark   │ 1      │ 1      │ 1      │ 1     │
  │ space  │ 1      │ 0      │ 1      │ 1     │
  └────────┴────────┴────────┴────────┴───────┘
*/

/// Reads the current attributes of `fd`.
pub fn capture(fd: RawFd) -> io::Result<libc::termios> {
	let mut t: libc::termios = unsafe { std::mem::zeroed() };
	if unsafe { libc::tcgetattr(fd, &mut t) } == -1 {
		return Err(io::Error::last_os_error());
	}
	Ok(t)
}

/// Applies `t` to `fd` immediately.
pub fn apply(fd: RawFd, t: &libc::termios) -> io::Result<()> {
	if unsafe { libc::tcsetattr(fd, libc::TCSANOW, t) } == -1 {
		return Err(io::Error::last_os_error());
	}
	Ok(())
}
