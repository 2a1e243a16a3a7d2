use std::os::fd::RawFd;

use crate::config::Rs485Config;
use crate::error::{Error, Result};
use crate::sys;

pub(crate) const SER_RS485_ENABLED: u32 = 1 << 0;
pub(crate) const SER_RS485_RTS_ON_SEND: u32 = 1 << 1;
pub(crate) const SER_RS485_RTS_AFTER_SEND: u32 = 1 << 2;
pub(crate) const SER_RS485_RX_DURING_TX: u32 = 1 << 4;

/// `struct serial_rs485` from `<linux/serial.h>`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct SerialRs485 {
	pub flags: u32,
	/// Milliseconds.
	pub delay_rts_before_send: u32,
	/// Milliseconds.
	pub delay_rts_after_send: u32,
	padding: [u32; 5],
}

impl From<&Rs485Config> for SerialRs485 {
	fn from(c: &Rs485Config) -> Self {
		let mut flags = SER_RS485_ENABLED;
		if c.rts_high_during_send {
			flags |= SER_RS485_RTS_ON_SEND;
		}
		if c.rts_high_after_send {
			flags |= SER_RS485_RTS_AFTER_SEND;
		}
		if c.rx_during_tx {
			flags |= SER_RS485_RX_DURING_TX;
		}
		Self {
			flags,
			delay_rts_before_send: c.delay_rts_before_send,
			delay_rts_after_send: c.delay_rts_after_send,
			padding: [0; 5],
		}
	}
}

/// Switches the transceiver into RS-485 mode. Does nothing unless enabled.
pub(crate) fn enable(fd: RawFd, config: &Rs485Config) -> Result<()> {
	if !config.enabled {
		return Ok(());
	}
	let opts = SerialRs485::from(config);
	match sys::set_rs485(fd, &opts) {
		Ok(0) => Ok(()),
		Ok(status) => Err(Error::UnknownRs485(status)),
		Err(e) => Err(Error::Rs485 { errno: e.raw_os_error().unwrap_or(0) }),
	}
}
