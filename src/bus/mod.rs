pub mod i2c;
#[cfg(test)]
pub(crate) mod mock;

use std::time::Duration;

pub use crate::errors::BusError;

/// Nominal upper bound for a single blocking transfer, reported in
/// [`BusError::Timeout`]
pub const BUS_TIMEOUT: Duration = Duration::from_millis(1000);

/// Blocking, register-addressed access to devices on one bus.
///
/// Every call returns once the transfer has finished or the transport's
/// timeout elapsed.
pub trait RegisterBus {
    /// Identifier used to route completions back to the sessions on this bus
    fn id(&self) -> &str;

    /// Read `buf.len()` bytes starting at `register` of `device`
    fn read_register(&mut self, device: u8, register: u8, buf: &mut [u8]) -> Result<(), BusError>;

    /// Write `bytes` starting at `register` of `device`
    fn write_register(&mut self, device: u8, register: u8, bytes: &[u8]) -> Result<(), BusError>;
}

/// Non-blocking reads whose result is delivered later as a [`Completion`].
pub trait AsyncRegisterBus: RegisterBus {
    /// Start reading `len` bytes from `register` of `device` and return immediately
    fn request_read(&mut self, device: u8, register: u8, len: usize) -> Result<(), BusError>;
}

/// Result of a finished asynchronous read, reported out of band by the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub device: u8,
    pub register: u8,
    pub data: Vec<u8>,
}
