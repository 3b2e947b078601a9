#[cfg(target_os = "linux")]
use i2cdev::core::I2CDevice;
#[cfg(target_os = "linux")]
use i2cdev::linux::{LinuxI2CDevice, LinuxI2CError};

use super::{AsyncRegisterBus, BusError, Completion, RegisterBus};
use tokio::sync::mpsc;
#[cfg(target_os = "linux")]
use tracing::trace;

/// I2C bus error type - platform specific
#[cfg(target_os = "linux")]
pub type I2CError = LinuxI2CError;

#[cfg(target_os = "linux")]
impl From<I2CError> for BusError {
    fn from(error: I2CError) -> Self {
        std::io::Error::from(error).into()
    }
}

/// Linux i2c-dev bus.
///
/// Transfers are bounded by the adapter's own timeout, which i2c-dev leaves
/// at the driver default (nominally [`BUS_TIMEOUT`](super::BUS_TIMEOUT)).
/// i2c-dev has no DMA, so `request_read` runs the transfer inline and posts
/// the result on the completion channel returned by [`I2CBus::take_completions`].
#[cfg(target_os = "linux")]
pub struct I2CBus {
    id: String,
    device: LinuxI2CDevice,
    completion_tx: mpsc::UnboundedSender<Completion>,
    completion_rx: Option<mpsc::UnboundedReceiver<Completion>>,
}

#[cfg(not(target_os = "linux"))]
pub struct I2CBus {
    id: String,
}

#[cfg(target_os = "linux")]
impl I2CBus {
    pub fn new(id: &str, path: &str) -> Result<Self, BusError> {
        let device = LinuxI2CDevice::new(path, 0)?;
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        Ok(Self {
            id: id.to_string(),
            device,
            completion_tx,
            completion_rx: Some(completion_rx),
        })
    }

    /// Hand out the receiving end of the completion channel (only once)
    pub fn take_completions(&mut self) -> Option<mpsc::UnboundedReceiver<Completion>> {
        self.completion_rx.take()
    }
}

#[cfg(target_os = "linux")]
impl RegisterBus for I2CBus {
    fn id(&self) -> &str {
        &self.id
    }

    fn read_register(&mut self, device: u8, register: u8, buf: &mut [u8]) -> Result<(), BusError> {
        trace!("[{}] read {:#04x}/{:#04x} len={}", self.id, device, register, buf.len());
        self.device.set_slave_address(device as u16)?;

        if buf.len() == 1 {
            // Use SMBus read byte data for single byte reads
            buf[0] = self.device.smbus_read_byte_data(register)?;
            return Ok(());
        }

        // Use SMBus block read for multi-byte reads
        let block = self
            .device
            .smbus_read_i2c_block_data(register, buf.len() as u8)?;
        if block.len() != buf.len() {
            return Err(BusError::Transfer(format!(
                "short read from {:#04x}: expected {} bytes, got {}",
                register,
                buf.len(),
                block.len()
            )));
        }
        buf.copy_from_slice(&block);
        Ok(())
    }

    fn write_register(&mut self, device: u8, register: u8, bytes: &[u8]) -> Result<(), BusError> {
        trace!("[{}] write {:#04x}/{:#04x} {:02x?}", self.id, device, register, bytes);
        self.device.set_slave_address(device as u16)?;
        match bytes {
            [byte] => self.device.smbus_write_byte_data(register, *byte)?,
            _ => self.device.smbus_write_i2c_block_data(register, bytes)?,
        }
        Ok(())
    }
}

#[cfg(target_os = "linux")]
impl AsyncRegisterBus for I2CBus {
    fn request_read(&mut self, device: u8, register: u8, len: usize) -> Result<(), BusError> {
        let mut data = vec![0u8; len];
        self.read_register(device, register, &mut data)?;
        self.completion_tx
            .send(Completion { device, register, data })
            .map_err(|_| BusError::Transfer("completion channel closed".to_string()))
    }
}

#[cfg(not(target_os = "linux"))]
impl I2CBus {
    pub fn new(_id: &str, path: &str) -> Result<Self, BusError> {
        Err(BusError::Unsupported(format!(
            "I2C is only supported on Linux (requested {})",
            path
        )))
    }

    pub fn take_completions(&mut self) -> Option<mpsc::UnboundedReceiver<Completion>> {
        None
    }
}

#[cfg(not(target_os = "linux"))]
impl RegisterBus for I2CBus {
    fn id(&self) -> &str {
        &self.id
    }

    fn read_register(
        &mut self,
        _device: u8,
        _register: u8,
        _buf: &mut [u8],
    ) -> Result<(), BusError> {
        Err(BusError::Unsupported("I2C is only supported on Linux".to_string()))
    }

    fn write_register(
        &mut self,
        _device: u8,
        _register: u8,
        _bytes: &[u8],
    ) -> Result<(), BusError> {
        Err(BusError::Unsupported("I2C is only supported on Linux".to_string()))
    }
}

#[cfg(not(target_os = "linux"))]
impl AsyncRegisterBus for I2CBus {
    fn request_read(&mut self, _device: u8, _register: u8, _len: usize) -> Result<(), BusError> {
        Err(BusError::Unsupported("I2C is only supported on Linux".to_string()))
    }
}
