//! InvenSense MPU6050 6-axis IMU over I2C.
//!
//! A [`Mpu6050`] value is one device session: address, ranges, calibration
//! offsets and the buffer for an outstanding asynchronous bulk read. The bus
//! is passed into every call so several sessions can share one bus.

pub mod calibration;
pub mod config;
pub mod decode;
pub mod registers;

use crate::bus::{AsyncRegisterBus, Completion, RegisterBus};
use crate::errors::{BusError, InitError, SensorError, SensorResult};
use crate::sensors::Sample;
use calibration::CalibrationOffsets;
use config::DeviceConfig;
use decode::RawRegisterBlock;
use registers::*;
use tracing::{debug, info, warn};

pub struct Mpu6050 {
    id: String,
    bus_id: String,
    address: u8,
    config: DeviceConfig,
    offsets: CalibrationOffsets,
    rx_buffer: RawRegisterBlock,
    data_requested: bool,
}

impl Mpu6050 {
    /// Verify the device identity and program power, rate, filter and ranges.
    ///
    /// Stops at the first failed write; registers written before it keep
    /// their new values.
    pub fn init<B: RegisterBus>(
        bus: &mut B,
        id: impl Into<String>,
        address: u8,
        config: DeviceConfig,
    ) -> Result<Self, InitError> {
        let id = id.into();

        let mut who_am_i = [0u8; 1];
        let identity = bus
            .read_register(address, Register::WhoAmI.addr(), &mut who_am_i)
            .map(|_| who_am_i[0]);
        match identity {
            Ok(WHO_AM_I_VALUE) => {}
            Ok(actual) => {
                return Err(InitError::IdentityMismatch {
                    address,
                    expected: WHO_AM_I_VALUE,
                    actual: Some(actual),
                })
            }
            Err(e) => {
                warn!("[{}] WHO_AM_I read failed: {}", id, e);
                return Err(InitError::IdentityMismatch {
                    address,
                    expected: WHO_AM_I_VALUE,
                    actual: None,
                });
            }
        }

        let sequence = [
            (Register::PwrMgmt1, PWR_MGMT_1_WAKE),
            (Register::SmplrtDiv, SMPLRT_DIV_DEFAULT),
            (Register::Config, CONFIG_DEFAULT),
            (Register::GyroConfig, config.gyro_range.register_value()),
            (Register::AccelConfig, config.accel_range.register_value()),
        ];
        for (register, value) in sequence {
            bus.write_register(address, register.addr(), &[value])
                .map_err(|source| InitError::ConfigWriteFailed {
                    address,
                    register,
                    source,
                })?;
            debug!("[{}] {:?} <- {:#04x}", id, register, value);
        }

        info!(
            "[{}] MPU6050 at {:#04x} on '{}': ±{} g, ±{} deg/s",
            id,
            address,
            bus.id(),
            config.accel_range.g(),
            config.gyro_range.dps()
        );

        Ok(Self {
            id,
            bus_id: bus.id().to_string(),
            address,
            config,
            offsets: CalibrationOffsets::default(),
            rx_buffer: RawRegisterBlock::default(),
            data_requested: false,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn bus_id(&self) -> &str {
        &self.bus_id
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn offsets(&self) -> &CalibrationOffsets {
        &self.offsets
    }

    pub fn set_offsets(&mut self, offsets: CalibrationOffsets) {
        self.offsets = offsets;
    }

    pub fn reset_offsets(&mut self) {
        self.offsets = CalibrationOffsets::default();
    }

    fn read_accel_words<B: RegisterBus>(&self, bus: &mut B) -> Result<[i16; 3], BusError> {
        let mut buf = [0u8; ACCEL_BLOCK_LEN];
        bus.read_register(self.address, Register::AccelXoutH.addr(), &mut buf)?;
        Ok(decode::axis_words(&buf))
    }

    fn read_gyro_words<B: RegisterBus>(&self, bus: &mut B) -> Result<[i16; 3], BusError> {
        let mut buf = [0u8; GYRO_BLOCK_LEN];
        bus.read_register(self.address, Register::GyroXoutH.addr(), &mut buf)?;
        Ok(decode::axis_words(&buf))
    }

    fn read_block<B: RegisterBus>(&self, bus: &mut B) -> Result<RawRegisterBlock, BusError> {
        let mut block = RawRegisterBlock::default();
        bus.read_register(self.address, Register::AccelXoutH.addr(), &mut block.0)?;
        Ok(block)
    }

    /// Angular rate in the configured unit
    pub fn read_gyro<B: RegisterBus>(&self, bus: &mut B) -> Result<[f32; 3], BusError> {
        let raw = self.read_gyro_words(bus)?;
        Ok(decode::decode_gyro(raw, &self.config, &self.offsets))
    }

    /// Acceleration in the configured unit
    pub fn read_accel<B: RegisterBus>(&self, bus: &mut B) -> Result<[f32; 3], BusError> {
        let raw = self.read_accel_words(bus)?;
        Ok(decode::decode_accel(raw, &self.config, &self.offsets))
    }

    /// Die temperature in degrees Celsius
    pub fn read_temperature<B: RegisterBus>(&self, bus: &mut B) -> Result<f32, BusError> {
        let mut buf = [0u8; TEMP_BLOCK_LEN];
        bus.read_register(self.address, Register::TempOutH.addr(), &mut buf)?;
        Ok(decode::decode_temperature(
            i16::from_be_bytes(buf),
            &self.config,
        ))
    }

    /// All channels from one 14-byte burst
    pub fn read_all<B: RegisterBus>(&self, bus: &mut B) -> Result<Sample, BusError> {
        let block = self.read_block(bus)?;
        Ok(decode::decode(&block, &self.config, &self.offsets))
    }

    /// Start a non-blocking read of all channels.
    ///
    /// Only one request may be outstanding; the result arrives through
    /// [`Mpu6050::handle_rx`].
    pub fn request_all_async<B: AsyncRegisterBus>(&mut self, bus: &mut B) -> SensorResult<()> {
        if self.data_requested {
            return Err(SensorError::RequestPending {
                sensor: self.id.clone(),
            });
        }
        bus.request_read(self.address, Register::AccelXoutH.addr(), RAW_BLOCK_LEN)?;
        self.data_requested = true;
        Ok(())
    }

    pub fn is_request_pending(&self) -> bool {
        self.data_requested
    }

    /// Forget the outstanding request; its completion will be ignored
    pub fn abandon_request(&mut self) {
        self.data_requested = false;
    }

    /// Consume the completion of an outstanding request.
    ///
    /// Returns `None` without touching any state when the completion belongs
    /// to another bus or device, or when no request is outstanding.
    pub fn handle_rx(&mut self, bus_id: &str, completion: &Completion) -> Option<Sample> {
        if bus_id != self.bus_id || completion.device != self.address || !self.data_requested {
            return None;
        }
        self.data_requested = false;

        match RawRegisterBlock::try_from(completion.data.as_slice()) {
            Ok(block) => {
                self.rx_buffer = block;
                Some(decode::decode(&self.rx_buffer, &self.config, &self.offsets))
            }
            Err(len) => {
                warn!(
                    "[{}] dropped completion of {} bytes (expected {})",
                    self.id, len, RAW_BLOCK_LEN
                );
                None
            }
        }
    }
}
