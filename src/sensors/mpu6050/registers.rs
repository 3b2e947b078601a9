//! MPU6050 register map.
//!
//! Every register the driver touches is named here once; init, the
//! single-shot reads and the bulk asynchronous read all go through
//! [`Register::addr`].

/// Default 7-bit address (AD0 pin low)
pub const DEFAULT_ADDRESS: u8 = 0x68;
/// Alternate 7-bit address (AD0 pin high)
pub const ALTERNATE_ADDRESS: u8 = 0x69;

/// Expected WHO_AM_I value
pub const WHO_AM_I_VALUE: u8 = 0x68;

/// Wake from sleep, internal 8 MHz oscillator
pub const PWR_MGMT_1_WAKE: u8 = 0x00;
/// Sample rate = gyro output rate / (1 + divider)
pub const SMPLRT_DIV_DEFAULT: u8 = 0x00;
/// No external sync, DLPF disabled
pub const CONFIG_DEFAULT: u8 = 0x00;

pub const ACCEL_BLOCK_LEN: usize = 6;
pub const TEMP_BLOCK_LEN: usize = 2;
pub const GYRO_BLOCK_LEN: usize = 6;
/// Accelerometer, temperature and gyroscope words back to back
pub const RAW_BLOCK_LEN: usize = ACCEL_BLOCK_LEN + TEMP_BLOCK_LEN + GYRO_BLOCK_LEN;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    SmplrtDiv,
    Config,
    GyroConfig,
    AccelConfig,
    AccelXoutH,
    TempOutH,
    GyroXoutH,
    PwrMgmt1,
    WhoAmI,
}

impl Register {
    pub const fn addr(self) -> u8 {
        match self {
            Register::SmplrtDiv => 0x19,
            Register::Config => 0x1A,
            Register::GyroConfig => 0x1B,
            Register::AccelConfig => 0x1C,
            Register::AccelXoutH => 0x3B,
            Register::TempOutH => 0x41,
            Register::GyroXoutH => 0x43,
            Register::PwrMgmt1 => 0x6B,
            Register::WhoAmI => 0x75,
        }
    }
}
