use crate::errors::{ConfigError, ConfigResult};
use crate::sensors::mpu6050::config::{
    AccelRange, AccelUnit, AxisDirection, DeviceConfig, GravityCompensation, GyroRange, GyroUnit,
    StaticCalibration,
};
use serde::Deserialize;
use std::fs;
use std::time::Duration;

pub const DEFAULT_FREQUENCY_HZ: u32 = 100;
/// Gyroscope output rate with the DLPF disabled; polling faster only repeats samples
pub const MAX_FREQUENCY_HZ: u32 = 8000;
pub const DEFAULT_CALIBRATION_MS: u64 = 1000;

/// Root configuration struct expecting `[[sensor]]` TOML array format
#[derive(Debug, Deserialize)]
pub struct SensorConfig {
    #[serde(rename = "sensor")]
    pub sensors: Vec<SensorEntry>,
}

/// How the scheduler fetches samples from a sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadMode {
    /// Blocking 14-byte burst per sample
    #[default]
    Sync,
    /// Request, then decode on completion
    Async,
}

/// Start-up calibration, `[sensor.calibration]`
#[derive(Debug, Clone, Deserialize)]
pub struct CalibrationEntry {
    #[serde(default = "default_calibration_ms")]
    pub duration_ms: u64,
    #[serde(default)]
    pub gyro: bool,
    #[serde(default)]
    pub accel: bool,
}

impl CalibrationEntry {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

/// One sensor entry, matching each `[[sensor]]` section
#[derive(Debug, Clone, Deserialize)]
pub struct SensorEntry {
    pub id: String,
    pub driver: String,
    pub bus: String,
    pub address: u8,
    pub frequency: Option<u32>,
    #[serde(default)]
    pub mode: ReadMode,
    #[serde(default = "default_accel_range")]
    pub accel_range: u16,
    #[serde(default = "default_gyro_range")]
    pub gyro_range: u16,
    #[serde(default)]
    pub accel_unit: AccelUnit,
    #[serde(default)]
    pub gyro_unit: GyroUnit,
    #[serde(default)]
    pub invert_accel: [bool; 3],
    #[serde(default)]
    pub invert_gyro: [bool; 3],
    #[serde(default)]
    pub gravity_compensation: GravityCompensation,
    #[serde(default)]
    pub static_calibration: StaticCalibration,
    pub calibration: Option<CalibrationEntry>,
}

fn default_accel_range() -> u16 {
    AccelRange::default().g()
}

fn default_gyro_range() -> u16 {
    GyroRange::default().dps()
}

fn default_calibration_ms() -> u64 {
    DEFAULT_CALIBRATION_MS
}

impl SensorEntry {
    /// Validate the entry into a device configuration
    pub fn device_config(&self) -> ConfigResult<DeviceConfig> {
        match self.frequency {
            Some(0) => {
                return Err(ConfigError::InvalidValue {
                    field: format!("{}.frequency", self.id),
                    reason: "must be greater than zero".to_string(),
                })
            }
            Some(hz) if hz > MAX_FREQUENCY_HZ => {
                return Err(ConfigError::InvalidValue {
                    field: format!("{}.frequency", self.id),
                    reason: format!("{} Hz exceeds the {} Hz maximum", hz, MAX_FREQUENCY_HZ),
                })
            }
            _ => {}
        }

        let config = DeviceConfig::from_ranges(self.accel_range, self.gyro_range).map_err(|e| {
            match e {
                ConfigError::InvalidValue { field, reason } => ConfigError::InvalidValue {
                    field: format!("{}.{}", self.id, field),
                    reason,
                },
                other => other,
            }
        })?;

        Ok(config
            .with_units(self.accel_unit, self.gyro_unit)
            .with_directions(
                self.invert_accel.map(AxisDirection::from_inverted),
                self.invert_gyro.map(AxisDirection::from_inverted),
            )
            .with_gravity(self.gravity_compensation)
            .with_static_calibration(self.static_calibration))
    }

    pub fn frequency_hz(&self) -> u32 {
        self.frequency.unwrap_or(DEFAULT_FREQUENCY_HZ)
    }

    pub fn period(&self) -> Duration {
        Duration::from_nanos(1_000_000_000 / self.frequency_hz().max(1) as u64)
    }
}

pub fn parse_sensor_config(content: &str) -> ConfigResult<SensorConfig> {
    Ok(toml::from_str(content)?)
}

/// Loads config from TOML file
pub fn load_sensor_config(path: &str) -> ConfigResult<SensorConfig> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::LoadError {
        path: path.to_string(),
        source,
    })?;
    parse_sensor_config(&content)
}
