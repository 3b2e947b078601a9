use crate::errors::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};

/// Span of the 16-bit ADC in counts
pub const ADC_FULL_SCALE: f32 = 65536.0;

/// Standard gravity in m/s^2
pub const STANDARD_GRAVITY: f32 = 9.80665;

/// Accelerometer full-scale range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccelRange {
    G2,
    G4,
    #[default]
    G8,
    G16,
}

impl AccelRange {
    pub fn g(self) -> u16 {
        match self {
            AccelRange::G2 => 2,
            AccelRange::G4 => 4,
            AccelRange::G8 => 8,
            AccelRange::G16 => 16,
        }
    }

    /// ACCEL_CONFIG value (AFS_SEL in bits 4:3)
    pub fn register_value(self) -> u8 {
        let afs_sel = match self {
            AccelRange::G2 => 0,
            AccelRange::G4 => 1,
            AccelRange::G8 => 2,
            AccelRange::G16 => 3,
        };
        afs_sel << 3
    }

    /// Counts per g
    pub fn sensitivity(self) -> f32 {
        ADC_FULL_SCALE / self.g() as f32 / 2.0
    }
}

impl TryFrom<u16> for AccelRange {
    type Error = ConfigError;

    fn try_from(g: u16) -> ConfigResult<Self> {
        match g {
            2 => Ok(AccelRange::G2),
            4 => Ok(AccelRange::G4),
            8 => Ok(AccelRange::G8),
            16 => Ok(AccelRange::G16),
            other => Err(ConfigError::InvalidValue {
                field: "accel_range".to_string(),
                reason: format!("{} g is not one of 2, 4, 8, 16", other),
            }),
        }
    }
}

/// Gyroscope full-scale range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GyroRange {
    Dps250,
    Dps500,
    #[default]
    Dps1000,
    Dps2000,
}

impl GyroRange {
    pub fn dps(self) -> u16 {
        match self {
            GyroRange::Dps250 => 250,
            GyroRange::Dps500 => 500,
            GyroRange::Dps1000 => 1000,
            GyroRange::Dps2000 => 2000,
        }
    }

    /// GYRO_CONFIG value (FS_SEL in bits 4:3)
    pub fn register_value(self) -> u8 {
        let fs_sel = match self {
            GyroRange::Dps250 => 0,
            GyroRange::Dps500 => 1,
            GyroRange::Dps1000 => 2,
            GyroRange::Dps2000 => 3,
        };
        fs_sel << 3
    }

    /// Counts per deg/s
    pub fn sensitivity(self) -> f32 {
        ADC_FULL_SCALE / self.dps() as f32 / 2.0
    }
}

impl TryFrom<u16> for GyroRange {
    type Error = ConfigError;

    fn try_from(dps: u16) -> ConfigResult<Self> {
        match dps {
            250 => Ok(GyroRange::Dps250),
            500 => Ok(GyroRange::Dps500),
            1000 => Ok(GyroRange::Dps1000),
            2000 => Ok(GyroRange::Dps2000),
            other => Err(ConfigError::InvalidValue {
                field: "gyro_range".to_string(),
                reason: format!("{} deg/s is not one of 250, 500, 1000, 2000", other),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AccelUnit {
    #[default]
    #[serde(rename = "g")]
    G,
    #[serde(rename = "m/s2")]
    MetersPerSecondSquared,
}

impl AccelUnit {
    /// Multiplier from g, which is also one g expressed in this unit
    pub fn factor(self) -> f32 {
        match self {
            AccelUnit::G => 1.0,
            AccelUnit::MetersPerSecondSquared => STANDARD_GRAVITY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GyroUnit {
    #[default]
    #[serde(rename = "deg/s")]
    DegreesPerSecond,
    #[serde(rename = "rad/s")]
    RadiansPerSecond,
}

impl GyroUnit {
    /// Multiplier from deg/s
    pub fn factor(self) -> f32 {
        match self {
            GyroUnit::DegreesPerSecond => 1.0,
            GyroUnit::RadiansPerSecond => core::f32::consts::PI / 180.0,
        }
    }
}

/// Mounting orientation of a single axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AxisDirection {
    #[default]
    Normal,
    Inverted,
}

impl AxisDirection {
    pub fn sign(self) -> f32 {
        match self {
            AxisDirection::Normal => 1.0,
            AxisDirection::Inverted => -1.0,
        }
    }

    pub fn from_inverted(inverted: bool) -> Self {
        if inverted {
            AxisDirection::Inverted
        } else {
            AxisDirection::Normal
        }
    }
}

/// Where the accelerometer Z rest value of one g is expected during calibration.
///
/// `AfterDirection`: the direction-corrected Z reading is +1 g at rest.
/// `BeforeDirection`: the native sensor Z reading is +1 g at rest, so the
/// corrected reading carries the Z axis sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GravityCompensation {
    #[default]
    AfterDirection,
    BeforeDirection,
}

/// Board-level zero error, in output units
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct StaticCalibration {
    pub accel: [f32; 3],
    pub gyro: [f32; 3],
    pub temp: f32,
}

/// Runtime configuration of one MPU6050
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DeviceConfig {
    pub accel_range: AccelRange,
    pub gyro_range: GyroRange,
    pub accel_unit: AccelUnit,
    pub gyro_unit: GyroUnit,
    pub accel_direction: [AxisDirection; 3],
    pub gyro_direction: [AxisDirection; 3],
    pub gravity: GravityCompensation,
    pub static_calibration: StaticCalibration,
}

impl DeviceConfig {
    /// Native units, no inversion, no static calibration
    pub fn new(accel_range: AccelRange, gyro_range: GyroRange) -> Self {
        Self {
            accel_range,
            gyro_range,
            ..Self::default()
        }
    }

    /// Validate raw range numbers (g and deg/s)
    pub fn from_ranges(accel_g: u16, gyro_dps: u16) -> ConfigResult<Self> {
        Ok(Self::new(
            AccelRange::try_from(accel_g)?,
            GyroRange::try_from(gyro_dps)?,
        ))
    }

    pub fn with_units(mut self, accel_unit: AccelUnit, gyro_unit: GyroUnit) -> Self {
        self.accel_unit = accel_unit;
        self.gyro_unit = gyro_unit;
        self
    }

    pub fn with_directions(
        mut self,
        accel_direction: [AxisDirection; 3],
        gyro_direction: [AxisDirection; 3],
    ) -> Self {
        self.accel_direction = accel_direction;
        self.gyro_direction = gyro_direction;
        self
    }

    pub fn with_gravity(mut self, gravity: GravityCompensation) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn with_static_calibration(mut self, static_calibration: StaticCalibration) -> Self {
        self.static_calibration = static_calibration;
        self
    }

    /// Direction-corrected accelerometer Z reading of a level device at rest
    pub fn accel_z_rest(&self) -> f32 {
        let g = self.accel_unit.factor();
        match self.gravity {
            GravityCompensation::AfterDirection => g,
            GravityCompensation::BeforeDirection => g * self.accel_direction[2].sign(),
        }
    }
}
