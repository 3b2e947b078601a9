//! Conversion of raw register words into physical units.
//!
//! Per axis: `raw / sensitivity * unit_factor * direction - static - offset`.
//! Nothing is clamped; values beyond the full-scale range pass through.

use super::calibration::CalibrationOffsets;
use super::config::DeviceConfig;
use super::registers::{ACCEL_BLOCK_LEN, RAW_BLOCK_LEN, TEMP_BLOCK_LEN};
use crate::sensors::Sample;

/// Temperature sensitivity in counts per degree Celsius
pub const TEMP_SENSITIVITY: f32 = 340.0;
/// Temperature at a raw reading of zero
pub const TEMP_OFFSET: f32 = 36.43;

const TEMP_START: usize = ACCEL_BLOCK_LEN;
const GYRO_START: usize = ACCEL_BLOCK_LEN + TEMP_BLOCK_LEN;

/// The 14-byte ACCEL_XOUT_H..GYRO_ZOUT_L window, big-endian words
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawRegisterBlock(pub [u8; RAW_BLOCK_LEN]);

impl RawRegisterBlock {
    pub fn accel(&self) -> [i16; 3] {
        axis_words(&self.0[..TEMP_START])
    }

    pub fn temp(&self) -> i16 {
        i16::from_be_bytes([self.0[TEMP_START], self.0[TEMP_START + 1]])
    }

    pub fn gyro(&self) -> [i16; 3] {
        axis_words(&self.0[GYRO_START..])
    }
}

impl TryFrom<&[u8]> for RawRegisterBlock {
    type Error = usize;

    /// Fails with the offending length
    fn try_from(bytes: &[u8]) -> Result<Self, usize> {
        let block: [u8; RAW_BLOCK_LEN] = bytes.try_into().map_err(|_| bytes.len())?;
        Ok(Self(block))
    }
}

/// Three consecutive big-endian signed words
pub fn axis_words(bytes: &[u8]) -> [i16; 3] {
    [
        i16::from_be_bytes([bytes[0], bytes[1]]),
        i16::from_be_bytes([bytes[2], bytes[3]]),
        i16::from_be_bytes([bytes[4], bytes[5]]),
    ]
}

/// Scaled, unit-converted and direction-corrected acceleration, before any calibration
pub fn accel_uncalibrated(raw: [i16; 3], config: &DeviceConfig) -> [f32; 3] {
    let scale = config.accel_unit.factor() / config.accel_range.sensitivity();
    std::array::from_fn(|i| raw[i] as f32 * scale * config.accel_direction[i].sign())
}

/// Scaled, unit-converted and direction-corrected angular rate, before any calibration
pub fn gyro_uncalibrated(raw: [i16; 3], config: &DeviceConfig) -> [f32; 3] {
    let scale = config.gyro_unit.factor() / config.gyro_range.sensitivity();
    std::array::from_fn(|i| raw[i] as f32 * scale * config.gyro_direction[i].sign())
}

fn corrected(uncalibrated: [f32; 3], static_cal: [f32; 3], offset: [f32; 3]) -> [f32; 3] {
    std::array::from_fn(|i| uncalibrated[i] - static_cal[i] - offset[i])
}

pub fn decode_accel(
    raw: [i16; 3],
    config: &DeviceConfig,
    offsets: &CalibrationOffsets,
) -> [f32; 3] {
    corrected(
        accel_uncalibrated(raw, config),
        config.static_calibration.accel,
        offsets.accel,
    )
}

pub fn decode_gyro(
    raw: [i16; 3],
    config: &DeviceConfig,
    offsets: &CalibrationOffsets,
) -> [f32; 3] {
    corrected(
        gyro_uncalibrated(raw, config),
        config.static_calibration.gyro,
        offsets.gyro,
    )
}

/// Die temperature in degrees Celsius. Never inverted or dynamically offset.
pub fn decode_temperature(raw: i16, config: &DeviceConfig) -> f32 {
    raw as f32 / TEMP_SENSITIVITY + TEMP_OFFSET - config.static_calibration.temp
}

/// Decode a full register block into a calibrated sample
pub fn decode(
    raw: &RawRegisterBlock,
    config: &DeviceConfig,
    offsets: &CalibrationOffsets,
) -> Sample {
    Sample {
        accel: decode_accel(raw.accel(), config, offsets),
        gyro: decode_gyro(raw.gyro(), config, offsets),
        temp: decode_temperature(raw.temp(), config),
    }
}
