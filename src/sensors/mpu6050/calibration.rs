//! Zero-offset calibration by time-windowed averaging.
//!
//! The device must be stationary and level for the whole window. Offsets
//! live in the direction-corrected output frame, so [`decode`](super::decode)
//! subtracts them as they are.

use super::decode::{accel_uncalibrated, gyro_uncalibrated};
use super::Mpu6050;
use crate::bus::RegisterBus;
use crate::errors::{SensorError, SensorResult};
use std::time::{Duration, Instant};
use tracing::{info, trace, warn};

/// Dynamic bias subtracted from every decoded sample.
///
/// Each value is the mean bias itself, in the direction-corrected output
/// frame, and `decode` subtracts it as is (not a negated correction to add).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CalibrationOffsets {
    pub gyro: [f32; 3],
    pub accel: [f32; 3],
}

/// Monotonic time source for the sampling window
pub trait Clock {
    /// Time elapsed since an arbitrary fixed origin
    fn now(&self) -> Duration;
}

pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationTarget {
    Gyro,
    Accel,
    All,
}

impl CalibrationTarget {
    fn gyro(self) -> bool {
        matches!(self, CalibrationTarget::Gyro | CalibrationTarget::All)
    }

    fn accel(self) -> bool {
        matches!(self, CalibrationTarget::Accel | CalibrationTarget::All)
    }
}

#[derive(Debug, Default)]
struct MeanAccumulator {
    sum: [f64; 3],
    count: u32,
}

impl MeanAccumulator {
    fn add(&mut self, value: [f32; 3]) {
        for (sum, v) in self.sum.iter_mut().zip(value) {
            *sum += v as f64;
        }
        self.count += 1;
    }

    fn mean(&self) -> Option<[f32; 3]> {
        if self.count == 0 {
            return None;
        }
        let n = self.count as f64;
        Some(self.sum.map(|s| (s / n) as f32))
    }
}

impl Mpu6050 {
    pub fn calibrate_gyro<B: RegisterBus, C: Clock>(
        &mut self,
        bus: &mut B,
        clock: &C,
        duration: Duration,
    ) -> SensorResult<CalibrationOffsets> {
        self.calibrate(bus, clock, duration, CalibrationTarget::Gyro)
    }

    pub fn calibrate_accel<B: RegisterBus, C: Clock>(
        &mut self,
        bus: &mut B,
        clock: &C,
        duration: Duration,
    ) -> SensorResult<CalibrationOffsets> {
        self.calibrate(bus, clock, duration, CalibrationTarget::Accel)
    }

    /// Gyro and accelerometer from one sampling loop of 14-byte bursts
    pub fn calibrate_all<B: RegisterBus, C: Clock>(
        &mut self,
        bus: &mut B,
        clock: &C,
        duration: Duration,
    ) -> SensorResult<CalibrationOffsets> {
        self.calibrate(bus, clock, duration, CalibrationTarget::All)
    }

    /// Sample until `duration` has passed on `clock` and replace the targeted
    /// offsets with the measured bias.
    ///
    /// Failed reads are skipped. If no read succeeded the offsets are left
    /// unchanged and [`SensorError::NoSamples`] is returned.
    pub fn calibrate<B: RegisterBus, C: Clock>(
        &mut self,
        bus: &mut B,
        clock: &C,
        duration: Duration,
        target: CalibrationTarget,
    ) -> SensorResult<CalibrationOffsets> {
        let static_cal = self.config.static_calibration;
        let accel_rest = [0.0, 0.0, self.config.accel_z_rest()];

        let mut gyro = MeanAccumulator::default();
        let mut accel = MeanAccumulator::default();
        let mut skipped = 0u32;

        let deadline = clock.now() + duration;
        while clock.now() < deadline {
            let reading = match target {
                CalibrationTarget::Gyro => self.read_gyro_words(bus).map(|g| (None, Some(g))),
                CalibrationTarget::Accel => self.read_accel_words(bus).map(|a| (Some(a), None)),
                CalibrationTarget::All => self
                    .read_block(bus)
                    .map(|block| (Some(block.accel()), Some(block.gyro()))),
            };

            match reading {
                Ok((raw_accel, raw_gyro)) => {
                    if let Some(raw) = raw_gyro {
                        let value = gyro_uncalibrated(raw, &self.config);
                        gyro.add(std::array::from_fn(|i| value[i] - static_cal.gyro[i]));
                    }
                    if let Some(raw) = raw_accel {
                        let value = accel_uncalibrated(raw, &self.config);
                        accel.add(std::array::from_fn(|i| {
                            value[i] - static_cal.accel[i] - accel_rest[i]
                        }));
                    }
                }
                Err(e) => {
                    skipped += 1;
                    trace!("[{}] calibration sample skipped: {}", self.id, e);
                }
            }
        }

        let gyro_mean = gyro.mean();
        let accel_mean = accel.mean();
        if (target.gyro() && gyro_mean.is_none()) || (target.accel() && accel_mean.is_none()) {
            warn!(
                "[{}] calibration over {:?} collected no samples ({} reads failed)",
                self.id, duration, skipped
            );
            return Err(SensorError::NoSamples {
                sensor: self.id.clone(),
            });
        }

        if let Some(mean) = gyro_mean {
            self.offsets.gyro = mean;
        }
        if let Some(mean) = accel_mean {
            self.offsets.accel = mean;
        }

        info!(
            "[{}] calibrated {:?} from {} samples ({} skipped): gyro={:?} accel={:?}",
            self.id,
            target,
            gyro.count.max(accel.count),
            skipped,
            self.offsets.gyro,
            self.offsets.accel
        );

        Ok(self.offsets)
    }
}
