use crate::bus::i2c::I2CBus;
use crate::bus::{Completion, RegisterBus};
use crate::config::{BusConfig, ReadMode, SensorConfig, SensorEntry};
use crate::errors::{RegistryError, RegistryResult, SensorError, SensorResult};
use crate::messages::{CalibrationMessage, Header, SensorMessage, HUB_DEVICE_ID};
use crate::publisher::SensorHubPublisher;
use crate::sensors::mpu6050::calibration::{
    CalibrationOffsets, CalibrationTarget, Clock, MonotonicClock,
};
use crate::sensors::mpu6050::Mpu6050;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

pub const MPU6050_DRIVER: &str = "mpu6050";

/// An initialized device session plus how the scheduler should poll it
pub struct RegisteredSensor {
    pub session: Mpu6050,
    pub mode: ReadMode,
    pub period: Duration,
}

/// A bus, the receiving end of its completions and every sensor on it
pub struct BusGroup<B> {
    pub bus: B,
    pub completions: Option<mpsc::UnboundedReceiver<Completion>>,
    pub sensors: Vec<RegisteredSensor>,
}

impl<B: RegisterBus> BusGroup<B> {
    pub fn new(bus: B, completions: Option<mpsc::UnboundedReceiver<Completion>>) -> Self {
        Self {
            bus,
            completions,
            sensors: Vec::new(),
        }
    }
}

/// Validate one `[[sensor]]` entry, initialize the device and run its
/// start-up calibration.
///
/// A calibration that collects no samples is logged and leaves the offsets
/// at zero.
pub fn register_sensor<B: RegisterBus, C: Clock>(
    bus: &mut B,
    entry: &SensorEntry,
    clock: &C,
) -> SensorResult<(RegisteredSensor, Option<CalibrationOffsets>)> {
    if entry.driver != MPU6050_DRIVER {
        return Err(SensorError::UnsupportedDriver {
            driver: entry.driver.clone(),
        });
    }
    let config = entry.device_config()?;
    let mut session = Mpu6050::init(bus, entry.id.clone(), entry.address, config)?;

    let target = entry.calibration.as_ref().and_then(|c| match (c.gyro, c.accel) {
        (true, true) => Some((CalibrationTarget::All, c.duration())),
        (true, false) => Some((CalibrationTarget::Gyro, c.duration())),
        (false, true) => Some((CalibrationTarget::Accel, c.duration())),
        (false, false) => None,
    });

    let offsets = match target {
        Some((target, duration)) => {
            info!(
                "[{}] calibrating {:?} for {:?}, keep the device still and level",
                entry.id, target, duration
            );
            match session.calibrate(bus, clock, duration, target) {
                Ok(offsets) => Some(offsets),
                Err(e) => {
                    warn!("[{}] start-up calibration skipped: {}", entry.id, e);
                    None
                }
            }
        }
        None => None,
    };

    Ok((
        RegisteredSensor {
            session,
            mode: entry.mode,
            period: entry.period(),
        },
        offsets,
    ))
}

/// Register every configured sensor on its bus group
pub async fn register_all<B: RegisterBus, C: Clock>(
    groups: &mut [BusGroup<B>],
    sensor_config: &SensorConfig,
    publisher: &SensorHubPublisher,
    clock: &C,
) -> RegistryResult<()> {
    info!("[registry] initializing {} sensors...", sensor_config.sensors.len());
    for s in sensor_config.sensors.iter() {
        let registration_error = |source| RegistryError::RegistrationError {
            sensor: s.id.clone(),
            source,
        };

        let group = groups
            .iter_mut()
            .find(|g| g.bus.id() == s.bus)
            .ok_or_else(|| registration_error(SensorError::BusNotFound { bus: s.bus.clone() }))?;

        info!("[registry] registering sensor: id={} driver={} bus={}", s.id, s.driver, s.bus);
        let (sensor, offsets) =
            register_sensor(&mut group.bus, s, clock).map_err(registration_error)?;

        if let Some(offsets) = offsets {
            let header = Header::new(
                HUB_DEVICE_ID.to_string(),
                s.id.clone(),
                "calibration".to_string(),
                0,
            );
            publisher
                .publish(SensorMessage::Calibration(CalibrationMessage::new(header, &offsets)))
                .await;
        }
        group.sensors.push(sensor);
    }
    Ok(())
}

/// Open every configured I2C bus and bring up the sensors on them
pub async fn init_all(
    sensor_config: &SensorConfig,
    bus_config: &BusConfig,
    publisher: &SensorHubPublisher,
) -> RegistryResult<Vec<BusGroup<I2CBus>>> {
    let mut groups = Vec::new();
    for b in bus_config.buses.iter() {
        if b.r#type != "i2c" {
            warn!("[registry] skipping bus '{}' of unsupported type '{}'", b.id, b.r#type);
            continue;
        }
        let mut bus = I2CBus::new(&b.id, &b.path).map_err(|source| {
            RegistryError::BusInitError {
                bus: b.id.clone(),
                source,
            }
        })?;
        info!("[registry] opened bus '{}' at {}", b.id, b.path);
        let completions = bus.take_completions();
        groups.push(BusGroup::new(bus, completions));
    }

    register_all(&mut groups, sensor_config, publisher, &MonotonicClock::new()).await?;
    Ok(groups)
}
