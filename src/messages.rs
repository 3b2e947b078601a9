use crate::sensors::mpu6050::calibration::CalibrationOffsets;
use crate::sensors::mpu6050::config::{AccelUnit, GyroUnit};
use crate::sensors::Sample;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

pub const SCHEMA_VERSION: u16 = 1;

/// `device_id` stamped into every header published by this host
pub const HUB_DEVICE_ID: &str = "mpu6050_hub";

fn mono_origin() -> Instant {
    static ORIGIN: OnceLock<Instant> = OnceLock::new();
    *ORIGIN.get_or_init(Instant::now)
}

/// Header metadata common to all sensor messages
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Header {
    /// Unique device identifier
    pub device_id: String,
    /// Sensor identifier (e.g., "imu0")
    pub sensor_id: String,
    /// Reference frame identifier
    pub frame_id: String,
    /// Sequence number for message ordering
    pub seq: u64,
    /// UTC timestamp in nanoseconds
    pub t_utc_ns: u64,
    /// Nanoseconds since the process first stamped a header
    pub t_mono_ns: u64,
    /// Message schema version for evolution
    pub schema_v: u16,
}

impl Header {
    /// Create a new header with current timestamps
    pub fn new(device_id: String, sensor_id: String, frame_id: String, seq: u64) -> Self {
        let t_mono_ns = mono_origin().elapsed().as_nanos() as u64;
        let t_utc_ns = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64;

        Self {
            device_id,
            sensor_id,
            frame_id,
            seq,
            t_utc_ns,
            t_mono_ns,
            schema_v: SCHEMA_VERSION,
        }
    }
}

/// IMU sensor data (accelerometer + gyroscope + die temperature)
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ImuMessage {
    pub h: Header,
    pub ax: f32,
    pub ay: f32,
    pub az: f32,
    pub gx: f32,
    pub gy: f32,
    pub gz: f32,
    /// Temperature (°C)
    pub temp: f32,
    pub accel_unit: AccelUnit,
    pub gyro_unit: GyroUnit,
}

impl ImuMessage {
    pub fn from_sample(
        h: Header,
        sample: &Sample,
        accel_unit: AccelUnit,
        gyro_unit: GyroUnit,
    ) -> Self {
        let [ax, ay, az] = sample.accel;
        let [gx, gy, gz] = sample.gyro;
        Self {
            h,
            ax,
            ay,
            az,
            gx,
            gy,
            gz,
            temp: sample.temp,
            accel_unit,
            gyro_unit,
        }
    }
}

/// Offsets in effect after a calibration run
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CalibrationMessage {
    pub h: Header,
    pub gyro_offset: [f32; 3],
    pub accel_offset: [f32; 3],
}

impl CalibrationMessage {
    pub fn new(h: Header, offsets: &CalibrationOffsets) -> Self {
        Self {
            h,
            gyro_offset: offsets.gyro,
            accel_offset: offsets.accel,
        }
    }
}

/// Unified sensor message enum
#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum SensorMessage {
    Imu(ImuMessage),
    Calibration(CalibrationMessage),
}

impl SensorMessage {
    /// Get the header from any sensor message
    pub fn header(&self) -> &Header {
        match self {
            SensorMessage::Imu(msg) => &msg.h,
            SensorMessage::Calibration(msg) => &msg.h,
        }
    }

    /// Get the sensor ID from any sensor message
    pub fn sensor_id(&self) -> &str {
        &self.header().sensor_id
    }

    /// Serialize to a single JSON line
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_creation() {
        let header = Header::new(
            "test_device".to_string(),
            "imu0".to_string(),
            "base_link".to_string(),
            42,
        );

        assert_eq!(header.device_id, "test_device");
        assert_eq!(header.sensor_id, "imu0");
        assert_eq!(header.seq, 42);
        assert_eq!(header.schema_v, SCHEMA_VERSION);
        assert!(header.t_utc_ns > 0);
    }

    #[test]
    fn test_imu_message_serialization() {
        let header = Header::new(
            "test".to_string(),
            "imu0".to_string(),
            "base_link".to_string(),
            1,
        );
        let sample = Sample {
            accel: [0.0, 0.5, 1.0],
            gyro: [0.25, 0.0, -0.25],
            temp: 36.5,
        };
        let msg = SensorMessage::Imu(ImuMessage::from_sample(
            header,
            &sample,
            AccelUnit::G,
            GyroUnit::RadiansPerSecond,
        ));

        let json = msg.to_json().unwrap();
        assert!(!json.contains('\n'));
        assert!(json.contains("imu0"));
        assert!(json.contains("\"rad/s\""));

        let decoded: SensorMessage = serde_json::from_str(&json).unwrap();
        match decoded {
            SensorMessage::Imu(imu) => {
                assert_eq!(imu.az, 1.0);
                assert_eq!(imu.gz, -0.25);
                assert_eq!(imu.temp, 36.5);
                assert_eq!(imu.accel_unit, AccelUnit::G);
            }
            _ => panic!("Wrong message type"),
        }
    }

    #[test]
    fn test_calibration_message_carries_offsets() {
        let header = Header::new(
            "hub".to_string(),
            "imu0".to_string(),
            "calibration".to_string(),
            0,
        );
        let offsets = CalibrationOffsets {
            gyro: [1.0, 2.0, 3.0],
            accel: [0.0, 0.0, -0.5],
        };
        let msg = SensorMessage::Calibration(CalibrationMessage::new(header, &offsets));

        assert_eq!(msg.sensor_id(), "imu0");
        let json = msg.to_json().unwrap();
        assert!(json.contains("gyro_offset"));
    }
}
