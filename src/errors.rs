use thiserror::Error;
use crate::bus::BUS_TIMEOUT;
use crate::sensors::mpu6050::registers::Register;
use std::io;

/// Transport-level failures, propagated verbatim to the caller of a transfer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    #[error("bus transfer timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("bus transfer failed with status {0:#04x}")]
    Status(u8),

    #[error("I2C communication failed: {0}")]
    Transfer(String),

    #[error("bus not supported: {0}")]
    Unsupported(String),
}

/// Kernel timeouts become [`BusError::Timeout`], everything else keeps its OS text
impl From<io::Error> for BusError {
    fn from(error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::TimedOut => BusError::Timeout {
                timeout_ms: BUS_TIMEOUT.as_millis() as u64,
            },
            _ => BusError::Transfer(error.to_string()),
        }
    }
}

/// Failures of the one-time device initialization handshake
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InitError {
    #[error(
        "device {address:#04x} wrong identity: expected {expected:#04x}, got {}",
        identity_text(.actual)
    )]
    IdentityMismatch {
        address: u8,
        expected: u8,
        /// `None` when the identity register could not be read at all
        actual: Option<u8>,
    },

    #[error("device {address:#04x} rejected write to {register:?}: {source}")]
    ConfigWriteFailed {
        address: u8,
        register: Register,
        #[source]
        source: BusError,
    },
}

fn identity_text(actual: &Option<u8>) -> String {
    match actual {
        Some(value) => format!("{:#04x}", value),
        None => "no response".to_string(),
    }
}

/// Comprehensive error types for sensor operation
#[derive(Error, Debug)]
pub enum SensorError {
    #[error(transparent)]
    Bus(#[from] BusError),

    #[error(transparent)]
    Init(#[from] InitError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Sensor '{sensor}' already has an asynchronous read outstanding")]
    RequestPending { sensor: String },

    #[error("Sensor '{sensor}' calibration collected no samples")]
    NoSamples { sensor: String },

    #[error("Unsupported sensor driver: '{driver}'")]
    UnsupportedDriver { driver: String },

    #[error("Bus '{bus}' not found or unavailable")]
    BusNotFound { bus: String },
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration from '{path}': {source}")]
    LoadError {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Invalid configuration format: {0}")]
    FormatError(#[from] toml::de::Error),

    #[error("Invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Registry and initialization errors
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Sensor '{sensor}' registration failed: {source}")]
    RegistrationError {
        sensor: String,
        #[source]
        source: SensorError,
    },

    #[error("Bus '{bus}' initialization failed: {source}")]
    BusInitError {
        bus: String,
        #[source]
        source: BusError,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type aliases for convenience
pub type SensorResult<T> = Result<T, SensorError>;
pub type ConfigResult<T> = Result<T, ConfigError>;
pub type RegistryResult<T> = Result<T, RegistryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_mismatch_message() {
        let err = InitError::IdentityMismatch {
            address: 0x68,
            expected: 0x68,
            actual: Some(0x70),
        };
        let text = err.to_string();
        assert!(text.contains("0x68"));
        assert!(text.contains("0x70"));
    }

    #[test]
    fn test_io_timeout_is_a_bus_timeout() {
        let err = BusError::from(io::Error::new(io::ErrorKind::TimedOut, "adapter gave up"));
        assert_eq!(err, BusError::Timeout { timeout_ms: 1000 });

        let err = BusError::from(io::Error::new(io::ErrorKind::Other, "remote I/O error"));
        assert_eq!(err, BusError::Transfer("remote I/O error".to_string()));
    }

    #[test]
    fn test_bus_error_passes_through_sensor_error() {
        let err: SensorError = BusError::Status(0x02).into();
        assert_eq!(err.to_string(), "bus transfer failed with status 0x02");
        assert!(matches!(err, SensorError::Bus(BusError::Status(0x02))));
    }
}
