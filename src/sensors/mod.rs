pub mod mpu6050;

/// One decoded reading of every channel
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Acceleration in the configured unit (g or m/s^2)
    pub accel: [f32; 3],
    /// Angular rate in the configured unit (deg/s or rad/s)
    pub gyro: [f32; 3],
    /// Die temperature in degrees Celsius
    pub temp: f32,
}
