pub mod sensor_config;
pub mod bus_config;

pub use sensor_config::{load_sensor_config, ReadMode, SensorConfig, SensorEntry};
pub use bus_config::{load_bus_config, BusConfig, BusEntry};
