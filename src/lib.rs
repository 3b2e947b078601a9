// Public modules
pub mod bus;
pub mod config;
pub mod errors;
pub mod messages;
pub mod publisher;
pub mod registry;
pub mod scheduler;
pub mod sensors;

// Re-export commonly used types
pub use bus::{AsyncRegisterBus, Completion, RegisterBus};
pub use config::{load_bus_config, load_sensor_config, BusConfig, SensorConfig};
pub use errors::{BusError, InitError, SensorError, SensorResult};
pub use publisher::SensorHubPublisher;
pub use registry::init_all;
pub use scheduler::spawn_bus_task;
pub use sensors::mpu6050::calibration::{CalibrationOffsets, Clock, MonotonicClock};
pub use sensors::mpu6050::Mpu6050;
pub use sensors::Sample;

use tracing::info;
use tracing_subscriber::EnvFilter;

/// Initialize tracing with default configuration
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(std::io::stderr)
        .init();
}

/// Bring up every configured device and poll until ctrl-c.
///
/// Messages go to `publisher`; subscribe before calling to also receive the
/// start-up calibration results.
pub async fn run_sensor_hub(
    config_path: &str,
    publisher: SensorHubPublisher,
) -> Result<(), Box<dyn std::error::Error>> {
    info!("[mpu6050-sensorhub] starting up...");

    let bus_config = load_bus_config(&format!("{}/buses.toml", config_path))?;
    let sensor_config = load_sensor_config(&format!("{}/sensors.toml", config_path))?;
    info!(
        "[config] loaded {} bus(es), {} sensor(s)",
        bus_config.buses.len(),
        sensor_config.sensors.len()
    );

    let groups = init_all(&sensor_config, &bus_config, &publisher).await?;
    info!("[registry] sensors and buses initialized");

    let handles: Vec<_> = groups
        .into_iter()
        .map(|group| spawn_bus_task(group, publisher.clone()))
        .collect();
    info!("[main] {} bus task(s) launched", handles.len());

    tokio::signal::ctrl_c().await?;
    info!("[main] shutting down");
    for handle in handles {
        handle.abort();
    }
    Ok(())
}
