use mpu6050_sensorhub::{init_tracing, run_sensor_hub, SensorHubPublisher};
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, warn};

#[tokio::main]
async fn main() {
    // RUST_LOG=debug for verbose, RUST_LOG=info for normal, RUST_LOG=warn for production
    init_tracing();

    let config_path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config".to_string());

    let publisher = SensorHubPublisher::default();
    let mut rx = publisher.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(message) => match message.to_json() {
                    Ok(line) => println!("{}", line),
                    Err(e) => warn!("[{}] failed to serialize: {}", message.sensor_id(), e),
                },
                Err(RecvError::Lagged(n)) => warn!("[stdout] dropped {} messages", n),
                Err(RecvError::Closed) => break,
            }
        }
    });

    if let Err(e) = run_sensor_hub(&config_path, publisher).await {
        error!("[error] {}", e);
        std::process::exit(1);
    }
}
