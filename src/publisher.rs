use crate::messages::SensorMessage;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::trace;

/// Fan-out of sensor messages to any number of subscribers
#[derive(Clone)]
pub struct SensorHubPublisher {
    tx: broadcast::Sender<SensorMessage>,
    sensor_stats: Arc<RwLock<HashMap<String, SensorStats>>>,
}

#[derive(Clone, Debug, Default)]
pub struct SensorStats {
    pub messages_sent: u64,
    pub errors: u64,
    pub last_error: Option<String>,
    pub last_message_time_ns: u64,
}

impl SensorHubPublisher {
    /// `capacity` messages are buffered per subscriber before the slowest lags
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            sensor_stats: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SensorMessage> {
        self.tx.subscribe()
    }

    /// Publish to every subscriber; having none is fine
    pub async fn publish(&self, message: SensorMessage) {
        let sensor_id = message.sensor_id().to_string();
        let t_utc_ns = message.header().t_utc_ns;
        if self.tx.send(message).is_err() {
            trace!("[{}] no active subscribers", sensor_id);
        }

        let mut stats = self.sensor_stats.write().await;
        let entry = stats.entry(sensor_id).or_default();
        entry.messages_sent += 1;
        entry.last_message_time_ns = t_utc_ns;
    }

    pub async fn record_error(&self, sensor_id: &str, error: &str) {
        let mut stats = self.sensor_stats.write().await;
        let entry = stats.entry(sensor_id.to_string()).or_default();
        entry.errors += 1;
        entry.last_error = Some(error.to_string());
    }

    pub async fn sensor_status(&self) -> HashMap<String, SensorStats> {
        self.sensor_stats.read().await.clone()
    }
}

impl Default for SensorHubPublisher {
    fn default() -> Self {
        // Sized for several 100Hz sensors
        Self::new(1000)
    }
}
