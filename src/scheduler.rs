use crate::bus::{AsyncRegisterBus, Completion};
use crate::config::ReadMode;
use crate::messages::{Header, ImuMessage, SensorMessage, HUB_DEVICE_ID};
use crate::publisher::SensorHubPublisher;
use crate::registry::{BusGroup, RegisteredSensor};
use crate::sensors::Sample;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

/// Polls an async sensor may stay unanswered before its request is abandoned
pub const MAX_MISSED_POLLS: u32 = 3;

struct Slot {
    sensor: RegisteredSensor,
    next_due: Instant,
    seq: u64,
    missed_polls: u32,
}

enum Event {
    Tick,
    Completion(Option<Completion>),
}

/// Spawn the task that owns `group` and polls its sensors until aborted
pub fn spawn_bus_task<B>(group: BusGroup<B>, publisher: SensorHubPublisher) -> JoinHandle<()>
where
    B: AsyncRegisterBus + Send + 'static,
{
    tokio::spawn(run_bus(group, publisher))
}

pub async fn run_bus<B: AsyncRegisterBus>(group: BusGroup<B>, publisher: SensorHubPublisher) {
    let BusGroup {
        mut bus,
        mut completions,
        sensors,
    } = group;
    let bus_id = bus.id().to_string();
    if sensors.is_empty() {
        info!("[{}] no sensors on bus, task exiting", bus_id);
        return;
    }

    let start = Instant::now();
    let mut slots: Vec<Slot> = sensors
        .into_iter()
        .map(|sensor| {
            info!(
                "[{}] polling every {:?} in {:?} mode on bus {}",
                sensor.session.id(),
                sensor.period,
                sensor.mode,
                bus_id
            );
            Slot {
                sensor,
                next_due: start,
                seq: 0,
                missed_polls: 0,
            }
        })
        .collect();

    loop {
        let next_due = slots.iter().map(|s| s.next_due).min().unwrap_or(start);
        let event = tokio::select! {
            _ = sleep_until(next_due) => Event::Tick,
            completion = next_completion(&mut completions) => Event::Completion(completion),
        };

        match event {
            Event::Tick => {
                let now = Instant::now();
                for slot in slots.iter_mut().filter(|s| s.next_due <= now) {
                    slot.next_due += slot.sensor.period;
                    if slot.next_due <= now {
                        // Overran by more than a period; skip the missed ticks
                        slot.next_due = now + slot.sensor.period;
                    }
                    poll(&mut bus, slot, &publisher).await;
                }
            }
            Event::Completion(Some(completion)) => {
                for slot in slots.iter_mut() {
                    if let Some(sample) = slot.sensor.session.handle_rx(&bus_id, &completion) {
                        slot.missed_polls = 0;
                        publish_sample(slot, &sample, &publisher).await;
                    }
                }
            }
            Event::Completion(None) => {
                warn!("[{}] completion channel closed", bus_id);
                completions = None;
            }
        }
    }
}

async fn next_completion(
    completions: &mut Option<mpsc::UnboundedReceiver<Completion>>,
) -> Option<Completion> {
    match completions {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn poll<B: AsyncRegisterBus>(bus: &mut B, slot: &mut Slot, publisher: &SensorHubPublisher) {
    let session = &mut slot.sensor.session;
    match slot.sensor.mode {
        ReadMode::Sync => match session.read_all(bus) {
            Ok(sample) => publish_sample(slot, &sample, publisher).await,
            Err(e) => {
                warn!("[{}] read failed: {}", session.id(), e);
                publisher.record_error(session.id(), &e.to_string()).await;
            }
        },
        ReadMode::Async => {
            if session.is_request_pending() {
                slot.missed_polls += 1;
                if slot.missed_polls < MAX_MISSED_POLLS {
                    debug!("[{}] request still outstanding, skipping poll", session.id());
                    return;
                }
                warn!(
                    "[{}] no completion after {} polls, abandoning request",
                    session.id(),
                    slot.missed_polls
                );
                publisher.record_error(session.id(), "completion never arrived").await;
                session.abandon_request();
            }
            slot.missed_polls = 0;
            if let Err(e) = session.request_all_async(bus) {
                warn!("[{}] request failed: {}", session.id(), e);
                publisher.record_error(session.id(), &e.to_string()).await;
            }
        }
    }
}

async fn publish_sample(slot: &mut Slot, sample: &Sample, publisher: &SensorHubPublisher) {
    slot.seq += 1;
    let session = &slot.sensor.session;
    let config = session.config();
    let header = Header::new(
        HUB_DEVICE_ID.to_string(),
        session.id().to_string(),
        "imu".to_string(),
        slot.seq,
    );
    let message = ImuMessage::from_sample(header, sample, config.accel_unit, config.gyro_unit);
    publisher.publish(SensorMessage::Imu(message)).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::mock::MockBus;
    use crate::bus::BusError;
    use crate::sensors::mpu6050::config::{AccelRange, DeviceConfig, GyroRange};
    use crate::sensors::mpu6050::Mpu6050;
    use std::time::Duration;

    fn sensor(
        bus: &mut MockBus,
        id: &str,
        address: u8,
        mode: ReadMode,
        period_ms: u64,
    ) -> RegisteredSensor {
        let config = DeviceConfig::new(AccelRange::G8, GyroRange::Dps1000);
        RegisteredSensor {
            session: Mpu6050::init(bus, id, address, config).unwrap(),
            mode,
            period: Duration::from_millis(period_ms),
        }
    }

    async fn collect(
        rx: &mut tokio::sync::broadcast::Receiver<SensorMessage>,
        n: usize,
    ) -> Vec<ImuMessage> {
        let mut out = Vec::new();
        while out.len() < n {
            if let SensorMessage::Imu(msg) = rx.recv().await.unwrap() {
                out.push(msg);
            }
        }
        out
    }

    #[tokio::test(start_paused = true)]
    async fn test_sync_sensors_keep_their_own_rates() {
        let mut bus = MockBus::with_mpu6050("i2c1", 0x68);
        bus.set_register(0x69, 0x75, &[0x68]);
        bus.set_raw_block(0x68, [0, 0, 4096], 0, [0; 3]);
        bus.set_raw_block(0x69, [4096, 0, 0], 0, [0; 3]);

        let mut group = BusGroup::new(bus, None);
        group.sensors.push(sensor(&mut group.bus, "fast", 0x68, ReadMode::Sync, 10));
        group.sensors.push(sensor(&mut group.bus, "slow", 0x69, ReadMode::Sync, 30));

        let publisher = SensorHubPublisher::default();
        let mut rx = publisher.subscribe();
        let handle = spawn_bus_task(group, publisher.clone());

        let messages = collect(&mut rx, 8).await;
        handle.abort();

        let fast: Vec<_> = messages.iter().filter(|m| m.h.sensor_id == "fast").collect();
        let slow: Vec<_> = messages.iter().filter(|m| m.h.sensor_id == "slow").collect();
        assert_eq!(fast.len(), 6);
        assert_eq!(slow.len(), 2);
        assert_eq!(fast[0].az, 1.0);
        assert_eq!(slow[0].ax, 1.0);
        assert_eq!(fast.iter().map(|m| m.h.seq).collect::<Vec<_>>(), vec![1, 2, 3, 4, 5, 6]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_async_sensor_publishes_on_completion() {
        let (tx, rx_completions) = mpsc::unbounded_channel();
        let mut bus = MockBus::with_mpu6050("i2c1", 0x68);
        bus.set_raw_block(0x68, [0, 0, 4096], 340, [33, 0, 0]);
        bus.attach_completions(tx);

        let mut group = BusGroup::new(bus, Some(rx_completions));
        group.sensors.push(sensor(&mut group.bus, "imu0", 0x68, ReadMode::Async, 10));

        let publisher = SensorHubPublisher::default();
        let mut rx = publisher.subscribe();
        let handle = spawn_bus_task(group, publisher.clone());

        let messages = collect(&mut rx, 3).await;
        handle.abort();

        assert_eq!(messages[0].az, 1.0);
        assert!((messages[0].temp - 37.43).abs() < 1e-4);
        assert_eq!(messages[2].h.seq, 3);
        assert_eq!(publisher.sensor_status().await["imu0"].errors, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_errors_are_counted_not_fatal() {
        let mut bus = MockBus::with_mpu6050("i2c1", 0x68);
        bus.set_raw_block(0x68, [0, 0, 4096], 0, [0; 3]);

        let mut group = BusGroup::new(bus, None);
        group.sensors.push(sensor(&mut group.bus, "imu0", 0x68, ReadMode::Sync, 10));
        group.bus.fail_reads(2, BusError::Timeout { timeout_ms: 1000 });

        let publisher = SensorHubPublisher::default();
        let mut rx = publisher.subscribe();
        let handle = spawn_bus_task(group, publisher.clone());

        let messages = collect(&mut rx, 1).await;
        handle.abort();

        assert_eq!(messages[0].h.seq, 1);
        let status = publisher.sensor_status().await;
        assert_eq!(status["imu0"].errors, 2);
        assert!(status["imu0"].last_error.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_lost_completion_is_abandoned() {
        // No channel attached: completions stay queued inside the mock
        let mut bus = MockBus::with_mpu6050("i2c1", 0x68);
        bus.set_raw_block(0x68, [0, 0, 4096], 0, [0; 3]);

        let mut group = BusGroup::new(bus, None);
        group.sensors.push(sensor(&mut group.bus, "imu0", 0x68, ReadMode::Async, 10));

        let publisher = SensorHubPublisher::default();
        let handle = spawn_bus_task(group, publisher.clone());

        tokio::time::sleep(Duration::from_millis(55)).await;
        handle.abort();

        let status = publisher.sensor_status().await;
        assert_eq!(status["imu0"].errors, 1);
        assert_eq!(status["imu0"].last_error.as_deref(), Some("completion never arrived"));
    }
}
