//! Recording bus for tests

use super::{AsyncRegisterBus, BusError, Completion, RegisterBus};
use std::collections::{HashMap, VecDeque};
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transaction {
    Read { device: u8, register: u8, len: usize },
    Write { device: u8, register: u8, data: Vec<u8> },
    Request { device: u8, register: u8, len: usize },
}

/// Register-file backed bus.
///
/// Reads return the stored bytes (zero when unset), writes store them.
/// Completions of asynchronous requests are queued until the test takes
/// them, or forwarded to a channel when one is attached.
pub struct MockBus {
    id: String,
    registers: HashMap<(u8, u8), u8>,
    transactions: Vec<Transaction>,
    failing_reads: usize,
    read_error: BusError,
    failing_write: Option<(u8, BusError)>,
    completions: VecDeque<Completion>,
    completion_tx: Option<mpsc::UnboundedSender<Completion>>,
}

impl MockBus {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            registers: HashMap::new(),
            transactions: Vec::new(),
            failing_reads: 0,
            read_error: BusError::Status(0x01),
            failing_write: None,
            completions: VecDeque::new(),
            completion_tx: None,
        }
    }

    /// Bus with a responsive MPU6050 at `device`
    pub fn with_mpu6050(id: &str, device: u8) -> Self {
        let mut bus = Self::new(id);
        bus.set_register(device, 0x75, &[0x68]);
        bus
    }

    pub fn set_register(&mut self, device: u8, register: u8, bytes: &[u8]) {
        for (i, byte) in bytes.iter().enumerate() {
            self.registers.insert((device, register + i as u8), *byte);
        }
    }

    pub fn register(&self, device: u8, register: u8) -> u8 {
        self.registers.get(&(device, register)).copied().unwrap_or(0)
    }

    /// Program the ACCEL_XOUT_H..GYRO_ZOUT_L window
    pub fn set_raw_block(&mut self, device: u8, accel: [i16; 3], temp: i16, gyro: [i16; 3]) {
        let mut bytes = Vec::with_capacity(14);
        for word in accel.iter().chain([temp].iter()).chain(gyro.iter()) {
            bytes.extend_from_slice(&word.to_be_bytes());
        }
        self.set_register(device, 0x3B, &bytes);
    }

    /// The next `count` reads fail with `error`
    pub fn fail_reads(&mut self, count: usize, error: BusError) {
        self.failing_reads = count;
        self.read_error = error;
    }

    /// Every write to `register` fails with `error`
    pub fn fail_writes_to(&mut self, register: u8, error: BusError) {
        self.failing_write = Some((register, error));
    }

    pub fn attach_completions(&mut self, tx: mpsc::UnboundedSender<Completion>) {
        self.completion_tx = Some(tx);
    }

    pub fn take_completion(&mut self) -> Option<Completion> {
        self.completions.pop_front()
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn writes(&self) -> Vec<(u8, Vec<u8>)> {
        self.transactions
            .iter()
            .filter_map(|t| match t {
                Transaction::Write { register, data, .. } => Some((*register, data.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn clear_transactions(&mut self) {
        self.transactions.clear();
    }

    fn fill(&self, device: u8, register: u8, buf: &mut [u8]) {
        for (i, byte) in buf.iter_mut().enumerate() {
            *byte = self.register(device, register + i as u8);
        }
    }
}

impl RegisterBus for MockBus {
    fn id(&self) -> &str {
        &self.id
    }

    fn read_register(&mut self, device: u8, register: u8, buf: &mut [u8]) -> Result<(), BusError> {
        self.transactions.push(Transaction::Read {
            device,
            register,
            len: buf.len(),
        });
        if self.failing_reads > 0 {
            self.failing_reads -= 1;
            return Err(self.read_error.clone());
        }
        self.fill(device, register, buf);
        Ok(())
    }

    fn write_register(&mut self, device: u8, register: u8, bytes: &[u8]) -> Result<(), BusError> {
        self.transactions.push(Transaction::Write {
            device,
            register,
            data: bytes.to_vec(),
        });
        if let Some((failing, error)) = &self.failing_write {
            if *failing == register {
                return Err(error.clone());
            }
        }
        self.set_register(device, register, bytes);
        Ok(())
    }
}

impl AsyncRegisterBus for MockBus {
    fn request_read(&mut self, device: u8, register: u8, len: usize) -> Result<(), BusError> {
        self.transactions.push(Transaction::Request {
            device,
            register,
            len,
        });
        if self.failing_reads > 0 {
            self.failing_reads -= 1;
            return Err(self.read_error.clone());
        }
        let mut data = vec![0u8; len];
        self.fill(device, register, &mut data);
        let completion = Completion {
            device,
            register,
            data,
        };
        match &self.completion_tx {
            Some(tx) => {
                let _ = tx.send(completion);
            }
            None => self.completions.push_back(completion),
        }
        Ok(())
    }
}
