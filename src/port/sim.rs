// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory ports for tests and bench setups.
//!
//! All simulators are cheap to clone; clones share state, so a test can keep
//! one handle for inspection after handing another to the registry.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::TransportError;
use crate::types::RegisterWrite;

use super::{BlobSource, HardwarePort, VoltageMonitor};

/// Register holding the chip identity. Writes to it do not change what it
/// reads back.
const CHIP_ID_REGISTER: u8 = 0x00;

/// A successful operation observed by a [`SimulatedPort`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortOp {
    /// Register read.
    Read(u8),
    /// Register write of `(address, value)`.
    Write(u8, u8),
    /// Power rail change.
    Power(bool),
}

#[derive(Debug)]
struct PortState {
    registers: [u8; 256],
    ops: Vec<PortOp>,
    powered: bool,
    failing_writes: u32,
    failing_reads: u32,
    write_attempts: u32,
    write_latency: Duration,
}

/// A register file with an operation log and failure injection.
///
/// # Examples
///
/// ```
/// use awpa::port::sim::{PortOp, SimulatedPort};
/// use awpa::port::HardwarePort;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let port = SimulatedPort::new(0x39);
/// port.write(0x01, 0x0c).await.unwrap();
/// assert_eq!(port.read(0x00).await.unwrap(), 0x39);
/// assert_eq!(port.ops(), [PortOp::Write(0x01, 0x0c), PortOp::Read(0x00)]);
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SimulatedPort {
    state: Arc<Mutex<PortState>>,
}

impl SimulatedPort {
    /// Creates a powered-down port whose chip-id register reads `chip_id`.
    #[must_use]
    pub fn new(chip_id: u8) -> Self {
        let mut registers = [0u8; 256];
        registers[usize::from(CHIP_ID_REGISTER)] = chip_id;
        Self {
            state: Arc::new(Mutex::new(PortState {
                registers,
                ops: Vec::new(),
                powered: false,
                failing_writes: 0,
                failing_reads: 0,
                write_attempts: 0,
                write_latency: Duration::ZERO,
            })),
        }
    }

    /// Returns every successful operation so far.
    #[must_use]
    pub fn ops(&self) -> Vec<PortOp> {
        self.state.lock().ops.clone()
    }

    /// Returns every successful register write so far.
    #[must_use]
    pub fn writes(&self) -> Vec<RegisterWrite> {
        self.state
            .lock()
            .ops
            .iter()
            .filter_map(|op| match *op {
                PortOp::Write(address, value) => Some(RegisterWrite::new(address, value)),
                _ => None,
            })
            .collect()
    }

    /// Forgets the operation log.
    pub fn clear_ops(&self) {
        self.state.lock().ops.clear();
    }

    /// Returns the current content of a register.
    #[must_use]
    pub fn register(&self, address: u8) -> u8 {
        self.state.lock().registers[usize::from(address)]
    }

    /// Overwrites a register without logging.
    pub fn set_register(&self, address: u8, value: u8) {
        self.state.lock().registers[usize::from(address)] = value;
    }

    /// Returns `true` if the rail is on.
    #[must_use]
    pub fn is_powered(&self) -> bool {
        self.state.lock().powered
    }

    /// Makes the next `count` write transactions fail.
    pub fn fail_next_writes(&self, count: u32) {
        self.state.lock().failing_writes = count;
    }

    /// Makes the next `count` read transactions fail.
    pub fn fail_next_reads(&self, count: u32) {
        self.state.lock().failing_reads = count;
    }

    /// Delays every write transaction by `latency` before it lands.
    pub fn set_write_latency(&self, latency: Duration) {
        self.state.lock().write_latency = latency;
    }

    /// Returns the number of write transactions attempted, failed or not.
    #[must_use]
    pub fn write_attempts(&self) -> u32 {
        self.state.lock().write_attempts
    }
}

impl HardwarePort for SimulatedPort {
    async fn read(&self, address: u8) -> Result<u8, TransportError> {
        let mut state = self.state.lock();
        if state.failing_reads > 0 {
            state.failing_reads -= 1;
            return Err(TransportError::Nack(address));
        }
        state.ops.push(PortOp::Read(address));
        Ok(state.registers[usize::from(address)])
    }

    async fn write(&self, address: u8, value: u8) -> Result<(), TransportError> {
        let latency = self.state.lock().write_latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        let mut state = self.state.lock();
        state.write_attempts += 1;
        if state.failing_writes > 0 {
            state.failing_writes -= 1;
            return Err(TransportError::Nack(address));
        }
        state.ops.push(PortOp::Write(address, value));
        if address != CHIP_ID_REGISTER {
            state.registers[usize::from(address)] = value;
        }
        Ok(())
    }

    fn power(&self, on: bool) {
        let mut state = self.state.lock();
        state.powered = on;
        state.ops.push(PortOp::Power(on));
    }
}

#[derive(Debug, Default)]
struct SourceState {
    blobs: HashMap<String, Vec<u8>>,
    fetches: Vec<String>,
    latency: Duration,
}

/// Blob storage backed by a map from name to bytes.
#[derive(Debug, Clone, Default)]
pub struct StaticBlobSource {
    state: Arc<Mutex<SourceState>>,
}

impl StaticBlobSource {
    /// Creates an empty source; every fetch returns `None`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a blob, builder style.
    #[must_use]
    pub fn with_blob(self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(name, bytes);
        self
    }

    /// Adds or replaces a blob.
    pub fn insert(&self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.state.lock().blobs.insert(name.into(), bytes.into());
    }

    /// Removes a blob.
    pub fn remove(&self, name: &str) {
        self.state.lock().blobs.remove(name);
    }

    /// Delays every fetch by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.state.lock().latency = latency;
    }

    /// Returns every requested name in request order.
    #[must_use]
    pub fn fetches(&self) -> Vec<String> {
        self.state.lock().fetches.clone()
    }

    /// Returns how often `name` was requested.
    #[must_use]
    pub fn fetch_count(&self, name: &str) -> usize {
        self.state
            .lock()
            .fetches
            .iter()
            .filter(|n| n.as_str() == name)
            .count()
    }
}

impl BlobSource for StaticBlobSource {
    async fn fetch(&self, name: &str) -> Option<Vec<u8>> {
        let latency = {
            let mut state = self.state.lock();
            state.fetches.push(name.to_string());
            state.latency
        };
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        self.state.lock().blobs.get(name).cloned()
    }
}

/// A monitor that counts start and stop calls.
#[derive(Debug, Clone, Default)]
pub struct CountingMonitor {
    starts: Arc<AtomicU32>,
    stops: Arc<AtomicU32>,
}

impl CountingMonitor {
    /// Creates a monitor with zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of `start` calls.
    #[must_use]
    pub fn starts(&self) -> u32 {
        self.starts.load(Ordering::SeqCst)
    }

    /// Returns the number of `stop` calls.
    #[must_use]
    pub fn stops(&self) -> u32 {
        self.stops.load(Ordering::SeqCst)
    }
}

impl VoltageMonitor for CountingMonitor {
    fn start(&self) {
        self.starts.fetch_add(1, Ordering::SeqCst);
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}
