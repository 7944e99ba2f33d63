// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Seams to the outside world: register bus, power rail, blob storage and
//! the battery voltage monitor.
//!
//! The engine never talks to hardware directly. Each attached amplifier is
//! given a [`HardwarePort`] for register access and power control, a
//! [`BlobSource`] to fetch firmware blobs by name, and optionally a
//! [`VoltageMonitor`] it starts and stops with audible scenes.
//!
//! [`sim`] provides in-memory implementations used by tests and demos.

mod bus;
pub mod sim;

pub use bus::{RegisterBus, RetryPolicy};

use std::future::Future;

use crate::error::TransportError;

/// Register access and power control of a single amplifier.
///
/// Implementations perform one bus transaction per call; retrying is done by
/// [`RegisterBus`].
pub trait HardwarePort: Send + Sync + 'static {
    /// Reads one register.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the transaction fails.
    fn read(&self, address: u8) -> impl Future<Output = Result<u8, TransportError>> + Send;

    /// Writes one register.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the transaction fails.
    fn write(
        &self,
        address: u8,
        value: u8,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Drives the enable line. Turning the rail on pulses the chip through
    /// reset.
    fn power(&self, on: bool);
}

/// Asynchronous fetch of named firmware blobs.
pub trait BlobSource: Send + Sync + 'static {
    /// Fetches a blob by name, or `None` if it cannot be obtained.
    fn fetch(&self, name: &str) -> impl Future<Output = Option<Vec<u8>>> + Send;
}

/// Battery voltage monitor driven by the scene controller.
pub trait VoltageMonitor: Send + Sync {
    /// Starts or refreshes monitoring.
    fn start(&self);

    /// Stops monitoring.
    fn stop(&self);
}

/// A monitor that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullMonitor;

impl VoltageMonitor for NullMonitor {
    fn start(&self) {}

    fn stop(&self) {}
}
