// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Handle to one attached amplifier.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Mutex;

use crate::controller::SceneController;
use crate::error::{Error, Result};
use crate::event::{AmplifierEvent, DeviceId, EventBus};
use crate::loader::{self, ConfigLoader, LoaderTiming};
use crate::port::{BlobSource, HardwarePort, RegisterBus, RetryPolicy, VoltageMonitor};
use crate::types::{RegisterWrite, Scene};

use super::chip::{self, SOFT_RESET};
use super::{BlobNames, ChipIdentity, DeviceConfig, DeviceState, SceneSelection};

/// Registry-wide settings handed to every amplifier at attach.
#[derive(Debug, Clone)]
pub(crate) struct Shared {
    pub(crate) timing: LoaderTiming,
    pub(crate) retry: RetryPolicy,
    pub(crate) events: EventBus,
    pub(crate) low_voltage: Arc<AtomicBool>,
}

/// One probed amplifier with its bus, blob source and state.
///
/// Every register sequence and every store update takes the device lock, so
/// scene changes, overrides, raw writes and loader completions on the same
/// chip are serialized.
pub struct Amplifier<P, S> {
    pub(crate) id: DeviceId,
    pub(crate) name: String,
    pub(crate) config: DeviceConfig,
    pub(crate) selection: SceneSelection,
    pub(crate) chip: ChipIdentity,
    pub(crate) names: BlobNames,
    pub(crate) bus: RegisterBus<P>,
    pub(crate) source: S,
    pub(crate) monitor: Box<dyn VoltageMonitor>,
    pub(crate) state: Mutex<DeviceState>,
    pub(crate) loader: ConfigLoader,
    pub(crate) events: EventBus,
    pub(crate) low_voltage: Arc<AtomicBool>,
}

impl<P: HardwarePort, S: BlobSource> Amplifier<P, S> {
    /// Pulses the chip through reset and identifies it.
    ///
    /// On failure the rail is left off and nothing is allocated for the
    /// device.
    pub(crate) async fn probe(
        config: DeviceConfig,
        port: P,
        source: S,
        monitor: Box<dyn VoltageMonitor>,
        shared: Shared,
    ) -> Result<Arc<Self>> {
        let bus = RegisterBus::new(port, shared.retry);
        bus.power(true);

        let chip = match chip::probe(&bus, config.has_reset_line).await {
            Ok(chip) => chip,
            Err(e) => {
                bus.power(false);
                return Err(e);
            }
        };

        let selection = config.scene_selection();
        let names = config.blob_names(chip.chip_id);
        let mut state = DeviceState::new(chip, &selection);
        state.power_on = true;

        Ok(Arc::new(Self {
            id: DeviceId::new(),
            name: config.display_name(),
            config,
            selection,
            chip,
            names,
            bus,
            source,
            monitor,
            state: Mutex::new(state),
            loader: ConfigLoader::new(shared.timing),
            events: shared.events,
            low_voltage: shared.low_voltage,
        }))
    }

    /// Soft-resets the chip, powers it down and schedules the first loader
    /// batch after the settle delay.
    pub(crate) async fn start(self: &Arc<Self>) {
        {
            let mut state = self.state.lock().await;
            if let Err(e) = self.bus.write(SOFT_RESET.address, SOFT_RESET.value).await {
                tracing::warn!(device = %self.name, error = %e, "Soft reset failed");
            }
            self.bus.power(false);
            state.power_on = false;
        }
        loader::schedule_batch(self, self.loader.timing().settle_delay);
    }

    /// Stops loading and applies Off.
    pub(crate) async fn shutdown(&self) -> Result<()> {
        self.loader.cancel();
        self.apply(Scene::Off).await
    }

    /// Returns the identifier assigned at attach.
    #[must_use]
    pub fn id(&self) -> DeviceId {
        self.id
    }

    /// Returns the board's friendly name, or `aw87xxx_pa_<bus>_<addr>`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the board description.
    #[must_use]
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Returns the probed chip.
    #[must_use]
    pub fn chip(&self) -> ChipIdentity {
        self.chip
    }

    /// Returns the effective channel.
    #[must_use]
    pub fn channel(&self) -> u32 {
        self.config.channel()
    }

    /// Returns the blob naming of this device.
    #[must_use]
    pub fn blob_names(&self) -> &BlobNames {
        &self.names
    }

    /// Applies a scene.
    ///
    /// The registry-wide low-voltage override is read once the device lock
    /// is held; it only matters for Music.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if a register write failed. Off still
    /// powers the device down in that case.
    pub async fn apply(&self, scene: Scene) -> Result<()> {
        let mut state = self.state.lock().await;
        let low_voltage = self.low_voltage.load(Ordering::Acquire);
        tracing::info!(
            device = %self.name,
            channel = self.channel(),
            from = %state.current_scene,
            to = %scene,
            "Applying scene"
        );
        SceneController::new(&self.bus, self.monitor.as_ref())
            .apply(&mut state, scene, low_voltage)
            .await?;
        drop(state);

        self.events.publish(AmplifierEvent::SceneApplied {
            device_id: self.id,
            scene,
        });
        Ok(())
    }

    /// Writes the boosted or restored output voltage if the device is
    /// powered. Returns whether a write happened.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the write failed.
    pub async fn apply_low_voltage(&self, active: bool) -> Result<bool> {
        let state = self.state.lock().await;
        let wrote = SceneController::new(&self.bus, self.monitor.as_ref())
            .low_voltage_override(&state, active)
            .await?;
        if wrote {
            tracing::info!(device = %self.name, active, "Low-voltage override written");
        }
        Ok(wrote)
    }

    /// Returns the last applied scene.
    pub async fn current_scene(&self) -> Scene {
        self.state.lock().await.current_scene
    }

    /// Returns a copy of the device state.
    pub async fn snapshot(&self) -> DeviceState {
        self.state.lock().await.clone()
    }

    /// Drops every loaded payload and schedules a new batch after the
    /// reload delay.
    pub async fn reload(self: &Arc<Self>) {
        self.state.lock().await.store.reset(&self.selection);
        tracing::info!(device = %self.name, "Configuration reload requested");
        loader::schedule_batch(self, self.loader.timing().reload_delay);
    }

    /// Reads every register of the product's register map.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if a read failed.
    pub async fn dump_registers(&self) -> Result<Vec<RegisterWrite>> {
        let _state = self.state.lock().await;
        let mut registers = Vec::with_capacity(usize::from(self.chip.product.register_count()));
        for address in 0..self.chip.product.register_count() {
            let value = self.bus.read(address).await?;
            registers.push(RegisterWrite::new(address, value));
        }
        Ok(registers)
    }

    /// Writes a single register.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the write failed.
    pub async fn write_register(&self, address: u8, value: u8) -> Result<()> {
        let _state = self.state.lock().await;
        tracing::info!(device = %self.name, address, value, "Raw register write");
        self.bus.write(address, value).await.map_err(Error::from)
    }

    /// Drives the power rail directly.
    pub async fn set_power(&self, on: bool) {
        let mut state = self.state.lock().await;
        self.bus.power(on);
        state.power_on = on;
    }
}

impl<P, S> fmt::Debug for Amplifier<P, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Amplifier")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("config", &self.config)
            .field("chip", &self.chip)
            .finish_non_exhaustive()
    }
}
