// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Process-wide set of attached amplifiers.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;

use crate::device::{Amplifier, DeviceConfig, Shared};
use crate::error::{Error, Result};
use crate::event::{AmplifierEvent, DeviceId, EventBus};
use crate::loader::LoaderTiming;
use crate::port::{BlobSource, HardwarePort, NullMonitor, RetryPolicy, VoltageMonitor};
use crate::types::{RegisterWrite, Scene};

/// Left speaker channel.
pub const LEFT_CHANNEL: u32 = 0;

/// Right speaker channel.
pub const RIGHT_CHANNEL: u32 = 1;

/// Output path requested when an amplifier is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AudioPath {
    /// Loudspeaker; uses the speaker scene.
    #[default]
    Speaker,
    /// Earpiece; uses the Receiver scene.
    Receiver,
}

/// Registry of attached amplifiers.
///
/// Holds the device list, the low-voltage override flag and the speaker
/// settings shared by every amplifier. The list lock is only held while
/// cloning handles; register traffic happens under each device's own lock.
///
/// # Examples
///
/// ```
/// use awpa::device::DeviceConfig;
/// use awpa::manager::DeviceRegistry;
/// use awpa::port::sim::{SimulatedPort, StaticBlobSource};
/// use awpa::types::Scene;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> awpa::Result<()> {
/// let registry = DeviceRegistry::new();
/// let port = SimulatedPort::new(0x39);
///
/// registry
///     .attach(DeviceConfig::new(2, 0x58), port.clone(), StaticBlobSource::new())
///     .await?;
/// registry.set_scene(0, Scene::Voice).await?;
///
/// assert_eq!(registry.get_scene(0).await?, Scene::Voice);
/// assert!(port.is_powered());
/// # Ok(())
/// # }
/// ```
pub struct DeviceRegistry<P, S> {
    devices: RwLock<Vec<Arc<Amplifier<P, S>>>>,
    low_voltage: Arc<AtomicBool>,
    recognized_chip: AtomicBool,
    muted: AtomicBool,
    speaker_scene: Mutex<Scene>,
    timing: LoaderTiming,
    retry: RetryPolicy,
    events: EventBus,
}

impl<P: HardwarePort, S: BlobSource> DeviceRegistry<P, S> {
    /// Creates an empty registry with default timing.
    #[must_use]
    pub fn new() -> Self {
        Self {
            devices: RwLock::new(Vec::new()),
            low_voltage: Arc::new(AtomicBool::new(false)),
            recognized_chip: AtomicBool::new(false),
            muted: AtomicBool::new(false),
            speaker_scene: Mutex::new(Scene::Music),
            timing: LoaderTiming::default(),
            retry: RetryPolicy::default(),
            events: EventBus::new(),
        }
    }

    /// Sets the loader timing used for devices attached from now on.
    #[must_use]
    pub fn with_timing(mut self, timing: LoaderTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Sets the bus retry policy used for devices attached from now on.
    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// Subscribes to amplifier events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AmplifierEvent> {
        self.events.subscribe()
    }

    /// Attaches an amplifier without a voltage monitor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnrecognizedDevice`] if the chip never identified
    /// itself.
    pub async fn attach(&self, config: DeviceConfig, port: P, source: S) -> Result<DeviceId> {
        self.attach_with_monitor(config, port, source, NullMonitor).await
    }

    /// Probes an amplifier and registers it.
    ///
    /// The rail is pulsed to reset the chip and the identity register is
    /// probed. A recognized chip is soft-reset, powered down, registered,
    /// and its configuration starts loading after the settle delay.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnrecognizedDevice`] if the chip never identified
    /// itself; the rail is left off and nothing is registered.
    pub async fn attach_with_monitor(
        &self,
        config: DeviceConfig,
        port: P,
        source: S,
        monitor: impl VoltageMonitor + 'static,
    ) -> Result<DeviceId> {
        tracing::info!(
            name = %config.display_name(),
            bus = config.bus,
            address = config.address,
            channel = config.channel(),
            "Attaching amplifier"
        );
        let shared = Shared {
            timing: self.timing,
            retry: self.retry,
            events: self.events.clone(),
            low_voltage: Arc::clone(&self.low_voltage),
        };
        let amp = Amplifier::probe(config, port, source, Box::new(monitor), shared).await?;
        self.recognized_chip.store(true, Ordering::Release);

        amp.start().await;

        let device_id = amp.id();
        let channel = amp.channel();
        let amp_name = amp.name().to_string();
        self.devices.write().push(amp);

        tracing::info!(%device_id, name = %amp_name, channel, "Amplifier attached");
        self.events
            .publish(AmplifierEvent::Attached { device_id, channel });
        Ok(device_id)
    }

    /// Applies Off and removes an amplifier.
    ///
    /// The device is removed even if the Off sequence failed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeviceNotFound`] for an unknown id, or the Off
    /// sequence's transport error.
    pub async fn detach(&self, device_id: DeviceId) -> Result<()> {
        let amp = self.device(device_id).ok_or(Error::DeviceNotFound)?;
        let result = amp.shutdown().await;
        self.devices.write().retain(|d| d.id() != device_id);

        tracing::info!(%device_id, "Amplifier detached");
        self.events.publish(AmplifierEvent::Detached { device_id });
        result
    }

    /// Returns the amplifier with the given id.
    #[must_use]
    pub fn device(&self, device_id: DeviceId) -> Option<Arc<Amplifier<P, S>>> {
        self.devices
            .read()
            .iter()
            .find(|d| d.id() == device_id)
            .cloned()
    }

    /// Returns the first amplifier driving `channel`.
    #[must_use]
    pub fn find_by_channel(&self, channel: u32) -> Option<Arc<Amplifier<P, S>>> {
        self.devices
            .read()
            .iter()
            .find(|d| d.channel() == channel)
            .cloned()
    }

    /// Returns handles to every attached amplifier, in attach order.
    #[must_use]
    pub fn devices(&self) -> Vec<Arc<Amplifier<P, S>>> {
        self.devices.read().clone()
    }

    /// Returns the number of attached amplifiers.
    #[must_use]
    pub fn device_count(&self) -> usize {
        self.devices.read().len()
    }

    fn channel(&self, channel: u32) -> Result<Arc<Amplifier<P, S>>> {
        self.find_by_channel(channel).ok_or_else(|| {
            tracing::debug!(channel, "No amplifier on channel");
            Error::DeviceNotFound
        })
    }

    /// Returns the current scene of the amplifier on `channel`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeviceNotFound`] if no amplifier drives `channel`.
    pub async fn current_mode(&self, channel: u32) -> Result<Scene> {
        Ok(self.channel(channel)?.current_scene().await)
    }

    /// Same as [`current_mode`](Self::current_mode).
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeviceNotFound`] if no amplifier drives `channel`.
    pub async fn get_scene(&self, channel: u32) -> Result<Scene> {
        self.current_mode(channel).await
    }

    /// Applies a scene to the amplifier on `channel`.
    ///
    /// The low-voltage override is sampled under the device lock, so an
    /// override set while this call waits for the lock is honoured.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeviceNotFound`] if no amplifier drives `channel`,
    /// or [`Error::Transport`] if a register write failed.
    pub async fn set_scene(&self, channel: u32, scene: Scene) -> Result<()> {
        let amp = self.channel(channel)?;
        amp.apply(scene).await
    }

    /// Sets the low-voltage override and writes it to every powered
    /// amplifier.
    ///
    /// Every device is visited even if an earlier one failed.
    ///
    /// # Errors
    ///
    /// Returns the first transport error encountered.
    pub async fn set_low_voltage_override(&self, active: bool) -> Result<()> {
        self.low_voltage.store(active, Ordering::Release);
        tracing::info!(active, "Low-voltage override");
        self.events
            .publish(AmplifierEvent::LowVoltageChanged { active });

        let mut first_error = None;
        for amp in self.devices() {
            if let Err(e) = amp.apply_low_voltage(active).await {
                tracing::warn!(device = amp.name(), error = %e, "Low-voltage write failed");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Returns the low-voltage override flag.
    #[must_use]
    pub fn low_voltage_override(&self) -> bool {
        self.low_voltage.load(Ordering::Acquire)
    }

    /// Discards the loaded configuration of the amplifier on `channel` and
    /// loads it again.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeviceNotFound`] if no amplifier drives `channel`.
    pub async fn reload(&self, channel: u32) -> Result<()> {
        self.channel(channel)?.reload().await;
        Ok(())
    }

    /// Reads the register map of the amplifier on `channel`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeviceNotFound`] if no amplifier drives `channel`,
    /// or [`Error::Transport`] if a read failed.
    pub async fn dump_registers(&self, channel: u32) -> Result<Vec<RegisterWrite>> {
        self.channel(channel)?.dump_registers().await
    }

    /// Writes one register of the amplifier on `channel`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeviceNotFound`] if no amplifier drives `channel`,
    /// or [`Error::Transport`] if the write failed.
    pub async fn write_register(&self, channel: u32, address: u8, value: u8) -> Result<()> {
        self.channel(channel)?.write_register(address, value).await
    }

    /// Drives the power rail of the amplifier on `channel`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeviceNotFound`] if no amplifier drives `channel`.
    pub async fn set_power(&self, channel: u32, on: bool) -> Result<()> {
        self.channel(channel)?.set_power(on).await;
        Ok(())
    }

    /// Returns the scene used for the speaker path.
    #[must_use]
    pub fn speaker_scene(&self) -> Scene {
        *self.speaker_scene.lock()
    }

    /// Sets the scene used for the speaker path. Takes effect on the next
    /// enable or unmute.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidScene`] unless `scene` is Music, Voice or Fm.
    pub fn set_speaker_scene(&self, scene: Scene) -> Result<()> {
        if !matches!(scene, Scene::Music | Scene::Voice | Scene::Fm) {
            return Err(Error::InvalidScene(scene.to_string()));
        }
        *self.speaker_scene.lock() = scene;
        Ok(())
    }

    /// Enables or disables the amplifier on `channel`.
    ///
    /// Enabling applies the speaker scene or Receiver depending on `path`;
    /// disabling applies Off.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeviceNotFound`] if no amplifier drives `channel`,
    /// or [`Error::Transport`] if a register write failed.
    pub async fn enable_amplifier(&self, channel: u32, enabled: bool, path: AudioPath) -> Result<()> {
        let scene = match (enabled, path) {
            (false, _) => Scene::Off,
            (true, AudioPath::Speaker) => self.speaker_scene(),
            (true, AudioPath::Receiver) => Scene::Receiver,
        };
        self.set_scene(channel, scene).await
    }

    /// Mutes or unmutes both speaker channels, right first.
    ///
    /// Muting applies Off; unmuting applies the speaker scene. Channels
    /// without an amplifier are skipped.
    ///
    /// # Errors
    ///
    /// Returns the first transport error; the mute flag is updated anyway.
    pub async fn set_muted(&self, muted: bool) -> Result<()> {
        let scene = if muted {
            Scene::Off
        } else {
            self.speaker_scene()
        };

        let mut first_error = None;
        for channel in [RIGHT_CHANNEL, LEFT_CHANNEL] {
            match self.set_scene(channel, scene).await {
                Ok(()) | Err(Error::DeviceNotFound) => {}
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        self.muted.store(muted, Ordering::Release);
        first_error.map_or(Ok(()), Err)
    }

    /// Returns the mute flag.
    #[must_use]
    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::Acquire)
    }

    /// Returns true once any attach identified a supported chip.
    #[must_use]
    pub fn has_recognized_chip(&self) -> bool {
        self.recognized_chip.load(Ordering::Acquire)
    }
}

impl<P: HardwarePort, S: BlobSource> Default for DeviceRegistry<P, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P, S> std::fmt::Debug for DeviceRegistry<P, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceRegistry")
            .field("devices", &self.devices.read().len())
            .field("low_voltage", &self.low_voltage)
            .field("muted", &self.muted)
            .finish_non_exhaustive()
    }
}
