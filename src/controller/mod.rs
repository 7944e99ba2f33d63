// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Register sequences that put an amplifier into a scene.
//!
//! A [`SceneController`] borrows the bus and voltage monitor of one
//! amplifier and operates on its [`DeviceState`]. Callers hold the device
//! lock for the whole call, so sequences of different callers never
//! interleave on one chip.

mod fallback;

pub use fallback::{
    BOOST_VOLTAGE, DEFAULT_VOLTAGE, DISABLE_OUTPUT, Fallback, MUSIC_DEFAULTS, VOICE_DEFAULTS,
    VOLTAGE_PAIR_INDEX,
};

use crate::device::DeviceState;
use crate::error::TransportError;
use crate::port::{HardwarePort, RegisterBus, VoltageMonitor};
use crate::types::{RegisterWrite, Scene};

/// Applies scenes and the low-voltage override to one amplifier.
pub(crate) struct SceneController<'a, P> {
    bus: &'a RegisterBus<P>,
    monitor: &'a dyn VoltageMonitor,
}

impl<'a, P: HardwarePort> SceneController<'a, P> {
    pub(crate) fn new(bus: &'a RegisterBus<P>, monitor: &'a dyn VoltageMonitor) -> Self {
        Self { bus, monitor }
    }

    /// Puts the device into `scene`.
    ///
    /// Off always ends with the rail down and the monitor stopped, even
    /// when the disable sequence failed. Audible scenes stop at the first
    /// failed write and leave the current scene untouched.
    pub(crate) async fn apply(
        &self,
        state: &mut DeviceState,
        scene: Scene,
        low_voltage: bool,
    ) -> Result<(), TransportError> {
        if scene == Scene::Off {
            return self.apply_off(state).await;
        }

        if !state.power_on {
            self.bus.power(true);
            state.power_on = true;
        }

        if let Some(program) = state.store.program(scene) {
            tracing::debug!(%scene, writes = program.len(), "Writing loaded program");
            self.write_all(program.writes()).await?;
            if scene == Scene::Music && low_voltage {
                self.write(BOOST_VOLTAGE).await?;
            }
        } else {
            let fallback = Fallback::for_scene(scene);
            if fallback == Fallback::Nothing {
                tracing::info!(%scene, "Scene not loaded and has no fallback");
            } else {
                tracing::warn!(%scene, "Scene not loaded, writing defaults");
            }
            self.write_all(fallback.writes()).await?;
        }

        self.monitor.start();
        state.current_scene = scene;
        Ok(())
    }

    async fn apply_off(&self, state: &mut DeviceState) -> Result<(), TransportError> {
        let mut result = Ok(());
        if state.power_on {
            result = match state.store.program(Scene::Off) {
                Some(program) => self.write_all(program.writes()).await,
                None => {
                    tracing::debug!("Off not loaded, disabling output");
                    self.write_all(Fallback::for_scene(Scene::Off).writes()).await
                }
            };
        }

        self.bus.power(false);
        state.power_on = false;
        self.monitor.stop();
        state.current_scene = Scene::Off;
        result
    }

    /// Writes the boosted voltage, or restores the Music voltage, on a
    /// powered device. Returns `false` without touching the bus when the
    /// device is off.
    pub(crate) async fn low_voltage_override(
        &self,
        state: &DeviceState,
        active: bool,
    ) -> Result<bool, TransportError> {
        if !state.power_on {
            return Ok(false);
        }
        let write = if active {
            BOOST_VOLTAGE
        } else {
            restore_voltage(state)
        };
        self.write(write).await?;
        Ok(true)
    }

    async fn write_all(&self, writes: &[RegisterWrite]) -> Result<(), TransportError> {
        for &write in writes {
            self.write(write).await?;
        }
        Ok(())
    }

    async fn write(&self, write: RegisterWrite) -> Result<(), TransportError> {
        self.bus.write(write.address, write.value).await
    }
}

fn restore_voltage(state: &DeviceState) -> RegisterWrite {
    state
        .store
        .program(Scene::Music)
        .and_then(|program| program.get(VOLTAGE_PAIR_INDEX))
        .unwrap_or(DEFAULT_VOLTAGE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{ChipIdentity, SceneSelection};
    use crate::port::{NullMonitor, RetryPolicy};
    use crate::port::sim::{CountingMonitor, PortOp, SimulatedPort};
    use crate::types::RegisterProgram;

    fn setup() -> (SimulatedPort, RegisterBus<SimulatedPort>, DeviceState) {
        let port = SimulatedPort::new(0x39);
        let bus = RegisterBus::new(port.clone(), RetryPolicy::default());
        let chip = ChipIdentity::from_chip_id(0x39, false).unwrap();
        (port, bus, DeviceState::new(chip, &SceneSelection::all()))
    }

    fn music_program() -> RegisterProgram {
        RegisterProgram::from_pair_bytes(&[0x01, 0x0e, 0x02, 0xa3, 0x03, 0x07, 0x04, 0x05])
    }

    #[tokio::test(start_paused = true)]
    async fn off_without_program_writes_disable_then_powers_down() {
        let (port, bus, mut state) = setup();
        let monitor = CountingMonitor::new();
        state.power_on = true;

        SceneController::new(&bus, &monitor)
            .apply(&mut state, Scene::Off, false)
            .await
            .unwrap();

        assert_eq!(port.ops(), [PortOp::Write(0x01, 0x0c), PortOp::Power(false)]);
        assert!(!state.power_on);
        assert_eq!(monitor.stops(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn off_while_unpowered_writes_nothing() {
        let (port, bus, mut state) = setup();
        let monitor = CountingMonitor::new();

        SceneController::new(&bus, &monitor)
            .apply(&mut state, Scene::Off, false)
            .await
            .unwrap();

        assert_eq!(port.ops(), [PortOp::Power(false)]);
    }

    #[tokio::test(start_paused = true)]
    async fn off_powers_down_even_when_write_fails() {
        let (port, bus, mut state) = setup();
        let monitor = CountingMonitor::new();
        state.power_on = true;
        state.current_scene = Scene::Voice;
        port.fail_next_writes(5);

        let result = SceneController::new(&bus, &monitor)
            .apply(&mut state, Scene::Off, false)
            .await;

        assert!(result.is_err());
        assert!(!port.is_powered());
        assert_eq!(state.current_scene, Scene::Off);
        assert_eq!(monitor.stops(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn music_powers_on_and_writes_program() {
        let (port, bus, mut state) = setup();
        let monitor = CountingMonitor::new();
        state.store.scene_mut(Scene::Music).mark_ready(music_program());

        SceneController::new(&bus, &monitor)
            .apply(&mut state, Scene::Music, false)
            .await
            .unwrap();

        assert_eq!(port.ops()[0], PortOp::Power(true));
        assert_eq!(port.writes(), music_program().writes());
        assert_eq!(state.current_scene, Scene::Music);
        assert_eq!(monitor.starts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn music_with_low_voltage_appends_boost() {
        let (port, bus, mut state) = setup();
        let monitor = CountingMonitor::new();
        state.store.scene_mut(Scene::Music).mark_ready(music_program());

        SceneController::new(&bus, &monitor)
            .apply(&mut state, Scene::Music, true)
            .await
            .unwrap();

        let writes = port.writes();
        assert_eq!(writes.len(), music_program().len() + 1);
        assert_eq!(writes.last(), Some(&BOOST_VOLTAGE));
    }

    #[tokio::test(start_paused = true)]
    async fn voice_without_program_uses_defaults() {
        let (port, bus, mut state) = setup();
        let monitor = CountingMonitor::new();

        SceneController::new(&bus, &monitor)
            .apply(&mut state, Scene::Voice, false)
            .await
            .unwrap();

        assert_eq!(port.writes(), VOICE_DEFAULTS);
    }

    #[tokio::test(start_paused = true)]
    async fn receiver_without_program_writes_nothing_but_changes_scene() {
        let (port, bus, mut state) = setup();
        let monitor = CountingMonitor::new();

        SceneController::new(&bus, &monitor)
            .apply(&mut state, Scene::Receiver, false)
            .await
            .unwrap();

        assert!(port.writes().is_empty());
        assert!(state.power_on);
        assert_eq!(state.current_scene, Scene::Receiver);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_audible_apply_keeps_scene() {
        let (port, bus, mut state) = setup();
        let monitor = CountingMonitor::new();
        port.fail_next_writes(5);

        let result = SceneController::new(&bus, &monitor)
            .apply(&mut state, Scene::Music, false)
            .await;

        assert!(result.is_err());
        assert_eq!(state.current_scene, Scene::Off);
        assert_eq!(monitor.starts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn restore_uses_music_voltage_pair() {
        let (port, bus, mut state) = setup();
        let monitor = NullMonitor;
        state.power_on = true;
        state.store.scene_mut(Scene::Music).mark_ready(music_program());

        let wrote = SceneController::new(&bus, &monitor)
            .low_voltage_override(&state, false)
            .await
            .unwrap();

        assert!(wrote);
        assert_eq!(port.writes(), [RegisterWrite::new(0x03, 0x07)]);
    }

    #[tokio::test(start_paused = true)]
    async fn restore_without_music_uses_default_voltage() {
        let (port, bus, mut state) = setup();
        let monitor = NullMonitor;
        state.power_on = true;

        SceneController::new(&bus, &monitor)
            .low_voltage_override(&state, false)
            .await
            .unwrap();

        assert_eq!(port.writes(), [DEFAULT_VOLTAGE]);
    }

    #[tokio::test(start_paused = true)]
    async fn override_skips_unpowered_device() {
        let (port, bus, state) = setup();
        let monitor = NullMonitor;

        let wrote = SceneController::new(&bus, &monitor)
            .low_voltage_override(&state, true)
            .await
            .unwrap();

        assert!(!wrote);
        assert!(port.ops().is_empty());
    }
}
