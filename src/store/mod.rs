// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-device storage of loaded configuration.
//!
//! A [`SceneStore`] owns one [`ConfigSlot`] per scene plus one for the
//! voltage threshold table. Slots start pending or unavailable depending on
//! the board's scene selection, become ready when the loader parses a blob
//! for them, and are re-armed by an explicit reload.

mod slot;

pub use slot::{ConfigSlot, SlotId, UpdateState};

use crate::blob::VoltageThresholdTable;
use crate::device::SceneSelection;
use crate::types::{RegisterProgram, Scene};

/// Scene programs and voltage table of one device.
///
/// # Examples
///
/// ```
/// use awpa::device::SceneSelection;
/// use awpa::store::{SceneStore, SlotId, UpdateState};
/// use awpa::types::Scene;
///
/// let store = SceneStore::new(&SceneSelection::parse("music,voice"));
/// assert_eq!(store.state(SlotId::Scene(Scene::Off)), UpdateState::Pending);
/// assert_eq!(store.state(SlotId::Scene(Scene::Fm)), UpdateState::Unavailable);
/// assert_eq!(store.pending_slots(5).len(), 4);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneStore {
    scenes: [ConfigSlot<RegisterProgram>; 5],
    voltage_table: ConfigSlot<VoltageThresholdTable>,
}

impl SceneStore {
    /// Creates a store seeded from the scene selection.
    ///
    /// Off and the voltage table are always pending.
    #[must_use]
    pub fn new(selection: &SceneSelection) -> Self {
        Self {
            scenes: Scene::ALL.map(|scene| ConfigSlot::new(selection.is_enabled(scene))),
            voltage_table: ConfigSlot::new(true),
        }
    }

    /// Returns the slot of a scene.
    #[must_use]
    pub fn scene(&self, scene: Scene) -> &ConfigSlot<RegisterProgram> {
        &self.scenes[scene.index()]
    }

    /// Returns the slot of a scene for mutation.
    pub fn scene_mut(&mut self, scene: Scene) -> &mut ConfigSlot<RegisterProgram> {
        &mut self.scenes[scene.index()]
    }

    /// Returns the voltage table slot.
    #[must_use]
    pub fn voltage_table(&self) -> &ConfigSlot<VoltageThresholdTable> {
        &self.voltage_table
    }

    /// Returns the voltage table slot for mutation.
    pub fn voltage_table_mut(&mut self) -> &mut ConfigSlot<VoltageThresholdTable> {
        &mut self.voltage_table
    }

    /// Returns the loaded program of a scene, if ready.
    #[must_use]
    pub fn program(&self, scene: Scene) -> Option<&RegisterProgram> {
        self.scene(scene).payload()
    }

    /// Returns the state of any slot.
    #[must_use]
    pub fn state(&self, slot: SlotId) -> UpdateState {
        match slot {
            SlotId::Scene(scene) => self.scene(scene).state(),
            SlotId::VoltageTable => self.voltage_table.state(),
        }
    }

    /// Returns the failed load count of any slot.
    #[must_use]
    pub fn load_attempts(&self, slot: SlotId) -> u32 {
        match slot {
            SlotId::Scene(scene) => self.scene(scene).load_attempts(),
            SlotId::VoltageTable => self.voltage_table.load_attempts(),
        }
    }

    /// Returns the reset generation of any slot.
    #[must_use]
    pub fn generation(&self, slot: SlotId) -> u64 {
        match slot {
            SlotId::Scene(scene) => self.scene(scene).generation(),
            SlotId::VoltageTable => self.voltage_table.generation(),
        }
    }

    /// Slots a loader batch should fetch, in evaluation order, each tagged
    /// with its current generation.
    #[must_use]
    pub fn pending_slots(&self, max_attempts: u32) -> Vec<(SlotId, u64)> {
        SlotId::ALL
            .into_iter()
            .filter(|&slot| match slot {
                SlotId::Scene(scene) => self.scene(scene).wants_load(max_attempts),
                SlotId::VoltageTable => self.voltage_table.wants_load(max_attempts),
            })
            .map(|slot| (slot, self.generation(slot)))
            .collect()
    }

    /// Counts a failed load of `slot` and returns the new attempt count.
    pub fn record_failure(&mut self, slot: SlotId) -> u32 {
        match slot {
            SlotId::Scene(scene) => self.scene_mut(scene).record_failure(),
            SlotId::VoltageTable => self.voltage_table.record_failure(),
        }
    }

    /// Drops every loaded payload and re-arms all slots from the selection.
    pub fn reset(&mut self, selection: &SceneSelection) {
        for scene in Scene::ALL {
            self.scene_mut(scene).reset(selection.is_enabled(scene));
        }
        self.voltage_table.reset(true);
    }
}
