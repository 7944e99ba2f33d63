// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mutable state of one amplifier.

use crate::store::SceneStore;
use crate::types::Scene;

use super::{ChipIdentity, SceneSelection};

/// Power, scene and loaded configuration of one amplifier.
///
/// Lives behind the device lock; every register sequence and every change
/// to the store happens while that lock is held.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceState {
    pub(crate) chip: ChipIdentity,
    pub(crate) power_on: bool,
    pub(crate) current_scene: Scene,
    pub(crate) store: SceneStore,
    pub(crate) chip_name: Option<String>,
}

impl DeviceState {
    pub(crate) fn new(chip: ChipIdentity, selection: &SceneSelection) -> Self {
        Self {
            chip,
            power_on: false,
            current_scene: Scene::Off,
            store: SceneStore::new(selection),
            chip_name: None,
        }
    }

    /// Returns the probed chip.
    #[must_use]
    pub fn chip(&self) -> ChipIdentity {
        self.chip
    }

    /// Returns true if the power rail is on.
    #[must_use]
    pub fn is_powered(&self) -> bool {
        self.power_on
    }

    /// Returns the last applied scene.
    #[must_use]
    pub fn current_scene(&self) -> Scene {
        self.current_scene
    }

    /// Returns the configuration store.
    #[must_use]
    pub fn store(&self) -> &SceneStore {
        &self.store
    }

    /// Returns the chip name reported by the last framed blob, if any.
    #[must_use]
    pub fn chip_name(&self) -> Option<&str> {
        self.chip_name.as_deref()
    }
}
