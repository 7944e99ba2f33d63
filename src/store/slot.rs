// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A single configuration slot.

use std::fmt;

use crate::types::Scene;

/// Load state of a configuration slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateState {
    /// Not loaded yet; the loader should fetch it.
    Pending,
    /// Excluded by the board description; never loaded.
    Unavailable,
    /// Parsed successfully; the payload is present.
    Ready,
}

/// Identifies one slot of a device's store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotId {
    /// The register program of a scene.
    Scene(Scene),
    /// The battery voltage threshold table.
    VoltageTable,
}

impl SlotId {
    /// Every slot, in loader evaluation order.
    pub const ALL: [SlotId; 6] = [
        SlotId::Scene(Scene::Off),
        SlotId::Scene(Scene::Music),
        SlotId::Scene(Scene::Voice),
        SlotId::Scene(Scene::Fm),
        SlotId::Scene(Scene::Receiver),
        SlotId::VoltageTable,
    ];
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scene(scene) => write!(f, "{scene}"),
            Self::VoltageTable => f.write_str("vmax"),
        }
    }
}

/// A slot holding a payload of type `T` once loaded.
///
/// The payload is present exactly when the state is [`UpdateState::Ready`];
/// the fields are private so that only the transitions below can change
/// either one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSlot<T> {
    state: UpdateState,
    payload: Option<T>,
    load_attempts: u32,
    generation: u64,
}

impl<T> ConfigSlot<T> {
    /// Creates an empty slot, pending or unavailable.
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self {
            state: if enabled {
                UpdateState::Pending
            } else {
                UpdateState::Unavailable
            },
            payload: None,
            load_attempts: 0,
            generation: 0,
        }
    }

    /// Returns the load state.
    #[must_use]
    pub fn state(&self) -> UpdateState {
        self.state
    }

    /// Returns `true` when the payload is loaded.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state == UpdateState::Ready
    }

    /// Returns the payload if loaded.
    #[must_use]
    pub fn payload(&self) -> Option<&T> {
        self.payload.as_ref()
    }

    /// Returns the number of failed loads since the last success or reset.
    #[must_use]
    pub fn load_attempts(&self) -> u32 {
        self.load_attempts
    }

    /// Returns the reset generation; completions from older generations are
    /// stale.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns `true` if a loader batch should fetch this slot.
    #[must_use]
    pub fn wants_load(&self, max_attempts: u32) -> bool {
        self.state == UpdateState::Pending && self.load_attempts < max_attempts
    }

    /// Stores a successfully parsed payload.
    pub fn mark_ready(&mut self, payload: T) {
        self.state = UpdateState::Ready;
        self.payload = Some(payload);
        self.load_attempts = 0;
    }

    /// Counts a failed load and returns the new attempt count.
    pub fn record_failure(&mut self) -> u32 {
        self.load_attempts = self.load_attempts.saturating_add(1);
        self.load_attempts
    }

    /// Drops the payload and re-arms the slot, starting a new generation.
    pub fn reset(&mut self, enabled: bool) {
        let generation = self.generation.wrapping_add(1);
        *self = Self::new(enabled);
        self.generation = generation;
    }
}
