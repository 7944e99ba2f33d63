// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Amplifier event types.

use serde::Serialize;

use crate::store::SlotId;
use crate::types::Scene;

use super::DeviceId;

/// Events emitted by the registry and its amplifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AmplifierEvent {
    /// An amplifier was probed and registered.
    Attached {
        /// The new device.
        device_id: DeviceId,
        /// Effective channel of the device.
        channel: u32,
    },

    /// An amplifier was removed from the registry.
    Detached {
        /// The removed device.
        device_id: DeviceId,
    },

    /// A configuration slot finished loading.
    SlotReady {
        /// The device owning the slot.
        device_id: DeviceId,
        /// The slot.
        #[serde(serialize_with = "serialize_display")]
        slot: SlotId,
    },

    /// A blob could not be fetched or decoded. Another attempt may follow.
    SlotLoadFailed {
        /// The device owning the slot.
        device_id: DeviceId,
        /// The slot.
        #[serde(serialize_with = "serialize_display")]
        slot: SlotId,
        /// Failed attempts so far.
        attempts: u32,
        /// Description of the failure.
        reason: String,
    },

    /// A slot reached the attempt cap and will not be retried until the
    /// next reload.
    SlotExhausted {
        /// The device owning the slot.
        device_id: DeviceId,
        /// The slot.
        #[serde(serialize_with = "serialize_display")]
        slot: SlotId,
    },

    /// A scene was applied.
    SceneApplied {
        /// The device.
        device_id: DeviceId,
        /// The scene now current.
        scene: Scene,
    },

    /// The low-voltage override flag changed.
    LowVoltageChanged {
        /// New flag value.
        active: bool,
    },
}

impl AmplifierEvent {
    /// Returns the device the event concerns, if it concerns a single one.
    #[must_use]
    pub fn device_id(&self) -> Option<DeviceId> {
        match self {
            Self::Attached { device_id, .. }
            | Self::Detached { device_id }
            | Self::SlotReady { device_id, .. }
            | Self::SlotLoadFailed { device_id, .. }
            | Self::SlotExhausted { device_id, .. }
            | Self::SceneApplied { device_id, .. } => Some(*device_id),
            Self::LowVoltageChanged { .. } => None,
        }
    }

    /// Returns the slot for configuration loading events.
    #[must_use]
    pub fn slot(&self) -> Option<SlotId> {
        match self {
            Self::SlotReady { slot, .. }
            | Self::SlotLoadFailed { slot, .. }
            | Self::SlotExhausted { slot, .. } => Some(*slot),
            _ => None,
        }
    }

    /// Returns `true` for attach and detach events.
    #[must_use]
    pub fn is_lifecycle(&self) -> bool {
        matches!(self, Self::Attached { .. } | Self::Detached { .. })
    }
}

fn serialize_display<S: serde::Serializer>(
    slot: &SlotId,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(slot)
}
