// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Board description of an amplifier instance.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::store::SlotId;
use crate::types::Scene;

/// Blob name prefix used when the board does not set one.
pub const DEFAULT_FIRMWARE_PREFIX: &str = "awinic/";

/// Bus addresses of multi-channel parts. Devices elsewhere have a single
/// track and use channel 0.
const MULTI_CHANNEL_ADDRESSES: RangeInclusive<u8> = 0x58..=0x5b;

fn default_firmware_prefix() -> String {
    DEFAULT_FIRMWARE_PREFIX.to_string()
}

/// Board description of one amplifier.
///
/// Deserializes from the same property names a board file uses.
///
/// # Examples
///
/// ```
/// use awpa::device::DeviceConfig;
///
/// let config = DeviceConfig::from_json(
///     r#"{ "bus": 2, "address": 88, "pa-channel": 1, "scene-mode": "music,voice" }"#,
/// )
/// .unwrap();
/// assert_eq!(config.channel(), 1);
/// assert_eq!(config.firmware_prefix, "awinic/");
///
/// let config = DeviceConfig::new(2, 0x58)
///     .with_channel(1)
///     .with_reset_line(true)
///     .with_friendly_name("Left speaker");
/// assert_eq!(config.display_name(), "Left speaker");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Bus number.
    pub bus: u32,
    /// Bus address of the amplifier.
    pub address: u8,
    /// Configured channel. Only honoured for multi-channel addresses.
    #[serde(default, rename = "pa-channel", skip_serializing_if = "Option::is_none")]
    pub channel: Option<u32>,
    /// Comma or space separated list of scenes to load.
    #[serde(default, rename = "scene-mode", skip_serializing_if = "Option::is_none")]
    pub scene_mode: Option<String>,
    /// Whether the board wires a reset line to the part.
    #[serde(default, rename = "reset-gpio")]
    pub has_reset_line: bool,
    /// Prefix prepended to every blob name.
    #[serde(default = "default_firmware_prefix", rename = "firmware-prefix")]
    pub firmware_prefix: String,
    /// Optional human readable name.
    #[serde(default, rename = "friendly-name", skip_serializing_if = "Option::is_none")]
    pub friendly_name: Option<String>,
}

impl DeviceConfig {
    /// Creates a description for the amplifier at `address` on `bus`.
    #[must_use]
    pub fn new(bus: u32, address: u8) -> Self {
        Self {
            bus,
            address,
            channel: None,
            scene_mode: None,
            has_reset_line: false,
            firmware_prefix: default_firmware_prefix(),
            friendly_name: None,
        }
    }

    /// Parses a description from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the document is malformed.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }

    /// Sets the channel.
    #[must_use]
    pub fn with_channel(mut self, channel: u32) -> Self {
        self.channel = Some(channel);
        self
    }

    /// Restricts which scenes are loaded.
    #[must_use]
    pub fn with_scene_mode(mut self, mode: impl Into<String>) -> Self {
        self.scene_mode = Some(mode.into());
        self
    }

    /// Declares whether the board wires a reset line.
    #[must_use]
    pub fn with_reset_line(mut self, present: bool) -> Self {
        self.has_reset_line = present;
        self
    }

    /// Sets the blob name prefix.
    #[must_use]
    pub fn with_firmware_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.firmware_prefix = prefix.into();
        self
    }

    /// Sets a friendly name.
    #[must_use]
    pub fn with_friendly_name(mut self, name: impl Into<String>) -> Self {
        self.friendly_name = Some(name.into());
        self
    }

    /// Returns true if the address belongs to a multi-channel part.
    #[must_use]
    pub fn is_multi_channel(&self) -> bool {
        MULTI_CHANNEL_ADDRESSES.contains(&self.address)
    }

    /// Returns the effective channel.
    #[must_use]
    pub fn channel(&self) -> u32 {
        if self.is_multi_channel() {
            self.channel.unwrap_or(0)
        } else {
            0
        }
    }

    /// Returns the scene selection derived from `scene_mode`.
    #[must_use]
    pub fn scene_selection(&self) -> SceneSelection {
        self.scene_mode
            .as_deref()
            .map_or_else(SceneSelection::all, SceneSelection::parse)
    }

    /// Returns the friendly name, or a name derived from bus and address.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.friendly_name
            .clone()
            .unwrap_or_else(|| format!("aw87xxx_pa_{}_{:02x}", self.bus, self.address))
    }

    /// Builds the blob naming scheme for a probed chip.
    #[must_use]
    pub fn blob_names(&self, chip_id: u8) -> BlobNames {
        BlobNames {
            prefix: self.firmware_prefix.clone(),
            chip_id,
            channel: self.is_multi_channel().then(|| self.channel()),
        }
    }
}

/// Which scenes a board asks to be loaded.
///
/// Off and the voltage table are always loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneSelection {
    music: bool,
    voice: bool,
    fm: bool,
    receiver: bool,
}

impl SceneSelection {
    /// Selects every scene.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            music: true,
            voice: true,
            fm: true,
            receiver: true,
        }
    }

    /// Parses a comma or space separated list of scene tokens.
    ///
    /// Unknown tokens are ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use awpa::device::SceneSelection;
    /// use awpa::types::Scene;
    ///
    /// let selection = SceneSelection::parse("music, rcv");
    /// assert!(selection.is_enabled(Scene::Music));
    /// assert!(selection.is_enabled(Scene::Receiver));
    /// assert!(!selection.is_enabled(Scene::Voice));
    /// assert!(selection.is_enabled(Scene::Off));
    /// ```
    #[must_use]
    pub fn parse(mode: &str) -> Self {
        let mut selection = Self {
            music: false,
            voice: false,
            fm: false,
            receiver: false,
        };
        for token in mode.split([',', ' ']).filter(|t| !t.is_empty()) {
            match token {
                "music" => selection.music = true,
                "voice" => selection.voice = true,
                "fm" => selection.fm = true,
                "rcv" => selection.receiver = true,
                other => tracing::debug!(token = other, "Ignoring unknown scene token"),
            }
        }
        selection
    }

    /// Returns true if `scene` should be loaded.
    #[must_use]
    pub const fn is_enabled(&self, scene: Scene) -> bool {
        match scene {
            Scene::Off => true,
            Scene::Music => self.music,
            Scene::Voice => self.voice,
            Scene::Fm => self.fm,
            Scene::Receiver => self.receiver,
        }
    }
}

impl Default for SceneSelection {
    fn default() -> Self {
        Self::all()
    }
}

/// Names blobs for one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobNames {
    prefix: String,
    chip_id: u8,
    channel: Option<u32>,
}

impl BlobNames {
    /// Returns the blob name of a slot.
    ///
    /// # Examples
    ///
    /// ```
    /// use awpa::device::DeviceConfig;
    /// use awpa::store::SlotId;
    /// use awpa::types::Scene;
    ///
    /// let names = DeviceConfig::new(1, 0x59).with_channel(1).blob_names(0x39);
    /// assert_eq!(
    ///     names.name(SlotId::Scene(Scene::Receiver)),
    ///     "awinic/aw87xxx_pid_39_rcv_1.bin"
    /// );
    /// assert_eq!(names.name(SlotId::VoltageTable), "awinic/aw87xxx_vmax_1.bin");
    ///
    /// let names = DeviceConfig::new(1, 0x20).blob_names(0x5a);
    /// assert_eq!(names.name(SlotId::Scene(Scene::Off)), "awinic/aw87xxx_pid_5a_off.bin");
    /// ```
    #[must_use]
    pub fn name(&self, slot: SlotId) -> String {
        let suffix = self.channel.map(|c| format!("_{c}")).unwrap_or_default();
        match slot {
            SlotId::Scene(scene) => format!(
                "{}aw87xxx_pid_{:02x}_{}{suffix}.bin",
                self.prefix,
                self.chip_id,
                scene.as_str()
            ),
            SlotId::VoltageTable => format!("{}aw87xxx_vmax{suffix}.bin", self.prefix),
        }
    }
}
