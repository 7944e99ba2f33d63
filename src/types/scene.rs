// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Operating scenes of the amplifier.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// One of the five mutually exclusive operating modes of an amplifier.
///
/// The numeric values match the mode numbers accepted by the control
/// surface (`0` = off through `4` = receiver).
///
/// # Examples
///
/// ```
/// use awpa::types::Scene;
///
/// let scene: Scene = "rcv".parse().unwrap();
/// assert_eq!(scene, Scene::Receiver);
/// assert_eq!(scene.as_num(), 4);
/// assert_eq!(Scene::try_from(1).unwrap(), Scene::Music);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scene {
    /// Amplifier disabled and powered down.
    #[default]
    Off,
    /// Loudspeaker music playback.
    Music,
    /// Loudspeaker voice call.
    Voice,
    /// FM radio playback.
    Fm,
    /// Earpiece receiver.
    #[serde(rename = "rcv")]
    Receiver,
}

impl Scene {
    /// All scenes, in the order slots are evaluated.
    pub const ALL: [Scene; 5] = [
        Scene::Off,
        Scene::Music,
        Scene::Voice,
        Scene::Fm,
        Scene::Receiver,
    ];

    /// Returns the token used in blob names and scene selection strings.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Music => "music",
            Self::Voice => "voice",
            Self::Fm => "fm",
            Self::Receiver => "rcv",
        }
    }

    /// Returns the numeric mode value.
    #[must_use]
    pub const fn as_num(&self) -> u8 {
        match self {
            Self::Off => 0,
            Self::Music => 1,
            Self::Voice => 2,
            Self::Fm => 3,
            Self::Receiver => 4,
        }
    }

    /// Position of this scene in [`Scene::ALL`].
    #[must_use]
    pub(crate) const fn index(self) -> usize {
        self.as_num() as usize
    }

    /// Returns `true` for every scene except [`Scene::Off`].
    #[must_use]
    pub const fn is_audible(&self) -> bool {
        !matches!(self, Self::Off)
    }
}

impl fmt::Display for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scene {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" | "0" => Ok(Self::Off),
            "music" | "1" => Ok(Self::Music),
            "voice" | "2" => Ok(Self::Voice),
            "fm" | "3" => Ok(Self::Fm),
            "rcv" | "receiver" | "4" => Ok(Self::Receiver),
            _ => Err(Error::InvalidScene(s.to_string())),
        }
    }
}

impl TryFrom<u8> for Scene {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .get(usize::from(value))
            .copied()
            .ok_or_else(|| Error::InvalidScene(value.to_string()))
    }
}
