// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Built-in register writes used when a scene has no loaded program.

use crate::types::{RegisterWrite, Scene};

const fn w(address: u8, value: u8) -> RegisterWrite {
    RegisterWrite::new(address, value)
}

/// Write that disables the output stage when Off has no program.
pub const DISABLE_OUTPUT: RegisterWrite = w(0x01, 0x0c);

/// Default speaker program for Music.
pub const MUSIC_DEFAULTS: [RegisterWrite; 10] = [
    w(0x01, 0x0e),
    w(0x02, 0xa3),
    w(0x03, 0x06),
    w(0x04, 0x05),
    w(0x05, 0x0c),
    w(0x06, 0x0f),
    w(0x07, 0x52),
    w(0x08, 0x09),
    w(0x09, 0x08),
    w(0x0a, 0x97),
];

/// Default speaker program for Voice.
pub const VOICE_DEFAULTS: [RegisterWrite; 10] = [
    w(0x01, 0x0e),
    w(0x02, 0xa3),
    w(0x03, 0x06),
    w(0x04, 0x05),
    w(0x05, 0x10),
    w(0x06, 0x07),
    w(0x07, 0x52),
    w(0x08, 0x06),
    w(0x09, 0x08),
    w(0x0a, 0x96),
];

/// Output voltage write used while the low-voltage override is active.
pub const BOOST_VOLTAGE: RegisterWrite = w(0x03, 0x02);

/// Output voltage write restored when Music has no loaded program.
pub const DEFAULT_VOLTAGE: RegisterWrite = MUSIC_DEFAULTS[2];

/// Index of the pair in the Music program that carries the output voltage.
pub const VOLTAGE_PAIR_INDEX: usize = 2;

/// What to write for a scene whose slot is not ready.
///
/// Only Music and Voice have a default program; Fm and Receiver write
/// nothing.
///
/// # Examples
///
/// ```
/// use awpa::controller::Fallback;
/// use awpa::types::Scene;
///
/// assert_eq!(Fallback::for_scene(Scene::Off).writes().len(), 1);
/// assert_eq!(Fallback::for_scene(Scene::Music).writes().len(), 10);
/// assert!(Fallback::for_scene(Scene::Fm).writes().is_empty());
/// assert!(Scene::Receiver.default_program().is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    /// Single write disabling the output stage.
    Disable(RegisterWrite),
    /// Built-in default program.
    Defaults(&'static [RegisterWrite]),
    /// Nothing is written.
    Nothing,
}

impl Fallback {
    /// Returns the fallback of a scene.
    #[must_use]
    pub const fn for_scene(scene: Scene) -> Self {
        match scene {
            Scene::Off => Self::Disable(DISABLE_OUTPUT),
            Scene::Music | Scene::Voice => match scene.default_program() {
                Some(program) => Self::Defaults(program),
                None => Self::Nothing,
            },
            Scene::Fm | Scene::Receiver => Self::Nothing,
        }
    }

    /// Returns the writes to perform, in order.
    #[must_use]
    pub fn writes(&self) -> &[RegisterWrite] {
        match self {
            Self::Disable(write) => std::slice::from_ref(write),
            Self::Defaults(program) => *program,
            Self::Nothing => &[],
        }
    }
}

impl Scene {
    /// Returns the built-in program of a scene, if it has one.
    #[must_use]
    pub const fn default_program(self) -> Option<&'static [RegisterWrite]> {
        match self {
            Scene::Music => Some(&MUSIC_DEFAULTS),
            Scene::Voice => Some(&VOICE_DEFAULTS),
            Scene::Off | Scene::Fm | Scene::Receiver => None,
        }
    }
}
