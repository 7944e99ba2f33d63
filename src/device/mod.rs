// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Amplifier instances.
//!
//! An [`Amplifier`] is created by the registry once its chip answered the
//! identity probe. It owns the register bus, blob source and voltage
//! monitor handed in at attach, plus a lock-protected [`DeviceState`].
//!
//! [`DeviceConfig`] is the board description of one amplifier: where it
//! sits on the bus, which channel it drives and which scenes to load.

mod amplifier;
mod chip;
mod config;
mod state;

pub use amplifier::Amplifier;
pub(crate) use amplifier::Shared;
pub use chip::{CHIP_ID_REGISTER, ChipIdentity, Product, SOFT_RESET};
pub use config::{BlobNames, DEFAULT_FIRMWARE_PREFIX, DeviceConfig, SceneSelection};
pub use state::DeviceState;
