// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types shared across the crate.
//!
//! - [`Scene`] - The five operating modes (off, music, voice, fm, receiver)
//! - [`RegisterWrite`] - One `(address, value)` register write
//! - [`RegisterProgram`] - Ordered list of register writes

mod program;
mod scene;

pub use program::{RegisterProgram, RegisterWrite};
pub use scene::Scene;
