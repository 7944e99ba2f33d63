// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `awpa` - configuration engine for AW87xxx class-K audio amplifiers.
//!
//! The crate turns a requested operating scene (off, music, voice, fm,
//! receiver) into register writes on an amplifier. Register programs come
//! from vendor firmware blobs that are fetched and decoded in the
//! background; scenes whose blob never arrived fall back to built-in
//! defaults where such defaults exist.
//!
//! # Supported Parts
//!
//! - AW87339, AW87359, AW87369, AW87519, AW87559
//!
//! # Building Blocks
//!
//! - [`blob`]: decoders for scene blobs (legacy and framed) and the
//!   voltage threshold table
//! - [`store`]: per-device configuration slots
//! - [`loader`]: batched, retried blob loading
//! - [`controller`]: scene register sequences and fallbacks
//! - [`manager`]: the registry of attached amplifiers
//! - [`port`]: the register bus, blob source and voltage monitor seams
//!
//! # Quick Start
//!
//! ```
//! use awpa::device::DeviceConfig;
//! use awpa::manager::DeviceRegistry;
//! use awpa::port::sim::{PortOp, SimulatedPort, StaticBlobSource};
//! use awpa::types::Scene;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> awpa::Result<()> {
//! let registry = DeviceRegistry::new();
//! let port = SimulatedPort::new(0x39);
//! registry
//!     .attach(DeviceConfig::new(2, 0x58), port.clone(), StaticBlobSource::new())
//!     .await?;
//!
//! registry.set_scene(0, Scene::Music).await?;
//! registry.set_scene(0, Scene::Off).await?;
//!
//! assert_eq!(port.ops().last(), Some(&PortOp::Power(false)));
//! # Ok(())
//! # }
//! ```

pub mod blob;
pub mod controller;
pub mod device;
pub mod error;
pub mod event;
pub mod loader;
pub mod manager;
pub mod port;
pub mod store;
pub mod types;

pub use device::{Amplifier, DeviceConfig};
pub use error::{Error, FormatError, LoadError, Result, TransportError};
pub use event::{AmplifierEvent, DeviceId, EventBus};
pub use manager::{AudioPath, DeviceRegistry};
pub use types::{RegisterProgram, RegisterWrite, Scene};
