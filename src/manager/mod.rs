// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The registry of attached amplifiers and its control surface.
//!
//! [`DeviceRegistry`] is what a platform driver talks to: it attaches and
//! detaches amplifiers, addresses them by channel, and broadcasts the
//! low-voltage override to every powered device. The speaker-manager hooks
//! (speaker scene, per-channel enable, mute) live here as well since they
//! act on several channels at once.
//!
//! # Examples
//!
//! ```no_run
//! use awpa::device::DeviceConfig;
//! use awpa::manager::{AudioPath, DeviceRegistry};
//! use awpa::port::sim::{SimulatedPort, StaticBlobSource};
//!
//! #[tokio::main]
//! async fn main() -> awpa::Result<()> {
//!     let registry = DeviceRegistry::new();
//!     let mut events = registry.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("{event:?}");
//!         }
//!     });
//!
//!     let blobs = StaticBlobSource::new();
//!     for (address, channel) in [(0x58, 0), (0x59, 1)] {
//!         let config = DeviceConfig::new(2, address).with_channel(channel);
//!         registry
//!             .attach(config, SimulatedPort::new(0x39), blobs.clone())
//!             .await?;
//!     }
//!
//!     registry.enable_amplifier(0, true, AudioPath::Speaker).await?;
//!     registry.set_low_voltage_override(true).await?;
//!     registry.set_muted(true).await?;
//!     Ok(())
//! }
//! ```

mod registry;

pub use registry::{AudioPath, DeviceRegistry, LEFT_CHANNEL, RIGHT_CHANNEL};
