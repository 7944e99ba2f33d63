// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Notifications about amplifier lifecycle, configuration loading and
//! scene changes.
//!
//! The [`EventBus`] is a tokio broadcast channel shared by the registry and
//! every amplifier it attaches. Subscribers that fall behind lose the
//! oldest events.
//!
//! # Examples
//!
//! ```
//! use awpa::event::{AmplifierEvent, DeviceId, EventBus};
//!
//! let bus = EventBus::new();
//! let mut rx = bus.subscribe();
//!
//! let device_id = DeviceId::new();
//! bus.publish(AmplifierEvent::Detached { device_id });
//! assert_eq!(rx.try_recv().unwrap().device_id(), Some(device_id));
//! ```

mod amplifier_event;
mod device_id;
mod event_bus;

pub use amplifier_event::AmplifierEvent;
pub use device_id::DeviceId;
pub use event_bus::EventBus;
