// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Asynchronous loading of scene programs and the voltage table.
//!
//! Loading happens in batches. A batch looks at every slot of a device and
//! starts one blob fetch per slot that is still pending and below the
//! attempt cap. Each fetch completes independently: a parsed blob makes its
//! slot ready, anything else counts a failed attempt and schedules another
//! batch after the retry delay.
//!
//! At most one batch is scheduled per device at any time; requests made
//! while one is waiting join it. Completions carry the generation of the
//! slot they were started for and are dropped if the slot was reset since.

mod timing;

pub use timing::LoaderTiming;

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use crate::blob::{DecodedBlob, VoltageThresholdTable, decode_scene_blob, parse_voltage_table};
use crate::device::Amplifier;
use crate::error::LoadError;
use crate::event::AmplifierEvent;
use crate::port::{BlobSource, HardwarePort};
use crate::store::SlotId;

/// Scheduling state of one device's loader.
#[derive(Debug)]
pub(crate) struct ConfigLoader {
    timing: LoaderTiming,
    scheduled: AtomicBool,
    cancelled: AtomicBool,
    in_flight: Mutex<HashSet<(SlotId, u64)>>,
}

impl ConfigLoader {
    pub(crate) fn new(timing: LoaderTiming) -> Self {
        Self {
            timing,
            scheduled: AtomicBool::new(false),
            cancelled: AtomicBool::new(false),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub(crate) fn timing(&self) -> &LoaderTiming {
        &self.timing
    }

    /// Stops scheduling new batches. Fetches already running still finish.
    pub(crate) fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

enum Payload {
    Program(DecodedBlob),
    Table(VoltageThresholdTable),
}

/// Schedules a batch for `amp` after `delay`, unless one is already waiting.
pub(crate) fn schedule_batch<P: HardwarePort, S: BlobSource>(
    amp: &Arc<Amplifier<P, S>>,
    delay: Duration,
) {
    let loader = &amp.loader;
    if loader.is_cancelled() {
        return;
    }
    if loader.scheduled.swap(true, Ordering::AcqRel) {
        tracing::debug!(device = %amp.id, "Loader batch already scheduled");
        return;
    }

    tracing::debug!(device = %amp.id, delay_ms = delay.as_millis(), "Scheduling loader batch");
    let weak = Arc::downgrade(amp);
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let Some(amp) = weak.upgrade() else {
            return;
        };
        amp.loader.scheduled.store(false, Ordering::Release);
        if !amp.loader.is_cancelled() {
            request_batch(&amp).await;
        }
    });
}

/// Starts one fetch per slot that still wants loading.
async fn request_batch<P: HardwarePort, S: BlobSource>(amp: &Arc<Amplifier<P, S>>) {
    let pending = amp
        .state
        .lock()
        .await
        .store
        .pending_slots(amp.loader.timing.max_attempts);

    let mut started = 0usize;
    for (slot, generation) in pending {
        if amp.loader.in_flight.lock().insert((slot, generation)) {
            spawn_fetch(amp, slot, generation);
            started += 1;
        }
    }
    tracing::debug!(device = %amp.id, started, "Loader batch");
}

fn spawn_fetch<P: HardwarePort, S: BlobSource>(
    amp: &Arc<Amplifier<P, S>>,
    slot: SlotId,
    generation: u64,
) {
    let amp = Arc::clone(amp);
    tokio::spawn(async move {
        let name = amp.names.name(slot);
        tracing::debug!(device = %amp.id, %slot, name = %name, "Fetching blob");
        let blob = amp.source.fetch(&name).await;
        on_load_complete(&amp, slot, generation, &name, blob).await;
    });
}

/// Handles the result of one fetch.
async fn on_load_complete<P: HardwarePort, S: BlobSource>(
    amp: &Arc<Amplifier<P, S>>,
    slot: SlotId,
    generation: u64,
    name: &str,
    blob: Option<Vec<u8>>,
) {
    let outcome = {
        let mut state = amp.state.lock().await;
        amp.loader.in_flight.lock().remove(&(slot, generation));

        if state.store.generation(slot) != generation {
            tracing::debug!(device = %amp.id, %slot, generation, "Dropping stale blob");
            return;
        }

        match decode(slot, name, blob) {
            Ok(Payload::Program(decoded)) => {
                if let SlotId::Scene(scene) = slot {
                    if let Some(chip_name) = decoded.chip_name {
                        state.chip_name = Some(chip_name);
                    }
                    state.store.scene_mut(scene).mark_ready(decoded.program);
                }
                Ok(())
            }
            Ok(Payload::Table(table)) => {
                state.store.voltage_table_mut().mark_ready(table);
                Ok(())
            }
            Err(e) => Err((state.store.record_failure(slot), e)),
        }
    };

    match outcome {
        Ok(()) => {
            tracing::info!(device = %amp.id, %slot, name, "Configuration loaded");
            amp.events.publish(AmplifierEvent::SlotReady {
                device_id: amp.id,
                slot,
            });
        }
        Err((attempts, e)) => {
            tracing::warn!(device = %amp.id, %slot, attempts, error = %e, "Configuration load failed");
            amp.events.publish(AmplifierEvent::SlotLoadFailed {
                device_id: amp.id,
                slot,
                attempts,
                reason: e.to_string(),
            });
            if amp.loader.timing.should_retry(attempts) {
                schedule_batch(amp, amp.loader.timing.retry_delay);
            } else {
                tracing::error!(device = %amp.id, %slot, attempts, "Giving up on configuration slot");
                amp.events.publish(AmplifierEvent::SlotExhausted {
                    device_id: amp.id,
                    slot,
                });
            }
        }
    }
}

fn decode(slot: SlotId, name: &str, blob: Option<Vec<u8>>) -> Result<Payload, LoadError> {
    let bytes = blob.ok_or_else(|| LoadError::Missing {
        slot,
        name: name.to_string(),
    })?;
    let rejected = |source| LoadError::Rejected {
        slot,
        name: name.to_string(),
        source,
    };
    match slot {
        SlotId::Scene(_) => decode_scene_blob(&bytes)
            .map(Payload::Program)
            .map_err(rejected),
        SlotId::VoltageTable => parse_voltage_table(&bytes)
            .map(Payload::Table)
            .map_err(rejected),
    }
}
