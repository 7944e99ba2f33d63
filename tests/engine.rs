// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end tests against the in-memory port and blob source.
//!
//! Every test runs on a paused clock, so loader delays elapse as soon as
//! the runtime is idle.

use std::time::Duration;

use awpa::blob::FrameHeader;
use awpa::controller::{BOOST_VOLTAGE, DISABLE_OUTPUT, MUSIC_DEFAULTS, VOICE_DEFAULTS};
use awpa::device::DeviceConfig;
use awpa::event::AmplifierEvent;
use awpa::loader::LoaderTiming;
use awpa::manager::DeviceRegistry;
use awpa::port::sim::{CountingMonitor, PortOp, SimulatedPort, StaticBlobSource};
use awpa::store::{SlotId, UpdateState};
use awpa::types::{RegisterProgram, RegisterWrite, Scene};

type Registry = DeviceRegistry<SimulatedPort, StaticBlobSource>;

const MUSIC_BLOB: [u8; 8] = [0x01, 0x0e, 0x02, 0xa3, 0x03, 0x07, 0x04, 0x05];
const OFF_BLOB: [u8; 4] = [0x01, 0x00, 0x02, 0x00];

fn framed(data: &[u8], chip: &[u8; 8]) -> Vec<u8> {
    let mut header = FrameHeader::register_list(u32::try_from(data.len()).unwrap());
    header.chip_type = *chip;
    let mut blob = header.to_bytes();
    blob.extend_from_slice(data);
    let sum = blob[4..]
        .iter()
        .fold(0u32, |s, &b| s.wrapping_add(u32::from(b)));
    blob[..4].copy_from_slice(&sum.to_le_bytes());
    blob
}

fn vmax_table(records: &[(u32, u32)]) -> Vec<u8> {
    records
        .iter()
        .flat_map(|&(min, vmax)| min.to_le_bytes().into_iter().chain(vmax.to_le_bytes()))
        .collect()
}

async fn settle(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

fn music_ops() -> impl Iterator<Item = PortOp> {
    MUSIC_BLOB.chunks_exact(2).map(|pair| PortOp::Write(pair[0], pair[1]))
}

fn write_ops(writes: &[RegisterWrite]) -> impl Iterator<Item = PortOp> + '_ {
    writes.iter().map(|w| PortOp::Write(w.address, w.value))
}

async fn attach(registry: &Registry, port: &SimulatedPort, source: &StaticBlobSource) {
    registry
        .attach(DeviceConfig::new(2, 0x58), port.clone(), source.clone())
        .await
        .unwrap();
}

// ============================================================================
// Loading
// ============================================================================

mod loading {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn attach_loads_every_available_blob() {
        let source = StaticBlobSource::new()
            .with_blob("awinic/aw87xxx_pid_39_music_0.bin", MUSIC_BLOB)
            .with_blob("awinic/aw87xxx_pid_39_off_0.bin", OFF_BLOB)
            .with_blob("awinic/aw87xxx_vmax_0.bin", vmax_table(&[(3600, 9), (3400, 8)]));
        let registry = Registry::new();
        let port = SimulatedPort::new(0x39);

        attach(&registry, &port, &source).await;
        settle(10).await;

        let state = registry.find_by_channel(0).unwrap().snapshot().await;
        let store = state.store();
        assert_eq!(store.state(SlotId::Scene(Scene::Music)), UpdateState::Ready);
        assert_eq!(store.state(SlotId::Scene(Scene::Off)), UpdateState::Ready);
        assert_eq!(store.state(SlotId::VoltageTable), UpdateState::Ready);
        assert_eq!(store.state(SlotId::Scene(Scene::Voice)), UpdateState::Pending);
        assert_eq!(
            store.program(Scene::Music),
            Some(&RegisterProgram::from_pair_bytes(&MUSIC_BLOB))
        );
        assert_eq!(
            store.voltage_table().payload().unwrap().vmax_for(3500),
            Some(8)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn missing_blobs_are_fetched_exactly_five_times() {
        let source = StaticBlobSource::new();
        let registry = Registry::new();
        let port = SimulatedPort::new(0x39);

        attach(&registry, &port, &source).await;
        settle(60_000).await;

        for name in [
            "awinic/aw87xxx_pid_39_off_0.bin",
            "awinic/aw87xxx_pid_39_music_0.bin",
            "awinic/aw87xxx_pid_39_rcv_0.bin",
            "awinic/aw87xxx_vmax_0.bin",
        ] {
            assert_eq!(source.fetch_count(name), 5, "{name}");
        }
        assert_eq!(source.fetches().len(), 6 * 5);

        let state = registry.find_by_channel(0).unwrap().snapshot().await;
        assert_eq!(state.store().state(SlotId::Scene(Scene::Fm)), UpdateState::Pending);
        assert_eq!(state.store().load_attempts(SlotId::Scene(Scene::Fm)), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_picks_up_blob_that_appears_later() {
        let source = StaticBlobSource::new();
        let registry = Registry::new();
        let port = SimulatedPort::new(0x39);
        let mut events = registry.subscribe();

        attach(&registry, &port, &source).await;
        settle(100).await;
        source.insert("awinic/aw87xxx_pid_39_voice_0.bin", [0x01, 0x0a]);
        settle(2_000).await;

        let state = registry.find_by_channel(0).unwrap().snapshot().await;
        assert_eq!(state.store().state(SlotId::Scene(Scene::Voice)), UpdateState::Ready);
        assert_eq!(source.fetch_count("awinic/aw87xxx_pid_39_voice_0.bin"), 2);

        let mut ready = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let AmplifierEvent::SlotReady { slot, .. } = event {
                ready.push(slot);
            }
        }
        assert_eq!(ready, [SlotId::Scene(Scene::Voice)]);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_slot_is_reported_once() {
        let source = StaticBlobSource::new();
        let registry = Registry::new().with_timing(LoaderTiming::new().with_max_attempts(2));
        let port = SimulatedPort::new(0x39);
        let mut events = registry.subscribe();

        attach(&registry, &port, &source).await;
        settle(10_000).await;

        let mut exhausted = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let AmplifierEvent::SlotExhausted { slot, .. } = event {
                exhausted.push(slot);
            }
        }
        assert_eq!(exhausted.len(), SlotId::ALL.len());
        for slot in SlotId::ALL {
            assert!(exhausted.contains(&slot), "{slot}");
        }
        assert_eq!(source.fetches().len(), 2 * SlotId::ALL.len());
    }

    #[tokio::test(start_paused = true)]
    async fn scene_selection_skips_unselected_scenes() {
        let source = StaticBlobSource::new();
        let registry = Registry::new();
        registry
            .attach(
                DeviceConfig::new(2, 0x58).with_scene_mode("music"),
                SimulatedPort::new(0x39),
                source.clone(),
            )
            .await
            .unwrap();
        settle(10).await;

        assert_eq!(source.fetch_count("awinic/aw87xxx_pid_39_voice_0.bin"), 0);
        assert_eq!(source.fetch_count("awinic/aw87xxx_pid_39_music_0.bin"), 1);
        assert_eq!(source.fetch_count("awinic/aw87xxx_pid_39_off_0.bin"), 1);
        assert_eq!(source.fetch_count("awinic/aw87xxx_vmax_0.bin"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn framed_blob_records_chip_name() {
        let source = StaticBlobSource::new().with_blob(
            "awinic/aw87xxx_pid_39_fm_0.bin",
            framed(&[0x01, 0x0e, 0x05, 0x10, 0xff], b"\0AW87339"),
        );
        let registry = Registry::new();
        let port = SimulatedPort::new(0x39);

        attach(&registry, &port, &source).await;
        settle(10).await;

        let state = registry.find_by_channel(0).unwrap().snapshot().await;
        assert_eq!(state.chip_name(), Some("AW87339"));
        assert_eq!(
            state.store().program(Scene::Fm).unwrap().writes(),
            [RegisterWrite::new(0x01, 0x0e), RegisterWrite::new(0x05, 0x10)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn reload_discards_stale_completions() {
        let source = StaticBlobSource::new()
            .with_blob("awinic/aw87xxx_pid_39_music_0.bin", MUSIC_BLOB);
        source.set_latency(Duration::from_millis(500));
        let registry = Registry::new();
        let port = SimulatedPort::new(0x39);

        attach(&registry, &port, &source).await;
        settle(100).await;
        registry.reload(0).await.unwrap();
        settle(450).await;

        let amp = registry.find_by_channel(0).unwrap();
        let state = amp.snapshot().await;
        assert_eq!(state.store().state(SlotId::Scene(Scene::Music)), UpdateState::Pending);
        assert_eq!(state.store().generation(SlotId::Scene(Scene::Music)), 1);

        settle(200).await;

        let state = amp.snapshot().await;
        assert_eq!(state.store().state(SlotId::Scene(Scene::Music)), UpdateState::Ready);
        assert_eq!(source.fetch_count("awinic/aw87xxx_pid_39_music_0.bin"), 2);
    }
}

// ============================================================================
// Scene application
// ============================================================================

mod scenes {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn off_with_pending_slot_writes_single_disable() {
        let source = StaticBlobSource::new();
        let registry = Registry::new();
        let port = SimulatedPort::new(0x39);
        attach(&registry, &port, &source).await;

        registry.set_scene(0, Scene::Music).await.unwrap();
        port.clear_ops();
        registry.set_scene(0, Scene::Off).await.unwrap();

        assert_eq!(
            port.ops(),
            [
                PortOp::Write(DISABLE_OUTPUT.address, DISABLE_OUTPUT.value),
                PortOp::Power(false)
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn loaded_off_program_replaces_disable() {
        let source =
            StaticBlobSource::new().with_blob("awinic/aw87xxx_pid_39_off_0.bin", OFF_BLOB);
        let registry = Registry::new();
        let port = SimulatedPort::new(0x39);
        attach(&registry, &port, &source).await;
        settle(10).await;

        registry.set_scene(0, Scene::Voice).await.unwrap();
        port.clear_ops();
        registry.set_scene(0, Scene::Off).await.unwrap();

        assert_eq!(
            port.ops(),
            [
                PortOp::Write(0x01, 0x00),
                PortOp::Write(0x02, 0x00),
                PortOp::Power(false)
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn fallback_exists_only_for_music_and_voice() {
        let source = StaticBlobSource::new();
        let registry = Registry::new();
        let port = SimulatedPort::new(0x39);
        attach(&registry, &port, &source).await;

        for (scene, expected) in [
            (Scene::Music, MUSIC_DEFAULTS.to_vec()),
            (Scene::Voice, VOICE_DEFAULTS.to_vec()),
            (Scene::Fm, Vec::new()),
            (Scene::Receiver, Vec::new()),
        ] {
            port.clear_ops();
            registry.set_scene(0, scene).await.unwrap();
            assert_eq!(port.writes(), expected, "{scene}");
            assert_eq!(registry.get_scene(0).await.unwrap(), scene);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn apply_is_idempotent() {
        let source =
            StaticBlobSource::new().with_blob("awinic/aw87xxx_pid_39_music_0.bin", MUSIC_BLOB);
        let registry = Registry::new();
        let port = SimulatedPort::new(0x39);
        attach(&registry, &port, &source).await;
        settle(10).await;

        port.clear_ops();
        registry.set_scene(0, Scene::Music).await.unwrap();
        let first = port.writes();
        port.clear_ops();
        registry.set_scene(0, Scene::Music).await.unwrap();
        let second = port.writes();

        assert_eq!(first, second);
        assert_eq!(second.len(), MUSIC_BLOB.len() / 2);
        assert!(!port.ops().contains(&PortOp::Power(true)));
    }

    #[tokio::test(start_paused = true)]
    async fn monitor_follows_audible_scenes() {
        let source = StaticBlobSource::new();
        let registry = Registry::new();
        let monitor = CountingMonitor::new();
        registry
            .attach_with_monitor(
                DeviceConfig::new(2, 0x58),
                SimulatedPort::new(0x39),
                source,
                monitor.clone(),
            )
            .await
            .unwrap();

        registry.set_scene(0, Scene::Voice).await.unwrap();
        registry.set_scene(0, Scene::Off).await.unwrap();

        assert_eq!(monitor.starts(), 1);
        assert_eq!(monitor.stops(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_write_surfaces_as_transport_error() {
        let source = StaticBlobSource::new();
        let registry = Registry::new();
        let port = SimulatedPort::new(0x39);
        attach(&registry, &port, &source).await;

        port.fail_next_writes(5);
        let err = registry.set_scene(0, Scene::Music).await.unwrap_err();

        assert!(matches!(err, awpa::Error::Transport(_)));
        assert_eq!(registry.get_scene(0).await.unwrap(), Scene::Off);
    }
}

// ============================================================================
// Low-voltage override
// ============================================================================

mod low_voltage {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn override_adds_exactly_one_write() {
        let source =
            StaticBlobSource::new().with_blob("awinic/aw87xxx_pid_39_music_0.bin", MUSIC_BLOB);
        let registry = Registry::new();
        let port = SimulatedPort::new(0x39);
        attach(&registry, &port, &source).await;
        settle(10).await;
        registry.set_scene(0, Scene::Music).await.unwrap();
        port.clear_ops();

        registry.set_low_voltage_override(true).await.unwrap();

        assert_eq!(port.writes(), [BOOST_VOLTAGE]);
        assert_eq!(registry.get_scene(0).await.unwrap(), Scene::Music);
        assert!(registry.low_voltage_override());
    }

    #[tokio::test(start_paused = true)]
    async fn music_apply_appends_boost_while_active() {
        let source =
            StaticBlobSource::new().with_blob("awinic/aw87xxx_pid_39_music_0.bin", MUSIC_BLOB);
        let registry = Registry::new();
        let port = SimulatedPort::new(0x39);
        attach(&registry, &port, &source).await;
        settle(10).await;

        registry.set_low_voltage_override(true).await.unwrap();
        registry.set_scene(0, Scene::Music).await.unwrap();

        assert_eq!(port.writes().last(), Some(&BOOST_VOLTAGE));
        assert_eq!(port.register(0x03), 0x02);
    }

    #[tokio::test(start_paused = true)]
    async fn clearing_override_restores_music_voltage() {
        let source =
            StaticBlobSource::new().with_blob("awinic/aw87xxx_pid_39_music_0.bin", MUSIC_BLOB);
        let registry = Registry::new();
        let port = SimulatedPort::new(0x39);
        attach(&registry, &port, &source).await;
        settle(10).await;
        registry.set_scene(0, Scene::Music).await.unwrap();
        registry.set_low_voltage_override(true).await.unwrap();

        registry.set_low_voltage_override(false).await.unwrap();

        assert_eq!(port.register(0x03), 0x07);
    }

    #[tokio::test(start_paused = true)]
    async fn override_skips_powered_down_devices() {
        let registry = Registry::new();
        let on = SimulatedPort::new(0x39);
        let off = SimulatedPort::new(0x39);
        registry
            .attach(DeviceConfig::new(2, 0x58), on.clone(), StaticBlobSource::new())
            .await
            .unwrap();
        registry
            .attach(
                DeviceConfig::new(2, 0x59).with_channel(1),
                off.clone(),
                StaticBlobSource::new(),
            )
            .await
            .unwrap();
        registry.set_scene(0, Scene::Voice).await.unwrap();
        on.clear_ops();
        off.clear_ops();

        registry.set_low_voltage_override(true).await.unwrap();

        assert_eq!(on.writes(), [BOOST_VOLTAGE]);
        assert!(off.ops().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_never_interleave_on_one_chip() {
        let source =
            StaticBlobSource::new().with_blob("awinic/aw87xxx_pid_39_music_0.bin", MUSIC_BLOB);
        let registry = Registry::new();
        let port = SimulatedPort::new(0x39);
        attach(&registry, &port, &source).await;
        settle(10).await;
        port.set_write_latency(Duration::from_millis(1));
        port.clear_ops();

        let (music, boost, voice) = tokio::join!(
            registry.set_scene(0, Scene::Music),
            registry.set_low_voltage_override(true),
            registry.set_scene(0, Scene::Voice),
        );
        music.unwrap();
        boost.unwrap();
        voice.unwrap();

        let expected: Vec<PortOp> = std::iter::once(PortOp::Power(true))
            .chain(music_ops())
            .chain(write_ops(&[BOOST_VOLTAGE]))
            .chain(write_ops(&VOICE_DEFAULTS))
            .collect();
        assert_eq!(port.ops(), expected);
        assert_eq!(registry.get_scene(0).await.unwrap(), Scene::Voice);
    }

    #[tokio::test(start_paused = true)]
    async fn music_waiting_for_the_lock_sees_a_later_override() {
        let source =
            StaticBlobSource::new().with_blob("awinic/aw87xxx_pid_39_music_0.bin", MUSIC_BLOB);
        let registry = Registry::new();
        let port = SimulatedPort::new(0x39);
        attach(&registry, &port, &source).await;
        settle(10).await;
        port.set_write_latency(Duration::from_millis(1));
        port.clear_ops();

        let (raw, music, boost) = tokio::join!(
            registry.write_register(0, 0x05, 0x11),
            registry.set_scene(0, Scene::Music),
            registry.set_low_voltage_override(true),
        );
        raw.unwrap();
        music.unwrap();
        boost.unwrap();

        let expected: Vec<PortOp> = [PortOp::Write(0x05, 0x11), PortOp::Power(true)]
            .into_iter()
            .chain(music_ops())
            .chain(write_ops(&[BOOST_VOLTAGE, BOOST_VOLTAGE]))
            .collect();
        assert_eq!(port.ops(), expected);
    }
}

// ============================================================================
// Speaker control
// ============================================================================

mod speaker {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn mute_turns_off_both_channels_right_first() {
        let registry = Registry::new();
        let left = SimulatedPort::new(0x39);
        let right = SimulatedPort::new(0x39);
        for (address, channel, port) in [(0x58, 0, &left), (0x59, 1, &right)] {
            registry
                .attach(
                    DeviceConfig::new(2, address).with_channel(channel),
                    port.clone(),
                    StaticBlobSource::new(),
                )
                .await
                .unwrap();
        }
        registry.set_scene(0, Scene::Music).await.unwrap();
        registry.set_scene(1, Scene::Music).await.unwrap();

        registry.set_muted(true).await.unwrap();

        assert!(registry.is_muted());
        assert!(!left.is_powered());
        assert!(!right.is_powered());

        registry.set_speaker_scene(Scene::Voice).unwrap();
        registry.set_muted(false).await.unwrap();

        assert!(!registry.is_muted());
        assert_eq!(registry.get_scene(0).await.unwrap(), Scene::Voice);
        assert_eq!(registry.get_scene(1).await.unwrap(), Scene::Voice);
    }

    #[tokio::test(start_paused = true)]
    async fn mute_on_mono_board_skips_missing_channel() {
        let registry = Registry::new();
        let port = SimulatedPort::new(0x69);
        registry
            .attach(DeviceConfig::new(1, 0x20), port.clone(), StaticBlobSource::new())
            .await
            .unwrap();
        registry.set_scene(0, Scene::Music).await.unwrap();

        registry.set_muted(true).await.unwrap();

        assert!(!port.is_powered());
    }

    #[tokio::test(start_paused = true)]
    async fn raw_register_access() {
        let registry = Registry::new();
        let port = SimulatedPort::new(0x5a);
        attach(&registry, &port, &StaticBlobSource::new()).await;

        registry.write_register(0, 0x05, 0x33).await.unwrap();
        let dump = registry.dump_registers(0).await.unwrap();

        assert_eq!(dump[5], RegisterWrite::new(0x05, 0x33));
        assert_eq!(dump.len(), 0x10);

        registry.set_power(0, true).await.unwrap();
        assert!(port.is_powered());
    }
}
