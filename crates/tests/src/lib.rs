//! # Integration Tests
//!
//! End-to-end tests across the workspace crates.
//!
//! - Mock transport -> engine -> drained events
//! - Configuration -> start-up control writes
//! - Capture file replay

#[cfg(test)]
mod support {
    use std::sync::Arc;

    use contracts::{EngineConfig, SensorId};
    use hub_engine::{HubControl, HubEngine};
    use ingestion::{ManualClock, MockControlSink, MockEventSource};

    pub struct Rig {
        pub engine: HubEngine<MockEventSource>,
        pub source: MockEventSource,
        pub sink: MockControlSink,
        pub clock: ManualClock,
    }

    impl Rig {
        pub fn new(config: EngineConfig) -> Self {
            let source = MockEventSource::new();
            let sink = MockControlSink::new();
            let clock = ManualClock::new(10_000);
            let control = Arc::new(HubControl::new(
                Arc::new(sink.clone()),
                Arc::new(clock.clone()),
            ));
            let engine = HubEngine::new(source.clone(), control, &config);
            Self {
                engine,
                source,
                sink,
                clock,
            }
        }

        pub fn enable(&self, sensors: &[SensorId]) {
            for id in sensors {
                self.engine
                    .control()
                    .set_enabled(id.handle(), true)
                    .unwrap();
            }
        }

        pub fn enable_all(&self) {
            self.enable(&SensorId::ALL);
        }
    }

    impl Default for Rig {
        fn default() -> Self {
            Self::new(EngineConfig::default())
        }
    }
}

#[cfg(test)]
mod e2e_tests {
    use contracts::{ControlCommand, EventPayload, HubEvent, SensorId};
    use hub_engine::ClockPhase;
    use ingestion::{
        exhausted_record, meta_record, sensor_record, sync_ack_record, valid_exhausted,
        valid_sync_ack,
    };

    use crate::support::Rig;

    fn sensor_events(events: &[HubEvent]) -> Vec<SensorId> {
        events
            .iter()
            .filter_map(|e| match e {
                HubEvent::Sensor(s) => Some(s.sensor),
                HubEvent::FlushComplete { .. } => None,
            })
            .collect()
    }

    #[test]
    fn test_capacity_leaves_rest_for_next_call() {
        let mut rig = Rig::default();
        rig.enable(&[SensorId::Gyroscope]);
        let records: Vec<_> = (0..5)
            .map(|i| sensor_record(SensorId::Gyroscope, [i, 0, 0], 0))
            .collect();
        rig.source.push_records(&records);

        let first = rig.engine.drain(2).into_result().unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(rig.engine.pending_records(), 3);

        let rest = rig.engine.drain(16).into_result().unwrap();
        assert_eq!(rest.len(), 3);
        match rest[2] {
            HubEvent::Sensor(e) => match e.payload {
                EventPayload::Vector { values, .. } => assert!((values[0] - 0.04).abs() < 1e-6),
                other => panic!("unexpected payload {other:?}"),
            },
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_one_shot_disarms_before_next_record() {
        let mut rig = Rig::default();
        rig.enable(&[SensorId::SignificantMotion, SensorId::Accelerometer]);
        rig.sink.clear();

        rig.source.push_records(&[
            sensor_record(SensorId::SignificantMotion, [1, 0, 0], 0),
            sensor_record(SensorId::SignificantMotion, [1, 0, 0], 0),
            sensor_record(SensorId::Accelerometer, [5, 0, 0], 0),
        ]);

        let events = rig.engine.drain(8).into_result().unwrap();
        assert_eq!(
            sensor_events(&events),
            vec![SensorId::SignificantMotion, SensorId::Accelerometer]
        );
        assert!(!rig
            .engine
            .control()
            .is_sensor_enabled(SensorId::SignificantMotion));
        assert_eq!(
            rig.sink.commands(),
            vec![ControlCommand::Enable {
                sensor: SensorId::SignificantMotion,
                on: false,
            }]
        );

        // explicit re-arm
        rig.enable(&[SensorId::SignificantMotion]);
        rig.source
            .push_records(&[sensor_record(SensorId::SignificantMotion, [2, 0, 0], 0)]);
        let events = rig.engine.drain(8).into_result().unwrap();
        assert_eq!(sensor_events(&events), vec![SensorId::SignificantMotion]);
    }

    #[test]
    fn test_flush_reaches_caller_for_disabled_sensor() {
        let mut rig = Rig::default();
        rig.source.push_records(&[
            sensor_record(SensorId::Pressure, [1, 0, 0], 0),
            meta_record(SensorId::Pressure),
        ]);

        let events = rig.engine.drain(8).into_result().unwrap();
        assert_eq!(
            events,
            vec![HubEvent::FlushComplete {
                handle: SensorId::Pressure.handle()
            }]
        );
        assert_eq!(rig.engine.stats().suppressed, 1);
    }

    #[test]
    fn test_step_detector_feeds_counter() {
        let mut rig = Rig::default();
        rig.enable(&[SensorId::StepCounter, SensorId::StepDetector]);
        rig.source
            .push_records(&[sensor_record(SensorId::StepCounter, [40, 0, 0], 0)]);
        rig.engine.drain(8).into_result().unwrap();
        let counter_stamp = rig.engine.table().slot(SensorId::StepCounter).last_timestamp;

        rig.clock.advance(5_000);
        rig.source
            .push_records(&[sensor_record(SensorId::StepDetector, [41, 0, 0], 0)]);
        let events = rig.engine.drain(8).into_result().unwrap();
        assert_eq!(sensor_events(&events), vec![SensorId::StepDetector]);

        let counter = rig.engine.table().slot(SensorId::StepCounter);
        assert_eq!(counter.event.payload, EventPayload::StepCounter { steps: 41 });
        assert_eq!(counter.last_timestamp, counter_stamp);
    }

    #[test]
    fn test_resync_round_trip() {
        let mut rig = Rig::default();
        rig.enable_all();
        assert_eq!(rig.engine.control().clock_phase(), ClockPhase::Unsynced);

        rig.clock.set(77_000);
        rig.source.push_records(&[valid_exhausted()]);
        assert!(rig.engine.drain(8).into_result().unwrap().is_empty());
        assert_eq!(rig.engine.control().clock_phase(), ClockPhase::AwaitingAck);
        assert!(rig.sink.commands().contains(&ControlCommand::Resync));

        // wrong marker is ignored
        rig.source.push_records(&[sync_ack_record(0x11)]);
        rig.engine.drain(8).into_result().unwrap();
        assert_eq!(rig.engine.control().clock_phase(), ClockPhase::AwaitingAck);

        rig.source.push_records(&[valid_sync_ack()]);
        rig.engine.drain(8).into_result().unwrap();
        let sync = rig.engine.control().clock_sync();
        assert_eq!(sync.phase(), ClockPhase::Synced);
        assert_eq!(sync.committed_reference(), Some(77_000));

        // an exhaustion signal with the wrong marker does nothing
        rig.source.push_records(&[exhausted_record(0x12)]);
        rig.engine.drain(8).into_result().unwrap();
        assert_eq!(rig.engine.control().clock_phase(), ClockPhase::Synced);
        assert_eq!(
            rig.sink
                .commands()
                .iter()
                .filter(|c| **c == ControlCommand::Resync)
                .count(),
            1
        );
    }

    #[test]
    fn test_transport_failure_keeps_engine_usable() {
        let mut rig = Rig::default();
        rig.enable(&[SensorId::Light]);
        rig.source.push_failure("link reset");
        rig.source
            .push_records(&[sensor_record(SensorId::Light, [3, 0, 0], 0)]);

        let failed = rig.engine.drain(8);
        assert!(failed.is_empty());
        assert!(failed.error.as_ref().is_some_and(|e| e.is_transport()));

        let events = rig.engine.drain(8).into_result().unwrap();
        assert_eq!(sensor_events(&events), vec![SensorId::Light]);
        assert_eq!(rig.engine.stats().transport_failures, 1);
    }

    #[test]
    fn test_unknown_id_between_valid_records() {
        let mut rig = Rig::default();
        rig.enable(&[SensorId::Accelerometer]);
        let mut bogus = sensor_record(SensorId::Accelerometer, [0, 0, 0], 0);
        bogus.wire_id = 0x5a;
        rig.source.push_records(&[
            sensor_record(SensorId::Accelerometer, [1, 0, 0], 0),
            bogus,
            sensor_record(SensorId::Accelerometer, [2, 0, 0], 0),
        ]);

        let events = rig.engine.drain(8).into_result().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(rig.engine.stats().anomalies, 1);
    }
}

#[cfg(test)]
mod decode_tests {
    use bytes::Bytes;
    use contracts::{HubEvent, SensorId, RECORD_SIZE};
    use rand::Rng;

    use crate::support::Rig;

    /// Random windows whose id byte is a known sensor
    fn random_stream(seed_windows: usize) -> Bytes {
        let mut rng = rand::rng();
        let mut bytes = vec![0u8; seed_windows * RECORD_SIZE];
        rng.fill(&mut bytes[..]);
        for window in bytes.chunks_mut(RECORD_SIZE) {
            let id = SensorId::ALL[rng.random_range(0..SensorId::ALL.len())];
            window[0] = id.wire_id();
        }
        Bytes::from(bytes)
    }

    fn drain_all(rig: &mut Rig, capacity: usize) -> Vec<HubEvent> {
        let mut out = Vec::new();
        loop {
            let events = rig.engine.drain(capacity).into_result().unwrap();
            assert!(events.len() <= capacity);
            if events.is_empty()
                && rig.engine.pending_records() == 0
                && rig.source.remaining_bytes() == 0
            {
                break;
            }
            out.extend(events);
        }
        out
    }

    #[test]
    fn test_same_bytes_same_events() {
        let stream = random_stream(200);

        let mut a = Rig::default();
        let mut b = Rig::default();
        for rig in [&a, &b] {
            rig.enable_all();
            rig.source.push_bytes(stream.clone());
        }

        let events_a = drain_all(&mut a, 7);
        let events_b = drain_all(&mut b, 7);
        assert_eq!(events_a, events_b);
        assert!(!events_a.is_empty());

        for (id, slot) in a.engine.table().iter() {
            assert_eq!(slot, b.engine.table().slot(id));
        }
    }

    #[test]
    fn test_chunking_does_not_change_output() {
        let stream = random_stream(64);

        let mut whole = Rig::default();
        whole.enable_all();
        whole.source.push_bytes(stream.clone());

        let mut split = Rig::default();
        split.enable_all();
        // split at offsets that cut through records
        for chunk in stream.chunks(RECORD_SIZE + 5) {
            split.source.push_bytes(Bytes::copy_from_slice(chunk));
        }

        assert_eq!(drain_all(&mut whole, 16), drain_all(&mut split, 16));
    }
}

#[cfg(test)]
mod startup_tests {
    use std::sync::Arc;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{HubError, SensorId};
    use hub_engine::HubControl;
    use ingestion::{ManualClock, MockControlSink};

    const CONFIG: &str = r#"
[engine]
drain_capacity = 32

[[sensors]]
name = "accelerometer"
period_ms = 10
timeout_ms = 200

[[sensors]]
name = "light"
"#;

    #[test]
    fn test_config_drives_control_writes() {
        let config = ConfigLoader::load_from_str(CONFIG, ConfigFormat::Toml).unwrap();
        let sink = MockControlSink::new();
        let control = HubControl::new(Arc::new(sink.clone()), Arc::new(ManualClock::new(0)));

        let enabled = device::apply_sensor_settings(&control, &config.sensors).unwrap();
        assert_eq!(enabled, vec![SensorId::Accelerometer, SensorId::Light]);

        // batching the first sensor also arms the buffer and requests a resync
        let lines: Vec<String> = sink
            .lines()
            .into_iter()
            .filter(|(attr, _)| matches!(*attr, "enable" | "batch_enable"))
            .map(|(_, line)| line)
            .collect();
        let accel = SensorId::Accelerometer.wire_id();
        let light = SensorId::Light.wire_id();
        assert_eq!(
            lines,
            vec![
                format!("{accel} 0 10 200\n"),
                format!("{accel} 1\n"),
                format!("{light} 1\n"),
            ]
        );

        control.disable_all().unwrap();
        assert!(control.enabled_sensors().is_empty());
    }

    #[test]
    fn test_invalid_config_is_rejected_before_control() {
        let err = ConfigLoader::load_from_str(
            "[[sensors]]\nname = \"light\"\ntimeout_ms = 50\n",
            ConfigFormat::Toml,
        )
        .unwrap_err();
        match err {
            HubError::ConfigValidation { field, .. } => assert_eq!(field, "sensors[0].timeout_ms"),
            other => panic!("unexpected error {other:?}"),
        }
    }
}

#[cfg(test)]
mod replay_tests {
    use std::io::Write;

    use contracts::{EngineConfig, HubEvent, SensorId};
    use ingestion::{encode_records, meta_record, sensor_record, valid_exhausted};

    #[tokio::test]
    async fn test_capture_replay_on_blocking_thread() {
        let records = vec![
            sensor_record(SensorId::Orientation, [900, 0, 0], 1),
            valid_exhausted(),
            sensor_record(SensorId::WakeGesture, [0, 0, 0], 2),
            sensor_record(SensorId::WakeGesture, [0, 0, 0], 3),
            meta_record(SensorId::WakeGesture),
        ];
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&encode_records(&records)).unwrap();
        let path = file.path().to_path_buf();

        let events = tokio::task::spawn_blocking(move || {
            let mut engine = device::replay_engine(&path, &EngineConfig::default()).unwrap();
            let mut events = Vec::new();
            loop {
                let batch = engine.drain(2).into_result().unwrap();
                if batch.is_empty() && engine.source().is_exhausted() {
                    break;
                }
                events.extend(batch);
            }
            assert!(engine.finish().is_none());
            events
        })
        .await
        .unwrap();

        // wake gesture disarms after its first event
        assert_eq!(events.len(), 3);
        assert_eq!(
            events[2],
            HubEvent::FlushComplete {
                handle: SensorId::WakeGesture.handle()
            }
        );
        assert!(matches!(events[0], HubEvent::Sensor(e) if e.sensor == SensorId::Orientation));
        assert!(matches!(events[1], HubEvent::Sensor(e) if e.sensor == SensorId::WakeGesture));
    }
}
