use super::*;
use crate::message::{
    CameraDescriptor, DeviceStatus, PuzzleStatus, SetupContents, TimerRecord, TimerState,
};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

fn status(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn report(id: &str, connection: Option<bool>, pairs: &[(&str, Value)]) -> DeviceStatus {
    DeviceStatus {
        id: id.to_string(),
        connection,
        status: status(pairs),
    }
}

fn setup(name: &str, rules: &[(&str, &str)]) -> SetupContents {
    SetupContents {
        name: name.to_string(),
        cameras: vec![],
        events: rules
            .iter()
            .map(|(id, d)| (id.to_string(), d.to_string()))
            .collect(),
        hints: BTreeMap::new(),
    }
}

#[test]
fn test_device_created_on_first_status() {
    let mut devices = Devices::default();
    devices.upsert(report("d1", Some(true), &[("a", json!(1))]));

    let device = devices.get("d1").unwrap();
    assert_eq!(device.id, "d1");
    assert!(device.connection);
    assert_eq!(device.status["a"], json!(1));
}

#[test]
fn test_device_merge_keeps_other_fields() {
    let mut devices = Devices::default();
    devices.upsert(report("d1", None, &[("a", json!(1))]));
    devices.upsert(report("d1", None, &[("b", json!(2))]));

    let device = devices.get("d1").unwrap();
    assert_eq!(device.status, status(&[("a", json!(1)), ("b", json!(2))]));
}

#[test]
fn test_device_merge_overwrites_named_fields_only() {
    let mut devices = Devices::default();
    devices.upsert(report("d1", Some(true), &[("a", json!(1)), ("b", json!("x"))]));
    devices.upsert(report("d1", None, &[("a", json!(5))]));

    let device = devices.get("d1").unwrap();
    assert_eq!(device.status["a"], json!(5));
    assert_eq!(device.status["b"], json!("x"));
    // Connection left alone when not reported
    assert!(device.connection);

    devices.upsert(report("d1", Some(false), &[]));
    let device = devices.get("d1").unwrap();
    assert!(!device.connection);
    assert_eq!(device.status.len(), 2);
}

#[test]
fn test_new_device_without_connection_is_disconnected() {
    let mut devices = Devices::default();
    devices.upsert(report("d1", None, &[]));
    assert!(!devices.get("d1").unwrap().connection);
}

#[test]
fn test_set_connection_all() {
    let mut devices = Devices::default();
    devices.upsert(report("d1", Some(true), &[]));
    devices.upsert(report("d2", Some(false), &[]));
    devices.upsert(report("d3", Some(true), &[]));

    devices.set_connection_all(false);

    assert_eq!(devices.len(), 3);
    assert!(devices.all().all(|d| !d.connection));
}

#[test]
fn test_devices_iterate_in_insertion_order() {
    let mut devices = Devices::default();
    for id in ["zeta", "alpha", "mid"] {
        devices.upsert(report(id, Some(true), &[]));
    }
    devices.upsert(report("alpha", Some(false), &[]));

    let ids: Vec<&str> = devices.all().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["zeta", "alpha", "mid"]);
}

#[test]
fn test_get_nonexistent_device() {
    let devices = Devices::default();
    assert!(devices.get("nonexistent").is_none());
}

#[test]
fn test_timer_ticks_down_and_clamps() {
    let mut timers = Timers::default();
    timers.upsert(TimerRecord {
        id: "t1".to_string(),
        duration: 2500,
        state: TimerState::Active,
    });

    timers.tick(1000);
    assert_eq!(timers.get("t1").unwrap().duration_ms, 1500);
    assert_eq!(timers.get("t1").unwrap().state, TimerState::Active);

    timers.tick(1000);
    timers.tick(1000);
    let timer = timers.get("t1").unwrap();
    assert_eq!(timer.duration_ms, 0);
    assert_eq!(timer.state, TimerState::Idle);
}

#[test]
fn test_paused_timer_does_not_move() {
    let mut timers = Timers::default();
    timers.upsert(TimerRecord {
        id: "t1".to_string(),
        duration: 5000,
        state: TimerState::Paused,
    });

    timers.tick(1000);
    let timer = timers.get("t1").unwrap();
    assert_eq!(timer.duration_ms, 5000);
    assert_eq!(timer.state, TimerState::Paused);
}

#[test]
fn test_timer_upsert_replaces_record() {
    let mut timers = Timers::default();
    timers.upsert(TimerRecord {
        id: "t1".to_string(),
        duration: 5000,
        state: TimerState::Active,
    });
    timers.upsert(TimerRecord {
        id: "t1".to_string(),
        duration: 1000,
        state: TimerState::Paused,
    });

    assert_eq!(timers.len(), 1);
    let timer = timers.get("t1").unwrap();
    assert_eq!(timer.duration_ms, 1000);
    assert_eq!(timer.state, TimerState::Paused);
}

#[test]
fn test_new_room_has_idle_general_timer() {
    let room = RoomState::new();
    let general = room.timers().get(GENERAL_TIMER).unwrap();
    assert_eq!(general.duration_ms, 0);
    assert_eq!(general.state, TimerState::Idle);
    assert_eq!(room.display_time(), "00:00:00");
    assert!(!room.setup_complete());
    assert_eq!(room.name(), DEFAULT_ROOM_NAME);
}

#[test]
fn test_room_tick_updates_display_time() {
    let mut room = RoomState::new();
    room.timers_mut().upsert(TimerRecord {
        id: GENERAL_TIMER.to_string(),
        duration: 3_601_000,
        state: TimerState::Active,
    });

    assert_eq!(room.tick(1000), "01:00:00");
    assert_eq!(room.tick(1000), "00:59:59");
    assert_eq!(room.ticks(), 2);
}

#[test]
fn test_setup_replaces_everything() {
    let mut room = RoomState::new();
    room.apply_setup(&setup("First", &[("old", "Old rule")]));
    room.puzzles_mut().merge(PuzzleStatus {
        id: "old".to_string(),
        fields: status(&[("status", json!(true))]),
    });

    let mut second = setup("Escape X", &[("correctSequence", "Dial the sequence")]);
    second.cameras = vec![CameraDescriptor {
        name: "camera1".to_string(),
        link: "https://cams.local/1".to_string(),
    }];
    second.hints = BTreeMap::from([(
        "Telephone".to_string(),
        vec!["Wait a bit".to_string(), "Press the button".to_string()],
    )]);
    room.apply_setup(&second);

    assert_eq!(room.name(), "Escape X");
    assert!(room.puzzles().get("old").is_none());
    let puzzle = room.puzzles().get("correctSequence").unwrap();
    assert_eq!(puzzle.description, "Dial the sequence");
    assert!(puzzle.status.is_empty());
    assert_eq!(room.cameras().len(), 1);
    assert_eq!(room.cameras()[0].label, "camera1");
    assert_eq!(
        room.hints().for_puzzle("Telephone").unwrap(),
        vec!["Wait a bit".to_string(), "Press the button".to_string()]
    );
    assert!(room.setup_complete());
}

#[test]
fn test_puzzle_merge_only_named_fields() {
    let mut puzzles = Puzzles::default();
    puzzles.replace_all(&BTreeMap::from([(
        "rule".to_string(),
        "Description".to_string(),
    )]));

    assert!(puzzles.merge(PuzzleStatus {
        id: "rule".to_string(),
        fields: status(&[("status", json!(false)), ("attempts", json!(1))]),
    }));
    assert!(puzzles.merge(PuzzleStatus {
        id: "rule".to_string(),
        fields: status(&[("status", json!(true))]),
    }));

    let puzzle = puzzles.get("rule").unwrap();
    assert_eq!(puzzle.status["status"], json!(true));
    assert_eq!(puzzle.status["attempts"], json!(1));
    assert_eq!(puzzle.description, "Description");
}

#[test]
fn test_puzzle_merge_unknown_id_is_a_miss() {
    let mut puzzles = Puzzles::default();
    assert!(!puzzles.merge(PuzzleStatus {
        id: "ghost".to_string(),
        fields: Map::new(),
    }));
    assert!(puzzles.is_empty());
}

#[test]
fn test_snapshot_is_a_copy() {
    let mut room = RoomState::new();
    room.devices_mut().upsert(report("d1", Some(true), &[]));

    let snapshot = room.snapshot();
    room.devices_mut().set_connection_all(false);

    assert!(snapshot.device("d1").unwrap().connection);
    assert!(!room.devices().get("d1").unwrap().connection);
}

#[test]
fn test_format_millis() {
    assert_eq!(format_millis(0), "00:00:00");
    assert_eq!(format_millis(999), "00:00:01");
    assert_eq!(format_millis(61_000), "00:01:01");
    assert_eq!(format_millis(1_800_000), "00:30:00");
    assert_eq!(format_millis(36_000_000), "10:00:00");
}
