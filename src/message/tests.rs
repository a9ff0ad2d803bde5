use super::*;
use chrono::TimeZone;
use serde_json::{json, Map};
use std::collections::BTreeMap;

fn at(sender: &str, body: Body) -> Envelope {
    Envelope {
        sender: sender.to_string(),
        timestamp: Utc.with_ymd_and_hms(2024, 2, 11, 13, 0, 0).unwrap(),
        body,
    }
}

fn one_of_each() -> Vec<Envelope> {
    let mut status = Map::new();
    status.insert("redSwitch".to_string(), json!(true));

    let mut components = Map::new();
    components.insert("start".to_string(), json!(0));
    components.insert("stop".to_string(), json!(0));

    let mut fields = Map::new();
    fields.insert("status".to_string(), json!(true));

    vec![
        at(
            "back-end",
            Body::Instruction(vec![
                Instruction::new("reset"),
                Instruction::new("hint").with("value", "look up").with("topic", "hint"),
            ]),
        ),
        at(
            "back-end",
            Body::Status(StatusContents::Device(DeviceStatus {
                id: "telephone".to_string(),
                connection: Some(true),
                status,
            })),
        ),
        at("front-end", Body::Status(StatusContents::Components(components))),
        at(
            "front-end",
            Body::Connection(ConnectionContents { connection: true }),
        ),
        at(
            "back-end",
            Body::EventStatus(vec![PuzzleStatus {
                id: "correctSequence".to_string(),
                fields,
            }]),
        ),
        at(
            "back-end",
            Body::Time(TimerRecord {
                id: "general".to_string(),
                duration: 60_000,
                state: TimerState::Active,
            }),
        ),
        at(
            "back-end",
            Body::Setup(SetupContents {
                name: "Escape X".to_string(),
                cameras: vec![CameraDescriptor {
                    name: "camera1".to_string(),
                    link: "https://cams.local/1".to_string(),
                }],
                events: BTreeMap::from([(
                    "correctSequence".to_string(),
                    "Dial the right sequence".to_string(),
                )]),
                hints: BTreeMap::from([(
                    "Telephone".to_string(),
                    vec!["The button sends your sequence".to_string()],
                )]),
            }),
        ),
        at(
            "back-end",
            Body::Config(ConfigReport {
                errors: vec!["level I - duplicate id".to_string()],
            }),
        ),
        at(
            "back-end",
            Body::NewConfig(NewConfigNotice {
                name: "escape_x.json".to_string(),
            }),
        ),
        at(
            "telephone",
            Body::Confirmation(Confirmation {
                completed: true,
                instructed: InstructedMessage {
                    sender: Some("front-end".to_string()),
                    kind: Some("instruction".to_string()),
                    contents: vec![Instruction::new("test")],
                },
            }),
        ),
    ]
}

#[test]
fn test_round_trip_every_type() {
    let envelopes = one_of_each();

    let mut seen: Vec<MessageType> = envelopes.iter().map(|e| e.message_type()).collect();
    seen.dedup();
    assert_eq!(seen.len(), MessageType::ALL.len());

    for envelope in envelopes {
        let bytes = encode(&envelope).unwrap();
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded, envelope, "round trip failed for {}", envelope.message_type());
    }
}

#[test]
fn test_round_trip_keeps_subsecond_timestamp() {
    let envelope = Envelope::new(
        "front-end",
        Body::Connection(ConnectionContents { connection: false }),
    );
    assert_eq!(decode(&encode(&envelope).unwrap()).unwrap(), envelope);
}

#[test]
fn test_wire_shape() {
    let envelope = at(
        "front-end",
        Body::Connection(ConnectionContents { connection: true }),
    );
    let value: serde_json::Value = serde_json::from_slice(&encode(&envelope).unwrap()).unwrap();

    assert_eq!(value["sender"], json!("front-end"));
    assert_eq!(value["type"], json!("connection"));
    assert_eq!(value["timestamp"], json!("2024-02-11T13:00:00Z"));
    assert_eq!(value["contents"], json!({"connection": true}));
}

#[test]
fn test_decode_backend_time_message() {
    let payload = json!({
        "sender": "back-end",
        "type": "time",
        "timestamp": "05-12-2019 09:42:10",
        "contents": {"id": "general", "duration": 1800000, "state": "stateIdle"}
    });

    let envelope = decode(payload.to_string().as_bytes()).unwrap();
    assert_eq!(
        envelope.timestamp,
        Utc.with_ymd_and_hms(2019, 12, 5, 9, 42, 10).unwrap()
    );
    assert_eq!(
        envelope.body,
        Body::Time(TimerRecord {
            id: "general".to_string(),
            duration: 1_800_000,
            state: TimerState::Idle,
        })
    );
}

#[test]
fn test_decode_device_library_field_names() {
    let payload = json!({
        "device_id": "telephone",
        "time_sent": "05-12-2019T09:42:10",
        "type": "status",
        "contents": {"receiver": "up", "dial": 3}
    });

    let envelope = decode(payload.to_string().as_bytes()).unwrap();
    assert_eq!(envelope.sender, "telephone");
    match envelope.body {
        Body::Status(StatusContents::Components(map)) => {
            assert_eq!(map["receiver"], json!("up"));
            assert_eq!(map["dial"], json!(3));
        }
        other => panic!("Expected component status, got {:?}", other),
    }
}

#[test]
fn test_decode_epoch_millis_timestamp() {
    let payload = json!({
        "sender": "back-end",
        "type": "new config",
        "timestamp": 1707656400000i64,
        "contents": {"name": "room.json"}
    });

    let envelope = decode(payload.to_string().as_bytes()).unwrap();
    assert_eq!(
        envelope.timestamp,
        Utc.with_ymd_and_hms(2024, 2, 11, 13, 0, 0).unwrap()
    );
}

#[test]
fn test_setup_with_null_cameras_decodes_empty() {
    let payload = json!({
        "sender": "back-end",
        "type": "setup",
        "timestamp": "2024-02-11T13:00:00Z",
        "contents": {"name": "Escape X", "cameras": null, "events": {}, "hints": null}
    });

    match decode(payload.to_string().as_bytes()).unwrap().body {
        Body::Setup(setup) => {
            assert!(setup.cameras.is_empty());
            assert!(setup.hints.is_empty());
            assert_eq!(setup.name, "Escape X");
        }
        other => panic!("Expected setup, got {:?}", other),
    }
}

#[test]
fn test_device_status_with_null_status_map() {
    let payload = json!({
        "sender": "back-end",
        "type": "status",
        "timestamp": "2024-02-11T13:00:00Z",
        "contents": {"id": "d1", "connection": true, "status": null}
    });

    assert_eq!(
        decode(payload.to_string().as_bytes()).unwrap().body,
        Body::Status(StatusContents::Device(DeviceStatus {
            id: "d1".to_string(),
            connection: Some(true),
            status: Map::new(),
        }))
    );
}

#[test]
fn test_device_status_with_bad_fields_is_not_a_component_map() {
    // An id makes it a device report, even when the rest does not fit
    let payload = json!({
        "sender": "back-end",
        "type": "status",
        "timestamp": "2024-02-11T13:00:00Z",
        "contents": {"id": "d1", "connection": "yes"}
    });

    match decode(payload.to_string().as_bytes()) {
        Err(DecodeError::InvalidContents { message_type, .. }) => {
            assert_eq!(message_type, MessageType::Status)
        }
        other => panic!("Expected InvalidContents, got {:?}", other),
    }
}

#[test]
fn test_time_duration_negative_or_fractional() {
    let decode_duration = |duration: serde_json::Value| {
        let payload = json!({
            "sender": "back-end",
            "type": "time",
            "timestamp": "2024-02-11T13:00:00Z",
            "contents": {"id": "general", "duration": duration, "state": "stateActive"}
        });
        match decode(payload.to_string().as_bytes()).unwrap().body {
            Body::Time(record) => record.duration,
            other => panic!("Expected time, got {:?}", other),
        }
    };

    assert_eq!(decode_duration(json!(-1500)), 0);
    assert_eq!(decode_duration(json!(1499.6)), 1500);
    assert_eq!(decode_duration(json!(60000)), 60000);
}

#[test]
fn test_unknown_type_is_rejected() {
    let payload = json!({
        "sender": "back-end",
        "type": "bogus",
        "timestamp": "2024-02-11T13:00:00Z",
        "contents": {}
    });

    assert_eq!(
        decode(payload.to_string().as_bytes()).unwrap_err(),
        DecodeError::UnknownType("bogus".to_string())
    );
}

#[test]
fn test_missing_type_is_rejected() {
    let payload = json!({
        "sender": "back-end",
        "timestamp": "2024-02-11T13:00:00Z",
        "contents": {}
    });

    assert_eq!(
        decode(payload.to_string().as_bytes()).unwrap_err(),
        DecodeError::MissingType
    );
}

#[test]
fn test_not_json_is_malformed() {
    match decode(b"hoi hoi") {
        Err(DecodeError::Malformed(_)) => {}
        other => panic!("Expected Malformed, got {:?}", other),
    }
}

#[test]
fn test_contents_not_matching_type() {
    let payload = json!({
        "sender": "back-end",
        "type": "time",
        "timestamp": "2024-02-11T13:00:00Z",
        "contents": [{"instruction": "reset"}]
    });

    match decode(payload.to_string().as_bytes()) {
        Err(DecodeError::InvalidContents { message_type, .. }) => {
            assert_eq!(message_type, MessageType::Time)
        }
        other => panic!("Expected InvalidContents, got {:?}", other),
    }
}

#[test]
fn test_garbage_timestamp() {
    let payload = json!({
        "sender": "back-end",
        "type": "config",
        "timestamp": "yesterday",
        "contents": {"errors": []}
    });

    assert_eq!(
        decode(payload.to_string().as_bytes()).unwrap_err(),
        DecodeError::InvalidTimestamp("yesterday".to_string())
    );
}

#[test]
fn test_redacted_hides_config_but_not_payload() {
    let envelope = at(
        "front-end",
        Body::Instruction(vec![Instruction::new("check config")
            .with("config", json!({"general": {"name": "Escape X"}, "devices": []}))]),
    );

    let logged = redacted(&envelope);
    assert!(logged.contains(REDACTED_CONFIG));
    assert!(!logged.contains("Escape X"));

    let sent = String::from_utf8(encode(&envelope).unwrap()).unwrap();
    assert!(sent.contains("Escape X"));
    assert!(!sent.contains(REDACTED_CONFIG));
}

#[test]
fn test_redacted_leaves_plain_instructions() {
    let envelope = at(
        "front-end",
        Body::Instruction(vec![Instruction::new("send setup")]),
    );
    assert!(redacted(&envelope).contains("send setup"));
}

#[test]
fn test_message_type_names() {
    assert_eq!(MessageType::parse("event status"), Some(MessageType::EventStatus));
    assert_eq!(MessageType::parse("new config"), Some(MessageType::NewConfig));
    assert_eq!(MessageType::parse("Event Status"), None);
    assert_eq!(MessageType::parse(""), None);
}
