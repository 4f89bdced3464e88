use pinch_control::gestures::engine::{GestureEvent, GestureKind, Phase};
use pinch_control::gestures::telemetry::{
    GestureAnnouncer, JsonLinesSink, MemorySink, TelemetryConfig, TelemetryMessage,
    TelemetrySink,
};
use serde_json::{json, Value};

#[test]
fn announcer_reports_label_changes() {
    let mut announcer = GestureAnnouncer::new(10);
    let start = GestureEvent::pinch(GestureKind::LeftClick, Phase::Start);
    let hold = GestureEvent::pinch(GestureKind::LeftClick, Phase::Hold);
    assert!(announcer.should_announce(&GestureEvent::Cursor));
    assert!(!announcer.should_announce(&GestureEvent::Cursor));
    assert!(announcer.should_announce(&start));
    assert!(announcer.should_announce(&hold));
    assert!(!announcer.should_announce(&hold));
}

#[test]
fn sticky_labels_repeat_on_cadence() {
    let mut announcer = GestureAnnouncer::new(3);
    let pattern: Vec<bool> = (0..7)
        .map(|_| announcer.should_announce(&GestureEvent::ScrollHold))
        .collect();
    assert_eq!(pattern, [true, false, false, true, false, false, true]);
}

#[test]
fn scroll_deltas_do_not_repeat() {
    let mut announcer = GestureAnnouncer::new(2);
    let delta = GestureEvent::ScrollDelta { speed: 1.0 };
    let announced = (0..6).filter(|_| announcer.should_announce(&delta)).count();
    assert_eq!(announced, 1);
}

#[test]
fn reset_reannounces_next_label() {
    let mut announcer = GestureAnnouncer::default();
    assert!(announcer.should_announce(&GestureEvent::Cursor));
    announcer.reset();
    assert!(announcer.should_announce(&GestureEvent::Cursor));
}

#[test]
fn message_shapes() {
    let messages = [
        (
            TelemetryMessage::gesture(&GestureEvent::ScrollDelta { speed: -2.5 }, 0.8),
            json!({"type": "gesture", "gesture_type": "scroll_delta", "confidence": 0.8, "speed": -2.5}),
        ),
        (
            TelemetryMessage::DispatchError {
                gesture_type: "paste_start".into(),
                message: "no clipboard".into(),
            },
            json!({"type": "dispatch_error", "gesture_type": "paste_start", "message": "no clipboard"}),
        ),
    ];
    for (message, expected) in messages {
        assert_eq!(serde_json::to_value(&message).unwrap(), expected);
    }
}

#[test]
fn status_carries_timestamp() {
    let value = serde_json::to_value(TelemetryMessage::status("tracking started")).unwrap();
    assert_eq!(value["type"], "status");
    assert_eq!(value["message"], "tracking started");
    assert!(value["timestamp"].as_i64().unwrap() > 0);
}

#[test]
fn json_lines_parse_back() {
    let sink = JsonLinesSink::new(Vec::new());
    sink.send(&TelemetryMessage::gesture(&GestureEvent::Cursor, 0.7));
    sink.send(&TelemetryMessage::status("ok"));
    let out = String::from_utf8(sink.into_inner()).unwrap();
    let parsed: Vec<TelemetryMessage> = out
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(parsed.len(), 2);
    assert_eq!(parsed[0], TelemetryMessage::gesture(&GestureEvent::Cursor, 0.7));
    let value: Value = serde_json::from_str(out.lines().nth(1).unwrap()).unwrap();
    assert_eq!(value["type"], "status");
}

#[test]
fn memory_sink_collects_gesture_labels() {
    let sink = MemorySink::default();
    sink.send(&TelemetryMessage::status("ignored"));
    sink.send(&TelemetryMessage::gesture(&GestureEvent::NoEvent, 0.8));
    assert_eq!(sink.gesture_labels(), vec!["no_event"]);
    assert_eq!(sink.messages().len(), 2);
}

#[test]
fn config_defaults() {
    let config: TelemetryConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(config.reannounce_every, 10);
    assert_eq!(config.default_confidence, 0.8);
}
