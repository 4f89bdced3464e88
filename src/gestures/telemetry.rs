use crate::gestures::engine::GestureEvent;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::sync::{Arc, Mutex};

pub const DEFAULT_CONFIDENCE: f64 = 0.8;
pub const DEFAULT_REANNOUNCE_EVERY: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Unchanged frames between repeats of a sticky label.
    pub reannounce_every: u32,
    /// Reported when the detector gives no confidence for a frame.
    pub default_confidence: f64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            reannounce_every: DEFAULT_REANNOUNCE_EVERY,
            default_confidence: DEFAULT_CONFIDENCE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordingState {
    Start,
    Stop,
}

/// One line on the outbound UI channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TelemetryMessage {
    Gesture {
        gesture_type: String,
        confidence: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        speed: Option<f64>,
    },
    Status {
        message: String,
        timestamp: i64,
    },
    Recording {
        state: RecordingState,
    },
    DispatchError {
        gesture_type: String,
        message: String,
    },
}

impl TelemetryMessage {
    pub fn gesture(event: &GestureEvent, confidence: f64) -> Self {
        let speed = match event {
            GestureEvent::ScrollDelta { speed } => Some(*speed),
            _ => None,
        };
        TelemetryMessage::Gesture {
            gesture_type: event.label().to_string(),
            confidence,
            speed,
        }
    }

    pub fn status(message: impl Into<String>) -> Self {
        TelemetryMessage::Status {
            message: message.into(),
            timestamp: Local::now().timestamp(),
        }
    }
}

pub trait TelemetrySink: Send + Sync {
    fn send(&self, message: &TelemetryMessage);
}

/// Writes each message as one JSON object per line and flushes.
pub struct JsonLinesSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        match self.writer.into_inner() {
            Ok(writer) => writer,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write_line(&self, message: &TelemetryMessage) -> anyhow::Result<()> {
        let line = serde_json::to_string(message)?;
        let mut guard = self
            .writer
            .lock()
            .map_err(|_| anyhow::anyhow!("telemetry writer lock poisoned"))?;
        writeln!(guard, "{line}")?;
        guard.flush()?;
        Ok(())
    }
}

impl<W: Write + Send> TelemetrySink for JsonLinesSink<W> {
    fn send(&self, message: &TelemetryMessage) {
        if let Err(err) = self.write_line(message) {
            tracing::warn!(?err, "failed to write telemetry");
        }
    }
}

impl JsonLinesSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    messages: Arc<Mutex<Vec<TelemetryMessage>>>,
}

impl MemorySink {
    pub fn messages(&self) -> Vec<TelemetryMessage> {
        self.messages.lock().map(|m| m.clone()).unwrap_or_default()
    }

    pub fn gesture_labels(&self) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter_map(|m| match m {
                TelemetryMessage::Gesture { gesture_type, .. } => Some(gesture_type),
                _ => None,
            })
            .collect()
    }
}

impl TelemetrySink for MemorySink {
    fn send(&self, message: &TelemetryMessage) {
        if let Ok(mut guard) = self.messages.lock() {
            guard.push(message.clone());
        }
    }
}

#[derive(Debug, Default)]
pub struct NullSink;

impl TelemetrySink for NullSink {
    fn send(&self, _message: &TelemetryMessage) {}
}

/// Decides which gesture labels go out: every label change, plus a
/// repeat of a sticky label every `reannounce_every` unchanged frames so a
/// consumer that missed the transition catches up.
#[derive(Debug, Clone)]
pub struct GestureAnnouncer {
    reannounce_every: u32,
    last_label: Option<&'static str>,
    repeat_counter: u32,
}

impl GestureAnnouncer {
    pub fn new(reannounce_every: u32) -> Self {
        Self {
            reannounce_every: reannounce_every.max(1),
            last_label: None,
            repeat_counter: 0,
        }
    }

    pub fn should_announce(&mut self, event: &GestureEvent) -> bool {
        let label = event.label();
        if self.last_label != Some(label) {
            self.last_label = Some(label);
            self.repeat_counter = 0;
            return true;
        }
        if event.is_sticky() {
            self.repeat_counter += 1;
            if self.repeat_counter >= self.reannounce_every {
                self.repeat_counter = 0;
                return true;
            }
        }
        false
    }

    pub fn reset(&mut self) {
        self.last_label = None;
        self.repeat_counter = 0;
    }
}

impl Default for GestureAnnouncer {
    fn default() -> Self {
        Self::new(DEFAULT_REANNOUNCE_EVERY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gesture_message_shape() {
        let msg = TelemetryMessage::gesture(&GestureEvent::Cursor, 0.8);
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "gesture", "gesture_type": "cursor", "confidence": 0.8})
        );
    }

    #[test]
    fn json_lines_sink_writes_one_line_per_message() {
        let sink = JsonLinesSink::new(Vec::new());
        sink.send(&TelemetryMessage::Recording {
            state: RecordingState::Start,
        });
        sink.send(&TelemetryMessage::gesture(
            &GestureEvent::ScrollDelta { speed: 1.5 },
            0.9,
        ));
        let out = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], r#"{"type":"recording","state":"start"}"#);
        assert!(lines[1].contains(r#""speed":1.5"#));
    }
}
