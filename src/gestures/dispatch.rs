use crate::gestures::engine::{Classification, GestureEvent, GestureKind, Phase};
use crate::gestures::landmarks::HandSnapshot;
use crate::gestures::telemetry::{
    GestureAnnouncer, RecordingState, TelemetryConfig, TelemetryMessage, TelemetrySink,
};
use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Control,
    Shift,
    Alt,
    Char(char),
}

pub const PASTE_SHORTCUT: [Key; 2] = [Key::Control, Key::Char('v')];

pub trait InputBackend: Send + Sync {
    fn screen_size(&self) -> Option<(i32, i32)>;
    fn move_cursor(&self, x: i32, y: i32) -> anyhow::Result<()>;
    fn mouse_down(&self, button: MouseButton) -> anyhow::Result<()>;
    fn mouse_up(&self, button: MouseButton) -> anyhow::Result<()>;
    /// Positive units scroll content up.
    fn scroll(&self, units: i32) -> anyhow::Result<()>;
    fn hotkey(&self, keys: &[Key]) -> anyhow::Result<()>;
}

pub trait ClipboardBackend: Send + Sync {
    fn copy(&self, text: &str) -> anyhow::Result<()>;
    fn paste(&self) -> anyhow::Result<String>;
}

/// Downstream consumer of recording brackets (the audio streamer).
pub trait RecordingSink: Send + Sync {
    fn start(&self) -> anyhow::Result<()>;
    fn stop(&self) -> anyhow::Result<()>;
}

#[derive(Debug, Default)]
pub struct LoggingRecordingSink;

impl RecordingSink for LoggingRecordingSink {
    fn start(&self) -> anyhow::Result<()> {
        tracing::info!("recording bracket opened");
        Ok(())
    }

    fn stop(&self) -> anyhow::Result<()> {
        tracing::info!("recording bracket closed");
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// OS scroll units per unit of classifier scroll speed.
    pub scroll_units_per_speed: f64,
    pub mouse_enabled: bool,
    /// Overrides the size reported by the input backend.
    pub screen_size: Option<(i32, i32)>,
    /// Stored in its own settings block.
    #[serde(skip)]
    pub telemetry: TelemetryConfig,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            scroll_units_per_speed: 20.0,
            mouse_enabled: true,
            screen_size: None,
            telemetry: TelemetryConfig::default(),
        }
    }
}

/// Actuators and telemetry shared by every dispatcher a service creates.
#[derive(Clone)]
pub struct Backends {
    pub input: Arc<dyn InputBackend>,
    pub clipboard: Arc<dyn ClipboardBackend>,
    pub recording: Arc<dyn RecordingSink>,
    pub telemetry: Arc<dyn TelemetrySink>,
}

#[derive(Debug, Default, Clone, Copy)]
struct ButtonsDown {
    left: bool,
    right: bool,
}

impl ButtonsDown {
    fn get_mut(&mut self, button: MouseButton) -> &mut bool {
        match button {
            MouseButton::Left => &mut self.left,
            MouseButton::Right => &mut self.right,
        }
    }
}

/// Translates classifier output into actuator calls and telemetry.
///
/// Tracks which mouse buttons it has pressed and whether a recording
/// bracket is open, so it never presses twice and never releases what it
/// did not press. Actuator failures are reported and swallowed.
pub struct EventDispatcher {
    config: DispatchConfig,
    input: Arc<dyn InputBackend>,
    clipboard: Arc<dyn ClipboardBackend>,
    recording: Arc<dyn RecordingSink>,
    telemetry: Arc<dyn TelemetrySink>,
    announcer: GestureAnnouncer,
    buttons: ButtonsDown,
    recording_open: bool,
    last_error: Option<String>,
}

impl EventDispatcher {
    pub fn new(
        config: DispatchConfig,
        input: Arc<dyn InputBackend>,
        clipboard: Arc<dyn ClipboardBackend>,
        recording: Arc<dyn RecordingSink>,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> Self {
        Self {
            announcer: GestureAnnouncer::new(config.telemetry.reannounce_every),
            config,
            input,
            clipboard,
            recording,
            telemetry,
            buttons: ButtonsDown::default(),
            recording_open: false,
            last_error: None,
        }
    }

    pub fn from_backends(config: DispatchConfig, backends: &Backends) -> Self {
        Self::new(
            config,
            Arc::clone(&backends.input),
            Arc::clone(&backends.clipboard),
            Arc::clone(&backends.recording),
            Arc::clone(&backends.telemetry),
        )
    }

    pub fn is_button_down(&self, button: MouseButton) -> bool {
        match button {
            MouseButton::Left => self.buttons.left,
            MouseButton::Right => self.buttons.right,
        }
    }

    pub fn is_recording_open(&self) -> bool {
        self.recording_open
    }

    pub fn is_mouse_enabled(&self) -> bool {
        self.config.mouse_enabled
    }

    pub fn dispatch_classification(
        &mut self,
        classification: &Classification,
        snapshot: &HandSnapshot,
    ) {
        for event in classification.events() {
            self.dispatch(event, Some(snapshot));
        }
    }

    pub fn dispatch_hand_lost(&mut self, closed: &[GestureEvent]) {
        for event in closed {
            self.dispatch(*event, None);
        }
    }

    pub fn dispatch(&mut self, event: GestureEvent, snapshot: Option<&HandSnapshot>) {
        if self.announcer.should_announce(&event) {
            let confidence = snapshot
                .and_then(|s| s.confidence())
                .unwrap_or(self.config.telemetry.default_confidence);
            self.telemetry
                .send(&TelemetryMessage::gesture(&event, confidence));
        }

        match self.apply(event, snapshot) {
            Ok(()) => self.last_error = None,
            Err(err) => self.report_failure(&event, err),
        }
    }

    /// Releasing the mouse lifts any held button right away.
    pub fn set_mouse_enabled(&mut self, enabled: bool) {
        self.config.mouse_enabled = enabled;
        if !enabled {
            self.release_buttons();
        }
    }

    /// Lifts held buttons and closes an open recording bracket.
    pub fn release_all(&mut self) {
        self.release_buttons();
        if let Err(err) = self.close_recording() {
            self.report_failure(&GestureEvent::pinch(GestureKind::Recording, Phase::End), err);
        }
        self.announcer.reset();
    }

    pub fn copy_to_clipboard(&self, text: &str) -> anyhow::Result<()> {
        self.clipboard.copy(text)
    }

    pub fn status(&self, message: impl Into<String>) {
        self.telemetry.send(&TelemetryMessage::status(message));
    }

    pub fn scroll_units(&self, speed: f64) -> i32 {
        (-speed * self.config.scroll_units_per_speed).round() as i32
    }

    fn apply(
        &mut self,
        event: GestureEvent,
        snapshot: Option<&HandSnapshot>,
    ) -> anyhow::Result<()> {
        match event {
            GestureEvent::Cursor => self.follow_thumb(snapshot),
            GestureEvent::Pinch {
                kind: GestureKind::LeftClick,
                phase,
            } => self.button(MouseButton::Left, phase, snapshot),
            GestureEvent::Pinch {
                kind: GestureKind::RightClick,
                phase,
            } => self.button(MouseButton::Right, phase, snapshot),
            GestureEvent::Pinch {
                kind: GestureKind::Paste,
                phase: Phase::Start,
            } => self.paste(),
            GestureEvent::Pinch {
                kind: GestureKind::Recording,
                phase: Phase::Start,
            } => self.open_recording(),
            GestureEvent::Pinch {
                kind: GestureKind::Recording,
                phase: Phase::End,
            } => self.close_recording(),
            GestureEvent::ScrollDelta { speed } => self.scroll(speed),
            GestureEvent::Pinch { .. }
            | GestureEvent::ScrollStart
            | GestureEvent::ScrollHold
            | GestureEvent::NoEvent => Ok(()),
        }
    }

    fn follow_thumb(&self, snapshot: Option<&HandSnapshot>) -> anyhow::Result<()> {
        if !self.config.mouse_enabled {
            return Ok(());
        }
        let Some(snapshot) = snapshot else {
            return Ok(());
        };
        let (width, height) = self
            .config
            .screen_size
            .or_else(|| self.input.screen_size())
            .ok_or_else(|| anyhow!("screen size unavailable"))?;
        let (x, y) = snapshot.thumb_screen_position(width, height);
        self.input.move_cursor(x, y)
    }

    fn button(
        &mut self,
        button: MouseButton,
        phase: Phase,
        snapshot: Option<&HandSnapshot>,
    ) -> anyhow::Result<()> {
        match phase {
            Phase::Start => {
                // A failed move still presses at the current pointer position.
                let moved = self.follow_thumb(snapshot);
                if !self.config.mouse_enabled || self.is_button_down(button) {
                    return moved;
                }
                if let Err(err) = self.input.mouse_down(button) {
                    return moved.and(Err(err));
                }
                *self.buttons.get_mut(button) = true;
                moved
            }
            // Dragging: the pointer keeps following the thumb while held.
            Phase::Hold => self.follow_thumb(snapshot),
            Phase::End => {
                let down = self.buttons.get_mut(button);
                if !*down {
                    return Ok(());
                }
                *down = false;
                self.input.mouse_up(button)
            }
        }
    }

    fn paste(&self) -> anyhow::Result<()> {
        let text = self.clipboard.paste()?;
        if text.is_empty() {
            tracing::info!("clipboard is empty; paste gesture ignored");
            return Ok(());
        }
        self.input.hotkey(&PASTE_SHORTCUT)
    }

    fn open_recording(&mut self) -> anyhow::Result<()> {
        if self.recording_open {
            return Ok(());
        }
        self.recording_open = true;
        self.telemetry.send(&TelemetryMessage::Recording {
            state: RecordingState::Start,
        });
        self.recording.start()
    }

    fn close_recording(&mut self) -> anyhow::Result<()> {
        if !self.recording_open {
            return Ok(());
        }
        self.recording_open = false;
        self.telemetry.send(&TelemetryMessage::Recording {
            state: RecordingState::Stop,
        });
        self.recording.stop()
    }

    fn scroll(&self, speed: f64) -> anyhow::Result<()> {
        if !self.config.mouse_enabled {
            return Ok(());
        }
        let units = self.scroll_units(speed);
        if units == 0 {
            return Ok(());
        }
        self.input.scroll(units)
    }

    fn release_buttons(&mut self) {
        for button in [MouseButton::Left, MouseButton::Right] {
            let down = self.buttons.get_mut(button);
            if !*down {
                continue;
            }
            *down = false;
            if let Err(err) = self.input.mouse_up(button) {
                let kind = match button {
                    MouseButton::Left => GestureKind::LeftClick,
                    MouseButton::Right => GestureKind::RightClick,
                };
                self.report_failure(&GestureEvent::pinch(kind, Phase::End), err);
            }
        }
    }

    fn report_failure(&mut self, event: &GestureEvent, err: anyhow::Error) {
        let message = format!("{err:#}");
        if self.last_error.as_deref() == Some(message.as_str()) {
            return;
        }
        tracing::warn!(gesture = event.label(), error = %message, "actuator call failed");
        self.telemetry.send(&TelemetryMessage::DispatchError {
            gesture_type: event.label().to_string(),
            message: message.clone(),
        });
        self.last_error = Some(message);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputCall {
    Move(i32, i32),
    Down(MouseButton),
    Up(MouseButton),
    Scroll(i32),
    Hotkey(Vec<Key>),
}

/// Records every call; can be told to fail them all.
#[derive(Debug)]
pub struct MockInputBackend {
    calls: Mutex<Vec<InputCall>>,
    failing: AtomicBool,
    failing_moves: AtomicUsize,
    screen: Option<(i32, i32)>,
}

impl Default for MockInputBackend {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
            failing_moves: AtomicUsize::new(0),
            screen: Some((1920, 1080)),
        }
    }
}

impl MockInputBackend {
    pub fn calls(&self) -> Vec<InputCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn button_calls(&self) -> Vec<InputCall> {
        self.calls()
            .into_iter()
            .filter(|call| matches!(call, InputCall::Down(_) | InputCall::Up(_)))
            .collect()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Fails the next `count` cursor moves only.
    pub fn fail_next_moves(&self, count: usize) {
        self.failing_moves.store(count, Ordering::SeqCst);
    }

    fn record(&self, call: InputCall) -> anyhow::Result<()> {
        if let Ok(mut guard) = self.calls.lock() {
            guard.push(call);
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(anyhow!("mock input failure"));
        }
        Ok(())
    }
}

impl InputBackend for MockInputBackend {
    fn screen_size(&self) -> Option<(i32, i32)> {
        self.screen
    }

    fn move_cursor(&self, x: i32, y: i32) -> anyhow::Result<()> {
        let pending = self.failing_moves.load(Ordering::SeqCst);
        if pending > 0 {
            self.failing_moves.store(pending - 1, Ordering::SeqCst);
            return Err(anyhow!("mock cursor move failure"));
        }
        self.record(InputCall::Move(x, y))
    }

    fn mouse_down(&self, button: MouseButton) -> anyhow::Result<()> {
        self.record(InputCall::Down(button))
    }

    fn mouse_up(&self, button: MouseButton) -> anyhow::Result<()> {
        self.record(InputCall::Up(button))
    }

    fn scroll(&self, units: i32) -> anyhow::Result<()> {
        self.record(InputCall::Scroll(units))
    }

    fn hotkey(&self, keys: &[Key]) -> anyhow::Result<()> {
        self.record(InputCall::Hotkey(keys.to_vec()))
    }
}

#[derive(Debug, Default)]
pub struct MockClipboard {
    text: Mutex<String>,
}

impl MockClipboard {
    pub fn with_text(text: &str) -> Self {
        Self {
            text: Mutex::new(text.to_string()),
        }
    }

    pub fn text(&self) -> String {
        self.text.lock().map(|t| t.clone()).unwrap_or_default()
    }
}

impl ClipboardBackend for MockClipboard {
    fn copy(&self, text: &str) -> anyhow::Result<()> {
        let mut guard = self.text.lock().map_err(|_| anyhow!("lock"))?;
        *guard = text.to_string();
        Ok(())
    }

    fn paste(&self) -> anyhow::Result<String> {
        Ok(self.text())
    }
}

#[derive(Debug, Default)]
pub struct MockRecordingSink {
    starts: AtomicUsize,
    stops: AtomicUsize,
}

impl MockRecordingSink {
    pub fn start_count(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl RecordingSink for MockRecordingSink {
    fn start(&self) -> anyhow::Result<()> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) -> anyhow::Result<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
