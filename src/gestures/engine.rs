use crate::gestures::landmarks::{centroid, HandSnapshot, NamedLandmark, Point3, LANDMARK_COUNT};
use crate::gestures::mapping::{MotionAction, MotionMapping, Pinch, SharedMotionMapping};
use crate::gestures::scroll::{
    ScrollStep, ScrollTracker, DEFAULT_SCROLL_DEAD_ZONE, DEFAULT_SCROLL_SENSITIVITY,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub pinch_threshold: f64,
    /// Looser than `pinch_threshold`: three fingers are harder to hold tight.
    pub scroll_threshold: f64,
    pub scroll_sensitivity: f64,
    pub scroll_dead_zone: f64,
    /// Calls answered with `no_event` after each start/end transition.
    pub debounce_frames: u32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            pinch_threshold: 0.04,
            scroll_threshold: 0.08,
            scroll_sensitivity: DEFAULT_SCROLL_SENSITIVITY,
            scroll_dead_zone: DEFAULT_SCROLL_DEAD_ZONE,
            debounce_frames: 0,
        }
    }
}

impl ClassifierConfig {
    pub fn validate(&self) -> Result<(), GestureError> {
        if !(self.pinch_threshold > 0.0) {
            return Err(GestureError::InvalidConfig(format!(
                "pinch_threshold must be positive, got {}",
                self.pinch_threshold
            )));
        }
        if !(self.pinch_threshold < self.scroll_threshold) {
            return Err(GestureError::InvalidConfig(format!(
                "pinch_threshold ({}) must be smaller than scroll_threshold ({})",
                self.pinch_threshold, self.scroll_threshold
            )));
        }
        if !(self.scroll_sensitivity > 0.0) {
            return Err(GestureError::InvalidConfig(format!(
                "scroll_sensitivity must be positive, got {}",
                self.scroll_sensitivity
            )));
        }
        if !(self.scroll_dead_zone >= 0.0) {
            return Err(GestureError::InvalidConfig(format!(
                "scroll_dead_zone must not be negative, got {}",
                self.scroll_dead_zone
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GestureError {
    /// Open sub-gestures were force-closed; `closed` holds their terminal
    /// events so the caller can still release whatever they drive.
    #[error("hand snapshot has {actual} landmarks, expected {expected}")]
    MalformedSnapshot {
        expected: usize,
        actual: usize,
        closed: Vec<GestureEvent>,
    },
    #[error("invalid classifier config: {0}")]
    InvalidConfig(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Start,
    Hold,
    End,
}

/// Latched pinch gestures, listed in arbitration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GestureKind {
    Paste,
    Recording,
    LeftClick,
    RightClick,
}

impl GestureKind {
    pub const PRIORITY: [GestureKind; 4] = [
        GestureKind::Paste,
        GestureKind::Recording,
        GestureKind::LeftClick,
        GestureKind::RightClick,
    ];

    fn bound_pinch(self, mapping: &MotionMapping) -> Pinch {
        match self {
            GestureKind::Paste => mapping.pinch_for(MotionAction::Paste),
            GestureKind::Recording => Pinch::ThumbRing,
            GestureKind::LeftClick => mapping.pinch_for(MotionAction::LeftClick),
            GestureKind::RightClick => mapping.pinch_for(MotionAction::RightClick),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureEvent {
    Cursor,
    Pinch { kind: GestureKind, phase: Phase },
    ScrollStart,
    ScrollHold,
    ScrollDelta { speed: f64 },
    NoEvent,
}

impl GestureEvent {
    pub const fn pinch(kind: GestureKind, phase: Phase) -> Self {
        GestureEvent::Pinch { kind, phase }
    }

    pub fn label(&self) -> &'static str {
        match self {
            GestureEvent::Cursor => "cursor",
            GestureEvent::Pinch { kind, phase } => match (kind, phase) {
                (GestureKind::LeftClick, Phase::Start) => "left_click_start",
                (GestureKind::LeftClick, Phase::Hold) => "left_click_hold",
                (GestureKind::LeftClick, Phase::End) => "left_click_end",
                (GestureKind::RightClick, Phase::Start) => "right_click_start",
                (GestureKind::RightClick, Phase::Hold) => "right_click_hold",
                (GestureKind::RightClick, Phase::End) => "right_click_end",
                (GestureKind::Recording, Phase::Start) => "recording_start",
                (GestureKind::Recording, Phase::Hold) => "recording_hold",
                (GestureKind::Recording, Phase::End) => "recording_stop",
                (GestureKind::Paste, Phase::Start) => "paste_start",
                (GestureKind::Paste, Phase::Hold) => "paste_hold",
                (GestureKind::Paste, Phase::End) => "paste_end",
            },
            GestureEvent::ScrollStart => "scroll_start",
            GestureEvent::ScrollHold => "scroll_hold",
            GestureEvent::ScrollDelta { .. } => "scroll_delta",
            GestureEvent::NoEvent => "no_event",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            GestureEvent::Pinch {
                phase: Phase::End,
                ..
            }
        )
    }

    /// Steady-state labels that the telemetry layer re-announces.
    pub fn is_sticky(&self) -> bool {
        matches!(
            self,
            GestureEvent::Cursor
                | GestureEvent::ScrollHold
                | GestureEvent::Pinch {
                    phase: Phase::Hold,
                    ..
                }
        )
    }

    fn is_transition(&self) -> bool {
        matches!(
            self,
            GestureEvent::Pinch {
                phase: Phase::Start | Phase::End,
                ..
            }
        )
    }
}

impl std::fmt::Display for GestureEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GestureEvent::ScrollDelta { speed } => write!(f, "scroll_delta({speed:.3})"),
            other => f.write_str(other.label()),
        }
    }
}

/// Result of one `classify` call: the primary label, plus terminal events
/// of sub-gestures force-closed during the same call (delivered first).
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub closed: Vec<GestureEvent>,
    pub event: GestureEvent,
}

impl Classification {
    pub fn single(event: GestureEvent) -> Self {
        Self {
            closed: Vec::new(),
            event,
        }
    }

    pub fn events(&self) -> impl Iterator<Item = GestureEvent> + '_ {
        self.closed.iter().copied().chain(std::iter::once(self.event))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Latch {
    #[default]
    Idle,
    /// Remembers the finger pair that opened it, so a remap can close it.
    Active { pinch: Pinch },
}

impl Latch {
    pub fn is_active(&self) -> bool {
        matches!(self, Latch::Active { .. })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Latches {
    paste: Latch,
    recording: Latch,
    left_click: Latch,
    right_click: Latch,
}

impl Latches {
    fn get(&self, kind: GestureKind) -> Latch {
        match kind {
            GestureKind::Paste => self.paste,
            GestureKind::Recording => self.recording,
            GestureKind::LeftClick => self.left_click,
            GestureKind::RightClick => self.right_click,
        }
    }

    fn get_mut(&mut self, kind: GestureKind) -> &mut Latch {
        match kind {
            GestureKind::Paste => &mut self.paste,
            GestureKind::Recording => &mut self.recording,
            GestureKind::LeftClick => &mut self.left_click,
            GestureKind::RightClick => &mut self.right_click,
        }
    }
}

/// Read-only view of the classifier's persistent state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureState {
    pub is_left_clicking: bool,
    pub is_right_clicking: bool,
    pub is_recording: bool,
    pub is_pasting: bool,
    pub is_scrolling: bool,
    pub scroll_anchor: Option<Point3>,
}

impl GestureState {
    pub fn is_idle(&self) -> bool {
        !(self.is_left_clicking
            || self.is_right_clicking
            || self.is_recording
            || self.is_pasting
            || self.is_scrolling)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinchDistances {
    pub thumb_index: f64,
    pub thumb_middle: f64,
    pub thumb_ring: f64,
    pub thumb_pinky: f64,
    pub index_middle: f64,
}

impl PinchDistances {
    pub fn measure(snapshot: &HandSnapshot) -> Self {
        let pinch = |p: Pinch| {
            let (a, b) = p.landmarks();
            snapshot.distance(a, b)
        };
        Self {
            thumb_index: pinch(Pinch::ThumbIndex),
            thumb_middle: pinch(Pinch::ThumbMiddle),
            thumb_ring: pinch(Pinch::ThumbRing),
            thumb_pinky: pinch(Pinch::ThumbPinky),
            index_middle: snapshot.distance(NamedLandmark::IndexTip, NamedLandmark::MiddleTip),
        }
    }

    pub fn get(&self, pinch: Pinch) -> f64 {
        match pinch {
            Pinch::ThumbIndex => self.thumb_index,
            Pinch::ThumbMiddle => self.thumb_middle,
            Pinch::ThumbRing => self.thumb_ring,
            Pinch::ThumbPinky => self.thumb_pinky,
        }
    }

    fn is_three_finger_pinch(&self, threshold: f64) -> bool {
        self.thumb_index < threshold
            && self.thumb_middle < threshold
            && self.index_middle < threshold
    }
}

/// Turns per-frame hand snapshots into a stable stream of gesture events.
///
/// One instance tracks one hand. Calls must be serialized; the motion
/// mapping may be swapped from elsewhere through [`SharedMotionMapping`]
/// and is read once at the start of every call.
#[derive(Debug)]
pub struct GestureClassifier {
    config: ClassifierConfig,
    mapping: SharedMotionMapping,
    latches: Latches,
    scroll: ScrollTracker,
    debounce_remaining: u32,
}

impl GestureClassifier {
    pub fn new(config: ClassifierConfig, mapping: SharedMotionMapping) -> Self {
        Self {
            scroll: ScrollTracker::new(config.scroll_sensitivity, config.scroll_dead_zone),
            config,
            mapping,
            latches: Latches::default(),
            debounce_remaining: 0,
        }
    }

    pub fn with_mapping(config: ClassifierConfig, mapping: MotionMapping) -> Self {
        Self::new(config, SharedMotionMapping::new(mapping))
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn mapping_handle(&self) -> SharedMotionMapping {
        self.mapping.clone()
    }

    /// Takes effect on the next `classify` call.
    pub fn update_mapping(&self, mapping: MotionMapping) {
        self.mapping.update(mapping);
    }

    pub fn state(&self) -> GestureState {
        GestureState {
            is_left_clicking: self.latches.left_click.is_active(),
            is_right_clicking: self.latches.right_click.is_active(),
            is_recording: self.latches.recording.is_active(),
            is_pasting: self.latches.paste.is_active(),
            is_scrolling: self.scroll.is_active(),
            scroll_anchor: self.scroll.anchor(),
        }
    }

    pub fn classify(&mut self, snapshot: &HandSnapshot) -> Classification {
        if self.debounce_remaining > 0 {
            self.debounce_remaining -= 1;
            return Classification::single(GestureEvent::NoEvent);
        }

        let mapping = self.mapping.current();
        let distances = PinchDistances::measure(snapshot);
        let mut closed = Vec::new();

        if distances.is_three_finger_pinch(self.config.scroll_threshold) {
            for kind in GestureKind::PRIORITY {
                closed.extend(self.close(kind));
            }
            let position = scroll_position(snapshot);
            let event = match self.scroll.update(position) {
                ScrollStep::Start => GestureEvent::ScrollStart,
                ScrollStep::Hold => GestureEvent::ScrollHold,
                ScrollStep::Delta(speed) => GestureEvent::ScrollDelta { speed },
            };
            return self.finish(closed, event);
        }

        if self.scroll.is_active() {
            tracing::debug!("three-finger pinch released; scroll anchor cleared");
            self.scroll.reset();
        }

        let threshold = self.config.pinch_threshold;
        for kind in GestureKind::PRIORITY {
            let released = match self.latches.get(kind) {
                Latch::Active { pinch } => {
                    pinch != kind.bound_pinch(&mapping) || distances.get(pinch) >= threshold
                }
                Latch::Idle => false,
            };
            if released {
                closed.extend(self.close(kind));
            }
        }

        let selected = GestureKind::PRIORITY
            .into_iter()
            .find(|kind| distances.get(kind.bound_pinch(&mapping)) < threshold);

        let event = match selected {
            Some(kind) if self.latches.get(kind).is_active() => {
                GestureEvent::pinch(kind, Phase::Hold)
            }
            Some(kind) => {
                for other in GestureKind::PRIORITY {
                    if other != kind {
                        closed.extend(self.close(other));
                    }
                }
                *self.latches.get_mut(kind) = Latch::Active {
                    pinch: kind.bound_pinch(&mapping),
                };
                GestureEvent::pinch(kind, Phase::Start)
            }
            None if closed.is_empty() => GestureEvent::Cursor,
            None => closed.remove(0),
        };

        self.finish(closed, event)
    }

    /// Validates the raw point list before classifying. On malformed input
    /// every open sub-gesture is closed as if the hand had been lost.
    pub fn classify_points(
        &mut self,
        points: &[Point3],
    ) -> Result<(HandSnapshot, Classification), GestureError> {
        match HandSnapshot::from_slice(points) {
            Some(snapshot) => {
                let classification = self.classify(&snapshot);
                Ok((snapshot, classification))
            }
            None => {
                let closed = self.on_hand_lost();
                tracing::error!(
                    actual = points.len(),
                    expected = LANDMARK_COUNT,
                    "rejected malformed hand snapshot"
                );
                Err(GestureError::MalformedSnapshot {
                    expected: LANDMARK_COUNT,
                    actual: points.len(),
                    closed,
                })
            }
        }
    }

    /// Closes every active sub-gesture, in priority order, and returns their
    /// terminal events. Idempotent: a second call returns nothing.
    pub fn on_hand_lost(&mut self) -> Vec<GestureEvent> {
        self.scroll.reset();
        self.debounce_remaining = 0;
        let closed: Vec<GestureEvent> = GestureKind::PRIORITY
            .into_iter()
            .filter_map(|kind| self.close(kind))
            .collect();
        if !closed.is_empty() {
            tracing::info!(count = closed.len(), "hand lost; closed active gestures");
        }
        closed
    }

    fn close(&mut self, kind: GestureKind) -> Option<GestureEvent> {
        let latch = self.latches.get_mut(kind);
        if latch.is_active() {
            *latch = Latch::Idle;
            Some(GestureEvent::pinch(kind, Phase::End))
        } else {
            None
        }
    }

    fn finish(&mut self, closed: Vec<GestureEvent>, event: GestureEvent) -> Classification {
        let transitioned = !closed.is_empty() || event.is_transition();
        if transitioned {
            tracing::debug!(event = %event, closed = closed.len(), "gesture transition");
            self.debounce_remaining = self.config.debounce_frames;
        }
        Classification { closed, event }
    }
}

fn scroll_position(snapshot: &HandSnapshot) -> Point3 {
    let tips = [
        snapshot.point(NamedLandmark::ThumbTip),
        snapshot.point(NamedLandmark::IndexTip),
        snapshot.point(NamedLandmark::MiddleTip),
    ];
    centroid(&tips).unwrap_or(tips[0])
}
