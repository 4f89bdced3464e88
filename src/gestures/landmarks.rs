use serde::{Deserialize, Serialize};

pub const LANDMARK_COUNT: usize = 21;

/// Horizontal tip/joint separation above which the thumb counts as extended.
pub const THUMB_EXTENSION_TOLERANCE: f64 = 0.04;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

impl From<[f64; 3]> for Point3 {
    fn from(value: [f64; 3]) -> Self {
        Self {
            x: value[0],
            y: value[1],
            z: value[2],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Handedness {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedLandmark {
    Wrist,
    ThumbIp,
    ThumbTip,
    IndexPip,
    IndexTip,
    MiddlePip,
    MiddleTip,
    RingPip,
    RingTip,
    PinkyPip,
    PinkyTip,
}

impl NamedLandmark {
    /// Index into the standard 21-point hand layout.
    pub const fn index(self) -> usize {
        match self {
            NamedLandmark::Wrist => 0,
            NamedLandmark::ThumbIp => 3,
            NamedLandmark::ThumbTip => 4,
            NamedLandmark::IndexPip => 6,
            NamedLandmark::IndexTip => 8,
            NamedLandmark::MiddlePip => 10,
            NamedLandmark::MiddleTip => 12,
            NamedLandmark::RingPip => 14,
            NamedLandmark::RingTip => 16,
            NamedLandmark::PinkyPip => 18,
            NamedLandmark::PinkyTip => 20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    pub const ALL: [Finger; 5] = [
        Finger::Thumb,
        Finger::Index,
        Finger::Middle,
        Finger::Ring,
        Finger::Pinky,
    ];

    pub const fn tip(self) -> NamedLandmark {
        match self {
            Finger::Thumb => NamedLandmark::ThumbTip,
            Finger::Index => NamedLandmark::IndexTip,
            Finger::Middle => NamedLandmark::MiddleTip,
            Finger::Ring => NamedLandmark::RingTip,
            Finger::Pinky => NamedLandmark::PinkyTip,
        }
    }

    pub const fn joint(self) -> NamedLandmark {
        match self {
            Finger::Thumb => NamedLandmark::ThumbIp,
            Finger::Index => NamedLandmark::IndexPip,
            Finger::Middle => NamedLandmark::MiddlePip,
            Finger::Ring => NamedLandmark::RingPip,
            Finger::Pinky => NamedLandmark::PinkyPip,
        }
    }
}

/// One frame's worth of hand landmarks. Always holds exactly
/// [`LANDMARK_COUNT`] points; construction rejects anything else.
#[derive(Debug, Clone, PartialEq)]
pub struct HandSnapshot {
    points: [Point3; LANDMARK_COUNT],
    handedness: Option<Handedness>,
    confidence: Option<f64>,
}

impl HandSnapshot {
    pub fn new(points: [Point3; LANDMARK_COUNT]) -> Self {
        Self {
            points,
            handedness: None,
            confidence: None,
        }
    }

    /// Returns `None` when `points` is not exactly 21 entries long.
    pub fn from_slice(points: &[Point3]) -> Option<Self> {
        let points: [Point3; LANDMARK_COUNT] = points.try_into().ok()?;
        Some(Self::new(points))
    }

    pub fn with_handedness(mut self, handedness: Handedness) -> Self {
        self.handedness = Some(handedness);
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn point(&self, landmark: NamedLandmark) -> Point3 {
        self.points[landmark.index()]
    }

    pub fn points(&self) -> &[Point3; LANDMARK_COUNT] {
        &self.points
    }

    pub fn handedness(&self) -> Option<Handedness> {
        self.handedness
    }

    pub fn confidence(&self) -> Option<f64> {
        self.confidence
    }

    /// Euclidean distance between two named landmarks, z included.
    pub fn distance(&self, a: NamedLandmark, b: NamedLandmark) -> f64 {
        distance(self.point(a), self.point(b))
    }

    pub fn is_extended(&self, finger: Finger) -> bool {
        let tip = self.point(finger.tip());
        let joint = self.point(finger.joint());
        match finger {
            Finger::Thumb => is_thumb_extended(tip.x, joint.x),
            _ => is_finger_extended(tip.y, joint.y),
        }
    }

    pub fn extended_fingers(&self) -> [bool; 5] {
        Finger::ALL.map(|finger| self.is_extended(finger))
    }

    /// Thumb tip projected onto a `width` x `height` screen, clamped to the
    /// last pixel on each axis.
    pub fn thumb_screen_position(&self, width: i32, height: i32) -> (i32, i32) {
        project_to_screen(self.point(NamedLandmark::ThumbTip), width, height)
    }
}

pub fn distance(a: Point3, b: Point3) -> f64 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    let dz = a.z - b.z;
    (dx * dx + dy * dy + dz * dz).sqrt()
}

/// Image y grows downward, so a tip above its joint has the smaller y.
pub fn is_finger_extended(tip_y: f64, joint_y: f64) -> bool {
    tip_y < joint_y
}

pub fn is_thumb_extended(tip_x: f64, joint_x: f64) -> bool {
    (tip_x - joint_x).abs() > THUMB_EXTENSION_TOLERANCE
}

pub fn centroid(points: &[Point3]) -> Option<Point3> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let (x, y, z) = points.iter().fold((0.0, 0.0, 0.0), |(x, y, z), p| {
        (x + p.x, y + p.y, z + p.z)
    });
    Some(Point3::new(x / n, y / n, z / n))
}

pub fn project_to_screen(point: Point3, width: i32, height: i32) -> (i32, i32) {
    let max_x = (width - 1).max(0);
    let max_y = (height - 1).max(0);
    let x = (point.x * width as f64) as i32;
    let y = (point.y * height as f64) as i32;
    (x.clamp(0, max_x), y.clamp(0, max_y))
}
