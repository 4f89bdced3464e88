#![allow(dead_code)]

use pinch_control::gestures::landmarks::{HandSnapshot, NamedLandmark, Point3, LANDMARK_COUNT};
use pinch_control::gestures::mapping::Pinch;
use pinch_control::gestures::service::HandFrame;

/// Hand fixture: an open hand with every fingertip well apart, plus
/// helpers to bring tips together.
#[derive(Debug, Clone)]
pub struct Hand {
    points: [Point3; LANDMARK_COUNT],
}

impl Hand {
    pub fn open() -> Self {
        let mut points = [Point3::new(0.5, 0.7, 0.0); LANDMARK_COUNT];
        points[NamedLandmark::ThumbTip.index()] = Point3::new(0.30, 0.50, 0.0);
        points[NamedLandmark::IndexTip.index()] = Point3::new(0.40, 0.30, 0.0);
        points[NamedLandmark::MiddleTip.index()] = Point3::new(0.50, 0.28, 0.0);
        points[NamedLandmark::RingTip.index()] = Point3::new(0.60, 0.30, 0.0);
        points[NamedLandmark::PinkyTip.index()] = Point3::new(0.70, 0.35, 0.0);
        Self { points }
    }

    pub fn at(mut self, landmark: NamedLandmark, x: f64, y: f64) -> Self {
        self.points[landmark.index()] = Point3::new(x, y, 0.0);
        self
    }

    pub fn thumb(&self) -> Point3 {
        self.points[NamedLandmark::ThumbTip.index()]
    }

    /// Moves the partner fingertip next to the thumb tip. Each finger lands
    /// on a different side so two pinches never form a scroll pose unless
    /// both index and middle are involved.
    pub fn pinch(self, pinch: Pinch) -> Self {
        let thumb = self.thumb();
        let (_, partner) = pinch.landmarks();
        let (dx, dy) = match pinch {
            Pinch::ThumbIndex => (0.01, 0.0),
            Pinch::ThumbMiddle => (0.0, 0.01),
            Pinch::ThumbRing => (-0.01, 0.0),
            Pinch::ThumbPinky => (0.0, -0.01),
        };
        self.at(partner, thumb.x + dx, thumb.y + dy)
    }

    /// Thumb, index and middle tips side by side at height `y`.
    pub fn three_finger(self, y: f64) -> Self {
        self.at(NamedLandmark::ThumbTip, 0.50, y)
            .at(NamedLandmark::IndexTip, 0.52, y)
            .at(NamedLandmark::MiddleTip, 0.54, y)
    }

    pub fn snapshot(&self) -> HandSnapshot {
        HandSnapshot::new(self.points)
    }

    pub fn points(&self) -> Vec<Point3> {
        self.points.to_vec()
    }

    pub fn frame(&self) -> HandFrame {
        HandFrame::new(&self.points)
    }
}
