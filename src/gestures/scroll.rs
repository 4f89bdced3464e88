use crate::gestures::landmarks::Point3;

pub const DEFAULT_SCROLL_SENSITIVITY: f64 = 30.0;
pub const DEFAULT_SCROLL_DEAD_ZONE: f64 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScrollStep {
    Start,
    Hold,
    Delta(f64),
}

/// Tracks the three-finger pinch anchor and turns vertical displacement
/// into a signed speed. Downward hand motion gives a positive speed.
#[derive(Debug, Clone)]
pub struct ScrollTracker {
    sensitivity: f64,
    dead_zone: f64,
    anchor: Option<Point3>,
}

impl ScrollTracker {
    pub fn new(sensitivity: f64, dead_zone: f64) -> Self {
        Self {
            sensitivity,
            dead_zone,
            anchor: None,
        }
    }

    pub fn update(&mut self, position: Point3) -> ScrollStep {
        let anchor = match self.anchor {
            Some(anchor) => anchor,
            None => {
                self.anchor = Some(position);
                return ScrollStep::Start;
            }
        };

        let speed = (position.y - anchor.y) * self.sensitivity;
        if speed.abs() > self.dead_zone {
            ScrollStep::Delta(speed)
        } else {
            ScrollStep::Hold
        }
    }

    pub fn reset(&mut self) {
        self.anchor = None;
    }

    pub fn is_active(&self) -> bool {
        self.anchor.is_some()
    }

    pub fn anchor(&self) -> Option<Point3> {
        self.anchor
    }
}

impl Default for ScrollTracker {
    fn default() -> Self {
        Self::new(DEFAULT_SCROLL_SENSITIVITY, DEFAULT_SCROLL_DEAD_ZONE)
    }
}
