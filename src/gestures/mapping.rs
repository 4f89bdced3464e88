use crate::gestures::landmarks::NamedLandmark;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

/// Finger pair whose tip distance forms a pinch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pinch {
    ThumbIndex,
    ThumbMiddle,
    ThumbRing,
    ThumbPinky,
}

impl Pinch {
    pub const fn landmarks(self) -> (NamedLandmark, NamedLandmark) {
        match self {
            Pinch::ThumbIndex => (NamedLandmark::ThumbTip, NamedLandmark::IndexTip),
            Pinch::ThumbMiddle => (NamedLandmark::ThumbTip, NamedLandmark::MiddleTip),
            Pinch::ThumbRing => (NamedLandmark::ThumbTip, NamedLandmark::RingTip),
            Pinch::ThumbPinky => (NamedLandmark::ThumbTip, NamedLandmark::PinkyTip),
        }
    }
}

/// User-facing motion code as stored in settings and the remote profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MotionCode {
    M1,
    M2,
    M3,
}

impl MotionCode {
    pub const fn pinch(self) -> Pinch {
        match self {
            MotionCode::M1 => Pinch::ThumbIndex,
            MotionCode::M2 => Pinch::ThumbMiddle,
            MotionCode::M3 => Pinch::ThumbPinky,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "M1" => Some(MotionCode::M1),
            "M2" => Some(MotionCode::M2),
            "M3" => Some(MotionCode::M3),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MotionAction {
    LeftClick,
    RightClick,
    Paste,
}

/// Complete action → motion table. Every action always resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotionMapping {
    pub left_click: MotionCode,
    pub right_click: MotionCode,
    pub paste: MotionCode,
}

impl Default for MotionMapping {
    fn default() -> Self {
        Self {
            left_click: MotionCode::M1,
            right_click: MotionCode::M2,
            paste: MotionCode::M3,
        }
    }
}

impl MotionMapping {
    pub fn resolve(&self, action: MotionAction) -> MotionCode {
        match action {
            MotionAction::LeftClick => self.left_click,
            MotionAction::RightClick => self.right_click,
            MotionAction::Paste => self.paste,
        }
    }

    pub fn pinch_for(&self, action: MotionAction) -> Pinch {
        self.resolve(action).pinch()
    }
}

/// Partially specified mapping, as read from settings or a host message.
/// Unset actions fall back to [`MotionMapping::default`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotionMappingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left_click: Option<MotionCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right_click: Option<MotionCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paste: Option<MotionCode>,
}

impl MotionMappingConfig {
    pub fn resolve(&self) -> MotionMapping {
        let defaults = MotionMapping::default();
        MotionMapping {
            left_click: self.left_click.unwrap_or(defaults.left_click),
            right_click: self.right_click.unwrap_or(defaults.right_click),
            paste: self.paste.unwrap_or(defaults.paste),
        }
    }

    /// Read the remote motion-settings payload. The wheel-scroll slot of that
    /// profile is what drives paste. Unknown codes are treated as unset.
    pub fn from_remote(value: &serde_json::Value) -> Self {
        let code = |key: &str| {
            value
                .get(key)
                .and_then(|v| v.as_str())
                .and_then(MotionCode::parse)
        };
        Self {
            left_click: code("motionLeftClick"),
            right_click: code("motionRightClick"),
            paste: code("motionWheelScroll"),
        }
    }
}

impl From<MotionMapping> for MotionMappingConfig {
    fn from(value: MotionMapping) -> Self {
        Self {
            left_click: Some(value.left_click),
            right_click: Some(value.right_click),
            paste: Some(value.paste),
        }
    }
}

/// Mapping shared between the frame loop and configuration reloads.
/// Updates replace the whole table; readers always copy out a complete one.
#[derive(Debug, Clone, Default)]
pub struct SharedMotionMapping {
    inner: Arc<RwLock<MotionMapping>>,
}

impl SharedMotionMapping {
    pub fn new(mapping: MotionMapping) -> Self {
        Self {
            inner: Arc::new(RwLock::new(mapping)),
        }
    }

    pub fn current(&self) -> MotionMapping {
        match self.inner.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    pub fn update(&self, mapping: MotionMapping) {
        match self.inner.write() {
            Ok(mut guard) => *guard = mapping,
            Err(poisoned) => *poisoned.into_inner() = mapping,
        }
        tracing::info!(?mapping, "motion mapping updated");
    }

    pub fn update_from(&self, config: &MotionMappingConfig) {
        self.update(config.resolve());
    }
}
