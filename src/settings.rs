use crate::gestures::dispatch::DispatchConfig;
use crate::gestures::engine::ClassifierConfig;
use crate::gestures::landmarks::Handedness;
use crate::gestures::mapping::{MotionMapping, MotionMappingConfig};
use crate::gestures::service::GestureServiceConfig;
use crate::gestures::telemetry::TelemetryConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Settings {
    /// When enabled the application initialises the logger at debug level
    /// and logs every classified frame.
    #[serde(default)]
    pub debug_logging: bool,
    /// Log destination. Logs go to stderr when unset; stdout carries
    /// telemetry and is never used for logs.
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    /// Only this hand drives gestures. `None` accepts either hand.
    #[serde(default)]
    pub preferred_hand: Option<Handedness>,
    /// How long the worker waits for a frame before checking for shutdown.
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,
    /// Reload the motion mapping when this file changes on disk.
    #[serde(default = "default_watch_settings")]
    pub watch_settings: bool,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub motion_mapping: MotionMappingConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

fn default_frame_interval_ms() -> u64 {
    33
}

fn default_watch_settings() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug_logging: false,
            log_file: None,
            preferred_hand: None,
            frame_interval_ms: default_frame_interval_ms(),
            watch_settings: default_watch_settings(),
            classifier: ClassifierConfig::default(),
            motion_mapping: MotionMappingConfig::default(),
            dispatch: DispatchConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl Settings {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    /// Like [`Settings::load`] but also rejects unusable values.
    pub fn load_validated(path: &str) -> anyhow::Result<Self> {
        let settings = Self::load(path)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn save(&self, path: &str) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.classifier.validate()?;
        if self.dispatch.scroll_units_per_speed < 0.0 {
            anyhow::bail!(
                "dispatch.scroll_units_per_speed must not be negative, got {}",
                self.dispatch.scroll_units_per_speed
            );
        }
        if let Some((width, height)) = self.dispatch.screen_size {
            if width <= 0 || height <= 0 {
                anyhow::bail!("dispatch.screen_size must be positive, got {width}x{height}");
            }
        }
        Ok(())
    }

    pub fn motion_mapping(&self) -> MotionMapping {
        self.motion_mapping.resolve()
    }

    pub fn service_config(&self) -> GestureServiceConfig {
        GestureServiceConfig {
            debug_logging: self.debug_logging,
            frame_interval_ms: self.frame_interval_ms,
            preferred_hand: self.preferred_hand,
            classifier: self.classifier,
            dispatch: DispatchConfig {
                telemetry: self.telemetry,
                ..self.dispatch.clone()
            },
        }
    }
}
