use pinch_control::common::json_watch::{watch_json, JsonWatcher};
use pinch_control::gestures::dispatch::{Backends, LoggingRecordingSink};
use pinch_control::gestures::mapping::SharedMotionMapping;
use pinch_control::gestures::service::{GestureService, LineLandmarkSource};
use pinch_control::gestures::telemetry::{JsonLinesSink, TelemetryMessage, TelemetrySink};
use pinch_control::logging;
use pinch_control::platform::{ArboardClipboard, SystemInput};
use pinch_control::settings::{Settings, SETTINGS_FILE};
use std::sync::Arc;

fn main() -> anyhow::Result<()> {
    let settings_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| SETTINGS_FILE.to_string());
    let settings = Settings::load_validated(&settings_path)?;
    logging::init(settings.debug_logging, settings.log_file.clone());
    tracing::info!(path = %settings_path, "settings loaded");

    let telemetry: Arc<dyn TelemetrySink> = Arc::new(JsonLinesSink::stdout());
    let mapping = SharedMotionMapping::new(settings.motion_mapping());
    let backends = Backends {
        input: Arc::new(SystemInput),
        clipboard: Arc::new(ArboardClipboard),
        recording: Arc::new(LoggingRecordingSink),
        telemetry: Arc::clone(&telemetry),
    };

    let _watcher = if settings.watch_settings {
        Some(watch_settings(&settings_path, mapping.clone(), telemetry)?)
    } else {
        None
    };

    let mut service = GestureService::new(
        settings.service_config(),
        mapping,
        Box::new(LineLandmarkSource::stdin()),
        backends,
    );
    service.start()?;
    service.wait();
    tracing::info!("landmark input finished; exiting");
    Ok(())
}

fn watch_settings(
    path: &str,
    mapping: SharedMotionMapping,
    telemetry: Arc<dyn TelemetrySink>,
) -> anyhow::Result<JsonWatcher> {
    let reload_path = path.to_string();
    let watcher = watch_json(path, move || match Settings::load_validated(&reload_path) {
        Ok(settings) => {
            mapping.update(settings.motion_mapping());
            telemetry.send(&TelemetryMessage::status("settings reloaded"));
        }
        Err(err) => tracing::warn!(?err, "settings reload failed; keeping previous mapping"),
    })?;
    Ok(watcher)
}
