pub mod dispatch;
pub mod engine;
pub mod landmarks;
pub mod mapping;
pub mod scroll;
pub mod service;
pub mod telemetry;

pub use dispatch::{
    Backends, ClipboardBackend, DispatchConfig, EventDispatcher, InputBackend, Key,
    MouseButton, RecordingSink,
};
pub use engine::{
    Classification, ClassifierConfig, GestureClassifier, GestureError, GestureEvent,
    GestureKind, GestureState, Phase,
};
pub use landmarks::{HandSnapshot, Handedness, NamedLandmark, Point3, LANDMARK_COUNT};
pub use mapping::{MotionCode, MotionMapping, MotionMappingConfig, SharedMotionMapping};
pub use service::{
    GestureService, GestureServiceConfig, HandFrame, LandmarkSource, LineLandmarkSource,
    MockLandmarkSource, TrackerInput,
};
pub use telemetry::{JsonLinesSink, TelemetryConfig, TelemetryMessage, TelemetrySink};
