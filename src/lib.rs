pub mod common;
pub mod gestures;
pub mod logging;
pub mod platform;
pub mod settings;
