pub mod json_watch;
