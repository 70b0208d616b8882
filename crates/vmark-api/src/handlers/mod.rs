//! HTTP handlers.

pub mod health;
pub mod pages;
pub mod runs;
pub mod videos;

pub use health::{health, ready};
pub use pages::index;
pub use runs::{create_run, get_run, list_classes};
pub use videos::stream_video;
