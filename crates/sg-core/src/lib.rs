//! # sg-core
//!
//! Core types shared by the scene generator and the render invoker.
//!
//! - [`Timestamp`] and [`SceneNames`]: every name a single invocation uses is
//!   derived from one timestamp.
//! - [`Quality`]: render presets and the resolution folder they produce.
//! - [`Event`] and [`Reporter`]: the stdout protocol read by the calling server.

pub mod event;
pub mod scene;

pub use event::{Event, EventError, OutputFormat, Reporter, Stage};
pub use scene::{Quality, QualityParseError, SceneNames, Timestamp, MEDIA_DIR, SCENE_CLASS_NAME};
