//! # sg-render
//!
//! Turns generated scene source into a video.
//!
//! | Stage | Module | Fails with |
//! |-------|--------|------------|
//! | sanity check | [`check`] | [`SourceError`] |
//! | write source | [`invoker`] | [`RenderError::WriteSource`] |
//! | locate renderer | [`invoker`] | [`RenderError::NotFound`] |
//! | run renderer | [`invoker`] | non-zero exit in [`RenderOutcome`] |
//!
//! The renderer is an external process. Its output is forwarded line by line
//! as [`sg_core::Event::Log`] events while it runs.

pub mod check;
pub mod invoker;
pub mod result;

pub use check::{check_source, SourceError};
pub use invoker::{installed_tool_dir, RenderConfig, RenderInvoker};
pub use result::{RenderError, RenderOutcome, RenderState};
