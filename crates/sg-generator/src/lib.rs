//! # sg-generator
//!
//! Generates an animation scene from a plain-language request and renders it.
//!
//! # Usage
//!
//! ```bash
//! # Render with the default (low) quality preset
//! GOOGLE_API_KEY=... cargo run -p sg-generator -- "A circle turning into a square."
//!
//! # Legacy marker output for callers that pattern-match stdout
//! cargo run -p sg-generator -- --format markers "A bouncing ball"
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Request   │ ──> │   Prompt    │ ──> │   Gemini    │
//! │    text     │     │   Builder   │     │     API     │
//! └─────────────┘     └─────────────┘     └──────┬──────┘
//!                                                │ strip fence
//!                     ┌──────────────────────────┘
//!                     ▼
//!              ┌─────────────┐     ┌─────────────┐
//!              │   Source    │ ──> │   Render    │ ──> events on stdout
//!              │    Check    │     │   Invoker   │
//!              └─────────────┘     └─────────────┘
//! ```

pub mod client;
pub mod generator;
pub mod prompt;

pub use client::{ClientError, GeminiClient, GeminiConfig, GenerationBackend, DEFAULT_MODEL};
pub use generator::{GeneratorConfig, GeneratorError, GeneratorResult, SceneGenerator};
pub use prompt::{strip_code_fence, PromptBuilder};
