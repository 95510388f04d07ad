//! Events reported to the calling process on stdout.
//!
//! Two wire formats carry the same events:
//!
//! | Format | Shape | Notes |
//! |--------|-------|-------|
//! | `json` | one JSON object per line, tagged by `"event"` | escaped, safe for any code |
//! | `markers` | literal `---CODE---` style tokens | legacy callers that pattern-match |
//!
//! In marker mode the code is written verbatim, so generated code that
//! contains a marker token can confuse the caller. JSON mode has no such gap.

use std::fmt;
use std::io::Write;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

const MARKER_CODE_START: &str = "---CODE---";
const MARKER_CODE_END: &str = "---ENDCODE---";

/// A single reportable event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    /// The generated source, exactly as written to disk
    Code { code: String },
    /// The timestamp naming this invocation's files
    Timestamp { timestamp: u64 },
    /// One line of renderer output
    Log { line: String },
    /// Progress message for humans
    Status { stage: Stage, message: String },
    /// The render finished with exit status 0
    Success,
    /// A stage failed; `exit_code` is set when the renderer exited non-zero
    Failure {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        exit_code: Option<i32>,
    },
    /// Path of the rendered video
    VideoPath { path: String },
}

/// Pipeline stage a status message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Waiting on the model
    Generating,
    /// Source written to disk
    Saved,
    /// Renderer starting
    Rendering,
}

impl Stage {
    /// Prefix used for the status line in marker format.
    pub fn glyph(&self) -> &'static str {
        match self {
            Stage::Generating => "🤖",
            Stage::Saved => "✅",
            Stage::Rendering => "🎬",
        }
    }
}

impl Event {
    pub fn status(stage: Stage, message: impl Into<String>) -> Self {
        Event::Status {
            stage,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Event::Failure {
            message: message.into(),
            exit_code: None,
        }
    }

    /// Parse one JSON-format line.
    pub fn parse_line(line: &str) -> Result<Self, EventError> {
        Ok(serde_json::from_str(line.trim_end())?)
    }

    /// Render in the legacy marker format, without a trailing newline.
    pub fn to_markers(&self) -> String {
        match self {
            Event::Code { code } => {
                format!("{}\n{}\n{}", MARKER_CODE_START, code, MARKER_CODE_END)
            }
            Event::Timestamp { timestamp } => {
                format!("---TIMESTAMP---{}---ENDTIMESTAMP---", timestamp)
            }
            Event::Log { line } => line.clone(),
            Event::Status { stage, message } => format!("{} {}", stage.glyph(), message),
            Event::Success => "🎉 Video rendered successfully!".to_string(),
            Event::Failure { message, .. } => format!("❌ {}", message),
            Event::VideoPath { path } => {
                format!("---VIDEO_PATH---{}---ENDVIDEO_PATH---", path)
            }
        }
    }
}

/// Wire format for events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// JSON lines
    #[default]
    Json,
    /// Legacy literal markers
    Markers,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Json => f.write_str("json"),
            OutputFormat::Markers => f.write_str("markers"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" | "jsonl" => Ok(OutputFormat::Json),
            "markers" | "legacy" => Ok(OutputFormat::Markers),
            other => Err(format!(
                "unknown output format '{}' (expected json or markers)",
                other
            )),
        }
    }
}

/// Event errors.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Writes events to the caller, flushing after each one.
pub struct Reporter<W: Write> {
    out: W,
    format: OutputFormat,
    emitted: u64,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W, format: OutputFormat) -> Self {
        Self {
            out,
            format,
            emitted: 0,
        }
    }

    /// Number of events written so far.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// Write one event and flush so the caller sees it immediately.
    pub fn emit(&mut self, event: &Event) -> Result<(), EventError> {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_writer(&mut self.out, event)?;
                self.out.write_all(b"\n")?;
            }
            OutputFormat::Markers => {
                writeln!(self.out, "{}", event.to_markers())?;
            }
        }
        self.out.flush()?;
        self.emitted += 1;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
