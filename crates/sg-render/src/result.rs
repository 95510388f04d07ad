//! Render outcomes, states, and errors.

use std::path::PathBuf;
use std::time::Duration;

use sg_core::{EventError, SceneNames};

/// Render invocation states.
///
/// `Idle → FileWritten → ProcessRunning → {Succeeded | Failed | NotFound}`.
/// Every terminal state ends the invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderState {
    Idle,
    FileWritten,
    ProcessRunning,
    Succeeded,
    Failed,
    NotFound,
}

impl RenderState {
    /// Get the name of this state.
    pub fn name(&self) -> &'static str {
        match self {
            RenderState::Idle => "idle",
            RenderState::FileWritten => "file_written",
            RenderState::ProcessRunning => "process_running",
            RenderState::Succeeded => "succeeded",
            RenderState::Failed => "failed",
            RenderState::NotFound => "not_found",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RenderState::Succeeded | RenderState::Failed | RenderState::NotFound
        )
    }
}

/// Result of a render that got as far as running the renderer.
#[derive(Debug, Clone)]
pub struct RenderOutcome {
    /// Names derived from the invocation timestamp
    pub names: SceneNames,
    /// Where the source was written
    pub source_path: PathBuf,
    /// Terminal state: `Succeeded` or `Failed`
    pub state: RenderState,
    /// Renderer exit code; `None` if it was killed by a signal
    pub exit_code: Option<i32>,
    /// Reported video path, set only on success
    pub video_path: Option<PathBuf>,
    /// Renderer output lines forwarded to the caller
    pub lines_forwarded: u64,
    /// Time spent in the renderer
    pub duration: Duration,
}

impl RenderOutcome {
    pub fn succeeded(&self) -> bool {
        self.state == RenderState::Succeeded
    }

    /// Format as a one-line summary.
    pub fn format_summary(&self) -> String {
        match (&self.video_path, self.exit_code) {
            (Some(path), _) => format!(
                "[SUCCESS] {} rendered in {:.2}s -> {}",
                self.names.source_file_name(),
                self.duration.as_secs_f64(),
                path.display()
            ),
            (None, Some(code)) => format!(
                "[FAILED] {} exited with code {} after {:.2}s",
                self.names.source_file_name(),
                code,
                self.duration.as_secs_f64()
            ),
            (None, None) => format!(
                "[FAILED] {} terminated by signal after {:.2}s",
                self.names.source_file_name(),
                self.duration.as_secs_f64()
            ),
        }
    }
}

/// Render errors.
///
/// A renderer that runs and exits non-zero is not an error; it is a
/// [`RenderOutcome`] in the `Failed` state.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to write source to {path}: {source}")]
    WriteSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create media directory {path}: {source}")]
    MediaDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("renderer not found at {path}")]
    NotFound { path: PathBuf },

    #[error("failed to run renderer: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("renderer {0} pipe was not captured")]
    MissingPipe(&'static str),

    #[error("renderer timed out after {0:?}")]
    Timeout(Duration),

    #[error("failed to report event: {0}")]
    Report(#[from] EventError),
}
