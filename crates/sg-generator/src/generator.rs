//! Scene generator: prompt → model → check → render.
//!
//! One call handles one request. The timestamp is taken once and names
//! everything the call writes.

use std::io::Write;
use std::time::{Duration, Instant};

use sg_core::{Event, EventError, Reporter, Stage, Timestamp, SCENE_CLASS_NAME};
use sg_render::{check_source, RenderError, RenderInvoker, RenderOutcome, SourceError};

use crate::client::{ClientError, GenerationBackend};
use crate::prompt::{strip_code_fence, PromptBuilder};

/// Generator configuration.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Run the source check before rendering
    pub check_source: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self { check_source: true }
    }
}

/// Result from one generate-and-render call.
#[derive(Debug, Clone)]
pub struct GeneratorResult {
    /// The cleaned source that was rendered
    pub code: String,
    /// What the renderer did
    pub outcome: RenderOutcome,
    /// Time spent waiting on the model
    pub generation_duration: Duration,
    /// Total duration
    pub duration: Duration,
}

impl GeneratorResult {
    pub fn success(&self) -> bool {
        self.outcome.succeeded()
    }

    /// Format as a summary string.
    pub fn format_summary(&self) -> String {
        format!(
            "{}\n  Generation: {:.2}s, {} lines of code\n  Total: {:.2}s\n",
            self.outcome.format_summary(),
            self.generation_duration.as_secs_f64(),
            self.code.lines().count(),
            self.duration.as_secs_f64(),
        )
    }
}

/// Generates a scene from a request and renders it.
pub struct SceneGenerator<B> {
    backend: B,
    invoker: RenderInvoker,
    config: GeneratorConfig,
}

impl<B: GenerationBackend> SceneGenerator<B> {
    pub fn new(backend: B, invoker: RenderInvoker, config: GeneratorConfig) -> Self {
        Self {
            backend,
            invoker,
            config,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Ask the model for scene code and strip its fence.
    pub async fn generate_code(&self, request: &str) -> Result<String, ClientError> {
        let prompt = PromptBuilder::build(request);
        let response = self.backend.generate(&prompt).await?;
        Ok(strip_code_fence(&response))
    }

    /// Generate and render, timestamped now.
    pub async fn run<W: Write>(
        &self,
        request: &str,
        reporter: &mut Reporter<W>,
    ) -> Result<GeneratorResult, GeneratorError> {
        self.run_at(request, Timestamp::now(), reporter).await
    }

    /// Generate and render with a fixed timestamp.
    ///
    /// Every failure is reported to the caller as a `Failure` event before
    /// it is returned.
    pub async fn run_at<W: Write>(
        &self,
        request: &str,
        timestamp: Timestamp,
        reporter: &mut Reporter<W>,
    ) -> Result<GeneratorResult, GeneratorError> {
        let start = Instant::now();
        if request.trim().is_empty() {
            reporter.emit(&Event::failure("Prompt is required."))?;
            return Err(GeneratorError::EmptyRequest);
        }

        reporter.emit(&Event::status(
            Stage::Generating,
            format!("Calling {} API to generate Manim code...", self.backend.name()),
        ))?;
        tracing::info!(
            backend = self.backend.name(),
            request_len = request.len(),
            "generating scene"
        );

        let code = match self.generate_code(request).await {
            Ok(code) => code,
            Err(e) => {
                tracing::error!(error = %e, "generation failed");
                reporter.emit(&Event::failure(format!(
                    "Error calling {} API: {}",
                    self.backend.name(),
                    e
                )))?;
                return Err(GeneratorError::Client(e));
            }
        };
        let generation_duration = start.elapsed();
        tracing::info!(
            lines = code.lines().count(),
            duration_ms = generation_duration.as_millis() as u64,
            "scene code generated"
        );

        if self.config.check_source {
            if let Err(e) = check_source(&code, SCENE_CLASS_NAME) {
                tracing::error!(error = %e, "generated source rejected");
                reporter.emit(&Event::failure(format!(
                    "Generated code failed sanity check: {}",
                    e
                )))?;
                return Err(GeneratorError::InvalidSource(e));
            }
        }

        let outcome = match self.invoker.render(&code, timestamp, reporter).await {
            Ok(outcome) => outcome,
            // Already reported by the invoker.
            Err(
                e @ (RenderError::NotFound { .. }
                | RenderError::Timeout(_)
                | RenderError::Report(_)),
            ) => {
                return Err(GeneratorError::Render(e));
            }
            Err(e) => {
                tracing::error!(error = %e, "render failed unexpectedly");
                reporter.emit(&Event::failure(format!(
                    "An unexpected error occurred during rendering: {}",
                    e
                )))?;
                return Err(GeneratorError::Render(e));
            }
        };

        Ok(GeneratorResult {
            code,
            outcome,
            generation_duration,
            duration: start.elapsed(),
        })
    }
}

/// Generator errors.
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    #[error("request is empty")]
    EmptyRequest,

    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    #[error("Invalid generated source: {0}")]
    InvalidSource(#[from] SourceError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Report error: {0}")]
    Report(#[from] EventError),
}
