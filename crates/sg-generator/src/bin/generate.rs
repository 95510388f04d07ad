//! CLI for generating and rendering a scene from a plain-language request.
//!
//! # Usage
//!
//! ```bash
//! # Generate and render at low quality, JSON events on stdout
//! cargo run -p sg-generator --bin sg-generate -- "A circle turning into a square."
//!
//! # Legacy marker output, explicit renderer
//! cargo run -p sg-generator --bin sg-generate -- --format markers --manim /usr/local/bin/manim "A bouncing ball"
//! ```
//!
//! Diagnostics go to stderr (`RUST_LOG` controls them); stdout carries only
//! caller events.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use sg_core::{Event, OutputFormat, Quality, Reporter};
use sg_generator::{GeminiClient, GeminiConfig, GeneratorConfig, SceneGenerator, DEFAULT_MODEL};
use sg_render::{RenderConfig, RenderInvoker};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Generates and renders a Manim animation from a text prompt.
#[derive(Debug, Parser)]
#[command(name = "sg-generate", version)]
struct Args {
    /// The animation you want to create.
    prompt: String,

    /// Gemini model name
    #[arg(long, default_value = DEFAULT_MODEL)]
    model: String,

    /// Directory holding the renderer's `venv`; media goes to its sibling
    /// `public/media` [default: the directory of this executable, media
    /// under the working directory]
    #[arg(long)]
    tool_dir: Option<PathBuf>,

    /// Renderer executable (overrides the one under --tool-dir)
    #[arg(long)]
    manim: Option<PathBuf>,

    /// Media directory (overrides the one derived from --tool-dir)
    #[arg(long)]
    media_dir: Option<PathBuf>,

    /// Directory the generated source is written to
    #[arg(long, default_value = ".")]
    work_dir: PathBuf,

    /// Quality preset: low, medium, high, production or fourk
    #[arg(short, long, default_value = "low")]
    quality: Quality,

    /// Event format on stdout: json or markers
    #[arg(long, default_value = "json")]
    format: OutputFormat,

    /// Kill the renderer after this many seconds
    #[arg(long)]
    render_timeout_secs: Option<u64>,

    /// Render without the local source check
    #[arg(long)]
    skip_check: bool,
}

impl Args {
    fn render_config(&self) -> RenderConfig {
        let mut config = match self.tool_dir {
            Some(ref tool_dir) => RenderConfig::for_tool_dir(tool_dir),
            None => RenderConfig::default(),
        };
        if let Some(ref manim) = self.manim {
            config.executable = manim.clone();
        }
        if let Some(ref media_dir) = self.media_dir {
            config.media_dir = media_dir.clone();
        }
        config.work_dir = self.work_dir.clone();
        config.quality = self.quality;
        config.timeout = self.render_timeout_secs.map(Duration::from_secs);
        config
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sg_generator=info,sg_render=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let mut reporter = Reporter::new(std::io::stdout(), args.format);

    let client = match GeminiConfig::from_env()
        .map(|config| config.with_model(args.model.clone()))
        .and_then(GeminiClient::new)
    {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(error = %e, "failed to create Gemini client");
            // Nothing more to report if stdout is gone.
            let _ = reporter.emit(&Event::failure(format!(
                "Error creating Gemini client: {}. \
                 Set GOOGLE_API_KEY in the environment or a .env file.",
                e
            )));
            return ExitCode::FAILURE;
        }
    };

    let render_config = args.render_config();
    tracing::info!(
        model = %args.model,
        executable = %render_config.executable.display(),
        media_dir = %render_config.media_dir.display(),
        quality = %render_config.quality,
        format = %args.format,
        "starting"
    );

    let generator = SceneGenerator::new(
        client,
        RenderInvoker::new(render_config),
        GeneratorConfig {
            check_source: !args.skip_check,
        },
    );

    match generator.run(&args.prompt, &mut reporter).await {
        Ok(result) => {
            tracing::info!("{}", result.format_summary().trim_end());
            if result.success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "generation failed");
            ExitCode::FAILURE
        }
    }
}
