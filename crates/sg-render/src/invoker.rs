//! Renderer invocation.
//!
//! Writes the generated source to disk, reports it to the caller, and runs
//! the renderer as a foreground child, forwarding its output as it arrives.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use sg_core::{Event, Quality, Reporter, SceneNames, Stage, Timestamp, MEDIA_DIR};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};

use crate::result::{RenderError, RenderOutcome, RenderState};

/// Renderer location and output settings.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Renderer executable
    pub executable: PathBuf,
    /// Directory the renderer writes media under
    pub media_dir: PathBuf,
    /// Directory the generated source is written to
    pub work_dir: PathBuf,
    /// Quality preset
    pub quality: Quality,
    /// Kill the renderer after this long (None = wait forever)
    pub timeout: Option<Duration>,
}

/// Directory holding the running executable, or `.` if it cannot be found.
pub fn installed_tool_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

impl Default for RenderConfig {
    /// Renderer from the `venv` next to the running executable; source and
    /// media under the working directory, so reported video paths resolve
    /// from it.
    fn default() -> Self {
        let work_dir = PathBuf::from(".");
        Self {
            executable: manim_in(&installed_tool_dir()),
            media_dir: work_dir.join(MEDIA_DIR),
            work_dir,
            quality: Quality::Low,
            timeout: None,
        }
    }
}

fn manim_in(tool_dir: &Path) -> PathBuf {
    tool_dir.join("venv").join("bin").join("manim")
}

impl RenderConfig {
    /// Layout rooted at a tool directory that sits directly under the
    /// working directory: the renderer lives in its `venv/bin`, media goes to
    /// the sibling `public/media`.
    pub fn for_tool_dir(tool_dir: impl AsRef<Path>) -> Self {
        let tool_dir = tool_dir.as_ref();
        Self {
            executable: manim_in(tool_dir),
            media_dir: tool_dir.join("..").join(MEDIA_DIR),
            ..Self::default()
        }
    }

    /// Arguments passed to the renderer for one scene.
    pub fn render_args(&self, source_path: &Path, class_name: &str) -> Vec<String> {
        vec![
            self.quality.flag().to_string(),
            "--media_dir".to_string(),
            self.media_dir.display().to_string(),
            source_path.display().to_string(),
            class_name.to_string(),
        ]
    }
}

/// Drives one render per call.
pub struct RenderInvoker {
    config: RenderConfig,
}

impl RenderInvoker {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    /// Write `code`, report it, and render it.
    ///
    /// Emits `Code` and `Timestamp` before the renderer starts, a `Log` per
    /// output line, then either `Success` + `VideoPath` or `Failure`.
    pub async fn render<W: Write>(
        &self,
        code: &str,
        timestamp: Timestamp,
        reporter: &mut Reporter<W>,
    ) -> Result<RenderOutcome, RenderError> {
        let names = SceneNames::new(timestamp, self.config.quality);
        let mut state = RenderState::Idle;
        tracing::debug!(state = state.name(), timestamp = %timestamp, "render requested");

        let source_path = self.config.work_dir.join(names.source_file_name());
        tokio::fs::write(&source_path, code)
            .await
            .map_err(|source| RenderError::WriteSource {
                path: source_path.clone(),
                source,
            })?;
        state = RenderState::FileWritten;
        tracing::info!(state = state.name(), path = %source_path.display(), "scene source written");

        reporter.emit(&Event::Code {
            code: code.to_string(),
        })?;
        reporter.emit(&Event::Timestamp {
            timestamp: timestamp.as_secs(),
        })?;
        reporter.emit(&Event::status(
            Stage::Saved,
            format!("Manim code saved to {}", source_path.display()),
        ))?;

        if tokio::fs::metadata(&self.config.executable).await.is_err() {
            return Err(self.not_found(reporter)?);
        }

        tokio::fs::create_dir_all(&self.config.media_dir)
            .await
            .map_err(|source| RenderError::MediaDir {
                path: self.config.media_dir.clone(),
                source,
            })?;

        reporter.emit(&Event::status(Stage::Rendering, "Starting Manim render..."))?;

        let args = self.config.render_args(&source_path, names.class_name());
        let start = Instant::now();
        let mut child = match Command::new(&self.config.executable)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(self.not_found(reporter)?);
            }
            Err(e) => return Err(RenderError::Spawn(e)),
        };
        state = RenderState::ProcessRunning;
        tracing::info!(
            state = state.name(),
            executable = %self.config.executable.display(),
            class = names.class_name(),
            timestamped_class = %names.timestamped_class_name(),
            args = ?args,
            "renderer started"
        );

        let streamed = match self.config.timeout {
            Some(limit) => {
                let waited =
                    tokio::time::timeout(limit, forward_output(&mut child, reporter)).await;
                match waited {
                    Ok(streamed) => streamed,
                    Err(_) => {
                        if let Err(e) = child.kill().await {
                            tracing::warn!(error = %e, "failed to kill timed-out renderer");
                        }
                        reporter.emit(&Event::failure(format!(
                            "Manim rendering timed out after {:?}.",
                            limit
                        )))?;
                        return Err(RenderError::Timeout(limit));
                    }
                }
            }
            None => forward_output(&mut child, reporter).await,
        };
        let (status, lines_forwarded) = streamed?;
        let duration = start.elapsed();

        if status.success() {
            state = RenderState::Succeeded;
            let video_path = names.video_path();
            let rendered = names.rendered_video_path(&self.config.media_dir);
            if tokio::fs::metadata(&rendered).await.is_err() {
                tracing::warn!(
                    expected = %rendered.display(),
                    "renderer exited 0 but video was not found"
                );
            }

            reporter.emit(&Event::Success)?;
            reporter.emit(&Event::VideoPath {
                path: video_path.display().to_string(),
            })?;
            tracing::info!(
                state = state.name(),
                video = %video_path.display(),
                duration_ms = duration.as_millis() as u64,
                "render finished"
            );

            Ok(RenderOutcome {
                names,
                source_path,
                state,
                exit_code: status.code(),
                video_path: Some(video_path),
                lines_forwarded,
                duration,
            })
        } else {
            state = RenderState::Failed;
            let message = match status.code() {
                Some(code) => format!("Manim rendering failed with exit code {}.", code),
                None => "Manim rendering was terminated by a signal.".to_string(),
            };
            reporter.emit(&Event::Failure {
                message,
                exit_code: status.code(),
            })?;
            tracing::error!(state = state.name(), exit_code = ?status.code(), "render failed");

            Ok(RenderOutcome {
                names,
                source_path,
                state,
                exit_code: status.code(),
                video_path: None,
                lines_forwarded,
                duration,
            })
        }
    }

    fn not_found<W: Write>(&self, reporter: &mut Reporter<W>) -> Result<RenderError, RenderError> {
        tracing::error!(
            state = RenderState::NotFound.name(),
            executable = %self.config.executable.display(),
            "renderer not found"
        );
        reporter.emit(&Event::failure(format!(
            "Error: 'manim' command not found at {}. Is Manim installed correctly in your environment?",
            self.config.executable.display()
        )))?;
        Ok(RenderError::NotFound {
            path: self.config.executable.clone(),
        })
    }
}

/// Forward stdout and stderr lines in arrival order until both close, then
/// wait for the child to exit.
///
/// Lines are decoded lossily so that non-UTF-8 output never stalls the pipe.
async fn forward_output<W: Write>(
    child: &mut Child,
    reporter: &mut Reporter<W>,
) -> Result<(ExitStatus, u64), RenderError> {
    let stdout = child.stdout.take().ok_or(RenderError::MissingPipe("stdout"))?;
    let stderr = child.stderr.take().ok_or(RenderError::MissingPipe("stderr"))?;
    let mut out_lines = BufReader::new(stdout).split(b'\n');
    let mut err_lines = BufReader::new(stderr).split(b'\n');
    let mut out_open = true;
    let mut err_open = true;
    let mut forwarded = 0u64;

    while out_open || err_open {
        let (from_stdout, segment) = tokio::select! {
            segment = out_lines.next_segment(), if out_open => (true, segment),
            segment = err_lines.next_segment(), if err_open => (false, segment),
        };

        match segment {
            Ok(Some(bytes)) => {
                let line = String::from_utf8_lossy(&bytes);
                reporter.emit(&Event::Log {
                    line: line.trim_end().to_string(),
                })?;
                forwarded += 1;
            }
            Ok(None) | Err(_) => {
                if let Err(e) = segment {
                    tracing::warn!(
                        error = %e,
                        stdout = from_stdout,
                        "renderer output stream failed"
                    );
                }
                if from_stdout {
                    out_open = false;
                } else {
                    err_open = false;
                }
            }
        }
    }

    let status = child.wait().await.map_err(RenderError::Spawn)?;
    Ok((status, forwarded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sg_core::OutputFormat;

    fn events(reporter: Reporter<Vec<u8>>) -> Vec<Event> {
        String::from_utf8(reporter.into_inner())
            .unwrap()
            .lines()
            .map(|l| Event::parse_line(l).unwrap())
            .collect()
    }

    fn config_in(dir: &Path, executable: PathBuf) -> RenderConfig {
        RenderConfig {
            executable,
            media_dir: dir.join("public").join("media"),
            work_dir: dir.to_path_buf(),
            quality: Quality::Low,
            timeout: None,
        }
    }

    #[cfg(unix)]
    fn stub_renderer(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("manim-stub");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn test_tool_dir_layout() {
        let config = RenderConfig::for_tool_dir("/opt/tool");
        assert_eq!(config.executable, PathBuf::from("/opt/tool/venv/bin/manim"));
        assert_eq!(config.media_dir, PathBuf::from("/opt/tool/../public/media"));
        assert_eq!(config.quality, Quality::Low);
        assert!(config.timeout.is_none());
    }

    #[test]
    fn test_default_media_dir_matches_reported_video_path() {
        let config = RenderConfig::default();
        let names = SceneNames::new(Timestamp::from_secs(42), config.quality);

        // Reported paths are relative to the working directory, and so is
        // the media dir the renderer is told to use.
        let reported = config.work_dir.join(names.video_path());
        assert!(reported.starts_with(&config.media_dir));
        assert_eq!(config.media_dir, PathBuf::from("./public/media"));
    }

    #[test]
    fn test_default_renderer_sits_beside_executable() {
        let config = RenderConfig::default();
        let exe_dir = std::env::current_exe().unwrap().parent().unwrap().to_path_buf();
        assert_eq!(installed_tool_dir(), exe_dir);
        assert_eq!(config.executable, exe_dir.join("venv").join("bin").join("manim"));
    }

    #[test]
    fn test_tool_dir_under_work_dir_matches_reported_video_path() {
        let root = Path::new("/srv/frontend");
        let config = RenderConfig::for_tool_dir(root.join("tool"));
        let names = SceneNames::new(Timestamp::from_secs(42), Quality::Low);

        let media = config.media_dir.strip_prefix(root.join("tool").join("..")).unwrap();
        assert!(names.video_path().starts_with(media));
    }

    #[test]
    fn test_render_args_order() {
        let config = RenderConfig {
            media_dir: PathBuf::from("media"),
            ..RenderConfig::default()
        };
        let args = config.render_args(Path::new("generated_scene_1.py"), "GeneratedScene");
        assert_eq!(
            args,
            vec!["-ql", "--media_dir", "media", "generated_scene_1.py", "GeneratedScene"]
        );
    }

    #[tokio::test]
    async fn test_missing_renderer_spawns_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let invoker = RenderInvoker::new(config_in(dir.path(), dir.path().join("no-such-manim")));
        let mut reporter = Reporter::new(Vec::new(), OutputFormat::Json);

        let err = invoker
            .render("from manim import *", Timestamp::from_secs(100), &mut reporter)
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::NotFound { .. }));

        // Source is still written; media dir is never created.
        assert!(dir.path().join("generated_scene_100.py").exists());
        assert!(!dir.path().join("public").exists());

        let events = events(reporter);
        assert_eq!(events[0], Event::Code { code: "from manim import *".to_string() });
        assert_eq!(events[1], Event::Timestamp { timestamp: 100 });
        match events.last().unwrap() {
            Event::Failure { message, exit_code } => {
                assert!(message.contains("not found"));
                assert!(exit_code.is_none());
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert!(!events.iter().any(|e| matches!(e, Event::Success | Event::VideoPath { .. })));
    }

    #[tokio::test]
    async fn test_write_failure_is_reported_as_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(dir.path(), dir.path().join("manim"));
        config.work_dir = dir.path().join("missing").join("dir");
        let invoker = RenderInvoker::new(config);
        let mut reporter = Reporter::new(Vec::new(), OutputFormat::Json);

        let err = invoker
            .render("x", Timestamp::from_secs(1), &mut reporter)
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::WriteSource { .. }));
        assert_eq!(reporter.emitted(), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_successful_render_streams_output() {
        let dir = tempfile::tempdir().unwrap();
        let exe = stub_renderer(
            dir.path(),
            "printf '%s\\n' \"$@\" > \"$(dirname \"$0\")/args.txt\"\necho 'rendering frames'\necho 'warning: slow' 1>&2\nexit 0",
        );
        let invoker = RenderInvoker::new(config_in(dir.path(), exe));
        let mut reporter = Reporter::new(Vec::new(), OutputFormat::Json);

        let outcome = invoker
            .render("from manim import *", Timestamp::from_secs(1756347083), &mut reporter)
            .await
            .unwrap();

        assert!(outcome.succeeded());
        assert_eq!(outcome.exit_code, Some(0));
        assert_eq!(outcome.lines_forwarded, 2);
        assert_eq!(
            outcome.video_path,
            Some(PathBuf::from(
                "public/media/generated_scene_1756347083/480p15/GeneratedScene.mp4"
            ))
        );
        assert!(dir.path().join("public").join("media").is_dir());

        let args = std::fs::read_to_string(dir.path().join("args.txt")).unwrap();
        let args: Vec<&str> = args.lines().collect();
        assert_eq!(args[0], "-ql");
        assert_eq!(args[1], "--media_dir");
        assert!(args[3].ends_with("generated_scene_1756347083.py"));
        assert_eq!(args[4], "GeneratedScene");

        let events = events(reporter);
        let logs: Vec<&str> = events
            .iter()
            .filter_map(|e| match e {
                Event::Log { line } => Some(line.as_str()),
                _ => None,
            })
            .collect();
        assert!(logs.contains(&"rendering frames"));
        assert!(logs.contains(&"warning: slow"));

        let n = events.len();
        assert_eq!(events[n - 2], Event::Success);
        assert_eq!(
            events[n - 1],
            Event::VideoPath {
                path: "public/media/generated_scene_1756347083/480p15/GeneratedScene.mp4"
                    .to_string()
            }
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_failed_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let exe = stub_renderer(dir.path(), "echo 'NameError: Circle' 1>&2\nexit 3");
        let invoker = RenderInvoker::new(config_in(dir.path(), exe));
        let mut reporter = Reporter::new(Vec::new(), OutputFormat::Json);

        let outcome = invoker
            .render("from manim import *", Timestamp::from_secs(5), &mut reporter)
            .await
            .unwrap();

        assert_eq!(outcome.state, RenderState::Failed);
        assert_eq!(outcome.exit_code, Some(3));
        assert!(outcome.video_path.is_none());

        let events = events(reporter);
        assert!(events.contains(&Event::Log { line: "NameError: Circle".to_string() }));
        assert!(matches!(
            events.last(),
            Some(Event::Failure { exit_code: Some(3), .. })
        ));
        assert!(!events.iter().any(|e| matches!(e, Event::Success | Event::VideoPath { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_renderer() {
        let dir = tempfile::tempdir().unwrap();
        let exe = stub_renderer(dir.path(), "exec sleep 5");
        let mut config = config_in(dir.path(), exe);
        config.timeout = Some(Duration::from_millis(200));
        let invoker = RenderInvoker::new(config);
        let mut reporter = Reporter::new(Vec::new(), OutputFormat::Json);

        let started = Instant::now();
        let err = invoker
            .render("from manim import *", Timestamp::from_secs(6), &mut reporter)
            .await
            .unwrap_err();

        assert!(matches!(err, RenderError::Timeout(_)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_marker_format_output() {
        let dir = tempfile::tempdir().unwrap();
        let exe = stub_renderer(dir.path(), "echo done\nexit 0");
        let invoker = RenderInvoker::new(config_in(dir.path(), exe));
        let mut reporter = Reporter::new(Vec::new(), OutputFormat::Markers);

        invoker
            .render("from manim import *", Timestamp::from_secs(77), &mut reporter)
            .await
            .unwrap();

        let out = String::from_utf8(reporter.into_inner()).unwrap();
        assert!(out.starts_with(
            "---CODE---\nfrom manim import *\n---ENDCODE---\n---TIMESTAMP---77---ENDTIMESTAMP---\n"
        ));
        assert!(out.contains("\n✅ Manim code saved to "));
        assert!(out.contains("\n🎬 Starting Manim render...\n"));
        assert!(out.contains("\ndone\n"));
        assert!(out.ends_with(
            "---VIDEO_PATH---public/media/generated_scene_77/480p15/GeneratedScene.mp4---ENDVIDEO_PATH---\n"
        ));
    }
}
