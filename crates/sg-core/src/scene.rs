//! Scene naming derived from a single timestamp.
//!
//! The source file, the timestamped construct name, and the reported video
//! path are all pure functions of the timestamp and the quality preset.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

/// Scene class name the prompt template asks the model to declare.
pub const SCENE_CLASS_NAME: &str = "GeneratedScene";

/// Media directory, relative to the caller's working directory. Reported
/// video paths start with it.
pub const MEDIA_DIR: &str = "public/media";

/// Seconds since the Unix epoch, taken once per invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Current wall-clock time, truncated to whole seconds.
    ///
    /// A clock set before the epoch yields 0.
    #[must_use]
    pub fn now() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self(secs)
    }

    #[must_use]
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    #[must_use]
    pub const fn as_secs(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Render quality presets understood by the renderer.
///
/// Ordered from fastest to slowest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Quality {
    /// 854x480 at 15 fps
    #[default]
    Low,
    /// 1280x720 at 30 fps
    Medium,
    /// 1920x1080 at 60 fps
    High,
    /// 2560x1440 at 60 fps
    Production,
    /// 3840x2160 at 60 fps
    FourK,
}

impl Quality {
    /// Command-line flag selecting this preset.
    pub fn flag(&self) -> &'static str {
        match self {
            Quality::Low => "-ql",
            Quality::Medium => "-qm",
            Quality::High => "-qh",
            Quality::Production => "-qp",
            Quality::FourK => "-qk",
        }
    }

    /// Folder the renderer nests its output under for this preset.
    pub fn folder(&self) -> &'static str {
        match self {
            Quality::Low => "480p15",
            Quality::Medium => "720p30",
            Quality::High => "1080p60",
            Quality::Production => "1440p60",
            Quality::FourK => "2160p60",
        }
    }

    /// Get the name of this preset.
    pub fn name(&self) -> &'static str {
        match self {
            Quality::Low => "low",
            Quality::Medium => "medium",
            Quality::High => "high",
            Quality::Production => "production",
            Quality::FourK => "fourk",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown quality preset '{0}' (expected low, medium, high, production or fourk)")]
pub struct QualityParseError(pub String);

impl FromStr for Quality {
    type Err = QualityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" | "l" | "480p15" => Ok(Quality::Low),
            "medium" | "m" | "720p30" => Ok(Quality::Medium),
            "high" | "h" | "1080p60" => Ok(Quality::High),
            "production" | "p" | "1440p60" => Ok(Quality::Production),
            "fourk" | "4k" | "k" | "2160p60" => Ok(Quality::FourK),
            other => Err(QualityParseError(other.to_string())),
        }
    }
}

/// Every name one invocation uses, derived from its timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneNames {
    timestamp: Timestamp,
    quality: Quality,
}

impl SceneNames {
    #[must_use]
    pub fn new(timestamp: Timestamp, quality: Quality) -> Self {
        Self { timestamp, quality }
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn quality(&self) -> Quality {
        self.quality
    }

    /// Module name of the written source, without extension.
    pub fn module_name(&self) -> String {
        format!("generated_scene_{}", self.timestamp)
    }

    /// File name of the written source, e.g. `generated_scene_1756347083.py`.
    pub fn source_file_name(&self) -> String {
        format!("{}.py", self.module_name())
    }

    /// Timestamped construct name, e.g. `GeneratedScene_1756347083`.
    pub fn timestamped_class_name(&self) -> String {
        format!("{}_{}", SCENE_CLASS_NAME, self.timestamp)
    }

    /// Construct name the generated source declares and the renderer targets.
    pub fn class_name(&self) -> &'static str {
        SCENE_CLASS_NAME
    }

    /// Video path reported to the caller.
    ///
    /// `public/media/generated_scene_{T}/{quality folder}/GeneratedScene.mp4`
    pub fn video_path(&self) -> PathBuf {
        PathBuf::from(MEDIA_DIR)
            .join(self.module_name())
            .join(self.quality.folder())
            .join(format!("{}.mp4", SCENE_CLASS_NAME))
    }

    /// Where the renderer itself places the video under `media_dir`.
    pub fn rendered_video_path(&self, media_dir: &std::path::Path) -> PathBuf {
        media_dir
            .join("videos")
            .join(self.module_name())
            .join(self.quality.folder())
            .join(format!("{}.mp4", SCENE_CLASS_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_from_timestamp() {
        let names = SceneNames::new(Timestamp::from_secs(1756347083), Quality::Low);
        assert_eq!(names.source_file_name(), "generated_scene_1756347083.py");
        assert_eq!(names.timestamped_class_name(), "GeneratedScene_1756347083");
        assert_eq!(names.class_name(), "GeneratedScene");
    }

    #[test]
    fn test_video_path_pattern() {
        let names = SceneNames::new(Timestamp::from_secs(42), Quality::default());
        assert_eq!(
            names.video_path(),
            PathBuf::from("public/media/generated_scene_42/480p15/GeneratedScene.mp4")
        );
    }

    #[test]
    fn test_video_path_under_media_dir() {
        let names = SceneNames::new(Timestamp::from_secs(42), Quality::High);
        assert!(names.video_path().starts_with(MEDIA_DIR));
    }

    #[test]
    fn test_video_path_depends_only_on_timestamp() {
        let a = SceneNames::new(Timestamp::from_secs(7), Quality::Low);
        let b = SceneNames::new(Timestamp::from_secs(7), Quality::Low);
        let c = SceneNames::new(Timestamp::from_secs(8), Quality::Low);
        assert_eq!(a.video_path(), b.video_path());
        assert_ne!(a.video_path(), c.video_path());
    }

    #[test]
    fn test_rendered_video_path_under_videos() {
        let names = SceneNames::new(Timestamp::from_secs(5), Quality::High);
        let path = names.rendered_video_path(std::path::Path::new("/tmp/media"));
        assert_eq!(
            path,
            PathBuf::from("/tmp/media/videos/generated_scene_5/1080p60/GeneratedScene.mp4")
        );
    }

    #[test]
    fn test_quality_presets() {
        assert_eq!(Quality::default(), Quality::Low);
        assert_eq!(Quality::Low.flag(), "-ql");
        assert_eq!(Quality::Low.folder(), "480p15");
        assert_eq!(Quality::FourK.flag(), "-qk");
        assert!(Quality::Low < Quality::High);
    }

    #[test]
    fn test_quality_parse() {
        assert_eq!("low".parse::<Quality>(), Ok(Quality::Low));
        assert_eq!("4K".parse::<Quality>(), Ok(Quality::FourK));
        assert_eq!("720p30".parse::<Quality>(), Ok(Quality::Medium));
        assert!("ultra".parse::<Quality>().is_err());
    }

    #[test]
    fn test_timestamp_now_is_recent() {
        // 2020-01-01
        assert!(Timestamp::now().as_secs() > 1_577_836_800);
    }
}
