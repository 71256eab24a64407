//! Configuration parsing and management for meshcam

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, MeshcamError};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub capture: CaptureConfig,
    pub detector: DetectorConfig,
    pub overlay: OverlayConfig,
    pub schedule: ScheduleConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capture: CaptureConfig::default(),
            detector: DetectorConfig::default(),
            overlay: OverlayConfig::default(),
            schedule: ScheduleConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, MeshcamError> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ConfigError::ReadFile(format!("{}: {}", path.as_ref().display(), e))
        })?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string
    pub fn from_str(s: &str) -> Result<Self, MeshcamError> {
        toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()).into())
    }

    /// Load configuration from default paths
    pub fn load() -> Result<Self, MeshcamError> {
        // Try config paths in order
        let paths = [
            PathBuf::from("config.toml"),
            PathBuf::from("config/default.toml"),
            dirs_path().join("config.toml"),
        ];

        for path in &paths {
            if path.exists() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::from_file(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), MeshcamError> {
        if self.capture.width == 0 || self.capture.height == 0 {
            return Err(ConfigError::InvalidValue {
                field: "capture.width/height".to_string(),
                message: "Capture dimensions must be greater than 0".to_string(),
            }
            .into());
        }

        if self.schedule.interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "schedule.interval_ms".to_string(),
                message: "Trigger period must be greater than 0".to_string(),
            }
            .into());
        }

        if self.overlay.refresh_hz == 0 {
            return Err(ConfigError::InvalidValue {
                field: "overlay.refresh_hz".to_string(),
                message: "Refresh rate must be greater than 0".to_string(),
            }
            .into());
        }

        if self.detector.synthetic_keypoints < 3 {
            return Err(ConfigError::InvalidValue {
                field: "detector.synthetic_keypoints".to_string(),
                message: "A face needs at least 3 keypoints".to_string(),
            }
            .into());
        }

        if self.detector.kind == DetectorKind::Piped {
            if self.overlay.topology_path.is_none() {
                return Err(ConfigError::MissingField(
                    "overlay.topology_path (required with a piped detector)".to_string(),
                )
                .into());
            }

            let script = Path::new(&self.detector.helper_script);
            if !script.exists() {
                tracing::warn!(
                    "Piped detector enabled but helper script not found at: {}",
                    self.detector.helper_script
                );
            }
        }

        Ok(())
    }
}

/// Capture source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Capture width in pixels
    pub width: u32,
    /// Capture height in pixels
    pub height: u32,
    /// Readiness polls reported not-ready before the first frame
    /// (simulated camera startup for the synthetic source)
    pub warmup_polls: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            warmup_polls: 3,
        }
    }
}

/// Landmark detector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Detector backend: "auto", "synthetic", or "piped"
    pub kind: DetectorKind,
    /// Keypoints per synthetic face (one hub plus a ring)
    pub synthetic_keypoints: usize,
    /// Simulated inference latency of the synthetic detector, in ms
    pub synthetic_latency_ms: u64,
    /// Interpreter for the landmark helper
    pub helper_command: String,
    /// Path to the landmark helper script
    pub helper_script: String,
    /// Maximum faces the helper should report
    pub max_faces: u32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            kind: DetectorKind::Auto,
            synthetic_keypoints: 33,
            synthetic_latency_ms: 25,
            helper_command: "python3".to_string(),
            helper_script: "scripts/mp_landmarker.py".to_string(),
            max_faces: 4,
        }
    }
}

/// Detector backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectorKind {
    /// Piped helper when available, synthetic otherwise
    Auto,
    /// Procedural orbiting face
    Synthetic,
    /// Helper subprocess over stdin/stdout
    Piped,
}

impl Default for DetectorKind {
    fn default() -> Self {
        Self::Auto
    }
}

/// Overlay rendering configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// JSON topology asset: an array of `[a, b, c]` keypoint index triples.
    /// When unset, a synthetic fan matching the synthetic detector is used.
    pub topology_path: Option<PathBuf>,
    /// Paint cadence of the overlay painter, in Hz
    pub refresh_hz: u32,
    /// Keypoint marker color
    pub point_color_hex: String,
    /// Wireframe edge color
    pub line_color_hex: String,
    /// Marker square size in pixels
    pub dot_size: u32,
    /// Directory for PNG overlay dumps (disabled when unset)
    pub dump_dir: Option<PathBuf>,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            topology_path: None,
            refresh_hz: 60,
            point_color_hex: "#00FFFF".to_string(),
            line_color_hex: "#808080".to_string(),
            dot_size: 2,
            dump_dir: None,
        }
    }
}

/// Inference trigger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Trigger period for landmark inference, in ms
    pub interval_ms: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self { interval_ms: 10 }
    }
}

/// Get the platform-specific configuration directory
fn dirs_path() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        if let Some(config_dir) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(config_dir).join("meshcam");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(".config/meshcam");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join("Library/Application Support/meshcam");
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("meshcam");
        }
    }

    PathBuf::from(".")
}
