//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory holding Unity recordings (`<dir>/<recording>/_img`, ...).
    pub recordings_dir: PathBuf,

    /// Default generation settings.
    pub generation: GenerationDefaults,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Default generation parameters, overridable from the command line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationDefaults {
    /// Frame rate of the rendered recordings and of the output videos.
    pub fps: u32,

    /// Split-screen panel modes, in layout order.
    pub modes: Vec<String>,

    /// Labels present in `layer.json` that are scenery, not actions.
    pub no_action_labels: Vec<String>,

    /// Class highlighted by the `oneclass` panel.
    pub oneclass_label: String,

    /// Encode with a lossy codec (mp4) instead of lossless png-in-avi.
    pub lossy: bool,

    /// Write cropped tube clips per tracked action instance.
    pub save_tubes: bool,

    /// Tube output folder, relative to the recording.
    pub tubes_folder: String,

    /// Pixels added on each side of a tube crop.
    pub tube_padding: u32,

    /// Minimum tube length in seconds.
    pub min_tube_secs: f64,

    /// Optional TTF/OTF font used for bounding-box captions.
    pub label_font: Option<PathBuf>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "actsim=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            recordings_dir: default_recordings_dir(),
            generation: GenerationDefaults::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for GenerationDefaults {
    fn default() -> Self {
        Self {
            fps: 30,
            modes: ["original", "mask", "overlay", "bbox"]
                .iter()
                .map(|m| m.to_string())
                .collect(),
            no_action_labels: ["Car", "Default", "UI", "Ground", "Water", "Lighting"]
                .iter()
                .map(|l| l.to_string())
                .collect(),
            oneclass_label: "kicking".to_string(),
            lossy: true,
            save_tubes: true,
            tubes_folder: "tubes".to_string(),
            tube_padding: 50,
            min_tube_secs: 1.0,
            label_font: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&config_file_path())
    }

    /// Load config from an explicit path, falling back to defaults.
    pub fn load_from(config_path: &Path) -> Self {
        if config_path.exists() {
            match std::fs::read_to_string(config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        self.save_to(&config_file_path())
    }

    /// Save config to an explicit path.
    pub fn save_to(&self, config_path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }

    /// Resolve a recording argument: absolute or existing paths are used
    /// as-is, bare names are looked up under `recordings_dir`.
    pub fn resolve_recording(&self, recording: &Path) -> PathBuf {
        if recording.is_absolute() || recording.exists() {
            recording.to_path_buf()
        } else {
            self.recordings_dir.join(recording)
        }
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("actsim").join("config.json")
}

/// Default recordings directory.
fn default_recordings_dir() -> PathBuf {
    let base = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local").join("share")
        });
    base.join("actsim").join("rec")
}
