use std::path::PathBuf;

use directories::ProjectDirs;
use serde::Deserialize;

use crate::structure::LabelLanguage;

/// Application configuration loaded from TOML config file.
/// Every field has a default, so the file is optional.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Custom database path (overrides XDG default).
    pub db_path: Option<PathBuf>,
    /// Number of parallel workers for batch rendering. 0 = auto-detect.
    pub workers: usize,
    pub learning: LearningConfig,
    /// Language of generated block labels ("en" or "ru").
    pub labels: LabelLanguage,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct LearningConfig {
    pub mode: LearningMode,
}

/// Whether learned header data outlives a single segmentation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LearningMode {
    /// Learned data and corrections are kept across runs.
    #[default]
    Durable,
    /// Learned data is cleared before every segmentation run.
    Session,
}

impl AppConfig {
    /// Load config from `~/.config/songsheet/config.toml`.
    /// Returns default config if file doesn't exist.
    /// Logs a warning if the file exists but can't be parsed.
    pub fn load() -> Self {
        let config_path = Self::config_path();
        match config_path {
            Some(path) if path.exists() => match std::fs::read_to_string(&path) {
                Ok(contents) => Self::parse(&contents).unwrap_or_else(|e| {
                    log::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    Self::default()
                }),
                Err(e) => {
                    log::warn!("Failed to read {}: {}. Using defaults.", path.display(), e);
                    Self::default()
                }
            },
            _ => {
                log::debug!("No config file found, using defaults");
                Self::default()
            }
        }
    }

    fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        let config = toml::from_str::<AppConfig>(contents)?;
        log::info!(
            "Loaded config: learning mode {:?}, labels {:?}",
            config.learning.mode,
            config.labels
        );
        Ok(config)
    }

    /// Resolve worker count: 0 → auto-detect (cores / 2, min 1).
    pub fn resolve_workers(&self) -> usize {
        if self.workers > 0 {
            self.workers
        } else {
            let cores = std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(2);
            (cores / 2).max(1)
        }
    }

    fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", crate::APP_NAME)
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

/// Resolve the default database path using XDG data directory.
pub fn default_db_path() -> PathBuf {
    if let Some(dirs) = ProjectDirs::from("", "", crate::APP_NAME) {
        let data_dir = dirs.data_dir();
        std::fs::create_dir_all(data_dir).ok();
        data_dir.join("songsheet.db")
    } else {
        // Fallback: current directory
        PathBuf::from("songsheet.db")
    }
}
