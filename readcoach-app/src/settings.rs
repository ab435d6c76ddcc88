//! Persistent application settings (JSON file in app data directory).

use std::fs;
use std::path::{Path, PathBuf};

use readcoach_core::EngineConfig;
use serde::{Deserialize, Serialize};

pub const LOOKAHEAD_ENV: &str = "READCOACH_LOOKAHEAD_WINDOW";
pub const MAX_PRACTICE_ENV: &str = "READCOACH_MAX_PRACTICE_WORDS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct AppSettings {
    pub lookahead_window: usize,
    pub max_practice_words: usize,
    pub history_enabled: bool,
    pub retention_days: usize,
    /// Overrides the default SQLite location when set.
    pub database_path: Option<PathBuf>,
}

impl Default for AppSettings {
    fn default() -> Self {
        let engine = EngineConfig::default();
        Self {
            lookahead_window: engine.lookahead_window,
            max_practice_words: engine.max_practice_words,
            history_enabled: true,
            retention_days: 90,
            database_path: None,
        }
    }
}

impl AppSettings {
    pub fn normalize(&mut self) {
        self.lookahead_window = self.lookahead_window.clamp(1, 8);
        self.max_practice_words = self.max_practice_words.clamp(1, 200);
        self.retention_days = self.retention_days.clamp(1, 3650);
        self.database_path = self
            .database_path
            .take()
            .filter(|p| !p.as_os_str().is_empty());
    }

    /// Apply `READCOACH_*` overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any key lookup. Unparseable values are ignored.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(LOOKAHEAD_ENV).and_then(|v| v.trim().parse::<usize>().ok()) {
            self.lookahead_window = v;
        }
        if let Some(v) = lookup(MAX_PRACTICE_ENV).and_then(|v| v.trim().parse::<usize>().ok()) {
            self.max_practice_words = v;
        }
        self.normalize();
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            lookahead_window: self.lookahead_window,
            max_practice_words: self.max_practice_words,
        }
        .normalized()
    }

    pub fn db_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| data_dir().join("readcoach.db"))
    }
}

fn data_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("readcoach")
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                std::env::var_os("HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("/tmp"))
                    .join(".local")
                    .join("share")
            })
            .join("readcoach")
    }
}

pub fn default_settings_path() -> PathBuf {
    data_dir().join("settings.json")
}

pub fn load_settings(path: &Path) -> AppSettings {
    let mut settings = fs::read_to_string(path)
        .ok()
        .and_then(|raw| serde_json::from_str::<AppSettings>(&raw).ok())
        .unwrap_or_default();
    settings.normalize();
    settings
}

pub fn save_settings(path: &Path, settings: &AppSettings) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings).map_err(std::io::Error::other)?;
    fs::write(path, json)
}
