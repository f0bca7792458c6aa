//! Settings and path helpers for the promptsh binary

use anyhow::Context;
use shared::settings::AppSettings;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "prompt_shell";

/// Default location of the settings file
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|mut p| {
        p.push(APP_DIR);
        p.push("settings.json");
        p
    })
}

/// Where `init` puts the history file and the conversation log
pub fn data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join(APP_DIR))
}

/// Settings written by `init` for a fresh install.
pub fn initial_settings() -> AppSettings {
    let mut settings = AppSettings::default();
    if let Some(dir) = data_dir() {
        settings.history_file = Some(dir.join("last_command.txt"));
        settings.conversation_log = dir.join("messages.json");
    }
    settings
}

/// Load settings from an explicit file.
pub fn load_settings(path: &Path) -> anyhow::Result<AppSettings> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read settings from {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("invalid settings in {}", path.display()))
}

/// Load settings from disk or return defaults
pub fn load_settings_or_default() -> (AppSettings, bool) {
    if let Some(path) = config_path() {
        if path.exists() {
            match load_settings(&path) {
                Ok(settings) => return (settings, true),
                Err(e) => tracing::warn!(error = %format!("{e:#}"), "using default settings"),
            }
        }
    }
    (AppSettings::default(), false)
}

pub fn save_settings(path: &Path, settings: &AppSettings) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, json)
        .with_context(|| format!("failed to write settings to {}", path.display()))
}

/// Values given on the command line or through the environment.
#[derive(Debug, Default)]
pub struct Overrides {
    pub url: Option<String>,
    pub history_file: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
}

pub fn apply_overrides(settings: &mut AppSettings, overrides: Overrides) {
    if let Some(url) = overrides.url {
        settings.completion.url = Some(url);
    }
    if let Some(path) = overrides.history_file {
        settings.history_file = Some(path);
    }
    if let Some(path) = overrides.log_file {
        settings.conversation_log = path;
    }
}
