//! Runtime configuration.
//!
//! [`Settings`] comes from the environment (after `.env` / bundled config have
//! been loaded by the binary). [`Preferences`] are the user's own choices and
//! persist as JSON under the platform data directory.

use crate::ai::gemini::DEFAULT_ENDPOINT;
use crate::maps::DEFAULT_BASE_URL;
use crate::repository::DEFAULT_HISTORY_WINDOW;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_MAP_TIMEOUT_SECS: u64 = 12;
const DEFAULT_LLM_TIMEOUT_SECS: u64 = 30;

/// Stored font scale is the UI value times this factor.
const FONT_SCALE_FACTOR: f32 = 1.2;
const DEFAULT_FONT_SCALE: f32 = 1.2;

#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub api_key: Option<String>,
    pub gemini_endpoint: String,
    pub map_endpoint: String,
    pub map_timeout: Duration,
    pub llm_timeout: Duration,
    pub history_window: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            gemini_endpoint: DEFAULT_ENDPOINT.to_string(),
            map_endpoint: DEFAULT_BASE_URL.to_string(),
            map_timeout: Duration::from_secs(DEFAULT_MAP_TIMEOUT_SECS),
            llm_timeout: Duration::from_secs(DEFAULT_LLM_TIMEOUT_SECS),
            history_window: DEFAULT_HISTORY_WINDOW,
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from any key lookup. Blank and unparsable values fall
    /// back to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let number = |key: &str, default: u64| {
            get(key)
                .and_then(|value| match value.parse::<u64>() {
                    Ok(parsed) => Some(parsed),
                    Err(_) => {
                        tracing::warn!(key, value = %value, "ignoring invalid number");
                        None
                    }
                })
                .unwrap_or(default)
        };

        let defaults = Self::default();
        Self {
            api_key: get("GEMINI_API_KEY"),
            gemini_endpoint: get("GEMINI_ENDPOINT").unwrap_or(defaults.gemini_endpoint),
            map_endpoint: get("MAP_ENDPOINT").unwrap_or(defaults.map_endpoint),
            map_timeout: Duration::from_secs(number("MAP_TIMEOUT_SECS", DEFAULT_MAP_TIMEOUT_SECS)),
            llm_timeout: Duration::from_secs(number("LLM_TIMEOUT_SECS", DEFAULT_LLM_TIMEOUT_SECS)),
            history_window: number("OPENER_HISTORY_WINDOW", DEFAULT_HISTORY_WINDOW as u64) as usize,
        }
    }

    /// Uses the saved key when the environment has none.
    pub fn merge_preferences(mut self, preferences: &Preferences) -> Self {
        if self.api_key.is_none() {
            self.api_key = preferences.api_key.clone().filter(|key| !key.is_empty());
        }
        self
    }
}

/// Masks a key for logs: first four characters only.
pub fn redact(key: &str) -> String {
    let head: String = key.chars().take(4).collect();
    format!("{head}****")
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub api_key: Option<String>,
    pub vertex_api_key: Option<String>,
    /// Actual scale applied to text (UI scale times 1.2).
    pub font_size_scale: f32,
    pub high_contrast: bool,
    pub accent_color_preset: u8,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            api_key: None,
            vertex_api_key: None,
            font_size_scale: DEFAULT_FONT_SCALE,
            high_contrast: false,
            accent_color_preset: 0,
        }
    }
}

impl Preferences {
    /// Scale as shown on the settings slider (1.0 to 2.0).
    pub fn ui_font_scale(&self) -> f32 {
        self.font_size_scale / FONT_SCALE_FACTOR
    }

    pub fn set_ui_font_scale(&mut self, scale: f32) {
        self.font_size_scale = scale.clamp(1.0, 2.0) * FONT_SCALE_FACTOR;
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PreferencesError {
    #[error("Failed to access preferences: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid preferences file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// JSON file holding [`Preferences`].
pub struct PreferencesStore {
    path: PathBuf,
}

impl Default for PreferencesStore {
    fn default() -> Self {
        Self::new(default_preferences_path())
    }
}

fn default_preferences_path() -> PathBuf {
    if let Some(data_dir) = dirs::data_local_dir() {
        return data_dir.join("opener").join("preferences.json");
    }
    PathBuf::from("cache").join("preferences.json")
}

impl PreferencesStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing file means defaults.
    pub fn load(&self) -> Result<Preferences, PreferencesError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Preferences::default()),
            Err(err) => Err(err.into()),
        }
    }

    /// Like [`load`](Self::load), but logs and falls back to defaults.
    pub fn load_or_default(&self) -> Preferences {
        self.load().unwrap_or_else(|err| {
            tracing::warn!(path = %self.path.display(), error = %err, "using default preferences");
            Preferences::default()
        })
    }

    pub fn save(&self, preferences: &Preferences) -> Result<(), PreferencesError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(preferences)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::from_lookup(lookup(&[]));
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.map_timeout, Duration::from_secs(12));
        assert_eq!(settings.history_window, 10);
    }

    #[test]
    fn test_settings_overrides() {
        let settings = Settings::from_lookup(lookup(&[
            ("GEMINI_API_KEY", " abc "),
            ("MAP_ENDPOINT", "http://localhost:8080"),
            ("LLM_TIMEOUT_SECS", "5"),
            ("OPENER_HISTORY_WINDOW", "nope"),
        ]));
        assert_eq!(settings.api_key.as_deref(), Some("abc"));
        assert_eq!(settings.map_endpoint, "http://localhost:8080");
        assert_eq!(settings.llm_timeout, Duration::from_secs(5));
        assert_eq!(settings.history_window, 10);
    }

    #[test]
    fn test_env_key_wins_over_saved_key() {
        let preferences = Preferences {
            api_key: Some("saved".into()),
            ..Default::default()
        };
        let from_env = Settings::from_lookup(lookup(&[("GEMINI_API_KEY", "env")]))
            .merge_preferences(&preferences);
        assert_eq!(from_env.api_key.as_deref(), Some("env"));

        let from_saved = Settings::from_lookup(lookup(&[])).merge_preferences(&preferences);
        assert_eq!(from_saved.api_key.as_deref(), Some("saved"));
    }

    #[test]
    fn test_font_scale_mapping() {
        let mut preferences = Preferences::default();
        assert!((preferences.ui_font_scale() - 1.0).abs() < 1e-6);
        preferences.set_ui_font_scale(1.5);
        assert!((preferences.font_size_scale - 1.8).abs() < 1e-6);
        preferences.set_ui_font_scale(3.0);
        assert!((preferences.font_size_scale - 2.4).abs() < 1e-6);
    }

    #[test]
    fn test_redact() {
        assert_eq!(redact("AIzaSyXXXX"), "AIza****");
    }

    #[test]
    fn test_preferences_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferencesStore::new(dir.path().join("nested").join("preferences.json"));
        assert_eq!(store.load().unwrap(), Preferences::default());

        let mut preferences = Preferences::default();
        preferences.api_key = Some("key".into());
        preferences.high_contrast = true;
        store.save(&preferences).unwrap();
        assert_eq!(store.load().unwrap(), preferences);
    }

    #[test]
    fn test_corrupt_preferences() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = PreferencesStore::new(&path);
        assert!(matches!(store.load(), Err(PreferencesError::Parse(_))));
        assert_eq!(store.load_or_default(), Preferences::default());
    }
}
