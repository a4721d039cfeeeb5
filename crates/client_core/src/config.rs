use std::{fs, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::warn;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
pub const SETTINGS_FILE: &str = "civix.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_base_url: String,
    pub session_path: PathBuf,
    pub request_timeout_secs: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.into(),
            session_path: default_session_path(),
            request_timeout_secs: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    api_base_url: Option<String>,
    session_path: Option<PathBuf>,
    request_timeout_secs: Option<u64>,
}

impl Settings {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    /// Layers the optional settings file and then environment overrides on top of defaults.
    pub fn resolve(file_contents: Option<&str>, env: impl Fn(&str) -> Option<String>) -> Self {
        let mut settings = Settings::default();

        if let Some(raw) = file_contents {
            match toml::from_str::<FileSettings>(raw) {
                Ok(file_cfg) => {
                    if let Some(v) = file_cfg.api_base_url {
                        settings.api_base_url = v;
                    }
                    if let Some(v) = file_cfg.session_path {
                        settings.session_path = v;
                    }
                    if let Some(v) = file_cfg.request_timeout_secs {
                        settings.request_timeout_secs = Some(v);
                    }
                }
                Err(err) => warn!(error = %err, "config: ignoring malformed {SETTINGS_FILE}"),
            }
        }

        if let Some(v) = env("CIVIX_API_URL") {
            settings.api_base_url = v;
        }
        if let Some(v) = env("APP__API_BASE_URL") {
            settings.api_base_url = v;
        }

        if let Some(v) = env("CIVIX_SESSION_PATH") {
            settings.session_path = PathBuf::from(v);
        }

        if let Some(v) = env("APP__REQUEST_TIMEOUT_SECS") {
            match v.parse::<u64>() {
                Ok(parsed) => settings.request_timeout_secs = Some(parsed),
                Err(_) => warn!(value = %v, "config: ignoring non-numeric APP__REQUEST_TIMEOUT_SECS"),
            }
        }

        settings.api_base_url = normalize_base_url(&settings.api_base_url);
        settings
    }

    pub fn with_api_base_url(mut self, api_base_url: &str) -> Self {
        self.api_base_url = normalize_base_url(api_base_url);
        self
    }
}

pub fn load_settings() -> Settings {
    let file_contents = fs::read_to_string(SETTINGS_FILE).ok();
    Settings::resolve(file_contents.as_deref(), |key| std::env::var(key).ok())
}

pub fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return DEFAULT_API_BASE_URL.to_string();
    }
    trimmed.to_string()
}

fn default_session_path() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("civix").join("session.json"))
        .unwrap_or_else(|| PathBuf::from(".civix-session.json"))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
