use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

use crate::llm_client::DEFAULT_PERSONA_PROMPT;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    // Generative backend (Gemini generateContent contract)
    #[serde(default = "default_llm_url")]
    pub llm_api_url: String,
    #[serde(default = "default_llm_model")]
    pub llm_model: String,
    #[serde(default)]
    pub llm_api_key: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    // Persona instruction sent ahead of every user message
    #[serde(default = "default_persona_prompt", alias = "system_prompt")]
    pub persona_prompt: String,

    // Display text cleanup for model transcript artifacts
    #[serde(default = "default_true")]
    pub strip_transcript_artifacts: bool,

    // Session persistence
    #[serde(default = "default_database_path")]
    pub database_path: String,
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: u64,
    #[serde(default = "default_revalidate_interval_secs")]
    pub revalidate_interval_secs: u64,

    // Sticky preferences used before anything is persisted
    #[serde(default = "default_language")]
    pub default_language: String,
}

fn default_llm_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta/models".to_string()
}

fn default_llm_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_persona_prompt() -> String {
    DEFAULT_PERSONA_PROMPT.to_string()
}

fn default_true() -> bool {
    true
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|dir| dir.join("mindspace").join("session.db"))
        .unwrap_or_else(|| PathBuf::from("mindspace_session.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_session_ttl_hours() -> u64 {
    24
}

fn default_revalidate_interval_secs() -> u64 {
    3600
}

fn default_language() -> String {
    "en".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm_api_url: default_llm_url(),
            llm_model: default_llm_model(),
            llm_api_key: None,
            request_timeout_secs: default_request_timeout_secs(),
            persona_prompt: default_persona_prompt(),
            strip_transcript_artifacts: true,
            database_path: default_database_path(),
            session_ttl_hours: default_session_ttl_hours(),
            revalidate_interval_secs: default_revalidate_interval_secs(),
            default_language: default_language(),
        }
    }
}

impl AppConfig {
    /// Get the directory containing the executable
    fn get_base_dir() -> PathBuf {
        match std::env::current_exe() {
            Ok(exe_path) => exe_path
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from(".")),
            Err(_) => PathBuf::from("."),
        }
    }

    /// Get the path to the config file (relative to executable)
    pub fn config_path() -> PathBuf {
        Self::get_base_dir().join("mindspace_config.toml")
    }

    /// Load config from mindspace_config.toml (next to executable), falling back to env vars.
    ///
    /// Environment overrides are applied on top of the file so secrets like the
    /// API key never have to live on disk.
    pub fn load() -> Self {
        let path = Self::config_path();

        let base = match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_toml_str(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded config from {:?}", path);
                    config
                }
                Err(e) => {
                    tracing::error!("Failed to parse {:?}: {}", path, e);
                    Self::default()
                }
            },
            Err(_) => {
                tracing::warn!("No config file found, using defaults + env vars");
                Self::default()
            }
        };

        base.with_env_overrides()
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str::<AppConfig>(contents).context("Failed to parse config TOML")
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = env::var("LLM_API_URL") {
            self.llm_api_url = url;
        }

        if let Ok(model) = env::var("LLM_MODEL") {
            self.llm_model = model;
        }

        if let Some(key) = env::var("GEMINI_API_KEY")
            .ok()
            .or_else(|| env::var("LLM_API_KEY").ok())
        {
            if !key.trim().is_empty() {
                self.llm_api_key = Some(key);
            }
        }

        if let Ok(path) = env::var("MINDSPACE_DATABASE_PATH") {
            if !path.trim().is_empty() {
                self.database_path = path;
            }
        }

        if let Ok(hours) = env::var("MINDSPACE_SESSION_TTL_HOURS") {
            if let Ok(hours) = hours.parse() {
                self.session_ttl_hours = hours;
            }
        }

        if let Ok(interval) = env::var("MINDSPACE_REVALIDATE_INTERVAL_SECS") {
            if let Ok(seconds) = interval.parse() {
                self.revalidate_interval_secs = seconds;
            }
        }

        if let Ok(language) = env::var("MINDSPACE_LANGUAGE") {
            if !language.trim().is_empty() {
                self.default_language = language;
            }
        }

        if let Ok(enabled) = env::var("MINDSPACE_STRIP_ARTIFACTS") {
            self.strip_transcript_artifacts = enabled.eq_ignore_ascii_case("1")
                || enabled.eq_ignore_ascii_case("true")
                || enabled.eq_ignore_ascii_case("yes");
        }

        self
    }

    /// Full generateContent endpoint for the configured model.
    pub fn generate_content_url(&self) -> String {
        format!(
            "{}/{}:generateContent",
            self.llm_api_url.trim_end_matches('/'),
            self.llm_model
        )
    }

    /// Session lifetime. Values chrono cannot represent fall back to 24h.
    pub fn session_ttl(&self) -> chrono::Duration {
        i64::try_from(self.session_ttl_hours)
            .ok()
            .and_then(chrono::Duration::try_hours)
            .unwrap_or_else(|| {
                tracing::warn!(
                    "session_ttl_hours = {} is out of range; using {}h",
                    self.session_ttl_hours,
                    default_session_ttl_hours()
                );
                chrono::Duration::hours(default_session_ttl_hours() as i64)
            })
    }

    pub fn revalidate_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.revalidate_interval_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_fills_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            llm_model = "gemini-pro"
            session_ttl_hours = 12
            "#,
        )
        .expect("parse config");

        assert_eq!(config.llm_model, "gemini-pro");
        assert_eq!(config.session_ttl_hours, 12);
        assert_eq!(config.revalidate_interval_secs, 3600);
        assert!(config.strip_transcript_artifacts);
        assert_eq!(config.default_language, "en");
        assert!(config.persona_prompt.contains("user_mood_analysis"));
    }

    #[test]
    fn legacy_system_prompt_key_is_accepted() {
        let config = AppConfig::from_toml_str(r#"system_prompt = "Be kind.""#)
            .expect("parse config");
        assert_eq!(config.persona_prompt, "Be kind.");
    }

    #[test]
    fn generate_content_url_joins_model() {
        let config = AppConfig {
            llm_api_url: "http://localhost:9000/v1beta/models/".to_string(),
            llm_model: "test-model".to_string(),
            ..AppConfig::default()
        };
        assert_eq!(
            config.generate_content_url(),
            "http://localhost:9000/v1beta/models/test-model:generateContent"
        );
    }

    #[test]
    fn session_ttl_out_of_range_falls_back_to_default() {
        let config = AppConfig::from_toml_str("session_ttl_hours = 9223372036854775807")
            .expect("parse config");
        assert_eq!(config.session_ttl(), chrono::Duration::hours(24));

        let huge = AppConfig {
            session_ttl_hours: u64::MAX,
            ..AppConfig::default()
        };
        assert_eq!(huge.session_ttl(), chrono::Duration::hours(24));

        let short = AppConfig {
            session_ttl_hours: 2,
            ..AppConfig::default()
        };
        assert_eq!(short.session_ttl(), chrono::Duration::hours(2));
    }

    #[test]
    fn config_roundtrips_through_toml() {
        let config = AppConfig::default();
        let text = toml::to_string_pretty(&config).expect("serialize");
        let parsed = AppConfig::from_toml_str(&text).expect("parse");
        assert_eq!(parsed.llm_model, config.llm_model);
        assert_eq!(parsed.database_path, config.database_path);
    }
}
