use anyhow::{Context, Result, bail};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

pub const THEMES: &[&str] = &["default", "jungle", "ocean", "space"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    OpenAi,
    Anthropic,
}

impl LlmProvider {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            other => bail!("Unknown LLM provider: {}", other),
        }
    }
}

/// Installation-wide configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub bind_addr: String,
    pub backend_url: String,
    pub backend_timeout: Duration,
    pub llm_provider: LlmProvider,
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub default_theme: String,
    pub enable_age_responses: bool,
    pub session_secret: String,
    pub data_root: PathBuf,
    pub db_max_connections: u32,
    pub db_acquire_timeout: Duration,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let session_secret = get("SESSION_SECRET").context("SESSION_SECRET not set")?;

        let llm_provider = match get("LLM_PROVIDER") {
            Some(v) => LlmProvider::parse(&v)?,
            None => LlmProvider::OpenAi,
        };

        let default_theme = get("DEFAULT_THEME").unwrap_or_else(|| "default".to_string());
        if !THEMES.contains(&default_theme.as_str()) {
            bail!("DEFAULT_THEME must be one of {:?}", THEMES);
        }

        let backend_timeout_secs = parse_number(get("BACKEND_TIMEOUT_SECS"), 60, "BACKEND_TIMEOUT_SECS")?;
        let db_max_connections = u32::try_from(parse_number(get("DB_MAX_CONNECTIONS"), 5, "DB_MAX_CONNECTIONS")?)
            .context("DB_MAX_CONNECTIONS is out of range")?;
        let acquire_timeout_secs = parse_number(get("DB_ACQUIRE_TIMEOUT_SECS"), 10, "DB_ACQUIRE_TIMEOUT_SECS")?;

        Ok(Self {
            database_url: get("DATABASE_URL").unwrap_or_else(|| "sqlite://aiassistant.db".to_string()),
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "127.0.0.1:3000".to_string()),
            backend_url: get("BACKEND_URL").unwrap_or_else(|| "http://localhost:8000".to_string()),
            backend_timeout: Duration::from_secs(backend_timeout_secs),
            llm_provider,
            openai_api_key: get("OPENAI_API_KEY"),
            anthropic_api_key: get("ANTHROPIC_API_KEY"),
            default_theme,
            enable_age_responses: parse_flag(get("ENABLE_AGE_RESPONSES"), true),
            session_secret,
            data_root: get("DATA_ROOT").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("./data")),
            db_max_connections,
            db_acquire_timeout: Duration::from_secs(acquire_timeout_secs),
        })
    }

    /// Key for whichever provider is selected.
    pub fn api_key(&self) -> Option<&str> {
        match self.llm_provider {
            LlmProvider::OpenAi => self.openai_api_key.as_deref(),
            LlmProvider::Anthropic => self.anthropic_api_key.as_deref(),
        }
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.data_root.join("aiassistant").join("uploads")
    }
}

fn parse_number(value: Option<String>, default: u64, key: &str) -> Result<u64> {
    match value {
        Some(v) => v
            .trim()
            .parse::<u64>()
            .with_context(|| format!("{} must be a non-negative integer", key)),
        None => Ok(default),
    }
}

fn parse_flag(value: Option<String>, default: bool) -> bool {
    match value.map(|v| v.trim().to_lowercase()) {
        Some(v) => matches!(v.as_str(), "1" | "true" | "yes" | "on"),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings_from(pairs: &[(&str, &str)]) -> Result<Settings> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let settings = settings_from(&[("SESSION_SECRET", "s3cret")]).unwrap();
        assert_eq!(settings.backend_url, "http://localhost:8000");
        assert_eq!(settings.backend_timeout, Duration::from_secs(60));
        assert_eq!(settings.llm_provider, LlmProvider::OpenAi);
        assert_eq!(settings.default_theme, "default");
        assert!(settings.enable_age_responses);
        assert_eq!(settings.upload_dir(), PathBuf::from("./data/aiassistant/uploads"));
    }

    #[test]
    fn test_missing_secret_is_rejected() {
        assert!(settings_from(&[]).is_err());
        assert!(settings_from(&[("SESSION_SECRET", "  ")]).is_err());
    }

    #[test]
    fn test_api_key_follows_provider() {
        let settings = settings_from(&[
            ("SESSION_SECRET", "s3cret"),
            ("LLM_PROVIDER", "Anthropic"),
            ("OPENAI_API_KEY", "sk-openai"),
            ("ANTHROPIC_API_KEY", "sk-ant"),
        ])
        .unwrap();
        assert_eq!(settings.api_key(), Some("sk-ant"));

        let settings = settings_from(&[("SESSION_SECRET", "s3cret"), ("OPENAI_API_KEY", "sk-openai")]).unwrap();
        assert_eq!(settings.api_key(), Some("sk-openai"));
    }

    #[test]
    fn test_invalid_values() {
        assert!(settings_from(&[("SESSION_SECRET", "x"), ("LLM_PROVIDER", "mistral")]).is_err());
        assert!(settings_from(&[("SESSION_SECRET", "x"), ("DEFAULT_THEME", "desert")]).is_err());
        assert!(settings_from(&[("SESSION_SECRET", "x"), ("BACKEND_TIMEOUT_SECS", "-1")]).is_err());
    }

    #[test]
    fn test_db_max_connections_range() {
        let settings = settings_from(&[("SESSION_SECRET", "x"), ("DB_MAX_CONNECTIONS", "12")]).unwrap();
        assert_eq!(settings.db_max_connections, 12);

        let err = settings_from(&[("SESSION_SECRET", "x"), ("DB_MAX_CONNECTIONS", "4294967297")]).unwrap_err();
        assert!(err.to_string().contains("DB_MAX_CONNECTIONS"));
    }

    #[test]
    fn test_age_flag() {
        let settings = settings_from(&[("SESSION_SECRET", "x"), ("ENABLE_AGE_RESPONSES", "0")]).unwrap();
        assert!(!settings.enable_age_responses);
    }
}
