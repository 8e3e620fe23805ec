use std::path::PathBuf;

use serde::Serialize;

/// Application-level constants
pub const APP_NAME: &str = "Clinsight";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "medgemma";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 500;
pub const DEFAULT_TEMPERATURE: f64 = 0.2;

/// Get the application data directory
/// ~/Clinsight/ on all platforms; falls back to the working directory when
/// no home directory can be determined.
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Default SQLite database location.
pub fn database_path() -> PathBuf {
    app_data_dir().join("clinsight.db")
}

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "clinsight=debug,clinsight_lib=debug,warn"
    } else {
        "clinsight=info,clinsight_lib=info,warn"
    }
}

/// Reasoning-model connection and call policy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineConfig {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub retry_backoff_ms: u64,
    pub temperature: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OLLAMA_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by `CLINSIGHT_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`. Unparseable
    /// values are ignored with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(url) = lookup("CLINSIGHT_OLLAMA_URL").filter(|v| !v.trim().is_empty()) {
            config.base_url = url.trim().to_string();
        }
        if let Some(model) = lookup("CLINSIGHT_MODEL").filter(|v| !v.trim().is_empty()) {
            config.model = model.trim().to_string();
        }
        if let Some(secs) = parse_var(&lookup, "CLINSIGHT_TIMEOUT_SECS") {
            config.timeout_secs = secs;
        }
        if let Some(attempts) = parse_var::<u32>(&lookup, "CLINSIGHT_MAX_ATTEMPTS") {
            config.max_attempts = attempts.max(1);
        }
        config
    }
}

fn parse_var<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(var = key, "Ignoring unparseable environment value");
            None
        }
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
    fn app_data_dir_named_after_app() {
        assert!(app_data_dir().ends_with("Clinsight"));
        assert!(database_path().starts_with(app_data_dir()));
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.1.0");
    }

    #[test]
    fn defaults_without_environment() {
        let config = EngineConfig::from_lookup(lookup(&[]));
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.base_url, "http://localhost:11434");
        assert_eq!(config.model, "medgemma");
        assert_eq!(config.timeout_secs, 120);
        assert_eq!(config.max_attempts, 2);
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = EngineConfig::from_lookup(lookup(&[
            ("CLINSIGHT_OLLAMA_URL", "http://gpu-box:11434"),
            ("CLINSIGHT_MODEL", "llama3:8b"),
            ("CLINSIGHT_TIMEOUT_SECS", "30"),
            ("CLINSIGHT_MAX_ATTEMPTS", "0"),
        ]));
        assert_eq!(config.base_url, "http://gpu-box:11434");
        assert_eq!(config.model, "llama3:8b");
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.max_attempts, 1);
    }

    #[test]
    fn bad_values_are_ignored() {
        let config = EngineConfig::from_lookup(lookup(&[
            ("CLINSIGHT_TIMEOUT_SECS", "soon"),
            ("CLINSIGHT_MODEL", "  "),
        ]));
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.model, DEFAULT_MODEL);
    }
}
