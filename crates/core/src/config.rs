use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Env var selecting the active profile.
pub const PROFILE_ENV: &str = "FRAMEQUEUE_PROFILE";

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Active profile name, upper-cased (empty = default).
pub fn active_profile() -> String {
    env_or(PROFILE_ENV, "").to_uppercase()
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
pub fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

pub fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

/// Parse a profiled env var, keeping `default` when unset or unparsable.
pub fn profiled_env_parse<T: FromStr>(profile: &str, key: &str, default: T) -> T {
    match profiled_env_opt(profile, key) {
        Some(raw) => match raw.trim().parse() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!("Ignoring unparsable value for {}: {:?}", key, raw);
                default
            }
        },
        None => default,
    }
}

// ── Top-level config ──────────────────────────────────────────

/// Process-level settings shared by the binaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    /// `tracing` env-filter directive used when `RUST_LOG` is not set.
    pub log_filter: String,
    /// Optional TOML file holding the scheduler tunables.
    pub scheduler_config: Option<PathBuf>,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// When `FRAMEQUEUE_PROFILE` is set (e.g. `BENCH`), every key is first
    /// looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        Self::for_profile(&active_profile())
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            log_filter: profiled_env_or(p, "FRAMEQUEUE_LOG", "info"),
            scheduler_config: profiled_env_opt(p, "FRAMEQUEUE_SCHEDULER_CONFIG").map(PathBuf::from),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  log_filter:       {}", self.log_filter);
        tracing::info!(
            "  scheduler_config: {}",
            self.scheduler_config
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(defaults)".to_string())
        );
    }

    /// JSON view for diagnostics output.
    pub fn summary(&self) -> serde_json::Value {
        serde_json::json!({
            "profile": self.profile_label(),
            "log_filter": self.log_filter,
            "scheduler_config": self.scheduler_config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profiled_lookup_prefers_prefixed_key() {
        env::set_var("FQ_TEST_PREFIXED_KEY", "base");
        env::set_var("BENCH_FQ_TEST_PREFIXED_KEY", "bench");
        assert_eq!(profiled_env_opt("BENCH", "FQ_TEST_PREFIXED_KEY").as_deref(), Some("bench"));
        assert_eq!(profiled_env_opt("", "FQ_TEST_PREFIXED_KEY").as_deref(), Some("base"));
        assert_eq!(profiled_env_opt("OTHER", "FQ_TEST_PREFIXED_KEY").as_deref(), Some("base"));
    }

    #[test]
    fn empty_values_are_treated_as_unset() {
        env::set_var("FQ_TEST_EMPTY_KEY", "");
        assert!(profiled_env_opt("", "FQ_TEST_EMPTY_KEY").is_none());
        assert_eq!(profiled_env_or("", "FQ_TEST_EMPTY_KEY", "fallback"), "fallback");
    }

    #[test]
    fn parse_falls_back_on_garbage() {
        env::set_var("FQ_TEST_PARSE_KEY", "not-a-number");
        assert_eq!(profiled_env_parse("", "FQ_TEST_PARSE_KEY", 7usize), 7);
        env::set_var("FQ_TEST_PARSE_KEY_OK", " 12 ");
        assert_eq!(profiled_env_parse("", "FQ_TEST_PARSE_KEY_OK", 7usize), 12);
    }

    #[test]
    fn profile_label_defaults() {
        let config = Config {
            profile: String::new(),
            log_filter: "info".into(),
            scheduler_config: None,
        };
        assert_eq!(config.profile_label(), "default");
        assert_eq!(config.summary()["profile"], "default");
    }

    #[test]
    fn for_profile_uppercases() {
        let config = Config::for_profile("bench");
        assert_eq!(config.profile, "BENCH");
        assert_eq!(config.profile_label(), "BENCH");
    }
}
