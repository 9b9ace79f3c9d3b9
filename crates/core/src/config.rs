use std::env;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

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

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_parse<T: std::str::FromStr>(
    profile: &str,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    match profiled_env_opt(profile, key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw,
            }),
    }
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub engine: EngineConfig,
    pub log: LogConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `LAE_PROFILE`. When set (e.g. `BENCH`), every
    /// key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let profile = env_or("LAE_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Result<Self, ConfigError> {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Ok(Self {
            profile: p.to_string(),
            engine: EngineConfig::from_env_profiled(p)?,
            log: LogConfig::from_env_profiled(p),
        })
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() {
            "default"
        } else {
            &self.profile
        }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  engine:  fatigue_seed={}",
            self.engine
                .fatigue_seed
                .map(|s| s.to_string())
                .unwrap_or_else(|| "(random)".to_string())
        );
        tracing::info!("  log:     filter={}", self.log.filter);
    }
}

// ── Engine ────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Seed for per-worker fatigue factors; random when unset.
    pub fatigue_seed: Option<u64>,
}

impl EngineConfig {
    fn from_env_profiled(p: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            fatigue_seed: profiled_env_parse(p, "LAE_FATIGUE_SEED")?,
        })
    }
}

// ── Logging ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "warn".to_string(),
        }
    }
}

impl LogConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            filter: profiled_env_or(p, "LAE_LOG", "warn"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Each test uses its own profile prefix so parallel tests don't race
    // on the shared process environment.

    #[test]
    fn defaults_when_unset() {
        let config = Config::for_profile("cfgtest_defaults").unwrap();
        assert_eq!(config.profile, "CFGTEST_DEFAULTS");
        assert!(!config.log.filter.is_empty());
    }

    #[test]
    fn profiled_keys_take_precedence() {
        env::set_var("CFGTEST_PROFILED_LAE_FATIGUE_SEED", "42");
        env::set_var("CFGTEST_PROFILED_LAE_LOG", "debug");

        let config = Config::for_profile("cfgtest_profiled").unwrap();
        assert_eq!(config.engine.fatigue_seed, Some(42));
        assert_eq!(config.log.filter, "debug");
        assert_eq!(config.profile_label(), "CFGTEST_PROFILED");
    }

    #[test]
    fn invalid_number_is_an_error() {
        env::set_var("CFGTEST_BAD_LAE_FATIGUE_SEED", "many");
        let err = Config::for_profile("cfgtest_bad").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref key, .. } if key == "LAE_FATIGUE_SEED"
        ));
    }

    #[test]
    fn default_profile_label() {
        let config = Config {
            profile: String::new(),
            engine: EngineConfig::default(),
            log: LogConfig::default(),
        };
        assert_eq!(config.profile_label(), "default");
        assert_eq!(config.log.filter, "warn");
    }
}
