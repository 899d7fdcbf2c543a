use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use wouldyou_core::{ChallengeSettings, GlmConfig};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "your-secret-key",
];

const DEFAULT_GLM_URL: &str = "https://api.z.ai/api/paas/v4/chat/completions";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("WOULDYOU_JWT_SECRET is unset or still a placeholder")]
    InsecureSecret,

    #[error("{name} has invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub request_timeout: Duration,
    pub seed_on_startup: bool,
    pub settings: ChallengeSettings,
    pub glm: GlmConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from any variable source. Unset means default,
    /// unparsable is an error.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let jwt_secret = lookup("WOULDYOU_JWT_SECRET").unwrap_or_default();
        if jwt_secret.trim().is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            return Err(ConfigError::InsecureSecret);
        }

        let text = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        let defaults = ChallengeSettings::default();
        let settings = ChallengeSettings {
            guest_daily_limit: parsed(&lookup, "WOULDYOU_GUEST_DAILY_LIMIT", defaults.guest_daily_limit)?,
            rotation_window_days: parsed(&lookup, "WOULDYOU_ROTATION_WINDOW_DAYS", defaults.rotation_window_days)?,
            ..defaults
        };

        Ok(Self {
            host: text("WOULDYOU_HOST", "0.0.0.0"),
            port: parsed(&lookup, "WOULDYOU_PORT", 8080)?,
            db_path: text("WOULDYOU_DB_PATH", "wouldyou.db").into(),
            jwt_secret,
            request_timeout: Duration::from_secs(parsed(&lookup, "WOULDYOU_REQUEST_TIMEOUT_SECS", 10)?),
            seed_on_startup: parsed(&lookup, "WOULDYOU_SEED_ON_STARTUP", true)?,
            settings,
            glm: GlmConfig {
                api_url: text("GLM_API_URL", DEFAULT_GLM_URL),
                api_key: text("GLM_API_KEY", ""),
                model: text("GLM_MODEL", "glm-5"),
            },
        })
    }

    pub fn addr(&self) -> Result<SocketAddr, ConfigError> {
        let raw = format!("{}:{}", self.host, self.port);
        raw.parse().map_err(|_| ConfigError::Invalid {
            name: "WOULDYOU_HOST",
            value: raw,
        })
    }
}

fn parsed<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply() {
        let cfg = config(&[("WOULDYOU_JWT_SECRET", "s3cret")]).unwrap();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.db_path, PathBuf::from("wouldyou.db"));
        assert_eq!(cfg.request_timeout, Duration::from_secs(10));
        assert!(cfg.seed_on_startup);
        assert_eq!(cfg.settings.guest_daily_limit, 3);
        assert_eq!(cfg.settings.rotation_window_days, 30);
        assert_eq!(cfg.glm.model, "glm-5");
        assert!(cfg.glm.api_key.is_empty());
        assert_eq!(cfg.addr().unwrap().to_string(), "0.0.0.0:8080");
    }

    #[test]
    fn placeholder_secret_is_rejected() {
        assert!(matches!(config(&[]), Err(ConfigError::InsecureSecret)));
        assert!(matches!(
            config(&[("WOULDYOU_JWT_SECRET", "dev-secret-change-me")]),
            Err(ConfigError::InsecureSecret)
        ));
    }

    #[test]
    fn overrides_and_bad_values() {
        let cfg = config(&[
            ("WOULDYOU_JWT_SECRET", "s3cret"),
            ("WOULDYOU_GUEST_DAILY_LIMIT", "5"),
            ("WOULDYOU_SEED_ON_STARTUP", "false"),
            ("WOULDYOU_PORT", "9000"),
        ])
        .unwrap();
        assert_eq!(cfg.settings.guest_daily_limit, 5);
        assert!(!cfg.seed_on_startup);
        assert_eq!(cfg.port, 9000);

        let err = config(&[("WOULDYOU_JWT_SECRET", "s3cret"), ("WOULDYOU_PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "WOULDYOU_PORT", .. }));
    }
}
