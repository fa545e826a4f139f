//! Configuration management

use std::str::FromStr;

use anyhow::{self, Context, Result};

use crate::services::explanation::ExplanationConfig;
use crate::services::optimizer::OptimizerSettings;
use crate::services::tour::DEFAULT_MAX_PASSES;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// NATS server URL
    pub nats_url: String,

    /// Optional NATS credentials, used only when both are set
    pub nats_user: Option<String>,
    pub nats_password: Option<String>,

    /// Prefix for all subjects (`<prefix>.ping`, `<prefix>.route.optimize`)
    pub subject_prefix: String,

    /// Explanation backend (Mistral when an API key is set)
    pub explanation: ExplanationConfig,

    /// Cap on 2-opt scan passes per request
    pub two_opt_max_passes: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let nats_url = std::env::var("NATS_URL")
            .unwrap_or_else(|_| "nats://localhost:4222".to_string());
        let nats_user = std::env::var("NATS_USER").ok().filter(|u| !u.is_empty());
        let nats_password = std::env::var("NATS_PASSWORD").ok();

        let subject_prefix = std::env::var("ROUTEOPT_SUBJECT_PREFIX")
            .unwrap_or_else(|_| "routeopt".to_string());
        if subject_prefix.is_empty() {
            anyhow::bail!("ROUTEOPT_SUBJECT_PREFIX must not be empty");
        }

        let defaults = ExplanationConfig::default();
        let explanation = ExplanationConfig {
            api_key: std::env::var("MISTRAL_API_KEY").ok().filter(|k| !k.is_empty()),
            base_url: std::env::var("MISTRAL_BASE_URL").unwrap_or(defaults.base_url),
            model: std::env::var("MISTRAL_MODEL").unwrap_or(defaults.model),
            timeout_seconds: parse_var("EXPLANATION_TIMEOUT_SECS", defaults.timeout_seconds)?,
            max_retries: parse_var("EXPLANATION_MAX_RETRIES", defaults.max_retries)?,
            fallback_enabled: parse_var("EXPLANATION_FALLBACK", defaults.fallback_enabled)?,
        };

        if explanation.timeout_seconds == 0 {
            anyhow::bail!("EXPLANATION_TIMEOUT_SECS must be at least 1");
        }

        let two_opt_max_passes = parse_var("TWO_OPT_MAX_PASSES", DEFAULT_MAX_PASSES)?;

        if explanation.api_key.is_none() {
            tracing::warn!("MISTRAL_API_KEY not set, explanations will use the local template");
        }

        Ok(Self {
            nats_url,
            nats_user,
            nats_password,
            subject_prefix,
            explanation,
            two_opt_max_passes,
        })
    }

    /// User and password for NATS, if both were configured
    pub fn nats_credentials(&self) -> Option<(&str, &str)> {
        match (self.nats_user.as_deref(), self.nats_password.as_deref()) {
            (Some(user), Some(password)) => Some((user, password)),
            _ => None,
        }
    }

    pub fn optimizer_settings(&self) -> OptimizerSettings {
        OptimizerSettings {
            max_passes: self.two_opt_max_passes,
            fallback_enabled: self.explanation.fallback_enabled,
        }
    }

    pub fn subject(&self, name: &str) -> String {
        format!("{}.{}", self.subject_prefix, name)
    }
}

/// Parse an optional environment variable, falling back to `default` when unset
fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {:?}", name, raw)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_var_uses_default_when_unset() {
        std::env::remove_var("ROUTEOPT_TEST_UNSET");
        let value: u64 = parse_var("ROUTEOPT_TEST_UNSET", 42).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_parse_var_parses_value() {
        std::env::set_var("ROUTEOPT_TEST_PASSES", " 250 ");
        let value: usize = parse_var("ROUTEOPT_TEST_PASSES", 1000).unwrap();
        assert_eq!(value, 250);
        std::env::remove_var("ROUTEOPT_TEST_PASSES");
    }

    #[test]
    fn test_parse_var_rejects_garbage() {
        std::env::set_var("ROUTEOPT_TEST_BOOL", "maybe");
        let result: Result<bool> = parse_var("ROUTEOPT_TEST_BOOL", true);
        assert!(result.unwrap_err().to_string().contains("ROUTEOPT_TEST_BOOL"));
        std::env::remove_var("ROUTEOPT_TEST_BOOL");
    }

    fn config() -> Config {
        Config {
            nats_url: "nats://localhost:4222".to_string(),
            nats_user: None,
            nats_password: None,
            subject_prefix: "routeopt".to_string(),
            explanation: ExplanationConfig::default(),
            two_opt_max_passes: DEFAULT_MAX_PASSES,
        }
    }

    #[test]
    fn test_subject_uses_prefix() {
        let config = config();
        assert_eq!(config.subject("route.optimize"), "routeopt.route.optimize");
        assert_eq!(config.optimizer_settings().max_passes, 1000);
        assert!(config.optimizer_settings().fallback_enabled);
    }

    #[test]
    fn test_nats_credentials_need_user_and_password() {
        let mut config = config();
        assert_eq!(config.nats_credentials(), None);

        config.nats_user = Some("worker".to_string());
        assert_eq!(config.nats_credentials(), None);

        config.nats_password = Some("secret".to_string());
        assert_eq!(config.nats_credentials(), Some(("worker", "secret")));
    }

    #[test]
    #[ignore] // requires --test-threads=1 due to env var race
    fn test_config_defaults() {
        for var in [
            "NATS_URL",
            "NATS_USER",
            "NATS_PASSWORD",
            "ROUTEOPT_SUBJECT_PREFIX",
            "MISTRAL_API_KEY",
            "EXPLANATION_TIMEOUT_SECS",
            "TWO_OPT_MAX_PASSES",
        ] {
            std::env::remove_var(var);
        }

        let config = Config::from_env().unwrap();
        assert_eq!(config.nats_url, "nats://localhost:4222");
        assert!(config.nats_credentials().is_none());
        assert_eq!(config.subject_prefix, "routeopt");
        assert!(config.explanation.api_key.is_none());
        assert_eq!(config.explanation.timeout_seconds, 20);
        assert_eq!(config.two_opt_max_passes, 1000);
    }
}
