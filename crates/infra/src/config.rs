//! Configuration loading and representation.
//!
//! Sources, lowest to highest precedence:
//! 1. Built-in defaults
//! 2. `hosteldesk.toml` in the working directory (optional)
//! 3. `HOSTELDESK__<SECTION>__<KEY>` environment variables (`.env` honoured)

use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use hosteldesk_observability::LogConfig;

use crate::retry::{BackoffStrategy, RetryPolicy};

pub const DEV_SIGNING_SECRET: &str = "hosteldesk-dev-signing-secret";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub identity: IdentityConfig,
    pub app: AppUrls,
    #[serde(default)]
    pub mail: MailConfig,
    #[serde(default)]
    pub log: LogConfig,
    pub retry: RetryConfig,
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    /// HS256 secret shared with the token issuer.
    pub signing_secret: String,
    /// Expected token audience.
    pub project_id: String,
    pub issuer: String,
    pub token_ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppUrls {
    /// Public base URL of the web app.
    pub base_url: String,
}

impl AppUrls {
    /// Where the password-reset flow lands.
    pub fn reset_password_url(&self) -> String {
        format!("{}/reset-password", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    /// Notification endpoint; messages are only logged when unset.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Per-request budget for the notification endpoint.
    #[serde(default = "default_mail_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_ms: default_mail_timeout_ms(),
        }
    }
}

impl MailConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_mail_timeout_ms() -> u64 {
    10_000
}

/// First admin seeded at startup, so an empty directory can be managed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BootstrapConfig {
    #[serde(default)]
    pub admin_email: Option<String>,
    #[serde(default)]
    pub admin_name: Option<String>,
    /// Print a bearer token for the seeded admin to stderr once at startup.
    #[serde(default)]
    pub print_token: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub lookup_timeout_secs: u64,
    pub write_timeout_secs: u64,
    /// `exponential`, `linear` or `fixed`.
    #[serde(default)]
    pub strategy: BackoffStrategy,
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            base_delay: Duration::from_millis(self.base_delay_ms),
            strategy: self.strategy,
            ..RetryPolicy::default()
        }
        .with_timeouts(
            Duration::from_secs(self.lookup_timeout_secs),
            Duration::from_secs(self.write_timeout_secs),
        )
    }
}

impl AppConfig {
    /// Load from defaults, `hosteldesk.toml` and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        if Path::new(".env").exists() {
            if let Err(e) = dotenvy::dotenv() {
                tracing::warn!(error = %e, "failed to read .env");
            }
        }
        Self::build(
            Some("hosteldesk"),
            Environment::with_prefix("HOSTELDESK")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
    }

    /// Defaults only; used by tests and local tooling.
    pub fn defaults() -> Result<Self, ConfigError> {
        defaults_builder()?.build()?.try_deserialize()
    }

    fn build(file: Option<&str>, env: Environment) -> Result<Self, ConfigError> {
        let mut builder = defaults_builder()?;
        if let Some(name) = file {
            builder = builder.add_source(File::with_name(name).required(false));
        }
        builder.add_source(env).build()?.try_deserialize()
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.identity.signing_secret == DEV_SIGNING_SECRET
    }
}

fn defaults_builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
    let defaults = RetryPolicy::default();
    Config::builder()
        .set_default("http.bind", "127.0.0.1:8080")?
        .set_default("identity.signing_secret", DEV_SIGNING_SECRET)?
        .set_default("identity.project_id", "hosteldesk-dev")?
        .set_default("identity.issuer", "hosteldesk")?
        .set_default("identity.token_ttl_secs", 3600)?
        .set_default("app.base_url", "http://localhost:3001")?
        .set_default("mail.timeout_ms", default_mail_timeout_ms())?
        .set_default("log.level", "info")?
        .set_default("log.format", "json")?
        .set_default("retry.max_attempts", defaults.max_attempts)?
        .set_default("retry.base_delay_ms", defaults.base_delay.as_millis() as u64)?
        .set_default("retry.lookup_timeout_secs", defaults.lookup_timeout.as_secs())?
        .set_default("retry.write_timeout_secs", defaults.write_timeout.as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_cover_every_section() {
        let config = AppConfig::defaults().unwrap();
        assert_eq!(config.http.bind, "127.0.0.1:8080");
        assert!(config.uses_dev_secret());
        assert!(config.mail.endpoint.is_none());
        assert!(config.bootstrap.admin_email.is_none());
        assert!(!config.bootstrap.print_token);
        assert_eq!(config.mail.timeout(), Duration::from_secs(10));
        assert_eq!(config.retry.policy().max_attempts, 3);
        assert_eq!(config.retry.policy().strategy, BackoffStrategy::Exponential);
        assert_eq!(config.retry.policy().lookup_timeout, Duration::from_secs(30));
        assert_eq!(
            config.app.reset_password_url(),
            "http://localhost:3001/reset-password"
        );
    }

    #[test]
    fn environment_overrides_defaults() {
        let vars: HashMap<String, String> = [
            ("HOSTELDESK__HTTP__BIND", "0.0.0.0:9000"),
            ("HOSTELDESK__MAIL__ENDPOINT", "http://mailer.internal/send"),
            ("HOSTELDESK__RETRY__MAX_ATTEMPTS", "5"),
            ("HOSTELDESK__LOG__FORMAT", "pretty"),
            ("HOSTELDESK__RETRY__STRATEGY", "linear"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let env = Environment::with_prefix("HOSTELDESK")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
            .source(Some(vars));
        let config = AppConfig::build(None, env).unwrap();

        assert_eq!(config.http.bind, "0.0.0.0:9000");
        assert_eq!(config.mail.endpoint.as_deref(), Some("http://mailer.internal/send"));
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.policy().strategy, BackoffStrategy::Linear);
        assert_eq!(config.log.format, hosteldesk_observability::LogFormat::Pretty);
    }
}
