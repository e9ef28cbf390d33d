//! Gateway configuration from environment variables.

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use zyra_core::ServiceName;

use crate::breaker::BreakerConfig;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key}={value:?} is invalid: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Base URLs of the downstream services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoints {
    pub auth: String,
    pub admin: String,
    pub vendor: String,
    pub client: String,
}

impl ServiceEndpoints {
    pub fn get(&self, service: ServiceName) -> &str {
        match service {
            ServiceName::Auth => &self.auth,
            ServiceName::Admin => &self.admin,
            ServiceName::Vendor => &self.vendor,
            ServiceName::Client => &self.client,
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub port: u16,
    pub jwt_secret: String,
    pub redis_url: String,
    pub endpoints: ServiceEndpoints,
    pub call_timeout: Duration,
    pub revocation_timeout: Duration,
    pub breaker: BreakerConfig,
    /// Absent disables `POST /webhook`.
    pub stripe_webhook_secret: Option<String>,
    pub cors_allowed_origins: Vec<String>,
}

/// Origin of the client web app in local development.
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3005";

// Secrets stay out of logs.
impl core::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("port", &self.port)
            .field("jwt_secret", &"<redacted>")
            .field("redis_url", &self.redis_url)
            .field("endpoints", &self.endpoints)
            .field("call_timeout", &self.call_timeout)
            .field("revocation_timeout", &self.revocation_timeout)
            .field("breaker", &self.breaker)
            .field(
                "stripe_webhook_secret",
                &self.stripe_webhook_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .finish()
    }
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Lookup(&lookup);

        let endpoints = ServiceEndpoints {
            auth: env.required("AUTH_SVC_URL")?,
            admin: env.required("ADMIN_SVC_URL")?,
            vendor: env.required("VENDOR_SVC_URL")?,
            client: env.required("CLIENT_SVC_URL")?,
        };

        let reset_secs: u64 = env.parsed("BREAKER_RESET_INTERVAL_SECS", 10)?;
        let breaker = BreakerConfig::new(
            env.parsed("BREAKER_FAILURE_THRESHOLD", 3)?,
            env.parsed("BREAKER_PROBE_BUDGET", 5)?,
            Duration::from_secs(env.parsed("BREAKER_OPEN_TIMEOUT_SECS", 5)?),
        )
        .with_reset_interval(Some(Duration::from_secs(reset_secs)));

        Ok(Self {
            port: env.parsed("PORT", 3000)?,
            jwt_secret: env.required("JWT_SECRET")?,
            redis_url: env
                .optional("REDIS_URL")
                .unwrap_or_else(|| "redis://127.0.0.1:6379".to_string()),
            endpoints,
            call_timeout: Duration::from_millis(env.parsed("CALL_TIMEOUT_MS", 5000)?),
            revocation_timeout: Duration::from_millis(env.parsed("REVOCATION_TIMEOUT_MS", 500)?),
            breaker,
            stripe_webhook_secret: env.optional("STRIPE_WEBHOOK_SECRET"),
            cors_allowed_origins: env
                .optional("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|| DEFAULT_CORS_ORIGIN.to_string())
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect(),
        })
    }
}

struct Lookup<'a, F: Fn(&str) -> Option<String>>(&'a F);

impl<F: Fn(&str) -> Option<String>> Lookup<'_, F> {
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
    }

    fn required(&self, key: &'static str) -> Result<String, ConfigError> {
        self.optional(key).ok_or(ConfigError::Missing(key))
    }

    fn parsed<T>(&self, key: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: core::fmt::Display,
    {
        match self.optional(key) {
            None => Ok(default),
            Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
                key,
                reason: e.to_string(),
                value,
            }),
        }
    }
}
