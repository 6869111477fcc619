//! Queue and limiter configuration structures.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::core::AppResult;

/// Pass interval used when none is configured.
pub const DEFAULT_PASS_INTERVAL_MS: u64 = 100;

/// Token bucket burst used by [`QueueConfig::from_env`] when unset.
pub const DEFAULT_BURST: u32 = 1;

/// Rate limiter selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LimiterConfig {
    /// Token bucket refilled at `qps`, holding up to `burst` tokens.
    TokenBucket {
        /// Sustained tokens per second.
        qps: f64,
        /// Bucket capacity.
        burst: u32,
    },
    /// No throttling.
    Unlimited,
    /// Refuse everything (parks non-leaking passes until stopped).
    Never,
}

/// Configuration for one rate-limited timed queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// End a throttled pass early instead of blocking.
    #[serde(default)]
    pub leak: bool,
    /// Limiter gating each pass.
    pub limiter: LimiterConfig,
    /// How often a driver runs a pass, in milliseconds.
    #[serde(default = "default_pass_interval_ms")]
    pub pass_interval_ms: u64,
}

/// Named set of queues owned by one controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueSetConfig {
    /// Map of queue name to configuration.
    pub queues: HashMap<String, QueueConfig>,
}

const fn default_pass_interval_ms() -> u64 {
    DEFAULT_PASS_INTERVAL_MS
}

impl LimiterConfig {
    /// Validate limiter parameters.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::TokenBucket { qps, burst } => {
                if !qps.is_finite() || *qps <= 0.0 {
                    return Err(format!("qps must be a positive finite number, got {qps}"));
                }
                if *burst == 0 {
                    return Err("burst must be greater than 0".into());
                }
                Ok(())
            }
            Self::Unlimited | Self::Never => Ok(()),
        }
    }
}

impl QueueConfig {
    /// Unthrottled, blocking queue with the default pass interval.
    pub const fn unlimited() -> Self {
        Self {
            leak: false,
            limiter: LimiterConfig::Unlimited,
            pass_interval_ms: DEFAULT_PASS_INTERVAL_MS,
        }
    }

    /// Validate queue configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.pass_interval_ms == 0 {
            return Err("pass_interval_ms must be greater than 0".into());
        }
        self.limiter.validate()
    }

    /// Pass interval as a `Duration`.
    pub const fn pass_interval(&self) -> Duration {
        Duration::from_millis(self.pass_interval_ms)
    }

    /// Parse queue configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load configuration from the environment, after reading a `.env` file
    /// if one is present.
    ///
    /// - `TIMED_QUEUE_LEAK`: `true`/`false`, default `false`
    /// - `TIMED_QUEUE_QPS`: enables a token bucket when set
    /// - `TIMED_QUEUE_BURST`: token bucket burst, default [`DEFAULT_BURST`]
    /// - `TIMED_QUEUE_PASS_INTERVAL_MS`: default [`DEFAULT_PASS_INTERVAL_MS`]
    pub fn from_env() -> AppResult<Self> {
        // A missing .env file is not an error.
        let _ = dotenvy::dotenv();

        let leak = env_or("TIMED_QUEUE_LEAK", false)?;
        let limiter = match std::env::var("TIMED_QUEUE_QPS") {
            Ok(raw) => LimiterConfig::TokenBucket {
                qps: raw
                    .trim()
                    .parse()
                    .with_context(|| format!("TIMED_QUEUE_QPS is not a number: {raw:?}"))?,
                burst: env_or("TIMED_QUEUE_BURST", DEFAULT_BURST)?,
            },
            Err(_) => LimiterConfig::Unlimited,
        };
        let pass_interval_ms = env_or("TIMED_QUEUE_PASS_INTERVAL_MS", DEFAULT_PASS_INTERVAL_MS)?;

        let cfg = Self {
            leak,
            limiter,
            pass_interval_ms,
        };
        cfg.validate().map_err(anyhow::Error::msg)?;
        Ok(cfg)
    }
}

impl QueueSetConfig {
    /// Validate all queues and ensure at least one exists.
    pub fn validate(&self) -> Result<(), String> {
        if self.queues.is_empty() {
            return Err("at least one queue must be defined".into());
        }
        for (name, queue) in &self.queues {
            queue
                .validate()
                .map_err(|e| format!("queue `{name}` invalid: {e}"))?;
        }
        Ok(())
    }

    /// Parse a queue set from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }
}

fn env_or<T>(name: &str, default: T) -> AppResult<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{name} has an invalid value: {raw:?}")),
        Err(_) => Ok(default),
    }
}
