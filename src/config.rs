//! Process configuration, read from the environment (and `.env`).
//!
//! Duration values accept bare numbers (seconds) or strings with units such
//! as `1.5s`, `250ms` or `2m`.

use crate::feed::RefreshSettings;
use crate::feed::refresh::{DEFAULT_CACHE_TTL, DEFAULT_REFRESH_INTERVAL, MAX_STORIES};
use crate::source::hn::{DEFAULT_BASE_URL, HackerNewsConfig};
use crate::source::pool::DEFAULT_POOL_SIZE;
use anyhow::{Context, ensure};
use figment::Figment;
use figment::providers::Env;
use fundu::DurationParser;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::num::NonZeroU32;
use std::time::Duration;

/// Where stories come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// The Hacker News Firebase API.
    #[default]
    Live,
    /// Fixed synthetic data with an artificial delay per call.
    Static,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Grace period for services to stop after a shutdown signal.
    #[serde(default = "default_shutdown_timeout", deserialize_with = "duration")]
    pub shutdown_timeout: Duration,

    #[serde(default = "default_refresh_interval", deserialize_with = "duration")]
    pub refresh_interval: Duration,
    #[serde(default = "default_cache_ttl", deserialize_with = "duration")]
    pub cache_ttl: Duration,
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    #[serde(default = "default_max_stories")]
    pub max_stories: usize,

    #[serde(default)]
    pub story_source: SourceKind,
    /// Per-call latency of the static source.
    #[serde(default = "default_static_delay", deserialize_with = "duration")]
    pub static_delay: Duration,
    #[serde(default = "default_hn_base_url")]
    pub hn_base_url: String,
    #[serde(default = "default_request_timeout", deserialize_with = "duration")]
    pub request_timeout: Duration,
    /// Outbound requests per second, per pooled client.
    #[serde(default)]
    pub source_rate_limit: Option<NonZeroU32>,
}

fn default_log_level() -> String {
    "info".to_owned()
}

fn default_port() -> u16 {
    8080
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(8)
}

fn default_refresh_interval() -> Duration {
    DEFAULT_REFRESH_INTERVAL
}

fn default_cache_ttl() -> Duration {
    DEFAULT_CACHE_TTL
}

fn default_pool_size() -> usize {
    DEFAULT_POOL_SIZE
}

fn default_max_stories() -> usize {
    MAX_STORIES
}

fn default_static_delay() -> Duration {
    Duration::from_millis(100)
}

fn default_hn_base_url() -> String {
    DEFAULT_BASE_URL.to_owned()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(10)
}

impl Config {
    /// Read configuration from environment variables.
    pub fn load() -> Result<Self, anyhow::Error> {
        let config: Config = Figment::new()
            .merge(Env::raw())
            .extract()
            .context("Failed to load config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        ensure!(self.pool_size > 0, "POOL_SIZE must be at least 1");
        ensure!(self.max_stories > 0, "MAX_STORIES must be at least 1");
        Ok(())
    }

    pub fn refresh_settings(&self) -> RefreshSettings {
        RefreshSettings {
            interval: self.refresh_interval,
            cache_ttl: self.cache_ttl,
            max_stories: self.max_stories,
        }
    }

    pub fn hacker_news(&self) -> HackerNewsConfig {
        HackerNewsConfig {
            base_url: self.hn_base_url.clone(),
            request_timeout: self.request_timeout,
            rate_limit: self.source_rate_limit,
        }
    }
}

fn duration<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    deserializer.deserialize_any(DurationVisitor)
}

struct DurationVisitor;

impl Visitor<'_> for DurationVisitor {
    type Value = Duration;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a number of seconds or a duration string like \"1.5s\"")
    }

    fn visit_u64<E: de::Error>(self, secs: u64) -> Result<Duration, E> {
        Ok(Duration::from_secs(secs))
    }

    fn visit_i64<E: de::Error>(self, secs: i64) -> Result<Duration, E> {
        u64::try_from(secs)
            .map(Duration::from_secs)
            .map_err(|_| E::invalid_value(de::Unexpected::Signed(secs), &self))
    }

    fn visit_f64<E: de::Error>(self, secs: f64) -> Result<Duration, E> {
        Duration::try_from_secs_f64(secs)
            .map_err(|_| E::invalid_value(de::Unexpected::Float(secs), &self))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Duration, E> {
        let parsed = DurationParser::with_all_time_units()
            .parse(value.trim())
            .map_err(|e| E::custom(format!("invalid duration '{value}': {e}")))?;
        Duration::try_from(parsed).map_err(|e| E::custom(format!("invalid duration '{value}': {e}")))
    }
}
