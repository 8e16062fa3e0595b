use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::services::live::PollerConfig;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{var} has invalid value {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// Environment configuration
/// Loads and validates environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub live_feed_urls: Vec<String>,
    pub live_feed_api_key: Option<String>,
    pub feed_concurrency: usize,
    pub feed_rps: u32,
    pub poll_interval: Duration,
    pub error_threshold: u32,
    pub recovery_threshold: u32,
    pub tournament_filter: Vec<String>,
    pub redis_url: String,
    pub publish_channel: String,
    pub publish_event: String,
    pub mail_service_url: String,
    pub alert_from: String,
    pub alert_to: String,
    pub http_timeout: Duration,
    pub status_addr: SocketAddr,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let live_feed_urls = split_list(&required("LIVE_FEED_URL")?);
        if live_feed_urls.is_empty() {
            return Err(ConfigError::Missing("LIVE_FEED_URL"));
        }

        Ok(Self {
            live_feed_urls,
            live_feed_api_key: get("LIVE_FEED_API_KEY"),
            feed_concurrency: parse_or(&get, "LIVE_FEED_CONCURRENCY", 4)?,
            feed_rps: parse_or(&get, "LIVE_FEED_RPS", 0)?,
            poll_interval: Duration::from_millis(parse_or(&get, "POLL_INTERVAL_MS", 2000)?),
            error_threshold: parse_or(&get, "ERROR_THRESHOLD", 10)?,
            recovery_threshold: parse_or(&get, "RECOVERY_THRESHOLD", 10)?,
            tournament_filter: get("TOURNAMENT_FILTER").map(|v| split_list(&v)).unwrap_or_default(),
            redis_url: get("REDIS_URL").unwrap_or_else(|| "redis://127.0.0.1/".to_string()),
            publish_channel: get("PUBLISH_CHANNEL").unwrap_or_else(|| "live-scores".to_string()),
            publish_event: get("PUBLISH_EVENT").unwrap_or_else(|| "score-update".to_string()),
            mail_service_url: required("MAIL_SERVICE_URL")?,
            alert_from: required("ALERT_FROM")?,
            alert_to: required("ALERT_TO")?,
            http_timeout: Duration::from_secs(parse_or(&get, "HTTP_TIMEOUT_SECS", 10)?),
            status_addr: parse_or(&get, "STATUS_ADDR", SocketAddr::from(([0, 0, 0, 0], 3000)))?,
        })
    }

    pub fn poller_config(&self) -> PollerConfig {
        PollerConfig {
            interval: self.poll_interval,
            error_threshold: self.error_threshold,
            recovery_threshold: self.recovery_threshold,
            channel: self.publish_channel.clone(),
            event: self.publish_event.clone(),
            alert_from: self.alert_from.clone(),
            alert_to: self.alert_to.clone(),
        }
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_or<T, G>(get: &G, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(var) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
    }
}
