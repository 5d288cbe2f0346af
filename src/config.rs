//! Client configuration.
//!
//! [`Config`] is a plain settings structure: build one directly with struct
//! syntax over [`Config::default`], or load overrides from the
//! `DATA_GOV_IN_*` environment variables with [`Config::from_env`].
//! Validation happens once, at client construction, so misconfiguration
//! fails fast instead of surfacing mid-call.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;
use url::Url;

use crate::error::{Error, Result};

/// Settings consumed by [`Client::new`](crate::Client::new).
///
/// All fields are public. The defaults match the upstream service's
/// documented limits: 100 calls per 60 seconds, one-hour response TTL, and
/// pages of 10 records capped at 100.
///
/// # Examples
///
/// ```
/// use datagovin::Config;
///
/// let config = Config {
///     api_key: Some("my-key".to_string()),
///     default_limit: 25,
///     ..Config::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone)]
pub struct Config {
    /// API key sent as the `api-key` query parameter.
    ///
    /// Cache hits are served without one; only network fetches require it.
    pub api_key: Option<String>,
    /// Base URL of the upstream service.
    pub base_url: String,
    /// Bound on each individual HTTP attempt.
    pub timeout: Duration,
    /// Calls admitted per [`rate_limit_period`](Config::rate_limit_period).
    pub rate_limit_calls: usize,
    /// Length of the sliding rate-limit window.
    pub rate_limit_period: Duration,
    /// Whether responses are cached at all.
    pub cache_enabled: bool,
    /// Time-to-live for cached responses.
    pub cache_ttl: Duration,
    /// Maximum number of cached responses held at once.
    pub cache_max_size: usize,
    /// Retries after the first failed attempt.
    pub max_retries: u32,
    /// Backoff before the first retry; doubles for each one after.
    pub initial_retry_delay: Duration,
    /// Upper bound on any single backoff wait.
    pub max_retry_delay: Duration,
    /// Scale each backoff by a random 50-100% factor.
    ///
    /// Off by default so the backoff schedule is exact and testable.
    pub retry_jitter: bool,
    /// Record count used when a request does not specify a limit.
    pub default_limit: u64,
    /// Largest accepted limit (and page size).
    pub max_limit: u64,
    /// Value of the `User-Agent` header on every request.
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_key: None,
            base_url: "https://api.data.gov.in".to_string(),
            timeout: Duration::from_secs(30),
            rate_limit_calls: 100,
            rate_limit_period: Duration::from_secs(60),
            cache_enabled: true,
            cache_ttl: Duration::from_secs(3600),
            cache_max_size: 1000,
            max_retries: 3,
            initial_retry_delay: Duration::from_secs(1),
            max_retry_delay: Duration::from_secs(30),
            retry_jitter: false,
            default_limit: 10,
            max_limit: 100,
            user_agent: concat!("datagovin/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Config {
    /// Builds a configuration from `DATA_GOV_IN_*` environment variables.
    ///
    /// Unset variables fall back to the defaults; set-but-unparsable values
    /// are reported as [`Error::Configuration`] rather than silently
    /// ignored. Recognized variables:
    ///
    /// * `DATA_GOV_IN_API_KEY`
    /// * `DATA_GOV_IN_BASE_URL`
    /// * `DATA_GOV_IN_TIMEOUT` (seconds)
    /// * `DATA_GOV_IN_RATE_LIMIT_CALLS`
    /// * `DATA_GOV_IN_RATE_LIMIT_PERIOD` (seconds)
    /// * `DATA_GOV_IN_CACHE_ENABLED` (`true`/`false`)
    /// * `DATA_GOV_IN_CACHE_TTL` (seconds)
    /// * `DATA_GOV_IN_CACHE_MAX_SIZE`
    /// * `DATA_GOV_IN_MAX_RETRIES`
    /// * `DATA_GOV_IN_RETRY_DELAY` (seconds, fractional allowed)
    /// * `DATA_GOV_IN_DEFAULT_LIMIT`
    /// * `DATA_GOV_IN_MAX_LIMIT`
    pub fn from_env() -> Result<Self> {
        let defaults = Config::default();
        Ok(Config {
            api_key: env::var("DATA_GOV_IN_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),
            base_url: env::var("DATA_GOV_IN_BASE_URL").unwrap_or(defaults.base_url),
            timeout: Duration::from_secs(parse_var("DATA_GOV_IN_TIMEOUT", 30)?),
            rate_limit_calls: parse_var("DATA_GOV_IN_RATE_LIMIT_CALLS", defaults.rate_limit_calls)?,
            rate_limit_period: Duration::from_secs(parse_var("DATA_GOV_IN_RATE_LIMIT_PERIOD", 60)?),
            cache_enabled: flag_var("DATA_GOV_IN_CACHE_ENABLED", defaults.cache_enabled),
            cache_ttl: Duration::from_secs(parse_var("DATA_GOV_IN_CACHE_TTL", 3600)?),
            cache_max_size: parse_var("DATA_GOV_IN_CACHE_MAX_SIZE", defaults.cache_max_size)?,
            max_retries: parse_var("DATA_GOV_IN_MAX_RETRIES", defaults.max_retries)?,
            initial_retry_delay: secs_var("DATA_GOV_IN_RETRY_DELAY", defaults.initial_retry_delay)?,
            max_retry_delay: defaults.max_retry_delay,
            retry_jitter: defaults.retry_jitter,
            default_limit: parse_var("DATA_GOV_IN_DEFAULT_LIMIT", defaults.default_limit)?,
            max_limit: parse_var("DATA_GOV_IN_MAX_LIMIT", defaults.max_limit)?,
            user_agent: defaults.user_agent,
        })
    }

    /// Checks every setting the rest of the crate relies on.
    ///
    /// [`Client::new`](crate::Client::new) calls this, so the limiter and
    /// cache never see a zero window, zero capacity, or zero TTL at call
    /// time.
    pub fn validate(&self) -> Result<()> {
        if self.timeout == Duration::ZERO {
            return Err(Error::Configuration("timeout must be positive".into()));
        }
        if self.rate_limit_calls == 0 {
            return Err(Error::Configuration(
                "rate_limit_calls must be at least 1".into(),
            ));
        }
        if self.rate_limit_period == Duration::ZERO {
            return Err(Error::Configuration(
                "rate_limit_period must be positive".into(),
            ));
        }
        if self.cache_enabled {
            if self.cache_ttl == Duration::ZERO {
                return Err(Error::Configuration(
                    "cache_ttl must be positive when the cache is enabled".into(),
                ));
            }
            if self.cache_max_size == 0 {
                return Err(Error::Configuration(
                    "cache_max_size must be at least 1 when the cache is enabled".into(),
                ));
            }
        }
        if self.initial_retry_delay > self.max_retry_delay {
            return Err(Error::Configuration(
                "initial_retry_delay cannot exceed max_retry_delay".into(),
            ));
        }
        if self.default_limit == 0 || self.default_limit > self.max_limit {
            return Err(Error::Configuration(format!(
                "default_limit must be between 1 and {}",
                self.max_limit
            )));
        }
        self.parsed_base_url()?;
        Ok(())
    }

    pub(crate) fn parsed_base_url(&self) -> Result<Url> {
        let url = Url::parse(&self.base_url)
            .map_err(|e| Error::Configuration(format!("base_url: {e}")))?;
        if url.cannot_be_a_base() {
            return Err(Error::Configuration(
                "base_url must be an absolute http(s) URL".into(),
            ));
        }
        Ok(url)
    }

    pub(crate) fn summary(&self) -> ConfigSummary {
        ConfigSummary {
            base_url: self.base_url.clone(),
            timeout_secs: self.timeout.as_secs(),
            rate_limit: format!(
                "{} calls per {}s",
                self.rate_limit_calls,
                self.rate_limit_period.as_secs()
            ),
            cache_enabled: self.cache_enabled,
            cache_ttl_secs: self.cache_ttl.as_secs(),
            cache_max_size: self.cache_max_size,
            max_retries: self.max_retries,
            default_limit: self.default_limit,
            max_limit: self.max_limit,
        }
    }
}

// The API key must not leak through debug logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &self.api_key.as_ref().map(|_| "***REDACTED***"))
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("rate_limit_calls", &self.rate_limit_calls)
            .field("rate_limit_period", &self.rate_limit_period)
            .field("cache_enabled", &self.cache_enabled)
            .field("cache_ttl", &self.cache_ttl)
            .field("cache_max_size", &self.cache_max_size)
            .field("max_retries", &self.max_retries)
            .field("initial_retry_delay", &self.initial_retry_delay)
            .field("max_retry_delay", &self.max_retry_delay)
            .field("retry_jitter", &self.retry_jitter)
            .field("default_limit", &self.default_limit)
            .field("max_limit", &self.max_limit)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

/// Configuration snapshot embedded in [`ServerInfo`](crate::ServerInfo).
///
/// Durations are flattened to whole seconds and the API key is omitted
/// entirely; its presence is reported separately.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigSummary {
    pub base_url: String,
    pub timeout_secs: u64,
    pub rate_limit: String,
    pub cache_enabled: bool,
    pub cache_ttl_secs: u64,
    pub cache_max_size: usize,
    pub max_retries: u32,
    pub default_limit: u64,
    pub max_limit: u64,
}

fn parse_var<T>(name: &'static str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Configuration(format!("{name}: {e} (value {raw:?})"))),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(e) => Err(Error::Configuration(format!("{name}: {e}"))),
    }
}

fn secs_var(name: &'static str, default: Duration) -> Result<Duration> {
    match env::var(name) {
        Ok(raw) => {
            let secs: f64 = raw
                .trim()
                .parse()
                .map_err(|e| Error::Configuration(format!("{name}: {e} (value {raw:?})")))?;
            Duration::try_from_secs_f64(secs)
                .map_err(|e| Error::Configuration(format!("{name}: {e} (value {raw:?})")))
        }
        Err(env::VarError::NotPresent) => Ok(default),
        Err(e) => Err(Error::Configuration(format!("{name}: {e}"))),
    }
}

fn flag_var(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(raw) => raw.trim().eq_ignore_ascii_case("true"),
        Err(_) => default,
    }
}
