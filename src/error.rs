//! Error types for data.gov.in API calls.
//!
//! This module provides a closed error taxonomy that distinguishes caller
//! mistakes (bad parameters, missing credentials) from upstream conditions
//! (missing resources, rate limiting, server failures). Every error knows
//! whether it is transient, which drives the retry layer.

use std::time::Duration;

use http::StatusCode;

/// The main error type for data.gov.in API calls.
///
/// Transient variants (timeouts, connection failures, 5xx responses, and
/// upstream rate limiting) are retried automatically by the client; all
/// other variants fail the call immediately.
///
/// # Examples
///
/// ```no_run
/// use datagovin::{Client, Config, Error, FetchParams};
///
/// # async fn example() -> Result<(), Error> {
/// let client = Client::new(Config::default())?;
///
/// match client.fetch("9ef84268-d588-465a-a308-a864a43d0070", &FetchParams::default()).await {
///     Ok(response) => println!("{} records", response.records.len()),
///     Err(Error::ResourceNotFound { resource_id }) => {
///         eprintln!("No such resource: {resource_id}");
///     }
///     Err(Error::RetriesExhausted { attempts, last_error }) => {
///         eprintln!("Gave up after {attempts} attempts: {last_error}");
///     }
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A request parameter failed validation before any network activity.
    ///
    /// Validation happens first: an invalid parameter never consults the
    /// cache, the rate limiter, or the upstream service.
    #[error("Invalid parameter `{param}`: {reason}")]
    InvalidParameter {
        /// The offending parameter name
        param: &'static str,
        /// Why it was rejected
        reason: String,
    },

    /// No API key is configured and the call required a network fetch.
    ///
    /// Cache hits are still served without a key; only the miss path needs
    /// one.
    #[error("No API key configured; set DATA_GOV_IN_API_KEY or Config::api_key")]
    MissingApiKey,

    /// The upstream service rejected the configured API key (401 or 403).
    #[error("Authentication failed ({status}): {message}")]
    Authentication {
        /// The HTTP status code (401 or 403)
        status: StatusCode,
        /// The raw response body
        message: String,
    },

    /// The requested resource does not exist upstream (404).
    #[error("Resource `{resource_id}` not found")]
    ResourceNotFound {
        /// The resource identifier that was requested
        resource_id: String,
    },

    /// The upstream service rate-limited the request (429).
    ///
    /// This is distinct from the local [`RateLimiter`](crate::RateLimiter),
    /// which exists precisely to avoid ever seeing this error. When upstream
    /// supplies a `Retry-After` header, the hint is carried here and the
    /// retry layer waits that long instead of its computed backoff.
    #[error("Upstream rate limit exceeded")]
    RateLimited {
        /// Parsed `Retry-After` hint, when the response carried one
        retry_after: Option<Duration>,
    },

    /// The upstream service returned a non-2xx status not covered above.
    ///
    /// 5xx statuses are transient and retried; 4xx statuses are not.
    #[error("Upstream error {status}: {message}")]
    Upstream {
        /// The HTTP status code
        status: StatusCode,
        /// The raw response body
        message: String,
    },

    /// A network-level error occurred (connection failed, timeout, DNS
    /// failure, etc.).
    ///
    /// Timeouts and connection failures are transient; anything else at
    /// this layer (for example a request that could not be constructed) is
    /// not worth repeating.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A 2xx response body could not be decoded as a dataset payload.
    ///
    /// Decodable-but-partial payloads are surfaced as-is; this fires only
    /// when the body is not a JSON object at all.
    #[error("Failed to decode response (status {status}): {reason}")]
    Decode {
        /// The HTTP status code of the response
        status: StatusCode,
        /// The serde error message
        reason: String,
    },

    /// Invalid configuration was provided.
    ///
    /// Raised by [`Config::validate`](crate::Config::validate) and by
    /// client construction, never mid-call.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Every retry attempt failed with a transient error.
    ///
    /// # Fields
    ///
    /// * `attempts` - The total number of attempts made (initial + retries)
    /// * `last_error` - The final transient error before giving up
    #[error("Retries exhausted after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        /// The total number of attempts made
        attempts: u32,
        /// The last error encountered
        last_error: Box<Error>,
    },
}

impl Error {
    /// Returns `true` if this error is transient and worth retrying.
    ///
    /// Timeouts, connection failures, upstream 5xx responses, and upstream
    /// rate limiting are transient. Validation, authentication, missing
    /// resources, and decode failures are permanent.
    ///
    /// # Examples
    ///
    /// ```
    /// use datagovin::Error;
    /// use http::StatusCode;
    ///
    /// let err = Error::Upstream {
    ///     status: StatusCode::INTERNAL_SERVER_ERROR,
    ///     message: "server error".to_string(),
    /// };
    /// assert!(err.is_transient());
    ///
    /// let err = Error::Upstream {
    ///     status: StatusCode::BAD_REQUEST,
    ///     message: "bad request".to_string(),
    /// };
    /// assert!(!err.is_transient());
    /// ```
    pub fn is_transient(&self) -> bool {
        match self {
            Error::RateLimited { .. } => true,
            Error::Upstream { status, .. } => status.is_server_error(),
            Error::Network(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    /// Returns the upstream `Retry-After` hint, if this error carries one.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Error::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// Returns the HTTP status code if this error has one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Authentication { status, .. } => Some(*status),
            Error::Upstream { status, .. } => Some(*status),
            Error::Decode { status, .. } => Some(*status),
            Error::ResourceNotFound { .. } => Some(StatusCode::NOT_FOUND),
            Error::RateLimited { .. } => Some(StatusCode::TOO_MANY_REQUESTS),
            _ => None,
        }
    }

    /// Returns a stable snake_case tag naming this error's kind.
    ///
    /// Tool-dispatch hosts embed the tag in their structured error results
    /// so callers can branch without parsing messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidParameter { .. } => "parameter_validation",
            Error::MissingApiKey | Error::Authentication { .. } => "authentication",
            Error::ResourceNotFound { .. } => "resource_not_found",
            Error::RateLimited { .. } => "rate_limit_exceeded",
            Error::Upstream { .. } => "upstream",
            Error::Network(_) => "network",
            Error::Decode { .. } => "decode",
            Error::Configuration(_) => "configuration",
            Error::RetriesExhausted { .. } => "retries_exhausted",
        }
    }
}

/// A specialized `Result` type for data.gov.in API calls.
///
/// This is a convenience alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
