//! The data.gov.in API client.
//!
//! [`Client`] is the single network-touching component: it validates
//! request parameters, consults the response cache, takes a rate-limiter
//! slot, and runs the HTTP call under the retry policy. Everything above it
//! (pagination, summaries, filtering) is derived from the responses it
//! returns.

use std::collections::BTreeMap;
use std::sync::Arc;

use http::{HeaderMap, HeaderValue};
use serde::Serialize;
use url::Url;

use crate::cache::{self, CacheStatistics, ResponseCache};
use crate::config::{Config, ConfigSummary};
use crate::error::{Error, Result};
use crate::params::FetchParams;
use crate::rate_limit::{self, RateLimiter};
use crate::retry::RetryPolicy;
use crate::types::DatasetResponse;
use crate::views::{
    self, DatasetSlice, DatasetSummary, FieldSchema, FilteredDataset, PaginatedDataset,
};

/// A caching, rate-limited client for the data.gov.in API.
///
/// The client is cheap to clone and designed to be shared: all clones use
/// the same connection pool, response cache, and rate-limiter window.
///
/// # Examples
///
/// ```no_run
/// use datagovin::{Client, Config, FetchParams};
///
/// # async fn example() -> Result<(), datagovin::Error> {
/// let client = Client::new(Config {
///     api_key: Some("your-key".to_string()),
///     ..Config::default()
/// })?;
///
/// let slice = client
///     .get_dataset(
///         "9ef84268-d588-465a-a308-a864a43d0070",
///         &FetchParams::new().with_limit(5),
///     )
///     .await?;
/// println!("{} of {} records", slice.records.len(), slice.total_records);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: reqwest::Client,
    base_url: Url,
    cache: Option<ResponseCache>,
    limiter: RateLimiter,
    retry: RetryPolicy,
    config: Config,
}

impl Client {
    /// Builds a client from validated settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] when [`Config::validate`] rejects
    /// the settings or the HTTP client cannot be constructed.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let base_url = config.parsed_base_url()?;

        let mut headers = HeaderMap::new();
        headers.insert(
            http::header::USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|e| Error::Configuration(format!("user_agent: {e}")))?,
        );
        headers.insert(
            http::header::ACCEPT,
            HeaderValue::from_static("application/json"),
        );

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Configuration(format!("failed to build HTTP client: {e}")))?;

        if config.api_key.is_none() {
            tracing::warn!("no API key configured, only cached responses can be served");
        }

        let cache = config
            .cache_enabled
            .then(|| ResponseCache::new(config.cache_max_size));
        let limiter = RateLimiter::new(config.rate_limit_calls, config.rate_limit_period);
        let retry = RetryPolicy {
            max_retries: config.max_retries,
            initial_delay: config.initial_retry_delay,
            max_delay: config.max_retry_delay,
            jitter: config.retry_jitter,
        };

        Ok(Client {
            inner: Arc::new(ClientInner {
                http,
                base_url,
                cache,
                limiter,
                retry,
                config,
            }),
        })
    }

    /// Builds a client from `DATA_GOV_IN_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Client::new(Config::from_env()?)
    }

    /// The settings this client was built with.
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Fetches one window of records for a resource.
    ///
    /// The pipeline is: validate parameters, consult the cache, and on a
    /// miss take a rate-limiter slot and run the HTTP call under the retry
    /// policy. Successful responses are cached for the configured TTL; a
    /// cache hit returns without touching the network or the limiter.
    /// Failures are never cached.
    pub async fn fetch(&self, resource_id: &str, params: &FetchParams) -> Result<DatasetResponse> {
        let limit = self.resolve_limit(params.limit)?;
        self.fetch_window(resource_id, params.offset, limit, params.filters.as_ref())
            .await
    }

    async fn fetch_window(
        &self,
        resource_id: &str,
        offset: u64,
        limit: u64,
        filters: Option<&BTreeMap<String, String>>,
    ) -> Result<DatasetResponse> {
        validate_resource_id(resource_id)?;

        let key = cache::response_key(resource_id, offset, limit, filters);
        if let Some(cache) = &self.inner.cache {
            if let Some(cached) = cache.get(&key) {
                tracing::debug!(resource_id, offset, limit, "cache hit");
                return Ok(cached);
            }
        }

        let Some(api_key) = self.inner.config.api_key.clone() else {
            return Err(Error::MissingApiKey);
        };

        self.inner.limiter.acquire().await;

        let response = self
            .inner
            .retry
            .run("fetch_resource", || {
                self.execute_fetch(resource_id, offset, limit, filters, &api_key)
            })
            .await?;

        if let Some(cache) = &self.inner.cache {
            cache.insert(key, response.clone(), self.inner.config.cache_ttl);
        }
        Ok(response)
    }

    /// Executes a single request attempt.
    async fn execute_fetch(
        &self,
        resource_id: &str,
        offset: u64,
        limit: u64,
        filters: Option<&BTreeMap<String, String>>,
        api_key: &str,
    ) -> Result<DatasetResponse> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Configuration("base_url cannot carry path segments".to_string()))?
            .pop_if_empty()
            .extend(["resource", resource_id]);
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("api-key", api_key);
            query.append_pair("format", "json");
            query.append_pair("offset", &offset.to_string());
            query.append_pair("limit", &limit.to_string());
            if let Some(filters) = filters {
                for (field, value) in filters {
                    query.append_pair(&format!("filters[{field}]"), value);
                }
            }
        }

        // The full URL embeds the API key, so log the pieces instead.
        tracing::debug!(resource_id, offset, limit, "requesting resource window");

        let response = self.inner.http.get(url).send().await?;
        self.parse_response(resource_id, response).await
    }

    async fn parse_response(
        &self,
        resource_id: &str,
        response: reqwest::Response,
    ) -> Result<DatasetResponse> {
        let status = response.status();

        if !status.is_success() {
            let retry_after = rate_limit::parse_retry_after(response.headers());
            let message = response.text().await.unwrap_or_default();

            if status.is_server_error() {
                tracing::warn!(resource_id, status = status.as_u16(), "upstream server error");
            } else {
                tracing::error!(resource_id, status = status.as_u16(), "upstream client error");
            }

            return Err(match status.as_u16() {
                404 => Error::ResourceNotFound {
                    resource_id: resource_id.to_string(),
                },
                401 | 403 => Error::Authentication { status, message },
                429 => Error::RateLimited { retry_after },
                _ => Error::Upstream { status, message },
            });
        }

        let body = response.text().await?;
        match serde_json::from_str::<DatasetResponse>(&body) {
            Ok(data) => {
                tracing::debug!(
                    resource_id,
                    records = data.records.len(),
                    total = data.total,
                    "parsed resource window"
                );
                Ok(data)
            }
            Err(e) => {
                tracing::error!(resource_id, error = %e, "undecodable response body");
                Err(Error::Decode {
                    status,
                    reason: e.to_string(),
                })
            }
        }
    }

    fn resolve_limit(&self, requested: Option<u64>) -> Result<u64> {
        let limit = requested.unwrap_or(self.inner.config.default_limit);
        if limit == 0 {
            return Err(Error::InvalidParameter {
                param: "limit",
                reason: "must be at least 1".to_string(),
            });
        }
        if limit > self.inner.config.max_limit {
            return Err(Error::InvalidParameter {
                param: "limit",
                reason: format!("cannot exceed {}", self.inner.config.max_limit),
            });
        }
        Ok(limit)
    }

    /// Retrieves a window of records with the dataset's declared schema.
    pub async fn get_dataset(
        &self,
        resource_id: &str,
        params: &FetchParams,
    ) -> Result<DatasetSlice> {
        let limit = self.resolve_limit(params.limit)?;
        let response = self
            .fetch_window(resource_id, params.offset, limit, params.filters.as_ref())
            .await?;
        Ok(views::dataset_slice(
            resource_id,
            params.offset,
            limit,
            response,
        ))
    }

    /// Retrieves the dataset's field schema.
    ///
    /// The schema rides on every response, so a single-record window is
    /// fetched as a probe. When the payload declares no schema, one is
    /// inferred from the types in the first record.
    pub async fn get_dataset_fields(&self, resource_id: &str) -> Result<FieldSchema> {
        let response = self.fetch_window(resource_id, 0, 1, None).await?;
        Ok(views::field_schema(resource_id, &response))
    }

    /// Retrieves one page of records with pagination metadata.
    ///
    /// Pages are 1-indexed; the upstream offset is derived as
    /// `(page - 1) * page_size`. Requesting a page past the end is not an
    /// error: the page comes back empty with `has_next: false`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # async fn example(client: datagovin::Client) -> Result<(), datagovin::Error> {
    /// let page = client
    ///     .paginate_dataset("9ef84268-d588-465a-a308-a864a43d0070", 3, 20)
    ///     .await?;
    /// assert_eq!(page.pagination.current_page, 3);
    /// if page.pagination.has_next {
    ///     // fetch page 4 next
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn paginate_dataset(
        &self,
        resource_id: &str,
        page: u64,
        page_size: u64,
    ) -> Result<PaginatedDataset> {
        if page < 1 {
            return Err(Error::InvalidParameter {
                param: "page",
                reason: "must be at least 1".to_string(),
            });
        }
        let page_size = self.resolve_limit(Some(page_size))?;
        let offset = (page - 1)
            .checked_mul(page_size)
            .ok_or_else(|| Error::InvalidParameter {
                param: "page",
                reason: "offset overflows for this page size".to_string(),
            })?;
        let response = self.fetch_window(resource_id, offset, page_size, None).await?;
        Ok(views::paginated(resource_id, page, page_size, response))
    }

    /// Retrieves record count, field names, and a sample record.
    pub async fn get_dataset_summary(&self, resource_id: &str) -> Result<DatasetSummary> {
        let response = self.fetch_window(resource_id, 0, 1, None).await?;
        Ok(views::summary(resource_id, &response))
    }

    /// Retrieves a window of records and filters it locally by exact field
    /// equality.
    ///
    /// The window is fetched unfiltered, so it shares its cache entry with
    /// plain window fetches of the same size; matching happens on this side
    /// of the network. At most the fetched `limit` records are scanned.
    pub async fn filter_dataset(
        &self,
        resource_id: &str,
        field: &str,
        value: &str,
        limit: Option<u64>,
    ) -> Result<FilteredDataset> {
        if field.trim().is_empty() {
            return Err(Error::InvalidParameter {
                param: "field",
                reason: "must not be empty".to_string(),
            });
        }
        let limit = self.resolve_limit(limit)?;
        let response = self.fetch_window(resource_id, 0, limit, None).await?;
        Ok(views::filtered(resource_id, field, value, &response))
    }

    /// Snapshot of cache counters, or a disabled marker when caching is
    /// off.
    pub fn cache_statistics(&self) -> CacheStatistics {
        match &self.inner.cache {
            Some(cache) => CacheStatistics {
                cache_enabled: true,
                stats: Some(cache.stats()),
            },
            None => CacheStatistics {
                cache_enabled: false,
                stats: None,
            },
        }
    }

    /// Drops every cached response. Lifetime hit/miss counters survive.
    pub fn clear_cache(&self) {
        if let Some(cache) = &self.inner.cache {
            cache.clear();
            tracing::info!("response cache cleared");
        }
    }

    /// Reports the crate version and live configuration.
    ///
    /// The API key itself is never included, only whether one is set.
    pub fn server_info(&self) -> ServerInfo {
        ServerInfo {
            server: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            configuration: self.inner.config.summary(),
            api_key_configured: self.inner.config.api_key.is_some(),
        }
    }
}

/// Live client information, as returned by [`Client::server_info`].
#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    pub server: String,
    pub version: String,
    pub configuration: ConfigSummary,
    pub api_key_configured: bool,
}

fn validate_resource_id(resource_id: &str) -> Result<()> {
    if resource_id.trim().is_empty() {
        return Err(Error::InvalidParameter {
            param: "resource_id",
            reason: "must not be empty".to_string(),
        });
    }
    Ok(())
}
