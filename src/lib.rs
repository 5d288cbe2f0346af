//! # Datagovin - A mediating client for the data.gov.in open data API
//!
//! Datagovin wraps the [data.gov.in](https://data.gov.in) resource API behind
//! a caching, rate-limited, retry-aware client built on `reqwest`. It is
//! aimed at agents and services that issue many small dataset reads and need
//! those reads to be cheap, polite, and predictable.
//!
//! ## Quick Start
//!
//! ```no_run
//! use datagovin::{Client, FetchParams};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), datagovin::Error> {
//!     // Reads DATA_GOV_IN_API_KEY and friends from the environment.
//!     let client = Client::from_env()?;
//!
//!     // Fetch the first five records of a resource.
//!     let slice = client
//!         .get_dataset(
//!             "9ef84268-d588-465a-a308-a864a43d0070",
//!             &FetchParams::new().with_limit(5),
//!         )
//!         .await?;
//!     println!("{} of {} records", slice.records.len(), slice.total_records);
//!
//!     // Walk the same resource page by page.
//!     let page = client
//!         .paginate_dataset("9ef84268-d588-465a-a308-a864a43d0070", 1, 50)
//!         .await?;
//!     println!("page 1 of {}", page.pagination.total_pages);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Response caching** - LRU + TTL cache keyed by the full request shape, with hit/miss statistics
//! - **Rate limiting** - sliding-window limiter that delays calls instead of failing them
//! - **Automatic retries** - exponential backoff for transient failures, honoring `Retry-After` hints
//! - **Typed errors** - one error enum separating caller mistakes, auth problems, and upstream faults
//! - **Derived views** - pagination, field schemas, summaries, and client-side filtering over raw windows
//! - **Environment configuration** - every knob readable from `DATA_GOV_IN_*` variables
//! - **Structured logging** - `tracing` instrumentation that never leaks the API key
//!
//! ## Error Handling
//!
//! Every failure surfaces as an [`Error`] variant; transient ones are
//! retried before you ever see them:
//!
//! ```no_run
//! use datagovin::{Client, Error};
//!
//! # async fn example(client: Client) {
//! match client.get_dataset_summary("not-a-real-resource").await {
//!     Ok(summary) => println!("{} records", summary.total_records),
//!     Err(Error::ResourceNotFound { resource_id }) => {
//!         eprintln!("no such resource: {resource_id}");
//!     }
//!     Err(Error::RetriesExhausted { attempts, last_error }) => {
//!         eprintln!("gave up after {attempts} attempts: {last_error}");
//!     }
//!     Err(e) => eprintln!("request failed: {e}"),
//! }
//! # }
//! ```
//!
//! ## Caching and Rate Limiting
//!
//! Responses are cached by resource, window, and filters, so repeated reads
//! cost nothing; cache hits also skip the rate limiter. The limiter itself
//! delays outgoing calls once the per-window budget is spent rather than
//! failing them, so bursty callers degrade to a steady trickle:
//!
//! ```no_run
//! use datagovin::{Client, Config};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), datagovin::Error> {
//! let client = Client::new(Config {
//!     api_key: Some("your-key".to_string()),
//!     rate_limit_calls: 30,
//!     rate_limit_period: Duration::from_secs(60),
//!     cache_ttl: Duration::from_secs(600),
//!     ..Config::default()
//! })?;
//!
//! let stats = client.cache_statistics();
//! println!("cache enabled: {}", stats.cache_enabled);
//! # Ok(())
//! # }
//! ```

mod cache;
mod client;
mod config;
mod error;
mod params;
mod rate_limit;
mod retry;
pub mod types;
pub mod views;

pub use cache::{CacheStats, CacheStatistics};
pub use client::{Client, ServerInfo};
pub use config::{Config, ConfigSummary};
pub use error::{Error, Result};
pub use params::FetchParams;
pub use rate_limit::RateLimiter;
pub use retry::RetryPolicy;
pub use types::{DatasetResponse, FieldDescriptor, Record};
pub use views::{
    DatasetSlice, DatasetSummary, FieldSchema, FilteredDataset, PageInfo, PaginatedDataset,
};
