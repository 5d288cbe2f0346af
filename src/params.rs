//! Request options for dataset fetches.

use std::collections::BTreeMap;

/// Options for one dataset fetch: the pagination window and any
/// single-field equality filters.
///
/// `limit: None` defers to the configured default at call time. Filters
/// live in a `BTreeMap` so the query string and the cache key see one
/// canonical order no matter how the map was built.
///
/// # Examples
///
/// ```
/// use datagovin::FetchParams;
///
/// let params = FetchParams::new()
///     .with_offset(20)
///     .with_limit(10)
///     .with_filter("state", "Maharashtra");
/// assert_eq!(params.offset, 20);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchParams {
    /// Records to skip before the returned window.
    pub offset: u64,
    /// Records to return; the configured default when `None`.
    pub limit: Option<u64>,
    /// Equality filters forwarded upstream as `filters[field]=value`.
    pub filters: Option<BTreeMap<String, String>>,
}

impl FetchParams {
    /// Options with the defaults: offset 0, configured limit, no filters.
    pub fn new() -> Self {
        FetchParams::default()
    }

    /// Sets the number of records to skip.
    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    /// Sets the number of records to return.
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Adds one equality filter, replacing any previous filter on the same
    /// field.
    pub fn with_filter(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters
            .get_or_insert_with(BTreeMap::new)
            .insert(field.into(), value.into());
        self
    }

    /// Replaces the whole filter set.
    pub fn with_filters(mut self, filters: BTreeMap<String, String>) -> Self {
        self.filters = Some(filters);
        self
    }
}
