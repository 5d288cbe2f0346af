//! Wire types for upstream dataset responses.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single dataset record: one JSON object keyed by field name.
pub type Record = serde_json::Map<String, Value>;

/// Schema descriptor for one dataset field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Field identifier as declared by the dataset.
    #[serde(default)]
    pub id: String,
    /// Declared type, e.g. `"keyword"` or `"double"`. Inferred schemas use
    /// JSON type names instead.
    #[serde(rename = "type", default)]
    pub ty: String,
}

/// Parsed body of a successful resource fetch.
///
/// Unknown keys in the upstream payload are ignored; the three fields here
/// are the ones every derived view is built from. Cached entries store this
/// type directly, so a cache hit skips both the network and re-parsing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetResponse {
    /// Total records in the dataset, independent of this page's size.
    /// Some deployments omit it.
    pub total: Option<u64>,
    /// This page's records, in upstream order.
    #[serde(default)]
    pub records: Vec<Record>,
    /// Declared field schema. Older deployments emit the key as `field`.
    #[serde(default, alias = "field")]
    pub fields: Vec<FieldDescriptor>,
}

impl DatasetResponse {
    /// Total record count, falling back to this page's length when the
    /// upstream payload omits `total`.
    pub fn total_records(&self) -> u64 {
        self.total.unwrap_or(self.records.len() as u64)
    }
}
