//! Derived views over fetched dataset responses.
//!
//! Everything here is a pure function of an already-fetched
//! [`DatasetResponse`]: pagination metadata, field schemas, summaries, and
//! client-side filtering. Nothing in this module performs I/O; the client
//! fetches once and shapes the result through these functions.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::types::{DatasetResponse, FieldDescriptor, Record};

/// One offset/limit window of a dataset, as returned by
/// [`Client::get_dataset`](crate::Client::get_dataset).
#[derive(Debug, Clone, Serialize)]
pub struct DatasetSlice {
    pub resource_id: String,
    pub total_records: u64,
    pub offset: u64,
    pub limit: u64,
    pub records: Vec<Record>,
    pub fields: Vec<FieldDescriptor>,
}

/// Field schema envelope, as returned by
/// [`Client::get_dataset_fields`](crate::Client::get_dataset_fields).
#[derive(Debug, Clone, Serialize)]
pub struct FieldSchema {
    pub resource_id: String,
    pub field_count: usize,
    pub fields: Vec<FieldDescriptor>,
}

/// Pagination metadata for one page of a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageInfo {
    pub current_page: u64,
    pub page_size: u64,
    pub total_records: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_previous: bool,
}

/// One page with its pagination metadata, as returned by
/// [`Client::paginate_dataset`](crate::Client::paginate_dataset).
#[derive(Debug, Clone, Serialize)]
pub struct PaginatedDataset {
    pub resource_id: String,
    pub pagination: PageInfo,
    pub records: Vec<Record>,
}

/// Dataset overview, as returned by
/// [`Client::get_dataset_summary`](crate::Client::get_dataset_summary).
#[derive(Debug, Clone, Serialize)]
pub struct DatasetSummary {
    pub resource_id: String,
    pub total_records: u64,
    pub field_count: usize,
    pub fields: Vec<String>,
    pub sample_record: Option<Record>,
}

/// Locally filtered records, as returned by
/// [`Client::filter_dataset`](crate::Client::filter_dataset).
#[derive(Debug, Clone, Serialize)]
pub struct FilteredDataset {
    pub resource_id: String,
    pub filter: BTreeMap<String, String>,
    pub matched_records: usize,
    pub records: Vec<Record>,
}

/// Computes pagination metadata for `page` (1-indexed) of `page_size`
/// records each.
///
/// `page_size` must be positive; the client validates it as a limit before
/// fetching. An empty dataset still reports one page, so `has_next` stays
/// false instead of comparing against zero pages.
pub fn page_info(response: &DatasetResponse, page: u64, page_size: u64) -> PageInfo {
    let total_records = response.total_records();
    let total_pages = if total_records == 0 {
        1
    } else {
        total_records.div_ceil(page_size)
    };
    PageInfo {
        current_page: page,
        page_size,
        total_records,
        total_pages,
        has_next: page < total_pages,
        has_previous: page > 1,
    }
}

/// The dataset's field schema, inferred from the first record when the
/// payload does not declare one.
///
/// Inferred descriptors use JSON type names (`"string"`, `"number"`, ...)
/// since the upstream schema vocabulary is unavailable.
pub fn effective_fields(response: &DatasetResponse) -> Vec<FieldDescriptor> {
    if !response.fields.is_empty() {
        return response.fields.clone();
    }
    response
        .records
        .first()
        .map(infer_fields)
        .unwrap_or_default()
}

fn infer_fields(record: &Record) -> Vec<FieldDescriptor> {
    record
        .iter()
        .map(|(key, value)| FieldDescriptor {
            id: key.clone(),
            ty: json_type_name(value).to_string(),
        })
        .collect()
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Records of the fetched page whose `field` equals `value` under
/// stringified comparison.
///
/// JSON strings compare verbatim; every other value compares by its JSON
/// rendering, so `42` matches `"42"` and `true` matches `"true"`. Records
/// missing the field never match.
pub fn filter_records(response: &DatasetResponse, field: &str, value: &str) -> Vec<Record> {
    response
        .records
        .iter()
        .filter(|record| record.get(field).is_some_and(|v| value_matches(v, value)))
        .cloned()
        .collect()
}

fn value_matches(candidate: &Value, expected: &str) -> bool {
    match candidate {
        Value::String(s) => s == expected,
        other => other.to_string() == expected,
    }
}

pub(crate) fn dataset_slice(
    resource_id: &str,
    offset: u64,
    limit: u64,
    response: DatasetResponse,
) -> DatasetSlice {
    DatasetSlice {
        resource_id: resource_id.to_string(),
        total_records: response.total_records(),
        offset,
        limit,
        records: response.records,
        fields: response.fields,
    }
}

pub(crate) fn field_schema(resource_id: &str, response: &DatasetResponse) -> FieldSchema {
    let fields = effective_fields(response);
    FieldSchema {
        resource_id: resource_id.to_string(),
        field_count: fields.len(),
        fields,
    }
}

pub(crate) fn paginated(
    resource_id: &str,
    page: u64,
    page_size: u64,
    response: DatasetResponse,
) -> PaginatedDataset {
    let pagination = page_info(&response, page, page_size);
    PaginatedDataset {
        resource_id: resource_id.to_string(),
        pagination,
        records: response.records,
    }
}

pub(crate) fn summary(resource_id: &str, response: &DatasetResponse) -> DatasetSummary {
    let fields = effective_fields(response);
    DatasetSummary {
        resource_id: resource_id.to_string(),
        total_records: response.total_records(),
        field_count: fields.len(),
        fields: fields.into_iter().map(|f| f.id).collect(),
        sample_record: response.records.first().cloned(),
    }
}

pub(crate) fn filtered(
    resource_id: &str,
    field: &str,
    value: &str,
    response: &DatasetResponse,
) -> FilteredDataset {
    let records = filter_records(response, field, value);
    FilteredDataset {
        resource_id: resource_id.to_string(),
        filter: BTreeMap::from([(field.to_string(), value.to_string())]),
        matched_records: records.len(),
        records,
    }
}
