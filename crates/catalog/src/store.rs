//! The scheme catalog: an immutable, in-memory collection of scheme records.
//!
//! Source format: a JSON array of objects, one per scheme. Unknown keys are
//! ignored and missing optional keys normalize to empty values. A record
//! without a `name` or `category` is rejected, as is a repeated name.
//!
//! The catalog is built once and shared read-only (`Arc<Catalog>`).

use sevasaathi_core::{DataError, SchemeRecord};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// Every loaded scheme, in source order.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    records: Vec<SchemeRecord>,
}

impl Catalog {
    /// Read and validate the scheme source at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| DataError::Unreadable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let catalog = Self::from_json_str(&content)?;
        info!(
            records = catalog.len(),
            categories = catalog.categories().len(),
            path = %path.display(),
            "Scheme catalog loaded"
        );
        Ok(catalog)
    }

    /// Parse a catalog from JSON text.
    pub fn from_json_str(content: &str) -> Result<Self, DataError> {
        let value: serde_json::Value =
            serde_json::from_str(content).map_err(|e| DataError::InvalidJson(e.to_string()))?;

        let items = match value {
            serde_json::Value::Array(items) => items,
            other => {
                return Err(DataError::NotAnArray {
                    found: json_kind(&other).into(),
                });
            }
        };

        let mut records = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            if !item.is_object() {
                return Err(DataError::MalformedRecord {
                    index,
                    reason: format!("expected an object, found {}", json_kind(&item)),
                });
            }
            let record: SchemeRecord =
                serde_json::from_value(item).map_err(|e| DataError::MalformedRecord {
                    index,
                    reason: e.to_string(),
                })?;
            records.push(record);
        }

        Self::from_records(records)
    }

    /// Build a catalog from already-parsed records, enforcing the
    /// required-field and unique-name rules.
    pub fn from_records(records: Vec<SchemeRecord>) -> Result<Self, DataError> {
        let mut seen: HashMap<String, usize> = HashMap::with_capacity(records.len());

        for (index, record) in records.iter().enumerate() {
            if record.name.trim().is_empty() {
                return Err(DataError::MissingField { index, field: "name" });
            }
            if record.category.trim().is_empty() {
                return Err(DataError::MissingField {
                    index,
                    field: "category",
                });
            }
            let key = record.name.trim().to_lowercase();
            if seen.insert(key, index).is_some() {
                return Err(DataError::DuplicateName {
                    index,
                    name: record.name.clone(),
                });
            }
        }

        debug!(records = records.len(), "Catalog validated");
        Ok(Self { records })
    }

    /// All records in source order.
    pub fn all(&self) -> &[SchemeRecord] {
        &self.records
    }

    /// Records whose category equals `category` (case-insensitive), in source order.
    pub fn by_category(&self, category: &str) -> Vec<&SchemeRecord> {
        self.records
            .iter()
            .filter(|r| r.in_category(category))
            .collect()
    }

    /// Sorted category labels, de-duplicated ignoring case.
    ///
    /// Each label keeps the spelling of its first record.
    pub fn categories(&self) -> Vec<String> {
        let mut labels: Vec<String> = self.category_groups().into_iter().map(|(l, _)| l).collect();
        labels.sort_by_key(|l| l.to_lowercase());
        labels
    }

    /// Look up a scheme by exact name, ignoring case and surrounding whitespace.
    pub fn get(&self, name: &str) -> Option<&SchemeRecord> {
        let wanted = name.trim().to_lowercase();
        self.records
            .iter()
            .find(|r| r.name.trim().to_lowercase() == wanted)
    }

    /// `(category, count)` pairs, largest first, ties by name.
    ///
    /// Categories differing only in case are counted together.
    pub fn category_counts(&self) -> Vec<(String, usize)> {
        let mut pairs = self.category_groups();
        pairs.sort_by(|a, b| {
            b.1.cmp(&a.1)
                .then_with(|| a.0.to_lowercase().cmp(&b.0.to_lowercase()))
        });
        pairs
    }

    /// Case-insensitive category groups in first-seen order.
    fn category_groups(&self) -> Vec<(String, usize)> {
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut groups: Vec<(String, usize)> = Vec::new();
        for record in &self.records {
            let label = record.category.trim();
            match index.get(&label.to_lowercase()) {
                Some(&i) => groups[i].1 += 1,
                None => {
                    index.insert(label.to_lowercase(), groups.len());
                    groups.push((label.to_string(), 1));
                }
            }
        }
        groups
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
