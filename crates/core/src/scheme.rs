//! Scheme records — one government assistance program each.
//!
//! Records deserialize leniently: missing keys, `null` values and bare strings
//! in list positions all normalize to typed defaults, so every field is
//! always present after parsing. Required-field checks (`name`, `category`)
//! happen when the catalog is assembled.

use serde::{Deserialize, Deserializer, Serialize};

/// A single scheme as held in the catalog. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemeRecord {
    /// Display name, unique within a catalog.
    #[serde(default, deserialize_with = "string_or_empty")]
    pub name: String,

    /// Category label (e.g. "Agriculture", "Education").
    #[serde(default, deserialize_with = "string_or_empty")]
    pub category: String,

    #[serde(default, deserialize_with = "string_or_empty")]
    pub description: String,

    #[serde(default, alias = "targetAudience", deserialize_with = "string_list")]
    pub target_audience: Vec<String>,

    #[serde(default, deserialize_with = "string_list")]
    pub eligibility: Vec<String>,

    #[serde(default, deserialize_with = "string_list")]
    pub benefits: Vec<String>,

    #[serde(default, alias = "applicationProcess", deserialize_with = "string_list")]
    pub application_process: Vec<String>,

    #[serde(default, alias = "documentsRequired", deserialize_with = "string_list")]
    pub documents_required: Vec<String>,

    #[serde(default, alias = "officialWebsite", deserialize_with = "string_or_empty")]
    pub official_website: String,
}

impl SchemeRecord {
    /// Create a record with only the required fields set.
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            description: String::new(),
            target_audience: Vec::new(),
            eligibility: Vec::new(),
            benefits: Vec::new(),
            application_process: Vec::new(),
            documents_required: Vec::new(),
            official_website: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_target_audience(mut self, items: &[&str]) -> Self {
        self.target_audience = items.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_eligibility(mut self, items: &[&str]) -> Self {
        self.eligibility = items.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_benefits(mut self, items: &[&str]) -> Self {
        self.benefits = items.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Case-insensitive category comparison, as used by catalog filters.
    pub fn in_category(&self, category: &str) -> bool {
        self.category.trim().to_lowercase() == category.trim().to_lowercase()
    }
}

fn string_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.map(|s| s.trim().to_string()).unwrap_or_default())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<Option<String>>),
}

fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let items: Vec<String> = match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(s)) => vec![s],
        Some(OneOrMany::Many(v)) => v.into_iter().flatten().collect(),
    };
    Ok(items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}
