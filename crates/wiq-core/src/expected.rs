//! The expected-id set: which work items the configured queries currently
//! return. The queries run outside this crate; their results arrive as a JSON
//! file or come from the snapshot recorded in the cache.

use crate::error::{Result, WiqError};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// ExpectedIds
// ---------------------------------------------------------------------------

/// Expected identifiers grouped by query label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpectedIds {
    by_query: BTreeMap<String, BTreeSet<u64>>,
}

impl ExpectedIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(label: impl Into<String>, ids: impl IntoIterator<Item = u64>) -> Self {
        let mut expected = Self::new();
        expected.insert(label, ids);
        expected
    }

    pub fn insert(&mut self, label: impl Into<String>, ids: impl IntoIterator<Item = u64>) {
        self.by_query.entry(label.into()).or_default().extend(ids);
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.by_query.keys().map(String::as_str)
    }

    pub fn ids_for(&self, label: &str) -> Option<&BTreeSet<u64>> {
        self.by_query.get(label)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<u64>)> {
        self.by_query.iter().map(|(label, ids)| (label.as_str(), ids))
    }

    /// All expected ids across queries.
    pub fn union(&self) -> BTreeSet<u64> {
        self.by_query.values().flatten().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.by_query.values().all(BTreeSet::is_empty)
    }

    pub fn to_map(&self) -> BTreeMap<String, Vec<u64>> {
        self.by_query
            .iter()
            .map(|(label, ids)| (label.clone(), ids.iter().copied().collect()))
            .collect()
    }

    /// Parse query results. Accepted shapes:
    ///
    /// - `[1, 2, 3]` or `[{"id": 1}, ...]`
    /// - `{"ids": [...]}`
    /// - `{"workItems": [{"id": 1}, ...]}` (a saved-query response)
    /// - `{"queries": {"<label>": [...], ...}}`
    ///
    /// Ungrouped shapes are filed under `default_label`.
    pub fn parse(value: &Value, default_label: &str) -> Result<Self> {
        match value {
            Value::Array(items) => Ok(Self::single(default_label, parse_id_list(items)?)),
            Value::Object(map) => {
                if let Some(queries) = map.get("queries") {
                    let Value::Object(queries) = queries else {
                        return Err(WiqError::InvalidQueryResults(
                            "'queries' must map labels to id lists".to_string(),
                        ));
                    };
                    let mut expected = Self::new();
                    for (label, ids) in queries {
                        let Value::Array(items) = ids else {
                            return Err(WiqError::InvalidQueryResults(format!(
                                "query '{label}' must be an array of ids"
                            )));
                        };
                        expected.insert(label.clone(), parse_id_list(items)?);
                    }
                    return Ok(expected);
                }
                for key in ["ids", "workItems"] {
                    if let Some(ids) = map.get(key) {
                        let Value::Array(items) = ids else {
                            return Err(WiqError::InvalidQueryResults(format!(
                                "'{key}' must be an array"
                            )));
                        };
                        return Ok(Self::single(default_label, parse_id_list(items)?));
                    }
                }
                Err(WiqError::InvalidQueryResults(
                    "expected 'ids', 'workItems' or 'queries'".to_string(),
                ))
            }
            _ => Err(WiqError::InvalidQueryResults(
                "expected a JSON array or object".to_string(),
            )),
        }
    }

    pub fn from_file(path: &Path, default_label: &str) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&data)?;
        Self::parse(&value, default_label)
    }
}

fn parse_id_list(items: &[Value]) -> Result<Vec<u64>> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let raw = match item {
                Value::Object(obj) => obj.get("id").unwrap_or(&Value::Null),
                other => other,
            };
            positive_id(raw).ok_or_else(|| {
                WiqError::InvalidQueryResults(format!("entry {i} is not a positive id: {item}"))
            })
        })
        .collect()
}

/// Accepts a positive JSON integer or a string holding one.
pub(crate) fn positive_id(value: &Value) -> Option<u64> {
    let id = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }?;
    (id > 0).then_some(id)
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// Where the orchestrator gets the expected-id set from.
pub trait ExpectedIdSource {
    fn expected_ids(&self) -> Result<ExpectedIds>;

    /// Short human description for status output.
    fn describe(&self) -> String;
}

/// Query results exported to a JSON file by the external query tool.
pub struct QueryResultsFile {
    pub path: PathBuf,
    pub default_label: String,
}

impl ExpectedIdSource for QueryResultsFile {
    fn expected_ids(&self) -> Result<ExpectedIds> {
        ExpectedIds::from_file(&self.path, &self.default_label)
    }

    fn describe(&self) -> String {
        format!("query results file {}", self.path.display())
    }
}

/// A fixed set, e.g. the snapshot recorded in the cache metadata.
pub struct FixedIds(pub ExpectedIds);

impl ExpectedIdSource for FixedIds {
    fn expected_ids(&self) -> Result<ExpectedIds> {
        if self.0.is_empty() {
            return Err(WiqError::NoExpectedIds);
        }
        Ok(self.0.clone())
    }

    fn describe(&self) -> String {
        "cache metadata snapshot".to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
