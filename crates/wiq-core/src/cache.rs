//! Local JSON cache of fetched work item field-sets.
//!
//! The cache only ever grows more complete: merges fill absent or empty fields
//! and never replace populated values. Items leave the cache only through an
//! explicit [`WorkItemCache::prune`].

use crate::error::{Result, WiqError};
use crate::expected::{positive_id, ExpectedIds};
use crate::text;
use crate::work_item::{fields, FieldSet, WorkItem};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

// ---------------------------------------------------------------------------
// CachedItem
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedItem {
    pub id: u64,
    #[serde(default)]
    pub fields: FieldSet,
    /// Field names already requested from the source for this item.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub fields_known: BTreeSet<String>,
}

impl CachedItem {
    pub fn new(id: u64, fields: FieldSet) -> Self {
        Self {
            id,
            fields,
            fields_known: BTreeSet::new(),
        }
    }

    /// Field-level merge. See [`prefer_incoming`] for the precedence rule.
    pub fn merge(&self, incoming: &CachedItem) -> CachedItem {
        let mut fields = self.fields.clone();
        for (name, value) in &incoming.fields {
            if prefer_incoming(name, fields.get(name), value) {
                fields.insert(name.clone(), value.clone());
            }
        }
        let mut fields_known = self.fields_known.clone();
        fields_known.extend(incoming.fields_known.iter().cloned());
        CachedItem {
            id: self.id,
            fields,
            fields_known,
        }
    }

    pub fn work_item(&self) -> WorkItem {
        WorkItem::from_fields(self.id, &self.fields)
    }

    /// True when description or acceptance criteria has text once markup is
    /// stripped.
    pub fn has_content(&self) -> bool {
        [fields::DESCRIPTION, fields::ACCEPTANCE_CRITERIA]
            .into_iter()
            .any(|name| self.fields.get(name).is_some_and(|v| !is_empty_field(name, v)))
    }

    /// A field counts as known once it was requested or came back populated.
    pub fn knows(&self, field: &str) -> bool {
        self.fields_known.contains(field)
            || self.fields.get(field).is_some_and(|v| !is_empty_field(field, v))
    }

    /// Lacks both text fields and has not had them explicitly fetched, so a
    /// re-fetch may still fill them.
    pub fn is_incomplete(&self) -> bool {
        !self.has_content()
            && !(self.knows(fields::DESCRIPTION) && self.knows(fields::ACCEPTANCE_CRITERIA))
    }
}

/// Empty means null, a blank string, or an empty array/object.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// [`is_empty_value`], except that rich-text fields are judged on their
/// normalized text, so a cleared `<div><br></div>` counts as empty.
pub fn is_empty_field(name: &str, value: &Value) -> bool {
    match value {
        Value::String(s) if is_rich_text(name) => text::normalize(s).is_empty(),
        _ => is_empty_value(value),
    }
}

fn is_rich_text(name: &str) -> bool {
    name == fields::DESCRIPTION || name == fields::ACCEPTANCE_CRITERIA
}

/// Per-field precedence: the incoming value wins only where the cache has
/// nothing yet, or holds an empty value and the incoming one is populated.
/// A populated cached value is never replaced, even by a longer one.
pub fn prefer_incoming(field: &str, existing: Option<&Value>, incoming: &Value) -> bool {
    match existing {
        None => true,
        Some(current) => is_empty_field(field, current) && !is_empty_field(field, incoming),
    }
}

// ---------------------------------------------------------------------------
// Batch parsing
// ---------------------------------------------------------------------------

/// Parse a fetched batch. Accepts an array of items, an object holding a
/// `work_items` or `value` array, or a single item object. Each item needs a
/// positive `id` (or `fields["System.Id"]`) and an object `fields`. The whole
/// batch is rejected on the first malformed item.
pub fn parse_batch(value: &Value) -> Result<Vec<CachedItem>> {
    let items: Vec<&Value> = match value {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) => match map.get("work_items").or_else(|| map.get("value")) {
            Some(Value::Array(items)) => items.iter().collect(),
            Some(_) => {
                return Err(WiqError::InvalidBatch {
                    index: 0,
                    reason: "'work_items'/'value' must be an array".to_string(),
                })
            }
            None => vec![value],
        },
        other => {
            return Err(WiqError::InvalidBatch {
                index: 0,
                reason: format!("expected an array or object, got {}", json_kind(other)),
            })
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| parse_item(index, item))
        .collect()
}

fn parse_item(index: usize, item: &Value) -> Result<CachedItem> {
    let invalid = |reason: String| WiqError::InvalidBatch { index, reason };

    let Value::Object(obj) = item else {
        return Err(invalid(format!("item is {}, not an object", json_kind(item))));
    };

    let set: FieldSet = match obj.get("fields") {
        None | Some(Value::Null) => FieldSet::new(),
        Some(Value::Object(map)) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        Some(other) => {
            return Err(invalid(format!(
                "'fields' is {}, not an object",
                json_kind(other)
            )))
        }
    };

    let id = obj
        .get("id")
        .filter(|v| !v.is_null())
        .or_else(|| set.get(fields::ID))
        .ok_or_else(|| invalid("missing 'id' and 'fields.System.Id'".to_string()))?;
    let id = positive_id(id).ok_or_else(|| invalid(format!("id {id} is not a positive integer")))?;

    let fields_known = match obj.get("fields_known") {
        Some(Value::Array(names)) => names
            .iter()
            .filter_map(|n| n.as_str().map(str::to_string))
            .collect(),
        _ => BTreeSet::new(),
    };

    Ok(CachedItem {
        id,
        fields: set,
        fields_known,
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

/// Expected ids as stored in metadata: grouped by label, or a bare list as
/// written by older tooling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredExpectedIds {
    Grouped(BTreeMap<String, Vec<u64>>),
    Flat(Vec<u64>),
}

/// Written alongside a flat `expected_ids` list by older tooling.
const LEGACY_EXPECTED_COUNT: &str = "expected_count";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheMetadata {
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub total_items: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_ids: Option<StoredExpectedIds>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_timestamp"
    )]
    pub last_query_sync: Option<DateTime<Utc>>,
    /// Unrecognised keys, preserved across rewrites.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// RFC 3339, or a naive ISO timestamp taken as UTC. Anything else reads as
/// unknown rather than failing the whole cache.
fn lenient_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<DateTime<Utc>>, D::Error> {
    let raw: Option<Value> = Option::deserialize(deserializer)?;
    let Some(Value::String(s)) = raw else {
        return Ok(None);
    };
    if let Ok(dt) = DateTime::parse_from_rfc3339(&s) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }
    Ok(NaiveDateTime::parse_from_str(&s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc()))
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeOutcome {
    pub added: usize,
    pub updated: usize,
    pub unchanged: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub expected: usize,
    pub cached: usize,
    /// Expected but not cached.
    pub missing: Vec<u64>,
    /// Cached but no longer expected; prune candidates.
    pub extra: Vec<u64>,
    /// Expected and cached, but with no description or AC yet.
    pub incomplete: Vec<u64>,
}

impl SyncReport {
    /// Missing plus incomplete, sorted.
    pub fn needs_fetch(&self) -> Vec<u64> {
        let set: BTreeSet<u64> = self
            .missing
            .iter()
            .chain(self.incomplete.iter())
            .copied()
            .collect();
        set.into_iter().collect()
    }

    pub fn has_gaps(&self) -> bool {
        !self.missing.is_empty()
    }

    pub fn is_in_sync(&self) -> bool {
        self.missing.is_empty() && self.extra.is_empty() && self.incomplete.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PruneReport {
    pub removed: Vec<u64>,
    pub not_found: Vec<u64>,
}

/// A loaded cache plus the reason it was discarded, if it was.
#[derive(Debug)]
pub struct LoadedCache {
    pub cache: WorkItemCache,
    pub warning: Option<String>,
}

// ---------------------------------------------------------------------------
// WorkItemCache
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkItemCache {
    pub metadata: CacheMetadata,
    items: BTreeMap<u64, CachedItem>,
}

#[derive(Serialize)]
struct CacheDocument<'a> {
    metadata: &'a CacheMetadata,
    work_items: Vec<&'a CachedItem>,
}

#[derive(Deserialize)]
struct RawCacheDocument {
    #[serde(default)]
    metadata: CacheMetadata,
    #[serde(default)]
    work_items: Value,
}

impl WorkItemCache {
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Load the cache at `path`. A missing file is an empty cache; an
    /// unreadable or corrupt one is an empty cache plus a warning.
    pub fn load(path: &Path) -> LoadedCache {
        if !path.exists() {
            return LoadedCache {
                cache: Self::new(),
                warning: None,
            };
        }
        match std::fs::read_to_string(path)
            .map_err(WiqError::from)
            .and_then(|data| Self::from_json(&data))
        {
            Ok(cache) => {
                tracing::debug!(path = %path.display(), items = cache.len(), "cache loaded");
                LoadedCache {
                    cache,
                    warning: None,
                }
            }
            Err(e) => {
                let warning = format!(
                    "cache at {} is unreadable ({e}); starting from an empty cache",
                    path.display()
                );
                tracing::warn!(path = %path.display(), error = %e, "discarding corrupt cache");
                LoadedCache {
                    cache: Self::new(),
                    warning: Some(warning),
                }
            }
        }
    }

    pub fn from_json(data: &str) -> Result<Self> {
        let raw: RawCacheDocument = serde_json::from_str(data)?;
        let mut cache = Self {
            metadata: raw.metadata,
            items: BTreeMap::new(),
        };
        if !raw.work_items.is_null() {
            let Value::Array(_) = raw.work_items else {
                return Err(WiqError::InvalidBatch {
                    index: 0,
                    reason: "'work_items' must be an array".to_string(),
                });
            };
            for item in parse_batch(&raw.work_items)? {
                cache.upsert(item);
            }
        }
        Ok(cache)
    }

    pub fn to_json(&self) -> Result<String> {
        let doc = CacheDocument {
            metadata: &self.metadata,
            work_items: self.items.values().collect(),
        };
        Ok(serde_json::to_string_pretty(&doc)?)
    }

    /// Recompute metadata and write atomically.
    pub fn save(&mut self, path: &Path) -> Result<()> {
        self.save_at(path, Utc::now())
    }

    pub fn save_at(&mut self, path: &Path, now: DateTime<Utc>) -> Result<()> {
        self.metadata.total_items = self.items.len();
        self.metadata.last_updated = Some(now);
        let data = self.to_json()?;
        crate::io::atomic_write(path, data.as_bytes())?;
        tracing::info!(path = %path.display(), items = self.items.len(), "cache saved");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: u64) -> Option<&CachedItem> {
        self.items.get(&id)
    }

    pub fn contains(&self, id: u64) -> bool {
        self.items.contains_key(&id)
    }

    pub fn ids(&self) -> BTreeSet<u64> {
        self.items.keys().copied().collect()
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    fn upsert(&mut self, item: CachedItem) {
        match self.items.get(&item.id) {
            Some(existing) => {
                let merged = existing.merge(&item);
                self.items.insert(item.id, merged);
            }
            None => {
                self.items.insert(item.id, item);
            }
        }
    }

    /// Merge a parsed batch. `requested` lists the fields the fetch asked
    /// for; they are recorded as known on every incoming item.
    pub fn merge_batch(&mut self, batch: Vec<CachedItem>, requested: &[String]) -> MergeOutcome {
        let mut outcome = MergeOutcome::default();
        for mut incoming in batch {
            incoming.fields_known.extend(requested.iter().cloned());
            incoming.fields_known.extend(incoming.fields.keys().cloned());
            match self.items.get(&incoming.id) {
                Some(existing) => {
                    let merged = existing.merge(&incoming);
                    if &merged == existing {
                        outcome.unchanged += 1;
                    } else {
                        tracing::debug!(id = incoming.id, "cache item updated");
                        outcome.updated += 1;
                        self.items.insert(incoming.id, merged);
                    }
                }
                None => {
                    tracing::debug!(id = incoming.id, "cache item added");
                    outcome.added += 1;
                    self.items.insert(incoming.id, incoming);
                }
            }
        }
        outcome
    }

    /// Compare the cache against the ids the queries currently return.
    pub fn sync(&self, expected: &BTreeSet<u64>) -> SyncReport {
        let missing = expected
            .iter()
            .filter(|id| !self.items.contains_key(id))
            .copied()
            .collect();
        let extra = self
            .items
            .keys()
            .filter(|id| !expected.contains(id))
            .copied()
            .collect();
        let incomplete = self
            .items
            .values()
            .filter(|item| expected.contains(&item.id) && item.is_incomplete())
            .map(|item| item.id)
            .collect();
        SyncReport {
            expected: expected.len(),
            cached: self.items.len(),
            missing,
            extra,
            incomplete,
        }
    }

    /// Remove exactly `ids`. Ids not in the cache are reported, not fatal.
    pub fn prune(&mut self, ids: &[u64]) -> PruneReport {
        let mut report = PruneReport::default();
        for &id in ids {
            if self.items.remove(&id).is_some() {
                report.removed.push(id);
            } else {
                tracing::warn!(id, "{}", WiqError::NotCached(id));
                report.not_found.push(id);
            }
        }
        report
    }

    // -----------------------------------------------------------------------
    // Expected-id snapshot
    // -----------------------------------------------------------------------

    /// Replace the snapshot. A legacy `expected_count` describes the old
    /// snapshot, so it goes with it.
    pub fn record_expected(&mut self, expected: &ExpectedIds, now: DateTime<Utc>) {
        self.metadata.extra.remove(LEGACY_EXPECTED_COUNT);
        self.metadata.expected_ids = Some(StoredExpectedIds::Grouped(expected.to_map()));
        self.metadata.last_query_sync = Some(now);
    }

    /// The recorded snapshot, with a bare list filed under `default_label`.
    pub fn expected_snapshot(&self, default_label: &str) -> Option<ExpectedIds> {
        let stored = self.metadata.expected_ids.as_ref()?;
        let expected = match stored {
            StoredExpectedIds::Grouped(map) => {
                let mut expected = ExpectedIds::new();
                for (label, ids) in map {
                    expected.insert(label.clone(), ids.iter().copied());
                }
                expected
            }
            StoredExpectedIds::Flat(ids) => ExpectedIds::single(default_label, ids.iter().copied()),
        };
        Some(expected)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
