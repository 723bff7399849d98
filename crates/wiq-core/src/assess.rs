//! End-to-end assessment run: cache + expected ids → graded reports.

use crate::cache::{LoadedCache, SyncReport, WorkItemCache};
use crate::config::Config;
use crate::error::{Result, WiqError};
use crate::expected::{ExpectedIdSource, ExpectedIds};
use crate::fetch::{plan_fetch, FetchRequest};
use crate::report::{write_reports, Summary, WrittenReport};
use crate::score::{Assessment, Scorer};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Inputs that vary per run. Dates are injected so runs are reproducible.
#[derive(Debug, Clone)]
pub struct AssessOptions {
    /// Continue past missing items instead of halting.
    pub allow_gaps: bool,
    pub today: NaiveDate,
    /// Report timestamp and file stamp.
    pub now: NaiveDateTime,
    /// Overrides the configured reports directory.
    pub out_dir: Option<PathBuf>,
}

/// Expected items absent from the cache, with the fetches that would fill them.
#[derive(Debug, Clone, Serialize)]
pub struct GapReport {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_warning: Option<String>,
    pub sync: SyncReport,
    pub fetch: Vec<FetchRequest>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LabelRun {
    pub summary: Summary,
    /// Expected ids that were not in the cache.
    pub excluded: Vec<u64>,
    pub files: WrittenReport,
    #[serde(skip)]
    pub results: Vec<Assessment>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssessRun {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_warning: Option<String>,
    pub sync: SyncReport,
    pub labels: Vec<LabelRun>,
}

impl AssessRun {
    pub fn gap_count(&self) -> usize {
        self.sync.missing.len()
    }
}

#[derive(Debug, Clone)]
pub enum AssessOutcome {
    Halted(GapReport),
    Completed(AssessRun),
}

/// Grade the cached items among `ids`, ascending by id. Ids not in the cache
/// are returned separately.
pub fn assess_ids(
    cache: &WorkItemCache,
    ids: &BTreeSet<u64>,
    scorer: &Scorer,
    today: NaiveDate,
) -> (Vec<Assessment>, Vec<u64>) {
    let mut results = Vec::with_capacity(ids.len());
    let mut excluded = Vec::new();
    for &id in ids {
        match cache.get(id) {
            Some(item) => results.push(scorer.assess(&item.work_item(), today)),
            None => excluded.push(id),
        }
    }
    (results, excluded)
}

/// Resolve the expected-id set: the given source, else the cache snapshot.
pub fn resolve_expected(
    cache: &WorkItemCache,
    config: &Config,
    source: Option<&dyn ExpectedIdSource>,
) -> Result<(ExpectedIds, String)> {
    match source {
        Some(source) => {
            let expected = source.expected_ids()?;
            if expected.is_empty() {
                return Err(WiqError::NoExpectedIds);
            }
            Ok((expected, source.describe()))
        }
        None => {
            let expected = cache
                .expected_snapshot(&config.reports.default_label)
                .filter(|e| !e.is_empty())
                .ok_or(WiqError::NoExpectedIds)?;
            Ok((expected, "cache metadata snapshot".to_string()))
        }
    }
}

/// Run one assessment over `loaded`. The caller loads the cache so a
/// cold-start warning can be reported even when this returns an error; the
/// warning is also carried on either outcome.
pub fn run(
    root: &Path,
    config: &Config,
    loaded: LoadedCache,
    source: Option<&dyn ExpectedIdSource>,
    options: &AssessOptions,
) -> Result<AssessOutcome> {
    let LoadedCache {
        cache,
        warning: cache_warning,
    } = loaded;

    let (expected, source_name) = resolve_expected(&cache, config, source)?;
    let sync = cache.sync(&expected.union());
    tracing::info!(
        expected = sync.expected,
        cached = sync.cached,
        missing = sync.missing.len(),
        extra = sync.extra.len(),
        "cache compared against expected ids"
    );

    if sync.has_gaps() && !options.allow_gaps {
        let fetch = plan_fetch(&sync.needs_fetch(), config);
        return Ok(AssessOutcome::Halted(GapReport {
            source: source_name,
            cache_warning,
            sync,
            fetch,
        }));
    }
    if sync.has_gaps() {
        tracing::warn!(missing = sync.missing.len(), "assessing with gaps");
    }

    let scorer = Scorer::new(config.assessment.prelim_days);
    let out_dir = match &options.out_dir {
        Some(dir) => dir.clone(),
        None => config.reports_dir(root),
    };

    let mut labels = Vec::new();
    for (label, ids) in expected.iter() {
        let (results, excluded) = assess_ids(&cache, ids, &scorer, options.today);
        let summary = Summary::from_results(label, &results);
        let files = write_reports(
            &out_dir,
            &summary,
            &results,
            options.now,
            config.assessment.prelim_days,
        )?;
        tracing::info!(
            label,
            assessed = results.len(),
            excluded = excluded.len(),
            "label assessed"
        );
        labels.push(LabelRun {
            summary,
            excluded,
            files,
            results,
        });
    }

    Ok(AssessOutcome::Completed(AssessRun {
        source: source_name,
        cache_warning,
        sync,
        labels,
    }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
