use crate::cmd::cache::load_cache;
use crate::output::print_json;
use anyhow::Context;
use chrono::Utc;
use clap::Subcommand;
use std::path::{Path, PathBuf};
use wiq_core::cache::SyncReport;
use wiq_core::config::Config;
use wiq_core::expected::ExpectedIds;
use wiq_core::fetch::{plan_fetch, FetchRequest};

#[derive(Subcommand)]
pub enum SyncSubcommand {
    /// Diff the cache against query results and record them as the snapshot
    Check {
        /// Query results JSON: an id array, {"ids": [...]} or {"queries": {...}}
        file: PathBuf,
    },

    /// Print fetch batches for what the recorded snapshot still needs
    Instructions,
}

pub fn run(root: &Path, subcmd: SyncSubcommand, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    match subcmd {
        SyncSubcommand::Check { file } => check(root, &config, &file, json),
        SyncSubcommand::Instructions => instructions(root, &config, json),
    }
}

fn check(root: &Path, config: &Config, file: &Path, json: bool) -> anyhow::Result<()> {
    let expected = ExpectedIds::from_file(file, &config.reports.default_label)
        .with_context(|| format!("failed to read query results from {}", file.display()))?;
    if expected.is_empty() {
        anyhow::bail!("{} lists no work item ids", file.display());
    }
    for label in expected.labels() {
        if label != config.reports.default_label && config.query_id(label).is_err() {
            tracing::warn!(label, "query label is not in config.queries");
        }
    }

    let path = config.cache_path(root);
    let mut cache = load_cache(root, config).cache;
    cache.record_expected(&expected, Utc::now());
    cache
        .save(&path)
        .with_context(|| format!("failed to write {}", path.display()))?;

    let sync = cache.sync(&expected.union());
    let plan = plan_fetch(&sync.needs_fetch(), config);
    report(&sync, &plan, json)
}

fn instructions(root: &Path, config: &Config, json: bool) -> anyhow::Result<()> {
    let cache = load_cache(root, config).cache;
    let snapshot = cache
        .expected_snapshot(&config.reports.default_label)
        .context("no query snapshot recorded; run 'wiq sync check <results.json>' first")?;
    let sync = cache.sync(&snapshot.union());
    let plan = plan_fetch(&sync.needs_fetch(), config);
    report(&sync, &plan, json)
}

fn report(sync: &SyncReport, plan: &[FetchRequest], json: bool) -> anyhow::Result<()> {
    if json {
        let batches: Vec<serde_json::Value> = plan
            .iter()
            .map(|r| {
                serde_json::json!({
                    "batch": r.batch,
                    "project": r.project,
                    "body": r.body(),
                })
            })
            .collect();
        let value = serde_json::json!({
            "sync": sync,
            "needs_fetch": sync.needs_fetch(),
            "batches": batches,
        });
        return print_json(&value);
    }

    println!("Expected: {}  Cached: {}", sync.expected, sync.cached);
    println!("New items to fetch: {}", sync.missing.len());
    println!("Incomplete items to re-fetch: {}", sync.incomplete.len());
    if !sync.extra.is_empty() {
        println!(
            "Cached items no longer expected: {} (remove with 'wiq cache prune --stale --yes')",
            sync.extra.len()
        );
    }
    print_fetch_plan(plan);
    Ok(())
}

/// Human-readable fetch batches, shared with `wiq assess --sync`.
pub fn print_fetch_plan(plan: &[FetchRequest]) {
    let Some(first) = plan.first() else {
        println!("\nCache is fully synced - no fetch needed.");
        return;
    };
    let total: usize = plan.iter().map(|r| r.ids.len()).sum();
    println!("\nFETCH INSTRUCTIONS ({total} ids, {} batches)", plan.len());
    println!("  project: {}", first.project);
    println!("  fields:  {}", first.fields.join(", "));
    for request in plan {
        println!("\n{}", request.describe());
    }
    println!("\nSave each response with: wiq cache save <response.json>");
}
