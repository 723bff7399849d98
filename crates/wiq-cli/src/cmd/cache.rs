use crate::cmd::id_list;
use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use std::io::Read;
use std::path::{Path, PathBuf};
use wiq_core::cache::{parse_batch, LoadedCache, WorkItemCache};
use wiq_core::config::Config;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum CacheSubcommand {
    /// Show cache size and how it compares to the recorded query snapshot
    Status,

    /// Merge a fetched batch of work items (JSON) into the cache
    Save {
        /// Batch file; reads stdin when omitted
        file: Option<PathBuf>,
    },

    /// Remove items from the cache
    Prune {
        /// Ids to remove
        #[arg(conflicts_with = "stale", required_unless_present = "stale")]
        ids: Vec<u64>,

        /// Remove every cached item the recorded snapshot no longer expects
        #[arg(long)]
        stale: bool,

        /// Confirm a --stale prune
        #[arg(long)]
        yes: bool,
    },
}

pub fn run(root: &Path, subcmd: CacheSubcommand, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    match subcmd {
        CacheSubcommand::Status => status(root, &config, json),
        CacheSubcommand::Save { file } => save(root, &config, file.as_deref(), json),
        CacheSubcommand::Prune { ids, stale, yes } => {
            prune(root, &config, ids, stale, yes, json)
        }
    }
}

/// Load the configured cache, surfacing a cold-start warning on stderr.
/// Load the cache, printing any cold-start warning to stderr.
pub fn load_cache(root: &Path, config: &Config) -> LoadedCache {
    let loaded = WorkItemCache::load(&config.cache_path(root));
    if let Some(warning) = &loaded.warning {
        eprintln!("warning: {warning}");
    }
    loaded
}

// ---------------------------------------------------------------------------
// status
// ---------------------------------------------------------------------------

fn status(root: &Path, config: &Config, json: bool) -> anyhow::Result<()> {
    let cache = load_cache(root, config).cache;
    let snapshot = cache.expected_snapshot(&config.reports.default_label);
    let sync = snapshot.as_ref().map(|s| cache.sync(&s.union()));

    if json {
        let value = serde_json::json!({
            "path": config.cache_path(root),
            "total_items": cache.len(),
            "last_updated": cache.metadata.last_updated,
            "last_query_sync": cache.metadata.last_query_sync,
            "sync": sync,
        });
        return print_json(&value);
    }

    println!("Cache: {}", config.cache_path(root).display());
    println!("  Items:        {}", cache.len());
    match cache.metadata.last_updated {
        Some(ts) => println!("  Last updated: {}", ts.format("%Y-%m-%d %H:%M:%S UTC")),
        None => println!("  Last updated: never"),
    }

    let (Some(snapshot), Some(sync)) = (snapshot, sync) else {
        println!("\nNo query snapshot recorded. Run 'wiq sync check <results.json>'.");
        return Ok(());
    };

    if let Some(ts) = cache.metadata.last_query_sync {
        println!("  Query sync:   {}", ts.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    println!();
    let rows: Vec<Vec<String>> = snapshot
        .iter()
        .map(|(label, ids)| {
            let cached = ids.iter().filter(|id| cache.contains(**id)).count();
            vec![label.to_string(), ids.len().to_string(), cached.to_string()]
        })
        .collect();
    print_table(&["QUERY", "EXPECTED", "CACHED"], &rows);

    println!();
    println!("Missing:    {}", sync.missing.len());
    println!("Extra:      {}", sync.extra.len());
    println!("Incomplete: {}", sync.incomplete.len());
    if sync.is_in_sync() {
        println!("\nCache is fully synced.");
    } else {
        println!("\nRun 'wiq sync instructions' for fetch batches.");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// save
// ---------------------------------------------------------------------------

fn read_input(file: Option<&Path>) -> anyhow::Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read stdin")?;
            Ok(buf)
        }
    }
}

fn save(root: &Path, config: &Config, file: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let input = read_input(file)?;
    let value: serde_json::Value =
        serde_json::from_str(&input).context("input is not valid JSON")?;
    let batch = parse_batch(&value).context("batch rejected; cache left unchanged")?;
    if batch.is_empty() {
        anyhow::bail!("no work items found in input");
    }

    let path = config.cache_path(root);
    let mut cache = load_cache(root, config).cache;
    let outcome = cache.merge_batch(batch, &config.fields);
    cache
        .save(&path)
        .with_context(|| format!("failed to write {}", path.display()))?;

    if json {
        let value = serde_json::json!({
            "added": outcome.added,
            "updated": outcome.updated,
            "unchanged": outcome.unchanged,
            "total_items": cache.len(),
        });
        print_json(&value)?;
    } else {
        println!(
            "Saved: {} added, {} updated, {} unchanged ({} items in cache)",
            outcome.added,
            outcome.updated,
            outcome.unchanged,
            cache.len()
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// prune
// ---------------------------------------------------------------------------

fn prune(
    root: &Path,
    config: &Config,
    ids: Vec<u64>,
    stale: bool,
    yes: bool,
    json: bool,
) -> anyhow::Result<()> {
    let path = config.cache_path(root);
    let mut cache = load_cache(root, config).cache;

    let targets = if stale {
        let snapshot = cache
            .expected_snapshot(&config.reports.default_label)
            .context("no query snapshot recorded; run 'wiq sync check' first")?;
        let extra = cache.sync(&snapshot.union()).extra;
        if !yes {
            if json {
                print_json(&serde_json::json!({ "candidates": extra, "removed": [] }))?;
            } else if extra.is_empty() {
                println!("No stale items.");
            } else {
                println!("{} stale items: {}", extra.len(), id_list(&extra));
                println!("Re-run with --yes to remove them.");
            }
            return Ok(());
        }
        extra
    } else {
        ids
    };

    let report = cache.prune(&targets);
    if !report.removed.is_empty() {
        cache
            .save(&path)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    if json {
        print_json(&report)?;
    } else {
        println!("Removed {} items ({} remain)", report.removed.len(), cache.len());
        if !report.not_found.is_empty() {
            println!("Not in cache: {}", id_list(&report.not_found));
        }
    }
    Ok(())
}
