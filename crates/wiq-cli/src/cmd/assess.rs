use crate::cmd::cache::load_cache;
use crate::cmd::sync::print_fetch_plan;
use crate::cmd::{id_list, parse_today};
use crate::output::{print_json, print_table};
use anyhow::Context;
use chrono::Local;
use clap::Args;
use std::path::{Path, PathBuf};
use wiq_core::assess::{self, AssessOptions, AssessOutcome, AssessRun, GapReport};
use wiq_core::config::Config;
use wiq_core::expected::{ExpectedIdSource, QueryResultsFile};
use wiq_core::types::Grade;

#[derive(Args)]
pub struct AssessArgs {
    /// Query results JSON; defaults to the snapshot recorded by 'wiq sync check'
    #[arg(long, value_name = "FILE")]
    query_ids: Option<PathBuf>,

    /// On gaps, print fetch instructions for the missing items
    #[arg(long)]
    sync: bool,

    /// Assess cached items even when expected items are missing
    #[arg(long)]
    allow_gaps: bool,

    /// Reports directory (default: reports.dir from config)
    #[arg(long, value_name = "DIR")]
    out: Option<PathBuf>,

    /// Evaluate Prelim against this date (YYYY-MM-DD) instead of today
    #[arg(long)]
    today: Option<String>,
}

pub fn run(root: &Path, args: AssessArgs, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let options = AssessOptions {
        allow_gaps: args.allow_gaps,
        today: parse_today(args.today.as_deref())?,
        now: Local::now().naive_local(),
        out_dir: args.out,
    };
    let source = args.query_ids.map(|path| QueryResultsFile {
        path,
        default_label: config.reports.default_label.clone(),
    });
    let source = source.as_ref().map(|s| s as &dyn ExpectedIdSource);

    let loaded = load_cache(root, &config);
    let outcome =
        assess::run(root, &config, loaded, source, &options).context("assessment failed")?;
    match outcome {
        AssessOutcome::Halted(gaps) => halted(&gaps, args.sync, json),
        AssessOutcome::Completed(run) => completed(&run, json),
    }
}

fn halted(gaps: &GapReport, sync: bool, json: bool) -> anyhow::Result<()> {
    if json {
        print_json(gaps)?;
    } else {
        println!("Expected ids from {}", gaps.source);
        println!(
            "{} expected items are not in the cache: {}",
            gaps.sync.missing.len(),
            id_list(&gaps.sync.missing)
        );
        if sync {
            print_fetch_plan(&gaps.fetch);
        } else {
            println!("Run with --sync for fetch instructions, or --allow-gaps to assess anyway.");
        }
    }
    anyhow::bail!(
        "cache is missing {} expected items",
        gaps.sync.missing.len()
    )
}

fn completed(run: &AssessRun, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(run);
    }

    println!("Expected ids from {}", run.source);
    if run.gap_count() > 0 {
        println!(
            "Gaps: {} expected items were not assessed: {}",
            run.gap_count(),
            id_list(&run.sync.missing)
        );
    }
    println!();

    let rows: Vec<Vec<String>> = run
        .labels
        .iter()
        .map(|label| {
            let s = &label.summary;
            let mut row = vec![s.label.clone(), s.total.to_string()];
            row.extend(Grade::all().iter().map(|&g| s.count(g).to_string()));
            row.push(s.prelim.to_string());
            row
        })
        .collect();
    print_table(&["QUERY", "TOTAL", "A", "B", "C", "D", "F", "PRELIM"], &rows);

    println!();
    for label in &run.labels {
        println!("CSV report saved: {}", label.files.csv.display());
        println!("Summary saved:    {}", label.files.summary.display());
    }
    Ok(())
}
