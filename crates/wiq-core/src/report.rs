//! CSV and plain-text renderings of an assessment run.

use crate::error::Result;
use crate::io::atomic_write;
use crate::paths;
use crate::score::Assessment;
use crate::types::Grade;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const CSV_HEADER: &str =
    "Id,Type,Title,State,CreatedBy,StartDate,TargetDate,Grade,Score,Rationale";

/// Items listed per risk bucket before the list is cut short.
pub const RISK_LIST_LIMIT: usize = 10;
/// Ids listed per creator bucket before "... and N more".
pub const CREATOR_LIST_LIMIT: usize = 20;

const RULE_WIDE: usize = 80;
const RULE_NARROW: usize = 40;
const TITLE_PREVIEW: usize = 60;

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

/// Quote a cell when it contains a comma, quote or line break.
pub fn csv_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

fn date_cell(date: Option<chrono::NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

pub fn render_csv(results: &[Assessment]) -> String {
    let mut out = String::with_capacity(64 * (results.len() + 1));
    out.push_str(CSV_HEADER);
    out.push('\n');
    for r in results {
        let cells = [
            r.id.to_string(),
            r.work_item_type.to_string(),
            r.title.clone(),
            r.state.clone(),
            r.created_by.clone(),
            date_cell(r.start_date),
            date_cell(r.target_date),
            r.grade.clone(),
            r.score.to_string(),
            r.rationale.clone(),
        ];
        let row: Vec<Cow<'_, str>> = cells.iter().map(|c| csv_field(c)).collect();
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeCount {
    pub grade: Grade,
    pub count: usize,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskItem {
    pub id: u64,
    pub title: String,
}

/// Aggregates behind the text summary, also emitted as JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub label: String,
    pub total: usize,
    /// Best grade first.
    pub grades: Vec<GradeCount>,
    pub prelim: usize,
    pub imminent: usize,
    /// Non-prelim F items.
    pub immediate_risk: Vec<RiskItem>,
    /// Non-prelim D items.
    pub high_risk: Vec<RiskItem>,
    /// Creator → base grade → ids, in result order.
    pub by_creator: BTreeMap<String, BTreeMap<Grade, Vec<u64>>>,
}

impl Summary {
    pub fn from_results(label: &str, results: &[Assessment]) -> Self {
        let total = results.len();
        let grades = Grade::all()
            .iter()
            .map(|&grade| {
                let count = results.iter().filter(|r| r.base_grade == grade).count();
                let percent = if total > 0 {
                    count as f64 / total as f64 * 100.0
                } else {
                    0.0
                };
                GradeCount {
                    grade,
                    count,
                    percent,
                }
            })
            .collect();

        let prelim = results.iter().filter(|r| r.prelim).count();
        let risk = |grade: Grade| -> Vec<RiskItem> {
            results
                .iter()
                .filter(|r| !r.prelim && r.base_grade == grade)
                .map(|r| RiskItem {
                    id: r.id,
                    title: r.title.clone(),
                })
                .collect()
        };

        let mut by_creator: BTreeMap<String, BTreeMap<Grade, Vec<u64>>> = BTreeMap::new();
        for r in results {
            by_creator
                .entry(r.created_by.clone())
                .or_default()
                .entry(r.base_grade)
                .or_default()
                .push(r.id);
        }

        Self {
            label: label.to_string(),
            total,
            grades,
            prelim,
            imminent: total - prelim,
            immediate_risk: risk(Grade::F),
            high_risk: risk(Grade::D),
            by_creator,
        }
    }

    pub fn count(&self, grade: Grade) -> usize {
        self.grades
            .iter()
            .find(|g| g.grade == grade)
            .map(|g| g.count)
            .unwrap_or(0)
    }
}

fn preview(title: &str) -> String {
    if title.chars().count() > TITLE_PREVIEW {
        let cut: String = title.chars().take(TITLE_PREVIEW).collect();
        format!("{cut}...")
    } else {
        title.to_string()
    }
}

pub fn render_summary(summary: &Summary, generated: NaiveDateTime, prelim_days: i64) -> String {
    let wide = "=".repeat(RULE_WIDE);
    let narrow = "-".repeat(RULE_NARROW);
    let mut lines: Vec<String> = vec![
        wide.clone(),
        "TICKET QUALITY ASSESSMENT REPORT".to_string(),
        format!("Generated: {}", generated.format("%Y-%m-%d %H:%M:%S")),
        format!("Query: {}", summary.label),
        format!("Total Tickets Assessed: {}", summary.total),
        wide,
        String::new(),
        "GRADE DISTRIBUTION".to_string(),
        narrow.clone(),
        "Overall:".to_string(),
    ];
    for g in &summary.grades {
        lines.push(format!("  {}: {} ({:.1}%)", g.grade, g.count, g.percent));
    }
    lines.push(String::new());
    lines.push("Prelim vs Imminent:".to_string());
    lines.push(format!("  Prelim (>{prelim_days} days): {} tickets", summary.prelim));
    lines.push(format!(
        "  Imminent (<={prelim_days} days): {} tickets",
        summary.imminent
    ));
    lines.push(String::new());

    lines.push("RISK ASSESSMENT".to_string());
    lines.push(narrow.clone());
    for (heading, items) in [
        ("F-grade imminent (IMMEDIATE RISK)", &summary.immediate_risk),
        ("D-grade imminent (HIGH RISK)", &summary.high_risk),
    ] {
        lines.push(format!("{heading}: {}", items.len()));
        for item in items.iter().take(RISK_LIST_LIMIT) {
            lines.push(format!("  {}: {}", item.id, preview(&item.title)));
        }
        if items.len() > RISK_LIST_LIMIT {
            lines.push(format!("  ... and {} more", items.len() - RISK_LIST_LIMIT));
        }
        lines.push(String::new());
    }

    lines.push("BY CREATOR".to_string());
    lines.push(narrow);
    for (creator, buckets) in &summary.by_creator {
        lines.push(format!("{creator}:"));
        // Grade orders F first, so buckets come out worst first.
        for (grade, ids) in buckets {
            let shown: Vec<String> = ids
                .iter()
                .take(CREATOR_LIST_LIMIT)
                .map(u64::to_string)
                .collect();
            lines.push(format!("  {grade}-Grade: {}", shown.join(", ")));
            if ids.len() > CREATOR_LIST_LIMIT {
                lines.push(format!("    ... and {} more", ids.len() - CREATOR_LIST_LIMIT));
            }
        }
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WrittenReport {
    pub csv: PathBuf,
    pub summary: PathBuf,
}

/// Write `{label}_quality_report_{stamp}.csv` and `{label}_summary_{stamp}.txt`
/// into `dir`.
pub fn write_reports(
    dir: &Path,
    summary: &Summary,
    results: &[Assessment],
    generated: NaiveDateTime,
    prelim_days: i64,
) -> Result<WrittenReport> {
    let stamp = generated.format("%Y%m%d_%H%M%S").to_string();
    let csv = dir.join(paths::report_csv_name(&summary.label, &stamp));
    let summary_path = dir.join(paths::summary_name(&summary.label, &stamp));

    atomic_write(&csv, render_csv(results).as_bytes())?;
    atomic_write(
        &summary_path,
        render_summary(summary, generated, prelim_days).as_bytes(),
    )?;
    tracing::info!(csv = %csv.display(), summary = %summary_path.display(), "reports written");

    Ok(WrittenReport {
        csv,
        summary: summary_path,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
