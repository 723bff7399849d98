use crate::cmd::cache::load_cache;
use crate::cmd::parse_today;
use crate::output::{print_json, print_table};
use anyhow::Context;
use std::path::Path;
use wiq_core::config::Config;
use wiq_core::rules;
use wiq_core::score::{is_prelim, Scorer};
use wiq_core::WiqError;

pub fn run(root: &Path, id: u64, today: Option<&str>, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let today = parse_today(today)?;
    let cache = load_cache(root, &config).cache;
    let item = cache.get(id).ok_or(WiqError::NotCached(id))?.work_item();

    let scorer = Scorer::new(config.assessment.prelim_days);
    let breakdown = scorer.breakdown(&item);
    let assessment = scorer.assess(&item, today);

    if json {
        let value = serde_json::json!({
            "assessment": assessment,
            "breakdown": breakdown,
        });
        return print_json(&value);
    }

    println!("{} [{}] {}", item.id, item.work_item_type, item.title);
    println!("  Created by: {}", item.created_by);
    if let Some(start) = item.start_date {
        let window = if is_prelim(Some(start), today, scorer.prelim_days) {
            "Prelim"
        } else {
            "Imminent"
        };
        println!("  Start date: {start} ({window})");
    }
    println!();

    let mut rows = vec![
        vec![
            "Description substance".to_string(),
            format!("{} words", breakdown.description_words),
            breakdown.description_points.to_string(),
            rules::DESCRIPTION_SUBSTANCE[0].1.to_string(),
        ],
        vec![
            "AC substance".to_string(),
            format!("{} words", breakdown.ac_words),
            breakdown.ac_points.to_string(),
            rules::AC_SUBSTANCE[0].1.to_string(),
        ],
    ];
    rows.extend(breakdown.dimensions.iter().map(|d| {
        vec![
            d.dimension.label().to_string(),
            format!("{} matches", d.matches),
            d.points.to_string(),
            d.max_points.to_string(),
        ]
    }));
    print_table(&["CHECK", "FOUND", "POINTS", "MAX"], &rows);

    println!();
    println!("Score:     {}", breakdown.score);
    if let Some(cap) = breakdown.cap {
        println!("Cap:       {cap}");
    }
    println!("Grade:     {}", assessment.grade);
    println!("Rationale: {}", assessment.rationale);
    Ok(())
}
