pub mod assess;
pub mod cache;
pub mod config;
pub mod init;
pub mod score;
pub mod sync;

use anyhow::Context;
use chrono::{Local, NaiveDate};
use wiq_core::WiqError;

/// `--today` override, else the local date.
pub fn parse_today(raw: Option<&str>) -> anyhow::Result<NaiveDate> {
    match raw {
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map_err(|_| WiqError::InvalidDate(s.to_string()))
            .context("invalid --today"),
        None => Ok(Local::now().date_naive()),
    }
}

/// Ids joined for display.
pub fn id_list(ids: &[u64]) -> String {
    ids.iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
