//! crates/shelf_core/src/progress.rs
//!
//! Buckets reading-log entries into per-day page totals for the progress chart.

use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};

use crate::domain::{DailyProgress, ReadingLogEntry};

/// Default number of trailing days shown in the progress chart.
pub const DEFAULT_WINDOW_DAYS: u32 = 30;

/// First day included in a window of `days` ending on `today`. Windows
/// reaching past the earliest representable date start there instead.
pub fn window_start(today: NaiveDate, days: u32) -> NaiveDate {
    today
        .checked_sub_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MIN)
}

/// Sums pages per calendar date, ascending by date. Days without entries are omitted.
pub fn daily_totals(entries: &[ReadingLogEntry]) -> Vec<DailyProgress> {
    let mut totals: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for entry in entries {
        *totals.entry(entry.read_date).or_default() += u64::from(entry.pages_read_on_date);
    }
    totals
        .into_iter()
        .map(|(date, pages_read)| DailyProgress { date, pages_read })
        .collect()
}
