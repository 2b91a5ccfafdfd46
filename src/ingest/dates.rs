//! Date normalisation for scraped item dates.
//!
//! Sources print dates in a handful of layouts. Each layout is tried in
//! order and must match the whole trimmed text exactly; chrono alone would
//! also accept unpadded fields, so a candidate is only kept when formatting
//! it back reproduces the input.

use chrono::{Days, NaiveDate};

/// Accepted layouts, in priority order.
pub const DATE_FORMATS: [&str; 4] = ["%Y/%m/%d", "%Y-%m-%d", "%Y.%m.%d", "%Y年%m月%d日"];

/// Parse a scraped date. `None` when no layout matches strictly.
pub fn parse_item_date(text: &str) -> Option<NaiveDate> {
    let t = text.trim();
    if t.is_empty() {
        return None;
    }
    DATE_FORMATS.iter().find_map(|fmt| {
        NaiveDate::parse_from_str(t, fmt)
            .ok()
            .filter(|d| d.format(fmt).to_string() == t)
    })
}

/// Earliest excluded date for a window of `days` ending today.
pub fn cutoff_date(today: NaiveDate, days: u32) -> NaiveDate {
    today
        .checked_sub_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MIN)
}

/// Strictly after the cutoff.
pub fn within_window(date: NaiveDate, today: NaiveDate, days: u32) -> bool {
    date > cutoff_date(today, days)
}
