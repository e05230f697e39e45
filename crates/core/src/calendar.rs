use chrono::{Datelike, NaiveDate};

/// Cells of a month view with weeks starting on Sunday: `None` for the blank
/// cells before the 1st, then `Some(day)` for every day of the month.
///
/// Returns `None` for an invalid year/month.
#[must_use]
pub fn month_days(year: i32, month: u32) -> Option<Vec<Option<u32>>> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next_month = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    let days_in_month = u32::try_from((next_month - first).num_days()).ok()?;
    let offset = first.weekday().num_days_from_sunday() as usize;

    let mut cells = vec![None; offset];
    cells.extend((1..=days_in_month).map(Some));
    Some(cells)
}
