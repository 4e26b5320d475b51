use chrono::{Duration, Local, NaiveDate, NaiveDateTime, Timelike};

pub const DEFAULT_DAY_BOUNDARY_HOUR: u32 = 6;

/// The date an undated interaction targets. Before the boundary hour the
/// previous calendar day is still "today" (a 3 a.m. entry belongs to the
/// evening that just ended).
pub fn logical_date(now: NaiveDateTime, boundary_hour: u32) -> NaiveDate {
    if now.hour() < boundary_hour {
        now.date() - Duration::days(1)
    } else {
        now.date()
    }
}

/// `logical_date` against the wall clock. Single source of truth for what
/// date an undated button interaction writes to.
pub fn logical_today(boundary_hour: u32) -> NaiveDate {
    logical_date(Local::now().naive_local(), boundary_hour)
}

/// The last `days` logical dates, most recent first, with display labels
/// for date-picker menus.
pub fn recent_dates(days: u32, boundary_hour: u32) -> Vec<(NaiveDate, String)> {
    let today = logical_today(boundary_hour);

    (0..days)
        .map(|offset| {
            let date = today - Duration::days(i64::from(offset));
            let label = match offset {
                0 => format!("Today ({date})"),
                1 => format!("Yesterday ({date})"),
                _ => date.to_string(),
            };
            (date, label)
        })
        .collect()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
