//! BLS period codes to calendar dates.

use chrono::NaiveDate;
use tracing::warn;

fn first_of(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1)
        .or_else(|| NaiveDate::from_ymd_opt(year, 1, 1))
        .unwrap_or(NaiveDate::MIN)
}

fn number_after(period: &str, prefix: char) -> Option<u32> {
    period.strip_prefix(prefix)?.parse().ok()
}

/// First day of the period `period` in `year`.
///
/// | period      | date                    |
/// |-------------|-------------------------|
/// | `M01`-`M12` | first of that month     |
/// | `Q01`-`Q04` | first of the quarter    |
/// | `S01`/`S02` | January 1 / July 1      |
/// | `A..`       | January 1               |
/// | `1`-`12`    | first of that month     |
///
/// Anything else (`M13` annual averages, `Q05`, garbage) maps to January 1
/// with a warning.
pub fn period_to_date(year: i32, period: &str) -> NaiveDate {
    let p = period.trim();
    let month = match p.chars().next() {
        Some('M') => number_after(p, 'M').filter(|m| (1..=12).contains(m)),
        Some('Q') => number_after(p, 'Q')
            .filter(|q| (1..=4).contains(q))
            .map(|q| (q - 1) * 3 + 1),
        Some('S') => match number_after(p, 'S') {
            Some(1) => Some(1),
            Some(2) => Some(7),
            _ => None,
        },
        Some('A') => Some(1),
        _ => p.parse::<u32>().ok().filter(|m| (1..=12).contains(m)),
    };

    match month {
        Some(m) => first_of(year, m),
        None => {
            warn!("Could not parse period '{period}' for year {year}, defaulting to January 1st");
            first_of(year, 1)
        }
    }
}

/// [`period_to_date`] formatted as `YYYY-MM-DD` for storage.
pub fn period_date_string(year: i32, period: &str) -> String {
    period_to_date(year, period).format("%Y-%m-%d").to_string()
}
