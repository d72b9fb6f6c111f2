use anyhow::Context;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

/// Half-open `[start, end)` date range covering one calendar period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }

    /// The same range as UTC instants, for filtering `TIMESTAMPTZ` columns.
    pub fn as_utc(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        (
            self.start.and_time(NaiveTime::MIN).and_utc(),
            self.end.and_time(NaiveTime::MIN).and_utc(),
        )
    }
}

pub fn month_range(year: i32, month: u32) -> anyhow::Result<DateRange> {
    anyhow::ensure!((1..=12).contains(&month), "month must be 1..=12 (got {month})");

    let start = NaiveDate::from_ymd_opt(year, month, 1)
        .with_context(|| format!("invalid year/month {year}-{month:02}"))?;
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let end = NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .with_context(|| format!("invalid year/month {next_year}-{next_month:02}"))?;

    Ok(DateRange { start, end })
}

pub fn year_range(year: i32) -> anyhow::Result<DateRange> {
    let start = NaiveDate::from_ymd_opt(year, 1, 1)
        .with_context(|| format!("invalid year {year}"))?;
    let end = NaiveDate::from_ymd_opt(year + 1, 1, 1)
        .with_context(|| format!("invalid year {}", year + 1))?;
    Ok(DateRange { start, end })
}

/// Resolve the optional `year`/`month` query pair used by listing endpoints.
///
/// A month without a year is ignored, matching how the filter has always behaved for clients.
pub fn resolve_period(year: Option<i32>, month: Option<u32>) -> anyhow::Result<Option<DateRange>> {
    match (year, month) {
        (Some(y), Some(m)) => month_range(y, m).map(Some),
        (Some(y), None) => year_range(y).map(Some),
        (None, _) => Ok(None),
    }
}
