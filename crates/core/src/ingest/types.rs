use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

/// One daily bar after null filtering. Timestamps are unix seconds, as
/// delivered by the chart endpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyClose {
    pub timestamp: i64,
    pub close: f64,
}

/// Fetch interval bounds in unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchRange {
    pub start: i64,
    pub end: i64,
}

impl FetchRange {
    /// Fetch from a margin before the competition start through `now`. The
    /// margin guarantees at least one bar precedes the start date; the
    /// anchor resolver truncates back to the start.
    pub fn with_lookback(
        competition_start: NaiveDate,
        lookback_days: i64,
        now: DateTime<Utc>,
    ) -> Self {
        let start = (competition_start - chrono::Duration::days(lookback_days))
            .and_time(NaiveTime::MIN)
            .and_utc()
            .timestamp();
        Self {
            start,
            end: now.timestamp(),
        }
    }
}
