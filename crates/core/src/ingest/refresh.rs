use crate::domain::pricing::{resolve_anchor, PriceAnchor};
use crate::ingest::provider::PriceHistoryProvider;
use crate::ingest::types::FetchRange;
use chrono::{NaiveDate, Utc};
use std::collections::BTreeMap;
use std::time::Duration;

const DEFAULT_REQUEST_DELAY_MS: u64 = 400;
const DEFAULT_LOOKBACK_DAYS: i64 = 30;
const DEFAULT_PROGRESS_EVERY: usize = 10;

#[derive(Debug, Clone)]
pub struct RefreshOptions {
    /// Pause between provider requests. The provider enforces no explicit
    /// quota; serialized requests with a fixed delay keep us under its
    /// implicit one.
    pub request_delay: Duration,
    pub lookback_days: i64,
    pub progress_every: usize,
}

impl Default for RefreshOptions {
    fn default() -> Self {
        Self {
            request_delay: Duration::from_millis(DEFAULT_REQUEST_DELAY_MS),
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            progress_every: DEFAULT_PROGRESS_EVERY,
        }
    }
}

impl RefreshOptions {
    pub fn from_env() -> Self {
        let mut out = Self::default();

        if let Some(ms) = std::env::var("PRICE_FETCH_DELAY_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
        {
            out.request_delay = Duration::from_millis(ms);
        }

        if let Some(days) = std::env::var("PRICE_LOOKBACK_DAYS")
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
        {
            out.lookback_days = days;
        }

        if let Some(n) = std::env::var("PRICE_PROGRESS_EVERY")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
        {
            out.progress_every = n;
        }

        out
    }
}

#[derive(Debug)]
pub struct RefreshOutcome {
    /// Anchors resolved this run, keyed by raw ticker.
    pub anchors: BTreeMap<String, PriceAnchor>,
    pub failures: usize,
}

/// Refresh the whole universe sequentially, one provider request per
/// security with a fixed delay in between. Fetch, parse, and resolution
/// failures are logged and skipped — a bad security never aborts the batch,
/// it just leaves its previously stored anchor untouched at merge time.
pub async fn refresh_universe(
    provider: &dyn PriceHistoryProvider,
    universe: &[String],
    competition_start: NaiveDate,
    range: FetchRange,
    opts: &RefreshOptions,
) -> RefreshOutcome {
    let mut anchors = BTreeMap::new();
    let mut failures = 0usize;
    let total = universe.len();

    for (idx, ticker) in universe.iter().enumerate() {
        if idx != 0 {
            tokio::time::sleep(opts.request_delay).await;
        }

        let resolved = match provider.fetch_daily_closes(ticker, range).await {
            Ok(series) => resolve_anchor(&series, competition_start, Utc::now()),
            Err(err) => Err(err),
        };

        match resolved {
            Ok(anchor) => {
                anchors.insert(ticker.clone(), anchor);
            }
            Err(err) => {
                failures += 1;
                tracing::warn!(
                    ticker = %ticker,
                    failure_count = failures,
                    error = %err,
                    "price refresh failed; skipping security"
                );
            }
        }

        if opts.progress_every != 0 {
            let n = idx + 1;
            if n == 1 || n == total || (n % opts.progress_every == 0) {
                tracing::info!(
                    processed = n,
                    total,
                    anchors = anchors.len(),
                    failures,
                    "universe refresh progress"
                );
            }
        }
    }

    RefreshOutcome { anchors, failures }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::DailyClose;
    use anyhow::Result;
    use chrono::NaiveTime;

    struct StubProvider;

    #[async_trait::async_trait]
    impl PriceHistoryProvider for StubProvider {
        fn provider_name(&self) -> &'static str {
            "stub"
        }

        async fn fetch_daily_closes(
            &self,
            ticker: &str,
            _range: FetchRange,
        ) -> Result<Vec<DailyClose>> {
            let day = |d: u32, close: f64| DailyClose {
                timestamp: NaiveDate::from_ymd_opt(2026, 3, d)
                    .unwrap()
                    .and_time(NaiveTime::MIN)
                    .and_utc()
                    .timestamp(),
                close,
            };

            match ticker {
                "GOOD" => Ok(vec![day(2, 100.0), day(3, 108.0)]),
                "EMPTY" => Ok(vec![]),
                _ => anyhow::bail!("provider outage"),
            }
        }
    }

    #[tokio::test]
    async fn failures_are_skipped_and_counted() {
        let universe = vec![
            "GOOD".to_string(),
            "EMPTY".to_string(),
            "DOWN".to_string(),
        ];
        let start = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let range = FetchRange::with_lookback(start, 30, Utc::now());
        let opts = RefreshOptions {
            request_delay: Duration::ZERO,
            ..RefreshOptions::default()
        };

        let outcome = refresh_universe(&StubProvider, &universe, start, range, &opts).await;

        assert_eq!(outcome.failures, 2);
        assert_eq!(outcome.anchors.len(), 1);
        let anchor = &outcome.anchors["GOOD"];
        assert_eq!(anchor.start_price, 100.0);
        assert_eq!(anchor.current_price, 108.0);
    }
}
