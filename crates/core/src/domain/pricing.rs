use crate::ingest::types::DailyClose;
use anyhow::{ensure, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A security's competition prices: the close at (or immediately after) the
/// competition start, and the latest available close. Stored whole or not at
/// all; the persisted document never carries partial anchors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceAnchor {
    pub start_price: f64,
    pub current_price: f64,
    pub updated_at: DateTime<Utc>,
}

/// Persisted price map, keyed by raw ticker. Key escaping happens at the
/// store boundary, not here.
pub type PriceStore = BTreeMap<String, PriceAnchor>;

/// Select the start/current price pair for one security from its
/// null-filtered, time-ordered daily closes.
///
/// The fetch window starts well before the competition, so the baseline is
/// the first bar at or after the start date, not the oldest bar fetched. A
/// series that ends before the start date falls back to its oldest bar, and
/// a zero close at the anchor index falls back to the series' first close —
/// existing competition standings depend on that exact fallback.
pub fn resolve_anchor(
    series: &[DailyClose],
    competition_start: NaiveDate,
    resolved_at: DateTime<Utc>,
) -> Result<PriceAnchor> {
    ensure!(!series.is_empty(), "close series is empty");

    let start_ts = competition_start
        .and_time(NaiveTime::MIN)
        .and_utc()
        .timestamp();

    let idx = series
        .iter()
        .position(|bar| bar.timestamp >= start_ts)
        .unwrap_or(0);

    let mut start_price = series[idx].close;
    if start_price == 0.0 {
        start_price = series[0].close;
    }
    let current_price = series[series.len() - 1].close;

    ensure!(
        start_price > 0.0,
        "no usable start price (got {start_price})"
    );
    ensure!(
        current_price > 0.0,
        "no usable current price (got {current_price})"
    );

    Ok(PriceAnchor {
        start_price,
        current_price,
        updated_at: resolved_at,
    })
}

/// Overlay freshly resolved anchors onto the persisted store. Refreshed
/// tickers are replaced wholesale; tickers that failed to resolve this run
/// (or were not fetched at all) keep their last known anchor. Never removes
/// a key, so a transient provider outage cannot erase a price.
pub fn merge_price_store(existing: PriceStore, fresh: BTreeMap<String, PriceAnchor>) -> PriceStore {
    let mut merged = existing;
    for (ticker, anchor) in fresh {
        merged.insert(ticker, anchor);
    }
    merged
}
