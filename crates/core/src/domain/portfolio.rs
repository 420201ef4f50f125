use crate::domain::pricing::PriceStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-holding weight. The competition fixes every portfolio at five equally
/// weighted positions; this is a rule constant, not derived from the actual
/// holding count.
pub const HOLDING_WEIGHT: f64 = 0.2;

/// One advisor's picks, as read from the store. `entry_prices` is sparse:
/// only tickers swapped in after the competition start carry their own entry
/// price, everything else is measured from the universe-wide start price.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    pub advisor_name: String,
    pub tickers: Vec<String>,
    #[serde(default)]
    pub entry_prices: BTreeMap<String, f64>,
}

/// Outcome of pricing one portfolio. `Pending` means no holding had a usable
/// anchor — deliberately distinct from a computed return of 0.0, which is a
/// real standing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PortfolioReturn {
    Priced { value: f64, holdings_priced: usize },
    Pending,
}

/// Aggregate a portfolio's return over the current price store. Holdings
/// without a usable anchor are skipped; each priced holding contributes its
/// fractional return scaled by [`HOLDING_WEIGHT`].
pub fn compute_return(portfolio: &Portfolio, prices: &PriceStore) -> PortfolioReturn {
    let mut value = 0.0;
    let mut holdings_priced = 0usize;

    for ticker in &portfolio.tickers {
        let Some(anchor) = prices.get(ticker) else {
            continue;
        };
        if anchor.current_price <= 0.0 {
            continue;
        }

        let base = portfolio
            .entry_prices
            .get(ticker)
            .copied()
            .unwrap_or(anchor.start_price);
        if base <= 0.0 {
            continue;
        }

        value += (anchor.current_price - base) / base * HOLDING_WEIGHT;
        holdings_priced += 1;
    }

    if holdings_priced == 0 {
        PortfolioReturn::Pending
    } else {
        PortfolioReturn::Priced {
            value,
            holdings_priced,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::pricing::PriceAnchor;
    use chrono::{TimeZone, Utc};

    fn anchor(start_price: f64, current_price: f64) -> PriceAnchor {
        PriceAnchor {
            start_price,
            current_price,
            updated_at: Utc.with_ymd_and_hms(2026, 6, 1, 21, 0, 0).unwrap(),
        }
    }

    fn portfolio(tickers: &[&str], entry_prices: &[(&str, f64)]) -> Portfolio {
        Portfolio {
            advisor_name: "Jordan".to_string(),
            tickers: tickers.iter().map(|t| t.to_string()).collect(),
            entry_prices: entry_prices
                .iter()
                .map(|(t, p)| (t.to_string(), *p))
                .collect(),
        }
    }

    #[test]
    fn entry_price_override_beats_universe_start_price() {
        let mut prices = PriceStore::new();
        prices.insert("XYZ".to_string(), anchor(100.0, 90.0));

        // Swapped in at 80: a gain for this portfolio even though the
        // universe-wide move is a loss.
        let p = portfolio(&["XYZ"], &[("XYZ", 80.0)]);
        let PortfolioReturn::Priced { value, .. } = compute_return(&p, &prices) else {
            panic!("expected priced result");
        };
        assert!((value - ((90.0 - 80.0) / 80.0) * HOLDING_WEIGHT).abs() < 1e-12);
        assert!(value > 0.0);

        // Without the override the same holding shows a loss.
        let p = portfolio(&["XYZ"], &[]);
        let PortfolioReturn::Priced { value, .. } = compute_return(&p, &prices) else {
            panic!("expected priced result");
        };
        assert!(value < 0.0);
    }

    #[test]
    fn no_priceable_holdings_is_pending_not_zero() {
        let prices = PriceStore::new();
        let p = portfolio(&["AAA", "BBB"], &[]);
        assert_eq!(compute_return(&p, &prices), PortfolioReturn::Pending);

        // A flat holding is a real 0.0 return, not pending.
        let mut prices = PriceStore::new();
        prices.insert("AAA".to_string(), anchor(100.0, 100.0));
        let p = portfolio(&["AAA"], &[]);
        assert_eq!(
            compute_return(&p, &prices),
            PortfolioReturn::Priced {
                value: 0.0,
                holdings_priced: 1
            }
        );
    }

    #[test]
    fn partially_priced_portfolio_counts_only_priced_holdings() {
        let mut prices = PriceStore::new();
        prices.insert("AAA".to_string(), anchor(100.0, 110.0));

        let p = portfolio(&["AAA", "BBB", "CCC", "DDD", "EEE"], &[]);
        let PortfolioReturn::Priced {
            value,
            holdings_priced,
        } = compute_return(&p, &prices)
        else {
            panic!("expected priced result");
        };

        assert_eq!(holdings_priced, 1);
        assert!((value - 0.02).abs() < 1e-12);
    }

    #[test]
    fn five_priced_holdings_sum_their_weighted_returns() {
        let mut prices = PriceStore::new();
        for (ticker, cur) in [
            ("AAA", 110.0),
            ("BBB", 120.0),
            ("CCC", 90.0),
            ("DDD", 100.0),
            ("EEE", 105.0),
        ] {
            prices.insert(ticker.to_string(), anchor(100.0, cur));
        }

        let p = portfolio(&["AAA", "BBB", "CCC", "DDD", "EEE"], &[]);
        let PortfolioReturn::Priced {
            value,
            holdings_priced,
        } = compute_return(&p, &prices)
        else {
            panic!("expected priced result");
        };

        assert_eq!(holdings_priced, 5);
        // (0.10 + 0.20 - 0.10 + 0.0 + 0.05) * 0.2
        assert!((value - 0.05).abs() < 1e-12);
    }

    #[test]
    fn non_positive_override_is_skipped() {
        let mut prices = PriceStore::new();
        prices.insert("AAA".to_string(), anchor(100.0, 110.0));

        let p = portfolio(&["AAA"], &[("AAA", 0.0)]);
        assert_eq!(compute_return(&p, &prices), PortfolioReturn::Pending);
    }

    #[test]
    fn portfolio_deserializes_without_entry_prices() {
        let p: Portfolio = serde_json::from_value(serde_json::json!({
            "advisorName": "Sam",
            "tickers": ["AAPL", "BRK.B"]
        }))
        .unwrap();
        assert_eq!(p.advisor_name, "Sam");
        assert!(p.entry_prices.is_empty());
    }
}
