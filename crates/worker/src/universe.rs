/// Fixed competition universe: every security an advisor portfolio may
/// hold, refreshed each run regardless of who currently holds it. Dotted
/// tickers are stored escaped; here they stay in provider form.
const DEFAULT_UNIVERSE: &[&str] = &[
    "AAPL", "ABBV", "AMZN", "AVGO", "BRK.B", "CAT", "COST", "CRM", "CVX", "GOOGL", "HD", "JNJ",
    "JPM", "KO", "LLY", "MA", "META", "MRK", "MSFT", "NFLX", "NVDA", "ORCL", "PEP", "PG", "TSLA",
    "UNH", "V", "WMT", "XOM",
];

/// The universe for this run: `UNIVERSE_TICKERS` (comma-separated) when set
/// and non-empty, else the compiled-in competition list.
pub fn competition_universe() -> Vec<String> {
    if let Ok(s) = std::env::var("UNIVERSE_TICKERS") {
        let parsed = parse_ticker_list(&s);
        if !parsed.is_empty() {
            return parsed;
        }
        tracing::warn!("UNIVERSE_TICKERS is set but empty; using default universe");
    }

    DEFAULT_UNIVERSE.iter().map(|t| t.to_string()).collect()
}

fn parse_ticker_list(s: &str) -> Vec<String> {
    let mut out = Vec::new();
    for part in s.split(',') {
        let ticker = part.trim();
        if ticker.is_empty() {
            continue;
        }
        let ticker = ticker.to_ascii_uppercase();
        if !out.contains(&ticker) {
            out.push(ticker);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_dedupes_ticker_list() {
        let parsed = parse_ticker_list(" aapl, BRK.B ,MSFT,,aapl ");
        assert_eq!(parsed, vec!["AAPL", "BRK.B", "MSFT"]);
    }

    #[test]
    fn blank_list_parses_empty() {
        assert!(parse_ticker_list(" , ,").is_empty());
    }

    #[test]
    fn default_universe_has_no_duplicates() {
        let mut seen = std::collections::BTreeSet::new();
        for t in DEFAULT_UNIVERSE {
            assert!(seen.insert(*t), "duplicate ticker {t}");
        }
    }
}
