pub mod domain;
pub mod ingest;
pub mod storage;

pub mod config {
    use anyhow::Context;
    use chrono::NaiveDate;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub store_base_url: Option<String>,
        pub store_auth_token: Option<String>,
        pub price_provider_base_url: Option<String>,
        pub sentry_dsn: Option<String>,
        pub competition_start: Option<String>,
        pub competition_end: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                store_base_url: std::env::var("STORE_BASE_URL").ok(),
                store_auth_token: std::env::var("STORE_AUTH_TOKEN").ok(),
                price_provider_base_url: std::env::var("PRICE_PROVIDER_BASE_URL").ok(),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
                competition_start: std::env::var("COMPETITION_START").ok(),
                competition_end: std::env::var("COMPETITION_END").ok(),
            })
        }

        pub fn require_store_base_url(&self) -> anyhow::Result<&str> {
            self.store_base_url
                .as_deref()
                .context("STORE_BASE_URL is required")
        }

        pub fn require_competition_window(&self) -> anyhow::Result<CompetitionWindow> {
            let start = self
                .competition_start
                .as_deref()
                .context("COMPETITION_START is required")?;
            let end = self
                .competition_end
                .as_deref()
                .context("COMPETITION_END is required")?;

            let start = NaiveDate::parse_from_str(start.trim(), "%Y-%m-%d")
                .with_context(|| format!("COMPETITION_START is not a YYYY-MM-DD date: {start}"))?;
            let end = NaiveDate::parse_from_str(end.trim(), "%Y-%m-%d")
                .with_context(|| format!("COMPETITION_END is not a YYYY-MM-DD date: {end}"))?;

            CompetitionWindow::new(start, end)
        }
    }

    /// Closed date interval the competition runs over. Immutable once the
    /// worker starts; returns are always anchored to `start`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CompetitionWindow {
        pub start: NaiveDate,
        pub end: NaiveDate,
    }

    impl CompetitionWindow {
        pub fn new(start: NaiveDate, end: NaiveDate) -> anyhow::Result<Self> {
            anyhow::ensure!(
                start <= end,
                "competition window start {start} is after end {end}"
            );
            Ok(Self { start, end })
        }
    }

}
