use crate::config::Settings;
use crate::ingest::types::{DailyClose, FetchRange};
use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RETRIES: u32 = 3;

#[async_trait::async_trait]
pub trait PriceHistoryProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    /// Daily closes over `range`, oldest first. Bars whose close is null are
    /// dropped here, so callers only ever see concrete samples.
    async fn fetch_daily_closes(&self, ticker: &str, range: FetchRange)
        -> Result<Vec<DailyClose>>;
}

/// Chart-endpoint client (`/v8/finance/chart/{symbol}`). One request per
/// security per run; rate limiting between requests is the caller's job.
#[derive(Debug, Clone)]
pub struct ChartHttpProvider {
    http: reqwest::Client,
    base_url: String,
    retries: u32,
}

impl ChartHttpProvider {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let base_url = settings
            .price_provider_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let timeout_secs = std::env::var("PRICE_PROVIDER_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let retries = std::env::var("PRICE_PROVIDER_RETRIES")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_RETRIES);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build price provider http client")?;

        Ok(Self {
            http,
            base_url,
            retries,
        })
    }

    fn url(&self, ticker: &str) -> String {
        format!(
            "{}/v8/finance/chart/{ticker}",
            self.base_url.trim_end_matches('/')
        )
    }

    async fn fetch_once(&self, ticker: &str, range: FetchRange) -> Result<String> {
        let params = [
            ("period1", range.start.to_string()),
            ("period2", range.end.to_string()),
            ("interval", "1d".to_string()),
        ];

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;

            let res = self
                .http
                .get(self.url(ticker))
                .query(&params)
                .send()
                .await;

            let res = match res {
                Ok(r) => r,
                Err(err) => {
                    if attempt >= self.retries {
                        return Err(err).context("chart request failed");
                    }
                    let backoff = Duration::from_secs(1 << (attempt - 1));
                    tracing::warn!(attempt, ?backoff, ticker, error = %err, "chart request failed; retrying");
                    tokio::time::sleep(backoff).await;
                    continue;
                }
            };

            let status = res.status();
            let text = res.text().await.context("failed to read chart response")?;

            if !status.is_success() {
                let retryable = status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
                if retryable && attempt < self.retries {
                    let backoff = Duration::from_secs(1 << (attempt - 1));
                    tracing::warn!(attempt, ?backoff, ticker, http_status = %status, "chart HTTP error; retrying");
                    tokio::time::sleep(backoff).await;
                    continue;
                }
                anyhow::bail!("chart HTTP {status} for {ticker}: {text}");
            }

            return Ok(text);
        }
    }
}

#[async_trait::async_trait]
impl PriceHistoryProvider for ChartHttpProvider {
    fn provider_name(&self) -> &'static str {
        "chart_http"
    }

    async fn fetch_daily_closes(
        &self,
        ticker: &str,
        range: FetchRange,
    ) -> Result<Vec<DailyClose>> {
        let text = self.fetch_once(ticker, range).await?;
        let body = serde_json::from_str::<ChartResponse>(&text)
            .with_context(|| format!("failed to parse chart response for {ticker}"))?;
        extract_series(body, ticker)
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartEnvelope,
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteBlock>,
}

#[derive(Debug, Deserialize)]
struct QuoteBlock {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

fn extract_series(body: ChartResponse, ticker: &str) -> Result<Vec<DailyClose>> {
    if let Some(err) = &body.chart.error {
        if !err.is_null() {
            anyhow::bail!("chart error for {ticker}: {err}");
        }
    }

    let result = body
        .chart
        .result
        .and_then(|mut v| if v.is_empty() { None } else { Some(v.remove(0)) })
        .with_context(|| format!("chart response for {ticker} has no result"))?;

    let closes = result
        .indicators
        .quote
        .into_iter()
        .next()
        .with_context(|| format!("chart response for {ticker} has no quote block"))?
        .close;

    let mut out = Vec::with_capacity(result.timestamp.len());
    for (ts, close) in result.timestamp.iter().zip(closes) {
        if let Some(close) = close {
            out.push(DailyClose {
                timestamp: *ts,
                close,
            });
        }
    }
    Ok(out)
}
