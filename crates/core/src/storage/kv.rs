use anyhow::{Context, Result};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RETRIES: u32 = 3;

/// REST client for the hosted JSON store. Collections are top-level nodes
/// addressed as `{base}/{collection}.json`: `read` returns `None` when the
/// node is absent (the store answers with a literal `null` body), `write`
/// overwrites a node wholesale, and `append` lets the store mint the new
/// child key.
#[derive(Debug, Clone)]
pub struct KvStoreClient {
    http: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
    retries: u32,
}

impl KvStoreClient {
    pub fn new(base_url: &str, auth_token: Option<String>) -> Result<Self> {
        let timeout_secs = std::env::var("STORE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let retries = std::env::var("STORE_RETRIES")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_RETRIES);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build store http client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token,
            retries,
        })
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/{collection}.json", self.base_url)
    }

    pub async fn read(&self, collection: &str) -> Result<Option<Value>> {
        let value = self
            .request_json(Method::GET, collection, None)
            .await
            .with_context(|| format!("read {collection} failed"))?;
        Ok(match value {
            Value::Null => None,
            value => Some(value),
        })
    }

    pub async fn write(&self, collection: &str, value: &Value) -> Result<()> {
        self.request_json(Method::PUT, collection, Some(value))
            .await
            .with_context(|| format!("write {collection} failed"))?;
        Ok(())
    }

    /// Append a child under `collection`; the store generates the child key
    /// and returns it.
    pub async fn append(&self, collection: &str, value: &Value) -> Result<String> {
        let ack = self
            .request_json(Method::POST, collection, Some(value))
            .await
            .with_context(|| format!("append to {collection} failed"))?;
        let ack: AppendAck = serde_json::from_value(ack)
            .with_context(|| format!("append ack for {collection} has no generated key"))?;
        Ok(ack.name)
    }

    async fn request_json(
        &self,
        method: Method,
        collection: &str,
        body: Option<&Value>,
    ) -> Result<Value> {
        let url = self.collection_url(collection);
        let auth: Vec<(&str, &str)> = self
            .auth_token
            .iter()
            .map(|t| ("auth", t.as_str()))
            .collect();

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;

            let mut req = self.http.request(method.clone(), &url).query(&auth);
            if let Some(body) = body {
                req = req.json(body);
            }

            let res = match req.send().await {
                Ok(r) => r,
                Err(err) => {
                    if attempt >= self.retries {
                        return Err(err).context("store request failed");
                    }
                    let backoff = Duration::from_secs(1 << (attempt - 1));
                    tracing::warn!(attempt, ?backoff, collection, error = %err, "store request failed; retrying");
                    tokio::time::sleep(backoff).await;
                    continue;
                }
            };

            let status = res.status();
            let text = res.text().await.context("failed to read store response")?;

            if !status.is_success() {
                let retryable = status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
                if retryable && attempt < self.retries {
                    let backoff = Duration::from_secs(1 << (attempt - 1));
                    tracing::warn!(attempt, ?backoff, collection, http_status = %status, "store HTTP error; retrying");
                    tokio::time::sleep(backoff).await;
                    continue;
                }
                anyhow::bail!("store HTTP {status}: {text}");
            }

            return serde_json::from_str::<Value>(&text)
                .with_context(|| format!("store response is not valid JSON: {text}"));
        }
    }
}

#[derive(Debug, Deserialize)]
struct AppendAck {
    name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_ack_parses_generated_key() {
        let ack: AppendAck = serde_json::from_str(r#"{"name":"-OaBc123xyz"}"#).unwrap();
        assert_eq!(ack.name, "-OaBc123xyz");
    }

    #[test]
    fn collection_urls_are_rooted_at_base() {
        let client = KvStoreClient::new("https://store.example.com/", None).unwrap();
        assert_eq!(
            client.collection_url("prices"),
            "https://store.example.com/prices.json"
        );
    }
}
