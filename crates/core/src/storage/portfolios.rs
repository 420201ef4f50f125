use crate::domain::portfolio::Portfolio;
use crate::storage::keys;
use crate::storage::kv::KvStoreClient;
use anyhow::Result;
use serde_json::Value;
use std::collections::BTreeMap;

const COLLECTION: &str = "portfolios";

/// Load the read-only portfolio map. Entry-price keys are stored escaped
/// (they are tickers) and restored here; malformed portfolios are skipped.
pub async fn load(store: &KvStoreClient) -> Result<BTreeMap<String, Portfolio>> {
    let Some(doc) = store.read(COLLECTION).await? else {
        return Ok(BTreeMap::new());
    };
    decode_document(doc)
}

fn decode_document(doc: Value) -> Result<BTreeMap<String, Portfolio>> {
    let Value::Object(entries) = doc else {
        anyhow::bail!("portfolios document is not a JSON object");
    };

    let mut out = BTreeMap::new();
    for (portfolio_id, raw) in entries {
        match serde_json::from_value::<Portfolio>(raw) {
            Ok(mut portfolio) => {
                portfolio.entry_prices = portfolio
                    .entry_prices
                    .into_iter()
                    .map(|(ticker, price)| (keys::decode(&ticker), price))
                    .collect();
                out.insert(portfolio_id, portfolio);
            }
            Err(err) => {
                tracing::warn!(portfolio_id = %portfolio_id, error = %err, "skipping malformed portfolio");
            }
        }
    }
    Ok(out)
}
