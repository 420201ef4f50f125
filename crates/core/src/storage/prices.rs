use crate::domain::pricing::{PriceAnchor, PriceStore};
use crate::storage::keys;
use crate::storage::kv::KvStoreClient;
use anyhow::{Context, Result};
use serde_json::Value;

const COLLECTION: &str = "prices";

/// Load the persisted price store. An absent collection is an empty store
/// (first run); individual malformed entries are skipped, not fatal.
pub async fn load(store: &KvStoreClient) -> Result<PriceStore> {
    let Some(doc) = store.read(COLLECTION).await? else {
        return Ok(PriceStore::new());
    };
    decode_document(doc)
}

pub async fn save(store: &KvStoreClient, prices: &PriceStore) -> Result<()> {
    let doc = encode_document(prices)?;
    store.write(COLLECTION, &doc).await
}

fn decode_document(doc: Value) -> Result<PriceStore> {
    let Value::Object(entries) = doc else {
        anyhow::bail!("prices document is not a JSON object");
    };

    let mut out = PriceStore::new();
    for (safe_key, raw) in entries {
        match serde_json::from_value::<PriceAnchor>(raw) {
            Ok(anchor) => {
                out.insert(keys::decode(&safe_key), anchor);
            }
            Err(err) => {
                tracing::warn!(key = %safe_key, error = %err, "skipping malformed price anchor");
            }
        }
    }
    Ok(out)
}

fn encode_document(prices: &PriceStore) -> Result<Value> {
    let mut doc = serde_json::Map::new();
    for (ticker, anchor) in prices {
        doc.insert(
            keys::encode(ticker),
            serde_json::to_value(anchor).context("serialize price anchor failed")?,
        );
    }
    Ok(Value::Object(doc))
}
