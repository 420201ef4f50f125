use crate::domain::snapshot::ReturnSnapshot;
use crate::storage::kv::KvStoreClient;
use anyhow::{Context, Result};

const COLLECTION: &str = "history";

/// Append one immutable snapshot to the history log. Returns the child key
/// the store generated for it.
pub async fn append(store: &KvStoreClient, snapshot: &ReturnSnapshot) -> Result<String> {
    let value = serde_json::to_value(snapshot).context("serialize return snapshot failed")?;
    store.append(COLLECTION, &value).await
}
