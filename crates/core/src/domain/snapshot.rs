use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One dated record of every portfolio that produced a return this run.
/// Appended to the history log and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnSnapshot {
    pub date: DateTime<Utc>,
    pub returns: BTreeMap<String, f64>,
}

/// Build the run's snapshot from the non-pending portfolio returns. A run
/// where nothing priced produces no snapshot at all — the history log must
/// never contain an empty entry.
pub fn build_snapshot(
    date: DateTime<Utc>,
    returns: BTreeMap<String, f64>,
) -> Option<ReturnSnapshot> {
    if returns.is_empty() {
        return None;
    }
    Some(ReturnSnapshot { date, returns })
}
