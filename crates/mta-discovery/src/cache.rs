//! De-duplicates BLE advertisements by address within one scan session.
//!
//! Unlike a cross-session resolution cache, a scan is bounded by its own
//! timeout and addresses are never remembered across scans — there is no
//! TTL here, only an explicit reset between scan sessions.

use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Thread-safe set of BLE addresses already surfaced during the current scan.
#[derive(Debug, Clone, Default)]
pub struct ScanDedupCache {
    seen: Arc<RwLock<HashSet<String>>>,
}

impl ScanDedupCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` the first time `address` is seen, `false` afterward.
    pub async fn observe(&self, address: &str) -> bool {
        let mut seen = self.seen.write().await;
        seen.insert(address.to_owned())
    }

    /// Reset for a new scan session.
    pub async fn reset(&self) {
        self.seen.write().await.clear();
    }
}
