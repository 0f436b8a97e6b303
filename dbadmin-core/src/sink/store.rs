//! Document store seam.

use crate::Result;
use crate::config::StoreTarget;
use async_trait::async_trait;
use serde_json::Value;

/// Persists result documents, one record per delivery.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Inserts `document` into `target`.
    async fn insert(&self, target: &StoreTarget, document: &Value) -> Result<()>;

    /// Releases the underlying client.
    async fn close(&self);
}
