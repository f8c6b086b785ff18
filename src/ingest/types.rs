// src/ingest/types.rs
use chrono::{DateTime, Utc};

use crate::compare::Ranked;
use crate::error::Result;

/// One normalized item from a provider snapshot.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FetchedItem {
    /// 1-based rank, contiguous over the snapshot.
    pub position: i64,
    /// Stable key from the provider.
    pub item_id: String,
    pub item_name: String,
    pub item_image: Option<String>,
    pub score: Option<f64>,
    /// Opaque provider extras (vote counts etc.).
    pub metadata: Option<serde_json::Value>,
    /// Capture time, shared by every item of one fetch.
    pub fetched_at: DateTime<Utc>,
}

impl Ranked for FetchedItem {
    fn item_id(&self) -> &str {
        &self.item_id
    }
    fn item_name(&self) -> &str {
        &self.item_name
    }
    fn position(&self) -> i64 {
        self.position
    }
}

#[async_trait::async_trait]
pub trait RankingProvider: Send + Sync + std::fmt::Debug {
    /// Fetch the current snapshot from `source_url`. Any network, HTTP
    /// status, or payload-shape problem is a fetch error; there is no
    /// retry at this layer.
    async fn fetch(&self, source_url: &str) -> Result<Vec<FetchedItem>>;
    fn name(&self) -> &'static str;
}
