//! pipeline.rs — one run of fetch → diff → persist → notify.
//!
//! Each run is independent: all state lives in the store, and a failing
//! ranking never blocks the others during a scheduled batch.

use std::sync::Arc;

use chrono::Utc;
use metrics::counter;
use serde::Serialize;
use tracing::{info, warn};

use crate::compare;
use crate::error::Result;
use crate::ingest::ProviderRegistry;
use crate::metrics::ensure_metrics_described;
use crate::notify::{self, PushSender};
use crate::store::{Ranking, Store};

/// What one run did, for logs and the on-demand API response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub ranking_id: String,
    pub items: usize,
    pub changes: usize,
    pub notified: bool,
}

pub struct Pipeline {
    store: Store,
    registry: ProviderRegistry,
    push: Arc<dyn PushSender>,
    significance_threshold: i64,
}

impl Pipeline {
    pub fn new(
        store: Store,
        registry: ProviderRegistry,
        push: Arc<dyn PushSender>,
        significance_threshold: i64,
    ) -> Self {
        Self {
            store,
            registry,
            push,
            significance_threshold,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Run the full sequence for one ranking.
    ///
    /// A fetch failure aborts before any write, leaving the stored
    /// snapshot untouched. A notification failure after the store
    /// write is logged and swallowed; delivery is best-effort.
    pub async fn process_ranking(&self, ranking: &Ranking) -> Result<RunSummary> {
        ensure_metrics_described();

        let old_items = self.store.current_items(&ranking.id).await?;

        let provider = self.registry.resolve(&ranking.provider_type)?;
        let new_items = provider.fetch(&ranking.source_url).await?;

        let changes = compare::compare(&old_items, &new_items);

        let captured_at = new_items
            .first()
            .map(|item| item.fetched_at)
            .unwrap_or_else(Utc::now);
        self.store
            .apply_run(&ranking.id, &new_items, &changes, captured_at)
            .await?;

        counter!("rankalert_runs_total").increment(1);
        counter!("rankalert_changes_total").increment(changes.len() as u64);

        let mut notified = false;
        if !changes.is_empty() {
            match notify::dispatch(
                &self.store,
                self.push.as_ref(),
                ranking,
                &changes,
                self.significance_threshold,
            )
            .await
            {
                Ok(sent) => notified = sent,
                Err(e) => {
                    // Store write already committed; do not roll back.
                    warn!(ranking = %ranking.id, error = %e, "notification failed after store write");
                }
            }
        }

        info!(
            ranking = %ranking.id,
            items = new_items.len(),
            changes = changes.len(),
            notified,
            "processed ranking"
        );

        Ok(RunSummary {
            ranking_id: ranking.id.clone(),
            items: new_items.len(),
            changes: changes.len(),
            notified,
        })
    }

    /// Process every ranking whose polling interval has elapsed.
    /// Failures are isolated per ranking. Returns the summaries of the
    /// runs that succeeded.
    pub async fn process_due(&self) -> Vec<RunSummary> {
        let due = match self.store.due_rankings().await {
            Ok(rankings) => rankings,
            Err(e) => {
                warn!(error = %e, "could not list due rankings");
                return Vec::new();
            }
        };

        let mut summaries = Vec::with_capacity(due.len());
        for ranking in &due {
            match self.process_ranking(ranking).await {
                Ok(summary) => summaries.push(summary),
                Err(e) => {
                    counter!("rankalert_run_errors_total").increment(1);
                    warn!(ranking = %ranking.id, error = %e, "ranking run failed");
                }
            }
        }
        summaries
    }
}
