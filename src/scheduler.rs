// src/scheduler.rs
//
// Background ticker driving the pipeline. One tick processes every
// due ranking sequentially; the tick itself never fails.

use std::sync::Arc;

use metrics::{counter, gauge};
use tokio::task::JoinHandle;

use crate::pipeline::Pipeline;

pub fn spawn_scheduler(pipeline: Arc<Pipeline>, interval_secs: u64) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval_secs));
        loop {
            ticker.tick().await;
            let now = chrono::Utc::now().timestamp().max(0) as u64;

            let summaries = pipeline.process_due().await;

            counter!("rankalert_scheduler_ticks_total").increment(1);
            gauge!("rankalert_last_run_ts").set(now as f64);

            tracing::info!(
                target: "scheduler",
                processed = summaries.len(),
                changes = summaries.iter().map(|s| s.changes).sum::<usize>(),
                "scheduler tick"
            );
        }
    })
}
