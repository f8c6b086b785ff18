// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod api;
pub mod compare;
pub mod config;
pub mod error;
pub mod ingest;
pub mod metrics;
pub mod notify;
pub mod pipeline;
pub mod scheduler;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::compare::{compare, ChangeKind, RankingChange};
pub use crate::error::{Error, Result};
pub use crate::pipeline::{Pipeline, RunSummary};
