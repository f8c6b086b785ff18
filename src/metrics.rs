use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// One-time metric registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("rankalert_runs_total", "Ranking runs completed.");
        describe_counter!("rankalert_run_errors_total", "Ranking runs that failed.");
        describe_counter!("rankalert_changes_total", "Position changes detected.");
        describe_counter!(
            "rankalert_items_fetched_total",
            "Items parsed from provider snapshots."
        );
        describe_counter!(
            "rankalert_provider_errors_total",
            "Provider fetch/parse errors."
        );
        describe_counter!(
            "rankalert_notifications_sent_total",
            "Push batches sent to OneSignal."
        );
        describe_counter!("rankalert_scheduler_ticks_total", "Scheduler ticks.");
        describe_histogram!(
            "rankalert_fetch_parse_ms",
            "Provider payload parse time in milliseconds."
        );
        describe_gauge!("rankalert_last_run_ts", "Unix ts of the last scheduler tick.");
    });
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder. Call once at process start.
    pub fn init() -> Self {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .expect("prometheus: install recorder");
        ensure_metrics_described();
        Self { handle }
    }

    /// Router exposing `/metrics` in the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
