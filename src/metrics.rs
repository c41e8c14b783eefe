// src/metrics.rs
use axum::{routing::get, Router};
use metrics::{describe_counter, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// One-time metric registration so every series shows up on /metrics.
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("feed_requests_total", "Feed requests served, per domain.");
        describe_counter!(
            "feed_items_dropped_total",
            "Upstream items dropped during decode/normalization, per domain."
        );
        describe_counter!("feed_cache_hits_total", "Cache reads answered fresh.");
        describe_counter!("feed_cache_misses_total", "Cache reads that went upstream.");
        describe_counter!(
            "feed_cache_coalesced_total",
            "Cache reads that reused a concurrent fetch's result."
        );
        describe_counter!(
            "feed_cache_stale_serves_total",
            "Cache reads served stale after a failed refresh."
        );
    });
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Initialize the Prometheus recorder and expose a static gauge with
    /// the bucket precision so dashboards can annotate cache behavior.
    pub fn init(bucket_precision_km: f64) -> Self {
        let builder = PrometheusBuilder::new();
        let handle = builder
            .install_recorder()
            .expect("prometheus: install recorder");

        ensure_metrics_described();
        gauge!("feed_cache_bucket_precision_km").set(bucket_precision_km);

        Self { handle }
    }

    /// Router exposing `/metrics` in Prometheus exposition format.
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
