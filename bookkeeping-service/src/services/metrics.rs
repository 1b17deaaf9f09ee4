//! Prometheus metrics for bookkeeping-service.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, HistogramVec, TextEncoder,
};

/// Database query duration histogram.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "bookkeeping_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("Failed to register db_query_duration")
});

/// Expense state transitions by event and outcome.
pub static EXPENSE_TRANSITIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "bookkeeping_expense_transitions_total",
        "Total number of expense state transitions attempted",
        &["event", "status"]
    )
    .expect("Failed to register expense_transitions_total")
});

/// Invoice reconciliation runs by resulting status.
pub static RECONCILIATIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "bookkeeping_reconciliations_total",
        "Total number of invoice reconciliations",
        &["status"]
    )
    .expect("Failed to register reconciliations_total")
});

/// Webhook delivery attempts by outcome.
pub static WEBHOOK_DELIVERIES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "bookkeeping_webhook_deliveries_total",
        "Total number of webhook delivery attempts",
        &["status"]
    )
    .expect("Failed to register webhook_deliveries_total")
});

/// Journal entries posted by outcome.
pub static JOURNAL_ENTRIES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "bookkeeping_journal_entries_total",
        "Total number of journal entries posted",
        &["status"]
    )
    .expect("Failed to register journal_entries_total")
});

/// Force registration of all metrics. Called once at startup so the
/// `/metrics` endpoint exposes every family before first use.
pub fn init_metrics() {
    Lazy::force(&DB_QUERY_DURATION);
    Lazy::force(&EXPENSE_TRANSITIONS_TOTAL);
    Lazy::force(&RECONCILIATIONS_TOTAL);
    Lazy::force(&WEBHOOK_DELIVERIES_TOTAL);
    Lazy::force(&JOURNAL_ENTRIES_TOTAL);
}

/// Render the metrics registry in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder.encode_to_string(&metric_families).unwrap_or_default()
}
