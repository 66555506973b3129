//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Ticket admission and claims
//! - Lifecycle transitions
//! - Backlog depth and waiting time

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGaugeVec, Opts};

// =============================================================================
// Queue - Admission Metrics
// =============================================================================

/// Tickets admitted total.
pub static TICKETS_CREATED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("ghiseu_tickets_created_total", "Total tickets admitted").unwrap()
});

/// Claim attempts total by result.
pub static CLAIMS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("ghiseu_claims_total", "Total claim attempts"),
        &["result"], // "claimed", "empty", "inactive", "not_found", "error"
    )
    .unwrap()
});

// =============================================================================
// Lifecycle Metrics
// =============================================================================

/// Applied transitions total.
pub static TRANSITIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("ghiseu_transitions_total", "Total ticket transitions applied"),
        &["transition"], // "claim", "requeue", "complete", "cancel", "reassign"
    )
    .unwrap()
});

// =============================================================================
// Backlog Metrics
// =============================================================================

/// Queued tickets per desk.
pub static BACKLOG_DEPTH: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("ghiseu_backlog_depth", "Queued tickets per desk"),
        &["desk"],
    )
    .unwrap()
});

/// Time between admission and claim, in seconds.
pub static WAIT_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "ghiseu_wait_seconds",
            "Time from a ticket last entering the backlog (admission or requeue) to its claim",
        )
        .buckets(vec![
            5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1200.0, 1800.0, 3600.0,
        ]),
        &["desk"],
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Queue
        Box::new(TICKETS_CREATED.clone()),
        Box::new(CLAIMS_TOTAL.clone()),
        // Lifecycle
        Box::new(TRANSITIONS_TOTAL.clone()),
        // Backlog
        Box::new(BACKLOG_DEPTH.clone()),
        Box::new(WAIT_DURATION.clone()),
    ]
}
