//! Prometheus metrics for the fraud engine
//!
//! # Metrics
//!
//! - `fraud_evaluations_total{decision}` - Evaluations by decision
//! - `fraud_evaluation_duration_seconds` - Evaluation latency
//! - `fraud_alerts_created_total{severity}` - Alerts raised
//! - `fraud_alerts_resolved_total{outcome}` - Alerts resolved
//! - `fraud_alerts_stored` - Alerts currently held in memory

use crate::types::{Decision, Severity};
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

/// Metrics collector with its own registry
#[derive(Clone)]
pub struct Metrics {
    /// Evaluations by decision
    pub evaluations_total: IntCounterVec,

    /// Evaluation latency
    pub evaluation_duration: Histogram,

    /// Alerts created by severity
    pub alerts_created: IntCounterVec,

    /// Alerts resolved by outcome
    pub alerts_resolved: IntCounterVec,

    /// Alerts in the in-memory map
    pub alerts_stored: IntGauge,

    registry: Registry,
}

impl Metrics {
    /// Create and register all metrics
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let evaluations_total = IntCounterVec::new(
            Opts::new("fraud_evaluations_total", "Transactions evaluated, by decision"),
            &["decision"],
        )?;
        registry.register(Box::new(evaluations_total.clone()))?;

        let evaluation_duration = Histogram::with_opts(
            HistogramOpts::new(
                "fraud_evaluation_duration_seconds",
                "Time spent evaluating a transaction",
            )
            .buckets(vec![0.00005, 0.0001, 0.00025, 0.0005, 0.001, 0.005, 0.01, 0.05]),
        )?;
        registry.register(Box::new(evaluation_duration.clone()))?;

        let alerts_created = IntCounterVec::new(
            Opts::new("fraud_alerts_created_total", "Alerts raised, by severity"),
            &["severity"],
        )?;
        registry.register(Box::new(alerts_created.clone()))?;

        let alerts_resolved = IntCounterVec::new(
            Opts::new("fraud_alerts_resolved_total", "Alerts resolved, by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(alerts_resolved.clone()))?;

        let alerts_stored = IntGauge::new("fraud_alerts_stored", "Alerts held in memory")?;
        registry.register(Box::new(alerts_stored.clone()))?;

        Ok(Self {
            evaluations_total,
            evaluation_duration,
            alerts_created,
            alerts_resolved,
            alerts_stored,
            registry,
        })
    }

    /// Record a finished evaluation
    pub fn record_evaluation(&self, decision: Decision, duration_seconds: f64) {
        self.evaluations_total
            .with_label_values(&[decision.as_str()])
            .inc();
        self.evaluation_duration.observe(duration_seconds);
    }

    /// Record a raised alert
    pub fn record_alert_created(&self, severity: Severity) {
        self.alerts_created
            .with_label_values(&[severity.as_str()])
            .inc();
    }

    /// Record a resolution
    pub fn record_alert_resolved(&self, false_positive: bool) {
        let outcome = if false_positive { "false_positive" } else { "resolved" };
        self.alerts_resolved.with_label_values(&[outcome]).inc();
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render all metrics in the Prometheus text format
    pub fn gather_text(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            tracing::warn!("Failed to encode metrics: {}", e);
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}
