//! Fraud detector: rule orchestration, decisions and the alert pipeline
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │        Transaction pipeline (many callers)            │
//! └─────────────────────┬────────────────────────────────┘
//!                       │ evaluate(txn, ctx)
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │                     Detector                          │
//! │  rules (fixed order) → sum → normalize → decide       │
//! │  Review/Block → FraudAlert                            │
//! │  record txn in VelocityTracker (always, last)         │
//! └─────────────────────┬────────────────────────────────┘
//!                       │ mpsc::channel (bounded, blocks when full)
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │              AlertWorker (single task)                │
//! │   in-memory alert map  →  optional AlertStore         │
//! └──────────────────────────────────────────────────────┘
//! ```

use crate::config::FraudConfig;
use crate::geofence::GeofenceChecker;
use crate::metrics::Metrics;
use crate::pattern::PatternAnalyzer;
use crate::rules::{default_rules, Rule};
use crate::scoring::{decide, normalize_score, severity_for_score};
use crate::store::AlertStore;
use crate::types::{
    AlertFilter, AlertStatus, Decision, EvaluationContext, EvaluationResult, FraudAlert,
    FraudIndicator, FraudStats, FraudType, Severity, Transaction,
};
use crate::velocity::VelocityTracker;
use crate::{Error, Result};
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

type AlertMap = Arc<RwLock<HashMap<Uuid, FraudAlert>>>;

/// Worker lifecycle: not started, running, stopped. No way back.
enum Lifecycle {
    NotStarted {
        receiver: mpsc::Receiver<FraudAlert>,
    },
    Running {
        stop: oneshot::Sender<()>,
        worker: JoinHandle<()>,
    },
    Stopped {
        worker: Option<JoinHandle<()>>,
    },
}

impl Lifecycle {
    /// Move to `Stopped` when the worker exited on its own, e.g. after the
    /// caller's cancellation token fired
    fn reap(&mut self) {
        let exited = matches!(self, Lifecycle::Running { worker, .. } if worker.is_finished());
        if !exited {
            return;
        }

        if let Lifecycle::Running { worker, .. } =
            std::mem::replace(self, Lifecycle::Stopped { worker: None })
        {
            *self = Lifecycle::Stopped {
                worker: Some(worker),
            };
            warn!("Alert worker exited, fraud detector stopped");
        }
    }
}

/// Real-time fraud detector
pub struct Detector {
    config: FraudConfig,
    rules: Vec<Box<dyn Rule>>,
    geofence: Arc<GeofenceChecker>,
    analyzer: Arc<PatternAnalyzer>,
    velocity: VelocityTracker,
    alerts: AlertMap,
    alert_tx: mpsc::Sender<FraudAlert>,
    lifecycle: Mutex<Lifecycle>,
    store: Option<Arc<dyn AlertStore>>,
    metrics: Metrics,
}

impl Detector {
    /// Create a detector with the built-in rule set
    pub fn new(config: FraudConfig) -> Result<Self> {
        config.validate()?;

        let geofence = Arc::new(GeofenceChecker::new());
        let analyzer = Arc::new(PatternAnalyzer::new());
        let rules = default_rules(&config, Arc::clone(&geofence), Arc::clone(&analyzer));
        let (alert_tx, receiver) = mpsc::channel(config.alert_queue_capacity);

        Ok(Self {
            velocity: VelocityTracker::new(config.velocity_window()),
            rules,
            geofence,
            analyzer,
            alerts: Arc::new(RwLock::new(HashMap::new())),
            alert_tx,
            lifecycle: Mutex::new(Lifecycle::NotStarted { receiver }),
            store: None,
            metrics: Metrics::new()?,
            config,
        })
    }

    /// Attach durable alert storage. Takes effect for workers started afterwards.
    pub fn with_alert_store(mut self, store: Arc<dyn AlertStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Start the alert worker.
    ///
    /// The worker exits when `cancel` fires or [`stop`](Self::stop) is called.
    /// Either way the detector is stopped for good: calling `start` on a
    /// running or stopped detector does nothing.
    pub fn start(&self, cancel: CancellationToken) -> Result<()> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::Runtime(e.to_string()))?;

        let mut lifecycle = self.lifecycle.lock();
        lifecycle.reap();
        match std::mem::replace(&mut *lifecycle, Lifecycle::Stopped { worker: None }) {
            Lifecycle::NotStarted { receiver } => {
                let (stop, stop_rx) = oneshot::channel();
                let worker = AlertWorker {
                    receiver,
                    alerts: Arc::clone(&self.alerts),
                    store: self.store.clone(),
                    metrics: self.metrics.clone(),
                    max_alerts: self.config.max_stored_alerts,
                };
                let worker = runtime.spawn(worker.run(cancel, stop_rx));
                *lifecycle = Lifecycle::Running { stop, worker };
                info!("Fraud detector started");
            }
            running @ Lifecycle::Running { .. } => {
                *lifecycle = running;
                debug!("Fraud detector already running");
            }
            stopped @ Lifecycle::Stopped { .. } => {
                *lifecycle = stopped;
                warn!("Fraud detector was stopped and cannot be restarted");
            }
        }

        Ok(())
    }

    /// Signal the alert worker to exit. Idempotent.
    pub fn stop(&self) {
        let mut lifecycle = self.lifecycle.lock();
        lifecycle.reap();
        match std::mem::replace(&mut *lifecycle, Lifecycle::Stopped { worker: None }) {
            Lifecycle::Running { stop, worker } => {
                let _ = stop.send(());
                *lifecycle = Lifecycle::Stopped {
                    worker: Some(worker),
                };
                info!("Fraud detector stopped");
            }
            Lifecycle::NotStarted { .. } => {
                debug!("Fraud detector stopped before start");
            }
            stopped @ Lifecycle::Stopped { .. } => {
                *lifecycle = stopped;
            }
        }
    }

    /// Stop and wait for the worker to store any alerts already queued
    pub async fn shutdown(&self) {
        self.stop();

        let worker = match &mut *self.lifecycle.lock() {
            Lifecycle::Stopped { worker } => worker.take(),
            _ => None,
        };

        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                warn!("Alert worker ended abnormally: {}", e);
            }
        }
    }

    /// Whether the alert worker is running
    pub fn is_running(&self) -> bool {
        let mut lifecycle = self.lifecycle.lock();
        lifecycle.reap();
        matches!(*lifecycle, Lifecycle::Running { .. })
    }

    /// Evaluate one transaction.
    ///
    /// Never fails. On Review or Block an alert is pushed onto the bounded
    /// queue; when the queue is full this waits for the worker to make room.
    /// The transaction is recorded for velocity tracking only after the
    /// rules ran, so it never counts towards its own signals.
    #[instrument(skip_all, fields(transaction_id = %txn.id))]
    pub async fn evaluate(&self, txn: &Transaction, ctx: &EvaluationContext) -> EvaluationResult {
        if !self.config.enabled {
            return EvaluationResult {
                transaction_id: txn.id,
                risk_score: 0.0,
                decision: Decision::Allow,
                reason: None,
                indicators: Vec::new(),
                alert_id: None,
                evaluated_at: Utc::now(),
            };
        }

        let started = Instant::now();
        let mut total_score = 0.0;
        let mut indicators = Vec::new();

        for rule in &self.rules {
            let result = rule.evaluate(txn, ctx);
            if result.triggered {
                debug!(rule = rule.name(), score = result.score, "Rule triggered");
                total_score += result.score;
                indicators.extend(result.indicators);
            }
        }

        let risk_score = normalize_score(total_score);
        let decision = decide(risk_score, self.config.score_threshold);

        let (reason, alert_id) = match decision {
            Decision::Allow => (None, None),
            Decision::Review | Decision::Block => {
                let mut alert = build_alert(txn, risk_score, &indicators);
                let reason = if decision == Decision::Block {
                    format!(
                        "Risk score {:.2} at or above block threshold {:.2}",
                        risk_score, self.config.score_threshold
                    )
                } else {
                    alert.severity = Severity::Medium;
                    format!("Risk score {:.2} requires manual review", risk_score)
                };
                (Some(reason), self.enqueue_alert(alert).await)
            }
        };

        self.velocity.record(txn);
        self.metrics
            .record_evaluation(decision, started.elapsed().as_secs_f64());

        debug!(risk_score, decision = decision.as_str(), "Transaction evaluated");

        EvaluationResult {
            transaction_id: txn.id,
            risk_score,
            decision,
            reason,
            indicators,
            alert_id,
            evaluated_at: Utc::now(),
        }
    }

    async fn enqueue_alert(&self, alert: FraudAlert) -> Option<Uuid> {
        let alert_id = alert.id;
        let severity = alert.severity;
        let alert_type = alert.alert_type;

        match self.alert_tx.send(alert).await {
            Ok(()) => {
                self.metrics.record_alert_created(severity);
                info!(
                    %alert_id,
                    severity = severity.as_str(),
                    alert_type = alert_type.as_str(),
                    "Fraud alert raised"
                );
                Some(alert_id)
            }
            Err(_) => {
                warn!(%alert_id, "Alert queue closed, alert dropped");
                None
            }
        }
    }

    /// Get an alert by id
    pub fn get_alert(&self, id: Uuid) -> Option<FraudAlert> {
        self.alerts.read().get(&id).cloned()
    }

    /// Alerts matching the filter, newest first
    pub fn get_alerts(&self, filter: &AlertFilter) -> Vec<FraudAlert> {
        let mut alerts: Vec<FraudAlert> = self
            .alerts
            .read()
            .values()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        alerts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        alerts
    }

    /// Close an open alert as resolved or as a false positive
    pub fn resolve_alert(&self, id: Uuid, resolution: &str, is_false_positive: bool) -> Result<()> {
        let mut alerts = self.alerts.write();
        let alert = alerts
            .get_mut(&id)
            .ok_or_else(|| Error::AlertNotFound(id.to_string()))?;

        if alert.status.is_closed() {
            return Err(Error::AlertClosed(id.to_string()));
        }

        alert.status = if is_false_positive {
            AlertStatus::FalsePositive
        } else {
            AlertStatus::Resolved
        };
        alert.resolution = Some(resolution.to_string());
        alert.resolved_at = Some(Utc::now());

        self.metrics.record_alert_resolved(is_false_positive);
        info!(alert_id = %id, false_positive = is_false_positive, "Fraud alert resolved");
        Ok(())
    }

    /// Aggregate statistics over the in-memory alerts
    pub fn get_stats(&self) -> FraudStats {
        let alerts = self.alerts.read();
        let mut stats = FraudStats {
            total_alerts: alerts.len(),
            ..Default::default()
        };

        for alert in alerts.values() {
            *stats.by_status.entry(alert.status).or_insert(0) += 1;
            *stats.by_severity.entry(alert.severity).or_insert(0) += 1;
            *stats.by_type.entry(alert.alert_type).or_insert(0) += 1;

            match alert.status {
                AlertStatus::Open | AlertStatus::InProgress => stats.open_alerts += 1,
                AlertStatus::Resolved => stats.resolved_alerts += 1,
                AlertStatus::FalsePositive => stats.false_positives += 1,
                AlertStatus::Escalated => {}
            }
        }

        if stats.total_alerts > 0 {
            stats.false_positive_rate = stats.false_positives as f64 / stats.total_alerts as f64;
        }
        stats
    }

    /// Learn a behavioral pattern for an account
    pub fn learn_account_pattern(&self, account_id: &str, transactions: &[Transaction]) {
        self.analyzer.learn(account_id, transactions);
    }

    /// Build a context from what the detector itself knows about the
    /// source account: velocity activity and any learned profile
    pub fn derive_context(&self, txn: &Transaction) -> EvaluationContext {
        let account_id = txn.source_account_id.as_str();
        EvaluationContext {
            recent_activity: Some(self.velocity.get_activity(account_id)),
            account_profile: self
                .analyzer
                .get_pattern(account_id)
                .map(|p| p.to_profile()),
            ..Default::default()
        }
    }

    /// Configuration
    pub fn config(&self) -> &FraudConfig {
        &self.config
    }

    /// Geofence lists used by the geolocation rule
    pub fn geofence(&self) -> &GeofenceChecker {
        &self.geofence
    }

    /// Pattern analyzer used by the pattern rule
    pub fn pattern_analyzer(&self) -> &PatternAnalyzer {
        &self.analyzer
    }

    /// Velocity tracker
    pub fn velocity_tracker(&self) -> &VelocityTracker {
        &self.velocity
    }

    /// Metrics
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Rules in evaluation order
    pub fn rules(&self) -> impl Iterator<Item = &dyn Rule> {
        self.rules.iter().map(|r| r.as_ref())
    }
}

impl std::fmt::Debug for Detector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Detector")
            .field("config", &self.config)
            .field("rules", &self.rules.len())
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

/// Build an open alert. Severity follows the risk score; the alert type is
/// the first indicator's, or an amount anomaly when there are none.
pub(crate) fn build_alert(
    txn: &Transaction,
    risk_score: f64,
    indicators: &[FraudIndicator],
) -> FraudAlert {
    FraudAlert {
        id: Uuid::new_v4(),
        transaction_id: txn.id,
        alert_type: indicators
            .first()
            .map(|i| i.indicator_type)
            .unwrap_or(FraudType::AmountAnomaly),
        severity: severity_for_score(risk_score),
        risk_score,
        indicators: indicators.to_vec(),
        status: AlertStatus::Open,
        resolution: None,
        resolved_at: None,
        created_at: Utc::now(),
    }
}

/// Insert an alert, evicting the oldest closed alert (else the oldest
/// alert) once the map holds `max_alerts`
fn insert_bounded(alerts: &mut HashMap<Uuid, FraudAlert>, alert: FraudAlert, max_alerts: usize) {
    if alerts.len() >= max_alerts && !alerts.contains_key(&alert.id) {
        let victim = alerts
            .values()
            .filter(|a| a.status.is_closed())
            .min_by_key(|a| a.created_at)
            .or_else(|| alerts.values().min_by_key(|a| a.created_at))
            .map(|a| a.id);

        if let Some(victim) = victim {
            alerts.remove(&victim);
            warn!(alert_id = %victim, "Alert map full, evicted oldest alert");
        }
    }
    alerts.insert(alert.id, alert);
}

/// Single consumer of the alert queue
struct AlertWorker {
    receiver: mpsc::Receiver<FraudAlert>,
    alerts: AlertMap,
    store: Option<Arc<dyn AlertStore>>,
    metrics: Metrics,
    max_alerts: usize,
}

impl AlertWorker {
    async fn run(mut self, cancel: CancellationToken, mut stop: oneshot::Receiver<()>) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Alert worker cancelled");
                    break;
                }
                _ = &mut stop => {
                    debug!("Alert worker received stop signal");
                    break;
                }
                alert = self.receiver.recv() => match alert {
                    Some(alert) => self.store_alert(alert).await,
                    None => break,
                },
            }
        }

        // Keep what was already accepted onto the queue
        while let Ok(alert) = self.receiver.try_recv() {
            self.store_alert(alert).await;
        }
        debug!("Alert worker exited");
    }

    async fn store_alert(&self, alert: FraudAlert) {
        let persisted = self.store.as_ref().map(|_| alert.clone());

        {
            let mut alerts = self.alerts.write();
            insert_bounded(&mut alerts, alert, self.max_alerts);
            self.metrics.alerts_stored.set(alerts.len() as i64);
        }

        if let (Some(store), Some(alert)) = (&self.store, persisted) {
            if let Err(e) = store.save(&alert).await {
                warn!(alert_id = %alert.id, "Failed to persist alert: {}", e);
            }
        }
    }
}
