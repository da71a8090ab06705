//! Core types for the fraud engine

use chrono::{DateTime, Duration, FixedOffset, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Merchant attached to a card transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Merchant {
    /// Merchant identifier
    pub id: String,

    /// Display name
    pub name: String,

    /// Merchant category code (e.g. "5967")
    pub mcc: String,

    /// ISO 3166 alpha-2 country code
    pub country: String,
}

/// Transaction under evaluation. The engine never mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction ID
    pub id: Uuid,

    /// Amount in minor-unit-exact decimal
    pub amount: Decimal,

    /// Currency code
    pub currency: String,

    /// Account the funds leave from; velocity and patterns are keyed on it
    pub source_account_id: String,

    /// Receiving account, if any
    #[serde(default)]
    pub destination_account_id: Option<String>,

    /// Merchant, absent for account-to-account transfers
    #[serde(default)]
    pub merchant: Option<Merchant>,

    /// Free-form category assigned upstream
    #[serde(default)]
    pub category: String,

    /// Creation time with the offset of the place it happened
    pub created_at: DateTime<FixedOffset>,
}

impl Transaction {
    /// Creation time in UTC
    pub fn created_at_utc(&self) -> DateTime<Utc> {
        self.created_at.with_timezone(&Utc)
    }

    /// Merchant country, if a merchant is present
    pub fn merchant_country(&self) -> Option<&str> {
        self.merchant.as_ref().map(|m| m.country.as_str())
    }
}

/// Precomputed activity over a time window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivitySummary {
    /// Number of transactions in the window
    pub transaction_count: usize,

    /// Sum of amounts in the window
    pub total_amount: Decimal,

    /// Distinct locations seen
    pub unique_locations: usize,

    /// Distinct merchants seen
    pub unique_merchants: usize,

    /// Window length in seconds
    pub window_secs: i64,
}

impl ActivitySummary {
    /// Zero-valued summary for an account with no activity
    pub fn empty(window: Duration) -> Self {
        Self {
            transaction_count: 0,
            total_amount: Decimal::ZERO,
            unique_locations: 0,
            unique_merchants: 0,
            window_secs: window.num_seconds(),
        }
    }

    /// Window as a chrono duration
    pub fn window(&self) -> Duration {
        Duration::seconds(self.window_secs)
    }
}

/// Risk level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// Low risk
    #[default]
    Low,
    /// Medium risk
    Medium,
    /// High risk
    High,
}

/// Behavioral profile of an account, learned or supplied upstream
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountProfile {
    /// Average transaction amount
    pub average_amount: Decimal,

    /// Cities or country codes the account usually transacts from
    pub typical_locations: Vec<String>,

    /// Merchant ids or names the account usually pays
    pub typical_merchants: Vec<String>,

    /// Local hours (0-23) the account is usually active
    pub typical_hours: Vec<u32>,

    /// Risk level assigned to the account
    pub risk_level: RiskLevel,
}

/// Device the transaction was initiated from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceInfo {
    /// Device fingerprint
    pub device_id: String,

    /// Device type (mobile, desktop, pos, ...)
    pub device_type: String,

    /// User agent string
    pub user_agent: String,

    /// Whether the device has been seen on this account before
    pub is_known: bool,
}

/// Resolved geolocation of the transaction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoLocation {
    /// ISO 3166 alpha-2 country code
    pub country: String,

    /// City name
    pub city: String,

    /// Latitude
    pub latitude: f64,

    /// Longitude
    pub longitude: f64,

    /// Originating IP address
    pub ip_address: String,
}

/// Caller-supplied context for one evaluation. Every field is optional and
/// missing data means "no signal".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationContext {
    /// Prior transactions, most recent first. `None` and empty differ:
    /// pattern checks only run when history was provided.
    pub account_history: Option<Vec<Transaction>>,

    /// Activity summary over the velocity window
    pub recent_activity: Option<ActivitySummary>,

    /// Account profile
    pub account_profile: Option<AccountProfile>,

    /// Device information
    pub device_info: Option<DeviceInfo>,

    /// Geolocation
    pub geo_location: Option<GeoLocation>,
}

/// Fraud signal category. Indicators carry one and alerts inherit the first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FraudType {
    /// Amount unusual in absolute or relative terms
    AmountAnomaly,
    /// Too many or too large transactions in the window
    VelocityAnomaly,
    /// High-risk or unusual location
    GeoAnomaly,
    /// Locations too far apart for the time between them
    ImpossibleTravel,
    /// Repeated or round amounts
    PatternAnomaly,
    /// Burst of small transactions validating stolen credentials
    CardTesting,
    /// Unusual time of day
    TimeAnomaly,
    /// High-risk merchant category or unfamiliar merchant
    MerchantRisk,
}

impl FraudType {
    /// Stable string form used in logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            FraudType::AmountAnomaly => "amount_anomaly",
            FraudType::VelocityAnomaly => "velocity_anomaly",
            FraudType::GeoAnomaly => "geo_anomaly",
            FraudType::ImpossibleTravel => "impossible_travel",
            FraudType::PatternAnomaly => "pattern_anomaly",
            FraudType::CardTesting => "card_testing",
            FraudType::TimeAnomaly => "time_anomaly",
            FraudType::MerchantRisk => "merchant_risk",
        }
    }
}

/// One piece of evidence produced by a rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudIndicator {
    /// Signal category
    pub indicator_type: FraudType,

    /// Human readable description
    pub description: String,

    /// Score this indicator contributed
    pub score: f64,

    /// Free-form details
    #[serde(default)]
    pub details: HashMap<String, serde_json::Value>,
}

impl FraudIndicator {
    /// Create an indicator without details
    pub fn new(indicator_type: FraudType, description: impl Into<String>, score: f64) -> Self {
        Self {
            indicator_type,
            description: description.into(),
            score,
            details: HashMap::new(),
        }
    }

    /// Attach a detail entry
    pub fn with_detail(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }
}

/// Output of a single rule
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleResult {
    /// Whether the rule fired. Only triggered results are aggregated.
    pub triggered: bool,

    /// Cumulative score, conventionally 0-10
    pub score: f64,

    /// Indicators recorded by the rule
    pub indicators: Vec<FraudIndicator>,

    /// Description
    pub description: String,
}

impl RuleResult {
    /// Add an indicator and its score, optionally marking the result triggered
    pub fn record(&mut self, indicator: FraudIndicator, trigger: bool) {
        self.score += indicator.score;
        self.triggered |= trigger;
        self.indicators.push(indicator);
    }
}

/// Evaluation decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Let the transaction through
    Allow,
    /// Let it through but hold for analyst review
    Review,
    /// Stop the transaction
    Block,
}

impl Decision {
    /// Stable string form
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Allow => "allow",
            Decision::Review => "review",
            Decision::Block => "block",
        }
    }
}

/// Result returned to the caller. Not persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// Transaction ID
    pub transaction_id: Uuid,

    /// Normalized risk score in [0, 1]
    pub risk_score: f64,

    /// Decision
    pub decision: Decision,

    /// Reason, set for Review and Block
    pub reason: Option<String>,

    /// Indicators from every triggered rule, in rule order
    pub indicators: Vec<FraudIndicator>,

    /// Alert enqueued for this transaction, if any
    pub alert_id: Option<Uuid>,

    /// Evaluation timestamp
    pub evaluated_at: DateTime<Utc>,
}

/// Alert severity tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Low
    Low,
    /// Medium
    Medium,
    /// High
    High,
    /// Critical
    Critical,
}

impl Severity {
    /// Stable string form
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

/// Alert workflow status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    /// Newly raised
    Open,
    /// Being investigated
    InProgress,
    /// Closed as confirmed or handled
    Resolved,
    /// Closed as not fraud
    FalsePositive,
    /// Handed to a higher tier
    Escalated,
}

impl AlertStatus {
    /// Whether the alert has been closed by a resolution
    pub fn is_closed(&self) -> bool {
        matches!(self, AlertStatus::Resolved | AlertStatus::FalsePositive)
    }
}

/// Alert raised for a Review or Block decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudAlert {
    /// Alert ID
    pub id: Uuid,

    /// Transaction that raised it
    pub transaction_id: Uuid,

    /// Type, taken from the first indicator
    pub alert_type: FraudType,

    /// Severity tier
    pub severity: Severity,

    /// Normalized risk score
    pub risk_score: f64,

    /// Indicators
    pub indicators: Vec<FraudIndicator>,

    /// Status
    pub status: AlertStatus,

    /// Resolution text
    pub resolution: Option<String>,

    /// Resolution time
    pub resolved_at: Option<DateTime<Utc>>,

    /// Creation time
    pub created_at: DateTime<Utc>,
}

/// Filter for alert queries. Unset fields match everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertFilter {
    /// Status
    pub status: Option<AlertStatus>,

    /// Severity
    pub severity: Option<Severity>,

    /// Alert type
    pub alert_type: Option<FraudType>,

    /// Created at or after
    pub from: Option<DateTime<Utc>>,

    /// Created at or before
    pub to: Option<DateTime<Utc>>,
}

impl AlertFilter {
    /// Check whether an alert passes the filter
    pub fn matches(&self, alert: &FraudAlert) -> bool {
        if self.status.is_some_and(|s| s != alert.status) {
            return false;
        }
        if self.severity.is_some_and(|s| s != alert.severity) {
            return false;
        }
        if self.alert_type.is_some_and(|t| t != alert.alert_type) {
            return false;
        }
        if self.from.is_some_and(|from| alert.created_at < from) {
            return false;
        }
        if self.to.is_some_and(|to| alert.created_at > to) {
            return false;
        }
        true
    }
}

/// Aggregate alert statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FraudStats {
    /// Total alerts held
    pub total_alerts: usize,

    /// Open plus in-progress alerts
    pub open_alerts: usize,

    /// Resolved alerts
    pub resolved_alerts: usize,

    /// Alerts closed as false positives
    pub false_positives: usize,

    /// Count per status
    pub by_status: HashMap<AlertStatus, usize>,

    /// Count per severity
    pub by_severity: HashMap<Severity, usize>,

    /// Count per alert type
    pub by_type: HashMap<FraudType, usize>,

    /// False positives over total, 0 when there are no alerts
    pub false_positive_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alert(status: AlertStatus, severity: Severity, created_at: DateTime<Utc>) -> FraudAlert {
        FraudAlert {
            id: Uuid::new_v4(),
            transaction_id: Uuid::new_v4(),
            alert_type: FraudType::AmountAnomaly,
            severity,
            risk_score: 0.8,
            indicators: vec![],
            status,
            resolution: None,
            resolved_at: None,
            created_at,
        }
    }

    #[test]
    fn test_rule_result_record() {
        let mut result = RuleResult::default();
        result.record(FraudIndicator::new(FraudType::TimeAnomaly, "late", 1.0), false);
        assert!(!result.triggered);
        assert_eq!(result.score, 1.0);

        result.record(FraudIndicator::new(FraudType::MerchantRisk, "mcc", 2.0), true);
        assert!(result.triggered);
        assert_eq!(result.score, 3.0);
        assert_eq!(result.indicators.len(), 2);
    }

    #[test]
    fn test_filter_matches() {
        let now = Utc::now();
        let open_high = alert(AlertStatus::Open, Severity::High, now);

        assert!(AlertFilter::default().matches(&open_high));
        assert!(AlertFilter {
            status: Some(AlertStatus::Open),
            severity: Some(Severity::High),
            ..Default::default()
        }
        .matches(&open_high));
        assert!(!AlertFilter {
            severity: Some(Severity::Low),
            ..Default::default()
        }
        .matches(&open_high));
        assert!(!AlertFilter {
            from: Some(now + Duration::seconds(1)),
            ..Default::default()
        }
        .matches(&open_high));
        assert!(!AlertFilter {
            to: Some(now - Duration::seconds(1)),
            ..Default::default()
        }
        .matches(&open_high));
    }

    #[test]
    fn test_fraud_type_serializes_snake_case() {
        let json = serde_json::to_string(&FraudType::AmountAnomaly).unwrap();
        assert_eq!(json, "\"amount_anomaly\"");
        assert_eq!(FraudType::CardTesting.as_str(), "card_testing");
    }

    #[test]
    fn test_status_closed() {
        assert!(AlertStatus::Resolved.is_closed());
        assert!(AlertStatus::FalsePositive.is_closed());
        assert!(!AlertStatus::Open.is_closed());
        assert!(!AlertStatus::Escalated.is_closed());
    }
}
