//! Learned behavioral patterns per account

use crate::types::{AccountProfile, RiskLevel, Transaction};
use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Number of busiest hours kept
const TOP_HOURS: usize = 5;

/// A weekday is typical when it holds more than this share of the sample
const TYPICAL_DAY_SHARE: f64 = 0.1;

/// Minimum occurrences for a merchant to count as typical
const MIN_MERCHANT_OCCURRENCES: usize = 2;

/// Cap on typical merchants kept
const MAX_TYPICAL_MERCHANTS: usize = 10;

/// Snapshot of an account's habits learned from its history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountPattern {
    /// Account ID
    pub account_id: String,

    /// Mean transaction amount
    pub average_amount: Decimal,

    /// Busiest local hours, most frequent first
    pub typical_hours: Vec<u32>,

    /// Weekdays with a meaningful share of activity
    pub typical_days: Vec<Weekday>,

    /// Repeat merchants, at most ten
    pub typical_merchants: Vec<String>,

    /// Number of transactions the pattern was learned from
    pub sample_size: usize,

    /// When the pattern was learned
    pub last_updated: DateTime<Utc>,
}

impl AccountPattern {
    /// Convert into a profile usable in an evaluation context
    pub fn to_profile(&self) -> AccountProfile {
        AccountProfile {
            average_amount: self.average_amount,
            typical_locations: Vec::new(),
            typical_merchants: self.typical_merchants.clone(),
            typical_hours: self.typical_hours.clone(),
            risk_level: RiskLevel::Low,
        }
    }
}

/// Learns and serves per-account patterns
#[derive(Debug, Default)]
pub struct PatternAnalyzer {
    patterns: RwLock<HashMap<String, AccountPattern>>,
}

impl PatternAnalyzer {
    /// Create an empty analyzer
    pub fn new() -> Self {
        Self::default()
    }

    /// Learn a pattern from `transactions`, replacing any previous one.
    /// Empty input leaves the analyzer untouched.
    pub fn learn(&self, account_id: &str, transactions: &[Transaction]) {
        if transactions.is_empty() {
            return;
        }

        let pattern = compute_pattern(account_id, transactions);
        debug!(
            "Learned pattern for {}: avg {}, {} hours, {} merchants",
            account_id,
            pattern.average_amount,
            pattern.typical_hours.len(),
            pattern.typical_merchants.len()
        );

        self.patterns.write().insert(account_id.to_string(), pattern);
    }

    /// Get the learned pattern for an account
    pub fn get_pattern(&self, account_id: &str) -> Option<AccountPattern> {
        self.patterns.read().get(account_id).cloned()
    }

    /// Number of accounts with a learned pattern
    pub fn account_count(&self) -> usize {
        self.patterns.read().len()
    }
}

fn compute_pattern(account_id: &str, transactions: &[Transaction]) -> AccountPattern {
    let sample_size = transactions.len();
    let total: Decimal = transactions.iter().map(|t| t.amount).sum();
    let average_amount = total / Decimal::from(sample_size);

    let mut hour_counts: HashMap<u32, usize> = HashMap::new();
    let mut day_counts: HashMap<Weekday, usize> = HashMap::new();
    let mut merchant_counts: HashMap<&str, usize> = HashMap::new();
    let mut merchant_order: Vec<&str> = Vec::new();

    for txn in transactions {
        *hour_counts.entry(txn.created_at.hour()).or_insert(0) += 1;
        *day_counts.entry(txn.created_at.weekday()).or_insert(0) += 1;

        if let Some(merchant) = &txn.merchant {
            let count = merchant_counts.entry(merchant.id.as_str()).or_insert(0);
            if *count == 0 {
                merchant_order.push(merchant.id.as_str());
            }
            *count += 1;
        }
    }

    let mut hours: Vec<(u32, usize)> = hour_counts.into_iter().collect();
    hours.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    let typical_hours = hours.into_iter().take(TOP_HOURS).map(|(hour, _)| hour).collect();

    let mut typical_days: Vec<Weekday> = day_counts
        .into_iter()
        .filter(|(_, count)| *count as f64 / sample_size as f64 > TYPICAL_DAY_SHARE)
        .map(|(day, _)| day)
        .collect();
    typical_days.sort_by_key(|d| d.num_days_from_monday());

    let typical_merchants = merchant_order
        .into_iter()
        .filter(|id| merchant_counts[id] >= MIN_MERCHANT_OCCURRENCES)
        .take(MAX_TYPICAL_MERCHANTS)
        .map(str::to_string)
        .collect();

    AccountPattern {
        account_id: account_id.to_string(),
        average_amount,
        typical_hours,
        typical_days,
        typical_merchants,
        sample_size,
        last_updated: Utc::now(),
    }
}
