//! Per-account transaction velocity tracking

use crate::types::{ActivitySummary, Transaction};
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;
use uuid::Uuid;

/// Lightweight copy of a transaction kept for velocity tracking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Transaction ID
    pub transaction_id: Uuid,

    /// Amount
    pub amount: Decimal,

    /// Transaction creation time
    pub timestamp: DateTime<Utc>,

    /// Merchant country
    pub location: Option<String>,

    /// Merchant id
    pub merchant_id: Option<String>,
}

impl TransactionRecord {
    fn from_transaction(txn: &Transaction) -> Self {
        Self {
            transaction_id: txn.id,
            amount: txn.amount,
            timestamp: txn.created_at_utc(),
            location: txn.merchant.as_ref().map(|m| m.country.clone()),
            merchant_id: txn.merchant.as_ref().map(|m| m.id.clone()),
        }
    }
}

/// Append-only record list for one account
#[derive(Debug, Default)]
struct AccountVelocity {
    transactions: Vec<TransactionRecord>,
}

impl AccountVelocity {
    /// Drop records outside the window
    fn cleanup(&mut self, window_start: DateTime<Utc>) {
        self.transactions.retain(|tx| tx.timestamp >= window_start);
    }

    fn in_window(&self, window_start: DateTime<Utc>) -> impl Iterator<Item = &TransactionRecord> {
        self.transactions.iter().filter(move |tx| tx.timestamp >= window_start)
    }
}

#[derive(Debug)]
struct TrackerState {
    accounts: HashMap<String, AccountVelocity>,
    last_cleanup: DateTime<Utc>,
}

/// Rolling window of recent transactions per account.
///
/// Records are pruned lazily: every `record` call checks whether half the
/// window has passed since the last sweep and, if so, drops expired records
/// across all accounts. Reads always filter by the window, so a stale
/// record is never counted even before it is pruned.
#[derive(Debug)]
pub struct VelocityTracker {
    window: Duration,
    state: RwLock<TrackerState>,
}

impl VelocityTracker {
    /// Create a tracker for the given window
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            state: RwLock::new(TrackerState {
                accounts: HashMap::new(),
                last_cleanup: Utc::now(),
            }),
        }
    }

    /// Window length
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record a transaction against its source account
    pub fn record(&self, txn: &Transaction) {
        let now = Utc::now();
        let mut state = self.state.write();

        state
            .accounts
            .entry(txn.source_account_id.clone())
            .or_default()
            .transactions
            .push(TransactionRecord::from_transaction(txn));

        if now - state.last_cleanup >= self.window / 2 {
            let window_start = now - self.window;
            for account in state.accounts.values_mut() {
                account.cleanup(window_start);
            }
            state.accounts.retain(|_, account| !account.transactions.is_empty());
            state.last_cleanup = now;
            debug!("Velocity cleanup done, {} accounts tracked", state.accounts.len());
        }
    }

    /// Activity summary for an account over the window
    pub fn get_activity(&self, account_id: &str) -> ActivitySummary {
        let window_start = Utc::now() - self.window;
        let state = self.state.read();

        let Some(account) = state.accounts.get(account_id) else {
            return ActivitySummary::empty(self.window);
        };

        let mut summary = ActivitySummary::empty(self.window);
        let mut locations = HashSet::new();
        let mut merchants = HashSet::new();

        for tx in account.in_window(window_start) {
            summary.transaction_count += 1;
            summary.total_amount += tx.amount;
            if let Some(location) = &tx.location {
                locations.insert(location.as_str());
            }
            if let Some(merchant) = &tx.merchant_id {
                merchants.insert(merchant.as_str());
            }
        }

        summary.unique_locations = locations.len();
        summary.unique_merchants = merchants.len();
        summary
    }

    /// Up to `limit` records inside the window, newest first
    pub fn get_recent_transactions(
        &self,
        account_id: &str,
        limit: usize,
    ) -> Vec<TransactionRecord> {
        let window_start = Utc::now() - self.window;
        let state = self.state.read();

        state
            .accounts
            .get(account_id)
            .map(|account| {
                account
                    .transactions
                    .iter()
                    .rev()
                    .filter(|tx| tx.timestamp >= window_start)
                    .take(limit)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Clear velocity data for one account
    pub fn reset_account(&self, account_id: &str) {
        self.state.write().accounts.remove(account_id);
    }

    /// Clear all accounts
    pub fn reset(&self) {
        let mut state = self.state.write();
        state.accounts.clear();
        state.last_cleanup = Utc::now();
    }

    /// Number of accounts with retained records
    pub fn tracked_accounts(&self) -> usize {
        self.state.read().accounts.len()
    }
}
