//! Activity-volume checks over the velocity window

use super::Rule;
use crate::types::{EvaluationContext, FraudIndicator, FraudType, RuleResult, Transaction};
use chrono::Duration;
use rust_decimal::Decimal;

/// More transactions than this inside the window is suspicious
const MAX_TRANSACTIONS: usize = 10;
/// More distinct locations than this inside the window is suspicious
const MAX_LOCATIONS: usize = 3;

const COUNT_SCORE: f64 = 2.0;
const AMOUNT_SCORE: f64 = 3.0;
const LOCATION_SCORE: f64 = 2.5;

/// Scores the account's recent activity summary
pub struct VelocityRule {
    window: Duration,
    max_daily_amount: Decimal,
}

impl VelocityRule {
    /// Create with the tracking window and the total-amount cap
    pub fn new(window: Duration, max_daily_amount: Decimal) -> Self {
        Self {
            window,
            max_daily_amount,
        }
    }
}

impl Rule for VelocityRule {
    fn name(&self) -> &str {
        "velocity"
    }

    fn priority(&self) -> i32 {
        20
    }

    fn evaluate(&self, _txn: &Transaction, ctx: &EvaluationContext) -> RuleResult {
        let mut result = RuleResult::default();

        let Some(activity) = &ctx.recent_activity else {
            return result;
        };

        let window_hours = self.window.num_hours();

        if activity.transaction_count > MAX_TRANSACTIONS {
            result.record(
                FraudIndicator::new(
                    FraudType::VelocityAnomaly,
                    format!(
                        "{} transactions in the last {}h",
                        activity.transaction_count, window_hours
                    ),
                    COUNT_SCORE,
                )
                .with_detail("transaction_count", activity.transaction_count),
                true,
            );
        }

        if activity.total_amount > self.max_daily_amount {
            result.record(
                FraudIndicator::new(
                    FraudType::VelocityAnomaly,
                    format!(
                        "Total amount {} exceeds limit {}",
                        activity.total_amount, self.max_daily_amount
                    ),
                    AMOUNT_SCORE,
                )
                .with_detail("total_amount", activity.total_amount.to_string())
                .with_detail("max_daily_amount", self.max_daily_amount.to_string()),
                true,
            );
        }

        if activity.unique_locations > MAX_LOCATIONS {
            result.record(
                FraudIndicator::new(
                    FraudType::VelocityAnomaly,
                    format!(
                        "Transactions from {} locations in the last {}h",
                        activity.unique_locations, window_hours
                    ),
                    LOCATION_SCORE,
                )
                .with_detail("unique_locations", activity.unique_locations),
                true,
            );
        }

        if result.triggered {
            result.description = "High transaction velocity".to_string();
        }
        result
    }
}
