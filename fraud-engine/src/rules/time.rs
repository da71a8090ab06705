//! Time-of-day checks

use super::Rule;
use crate::types::{EvaluationContext, FraudIndicator, FraudType, RuleResult, Transaction};
use chrono::Timelike;
use std::ops::RangeInclusive;

/// Local hours considered unusual for legitimate activity
const UNUSUAL_HOURS: RangeInclusive<u32> = 2..=5;

const UNUSUAL_HOUR_SCORE: f64 = 1.0;
const ATYPICAL_HOUR_SCORE: f64 = 0.5;

/// Flags transactions at odd local hours or outside the account's habits
#[derive(Default)]
pub struct TimeRule;

impl TimeRule {
    /// Create the rule
    pub fn new() -> Self {
        Self
    }
}

impl Rule for TimeRule {
    fn name(&self) -> &str {
        "time"
    }

    fn priority(&self) -> i32 {
        50
    }

    fn evaluate(&self, txn: &Transaction, ctx: &EvaluationContext) -> RuleResult {
        let mut result = RuleResult::default();
        let hour = txn.created_at.hour();

        if UNUSUAL_HOURS.contains(&hour) {
            result.record(
                FraudIndicator::new(
                    FraudType::TimeAnomaly,
                    "Transaction during unusual hours",
                    UNUSUAL_HOUR_SCORE,
                )
                .with_detail("hour", hour),
                false,
            );
        }

        if let Some(profile) = &ctx.account_profile {
            if !profile.typical_hours.is_empty() && !profile.typical_hours.contains(&hour) {
                result.record(
                    FraudIndicator::new(
                        FraudType::TimeAnomaly,
                        "Transaction outside typical hours for account",
                        ATYPICAL_HOUR_SCORE,
                    )
                    .with_detail("hour", hour),
                    false,
                );
            }
        }

        result.triggered = !result.indicators.is_empty();
        if result.triggered {
            result.description = "Unusual transaction time".to_string();
        }
        result
    }
}
