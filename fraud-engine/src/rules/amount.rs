//! Absolute and relative amount checks

use super::Rule;
use crate::types::{EvaluationContext, FraudIndicator, FraudType, RuleResult, Transaction};
use rust_decimal::Decimal;

const LIMIT_SCORE: f64 = 3.0;
const AVERAGE_RATIO_SCORE: f64 = 2.0;
/// Amount-to-average ratio above which the amount is anomalous
const AVERAGE_RATIO_LIMIT: i64 = 5;

/// Flags amounts above the single-transaction limit or far above the
/// account's average
pub struct AmountRule {
    max_amount: Decimal,
}

impl AmountRule {
    /// Create with the single-transaction limit
    pub fn new(max_amount: Decimal) -> Self {
        Self { max_amount }
    }
}

impl Rule for AmountRule {
    fn name(&self) -> &str {
        "amount"
    }

    fn priority(&self) -> i32 {
        10
    }

    fn evaluate(&self, txn: &Transaction, ctx: &EvaluationContext) -> RuleResult {
        let mut result = RuleResult::default();

        if txn.amount > self.max_amount {
            result.record(
                FraudIndicator::new(
                    FraudType::AmountAnomaly,
                    "Transaction amount exceeds maximum allowed",
                    LIMIT_SCORE,
                )
                .with_detail("amount", txn.amount.to_string())
                .with_detail("max_amount", self.max_amount.to_string()),
                true,
            );
        }

        // A zero average carries no information
        let average = ctx
            .account_profile
            .as_ref()
            .map(|p| p.average_amount)
            .filter(|avg| *avg > Decimal::ZERO);

        if let Some(ratio) = average.and_then(|avg| txn.amount.checked_div(avg)) {
            if ratio > Decimal::from(AVERAGE_RATIO_LIMIT) {
                result.record(
                    FraudIndicator::new(
                        FraudType::AmountAnomaly,
                        format!("Amount is {:.1}x the account average", ratio),
                        AVERAGE_RATIO_SCORE,
                    )
                    .with_detail("ratio", ratio.round_dp(2).to_string()),
                    true,
                );
            }
        }

        if result.triggered {
            result.description = "Unusual transaction amount".to_string();
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::testutil::txn;
    use crate::types::AccountProfile;
    use rust_decimal_macros::dec;

    fn with_average(average: Decimal) -> EvaluationContext {
        EvaluationContext {
            account_profile: Some(AccountProfile {
                average_amount: average,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_over_limit() {
        let rule = AmountRule::new(dec!(5000));
        let result = rule.evaluate(&txn(dec!(6000)), &EvaluationContext::default());

        assert!(result.triggered);
        assert_eq!(result.score, 3.0);
        assert_eq!(result.indicators.len(), 1);
        assert_eq!(result.indicators[0].indicator_type, FraudType::AmountAnomaly);
        assert_eq!(result.indicators[0].indicator_type.as_str(), "amount_anomaly");
    }

    #[test]
    fn test_at_limit_is_clean() {
        let rule = AmountRule::new(dec!(5000));
        let result = rule.evaluate(&txn(dec!(5000)), &EvaluationContext::default());

        assert!(!result.triggered);
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn test_far_above_average() {
        let rule = AmountRule::new(dec!(5000));
        let result = rule.evaluate(&txn(dec!(600)), &with_average(dec!(100)));

        assert!(result.triggered);
        assert_eq!(result.score, 2.0);
    }

    #[test]
    fn test_both_conditions_add_up() {
        let rule = AmountRule::new(dec!(5000));
        let result = rule.evaluate(&txn(dec!(6000)), &with_average(dec!(100)));

        assert!(result.triggered);
        assert_eq!(result.score, 5.0);
        assert_eq!(result.indicators.len(), 2);
    }

    #[test]
    fn test_ratio_of_exactly_five_is_clean() {
        let rule = AmountRule::new(dec!(5000));
        let result = rule.evaluate(&txn(dec!(500)), &with_average(dec!(100)));
        assert!(!result.triggered);
    }

    #[test]
    fn test_zero_average_ignored() {
        let rule = AmountRule::new(dec!(5000));
        let result = rule.evaluate(&txn(dec!(600)), &with_average(Decimal::ZERO));

        assert!(!result.triggered);
        assert!(result.indicators.is_empty());
    }
}
