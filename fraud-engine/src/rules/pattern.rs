//! Amount-pattern checks against the account's recent history

use super::Rule;
use crate::pattern::PatternAnalyzer;
use crate::types::{EvaluationContext, FraudIndicator, FraudType, RuleResult, Transaction};
use rust_decimal::Decimal;
use std::sync::Arc;

const ROUND_AMOUNT_SCORE: f64 = 0.5;
const REPEATED_AMOUNT_SCORE: f64 = 1.5;
const CARD_TESTING_SCORE: f64 = 3.0;

/// Prior transactions needed before a repeat or small-amount burst counts
const MIN_PRIOR_MATCHES: usize = 3;

/// Detects round amounts, repeated amounts and card testing
pub struct PatternRule {
    analyzer: Arc<PatternAnalyzer>,
}

impl PatternRule {
    /// Create with a shared pattern analyzer
    pub fn new(analyzer: Arc<PatternAnalyzer>) -> Self {
        Self { analyzer }
    }
}

fn is_round_amount(amount: Decimal) -> bool {
    amount % Decimal::ONE_HUNDRED == Decimal::ZERO || amount % Decimal::from(50) == Decimal::ZERO
}

impl Rule for PatternRule {
    fn name(&self) -> &str {
        "pattern"
    }

    fn priority(&self) -> i32 {
        40
    }

    fn evaluate(&self, txn: &Transaction, ctx: &EvaluationContext) -> RuleResult {
        let mut result = RuleResult::default();

        let Some(history) = &ctx.account_history else {
            return result;
        };

        if txn.amount > Decimal::ONE_HUNDRED && is_round_amount(txn.amount) {
            result.record(
                FraudIndicator::new(
                    FraudType::PatternAnomaly,
                    "Round amount transaction",
                    ROUND_AMOUNT_SCORE,
                )
                .with_detail("amount", txn.amount.to_string()),
                false,
            );
        }

        let repeats = history.iter().filter(|t| t.amount == txn.amount).count();
        if repeats >= MIN_PRIOR_MATCHES {
            let mut indicator = FraudIndicator::new(
                FraudType::PatternAnomaly,
                format!("Amount {} repeated {} times", txn.amount, repeats),
                REPEATED_AMOUNT_SCORE,
            )
            .with_detail("repeat_count", repeats);

            if let Some(pattern) = self.analyzer.get_pattern(&txn.source_account_id) {
                let average = pattern.average_amount.normalize().to_string();
                indicator = indicator.with_detail("learned_average_amount", average);
            }

            result.record(indicator, true);
        }

        let small = Decimal::from(5);
        if txn.amount < small {
            let small_count = history.iter().filter(|t| t.amount < small).count();
            if small_count >= MIN_PRIOR_MATCHES {
                result.record(
                    FraudIndicator::new(
                        FraudType::CardTesting,
                        "Potential card testing detected",
                        CARD_TESTING_SCORE,
                    )
                    .with_detail("small_transaction_count", small_count),
                    true,
                );
            }
        }

        result.triggered = !result.indicators.is_empty();
        if result.triggered {
            result.description = "Suspicious amount pattern".to_string();
        }
        result
    }
}
