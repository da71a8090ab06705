//! Merchant category and familiarity checks

use super::Rule;
use crate::types::{EvaluationContext, FraudIndicator, FraudType, RuleResult, Transaction};
use std::collections::HashSet;

/// Merchant category codes with elevated fraud exposure: direct marketing,
/// gambling, telemarketing, money transfer and quasi-cash
pub const HIGH_RISK_MCCS: [&str; 6] = ["5967", "5966", "7995", "5962", "4829", "6051"];

/// Typical-merchant list must be longer than this before "new" means anything
const MIN_KNOWN_MERCHANTS: usize = 5;

const HIGH_RISK_MCC_SCORE: f64 = 2.0;
const NEW_MERCHANT_SCORE: f64 = 0.5;

/// Flags high-risk merchant categories and merchants new to the account
pub struct MerchantRule {
    high_risk_mccs: HashSet<&'static str>,
}

impl MerchantRule {
    /// Create with the default high-risk MCC list
    pub fn new() -> Self {
        Self {
            high_risk_mccs: HIGH_RISK_MCCS.into_iter().collect(),
        }
    }
}

impl Default for MerchantRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for MerchantRule {
    fn name(&self) -> &str {
        "merchant"
    }

    fn priority(&self) -> i32 {
        60
    }

    fn evaluate(&self, txn: &Transaction, ctx: &EvaluationContext) -> RuleResult {
        let mut result = RuleResult::default();

        let Some(merchant) = &txn.merchant else {
            return result;
        };

        if self.high_risk_mccs.contains(merchant.mcc.as_str()) {
            result.record(
                FraudIndicator::new(
                    FraudType::MerchantRisk,
                    format!("High-risk merchant category {}", merchant.mcc),
                    HIGH_RISK_MCC_SCORE,
                )
                .with_detail("mcc", merchant.mcc.as_str())
                .with_detail("merchant_id", merchant.id.as_str()),
                true,
            );
        }

        if let Some(profile) = &ctx.account_profile {
            let known = &profile.typical_merchants;
            if known.len() > MIN_KNOWN_MERCHANTS
                && !known.iter().any(|m| *m == merchant.id || *m == merchant.name)
            {
                result.record(
                    FraudIndicator::new(
                        FraudType::MerchantRisk,
                        "First transaction with this merchant",
                        NEW_MERCHANT_SCORE,
                    )
                    .with_detail("merchant_id", merchant.id.as_str()),
                    false,
                );
            }
        }

        if result.triggered {
            result.description = "Risky merchant".to_string();
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::testutil::{merchant, txn};
    use crate::types::AccountProfile;
    use rust_decimal_macros::dec;

    fn known_merchants(n: usize) -> EvaluationContext {
        EvaluationContext {
            account_profile: Some(AccountProfile {
                typical_merchants: (0..n).map(|i| format!("known-{}", i)).collect(),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_high_risk_mcc() {
        for mcc in HIGH_RISK_MCCS {
            let mut t = txn(dec!(20));
            t.merchant = Some(merchant("casino", "Lucky", mcc, "US"));

            let result = MerchantRule::new().evaluate(&t, &EvaluationContext::default());
            assert!(result.triggered, "mcc {}", mcc);
            assert_eq!(result.score, 2.0);
        }
    }

    #[test]
    fn test_regular_mcc_clean() {
        let result = MerchantRule::new().evaluate(&txn(dec!(20)), &EvaluationContext::default());
        assert!(!result.triggered);
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn test_new_merchant_needs_history() {
        let rule = MerchantRule::new();

        let result = rule.evaluate(&txn(dec!(20)), &known_merchants(6));
        assert!(!result.triggered);
        assert_eq!(result.score, 0.5);
        assert_eq!(result.indicators.len(), 1);

        let result = rule.evaluate(&txn(dec!(20)), &known_merchants(5));
        assert!(result.indicators.is_empty());
    }

    #[test]
    fn test_known_merchant_by_name() {
        let mut ctx = known_merchants(6);
        if let Some(profile) = ctx.account_profile.as_mut() {
            profile.typical_merchants.push("Corner Grocer".to_string());
        }

        let result = MerchantRule::new().evaluate(&txn(dec!(20)), &ctx);
        assert!(result.indicators.is_empty());
    }

    #[test]
    fn test_no_merchant_no_signal() {
        let mut t = txn(dec!(20));
        t.merchant = None;
        let result = MerchantRule::new().evaluate(&t, &known_merchants(8));
        assert!(!result.triggered);
        assert!(result.indicators.is_empty());
    }
}
