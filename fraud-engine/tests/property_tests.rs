//! Property-based tests for scoring and tracking invariants
//!
//! - Normalized risk always lands in [0, 1] and never decreases with raw score
//! - Amounts over the single-transaction cap always trigger the amount rule
//! - Velocity activity only counts transactions inside the window
//! - Learned typical merchants are capped at ten
//! - Geofence edits round-trip regardless of case

use chrono::{Duration, Utc};
use fraud_engine::rules::AmountRule;
use fraud_engine::scoring::{decide, normalize_score};
use fraud_engine::{
    Decision, EvaluationContext, GeofenceChecker, Merchant, PatternAnalyzer, Rule, Transaction,
    VelocityTracker,
};
use proptest::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

/// Strategy for generating amounts in cents
fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn txn(amount: Decimal, merchant_id: &str, age: Duration) -> Transaction {
    Transaction {
        id: Uuid::new_v4(),
        amount,
        currency: "USD".to_string(),
        source_account_id: "PROP-ACC".to_string(),
        destination_account_id: None,
        merchant: Some(Merchant {
            id: merchant_id.to_string(),
            name: format!("Merchant {}", merchant_id),
            mcc: "5812".to_string(),
            country: "US".to_string(),
        }),
        category: "dining".to_string(),
        created_at: (Utc::now() - age).fixed_offset(),
    }
}

proptest! {
    #[test]
    fn normalized_score_in_unit_range(raw in -50.0f64..50.0) {
        let risk = normalize_score(raw);
        prop_assert!((0.0..=1.0).contains(&risk));
    }

    #[test]
    fn normalized_score_is_monotonic(a in 0.0f64..20.0, b in 0.0f64..20.0) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(normalize_score(lo) <= normalize_score(hi));
    }

    #[test]
    fn decision_respects_threshold(risk in 0.0f64..=1.0, threshold in 0.05f64..=1.0) {
        let decision = decide(risk, threshold);
        prop_assert_eq!(decision == Decision::Block, risk >= threshold);
        if risk < threshold * 0.7 {
            prop_assert_eq!(decision, Decision::Allow);
        }
    }

    #[test]
    fn over_limit_amount_always_triggers(
        limit in amount_strategy(),
        excess in amount_strategy(),
    ) {
        let rule = AmountRule::new(limit);
        let result = rule.evaluate(
            &txn(limit + excess, "m-0", Duration::zero()),
            &EvaluationContext::default(),
        );
        prop_assert!(result.triggered);
        prop_assert!(result.score >= 3.0);
    }

    #[test]
    fn velocity_counts_only_window(
        recent in proptest::collection::vec(0i64..55, 0..20),
        stale in proptest::collection::vec(65i64..600, 0..20),
    ) {
        let tracker = VelocityTracker::new(Duration::hours(1));
        for minutes in recent.iter().chain(stale.iter()) {
            tracker.record(&txn(Decimal::ONE, "m-0", Duration::minutes(*minutes)));
        }

        let activity = tracker.get_activity("PROP-ACC");
        prop_assert_eq!(activity.transaction_count, recent.len());
        prop_assert_eq!(activity.total_amount, Decimal::from(recent.len() as i64));
    }

    #[test]
    fn typical_merchants_capped(merchants in 15usize..40, repeats in 2usize..4) {
        let history: Vec<Transaction> = (0..merchants)
            .flat_map(|m| {
                (0..repeats).map(move |_| {
                    txn(Decimal::TEN, &format!("m-{}", m), Duration::hours(m as i64))
                })
            })
            .collect();

        let analyzer = PatternAnalyzer::new();
        analyzer.learn("PROP-ACC", &history);

        let pattern = analyzer.get_pattern("PROP-ACC").unwrap();
        prop_assert!(pattern.typical_merchants.len() <= 10);
        prop_assert_eq!(pattern.sample_size, merchants * repeats);
    }

    #[test]
    fn geofence_round_trip(code in "[a-zA-Z]{2}") {
        let geofence = GeofenceChecker::new();

        geofence.add_high_risk_country(&code);
        prop_assert!(geofence.is_high_risk_country(&code.to_uppercase()));
        prop_assert!(geofence.is_high_risk_country(&code.to_lowercase()));

        geofence.remove_high_risk_country(&code);
        prop_assert!(!geofence.is_high_risk_country(&code));
        prop_assert!(!geofence.high_risk_countries().contains(&code.to_uppercase()));
    }
}
