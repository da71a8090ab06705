//! Scoring rules
//!
//! Every rule looks at one transaction plus its evaluation context and
//! returns a [`RuleResult`]. The detector runs them in declaration order and
//! sums the scores of the triggered ones; a rule never fails, missing context
//! simply yields no signal.

use crate::config::FraudConfig;
use crate::geofence::GeofenceChecker;
use crate::pattern::PatternAnalyzer;
use crate::types::{EvaluationContext, RuleResult, Transaction};
use std::sync::Arc;

mod amount;
mod geolocation;
mod merchant;
mod pattern;
mod time;
mod velocity;

pub use amount::AmountRule;
pub use geolocation::GeolocationRule;
pub use merchant::MerchantRule;
pub use pattern::PatternRule;
pub use time::TimeRule;
pub use velocity::VelocityRule;

/// A fraud scoring strategy
pub trait Rule: Send + Sync {
    /// Rule name
    fn name(&self) -> &str;

    /// Priority metadata. Not used for ordering or weighting.
    fn priority(&self) -> i32;

    /// Score one transaction
    fn evaluate(&self, txn: &Transaction, ctx: &EvaluationContext) -> RuleResult;
}

/// Build the built-in rule set in evaluation order:
/// amount, velocity, geolocation, pattern, time, merchant.
pub fn default_rules(
    config: &FraudConfig,
    geofence: Arc<GeofenceChecker>,
    analyzer: Arc<PatternAnalyzer>,
) -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(AmountRule::new(config.max_single_amount)),
        Box::new(VelocityRule::new(config.velocity_window(), config.max_daily_amount)),
        Box::new(GeolocationRule::new(geofence)),
        Box::new(PatternRule::new(analyzer)),
        Box::new(TimeRule::new()),
        Box::new(MerchantRule::new()),
    ]
}

#[cfg(test)]
pub(crate) mod testutil {
    use crate::types::{Merchant, Transaction};
    use chrono::{DateTime, FixedOffset, TimeZone, Timelike, Utc};
    use rust_decimal::Decimal;
    use uuid::Uuid;

    /// Card transaction at a US grocery merchant, created now
    pub fn txn(amount: Decimal) -> Transaction {
        Transaction {
            id: Uuid::new_v4(),
            amount,
            currency: "USD".to_string(),
            source_account_id: "ACC001".to_string(),
            destination_account_id: None,
            merchant: Some(merchant("m-grocer", "Corner Grocer", "5411", "US")),
            category: "groceries".to_string(),
            created_at: Utc::now().fixed_offset(),
        }
    }

    pub fn merchant(id: &str, name: &str, mcc: &str, country: &str) -> Merchant {
        Merchant {
            id: id.to_string(),
            name: name.to_string(),
            mcc: mcc.to_string(),
            country: country.to_string(),
        }
    }

    /// Current instant, in an offset where the local hour is midday
    pub fn daytime_now() -> DateTime<FixedOffset> {
        let now = Utc::now();
        let shift = 12 - now.hour() as i32;
        now.with_timezone(&FixedOffset::east_opt(shift * 3600).unwrap())
    }

    /// Fixed local time at UTC+0 on 2024-03-04
    pub fn at_hour(hour: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 3, 4, hour, 30, 0)
            .unwrap()
    }
}
