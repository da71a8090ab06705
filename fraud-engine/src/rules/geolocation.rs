//! Location-based checks: high-risk countries, unusual locations and
//! impossible travel

use super::Rule;
use crate::geofence::GeofenceChecker;
use crate::types::{EvaluationContext, FraudIndicator, FraudType, RuleResult, Transaction};
use chrono::Duration;
use std::sync::Arc;

const HIGH_RISK_SCORE: f64 = 2.5;
const UNUSUAL_LOCATION_SCORE: f64 = 1.5;
const IMPOSSIBLE_TRAVEL_SCORE: f64 = 4.0;

/// Minimum plausible gap between transactions in different countries
const MIN_TRAVEL_HOURS: i64 = 2;

/// Geolocation rule backed by the geofence lists
pub struct GeolocationRule {
    geofence: Arc<GeofenceChecker>,
}

impl GeolocationRule {
    /// Create with a shared geofence checker
    pub fn new(geofence: Arc<GeofenceChecker>) -> Self {
        Self { geofence }
    }
}

/// Country the transaction originates from: the resolved geolocation,
/// else the merchant's country
fn current_country<'a>(txn: &'a Transaction, ctx: &'a EvaluationContext) -> Option<&'a str> {
    ctx.geo_location
        .as_ref()
        .map(|g| g.country.as_str())
        .filter(|c| !c.is_empty())
        .or_else(|| txn.merchant_country())
        .filter(|c| !c.is_empty())
}

impl Rule for GeolocationRule {
    fn name(&self) -> &str {
        "geolocation"
    }

    fn priority(&self) -> i32 {
        30
    }

    fn evaluate(&self, txn: &Transaction, ctx: &EvaluationContext) -> RuleResult {
        let mut result = RuleResult::default();
        let country = current_country(txn, ctx);

        if let Some(country) = country {
            if self.geofence.is_high_risk_country(country) {
                result.record(
                    FraudIndicator::new(
                        FraudType::GeoAnomaly,
                        format!("Transaction from high-risk country {}", country),
                        HIGH_RISK_SCORE,
                    )
                    .with_detail("country", country),
                    true,
                );
            }
        }

        if let Some(profile) = &ctx.account_profile {
            if !profile.typical_locations.is_empty() {
                let city = ctx.geo_location.as_ref().map(|g| g.city.as_str()).unwrap_or("");
                let known = profile.typical_locations.iter().any(|loc| {
                    (!city.is_empty() && loc.eq_ignore_ascii_case(city))
                        || country.is_some_and(|c| loc.eq_ignore_ascii_case(c))
                });

                if !known {
                    result.record(
                        FraudIndicator::new(
                            FraudType::GeoAnomaly,
                            "Transaction from unusual location",
                            UNUSUAL_LOCATION_SCORE,
                        )
                        .with_detail("city", city)
                        .with_detail("country", country.unwrap_or("")),
                        true,
                    );
                }
            }
        }

        let previous = ctx.account_history.as_ref().and_then(|h| h.first());
        if let (Some(previous), Some(country)) = (previous, country) {
            if let Some(previous_country) = previous.merchant_country() {
                let gap = txn.created_at_utc() - previous.created_at_utc();
                let moved = !previous_country.eq_ignore_ascii_case(country);
                let too_fast =
                    gap.num_seconds().abs() < Duration::hours(MIN_TRAVEL_HOURS).num_seconds();

                if moved && too_fast {
                    result.record(
                        FraudIndicator::new(
                            FraudType::ImpossibleTravel,
                            "Impossible travel detected",
                            IMPOSSIBLE_TRAVEL_SCORE,
                        )
                        .with_detail("from_country", previous_country)
                        .with_detail("to_country", country)
                        .with_detail("minutes_between", gap.num_minutes()),
                        true,
                    );
                }
            }
        }

        if result.triggered {
            result.description = "Suspicious transaction location".to_string();
        }
        result
    }
}
