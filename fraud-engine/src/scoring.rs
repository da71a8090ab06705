//! Score normalization, decisions and severity tiers

use crate::types::{Decision, Severity};

/// Aggregate score that maps to a risk of 1.0
pub const MAX_RAW_SCORE: f64 = 10.0;

/// Share of the block threshold at which review starts
pub const REVIEW_FACTOR: f64 = 0.7;

/// Map an unbounded aggregate score onto [0, 1].
///
/// Linear clamp: non-positive scores are 0, scores of 10 or more are 1.
/// Applied once to the summed score, never per rule.
pub fn normalize_score(score: f64) -> f64 {
    if score.is_nan() || score <= 0.0 {
        0.0
    } else if score >= MAX_RAW_SCORE {
        1.0
    } else {
        score / MAX_RAW_SCORE
    }
}

/// Decide on a normalized risk score
pub fn decide(risk_score: f64, threshold: f64) -> Decision {
    if risk_score >= threshold {
        Decision::Block
    } else if risk_score >= threshold * REVIEW_FACTOR {
        Decision::Review
    } else {
        Decision::Allow
    }
}

/// Severity tier for a normalized risk score
pub fn severity_for_score(risk_score: f64) -> Severity {
    if risk_score >= 0.9 {
        Severity::Critical
    } else if risk_score >= 0.7 {
        Severity::High
    } else if risk_score >= 0.5 {
        Severity::Medium
    } else {
        Severity::Low
    }
}
