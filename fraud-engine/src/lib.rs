//! Fraud Engine
//!
//! Real-time fraud risk evaluation for payment transactions.
//!
//! Each transaction runs through a fixed set of rules (amount, velocity,
//! geolocation, pattern, time, merchant). Triggered rule scores are summed,
//! normalized into `[0, 1]` and mapped to Allow, Review or Block. Review and
//! Block raise a [`FraudAlert`] which a background worker stores for later
//! inspection and resolution.
//!
//! ```no_run
//! use fraud_engine::{Detector, EvaluationContext, FraudConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run(txn: fraud_engine::Transaction) -> fraud_engine::Result<()> {
//! let detector = Detector::new(FraudConfig::default())?;
//! detector.start(CancellationToken::new())?;
//!
//! let result = detector.evaluate(&txn, &EvaluationContext::default()).await;
//! println!("{} {:.2}", result.decision.as_str(), result.risk_score);
//!
//! detector.shutdown().await;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod detector;
pub mod error;
pub mod geofence;
pub mod metrics;
pub mod pattern;
pub mod rules;
pub mod scoring;
pub mod store;
pub mod types;
pub mod velocity;

pub use config::FraudConfig;
pub use detector::Detector;
pub use error::{Error, Result};
pub use geofence::GeofenceChecker;
pub use metrics::Metrics;
pub use pattern::{AccountPattern, PatternAnalyzer};
pub use rules::Rule;
pub use store::AlertStore;
pub use types::*;
pub use velocity::{TransactionRecord, VelocityTracker};
