//! Durable alert persistence seam

use crate::types::FraudAlert;
use crate::Result;
use async_trait::async_trait;

/// Durable storage for alerts beyond the detector's in-memory map.
///
/// Called from the alert worker after the in-memory insert. Failures are
/// logged by the worker and not retried.
#[async_trait]
pub trait AlertStore: Send + Sync {
    /// Persist a newly raised alert
    async fn save(&self, alert: &FraudAlert) -> Result<()>;
}
