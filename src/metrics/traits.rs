//! Traits for metrics collection.

use crate::metrics::data::RouterSnapshot;
use async_trait::async_trait;

/// Source of complete metric snapshots.
///
/// Implementations never fail as a whole: a field that cannot be read is
/// reported as [`Reading::Unavailable`](crate::metrics::data::Reading).
#[async_trait]
pub trait MetricsProvider: Send {
    /// Collect a fresh snapshot of every metric.
    async fn collect_snapshot(&mut self) -> RouterSnapshot;
}
