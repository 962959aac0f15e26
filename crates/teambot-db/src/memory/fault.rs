//! Failure injection shared by the in-memory repositories

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use teambot_core::error::DomainError;

/// Switches that make a memory store behave like a degraded database
#[derive(Debug, Default)]
pub(crate) struct Faults {
    unavailable: AtomicBool,
    latency_ms: AtomicU64,
}

impl Faults {
    pub(crate) fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub(crate) fn set_latency(&self, latency: Duration) {
        let millis = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self.latency_ms.store(millis, Ordering::SeqCst);
    }

    /// Apply configured latency, then fail if the store is marked unavailable
    pub(crate) async fn check(&self) -> Result<(), DomainError> {
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DomainError::StoreUnavailable(
                "memory store marked unavailable".to_string(),
            ));
        }
        Ok(())
    }
}
