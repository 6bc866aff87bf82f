//! Per-customer pipeline serialization
//!
//! Two webhooks from the same customer can arrive while the first is still
//! being processed; running them concurrently would interleave replies and
//! race on the customer record. Each phone number gets an async lease that
//! the pipeline holds for its whole run, so runs for one customer are
//! strictly ordered while different customers proceed in parallel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Keyed async leases, one per customer phone number
#[derive(Default, Clone)]
pub struct CustomerLocks {
    inner: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl CustomerLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lease for `phone`, waiting if a run is in flight.
    /// The lease is released when the returned guard drops.
    pub async fn acquire(&self, phone: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().expect("lock map poisoned");
            Arc::clone(
                map.entry(phone.to_string())
                    .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
            )
        };
        lock.lock_owned().await
    }
}
