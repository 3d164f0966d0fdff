//! Per-cart mutation locks.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tokio::sync::{Mutex, OwnedMutexGuard};

use bramble_core::CartId;

/// How long an unused lock is kept before it is dropped.
const LOCK_IDLE_TIMEOUT: Duration = Duration::from_secs(600);

/// Registry of one async mutex per cart.
///
/// Every cart mutation and checkout holds the cart's guard, so requests for
/// the same cart run one at a time within this process. Idle entries expire
/// on their own; a lock is only idle when nobody has asked for it recently.
#[derive(Clone)]
pub struct CartLocks {
    locks: Cache<CartId, Arc<Mutex<()>>>,
}

impl Default for CartLocks {
    fn default() -> Self {
        Self::new()
    }
}

impl CartLocks {
    #[must_use]
    pub fn new() -> Self {
        let locks = Cache::builder().time_to_idle(LOCK_IDLE_TIMEOUT).build();
        Self { locks }
    }

    /// Wait for exclusive access to `cart_id`.
    pub async fn acquire(&self, cart_id: CartId) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .get_with(cart_id, async { Arc::new(Mutex::new(())) })
            .await;
        lock.lock_owned().await
    }
}
