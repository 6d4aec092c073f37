//! Per-client serialization of the quota check.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use interalpha_types::ClientId;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Map size above which idle entries are dropped.
const PRUNE_THRESHOLD: usize = 1024;

/// One async mutex per client id.
///
/// Issuance holds the guard across "sweep, count, insert", so two requests
/// for the same client cannot both pass the quota check. Requests for
/// different clients never contend.
#[derive(Debug, Default)]
pub(crate) struct ClientLocks {
    locks: Mutex<HashMap<ClientId, Arc<AsyncMutex<()>>>>,
}

impl ClientLocks {
    pub(crate) async fn lock(&self, client_id: &ClientId) -> OwnedMutexGuard<()> {
        let lock = {
            // The map is never left half-updated, so a poisoned lock is still usable.
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            if locks.len() >= PRUNE_THRESHOLD {
                // Only the map holds an idle entry.
                locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            }
            Arc::clone(locks.entry(client_id.clone()).or_default())
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_client_is_serialized() {
        let locks = Arc::new(ClientLocks::default());
        let client = ClientId::new("c-1");

        let guard = locks.lock(&client).await;

        let waiter = {
            let locks = Arc::clone(&locks);
            let client = client.clone();
            tokio::spawn(async move {
                let _guard = locks.lock(&client).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn different_clients_do_not_contend() {
        let locks = ClientLocks::default();
        let _a = locks.lock(&ClientId::new("a")).await;
        let _b = locks.lock(&ClientId::new("b")).await;
        assert_eq!(locks.len(), 2);
    }
}
