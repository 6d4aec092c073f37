//! Collaborator seams: key persistence and client lookup.
//!
//! Both are implemented outside this crate (a database, an HTTP directory).
//! [`crate::memory`] provides in-process versions for tests and the CLI.
//!
//! Methods return `Send` futures so components can run on a multi-threaded
//! runtime and be spawned.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use interalpha_crypto::KeyHash;
use interalpha_types::{ClientId, KeyId};

use crate::error::StoreError;
use crate::model::{Client, ClientKeyData, DeactivationReason, KeyMetadata};

/// Persistence for access-key records.
///
/// Lookups by hash are exact. "Active" queries take `now` and return only
/// records that are active and not expired at that instant; "expired"
/// queries return records that are still active but past expiry.
pub trait KeyStore: Send + Sync + 'static {
    /// Inserts a new record. Fails with [`StoreError::Duplicate`] if the id
    /// or hash already exists.
    fn create(
        &self,
        record: ClientKeyData,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn find_by_id(
        &self,
        id: KeyId,
    ) -> impl Future<Output = Result<Option<ClientKeyData>, StoreError>> + Send;

    fn find_by_hash(
        &self,
        hash: &KeyHash,
    ) -> impl Future<Output = Result<Option<ClientKeyData>, StoreError>> + Send;

    fn count_active_by_client(
        &self,
        client_id: &ClientId,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<usize, StoreError>> + Send;

    fn find_active_by_client(
        &self,
        client_id: &ClientId,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<ClientKeyData>, StoreError>> + Send;

    fn find_expired_by_client(
        &self,
        client_id: &ClientId,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<ClientKeyData>, StoreError>> + Send;

    /// Store-wide expired-but-active records, oldest expiry first.
    fn find_expired(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<ClientKeyData>, StoreError>> + Send;

    /// Live records whose expiry falls in `(now, until]`.
    fn find_expiring_between(
        &self,
        now: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<ClientKeyData>, StoreError>> + Send;

    /// Sets `active = false`. Idempotent: returns whether the record changed.
    fn deactivate(
        &self,
        id: KeyId,
        reason: DeactivationReason,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Atomically increments `usage_count` and sets `last_used_at`, only if
    /// the record is still active. Fields set in `session` overwrite the
    /// stored metadata. Returns the updated record, or `None`.
    fn record_usage(
        &self,
        id: KeyId,
        at: DateTime<Utc>,
        session: Option<KeyMetadata>,
    ) -> impl Future<Output = Result<Option<ClientKeyData>, StoreError>> + Send;
}

/// Lookup of client identity and contact preferences.
pub trait ClientDirectory: Send + Sync + 'static {
    fn find(
        &self,
        id: &ClientId,
    ) -> impl Future<Output = Result<Option<Client>, StoreError>> + Send;
}

/// Runs a collaborator call with an upper bound on its latency.
pub(crate) async fn bounded<T, F>(
    operation: &'static str,
    after: Duration,
    call: F,
) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(after, call).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout { operation, after }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn bounded_turns_a_stall_into_timeout() {
        let stalled = async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, StoreError>(1)
        };
        let err = bounded("find_by_hash", Duration::from_secs(2), stalled)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::Timeout {
                operation: "find_by_hash",
                after: Duration::from_secs(2),
            }
        );
    }

    #[tokio::test]
    async fn bounded_passes_results_through() {
        let ok = bounded("count", Duration::from_secs(1), async { Ok(3) }).await;
        assert_eq!(ok, Ok(3));

        let failed: Result<(), _> = bounded("count", Duration::from_secs(1), async {
            Err(StoreError::Unavailable("down".to_string()))
        })
        .await;
        assert!(matches!(failed, Err(StoreError::Unavailable(_))));
    }
}
