//! Bounded-retry deletion used by the storage cleanup cascade.

use tokio_util::sync::CancellationToken;

use crate::{ObjectStore, StorageError};

/// Default number of delete attempts per object.
pub const DEFAULT_DELETE_ATTEMPTS: u32 = 3;

/// Delete `key`, retrying immediately on failure up to `max_attempts` times.
///
/// Returns the number of attempts used on success, or the last error once
/// the attempts are exhausted. A cancelled token stops further attempts
/// after the current one fails. `max_attempts` of zero still makes one
/// attempt.
pub async fn delete_with_retry(
    store: &dyn ObjectStore,
    key: &str,
    max_attempts: u32,
    cancel: &CancellationToken,
) -> Result<u32, StorageError> {
    let max_attempts = max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        let err = match store.delete_object(key).await {
            Ok(()) => {
                if attempt > 1 {
                    tracing::info!(key, attempt, "Deleted object after retry");
                }
                return Ok(attempt);
            }
            Err(e) => e,
        };

        if attempt >= max_attempts {
            tracing::warn!(key, attempt, error = %err, "Delete attempts exhausted");
            return Err(err);
        }
        if cancel.is_cancelled() {
            tracing::warn!(key, attempt, error = %err, "Delete cancelled before retry");
            return Err(err);
        }

        tracing::debug!(key, attempt, max_attempts, error = %err, "Delete failed, retrying");
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use assert_matches::assert_matches;

    use super::*;
    use crate::ObjectHead;

    /// Fails the first `failures` delete calls, then succeeds.
    struct FlakyStore {
        failures: u32,
        calls: AtomicU32,
    }

    impl FlakyStore {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl ObjectStore for FlakyStore {
        async fn download_to_file(&self, _: &str, _: &Path) -> Result<(), StorageError> {
            unimplemented!()
        }
        async fn upload_file(&self, _: &str, _: &Path, _: &str) -> Result<(), StorageError> {
            unimplemented!()
        }
        async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.failures {
                Err(StorageError::Service(format!("transient failure {call} for {key}")))
            } else {
                Ok(())
            }
        }
        async fn head_object(&self, _: &str) -> Result<ObjectHead, StorageError> {
            unimplemented!()
        }
        async fn generate_upload_url(
            &self,
            _: &str,
            _: &str,
            _: i64,
            _: Duration,
        ) -> Result<String, StorageError> {
            unimplemented!()
        }
        async fn generate_download_url(
            &self,
            _: &str,
            _: Duration,
        ) -> Result<String, StorageError> {
            unimplemented!()
        }
    }

    #[tokio::test]
    async fn always_failing_delete_uses_every_attempt() {
        let store = FlakyStore::new(u32::MAX);
        let result = delete_with_retry(&store, "k", 3, &CancellationToken::new()).await;
        assert_matches!(result, Err(StorageError::Service(msg)) if msg.contains("failure 3"));
        assert_eq!(store.calls(), 3);
    }

    #[tokio::test]
    async fn succeeds_after_k_failures() {
        let store = FlakyStore::new(2);
        let result = delete_with_retry(&store, "k", 5, &CancellationToken::new()).await;
        assert_matches!(result, Ok(3));
        assert_eq!(store.calls(), 3);
    }

    #[tokio::test]
    async fn first_try_success() {
        let store = FlakyStore::new(0);
        assert_matches!(
            delete_with_retry(&store, "k", 3, &CancellationToken::new()).await,
            Ok(1)
        );
        assert_eq!(store.calls(), 1);
    }

    #[tokio::test]
    async fn cancellation_stops_retries() {
        let store = FlakyStore::new(u32::MAX);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = delete_with_retry(&store, "k", 5, &cancel).await;
        assert!(result.is_err());
        assert_eq!(store.calls(), 1);
    }

    #[tokio::test]
    async fn zero_attempts_still_tries_once() {
        let store = FlakyStore::new(0);
        assert_matches!(
            delete_with_retry(&store, "k", 0, &CancellationToken::new()).await,
            Ok(1)
        );
    }
}
