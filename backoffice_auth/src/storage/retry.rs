use std::future::Future;
use std::time::Duration;

use super::errors::StorageError;

const RETRY_BACKOFF: Duration = Duration::from_millis(50);

/// Run a read against the relational store, retrying once after a short backoff when the
/// first attempt fails with a transient error.
pub(crate) async fn retry_transient<T, F, Fut>(op: F) -> Result<T, StorageError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, StorageError>>,
{
    match op().await {
        Err(e) if e.is_transient() => {
            tracing::warn!(error = %e, "Transient storage failure, retrying once");
            tokio::time::sleep(RETRY_BACKOFF).await;
            op().await
        }
        other => other,
    }
}
