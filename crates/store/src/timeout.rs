//! Deadlines for individual repository calls.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::StoreError;

/// Per-call deadlines applied by the engine's mutators.
#[derive(Debug, Clone)]
pub struct StoreTimeouts {
    /// Deadline for `list`/`get` calls.
    pub list: Duration,
    /// Deadline for `create` calls.
    pub create: Duration,
    /// Deadline for `update`/`delete` calls.
    pub mutation: Duration,
}

impl StoreTimeouts {
    /// The same deadline for every kind of call.
    pub fn uniform(after: Duration) -> Self {
        Self {
            list: after,
            create: after,
            mutation: after,
        }
    }
}

impl Default for StoreTimeouts {
    fn default() -> Self {
        Self::uniform(Duration::from_secs(15))
    }
}

/// Await `fut`, giving up after `after`.
///
/// Expiry only changes what the caller is told: a write already handed to
/// the store is not aborted and may still be applied.
pub async fn with_timeout<T, F>(
    operation: &'static str,
    after: Duration,
    fut: F,
) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(after, fut).await {
        Ok(result) => result,
        Err(_) => {
            warn!("{} did not complete within {:?}", operation, after);
            Err(StoreError::Timeout { operation, after })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn slow_call_surfaces_as_timeout() {
        let result: Result<(), StoreError> = with_timeout("departments.update", Duration::from_millis(50), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok(())
        })
        .await;

        assert_eq!(
            result,
            Err(StoreError::Timeout {
                operation: "departments.update",
                after: Duration::from_millis(50),
            })
        );
    }

    #[tokio::test]
    async fn inner_error_passes_through_unchanged() {
        let result: Result<(), StoreError> = with_timeout("employees.get", Duration::from_secs(1), async {
            Err(StoreError::Backend("unavailable".into()))
        })
        .await;

        assert_eq!(result, Err(StoreError::Backend("unavailable".into())));
    }
}
