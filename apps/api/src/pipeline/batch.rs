//! Batch fan-out with per-item error isolation.
//!
//! All items of a batch run concurrently on a `JoinSet` and the batch always
//! settles every item: one failure is recorded against its own id and never
//! aborts the siblings.

use std::fmt::Display;
use std::future::Future;

use serde::Serialize;
use tokio::task::JoinSet;
use uuid::Uuid;

/// One failed item of a settled batch.
#[derive(Debug, Clone, Serialize)]
pub struct BatchItemError {
    pub id: Uuid,
    pub error: String,
}

/// Everything a batch produced, successes and failures side by side.
#[derive(Debug)]
pub struct SettledBatch<T> {
    pub succeeded: Vec<(Uuid, T)>,
    pub errors: Vec<BatchItemError>,
}

impl<T> SettledBatch<T> {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.errors.len()
    }
}

/// Runs `op` over every item concurrently and waits for all of them.
///
/// Completion order is arbitrary. A panicking task is recorded as a failure
/// of its item rather than tearing the batch down.
pub async fn settle_all<I, T, E, F, Fut>(items: Vec<(Uuid, I)>, op: F) -> SettledBatch<T>
where
    I: Send + 'static,
    T: Send + 'static,
    E: Display + Send + 'static,
    F: Fn(Uuid, I) -> Fut + Clone + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    let mut tasks = JoinSet::new();
    for (id, item) in items {
        let op = op.clone();
        tasks.spawn(async move { (id, op(id, item).await.map_err(|e| e.to_string())) });
    }

    let mut succeeded = Vec::new();
    let mut errors = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((id, Ok(value))) => succeeded.push((id, value)),
            Ok((id, Err(error))) => errors.push(BatchItemError { id, error }),
            Err(join_error) => {
                // The task identity is lost on panic; surface it with a nil id
                // so the batch report still accounts for every item.
                errors.push(BatchItemError {
                    id: Uuid::nil(),
                    error: format!("task aborted: {join_error}"),
                });
            }
        }
    }

    SettledBatch { succeeded, errors }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_all_items_succeed() {
        let items: Vec<(Uuid, u32)> = (0..5).map(|n| (Uuid::new_v4(), n)).collect();
        let batch = settle_all(items, |_, n| async move { Ok::<_, String>(n * 2) }).await;

        assert_eq!(batch.succeeded.len(), 5);
        assert!(batch.errors.is_empty());
        assert_eq!(batch.total(), 5);
    }

    #[tokio::test]
    async fn test_one_failure_does_not_abort_siblings() {
        let items: Vec<(Uuid, u32)> = (0..5).map(|n| (Uuid::new_v4(), n)).collect();
        let failing_id = items[2].0;

        let batch = settle_all(items, move |_, n| async move {
            if n == 2 {
                Err("boom".to_string())
            } else {
                Ok(n)
            }
        })
        .await;

        assert_eq!(batch.succeeded.len(), 4);
        assert_eq!(batch.errors.len(), 1);
        assert_eq!(batch.errors[0].id, failing_id);
        assert_eq!(batch.errors[0].error, "boom");
    }

    #[tokio::test]
    async fn test_empty_batch_settles_immediately() {
        let batch =
            settle_all(Vec::<(Uuid, ())>::new(), |_, _| async { Ok::<_, String>(()) }).await;
        assert_eq!(batch.total(), 0);
    }
}
