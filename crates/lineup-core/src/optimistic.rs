// Optimistic mutation: apply a local change before the backend confirms it,
// roll back if the backend refuses, then reconcile with a fresh fetch.

use std::future::Future;

use tracing::warn;

use crate::store::StoreError;

/// Snapshot taken just before an optimistic change.
#[derive(Debug)]
#[must_use = "an optimistic change must be committed or rolled back"]
pub struct Optimistic<T: Clone> {
    snapshot: T,
}

impl<T: Clone> Optimistic<T> {
    /// Capture `state`, then apply `mutate` to it.
    pub fn apply(state: &mut T, mutate: impl FnOnce(&mut T)) -> Self {
        let snapshot = state.clone();
        mutate(state);
        Optimistic { snapshot }
    }

    /// Restore the captured state.
    pub fn rollback(self, state: &mut T) {
        *state = self.snapshot;
    }

    /// Keep the change.
    pub fn commit(self) {}
}

/// Apply `mutate` to `state`, await `remote`, roll back if it failed, then
/// replace `state` with the result of `refetch` regardless of outcome.
///
/// A failed refetch leaves `state` as it is. The remote result is returned.
pub async fn run_optimistic<T, R, F, Fut>(
    state: &mut T,
    mutate: impl FnOnce(&mut T),
    remote: R,
    refetch: F,
) -> Result<(), StoreError>
where
    T: Clone,
    R: Future<Output = Result<(), StoreError>>,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let change = Optimistic::apply(state, mutate);
    let result = remote.await;
    match &result {
        Ok(()) => change.commit(),
        Err(e) => {
            warn!("Optimistic change rejected, rolling back: {}", e);
            change.rollback(state);
        }
    }

    match refetch().await {
        Ok(fresh) => *state = fresh,
        Err(e) => warn!("Reconcile fetch failed, keeping local state: {}", e),
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejected() -> StoreError {
        StoreError::Status {
            status: 409,
            body: "conflict".into(),
        }
    }

    #[test]
    fn apply_then_rollback_restores() {
        let mut v = vec![1, 2];
        let change = Optimistic::apply(&mut v, |v| v.push(3));
        assert_eq!(v, vec![1, 2, 3]);
        change.rollback(&mut v);
        assert_eq!(v, vec![1, 2]);
    }

    #[tokio::test]
    async fn success_keeps_change_and_reconciles() {
        let mut v = vec![1];
        let result = run_optimistic(
            &mut v,
            |v| v.push(2),
            async { Ok(()) },
            || async { Ok(vec![1, 2, 9]) },
        )
        .await;
        assert!(result.is_ok());
        assert_eq!(v, vec![1, 2, 9]);
    }

    #[tokio::test]
    async fn failure_rolls_back_before_reconcile() {
        let mut v = vec![1];
        let result = run_optimistic(
            &mut v,
            |v| v.push(2),
            async { Err(rejected()) },
            || async { Err(rejected()) },
        )
        .await;
        assert!(result.is_err());
        assert_eq!(v, vec![1]);
    }

    #[tokio::test]
    async fn failed_refetch_keeps_local_state() {
        let mut v = vec![1];
        run_optimistic(
            &mut v,
            |v| v.push(2),
            async { Ok(()) },
            || async { Err(rejected()) },
        )
        .await
        .unwrap();
        assert_eq!(v, vec![1, 2]);
    }
}
