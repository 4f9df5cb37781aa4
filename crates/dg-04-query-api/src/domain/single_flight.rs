//! Request coalescing: concurrent calls under one key share one execution.

use std::future::Future;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};

type SharedCall<T> = Shared<BoxFuture<'static, T>>;

pub struct SingleFlight<T: Clone> {
    calls: DashMap<String, SharedCall<T>>,
}

impl<T> SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            calls: DashMap::new(),
        }
    }

    /// Run `call` unless one is already in flight for `key`, in which case
    /// wait for that one instead. The flag is true for callers that shared
    /// another caller's result.
    pub async fn run<F>(&self, key: &str, call: F) -> (T, bool)
    where
        F: Future<Output = T> + Send + 'static,
    {
        let (flight, leader) = match self.calls.entry(key.to_string()) {
            Entry::Occupied(entry) => (entry.get().clone(), None),
            Entry::Vacant(entry) => {
                let flight = call.boxed().shared();
                entry.insert(flight.clone());
                (
                    flight,
                    Some(Leader {
                        calls: &self.calls,
                        key,
                    }),
                )
            }
        };

        let shared = leader.is_none();
        let output = flight.await;
        drop(leader);
        (output, shared)
    }

    pub fn in_flight(&self) -> usize {
        self.calls.len()
    }
}

impl<T> Default for SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Forgets the call when the leading caller finishes or is dropped.
struct Leader<'a, T: Clone> {
    calls: &'a DashMap<String, SharedCall<T>>,
    key: &'a str,
}

impl<T: Clone> Drop for Leader<'_, T> {
    fn drop(&mut self) {
        self.calls.remove(self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_concurrent_calls_share_one_execution() {
        let flight = Arc::new(SingleFlight::<u64>::new());
        let executions = Arc::new(AtomicUsize::new(0));
        let (release, gate) = tokio::sync::oneshot::channel::<()>();

        let leader = {
            let flight = flight.clone();
            let executions = executions.clone();
            tokio::spawn(async move {
                flight
                    .run("/token/CA1", async move {
                        executions.fetch_add(1, Ordering::SeqCst);
                        let _ = gate.await;
                        7
                    })
                    .await
            })
        };

        while flight.in_flight() == 0 {
            tokio::task::yield_now().await;
        }

        let follower = {
            let flight = flight.clone();
            let executions = executions.clone();
            tokio::spawn(async move {
                flight
                    .run("/token/CA1", async move {
                        executions.fetch_add(1, Ordering::SeqCst);
                        0
                    })
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        release.send(()).unwrap();

        assert_eq!(leader.await.unwrap(), (7, false));
        assert_eq!(follower.await.unwrap(), (7, true));
        assert_eq!(executions.load(Ordering::SeqCst), 1);
        assert_eq!(flight.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_sequential_calls_run_again() {
        let flight = SingleFlight::<u64>::new();
        assert_eq!(flight.run("k", async { 1 }).await, (1, false));
        assert_eq!(flight.run("k", async { 2 }).await, (2, false));
    }

    #[tokio::test]
    async fn test_dropped_leader_forgets_call() {
        let flight = SingleFlight::<u64>::new();
        let mut pending = Box::pin(flight.run("k", futures::future::pending::<u64>()));
        assert!(futures::poll!(pending.as_mut()).is_pending());
        assert_eq!(flight.in_flight(), 1);

        drop(pending);
        assert_eq!(flight.in_flight(), 0);
    }
}
