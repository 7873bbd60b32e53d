//! Coalesces concurrent identical requests into one physical flight.
//!
//! For any [`Fingerprint`] at most one exchange is in flight at any instant;
//! every logical caller that arrives while it is pending attaches to the same
//! eventual outcome, success or failure. This applies to every verb — two
//! rapid duplicate submissions of the same CREATE body collapse into one
//! exchange, which is what prevents double-taps in the UI from creating a
//! resource twice.
//!
//! The pending entry is removed *before* the outcome is delivered, so a
//! caller arriving after settlement never receives a stale outcome; it starts
//! a brand-new flight. The flight itself runs as a spawned task: a caller
//! that stops waiting locally does not cancel the exchange for the waiters
//! still attached to it.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::broadcast;
use tracing::debug;

use crate::error::ApiError;
use crate::request::Fingerprint;

type Outcome<T> = Result<T, ApiError>;
type PendingTable<T> = HashMap<Fingerprint, broadcast::Sender<Outcome<T>>>;

/// Process-wide table of in-flight requests, shared by every caller of one
/// [`Client`](crate::client::Client).
///
/// `T` is the success type of the shared outcome; it must be `Clone` because
/// a single settlement is fanned out to an unbounded number of waiters.
#[derive(Debug)]
pub struct RequestCoalescer<T> {
    pending: Arc<Mutex<PendingTable<T>>>,
}

impl<T> Default for RequestCoalescer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RequestCoalescer<T> {
    /// Creates a coalescer with an empty pending table.
    pub fn new() -> Self {
        Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn table(pending: &Mutex<PendingTable<T>>) -> MutexGuard<'_, PendingTable<T>> {
        pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Number of fingerprints currently in flight.
    pub fn pending_count(&self) -> usize {
        Self::table(&self.pending).len()
    }
}

impl<T> RequestCoalescer<T>
where
    T: Clone + Send + 'static,
{
    /// Runs `producer` exclusively for `key`, or joins the flight already in
    /// progress.
    ///
    /// The check-and-register step is a single critical section, so two
    /// concurrent callers for the same fingerprint cannot both become the
    /// leader. The leader's `producer` future is spawned as its own task and
    /// its settlement is broadcast to every waiter; no lock is held while the
    /// flight runs.
    pub async fn run_exclusive<F, Fut>(&self, key: &Fingerprint, producer: F) -> Outcome<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Outcome<T>> + Send + 'static,
    {
        let mut rx = {
            let mut pending = Self::table(&self.pending);
            if let Some(tx) = pending.get(key) {
                debug!(fingerprint = %key, "joining in-flight request");
                tx.subscribe()
            } else {
                let (tx, rx) = broadcast::channel(1);
                pending.insert(key.clone(), tx.clone());

                let flight = producer();
                let pending = Arc::clone(&self.pending);
                let key = key.clone();
                tokio::spawn(async move {
                    let outcome = flight.await;
                    // Remove before delivering: a caller arriving after
                    // settlement must start a new flight, never observe this
                    // one.
                    Self::table(&pending).remove(&key);
                    let _ = tx.send(outcome);
                });
                rx
            }
        };

        match rx.recv().await {
            Ok(outcome) => outcome,
            // The flight task died without settling (e.g. a panic in the
            // producer). Surface it as a transport failure rather than
            // hanging every waiter.
            Err(_) => Err(ApiError::transport("in-flight request was aborted")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{RequestDescriptor, Verb};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::time::sleep;

    fn key(endpoint: &str) -> Fingerprint {
        RequestDescriptor::new(Verb::Read, endpoint).fingerprint()
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_share_one_flight() {
        let coalescer: Arc<RequestCoalescer<u32>> = Arc::new(RequestCoalescer::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let fp = key("/topics");

        let mut joins = Vec::new();
        for _ in 0..8 {
            let coalescer = Arc::clone(&coalescer);
            let calls = Arc::clone(&calls);
            let fp = fp.clone();
            joins.push(tokio::spawn(async move {
                coalescer
                    .run_exclusive(&fp, move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        sleep(Duration::from_millis(50)).await;
                        Ok(42u32)
                    })
                    .await
            }));
        }

        let mut outcomes = Vec::new();
        for join in joins {
            outcomes.push(join.await.unwrap());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(outcomes.iter().all(|o| *o == Ok(42)));
    }

    #[tokio::test(start_paused = true)]
    async fn failure_is_shared_by_all_waiters() {
        let coalescer: Arc<RequestCoalescer<u32>> = Arc::new(RequestCoalescer::new());
        let fp = key("/topics");

        let first = {
            let coalescer = Arc::clone(&coalescer);
            let fp = fp.clone();
            tokio::spawn(async move {
                coalescer
                    .run_exclusive(&fp, || async {
                        sleep(Duration::from_millis(20)).await;
                        Err(ApiError::status(500, "boom"))
                    })
                    .await
            })
        };
        // Let the leader register its flight before the waiter arrives.
        tokio::task::yield_now().await;
        let second = {
            let coalescer = Arc::clone(&coalescer);
            let fp = fp.clone();
            tokio::spawn(async move {
                coalescer
                    .run_exclusive(&fp, || async {
                        panic!("second producer must never run");
                    })
                    .await
            })
        };

        let expected = Err(ApiError::status(500, "boom"));
        assert_eq!(first.await.unwrap(), expected);
        assert_eq!(second.await.unwrap(), expected);
    }

    #[tokio::test(start_paused = true)]
    async fn entry_removed_after_settlement() {
        let coalescer: RequestCoalescer<u32> = RequestCoalescer::new();
        let fp = key("/topics");

        let outcome = coalescer.run_exclusive(&fp, || async { Ok(1u32) }).await;
        assert_eq!(outcome, Ok(1));
        assert_eq!(coalescer.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn caller_after_settlement_starts_new_flight() {
        let coalescer: RequestCoalescer<u32> = RequestCoalescer::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let fp = key("/topics");

        for expected in [1u32, 2] {
            let calls = Arc::clone(&calls);
            let outcome = coalescer
                .run_exclusive(&fp, move || async move {
                    Ok(calls.fetch_add(1, Ordering::SeqCst) as u32 + 1)
                })
                .await;
            assert_eq!(outcome, Ok(expected));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn distinct_fingerprints_do_not_coalesce() {
        let coalescer: Arc<RequestCoalescer<u32>> = Arc::new(RequestCoalescer::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let a = RequestDescriptor::new(Verb::Create, "/topics")
            .payload(json!({ "t": "a" }))
            .fingerprint();
        let b = RequestDescriptor::new(Verb::Create, "/topics")
            .payload(json!({ "t": "b" }))
            .fingerprint();

        let run = |fp: Fingerprint| {
            let coalescer = Arc::clone(&coalescer);
            let calls = Arc::clone(&calls);
            tokio::spawn(async move {
                coalescer
                    .run_exclusive(&fp, move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        sleep(Duration::from_millis(10)).await;
                        Ok(0u32)
                    })
                    .await
            })
        };

        let (first, second) = tokio::join!(run(a), run(b));
        first.unwrap().unwrap();
        second.unwrap().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn flight_survives_a_caller_that_stops_waiting() {
        let coalescer: Arc<RequestCoalescer<u32>> = Arc::new(RequestCoalescer::new());
        let fp = key("/topics");

        // Leader gives up immediately; the spawned flight keeps running.
        let leader = {
            let coalescer = Arc::clone(&coalescer);
            let fp = fp.clone();
            tokio::spawn(async move {
                coalescer
                    .run_exclusive(&fp, || async {
                        sleep(Duration::from_millis(50)).await;
                        Ok(7u32)
                    })
                    .await
            })
        };
        tokio::task::yield_now().await;
        leader.abort();

        // A waiter that joined the same flight still gets the outcome.
        let outcome = coalescer
            .run_exclusive(&fp, || async { panic!("must join, not start") })
            .await;
        assert_eq!(outcome, Ok(7));
    }
}
