//! Keyed lanes — one FIFO worker task per key.
//!
//! Jobs submitted under the same key run one at a time in submission order.
//! Different keys run concurrently. A lane's worker is spawned on first use
//! and exits after sitting idle, so quiet conversations cost nothing.

use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender, error::SendError};
use tracing::debug;

/// Processes one job for one key.
pub type LaneHandler<K, J> = Arc<dyn Fn(K, J) -> BoxFuture<'static, ()> + Send + Sync>;

struct Inner<K, J> {
    senders: Mutex<HashMap<K, UnboundedSender<J>>>,
    handler: LaneHandler<K, J>,
    idle_timeout: Duration,
}

impl<K: Eq + Hash, J> Inner<K, J> {
    fn senders(&self) -> MutexGuard<'_, HashMap<K, UnboundedSender<J>>> {
        self.senders.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Per-key serializer.
pub struct Lanes<K, J> {
    inner: Arc<Inner<K, J>>,
}

impl<K, J> Clone for Lanes<K, J> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, J> Lanes<K, J>
where
    K: Clone + Eq + Hash + Display + Send + Sync + 'static,
    J: Send + 'static,
{
    pub fn new(idle_timeout: Duration, handler: LaneHandler<K, J>) -> Self {
        Self {
            inner: Arc::new(Inner {
                senders: Mutex::new(HashMap::new()),
                handler,
                idle_timeout,
            }),
        }
    }

    /// Queue `job` behind everything already submitted for `key`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(&self, key: K, job: J) {
        let mut senders = self.inner.senders();

        let job = match senders.get(&key) {
            Some(tx) => match tx.send(job) {
                Ok(()) => return,
                // Worker died mid-job; start a fresh one.
                Err(SendError(job)) => job,
            },
            None => job,
        };

        let (tx, rx) = mpsc::unbounded_channel();
        // The receiver is alive until the worker below drops it.
        let _ = tx.send(job);
        senders.insert(key.clone(), tx);
        drop(senders);

        debug!(lane = %key, "Lane started");
        tokio::spawn(run_lane(Arc::clone(&self.inner), key, rx));
    }

    /// Number of lanes with a live worker.
    pub fn active(&self) -> usize {
        self.inner.senders().len()
    }
}

async fn run_lane<K, J>(inner: Arc<Inner<K, J>>, key: K, mut rx: UnboundedReceiver<J>)
where
    K: Clone + Eq + Hash + Display + Send + Sync + 'static,
    J: Send + 'static,
{
    loop {
        let job = match tokio::time::timeout(inner.idle_timeout, rx.recv()).await {
            Ok(Some(job)) => job,
            Ok(None) => break,
            Err(_) => match take_or_retire(&inner, &key, &mut rx) {
                Some(job) => job,
                None => break,
            },
        };
        (inner.handler)(key.clone(), job).await;
    }
}

/// Under the map lock, either pick up a job that raced the idle timer or
/// unregister the lane. Holding the lock makes the two outcomes exclusive
/// with `submit`, so no job is stranded in a dead channel.
fn take_or_retire<K, J>(inner: &Inner<K, J>, key: &K, rx: &mut UnboundedReceiver<J>) -> Option<J>
where
    K: Eq + Hash + Display,
{
    let mut senders = inner.senders();
    match rx.try_recv() {
        Ok(job) => Some(job),
        Err(_) => {
            senders.remove(key);
            debug!(lane = %key, "Lane idle, retired");
            None
        }
    }
}
