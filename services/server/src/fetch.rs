//! Request coalescing for remote fetches.
//!
//! At most one fetch per key is outstanding at any time. The first caller for
//! a key becomes the leader and runs the fetch; callers that arrive while it
//! is running attach as followers and receive a clone of the leader's result.
//! Once the result is broadcast the registration is dropped, so nothing is
//! remembered: a later call for the same key starts a new fetch, whether the
//! previous one succeeded or failed.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::{watch, Semaphore};
use tracing::{debug, warn};
use wxviewer_object_store::ObjectStoreError;

/// Errors shared between the leader of a fetch and its followers.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// The object does not exist.
    #[error("object not found: {0}")]
    NotFound(String),

    /// The object store failed.
    #[error("object store error: {0}")]
    Store(#[source] Arc<ObjectStoreError>),

    /// The fetch did not complete within the configured deadline.
    #[error("fetch timed out after {0:?}")]
    Timeout(Duration),

    /// The leader went away before producing a result.
    #[error("fetch abandoned before completion")]
    Abandoned,
}

impl From<ObjectStoreError> for FetchError {
    fn from(err: ObjectStoreError) -> Self {
        match err {
            ObjectStoreError::NotFound(key) => FetchError::NotFound(key),
            other => FetchError::Store(Arc::new(other)),
        }
    }
}

/// Fetch coordinator configuration.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Deadline for one fetch. `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Maximum number of leaders fetching at once. `None` is unbounded.
    pub max_concurrent: Option<usize>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(30)),
            max_concurrent: None,
        }
    }
}

type Shared<V> = Option<Result<V, FetchError>>;

/// Removes a leader's registration when dropped, including on cancellation.
struct Registration<'a, K: Eq + Hash, V> {
    in_flight: &'a Mutex<HashMap<K, watch::Receiver<Shared<V>>>>,
    key: K,
}

impl<K: Eq + Hash, V> Drop for Registration<'_, K, V> {
    fn drop(&mut self) {
        self.in_flight.lock().remove(&self.key);
    }
}

enum Role<V> {
    Leader(watch::Sender<Shared<V>>),
    Follower(watch::Receiver<Shared<V>>),
}

/// Keyed registry of in-flight fetches.
pub struct FetchCoordinator<K, V> {
    in_flight: Mutex<HashMap<K, watch::Receiver<Shared<V>>>>,
    timeout: Option<Duration>,
    permits: Option<Semaphore>,
}

impl<K, V> FetchCoordinator<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Display,
    V: Clone,
{
    pub fn new(config: FetchConfig) -> Self {
        Self {
            in_flight: Mutex::new(HashMap::new()),
            timeout: config.timeout,
            permits: config.max_concurrent.map(|n| Semaphore::new(n.max(1))),
        }
    }

    /// Runs `fetch` for `key` unless a fetch for it is already outstanding,
    /// in which case waits for that one instead. `fetch` is only invoked by
    /// the leader.
    pub async fn ensure_fetch<F, Fut>(&self, key: K, fetch: F) -> Result<V, FetchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, FetchError>>,
    {
        let role = {
            let mut in_flight = self.in_flight.lock();
            match in_flight.get(&key) {
                Some(rx) => Role::Follower(rx.clone()),
                None => {
                    let (tx, rx) = watch::channel(None);
                    in_flight.insert(key.clone(), rx);
                    Role::Leader(tx)
                }
            }
        };

        match role {
            Role::Follower(mut rx) => {
                debug!(key = %key, "Joining in-flight fetch");
                match rx.wait_for(Option::is_some).await {
                    Ok(shared) => shared.clone().unwrap_or(Err(FetchError::Abandoned)),
                    Err(_) => {
                        warn!(key = %key, "In-flight fetch was abandoned");
                        Err(FetchError::Abandoned)
                    }
                }
            }
            Role::Leader(tx) => {
                let registration = Registration {
                    in_flight: &self.in_flight,
                    key,
                };

                let result = self.run(fetch).await;
                if let Err(e) = &result {
                    debug!(key = %registration.key, error = %e, "Fetch failed");
                }

                tx.send_replace(Some(result.clone()));
                drop(registration);
                result
            }
        }
    }

    async fn run<F, Fut>(&self, fetch: F) -> Result<V, FetchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, FetchError>>,
    {
        let _permit = match &self.permits {
            Some(permits) => Some(
                permits
                    .acquire()
                    .await
                    .map_err(|_| FetchError::Abandoned)?,
            ),
            None => None,
        };

        match self.timeout {
            Some(deadline) => tokio::time::timeout(deadline, fetch())
                .await
                .map_err(|_| FetchError::Timeout(deadline))?,
            None => fetch().await,
        }
    }

    /// Number of keys with a fetch outstanding.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().len()
    }
}
