//! Request coalescing for concurrent cache misses.
//!
//! A [`SingleFlight`] keeps one slot per in-flight key. The first caller for a
//! key becomes the leader and runs the work inline in its own task; every
//! caller that arrives while the slot exists becomes a follower and waits for
//! the leader's result instead of running the work again.
//!
//! Slots live only as long as their leader. Once the leader publishes a value
//! (or is dropped) the slot is removed, so results are never memoized here.
//! Memoization is the job of the cache sitting in front of the flight.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use thiserror::Error;
use tokio::sync::watch;
use tracing::trace;

/// The leader of a flight was dropped before it published a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("in-flight call was abandoned by its leader")]
pub struct Abandoned;

/// Outcome of [`SingleFlight::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flight<T> {
    pub value: T,
    /// `true` when the value was produced by another caller's work.
    pub shared: bool,
}

type Slot<T> = watch::Receiver<Option<T>>;

/// A keyed registry of in-flight calls.
pub struct SingleFlight<T> {
    flights: Mutex<HashMap<String, Slot<T>>>,
}

impl<T> Default for SingleFlight<T> {
    fn default() -> Self {
        Self {
            flights: Mutex::new(HashMap::new()),
        }
    }
}

impl<T> std::fmt::Debug for SingleFlight<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SingleFlight")
            .field("in_flight", &self.flights.lock().len())
            .finish()
    }
}

enum Role<T> {
    Leader(watch::Sender<Option<T>>, Slot<T>),
    Follower(Slot<T>),
}

/// Removes the leader's slot when the leader finishes or is dropped.
struct SlotGuard<'a, T> {
    flights: &'a Mutex<HashMap<String, Slot<T>>>,
    key: &'a str,
    slot: Slot<T>,
}

impl<T> Drop for SlotGuard<'_, T> {
    fn drop(&mut self) {
        let mut flights = self.flights.lock();
        if flights
            .get(self.key)
            .is_some_and(|current| current.same_channel(&self.slot))
        {
            flights.remove(self.key);
        }
    }
}

impl<T: Clone + Send + Sync> SingleFlight<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys that currently have a leader running.
    pub fn in_flight(&self) -> usize {
        self.flights.lock().len()
    }

    /// Runs `work` for `key` unless a call for the same key is already in
    /// flight, in which case the in-flight result is awaited and cloned.
    ///
    /// Followers receive [`Abandoned`] if the leader is dropped before it
    /// produces a value.
    pub async fn run<F, Fut>(&self, key: &str, work: F) -> Result<Flight<T>, Abandoned>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let role = {
            let mut flights = self.flights.lock();
            match flights.get(key) {
                Some(slot) => Role::Follower(slot.clone()),
                None => {
                    let (tx, rx) = watch::channel(None);
                    flights.insert(key.to_owned(), rx.clone());
                    Role::Leader(tx, rx)
                }
            }
        };

        match role {
            Role::Leader(tx, slot) => {
                trace!(key, "Leading flight");
                let _guard = SlotGuard {
                    flights: &self.flights,
                    key,
                    slot,
                };
                let value = work().await;
                tx.send_replace(Some(value.clone()));
                Ok(Flight {
                    value,
                    shared: false,
                })
            }
            Role::Follower(mut slot) => {
                trace!(key, "Joining in-flight call");
                let value = match slot.wait_for(Option::is_some).await {
                    Ok(published) => (*published).clone(),
                    Err(_) => None,
                };
                value
                    .map(|value| Flight {
                        value,
                        shared: true,
                    })
                    .ok_or(Abandoned)
            }
        }
    }
}
