// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Per-key request collapsing.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;

type Flight<T> = Shared<BoxFuture<'static, T>>;

/// Collapses concurrent loads of the same key into one.
///
/// The first caller for a key starts the work; callers arriving while it is in progress await
/// the same work and share its result. The work belongs to the flight rather than to the caller
/// that started it: dropping that caller leaves the work running for the others. Once every
/// caller waiting on a key is gone, the key's slot is released.
#[derive(Debug)]
pub(crate) struct Flights<T> {
    slots: Mutex<HashMap<String, Weak<Flight<T>>>>,
}

impl<T> Default for Flights<T> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Flights<T> {
    /// Awaits the flight for `key`, starting it with `work` if none is in progress.
    pub(crate) async fn run<F>(&self, key: &str, work: F) -> T
    where
        F: FnOnce() -> BoxFuture<'static, T>,
    {
        let flight = self.join(key, work);
        let _guard = SlotGuard {
            flights: self,
            key,
            flight: &flight,
        };

        Flight::clone(&flight).await
    }

    fn join<F>(&self, key: &str, work: F) -> Arc<Flight<T>>
    where
        F: FnOnce() -> BoxFuture<'static, T>,
    {
        let mut slots = self.slots.lock();
        if let Some(flight) = slots.get(key).and_then(Weak::upgrade) {
            return flight;
        }

        let flight = Arc::new(work().shared());
        slots.insert(key.to_string(), Arc::downgrade(&flight));
        flight
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.slots.lock().len()
    }
}

struct SlotGuard<'a, T: Clone> {
    flights: &'a Flights<T>,
    key: &'a str,
    flight: &'a Arc<Flight<T>>,
}

impl<T: Clone> Drop for SlotGuard<'_, T> {
    fn drop(&mut self) {
        let mut slots = self.flights.slots.lock();
        let Some(slot) = slots.get(self.key) else {
            return;
        };

        // Only the slot this guard joined may be released; a newer flight may have replaced it.
        let ours = std::ptr::eq(slot.as_ptr(), Arc::as_ptr(self.flight));
        if ours && (self.flight.peek().is_some() || Arc::strong_count(self.flight) == 1) {
            slots.remove(self.key);
        }
    }
}
