//! Per-key load serialization for a single cache instance.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex as AsyncMutex;

/// Map of canonical key → lock held while that key is being loaded.
#[derive(Debug, Default)]
pub(crate) struct SingleFlight {
    locks: DashMap<String, Arc<AsyncMutex<()>>>,
}

impl SingleFlight {
    /// Joins the flight for `key`, creating its lock on first use.
    pub(crate) fn join(&self, key: &str) -> Flight<'_> {
        let lock = self
            .locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .value()
            .clone();

        Flight {
            lock,
            _member: Member {
                flights: self,
                key: key.to_string(),
            },
        }
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.locks.len()
    }
}

// == Flight ==
/// One caller's membership in a key's flight. Dropping it, including when
/// the owning future is cancelled mid-wait, forgets the key's lock once no
/// other member is left.
pub(crate) struct Flight<'a> {
    // dropped before `_member`, so the count checked there excludes it
    lock: Arc<AsyncMutex<()>>,
    _member: Member<'a>,
}

impl Flight<'_> {
    pub(crate) fn mutex(&self) -> &AsyncMutex<()> {
        &self.lock
    }
}

struct Member<'a> {
    flights: &'a SingleFlight,
    key: String,
}

impl Drop for Member<'_> {
    fn drop(&mut self) {
        // joins clone under the same shard lock, so the count cannot grow here
        self.flights
            .locks
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_same_key_shares_lock() {
        let flights = SingleFlight::default();
        let a = flights.join("k");
        let b = flights.join("k");
        assert!(std::ptr::eq(a.mutex(), b.mutex()));
        assert_eq!(flights.in_flight(), 1);

        let other = flights.join("other");
        assert!(!std::ptr::eq(a.mutex(), other.mutex()));
        assert_eq!(flights.in_flight(), 2);
    }

    #[test]
    fn test_last_member_forgets_key() {
        let flights = SingleFlight::default();
        let a = flights.join("k");
        let b = flights.join("k");

        drop(a);
        assert_eq!(flights.in_flight(), 1);

        drop(b);
        assert_eq!(flights.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_waiter_leaves_nothing_behind() {
        let flights = SingleFlight::default();
        let first = flights.join("k");
        let held = first.mutex().lock().await;

        let mut waiter = Box::pin(async {
            let flight = flights.join("k");
            let _held = flight.mutex().lock().await;
        });
        assert!(tokio::time::timeout(Duration::from_millis(10), &mut waiter)
            .await
            .is_err());

        // the loader finishes while the waiter is still parked
        drop(held);
        drop(first);
        assert_eq!(flights.in_flight(), 1);

        // the waiter is cancelled before it ever runs again
        drop(waiter);
        assert_eq!(flights.in_flight(), 0);
    }
}
