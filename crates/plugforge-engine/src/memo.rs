//! Per-key memoization with at-most-one concurrent computation.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, LockResult, Mutex, MutexGuard, PoisonError};

/// A process-lifetime memo table.
///
/// Each key owns a slot guarded by its own lock: concurrent requests for the
/// same key block behind the first until its computation completes, then all
/// observe the same value. Distinct keys never contend beyond the brief map
/// lookup. A failed computation leaves the slot empty, so an identical later
/// request retries from scratch.
#[derive(Debug)]
pub struct Memo<K, V> {
    slots: Mutex<HashMap<K, Arc<Mutex<Option<V>>>>>,
}

fn recover<'a, T>(result: LockResult<MutexGuard<'a, T>>) -> MutexGuard<'a, T> {
    // A poisoned lock only means another caller panicked mid-computation;
    // the slot content is still either empty or a completed value.
    result.unwrap_or_else(PoisonError::into_inner)
}

impl<K: Eq + Hash + Clone, V: Clone> Memo<K, V> {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Return the memoized value for `key`, computing it with `compute` if absent.
    ///
    /// # Errors
    /// Propagates the error from `compute`; the failure is not cached.
    pub fn get_or_try_init<E>(
        &self,
        key: &K,
        compute: impl FnOnce() -> Result<V, E>,
    ) -> Result<V, E> {
        let slot = {
            let mut slots = recover(self.slots.lock());
            Arc::clone(slots.entry(key.clone()).or_default())
        };

        let mut guard = recover(slot.lock());
        if let Some(value) = guard.as_ref() {
            return Ok(value.clone());
        }
        let value = compute()?;
        *guard = Some(value.clone());
        Ok(value)
    }

    /// Whether a value has been computed for `key`.
    pub fn contains(&self, key: &K) -> bool {
        let slots = recover(self.slots.lock());
        slots
            .get(key)
            .is_some_and(|slot| recover(slot.lock()).is_some())
    }
}

impl<K: Eq + Hash + Clone, V: Clone> Default for Memo<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use super::*;

    #[test]
    fn computes_once_per_key() {
        let memo: Memo<String, u32> = Memo::new();
        let calls = AtomicUsize::new(0);

        let compute = || -> Result<u32, ()> {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(42)
        };
        assert_eq!(memo.get_or_try_init(&"a".to_owned(), compute).unwrap(), 42);
        assert_eq!(
            memo.get_or_try_init(&"a".to_owned(), || -> Result<u32, ()> {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(99)
            })
            .unwrap(),
            42
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn distinct_keys_compute_separately() {
        let memo: Memo<u32, u32> = Memo::new();
        assert_eq!(
            memo.get_or_try_init(&1, || Ok::<_, ()>(10)).unwrap(),
            10
        );
        assert_eq!(
            memo.get_or_try_init(&2, || Ok::<_, ()>(20)).unwrap(),
            20
        );
    }

    #[test]
    fn failure_is_not_cached() {
        let memo: Memo<u32, u32> = Memo::new();

        let failed: Result<u32, &str> = memo.get_or_try_init(&1, || Err("boom"));
        assert!(failed.is_err());
        assert!(!memo.contains(&1));

        let recovered = memo.get_or_try_init(&1, || Ok::<_, &str>(7)).unwrap();
        assert_eq!(recovered, 7);
        assert!(memo.contains(&1));
    }

    #[test]
    fn concurrent_callers_observe_single_computation() {
        let memo: Arc<Memo<u32, u32>> = Arc::new(Memo::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let memo = Arc::clone(&memo);
                let calls = Arc::clone(&calls);
                thread::spawn(move || {
                    memo.get_or_try_init(&5, || {
                        calls.fetch_add(1, Ordering::SeqCst);
                        // Widen the race window so losers genuinely block.
                        thread::sleep(std::time::Duration::from_millis(20));
                        Ok::<_, ()>(55)
                    })
                    .unwrap()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 55);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
