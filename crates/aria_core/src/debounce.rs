//! Keyed, cancellable delays
//!
//! A [`Debouncer`] holds at most one pending action per key. Scheduling under
//! a key that already has a pending action cancels the earlier one, so a burst
//! of `schedule` calls within the delay window produces exactly one firing:
//! the last.
//!
//! The debouncer does not own a clock. The host passes the current time to
//! [`Debouncer::schedule`] and collects due actions with [`Debouncer::poll`].
//!
//! ```rust
//! use std::time::Duration;
//! use aria_core::debounce::Debouncer;
//!
//! let mut debouncer = Debouncer::new();
//! debouncer.schedule("blur", 1, 0, Duration::from_millis(200));
//! debouncer.schedule("blur", 2, 50, Duration::from_millis(200));
//!
//! assert!(debouncer.poll(200).is_empty());
//! assert_eq!(debouncer.poll(250), vec![("blur", 2)]);
//! ```

use std::hash::Hash;
use std::time::Duration;

use rustc_hash::FxHashMap;

use crate::events::Timestamp;

/// Default delay for focus-loss checks
pub const DEFAULT_COLLAPSE_DEBOUNCE: Duration = Duration::from_millis(200);

struct Pending<A> {
    deadline: Timestamp,
    sequence: u64,
    action: A,
}

/// At-most-one-pending-action-per-key delay queue
pub struct Debouncer<K, A> {
    pending: FxHashMap<K, Pending<A>>,
    sequence: u64,
}

impl<K, A> std::fmt::Debug for Debouncer<K, A>
where
    K: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debouncer")
            .field("pending", &self.pending.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<K: Eq + Hash + Clone, A> Default for Debouncer<K, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash + Clone, A> Debouncer<K, A> {
    pub fn new() -> Self {
        Self {
            pending: FxHashMap::default(),
            sequence: 0,
        }
    }

    /// Schedule `action` under `key` to fire `delay` after `now`.
    ///
    /// Returns the action that was cancelled, if one was pending.
    pub fn schedule(&mut self, key: K, action: A, now: Timestamp, delay: Duration) -> Option<A> {
        let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.sequence += 1;
        let entry = Pending {
            deadline: now.saturating_add(delay_ms),
            sequence: self.sequence,
            action,
        };
        self.pending.insert(key, entry).map(|old| old.action)
    }

    /// Cancel the pending action under `key`
    pub fn cancel(&mut self, key: &K) -> Option<A> {
        self.pending.remove(key).map(|p| p.action)
    }

    /// Cancel every pending action whose key matches. Returns the count.
    pub fn cancel_where(&mut self, mut predicate: impl FnMut(&K) -> bool) -> usize {
        let before = self.pending.len();
        self.pending.retain(|key, _| !predicate(key));
        before - self.pending.len()
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.pending.contains_key(key)
    }

    /// Deadline of the action pending under `key`
    pub fn deadline(&self, key: &K) -> Option<Timestamp> {
        self.pending.get(key).map(|p| p.deadline)
    }

    /// Earliest deadline across all keys
    pub fn next_deadline(&self) -> Option<Timestamp> {
        self.pending.values().map(|p| p.deadline).min()
    }

    /// Remove and return every action due at `now`, earliest first.
    ///
    /// Actions with equal deadlines come out in scheduling order.
    pub fn poll(&mut self, now: Timestamp) -> Vec<(K, A)> {
        let due: Vec<K> = self
            .pending
            .iter()
            .filter(|(_, p)| p.deadline <= now)
            .map(|(k, _)| k.clone())
            .collect();

        let mut fired: Vec<(Timestamp, u64, K, A)> = due
            .into_iter()
            .filter_map(|key| {
                let pending = self.pending.remove(&key)?;
                Some((pending.deadline, pending.sequence, key, pending.action))
            })
            .collect();
        fired.sort_by_key(|(deadline, sequence, _, _)| (*deadline, *sequence));

        fired
            .into_iter()
            .map(|(_, _, key, action)| (key, action))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(200);

    #[test]
    fn test_second_schedule_replaces_first() {
        let mut debouncer = Debouncer::new();
        assert!(debouncer.schedule(1u32, "first", 0, DELAY).is_none());
        assert_eq!(debouncer.schedule(1u32, "second", 100, DELAY), Some("first"));
        assert_eq!(debouncer.len(), 1);

        // The first deadline (200) passes without firing anything
        assert!(debouncer.poll(250).is_empty());
        assert_eq!(debouncer.poll(300), vec![(1, "second")]);
        assert!(debouncer.is_empty());
    }

    #[test]
    fn test_independent_keys() {
        let mut debouncer = Debouncer::new();
        debouncer.schedule("a", 1, 0, Duration::from_millis(300));
        debouncer.schedule("b", 2, 0, Duration::from_millis(100));
        assert_eq!(debouncer.next_deadline(), Some(100));
        assert_eq!(debouncer.poll(1000), vec![("b", 2), ("a", 1)]);
    }

    #[test]
    fn test_cancel() {
        let mut debouncer = Debouncer::new();
        debouncer.schedule(("menu", 1), (), 0, DELAY);
        debouncer.schedule(("menu", 2), (), 0, DELAY);
        debouncer.schedule(("list", 1), (), 0, DELAY);

        assert!(debouncer.cancel(&("list", 1)).is_some());
        assert_eq!(debouncer.cancel_where(|(kind, _)| *kind == "menu"), 2);
        assert!(debouncer.poll(u64::MAX).is_empty());
    }

    #[test]
    fn test_equal_deadlines_keep_schedule_order() {
        let mut debouncer = Debouncer::new();
        for key in 0..5u32 {
            debouncer.schedule(key, key, 10, DELAY);
        }
        let order: Vec<u32> = debouncer.poll(210).into_iter().map(|(_, a)| a).collect();
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
    }
}
