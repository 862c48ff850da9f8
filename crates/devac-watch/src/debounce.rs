//! A generic per-key debouncer: collapses a burst of `touch` calls into a
//! single `drain_ready` entry once `delay` has passed with no further
//! activity for that key (spec §4.8's per-path and workspace-level
//! debounce windows are both instances of this).

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

pub struct Debouncer<K> {
    delay: Duration,
    deadlines: HashMap<K, Instant>,
}

impl<K: Eq + Hash + Clone> Debouncer<K> {
    pub fn new(delay: Duration) -> Self {
        Self { delay, deadlines: HashMap::new() }
    }

    /// Records activity for `key`, resetting its quiet-period deadline.
    pub fn touch(&mut self, key: K) {
        self.deadlines.insert(key, Instant::now() + self.delay);
    }

    /// The earliest pending deadline, used to size the next wait.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.values().min().copied()
    }

    /// Removes and returns every key whose quiet period has elapsed.
    pub fn drain_ready(&mut self) -> Vec<K> {
        let now = Instant::now();
        let ready: Vec<K> =
            self.deadlines.iter().filter(|(_, deadline)| **deadline <= now).map(|(k, _)| k.clone()).collect();
        for key in &ready {
            self.deadlines.remove(key);
        }
        ready
    }

    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }

    /// Discards all pending deadlines without flushing (spec §4.8
    /// "Cancellation": "drains pending events with timers discarded").
    pub fn clear(&mut self) {
        self.deadlines.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_touch_postpones_the_deadline() {
        let mut debouncer = Debouncer::new(Duration::from_millis(50));
        debouncer.touch("a");
        assert!(debouncer.drain_ready().is_empty());
        std::thread::sleep(Duration::from_millis(30));
        debouncer.touch("a");
        std::thread::sleep(Duration::from_millis(30));
        // 60ms since the last touch < the original 80ms window would have
        // elapsed, but only 30ms have passed since the second touch.
        assert!(debouncer.drain_ready().is_empty());
    }

    #[test]
    fn drains_only_once_the_quiet_period_elapses() {
        let mut debouncer = Debouncer::new(Duration::from_millis(20));
        debouncer.touch("a");
        debouncer.touch("b");
        std::thread::sleep(Duration::from_millis(40));
        let mut ready = debouncer.drain_ready();
        ready.sort();
        assert_eq!(ready, vec!["a", "b"]);
        assert!(debouncer.is_empty());
    }

    #[test]
    fn clear_discards_without_draining() {
        let mut debouncer = Debouncer::new(Duration::from_millis(1));
        debouncer.touch("a");
        debouncer.clear();
        std::thread::sleep(Duration::from_millis(5));
        assert!(debouncer.drain_ready().is_empty());
    }
}
