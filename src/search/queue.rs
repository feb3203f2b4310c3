//! Lock-free dispatch of candidates to workers.
//!
//! The queue hands out `0000`..=`9999` in ascending order through a single
//! atomic cursor. A candidate is claimed exactly once; once the stop signal is
//! raised no further candidate leaves the queue.

use std::sync::atomic::{AtomicU16, Ordering};

use super::candidate::{Candidate, PIN_SPACE};
use super::coordinator::StopSignal;

/// Ascending, single-use stream of candidates shared by all workers.
///
/// A finished queue cannot be rewound; a new run needs a new queue.
#[derive(Debug)]
pub struct WorkQueue {
    cursor: AtomicU16,
    stop: StopSignal,
}

impl WorkQueue {
    /// Creates a queue positioned at `0000` that drains early when `stop`
    /// is raised.
    pub fn new(stop: StopSignal) -> Self {
        Self {
            cursor: AtomicU16::new(0),
            stop,
        }
    }

    /// Claims the next candidate, or `None` once the space is consumed or a
    /// stop was requested. Never blocks.
    pub fn next(&self) -> Option<Candidate> {
        if self.stop.is_raised() {
            return None;
        }

        self.cursor
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| {
                (c < PIN_SPACE).then_some(c + 1)
            })
            .ok()
            .and_then(Candidate::new)
    }

    /// Number of candidates handed out so far.
    pub fn dispatched(&self) -> u16 {
        self.cursor.load(Ordering::Acquire)
    }

    /// Number of candidates never claimed (yet).
    pub fn remaining(&self) -> u16 {
        PIN_SPACE - self.dispatched()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_queue_ascending_and_complete() {
        let queue = WorkQueue::new(StopSignal::new());
        let mut expected = 0u16;
        while let Some(candidate) = queue.next() {
            assert_eq!(candidate.value(), expected);
            expected += 1;
        }
        assert_eq!(expected, PIN_SPACE);
        assert_eq!(queue.remaining(), 0);
        assert!(queue.next().is_none());
    }

    #[test]
    fn test_queue_concurrent_claims_are_unique() {
        let queue = Arc::new(WorkQueue::new(StopSignal::new()));
        let seen = Arc::new(Mutex::new(Vec::new()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let queue = Arc::clone(&queue);
                let seen = Arc::clone(&seen);
                std::thread::spawn(move || {
                    let mut local = Vec::new();
                    while let Some(candidate) = queue.next() {
                        local.push(candidate.value());
                    }
                    seen.lock().expect("lock").extend(local);
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("worker thread");
        }

        let seen = seen.lock().expect("lock");
        assert_eq!(seen.len(), PIN_SPACE as usize);
        let unique: HashSet<_> = seen.iter().copied().collect();
        assert_eq!(unique.len(), PIN_SPACE as usize);
        assert_eq!(unique.iter().max().copied(), Some(PIN_SPACE - 1));
    }

    #[test]
    fn test_queue_stops_dispatching_after_stop() {
        let stop = StopSignal::new();
        let queue = WorkQueue::new(stop.clone());

        for _ in 0..25 {
            assert!(queue.next().is_some());
        }
        stop.raise();

        assert!(queue.next().is_none());
        assert_eq!(queue.dispatched(), 25);
    }

    #[test]
    fn test_queue_stop_races_only_with_in_flight_claims() {
        let stop = StopSignal::new();
        let queue = Arc::new(WorkQueue::new(stop.clone()));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let queue = Arc::clone(&queue);
                std::thread::spawn(move || while queue.next().is_some() {})
            })
            .collect();

        stop.raise();
        let captured = queue.dispatched();
        for handle in handles {
            handle.join().expect("worker thread");
        }

        // Claims already past the stop check may land; nothing after that.
        assert!(queue.dispatched() <= captured.saturating_add(4));
        assert!(queue.next().is_none());
    }
}
