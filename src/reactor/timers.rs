use std::{collections::BTreeMap, task::Waker, time::Instant};

/// Identifies a registered timer. The sequence number keeps keys unique even
/// when two timers share a deadline, so removing a key that already fired is
/// always harmless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct TimerKey {
    deadline: Instant,
    seq: u64,
}

pub(crate) struct TimerQueue {
    timers: BTreeMap<TimerKey, Waker>,
    next_seq: u64,
}

impl TimerQueue {
    pub const fn new() -> Self {
        Self {
            timers: BTreeMap::new(),
            next_seq: 0,
        }
    }

    pub fn insert(&mut self, deadline: Instant, waker: Waker) -> TimerKey {
        let key = TimerKey {
            deadline,
            seq: self.next_seq,
        };

        self.next_seq += 1;
        self.timers.insert(key, waker);

        key
    }

    pub fn update_waker(&mut self, key: TimerKey, waker: &Waker) {
        if let Some(w) = self.timers.get_mut(&key) {
            if !w.will_wake(waker) {
                *w = waker.clone();
            }
        }
    }

    pub fn remove(&mut self, key: TimerKey) -> bool {
        self.timers.remove(&key).is_some()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.first_key_value().map(|(k, _)| k.deadline)
    }

    /// Remove every timer whose deadline is at or before `now`, returning
    /// their wakers in deadline order.
    pub fn expire(&mut self, now: Instant) -> Vec<Waker> {
        let mut fired = Vec::new();

        while let Some(entry) = self.timers.first_entry() {
            if entry.key().deadline > now {
                break;
            }

            fired.push(entry.remove());
        }

        fired
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.timers.len()
    }
}
