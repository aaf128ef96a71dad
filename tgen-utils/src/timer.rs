//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::time::Duration;

use tokio::time::Instant;

// Heap size below which stale entries are never compacted.
const COMPACT_MIN_LEN: usize = 64;

/// Handle identifying a timer scheduled in a [`TimerQueue`].
///
/// Handles are never reused, so a handle kept after its timer fired or was
/// cancelled can't accidentally refer to a newer timer.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct TimerId(u64);

/// A single-threaded timer service.
///
/// Timers are `(deadline, kind)` entries kept in a min-heap. Cancelling or
/// rescheduling a timer leaves its previous heap entry behind; such stale
/// entries are recognized by their arming sequence number and skipped when
/// popped. The heap is rebuilt once stale entries outnumber the active
/// timers.
#[derive(Debug)]
pub struct TimerQueue<T> {
    heap: BinaryHeap<Reverse<(Instant, u64, TimerId)>>,
    timers: HashMap<TimerId, TimerEntry<T>>,
    next_id: u64,
    next_seq: u64,
}

#[derive(Debug)]
struct TimerEntry<T> {
    kind: T,
    deadline: Instant,
    interval: Option<Duration>,
    seq: u64,
}

// ===== impl TimerQueue =====

impl<T: Clone> TimerQueue<T> {
    /// Schedules a one-shot timer firing at `deadline`.
    pub fn schedule(&mut self, deadline: Instant, kind: T) -> TimerId {
        self.insert(deadline, None, kind)
    }

    /// Schedules a one-shot timer firing `delay` after `now`.
    pub fn schedule_after(
        &mut self,
        now: Instant,
        delay: Duration,
        kind: T,
    ) -> TimerId {
        self.insert(now + delay, None, kind)
    }

    /// Schedules a periodic timer. The first expiration happens `interval`
    /// after `now`.
    pub fn schedule_interval(
        &mut self,
        now: Instant,
        interval: Duration,
        kind: T,
    ) -> TimerId {
        self.insert(now + interval, Some(interval), kind)
    }

    /// Moves the deadline of an active timer. Periodic timers keep their
    /// interval for subsequent expirations.
    ///
    /// Returns `false` if the timer is no longer active.
    pub fn reschedule(&mut self, id: TimerId, deadline: Instant) -> bool {
        let seq = self.next_seq;
        let Some(entry) = self.timers.get_mut(&id) else {
            return false;
        };
        self.next_seq += 1;
        entry.deadline = deadline;
        entry.seq = seq;
        self.heap.push(Reverse((deadline, seq, id)));
        self.compact();
        true
    }

    /// Cancels a timer.
    ///
    /// Returns `false` if the timer had already fired or been cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let removed = self.timers.remove(&id).is_some();
        if removed {
            self.compact();
        }
        removed
    }

    /// Returns whether the given timer is still scheduled.
    pub fn is_active(&self, id: TimerId) -> bool {
        self.timers.contains_key(&id)
    }

    /// Returns the time remaining until the given timer fires.
    pub fn remaining(&self, id: TimerId, now: Instant) -> Option<Duration> {
        self.timers
            .get(&id)
            .map(|entry| entry.deadline.saturating_duration_since(now))
    }

    /// Returns the deadline of the earliest active timer.
    pub fn next_deadline(&mut self) -> Option<Instant> {
        self.discard_stale();
        self.heap.peek().map(|Reverse((deadline, _, _))| *deadline)
    }

    /// Pops the next timer that expired at or before `now`.
    ///
    /// One-shot timers are removed. Periodic timers are re-armed relative
    /// to their previous deadline.
    pub fn pop_expired(&mut self, now: Instant) -> Option<(TimerId, T)> {
        self.discard_stale();
        let Reverse((deadline, _, id)) = *self.heap.peek()?;
        if deadline > now {
            return None;
        }
        self.heap.pop();

        let entry = self.timers.get(&id)?;
        let (kind, interval) = (entry.kind.clone(), entry.interval);
        match interval {
            Some(interval) => {
                self.reschedule(id, deadline + interval);
            }
            None => {
                self.timers.remove(&id);
            }
        }
        Some((id, kind))
    }

    /// Returns the number of active timers.
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    /// Returns whether no timer is active.
    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    fn insert(
        &mut self,
        deadline: Instant,
        interval: Option<Duration>,
        kind: T,
    ) -> TimerId {
        let id = TimerId(self.next_id);
        let seq = self.next_seq;
        self.next_id += 1;
        self.next_seq += 1;
        self.timers.insert(
            id,
            TimerEntry {
                kind,
                deadline,
                interval,
                seq,
            },
        );
        self.heap.push(Reverse((deadline, seq, id)));
        id
    }

    // Drops heap entries belonging to cancelled or rescheduled timers.
    fn discard_stale(&mut self) {
        while let Some(Reverse((_, seq, id))) = self.heap.peek() {
            match self.timers.get(id) {
                Some(entry) if entry.seq == *seq => break,
                _ => {
                    self.heap.pop();
                }
            }
        }
    }

    // Drops all stale heap entries when they make up more than half of the
    // heap.
    fn compact(&mut self) {
        if self.heap.len() <= COMPACT_MIN_LEN
            || self.heap.len() <= 2 * self.timers.len()
        {
            return;
        }

        let timers = &self.timers;
        self.heap.retain(|Reverse((_, seq, id))| {
            timers.get(id).is_some_and(|entry| entry.seq == *seq)
        });
    }
}

impl<T> Default for TimerQueue<T> {
    fn default() -> TimerQueue<T> {
        TimerQueue {
            heap: Default::default(),
            timers: Default::default(),
            next_id: 0,
            next_seq: 0,
        }
    }
}

// ===== unit tests =====
