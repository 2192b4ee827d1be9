//! Timer queue and the wait-duration suspension point.
//!
//! [`TimerQueue`] orders pending wake-ups by wake time. The driver loop extracts due
//! entries one at a time and resumes them; [`sleep`] is how a task body puts itself
//! into the queue.

use crate::runtime::context;
use crate::task::TaskState;

use log::trace;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

/// Min-ordered collection of `(wake time, handle)` entries.
///
/// Entries sharing a wake time come out in insertion order. Entries are only ever
/// removed by extraction; there is no cancellation.
///
/// # Example
/// ```
/// use cadence::TimerQueue;
/// use std::time::Duration;
///
/// let mut timers = TimerQueue::new();
/// timers.insert(Duration::from_secs(2), "late");
/// timers.insert(Duration::from_secs(1), "early");
///
/// assert_eq!(timers.extract_if_due(Duration::ZERO), None);
/// assert_eq!(timers.extract_if_due(Duration::from_secs(5)), Some("early"));
/// ```
pub struct TimerQueue<H> {
    heap: BinaryHeap<Reverse<TimerEntry<H>>>,
    next_seq: u64,
}

struct TimerEntry<H> {
    wake_time: Duration,
    seq: u64,
    handle: H,
}

impl<H> TimerEntry<H> {
    fn sort_key(&self) -> (Duration, u64) {
        (self.wake_time, self.seq)
    }
}

impl<H> PartialEq for TimerEntry<H> {
    fn eq(&self, other: &Self) -> bool {
        self.sort_key() == other.sort_key()
    }
}

impl<H> Eq for TimerEntry<H> {}

impl<H> PartialOrd for TimerEntry<H> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<H> Ord for TimerEntry<H> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl<H> TimerQueue<H> {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    /// Adds an entry. A wake time in the past is simply due on the next extraction.
    pub fn insert(&mut self, wake_time: Duration, handle: H) {
        let seq = self.next_seq;
        self.next_seq += 1;

        self.heap.push(Reverse(TimerEntry {
            wake_time,
            seq,
            handle,
        }));
    }

    /// Earliest entry without removing it.
    pub fn peek_earliest(&self) -> Option<(Duration, &H)> {
        self.heap
            .peek()
            .map(|Reverse(entry)| (entry.wake_time, &entry.handle))
    }

    /// Removes and returns the earliest handle if its wake time is `<= now`.
    pub fn extract_if_due(&mut self, now: Duration) -> Option<H> {
        let due = self
            .heap
            .peek()
            .is_some_and(|Reverse(entry)| entry.wake_time <= now);

        if !due {
            return None;
        }

        self.heap.pop().map(|Reverse(entry)| entry.handle)
    }

    /// Number of entries waiting to be extracted.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Returns `true` if no entry is pending.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

impl<H> Default for TimerQueue<H> {
    fn default() -> Self {
        Self::new()
    }
}

/// Future returned by [`sleep`].
///
/// The wake time is computed on first poll, from the runtime's clock, and saturates at
/// [`Duration::MAX`]. The first poll always suspends, even for a zero duration; a poll
/// before the wake time keeps waiting on the entry already queued.
#[derive(Debug)]
#[must_use = "sleep does nothing unless awaited"]
pub struct Sleep {
    duration: Duration,
    wake_time: Option<Duration>,
}

impl Sleep {
    /// Creates a sleep of `duration`, measured from its first poll.
    ///
    /// # Arguments
    /// * `duration` - How long to stay suspended
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            wake_time: None,
        }
    }
}

impl Future for Sleep {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let shared = context::current().expect("sleep() polled outside of a runtime context");

        if let Some(wake_time) = self.wake_time {
            if shared.clock.now() >= wake_time {
                return Poll::Ready(());
            }

            shared.note_suspension(TaskState::SuspendedOnTimer);
            return Poll::Pending;
        }

        let wake_time = shared.clock.now().saturating_add(self.duration);

        trace!("timer registered for {:?}", wake_time);
        shared
            .timers
            .borrow_mut()
            .insert(wake_time, cx.waker().clone());
        shared.note_suspension(TaskState::SuspendedOnTimer);

        self.wake_time = Some(wake_time);
        Poll::Pending
    }
}

/// Suspends the current task for `duration`.
///
/// Must be awaited inside a task body started on a [`Runtime`](crate::Runtime).
///
/// # Example
/// ```ignore
/// use cadence::sleep;
/// use std::time::Duration;
///
/// async {
///     sleep(Duration::from_millis(100)).await;
///     println!("Woke up after 100ms");
/// };
/// ```
pub fn sleep(duration: Duration) -> Sleep {
    Sleep::new(duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn extracts_in_wake_time_order() {
        let mut timers = TimerQueue::new();
        timers.insert(secs(3), 3);
        timers.insert(secs(1), 1);
        timers.insert(secs(2), 2);

        let order: Vec<_> = std::iter::from_fn(|| timers.extract_if_due(secs(10))).collect();
        assert_eq!(order, vec![1, 2, 3]);
        assert!(timers.is_empty());
    }

    #[test]
    fn equal_wake_times_keep_insertion_order() {
        let mut timers = TimerQueue::new();
        for name in ["a", "b", "c"] {
            timers.insert(secs(1), name);
        }

        assert_eq!(timers.extract_if_due(secs(1)), Some("a"));
        assert_eq!(timers.extract_if_due(secs(1)), Some("b"));
        assert_eq!(timers.extract_if_due(secs(1)), Some("c"));
    }

    #[test]
    fn not_due_leaves_queue_untouched() {
        let mut timers = TimerQueue::new();
        timers.insert(secs(5), "x");

        assert_eq!(timers.extract_if_due(secs(4)), None);
        assert_eq!(timers.len(), 1);
        assert_eq!(timers.peek_earliest(), Some((secs(5), &"x")));
    }

    #[test]
    fn dropping_queue_drops_remaining_entries() {
        use std::rc::Rc;

        let handle = Rc::new(());
        let mut timers = TimerQueue::new();
        timers.insert(secs(1), Rc::clone(&handle));
        timers.insert(secs(2), Rc::clone(&handle));
        assert_eq!(Rc::strong_count(&handle), 3);

        drop(timers);

        assert_eq!(Rc::strong_count(&handle), 1);
    }

    #[test]
    fn maximal_wake_time_is_ordered_last() {
        let mut timers = TimerQueue::new();
        timers.insert(Duration::MAX, "never");
        timers.insert(secs(1), "soon");

        assert_eq!(timers.extract_if_due(secs(1)), Some("soon"));
        assert_eq!(timers.extract_if_due(secs(1_000_000)), None);
        assert_eq!(timers.extract_if_due(Duration::MAX), Some("never"));
    }

    #[test]
    fn past_wake_time_is_due_immediately() {
        let mut timers = TimerQueue::new();
        timers.insert(Duration::ZERO, "now");

        assert_eq!(timers.extract_if_due(secs(7)), Some("now"));
        assert_eq!(timers.peek_earliest(), None);
    }
}
