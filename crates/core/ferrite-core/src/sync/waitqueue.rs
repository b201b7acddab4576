//! Heap-backed wait queue with unbounded capacity.
//!
//! [`WaitQueue`] stores [`Waker`]s from tasks waiting for an event. The
//! producer side (a request completion, a probe finishing) calls
//! [`wake_one`](WaitQueue::wake_one) or [`wake_all`](WaitQueue::wake_all).
//!
//! Waiters register and then re-check their predicate before returning
//! `Poll::Pending`, so a wake issued between the check and the
//! registration is never lost.

use alloc::collections::VecDeque;
use core::task::Waker;

use super::SpinLock;

/// A queue of [`Waker`]s waiting for an event.
///
/// Uses `VecDeque` so that `wake_one()` is O(1) FIFO.
pub struct WaitQueue {
    waiters: SpinLock<VecDeque<Waker>>,
}

impl WaitQueue {
    /// Creates an empty wait queue.
    pub const fn new() -> Self {
        Self {
            waiters: SpinLock::named("waitqueue", VecDeque::new()),
        }
    }

    /// Registers a waker to be woken by the next [`wake_one`](Self::wake_one)
    /// or [`wake_all`](Self::wake_all).
    ///
    /// A waker that would wake the same task as one already queued replaces
    /// nothing and is skipped, so repeated polls do not grow the queue.
    pub fn register(&self, waker: &Waker) {
        let mut waiters = self.waiters.lock();
        if !waiters.iter().any(|w| w.will_wake(waker)) {
            waiters.push_back(waker.clone());
        }
    }

    /// Returns the number of registered waiters.
    pub fn len(&self) -> usize {
        self.waiters.lock().len()
    }

    /// Returns `true` if nobody is waiting.
    pub fn is_empty(&self) -> bool {
        self.waiters.lock().is_empty()
    }

    /// Wakes one waiting task (FIFO order, O(1)).
    pub fn wake_one(&self) {
        let waker = self.waiters.lock().pop_front();
        if let Some(w) = waker {
            w.wake();
        }
    }

    /// Wakes all waiting tasks.
    ///
    /// Wakers are drained under the lock and woken outside it.
    pub fn wake_all(&self) {
        let drained = core::mem::take(&mut *self.waiters.lock());
        for w in drained {
            w.wake();
        }
    }
}

impl Default for WaitQueue {
    fn default() -> Self {
        Self::new()
    }
}
