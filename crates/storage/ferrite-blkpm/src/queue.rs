//! Request-queue ledger and the drain/restart adapter around it.
//!
//! [`RequestQueue`] tracks how many requests a device has in flight and
//! whether new submissions are accepted. Normal I/O calls
//! [`submit`](RequestQueue::submit) and [`complete`](RequestQueue::complete);
//! the dispatcher brackets driver hooks with the adapter operations:
//!
//! - stop side: [`begin_drain`](RequestQueue::begin_drain), hook,
//!   [`post_suspend`](RequestQueue::post_suspend)
//! - start side: [`begin_restart`](RequestQueue::begin_restart), hook,
//!   [`end_restart`](RequestQueue::end_restart)
//!
//! Submission checks the accept flag and bumps the in-flight count under
//! the state lock, so once [`begin_drain`](RequestQueue::begin_drain) has
//! set the reject flag the count can only go down.

use core::fmt;
use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll};

use ferrite_core::kwarn;
use ferrite_core::sync::loom_compat::{AtomicUsize, Ordering};
use ferrite_core::sync::{SpinLock, WaitQueue};

use crate::error::PmError;
use crate::runtime::RpmStatus;

bitflags::bitflags! {
    /// Queue-level state flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct QueueFlags: u32 {
        /// Only power-management traffic is allowed; new I/O is rejected.
        const PM_ONLY = 1 << 0;
        /// The queue has been torn down and will never accept I/O again.
        const DYING   = 1 << 1;
    }
}

/// Why a submission was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitError {
    /// The queue is quiesced for a power transition.
    Quiesced,
    /// The queue has been torn down.
    Dying,
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Quiesced => f.write_str("queue quiesced for power transition"),
            Self::Dying => f.write_str("queue is dying"),
        }
    }
}

struct QueueState {
    flags: QueueFlags,
    status: RpmStatus,
}

/// One device's pending-request ledger.
pub struct RequestQueue {
    in_flight: AtomicUsize,
    state: SpinLock<QueueState>,
    drain_waiters: WaitQueue,
}

impl RequestQueue {
    /// Creates an empty, accepting queue.
    pub fn new() -> Self {
        Self {
            in_flight: AtomicUsize::new(0),
            state: SpinLock::named("request-queue", QueueState {
                flags: QueueFlags::empty(),
                status: RpmStatus::Active,
            }),
            drain_waiters: WaitQueue::new(),
        }
    }

    // -----------------------------------------------------------------------
    // I/O side
    // -----------------------------------------------------------------------

    /// Accounts one new in-flight request.
    ///
    /// # Errors
    ///
    /// Fails with [`SubmitError::Quiesced`] while a power transition holds
    /// the queue, or [`SubmitError::Dying`] after [`kill`](Self::kill).
    pub fn submit(&self) -> Result<(), SubmitError> {
        let state = self.state.lock();
        if state.flags.contains(QueueFlags::DYING) {
            return Err(SubmitError::Dying);
        }
        if state.flags.contains(QueueFlags::PM_ONLY) {
            return Err(SubmitError::Quiesced);
        }
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    /// Retires one in-flight request and wakes drainers once the queue is
    /// empty.
    pub fn complete(&self) {
        let prev = self
            .in_flight
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
        match prev {
            Ok(1) => self.drain_waiters.wake_all(),
            Ok(_) => {}
            Err(_) => kwarn!("blkpm: completion with no request in flight"),
        }
    }

    /// Returns the number of requests in flight.
    pub fn pending_count(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Returns `true` if new submissions are accepted.
    pub fn is_accepting(&self) -> bool {
        !self
            .state
            .lock()
            .flags
            .intersects(QueueFlags::PM_ONLY | QueueFlags::DYING)
    }

    /// Returns the current queue flags.
    pub fn flags(&self) -> QueueFlags {
        self.state.lock().flags
    }

    /// Returns the queue-level power marker.
    pub fn status(&self) -> RpmStatus {
        self.state.lock().status
    }

    // -----------------------------------------------------------------------
    // Queue primitives
    // -----------------------------------------------------------------------

    /// Starts rejecting new submissions and marks the queue suspending.
    pub fn block_submissions(&self) {
        let mut state = self.state.lock();
        state.flags.insert(QueueFlags::PM_ONLY);
        state.status = RpmStatus::Suspending;
    }

    /// Returns a future that resolves once no request is in flight.
    ///
    /// Does not block submissions by itself; see
    /// [`begin_drain`](Self::begin_drain).
    pub fn drain(&self) -> Drain<'_> {
        Drain {
            queue: self,
            reopen_on_drop: false,
        }
    }

    /// Clears the suspended marker ahead of a resume hook.
    pub fn reset_quiesce_markers(&self) {
        self.state.lock().status = RpmStatus::Resuming;
    }

    /// Accepts submissions again and marks the queue active.
    ///
    /// A dying queue stays closed.
    pub fn reenable_submissions(&self) {
        let mut state = self.state.lock();
        state.flags.remove(QueueFlags::PM_ONLY);
        state.status = RpmStatus::Active;
    }

    /// Tears the queue down for good and releases every drainer.
    pub fn kill(&self) {
        self.state.lock().flags.insert(QueueFlags::DYING | QueueFlags::PM_ONLY);
        self.drain_waiters.wake_all();
    }

    // -----------------------------------------------------------------------
    // Adapter operations used by the dispatcher
    // -----------------------------------------------------------------------

    /// Blocks new submissions, then waits for in-flight requests to finish.
    ///
    /// The reject flag is set before this returns, so it is in force even
    /// if the returned future is polled later. The future yields between
    /// completions and has no timeout. Dropping it before it resolves
    /// reopens the queue.
    pub fn begin_drain(&self) -> Drain<'_> {
        self.block_submissions();
        Drain {
            queue: self,
            reopen_on_drop: true,
        }
    }

    /// Records the outcome of the suspend hook that ran after a drain.
    ///
    /// Success leaves the queue suspended and still rejecting. Failure puts
    /// it back to active and accepting. Returns `outcome` unchanged.
    ///
    /// # Errors
    ///
    /// Passes through the hook's error.
    pub fn post_suspend(&self, outcome: Result<(), PmError>) -> Result<(), PmError> {
        if outcome.is_ok() {
            self.state.lock().status = RpmStatus::Suspended;
        } else {
            self.reenable_submissions();
        }
        outcome
    }

    /// Prepares the queue for a resume hook.
    pub fn begin_restart(&self) {
        self.reset_quiesce_markers();
    }

    /// Re-enables submissions after a resume hook, whatever its outcome.
    ///
    /// Returns `outcome` unchanged so the caller can report it.
    ///
    /// # Errors
    ///
    /// Passes through the hook's error.
    pub fn end_restart(&self, outcome: Result<(), PmError>) -> Result<(), PmError> {
        self.reenable_submissions();
        outcome
    }

    fn drain_outcome(&self) -> Option<Result<(), PmError>> {
        if self.flags().contains(QueueFlags::DYING) {
            return Some(Err(PmError::QueueDrain));
        }
        (self.pending_count() == 0).then_some(Ok(()))
    }
}

impl Default for RequestQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RequestQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("RequestQueue")
            .field("in_flight", &self.pending_count())
            .field("flags", &state.flags)
            .field("status", &state.status)
            .finish()
    }
}

/// Future returned by [`RequestQueue::drain`] and
/// [`RequestQueue::begin_drain`].
///
/// A drain started with [`begin_drain`](RequestQueue::begin_drain) that is
/// dropped before it resolves re-enables submissions, so a caller that
/// gives up on a suspend (a timeout around the phase call) leaves the
/// device usable.
#[must_use = "a drain does nothing unless awaited"]
pub struct Drain<'a> {
    queue: &'a RequestQueue,
    reopen_on_drop: bool,
}

impl Drain<'_> {
    fn settle(&mut self, outcome: Result<(), PmError>) -> Poll<Result<(), PmError>> {
        self.reopen_on_drop = false;
        Poll::Ready(outcome)
    }
}

impl Future for Drain<'_> {
    type Output = Result<(), PmError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        if let Some(outcome) = this.queue.drain_outcome() {
            return this.settle(outcome);
        }

        // Register before the re-check so the last completion cannot slip
        // between the two.
        this.queue.drain_waiters.register(cx.waker());

        match this.queue.drain_outcome() {
            Some(outcome) => this.settle(outcome),
            None => Poll::Pending,
        }
    }
}

impl Drop for Drain<'_> {
    fn drop(&mut self) {
        if self.reopen_on_drop {
            kwarn!(
                "blkpm: drain abandoned with {} request(s) in flight, reopening queue",
                self.queue.pending_count()
            );
            self.queue.reenable_submissions();
        }
    }
}


#[cfg(all(test, loom))]
mod loom_tests {
    use super::*;
    use loom::sync::Arc;
    use loom::thread;

    #[test]
    fn last_completion_is_never_missed() {
        loom::model(|| {
            let q = Arc::new(RequestQueue::new());
            q.submit().unwrap();
            q.submit().unwrap();

            let handles: Vec<_> = (0..2)
                .map(|_| {
                    let q = Arc::clone(&q);
                    thread::spawn(move || q.complete())
                })
                .collect();

            assert_eq!(loom::future::block_on(q.begin_drain()), Ok(()));
            assert_eq!(q.pending_count(), 0);

            for h in handles {
                h.join().unwrap();
            }
        });
    }
}
