//! Test waker utilities for polling futures by hand.
//!
//! Provides [`noop_waker`] and [`counting_waker`] for host-side tests that
//! step a future without an executor.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Wake, Waker};

/// Creates a [`Waker`] that does nothing when woken.
pub fn noop_waker() -> Waker {
    Waker::noop().clone()
}

/// Wake counter shared between a [`counting_waker`] and the test.
#[derive(Debug, Default)]
pub struct WakeCounter {
    wakes: AtomicUsize,
}

impl WakeCounter {
    /// Returns how many times the waker has been woken.
    pub fn count(&self) -> usize {
        self.wakes.load(Ordering::SeqCst)
    }
}

impl Wake for WakeCounter {
    fn wake(self: Arc<Self>) {
        self.wake_by_ref();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.wakes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Creates a [`Waker`] that increments a counter each time it is woken.
///
/// Returns the waker and the shared [`WakeCounter`].
pub fn counting_waker() -> (Waker, Arc<WakeCounter>) {
    let counter = Arc::new(WakeCounter::default());
    (Waker::from(Arc::clone(&counter)), counter)
}
