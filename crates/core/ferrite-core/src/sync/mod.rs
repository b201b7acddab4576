//! Synchronization primitives.
//!
//! Provides [`SpinLock`] for short critical sections and [`WaitQueue`] for
//! parking [`Waker`](core::task::Waker)s until an event (a queue draining,
//! a probe domain going idle) happens.

mod spinlock;
mod waitqueue;

pub mod loom_compat;

#[cfg(any(test, feature = "std"))]
pub mod test_waker;

pub use spinlock::{SpinLock, SpinLockGuard};
pub use waitqueue::WaitQueue;
