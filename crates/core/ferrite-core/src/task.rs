//! Blocking sync-async bridge.
//!
//! Provides [`block_on`] for driving a future to completion from code that
//! is not running on an executor, such as a power-management framework
//! thread that calls a phase entry point synchronously.
//!
//! Unlike a poll-in-a-loop bridge, the future is only re-polled after its
//! waker fires. With the `std` feature the calling thread parks between
//! wakeups; without it, the thread spins on the wake flag.

use alloc::sync::Arc;
use alloc::task::Wake;
use core::future::Future;
use core::pin::pin;
use core::sync::atomic::{AtomicBool, Ordering};
use core::task::{Context, Poll, Waker};

/// Wake flag shared between [`block_on`] and the future's waker.
struct Signal {
    woken: AtomicBool,
    #[cfg(any(test, feature = "std"))]
    thread: std::thread::Thread,
}

impl Signal {
    fn new() -> Self {
        Self {
            woken: AtomicBool::new(false),
            #[cfg(any(test, feature = "std"))]
            thread: std::thread::current(),
        }
    }

    /// Waits until the waker has fired at least once since the last call.
    fn wait(&self) {
        while !self.woken.swap(false, Ordering::Acquire) {
            #[cfg(any(test, feature = "std"))]
            std::thread::park();
            #[cfg(not(any(test, feature = "std")))]
            core::hint::spin_loop();
        }
    }
}

impl Wake for Signal {
    fn wake(self: Arc<Self>) {
        self.wake_by_ref();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.woken.store(true, Ordering::Release);
        #[cfg(any(test, feature = "std"))]
        self.thread.unpark();
    }
}

/// Polls `future` to completion on the current thread.
///
/// # Warning
///
/// Blocks the caller. Never call this from inside an executor task: the
/// task's own executor would stall until the future resolves.
pub fn block_on<T>(future: impl Future<Output = T>) -> T {
    let signal = Arc::new(Signal::new());
    let waker = Waker::from(Arc::clone(&signal));
    let mut cx = Context::from_waker(&waker);
    let mut future = pin!(future);
    loop {
        match future.as_mut().poll(&mut cx) {
            Poll::Ready(val) => return val,
            Poll::Pending => signal.wait(),
        }
    }
}
