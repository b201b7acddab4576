//! The runtime-PM framework contract.
//!
//! The framework owns one power record per bus node: the cached
//! [`RpmStatus`], a usage count, the idle timer and the deferred work that
//! carries out asynchronous requests. The coordinator only reaches it
//! through [`RuntimePm`].

use core::fmt;

use crate::error::PmError;

/// Cached runtime power state of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpmStatus {
    /// Powered and usable.
    Active,
    /// A suspend transition is running.
    Suspending,
    /// Powered down.
    Suspended,
    /// A resume transition is running.
    Resuming,
}

impl fmt::Display for RpmStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Active => "active",
            Self::Suspending => "suspending",
            Self::Suspended => "suspended",
            Self::Resuming => "resuming",
        })
    }
}

/// Per-node handle on the runtime-PM framework.
///
/// Implemented by the framework glue. Every method is a short call: the
/// asynchronous requests only queue work, and [`get_sync`](Self::get_sync)
/// is the one method allowed to block while an in-flight transition
/// settles.
pub trait RuntimePm: Send + Sync {
    /// Returns the cached power state.
    fn get_cached_state(&self) -> RpmStatus;

    /// Overwrites the cached power state.
    ///
    /// This is a privileged override of a value the framework normally
    /// owns. The coordinator only calls it with tracking disabled, from the
    /// two post-transition sites in the dispatcher.
    fn force_state(&self, state: RpmStatus);

    /// Stops runtime-PM bookkeeping for this node.
    fn disable_tracking(&self);

    /// Resumes runtime-PM bookkeeping for this node.
    fn enable_tracking(&self);

    /// Queues an asynchronous runtime resume. Returns without waiting.
    fn request_async_resume(&self) -> Result<(), PmError>;

    /// Queues a runtime suspend after the node's autosuspend delay.
    fn request_autosuspend(&self) -> Result<(), PmError>;

    /// Runs a plain runtime suspend now.
    fn request_suspend(&self) -> Result<(), PmError>;

    /// Records that the node was just busy, restarting its idle timer.
    fn mark_last_busy(&self);

    /// Takes a usage reference and resumes the node synchronously.
    ///
    /// The reference is taken even when the resume fails; the caller must
    /// drop it with [`put_sync`](Self::put_sync).
    fn get_sync(&self) -> Result<(), PmError>;

    /// Drops a usage reference, running the idle check synchronously.
    fn put_sync(&self);

    /// Returns `true` if the cached state is [`RpmStatus::Suspended`].
    fn is_suspended(&self) -> bool {
        self.get_cached_state() == RpmStatus::Suspended
    }
}
