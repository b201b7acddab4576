//! Driver hook table.
//!
//! A driver that wants to take part in power transitions provides a
//! [`PmOps`], usually as a `static`, and binds it to each device it claims
//! with [`StorageDevice::bind`](crate::StorageDevice::bind). Every slot is
//! optional: an empty slot means the phase succeeds with no driver work.
//!
//! ```ignore
//! static SD_PM: PmOps = PmOps {
//!     runtime_suspend: Some(sd_runtime_suspend),
//!     runtime_resume: Some(sd_runtime_resume),
//!     ..PmOps::with_sleep_ops(sd_suspend, sd_resume)
//! };
//! ```

use crate::device::StorageDevice;
use crate::error::DriverError;
use crate::phase::Phase;

/// A driver's phase hook.
pub type PmHook = fn(&StorageDevice) -> Result<(), DriverError>;

/// One optional hook per [`Phase`].
#[derive(Clone, Copy, Default)]
pub struct PmOps {
    /// Hook for [`Phase::Prepare`].
    pub prepare: Option<PmHook>,
    /// Hook for [`Phase::Suspend`].
    pub suspend: Option<PmHook>,
    /// Hook for [`Phase::Resume`].
    pub resume: Option<PmHook>,
    /// Hook for [`Phase::Freeze`].
    pub freeze: Option<PmHook>,
    /// Hook for [`Phase::Thaw`].
    pub thaw: Option<PmHook>,
    /// Hook for [`Phase::Poweroff`].
    pub poweroff: Option<PmHook>,
    /// Hook for [`Phase::Restore`].
    pub restore: Option<PmHook>,
    /// Hook for [`Phase::RuntimeSuspend`].
    pub runtime_suspend: Option<PmHook>,
    /// Hook for [`Phase::RuntimeResume`].
    pub runtime_resume: Option<PmHook>,
    /// Hook for [`Phase::RuntimeIdle`].
    pub runtime_idle: Option<PmHook>,
}

impl PmOps {
    /// A table with every slot empty.
    pub const EMPTY: PmOps = PmOps {
        prepare: None,
        suspend: None,
        resume: None,
        freeze: None,
        thaw: None,
        poweroff: None,
        restore: None,
        runtime_suspend: None,
        runtime_resume: None,
        runtime_idle: None,
    };

    /// Builds a table whose system-sleep and hibernation slots share one
    /// pair of hooks: `suspend` for suspend, freeze and poweroff; `resume`
    /// for resume, thaw and restore.
    pub const fn with_sleep_ops(suspend: PmHook, resume: PmHook) -> Self {
        Self {
            suspend: Some(suspend),
            freeze: Some(suspend),
            poweroff: Some(suspend),
            resume: Some(resume),
            thaw: Some(resume),
            restore: Some(resume),
            ..Self::EMPTY
        }
    }

    /// Returns the hook bound to `phase`, if any.
    pub const fn hook(&self, phase: Phase) -> Option<PmHook> {
        match phase {
            Phase::Prepare => self.prepare,
            Phase::Suspend => self.suspend,
            Phase::Resume => self.resume,
            Phase::Freeze => self.freeze,
            Phase::Thaw => self.thaw,
            Phase::Poweroff => self.poweroff,
            Phase::Restore => self.restore,
            Phase::RuntimeSuspend => self.runtime_suspend,
            Phase::RuntimeResume => self.runtime_resume,
            Phase::RuntimeIdle => self.runtime_idle,
        }
    }

    /// Returns how many slots are filled.
    pub fn len(&self) -> usize {
        Phase::ALL
            .into_iter()
            .filter(|&p| self.hook(p).is_some())
            .count()
    }

    /// Returns `true` if no slot is filled.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl core::fmt::Debug for PmOps {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut list = f.debug_set();
        for phase in Phase::ALL {
            if self.hook(phase).is_some() {
                list.entry(&phase.name());
            }
        }
        list.finish()
    }
}
