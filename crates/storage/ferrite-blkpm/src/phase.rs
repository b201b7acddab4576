//! Transition phases and their primitive classes.

use core::fmt;

/// One named point in a power-transition protocol.
///
/// Selects both the driver hook slot in [`PmOps`](crate::PmOps) and the
/// primitive the dispatcher runs around it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Before any stop-class phase of a system transition.
    Prepare,
    /// System sleep, power down.
    Suspend,
    /// System sleep, power up.
    Resume,
    /// Hibernation: quiesce before the image is written.
    Freeze,
    /// Hibernation: undo [`Freeze`](Self::Freeze) after the image is written.
    Thaw,
    /// Hibernation: power down after the image is saved.
    Poweroff,
    /// Hibernation: power up from a restored image.
    Restore,
    /// Autonomous idle power down.
    RuntimeSuspend,
    /// Autonomous power up on demand.
    RuntimeResume,
    /// The framework noticed the node is idle.
    RuntimeIdle,
}

/// What the dispatcher does around a phase's hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseClass {
    /// Drain the queue, then call the hook.
    Stop,
    /// Call the hook, then restart the queue.
    Start,
    /// Neither; a pure synchronization or policy point.
    Sync,
}

impl Phase {
    /// Every phase, in hook-table order.
    pub const ALL: [Phase; 10] = [
        Phase::Prepare,
        Phase::Suspend,
        Phase::Resume,
        Phase::Freeze,
        Phase::Thaw,
        Phase::Poweroff,
        Phase::Restore,
        Phase::RuntimeSuspend,
        Phase::RuntimeResume,
        Phase::RuntimeIdle,
    ];

    /// Returns the phase name as the framework spells it.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Prepare => "prepare",
            Self::Suspend => "suspend",
            Self::Resume => "resume",
            Self::Freeze => "freeze",
            Self::Thaw => "thaw",
            Self::Poweroff => "poweroff",
            Self::Restore => "restore",
            Self::RuntimeSuspend => "runtime_suspend",
            Self::RuntimeResume => "runtime_resume",
            Self::RuntimeIdle => "runtime_idle",
        }
    }

    /// Returns the primitive class of this phase.
    ///
    /// `Resume` is start-class even though the dispatcher defers it: the
    /// runtime-resume path it schedules runs the start primitive.
    pub const fn class(self) -> PhaseClass {
        match self {
            Self::Suspend | Self::Freeze | Self::Poweroff | Self::RuntimeSuspend => {
                PhaseClass::Stop
            }
            Self::Resume | Self::Thaw | Self::Restore | Self::RuntimeResume => PhaseClass::Start,
            Self::Prepare | Self::RuntimeIdle => PhaseClass::Sync,
        }
    }

    /// Returns `true` for the autonomous runtime-PM phases.
    pub const fn is_runtime(self) -> bool {
        matches!(
            self,
            Self::RuntimeSuspend | Self::RuntimeResume | Self::RuntimeIdle
        )
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_class_phases() {
        let stops: Vec<_> = Phase::ALL
            .into_iter()
            .filter(|p| p.class() == PhaseClass::Stop)
            .collect();
        assert_eq!(
            stops,
            [
                Phase::Suspend,
                Phase::Freeze,
                Phase::Poweroff,
                Phase::RuntimeSuspend
            ]
        );
    }

    #[test]
    fn start_and_sync_classes() {
        assert_eq!(Phase::Thaw.class(), PhaseClass::Start);
        assert_eq!(Phase::Restore.class(), PhaseClass::Start);
        assert_eq!(Phase::RuntimeResume.class(), PhaseClass::Start);
        assert_eq!(Phase::Resume.class(), PhaseClass::Start);
        assert_eq!(Phase::Prepare.class(), PhaseClass::Sync);
        assert_eq!(Phase::RuntimeIdle.class(), PhaseClass::Sync);
    }

    #[test]
    fn names_are_distinct() {
        for (i, a) in Phase::ALL.into_iter().enumerate() {
            for b in &Phase::ALL[i + 1..] {
                assert_ne!(a.name(), b.name());
            }
        }
        assert_eq!(Phase::RuntimeIdle.to_string(), "runtime_idle");
    }

    #[test]
    fn runtime_phases() {
        assert!(Phase::RuntimeIdle.is_runtime());
        assert!(!Phase::Suspend.is_runtime());
    }
}
