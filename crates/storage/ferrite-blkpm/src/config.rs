//! Dispatcher configuration.

/// How the system-level resume phase is carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SystemResume {
    /// Ask the framework for an asynchronous runtime resume and return at
    /// once. The device powers up on the framework's runtime-resume path.
    #[default]
    Deferred,
    /// Run the start primitive with the resume hook before returning, then
    /// force the cached state to active.
    Inline,
}

/// Policy knobs for [`BusPm`](crate::BusPm).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusPmConfig {
    /// Strategy for [`Phase::Resume`](crate::Phase::Resume).
    pub system_resume: SystemResume,
    /// Skip the stop primitive for system sleep phases when the device is
    /// already runtime-suspended.
    pub skip_suspended_on_sleep: bool,
}

impl BusPmConfig {
    /// The default policy.
    pub const DEFAULT: Self = Self::new();

    /// Creates the default policy: deferred resume, suspended devices skip
    /// system sleep.
    pub const fn new() -> Self {
        Self {
            system_resume: SystemResume::Deferred,
            skip_suspended_on_sleep: true,
        }
    }

    /// Sets the system resume strategy.
    #[must_use]
    pub const fn with_system_resume(mut self, mode: SystemResume) -> Self {
        self.system_resume = mode;
        self
    }

    /// Sets whether already-suspended devices skip system sleep phases.
    #[must_use]
    pub const fn with_skip_suspended_on_sleep(mut self, skip: bool) -> Self {
        self.skip_suspended_on_sleep = skip;
        self
    }
}

impl Default for BusPmConfig {
    fn default() -> Self {
        Self::new()
    }
}
