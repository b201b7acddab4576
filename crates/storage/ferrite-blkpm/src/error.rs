//! Error types for the power-transition path.
//!
//! [`DriverError`] is what a bound driver's phase hook reports.
//! [`PmError`] is what the bus-level entry points and the autopm helpers
//! return; it also carries the framework's own failure codes.

use core::fmt;

/// Errors a driver phase hook may report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverError {
    /// The device is still busy and cannot change power state now.
    Busy,
    /// The device did not respond in time.
    Timeout,
    /// An I/O error occurred while talking to the device.
    Io,
    /// The device is not in a state that allows this transition.
    InvalidState,
    /// The device is gone.
    NoDevice,
}

impl DriverError {
    /// Returns the negative errno value for this error.
    pub const fn errno(self) -> i32 {
        match self {
            Self::Busy => errno::EBUSY,
            Self::Timeout => errno::ETIMEDOUT,
            Self::Io => errno::EIO,
            Self::InvalidState => errno::EINVAL,
            Self::NoDevice => errno::ENODEV,
        }
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Busy => f.write_str("device busy"),
            Self::Timeout => f.write_str("device timed out"),
            Self::Io => f.write_str("I/O error"),
            Self::InvalidState => f.write_str("invalid device state"),
            Self::NoDevice => f.write_str("no such device"),
        }
    }
}

/// Errors reported by the coordinator and the runtime-PM framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PmError {
    /// The request queue could not be drained.
    ///
    /// Draining a live queue always completes; this is only reported when
    /// the queue was torn down underneath a drain.
    QueueDrain,
    /// The bound driver's phase hook failed. Propagated verbatim.
    Hook(DriverError),
    /// The node is in a transition that forbids forced activation.
    ///
    /// Swallowed by the autopm helpers; callers never see it from there.
    AccessDenied,
    /// The framework refused because the node is in use.
    Busy,
    /// The framework cannot act right now (e.g. tracking is disabled).
    Again,
    /// A transition is already in progress.
    InProgress,
    /// The request does not apply to this node.
    Invalid,
    /// The node is gone.
    NoDevice,
    /// Generic I/O failure reported by the framework.
    Io,
}

impl PmError {
    /// Returns the negative errno value for this error.
    pub const fn errno(self) -> i32 {
        match self {
            Self::QueueDrain => errno::EIO,
            Self::Hook(err) => err.errno(),
            Self::AccessDenied => errno::EACCES,
            Self::Busy => errno::EBUSY,
            Self::Again => errno::EAGAIN,
            Self::InProgress => errno::EINPROGRESS,
            Self::Invalid => errno::EINVAL,
            Self::NoDevice => errno::ENODEV,
            Self::Io => errno::EIO,
        }
    }

    /// Maps a framework return code onto `Result`.
    ///
    /// Non-negative codes are success (the framework uses positive values
    /// for "already in the requested state"). Unknown negative codes map to
    /// [`PmError::Io`].
    pub const fn from_errno(code: i32) -> Result<(), Self> {
        if code >= 0 {
            return Ok(());
        }
        Err(match code {
            errno::EACCES => Self::AccessDenied,
            errno::EBUSY => Self::Busy,
            errno::EAGAIN => Self::Again,
            errno::EINPROGRESS => Self::InProgress,
            errno::EINVAL => Self::Invalid,
            errno::ENODEV => Self::NoDevice,
            _ => Self::Io,
        })
    }

    /// Returns `true` if this failure came from a driver hook.
    pub const fn is_hook_failure(self) -> bool {
        matches!(self, Self::Hook(_))
    }
}

impl From<DriverError> for PmError {
    fn from(err: DriverError) -> Self {
        Self::Hook(err)
    }
}

impl fmt::Display for PmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QueueDrain => f.write_str("request queue drain failed"),
            Self::Hook(err) => write!(f, "driver hook failed: {err}"),
            Self::AccessDenied => f.write_str("access denied"),
            Self::Busy => f.write_str("device busy"),
            Self::Again => f.write_str("try again"),
            Self::InProgress => f.write_str("transition in progress"),
            Self::Invalid => f.write_str("invalid request"),
            Self::NoDevice => f.write_str("no such device"),
            Self::Io => f.write_str("I/O error"),
        }
    }
}

/// Negative errno values used on the framework boundary.
pub mod errno {
    /// I/O error.
    pub const EIO: i32 = -5;
    /// Try again.
    pub const EAGAIN: i32 = -11;
    /// Permission denied.
    pub const EACCES: i32 = -13;
    /// Device or resource busy.
    pub const EBUSY: i32 = -16;
    /// No such device.
    pub const ENODEV: i32 = -19;
    /// Invalid argument.
    pub const EINVAL: i32 = -22;
    /// Connection timed out.
    pub const ETIMEDOUT: i32 = -110;
    /// Operation now in progress.
    pub const EINPROGRESS: i32 = -115;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_all_variants() {
        assert_eq!(
            format!("{}", PmError::QueueDrain),
            "request queue drain failed"
        );
        assert_eq!(
            format!("{}", PmError::Hook(DriverError::Timeout)),
            "driver hook failed: device timed out"
        );
        assert_eq!(format!("{}", PmError::AccessDenied), "access denied");
        assert_eq!(format!("{}", PmError::InProgress), "transition in progress");
        assert_eq!(format!("{}", DriverError::NoDevice), "no such device");
    }

    #[test]
    fn errno_mapping() {
        assert_eq!(PmError::AccessDenied.errno(), -13);
        assert_eq!(PmError::Hook(DriverError::Busy).errno(), -16);
        assert_eq!(PmError::QueueDrain.errno(), -5);
        assert_eq!(DriverError::Timeout.errno(), -110);
    }

    #[test]
    fn from_errno_treats_non_negative_as_success() {
        assert_eq!(PmError::from_errno(0), Ok(()));
        assert_eq!(PmError::from_errno(1), Ok(()));
        assert_eq!(PmError::from_errno(-13), Err(PmError::AccessDenied));
        assert_eq!(PmError::from_errno(-11), Err(PmError::Again));
        assert_eq!(PmError::from_errno(-9999), Err(PmError::Io));
    }

    #[test]
    fn framework_codes_survive_errno_round_trip() {
        for err in [
            PmError::AccessDenied,
            PmError::Busy,
            PmError::Again,
            PmError::InProgress,
            PmError::Invalid,
            PmError::NoDevice,
        ] {
            assert_eq!(PmError::from_errno(err.errno()), Err(err));
        }
    }

    #[test]
    fn driver_error_converts_to_hook_failure() {
        let err: PmError = DriverError::Io.into();
        assert_eq!(err, PmError::Hook(DriverError::Io));
        assert!(err.is_hook_failure());
        assert!(!PmError::Busy.is_hook_failure());
    }
}
