//! Bus-level power-transition coordinator for block storage.
//!
//! Sits between the runtime power-management framework and the drivers of
//! a storage bus (hosts, targets and their logical units). For each phase
//! the framework calls, [`BusPm`] quiesces or restarts the device's
//! [`RequestQueue`] around the bound driver's [`PmOps`] hook, keeps the
//! framework's cached state coherent after system transitions, and waits
//! out asynchronous discovery before a system sleep starts.
//!
//! Code that needs a device powered outside the phase protocol takes an
//! autopm hold ([`autopm_get_device`] and friends, or [`AutopmToken`]).

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

extern crate alloc;

pub mod autopm;
pub mod config;
pub mod device;
pub mod discovery;
pub mod dispatch;
pub mod error;
pub mod ops;
pub mod phase;
pub mod queue;
pub mod runtime;

#[cfg(test)]
mod test_support;

pub use autopm::{
    AutopmToken, acquire, autopm_get_device, autopm_get_host, autopm_get_target,
    autopm_put_device, autopm_put_host, autopm_put_target, release,
};
pub use config::{BusPmConfig, SystemResume};
pub use device::{BusNode, DeviceId, HostController, StorageDevice, Target, TargetId};
pub use discovery::{AsyncDomain, Discovery, DomainId, DomainIdle, ProbeTicket};
pub use dispatch::BusPm;
pub use error::{DriverError, PmError};
pub use ops::{PmHook, PmOps};
pub use phase::{Phase, PhaseClass};
pub use queue::{Drain, QueueFlags, RequestQueue, SubmitError};
pub use runtime::{RpmStatus, RuntimePm};
