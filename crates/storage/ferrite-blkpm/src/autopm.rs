//! Keeping a node powered while code outside the phase protocol uses it.
//!
//! An autopm hold is a runtime-PM usage reference taken synchronously: the
//! get side resumes the node before returning, the put side lets it idle
//! again. A get that fails is balanced on the spot. A get that succeeds,
//! or that the framework answers with `AccessDenied` (the node is in a
//! transition that forbids forced activation), counts as taken and is
//! balanced later by exactly one put.
//!
//! [`AutopmToken`] wraps the pair in a guard.

use core::fmt;

use ferrite_core::kdebug;

use crate::device::{BusNode, HostController, StorageDevice, Target};
use crate::error::PmError;
use crate::runtime::RuntimePm;

/// Takes a hold on `pm`, resuming it synchronously.
///
/// # Errors
///
/// Returns the framework's failure after dropping the reference it took.
/// `AccessDenied` is reported as success and must be released like one.
pub fn acquire(pm: &dyn RuntimePm) -> Result<(), PmError> {
    match pm.get_sync() {
        Ok(()) | Err(PmError::AccessDenied) => Ok(()),
        Err(err) => {
            pm.put_sync();
            Err(err)
        }
    }
}

/// Drops a hold taken with [`acquire`].
pub fn release(pm: &dyn RuntimePm) {
    pm.put_sync();
}

/// Holds a storage device active.
///
/// # Errors
///
/// See [`acquire`].
pub fn autopm_get_device(sdev: &StorageDevice) -> Result<(), PmError> {
    acquire(sdev.pm()).inspect_err(|err| {
        kdebug!("{}: autopm get failed: {}", sdev.id(), err);
    })
}

/// Releases a hold taken with [`autopm_get_device`].
pub fn autopm_put_device(sdev: &StorageDevice) {
    release(sdev.pm());
}

/// Holds a target active.
///
/// The framework result is ignored: the reference stays held and the
/// caller always releases it with [`autopm_put_target`].
pub fn autopm_get_target(target: &Target) {
    if let Err(err) = target.pm().get_sync() {
        kdebug!("{}: autopm get ignored: {}", target.id(), err);
    }
}

/// Releases a hold taken with [`autopm_get_target`].
pub fn autopm_put_target(target: &Target) {
    release(target.pm());
}

/// Holds a host controller active.
///
/// # Errors
///
/// See [`acquire`].
pub fn autopm_get_host(host: &HostController) -> Result<(), PmError> {
    acquire(host.pm()).inspect_err(|err| {
        kdebug!("host{}: autopm get failed: {}", host.number(), err);
    })
}

/// Releases a hold taken with [`autopm_get_host`].
pub fn autopm_put_host(host: &HostController) {
    release(host.pm());
}

/// A hold on a bus node, released on drop.
#[must_use = "dropping the token releases the hold immediately"]
pub struct AutopmToken<'a> {
    node: BusNode<'a>,
}

impl<'a> AutopmToken<'a> {
    /// Takes a hold on `node`.
    ///
    /// Targets follow [`autopm_get_target`] and always yield a token.
    ///
    /// # Errors
    ///
    /// See [`acquire`]. No token is returned on failure and nothing is left
    /// to release.
    pub fn acquire(node: BusNode<'a>) -> Result<Self, PmError> {
        match node {
            BusNode::Target(target) => autopm_get_target(target),
            _ => acquire(node.pm())?,
        }
        Ok(Self { node })
    }

    /// Returns the node this token holds.
    pub fn node(&self) -> BusNode<'a> {
        self.node
    }
}

impl Drop for AutopmToken<'_> {
    fn drop(&mut self) {
        release(self.node.pm());
    }
}

impl fmt::Debug for AutopmToken<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AutopmToken({})", self.node)
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;
    use crate::device::TargetId;
    use crate::runtime::RpmStatus;
    use crate::test_support::{Fixture, MockPm, PmCall};

    #[test]
    fn get_resumes_and_put_releases() {
        let fx = Fixture::with_state(RpmStatus::Suspended);
        autopm_get_device(&fx.sdev).unwrap();
        assert_eq!(fx.pm.get_cached_state(), RpmStatus::Active);
        assert_eq!(fx.pm.count(PmCall::PutSync), 0);

        autopm_put_device(&fx.sdev);
        assert_eq!(fx.pm.calls(), [PmCall::GetSync, PmCall::PutSync]);
    }

    #[test]
    fn access_denied_is_success_without_release() {
        let fx = Fixture::new();
        fx.pm.set_get_result(Err(PmError::AccessDenied));
        assert_eq!(autopm_get_device(&fx.sdev), Ok(()));
        assert_eq!(fx.pm.count(PmCall::PutSync), 0);
    }

    #[test]
    fn other_failures_release_exactly_once() {
        for err in [PmError::Busy, PmError::Io, PmError::Again, PmError::Invalid] {
            let fx = Fixture::new();
            fx.pm.set_get_result(Err(err));
            assert_eq!(autopm_get_device(&fx.sdev), Err(err));
            assert_eq!(fx.pm.count(PmCall::PutSync), 1, "{err}");
        }
    }

    #[test]
    fn host_follows_device_rules() {
        let pm = MockPm::new();
        let host = HostController::new(1, pm.clone());
        pm.set_get_result(Err(PmError::NoDevice));
        assert_eq!(autopm_get_host(&host), Err(PmError::NoDevice));
        assert_eq!(pm.calls(), [PmCall::GetSync, PmCall::PutSync]);

        pm.set_get_result(Ok(()));
        autopm_get_host(&host).unwrap();
        autopm_put_host(&host);
        assert_eq!(pm.count(PmCall::PutSync), 2);
    }

    #[test]
    fn target_get_ignores_failure() {
        let pm = MockPm::new();
        let target = Target::new(TargetId { host: 0, channel: 0, target: 2 }, pm.clone());
        pm.set_get_result(Err(PmError::Busy));
        autopm_get_target(&target);
        assert_eq!(pm.count(PmCall::PutSync), 0);
        autopm_put_target(&target);
        assert_eq!(pm.calls(), [PmCall::GetSync, PmCall::PutSync]);
    }

    #[test]
    fn token_releases_on_drop() {
        let fx = Fixture::with_state(RpmStatus::Suspended);
        {
            let token = AutopmToken::acquire(BusNode::from(&fx.sdev)).unwrap();
            assert!(token.node().is_leaf());
            assert_eq!(fx.pm.get_cached_state(), RpmStatus::Active);
            assert_eq!(fx.pm.count(PmCall::PutSync), 0);
        }
        assert_eq!(fx.pm.count(PmCall::PutSync), 1);
    }

    #[test]
    fn token_failure_leaves_nothing_held() {
        let fx = Fixture::new();
        fx.pm.set_get_result(Err(PmError::Busy));
        assert!(AutopmToken::acquire(BusNode::from(&fx.sdev)).is_err());
        assert_eq!(fx.pm.count(PmCall::PutSync), 1);
    }

    #[test]
    fn token_on_access_denied_still_pairs_release() {
        let fx = Fixture::new();
        fx.pm.set_get_result(Err(PmError::AccessDenied));
        let token = AutopmToken::acquire(BusNode::from(&fx.sdev)).unwrap();
        assert_eq!(fx.pm.count(PmCall::PutSync), 0);
        drop(token);
        assert_eq!(fx.pm.calls(), [PmCall::GetSync, PmCall::PutSync]);
    }
}
