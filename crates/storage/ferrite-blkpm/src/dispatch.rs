//! Phase dispatch for the storage bus.
//!
//! [`BusPm`] is what the power-management framework calls for every node
//! on the bus. For leaf storage devices it brackets the bound driver's hook
//! with the queue adapter:
//!
//! - stop phases (suspend, freeze, poweroff, runtime suspend) drain the
//!   queue with new submissions rejected, run the hook, then record the
//!   outcome on the queue
//! - start phases (thaw, restore, runtime resume) clear the suspended
//!   markers, run the hook, then reopen the queue whatever the outcome
//!
//! Hosts and targets have no queue and no driver; they only see the forced
//! cached-state updates of the system-level phases. Prepare is a barrier on
//! outstanding asynchronous discovery and never fails.
//!
//! The stop-side entry points and prepare are `async`: they resolve when
//! the drain or barrier does. Blocking glue drives them with
//! [`ferrite_core::task::block_on`].

use alloc::sync::Arc;

use ferrite_core::{kdebug, ktrace, kwarn};

use crate::config::{BusPmConfig, SystemResume};
use crate::device::{BusNode, StorageDevice};
use crate::discovery::{Discovery, DomainId};
use crate::error::PmError;
use crate::phase::{Phase, PhaseClass};
use crate::runtime::RpmStatus;

/// The bus-level power-management callbacks.
#[derive(Debug)]
pub struct BusPm {
    discovery: Arc<Discovery>,
    config: BusPmConfig,
}

impl BusPm {
    /// Creates a dispatcher that waits on `discovery` during prepare.
    pub fn new(discovery: Arc<Discovery>, config: BusPmConfig) -> Self {
        Self { discovery, config }
    }

    /// Returns the discovery domains this dispatcher waits on.
    pub fn discovery(&self) -> &Arc<Discovery> {
        &self.discovery
    }

    /// Returns the active policy.
    pub fn config(&self) -> BusPmConfig {
        self.config
    }

    /// Dispatches `phase` to its entry point.
    ///
    /// # Errors
    ///
    /// Whatever the entry point for `phase` reports.
    pub async fn call(&self, phase: Phase, node: BusNode<'_>) -> Result<(), PmError> {
        match phase.class() {
            PhaseClass::Stop if phase.is_runtime() => self.runtime_suspend(node).await,
            PhaseClass::Stop => self.system_stop(node, phase).await,
            PhaseClass::Start if phase.is_runtime() => self.runtime_resume(node),
            PhaseClass::Start if phase == Phase::Resume => self.resume(node),
            PhaseClass::Start => system_start(node, phase),
            PhaseClass::Sync if phase.is_runtime() => self.runtime_idle(node),
            PhaseClass::Sync => self.prepare(node).await,
        }
    }

    // -----------------------------------------------------------------------
    // System sleep and hibernation
    // -----------------------------------------------------------------------

    /// Waits for asynchronous discovery that could still add or probe the
    /// node.
    ///
    /// Storage devices wait for the disk-probe domain. Hosts wait for every
    /// outstanding scan and then for the disk probes those scans started.
    /// Targets have nothing to wait for.
    ///
    /// # Errors
    ///
    /// Never fails; the `Result` matches the other entry points.
    pub async fn prepare(&self, node: BusNode<'_>) -> Result<(), PmError> {
        match node {
            BusNode::Device(_) => {
                self.discovery
                    .wait_domain_idle(DomainId::DiskProbe)
                    .await;
            }
            BusNode::Host(_) => {
                self.discovery.wait_all_scans_idle().await;
                self.discovery
                    .wait_domain_idle(DomainId::DiskProbe)
                    .await;
            }
            BusNode::Target(_) => {}
        }
        Ok(())
    }

    /// System suspend.
    ///
    /// # Errors
    ///
    /// Returns the driver's hook failure, or [`PmError::QueueDrain`] if the
    /// queue is torn down while draining.
    pub async fn suspend(&self, node: BusNode<'_>) -> Result<(), PmError> {
        self.system_stop(node, Phase::Suspend).await
    }

    /// Hibernation freeze.
    ///
    /// # Errors
    ///
    /// See [`suspend`](Self::suspend).
    pub async fn freeze(&self, node: BusNode<'_>) -> Result<(), PmError> {
        self.system_stop(node, Phase::Freeze).await
    }

    /// Hibernation power off.
    ///
    /// # Errors
    ///
    /// See [`suspend`](Self::suspend).
    pub async fn poweroff(&self, node: BusNode<'_>) -> Result<(), PmError> {
        self.system_stop(node, Phase::Poweroff).await
    }

    /// System resume.
    ///
    /// With [`SystemResume::Deferred`] this only asks the framework for an
    /// asynchronous runtime resume; the start primitive runs later, once,
    /// on the runtime-resume path. A refused request is logged and
    /// otherwise ignored.
    ///
    /// # Errors
    ///
    /// Only with [`SystemResume::Inline`]: the driver's hook failure.
    pub fn resume(&self, node: BusNode<'_>) -> Result<(), PmError> {
        match self.config.system_resume {
            SystemResume::Deferred => {
                if let Err(err) = node.pm().request_async_resume() {
                    kwarn!("{}: async resume request failed: {}", node, err);
                }
                Ok(())
            }
            SystemResume::Inline => system_start(node, Phase::Resume),
        }
    }

    /// Hibernation thaw.
    ///
    /// # Errors
    ///
    /// Returns the driver's hook failure. The queue accepts I/O again
    /// either way.
    pub fn thaw(&self, node: BusNode<'_>) -> Result<(), PmError> {
        system_start(node, Phase::Thaw)
    }

    /// Hibernation restore.
    ///
    /// # Errors
    ///
    /// See [`thaw`](Self::thaw).
    pub fn restore(&self, node: BusNode<'_>) -> Result<(), PmError> {
        system_start(node, Phase::Restore)
    }

    async fn system_stop(&self, node: BusNode<'_>, phase: Phase) -> Result<(), PmError> {
        if let BusNode::Device(sdev) = node {
            if self.config.skip_suspended_on_sleep && sdev.pm().is_suspended() {
                ktrace!("{}: {}: already suspended", sdev.id(), phase);
                return Ok(());
            }
            stop(sdev, phase).await?;
        }
        force_cached_state(node, RpmStatus::Suspended);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Runtime PM
    // -----------------------------------------------------------------------

    /// Runtime suspend. Only storage devices do any work.
    ///
    /// # Errors
    ///
    /// See [`suspend`](Self::suspend).
    pub async fn runtime_suspend(&self, node: BusNode<'_>) -> Result<(), PmError> {
        let Some(sdev) = node.as_device() else {
            return Ok(());
        };
        kdebug!("{}: runtime suspend", sdev.id());
        if sdev.pm().is_suspended() {
            return Ok(());
        }
        stop(sdev, Phase::RuntimeSuspend).await
    }

    /// Runtime resume. Only storage devices do any work.
    ///
    /// # Errors
    ///
    /// See [`thaw`](Self::thaw).
    pub fn runtime_resume(&self, node: BusNode<'_>) -> Result<(), PmError> {
        let Some(sdev) = node.as_device() else {
            return Ok(());
        };
        kdebug!("{}: runtime resume", sdev.id());
        start(sdev, Phase::RuntimeResume)
    }

    /// Runtime idle.
    ///
    /// Storage devices restart their idle timer and ask for an
    /// autosuspend; other nodes ask for a plain runtime suspend.
    ///
    /// # Errors
    ///
    /// The framework's answer to the request, as advice.
    pub fn runtime_idle(&self, node: BusNode<'_>) -> Result<(), PmError> {
        match node.as_device() {
            Some(sdev) => {
                kdebug!("{}: runtime idle", sdev.id());
                sdev.pm().mark_last_busy();
                sdev.pm().request_autosuspend()
            }
            None => node.pm().request_suspend(),
        }
    }
}

impl Default for BusPm {
    fn default() -> Self {
        Self::new(Arc::new(Discovery::new()), BusPmConfig::DEFAULT)
    }
}

fn system_start(node: BusNode<'_>, phase: Phase) -> Result<(), PmError> {
    if let BusNode::Device(sdev) = node {
        start(sdev, phase)?;
    }
    force_cached_state(node, RpmStatus::Active);
    Ok(())
}

/// Drain, hook, record.
async fn stop(sdev: &StorageDevice, phase: Phase) -> Result<(), PmError> {
    let queue = sdev.queue();
    let outcome = queue
        .begin_drain()
        .await
        .and_then(|()| run_hook(sdev, phase));
    let outcome = queue.post_suspend(outcome);
    if let Err(err) = outcome {
        kwarn!("{}: {} failed: {}", sdev.id(), phase, err);
        sdev.pm().mark_last_busy();
    }
    outcome
}

/// Clear markers, hook, reopen.
fn start(sdev: &StorageDevice, phase: Phase) -> Result<(), PmError> {
    let queue = sdev.queue();
    queue.begin_restart();
    let outcome = queue.end_restart(run_hook(sdev, phase));
    if let Err(err) = outcome {
        kwarn!("{}: {} failed: {}", sdev.id(), phase, err);
    }
    outcome
}

fn run_hook(sdev: &StorageDevice, phase: Phase) -> Result<(), PmError> {
    match sdev.pm_ops().and_then(|ops| ops.hook(phase)) {
        Some(hook) => hook(sdev).map_err(PmError::Hook),
        None => Ok(()),
    }
}

/// Overwrites the framework's cached state with tracking switched off.
fn force_cached_state(node: BusNode<'_>, state: RpmStatus) {
    let pm = node.pm();
    pm.disable_tracking();
    pm.force_state(state);
    pm.enable_tracking();
    ktrace!("{}: cached state forced to {}", node, state);
}
