//! Recording doubles for the framework and for drivers.

use std::sync::{Arc, Mutex};

use crate::device::{DeviceId, StorageDevice};
use crate::error::{DriverError, PmError};
use crate::ops::PmOps;
use crate::phase::Phase;
use crate::queue::RequestQueue;
use crate::runtime::{RpmStatus, RuntimePm};

/// One call made on a [`MockPm`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PmCall {
    ForceState(RpmStatus),
    DisableTracking,
    EnableTracking,
    RequestAsyncResume,
    RequestAutosuspend,
    RequestSuspend,
    MarkLastBusy,
    GetSync,
    PutSync,
}

struct MockState {
    status: RpmStatus,
    tracking: bool,
    forced_while_tracking: bool,
    calls: Vec<PmCall>,
    get_result: Result<(), PmError>,
    request_result: Result<(), PmError>,
    resume_queued: bool,
}

/// A runtime-PM record that logs every call.
pub(crate) struct MockPm {
    inner: Mutex<MockState>,
}

impl MockPm {
    pub(crate) fn new() -> Arc<Self> {
        Self::with_state(RpmStatus::Active)
    }

    pub(crate) fn with_state(status: RpmStatus) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(MockState {
                status,
                tracking: true,
                forced_while_tracking: false,
                calls: Vec::new(),
                get_result: Ok(()),
                request_result: Ok(()),
                resume_queued: false,
            }),
        })
    }

    fn record(&self, call: PmCall) -> std::sync::MutexGuard<'_, MockState> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(call);
        inner
    }

    pub(crate) fn calls(&self) -> Vec<PmCall> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub(crate) fn count(&self, call: PmCall) -> usize {
        self.inner
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|&&c| c == call)
            .count()
    }

    /// Returns `true` if `force_state` was ever called with tracking on.
    pub(crate) fn forced_while_tracking(&self) -> bool {
        self.inner.lock().unwrap().forced_while_tracking
    }

    pub(crate) fn set_get_result(&self, result: Result<(), PmError>) {
        self.inner.lock().unwrap().get_result = result;
    }

    pub(crate) fn set_request_result(&self, result: Result<(), PmError>) {
        self.inner.lock().unwrap().request_result = result;
    }

    /// Takes the asynchronous resume work queued by `request_async_resume`.
    ///
    /// Requests made while one is already queued coalesce into it, as the
    /// framework's single deferred work item does.
    pub(crate) fn take_queued_resume(&self) -> bool {
        core::mem::take(&mut self.inner.lock().unwrap().resume_queued)
    }
}

impl RuntimePm for MockPm {
    fn get_cached_state(&self) -> RpmStatus {
        self.inner.lock().unwrap().status
    }

    fn force_state(&self, state: RpmStatus) {
        let mut inner = self.record(PmCall::ForceState(state));
        if inner.tracking {
            inner.forced_while_tracking = true;
        }
        inner.status = state;
    }

    fn disable_tracking(&self) {
        self.record(PmCall::DisableTracking).tracking = false;
    }

    fn enable_tracking(&self) {
        self.record(PmCall::EnableTracking).tracking = true;
    }

    fn request_async_resume(&self) -> Result<(), PmError> {
        let mut inner = self.record(PmCall::RequestAsyncResume);
        if inner.request_result.is_ok() {
            inner.resume_queued = true;
        }
        inner.request_result
    }

    fn request_autosuspend(&self) -> Result<(), PmError> {
        self.record(PmCall::RequestAutosuspend).request_result
    }

    fn request_suspend(&self) -> Result<(), PmError> {
        self.record(PmCall::RequestSuspend).request_result
    }

    fn mark_last_busy(&self) {
        drop(self.record(PmCall::MarkLastBusy));
    }

    fn get_sync(&self) -> Result<(), PmError> {
        let mut inner = self.record(PmCall::GetSync);
        let result = inner.get_result;
        if result.is_ok() {
            inner.status = RpmStatus::Active;
        }
        result
    }

    fn put_sync(&self) {
        drop(self.record(PmCall::PutSync));
    }
}

/// What a recording hook saw when it ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct HookCall {
    pub(crate) phase: Phase,
    pub(crate) pending: usize,
    pub(crate) accepting: bool,
}

/// Driver data consulted by the recording hooks.
#[derive(Default)]
pub(crate) struct HookProbe {
    seen: Mutex<Vec<HookCall>>,
    failures: Mutex<Vec<(Phase, DriverError)>>,
}

impl HookProbe {
    pub(crate) fn calls(&self) -> Vec<HookCall> {
        self.seen.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, phase: Phase) -> usize {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.phase == phase)
            .count()
    }

    /// Makes every later hook call for `phase` fail with `err`.
    pub(crate) fn fail(&self, phase: Phase, err: DriverError) {
        self.failures.lock().unwrap().push((phase, err));
    }

    fn observe(&self, sdev: &StorageDevice, phase: Phase) -> Result<(), DriverError> {
        self.seen.lock().unwrap().push(HookCall {
            phase,
            pending: sdev.queue().pending_count(),
            accepting: sdev.queue().is_accepting(),
        });
        match self
            .failures
            .lock()
            .unwrap()
            .iter()
            .find(|(p, _)| *p == phase)
        {
            Some(&(_, err)) => Err(err),
            None => Ok(()),
        }
    }
}

fn record(sdev: &StorageDevice, phase: Phase) -> Result<(), DriverError> {
    match sdev.driver_data::<HookProbe>() {
        Some(probe) => probe.observe(sdev, phase),
        None => Ok(()),
    }
}

macro_rules! recording_hooks {
    ($($name:ident => $phase:ident),* $(,)?) => {
        $(
            fn $name(sdev: &StorageDevice) -> Result<(), DriverError> {
                record(sdev, Phase::$phase)
            }
        )*

        /// Every slot filled with a hook that reports to the device's
        /// [`HookProbe`].
        pub(crate) static RECORDING_OPS: PmOps = PmOps {
            $($name: Some($name),)*
        };
    };
}

recording_hooks! {
    prepare => Prepare,
    suspend => Suspend,
    resume => Resume,
    freeze => Freeze,
    thaw => Thaw,
    poweroff => Poweroff,
    restore => Restore,
    runtime_suspend => RuntimeSuspend,
    runtime_resume => RuntimeResume,
    runtime_idle => RuntimeIdle,
}

/// A storage device bound to [`RECORDING_OPS`], with its doubles.
pub(crate) struct Fixture {
    pub(crate) sdev: StorageDevice,
    pub(crate) queue: Arc<RequestQueue>,
    pub(crate) pm: Arc<MockPm>,
    pub(crate) probe: Arc<HookProbe>,
}

impl Fixture {
    pub(crate) fn new() -> Self {
        Self::with_state(RpmStatus::Active)
    }

    pub(crate) fn with_state(status: RpmStatus) -> Self {
        Self::at(DeviceId::new(0, 0, 0, 0), status)
    }

    pub(crate) fn at(id: DeviceId, status: RpmStatus) -> Self {
        let queue = Arc::new(RequestQueue::new());
        let pm = MockPm::with_state(status);
        let probe = Arc::new(HookProbe::default());
        let sdev = StorageDevice::new(id, Arc::clone(&queue), pm.clone());
        sdev.bind(&RECORDING_OPS, Some(probe.clone()));
        Self {
            sdev,
            queue,
            pm,
            probe,
        }
    }
}
