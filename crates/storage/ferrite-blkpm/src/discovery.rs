//! Discovery barrier: counting events for asynchronous probe work.
//!
//! Asynchronous discovery (host scans, disk probes) registers on an
//! [`AsyncDomain`] when it starts and completes when its [`ProbeTicket`] is
//! dropped. Waiters resolve once the domain's outstanding count returns to
//! zero. The counters are process-wide per domain, not per device: a wait
//! issued for one device can be held up by another device's probe.
//!
//! [`Discovery`] owns the two domains the prepare phase cares about and is
//! shared (via `Arc`) between the discovery code and the dispatcher.

use alloc::sync::Arc;
use core::fmt;
use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll};

use ferrite_core::sync::WaitQueue;
use ferrite_core::sync::loom_compat::{AtomicUsize, Ordering};
use ferrite_core::{kwarn, ktrace};

/// Names the domains owned by [`Discovery`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainId {
    /// Deferred disk probing started when a storage device is discovered.
    DiskProbe,
    /// Bus-wide asynchronous host scanning.
    HostScan,
}

impl fmt::Display for DomainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::DiskProbe => "disk-probe",
            Self::HostScan => "host-scan",
        })
    }
}

/// A counting event over outstanding asynchronous work.
pub struct AsyncDomain {
    name: &'static str,
    pending: AtomicUsize,
    waiters: WaitQueue,
}

impl AsyncDomain {
    /// Creates an idle domain.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            pending: AtomicUsize::new(0),
            waiters: WaitQueue::new(),
        }
    }

    /// Returns the domain name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Registers one unit of outstanding work.
    ///
    /// The work counts as complete when the returned ticket is dropped or
    /// passed to [`ProbeTicket::complete`].
    pub fn register(self: &Arc<Self>) -> ProbeTicket {
        let outstanding = self.pending.fetch_add(1, Ordering::AcqRel) + 1;
        ktrace!("discovery: {}: registered ({} outstanding)", self.name, outstanding);
        ProbeTicket {
            domain: Arc::clone(self),
        }
    }

    /// Returns the number of outstanding registrations.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Returns `true` if nothing is outstanding.
    pub fn is_idle(&self) -> bool {
        self.pending() == 0
    }

    /// Returns a future that resolves once the domain is idle.
    pub fn wait_idle(&self) -> DomainIdle<'_> {
        DomainIdle { domain: self }
    }

    fn signal(&self) {
        match self
            .pending
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
        {
            Ok(1) => {
                ktrace!("discovery: {}: idle", self.name);
                self.waiters.wake_all();
            }
            Ok(_) => {}
            Err(_) => kwarn!("discovery: {}: completion without registration", self.name),
        }
    }
}

impl fmt::Debug for AsyncDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncDomain")
            .field("name", &self.name)
            .field("pending", &self.pending())
            .finish()
    }
}

/// One outstanding unit of asynchronous discovery work.
#[must_use = "dropping the ticket completes the work immediately"]
pub struct ProbeTicket {
    domain: Arc<AsyncDomain>,
}

impl ProbeTicket {
    /// Signals completion. Equivalent to dropping the ticket.
    pub fn complete(self) {}

    /// Returns the domain this ticket is registered on.
    pub fn domain(&self) -> &AsyncDomain {
        &self.domain
    }
}

impl Drop for ProbeTicket {
    fn drop(&mut self) {
        self.domain.signal();
    }
}

/// Future returned by [`AsyncDomain::wait_idle`].
#[must_use = "a barrier does nothing unless awaited"]
pub struct DomainIdle<'a> {
    domain: &'a AsyncDomain,
}

impl Future for DomainIdle<'_> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.domain.is_idle() {
            return Poll::Ready(());
        }
        self.domain.waiters.register(cx.waker());
        if self.domain.is_idle() {
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    }
}

/// The discovery domains consulted by the prepare phase.
#[derive(Debug)]
pub struct Discovery {
    disk_probe: Arc<AsyncDomain>,
    host_scan: Arc<AsyncDomain>,
}

impl Discovery {
    /// Creates both domains, idle.
    pub fn new() -> Self {
        Self {
            disk_probe: Arc::new(AsyncDomain::new("disk-probe")),
            host_scan: Arc::new(AsyncDomain::new("host-scan")),
        }
    }

    /// Returns the named domain, for registering work on it.
    pub fn domain(&self, id: DomainId) -> &Arc<AsyncDomain> {
        match id {
            DomainId::DiskProbe => &self.disk_probe,
            DomainId::HostScan => &self.host_scan,
        }
    }

    /// Waits until the named domain has no outstanding work.
    pub fn wait_domain_idle(&self, id: DomainId) -> DomainIdle<'_> {
        self.domain(id).wait_idle()
    }

    /// Waits until no asynchronous host scan is outstanding.
    pub fn wait_all_scans_idle(&self) -> DomainIdle<'_> {
        self.host_scan.wait_idle()
    }
}

impl Default for Discovery {
    fn default() -> Self {
        Self::new()
    }
}
