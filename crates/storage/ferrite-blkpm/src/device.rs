//! Bus nodes seen by the coordinator.
//!
//! The bus is a three-level tree: a [`HostController`] owns [`Target`]s,
//! and each target owns the addressable [`StorageDevice`]s (logical units).
//! Only storage devices have a request queue and a bound driver; the other
//! two levels take part in power transitions only through their runtime-PM
//! record. The framework hands the dispatcher a [`BusNode`].

use alloc::sync::Arc;
use core::any::Any;
use core::fmt;

use ferrite_core::sync::SpinLock;

use crate::ops::PmOps;
use crate::queue::RequestQueue;
use crate::runtime::RuntimePm;

/// Address of a storage device: `host:channel:target:lun`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeviceId {
    /// Host controller number.
    pub host: u16,
    /// Channel (bus) on the host.
    pub channel: u16,
    /// Target number on the channel.
    pub target: u32,
    /// Logical unit number.
    pub lun: u64,
}

impl DeviceId {
    /// Creates a device address.
    pub const fn new(host: u16, channel: u16, target: u32, lun: u64) -> Self {
        Self {
            host,
            channel,
            target,
            lun,
        }
    }

    /// Returns the address of the target this device sits behind.
    pub const fn target_id(&self) -> TargetId {
        TargetId {
            host: self.host,
            channel: self.channel,
            target: self.target,
        }
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.host, self.channel, self.target, self.lun
        )
    }
}

/// Address of a target: `host:channel:target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TargetId {
    /// Host controller number.
    pub host: u16,
    /// Channel (bus) on the host.
    pub channel: u16,
    /// Target number on the channel.
    pub target: u32,
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "target{}:{}:{}", self.host, self.channel, self.target)
    }
}

/// Driver data attached at bind time.
type DriverData = Arc<dyn Any + Send + Sync>;

/// What a bound driver leaves on the device.
#[derive(Clone)]
struct Binding {
    ops: &'static PmOps,
    data: Option<DriverData>,
}

/// One addressable storage unit.
pub struct StorageDevice {
    id: DeviceId,
    queue: Arc<RequestQueue>,
    pm: Arc<dyn RuntimePm>,
    binding: SpinLock<Option<Binding>>,
}

impl StorageDevice {
    /// Creates an unbound device.
    pub fn new(id: DeviceId, queue: Arc<RequestQueue>, pm: Arc<dyn RuntimePm>) -> Self {
        Self {
            id,
            queue,
            pm,
            binding: SpinLock::named("sdev-binding", None),
        }
    }

    /// Returns the device address.
    pub fn id(&self) -> DeviceId {
        self.id
    }

    /// Returns the device's request queue.
    pub fn queue(&self) -> &RequestQueue {
        &self.queue
    }

    /// Returns the framework's runtime-PM record for this device.
    pub fn pm(&self) -> &dyn RuntimePm {
        &*self.pm
    }

    /// Binds a driver's hook table and optional per-device data.
    ///
    /// Replaces any previous binding.
    pub fn bind(&self, ops: &'static PmOps, data: Option<DriverData>) {
        *self.binding.lock() = Some(Binding { ops, data });
    }

    /// Drops the current driver binding.
    pub fn unbind(&self) {
        *self.binding.lock() = None;
    }

    /// Returns `true` if a driver is bound.
    pub fn is_bound(&self) -> bool {
        self.binding.lock().is_some()
    }

    /// Returns the bound hook table, if a driver is bound.
    pub fn pm_ops(&self) -> Option<&'static PmOps> {
        self.binding.lock().as_ref().map(|b| b.ops)
    }

    /// Returns the bound driver's data if it is of type `T`.
    pub fn driver_data<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        let data = self.binding.lock().as_ref()?.data.clone()?;
        data.downcast::<T>().ok()
    }
}

impl fmt::Debug for StorageDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageDevice")
            .field("id", &self.id)
            .field("queue", &self.queue)
            .field("ops", &self.pm_ops())
            .finish_non_exhaustive()
    }
}

/// A grouping of logical units behind one target port.
pub struct Target {
    id: TargetId,
    pm: Arc<dyn RuntimePm>,
}

impl Target {
    /// Creates a target node.
    pub fn new(id: TargetId, pm: Arc<dyn RuntimePm>) -> Self {
        Self { id, pm }
    }

    /// Returns the target address.
    pub fn id(&self) -> TargetId {
        self.id
    }

    /// Returns the framework's runtime-PM record for this target.
    pub fn pm(&self) -> &dyn RuntimePm {
        &*self.pm
    }
}

/// A host bus adapter.
pub struct HostController {
    number: u16,
    pm: Arc<dyn RuntimePm>,
}

impl HostController {
    /// Creates a host node.
    pub fn new(number: u16, pm: Arc<dyn RuntimePm>) -> Self {
        Self { number, pm }
    }

    /// Returns the host number.
    pub fn number(&self) -> u16 {
        self.number
    }

    /// Returns the framework's runtime-PM record for this host.
    pub fn pm(&self) -> &dyn RuntimePm {
        &*self.pm
    }
}

/// The node a phase call is addressed to.
#[derive(Clone, Copy)]
pub enum BusNode<'a> {
    /// A host controller.
    Host(&'a HostController),
    /// A target grouping.
    Target(&'a Target),
    /// A leaf storage device.
    Device(&'a StorageDevice),
}

impl<'a> BusNode<'a> {
    /// Returns the framework's runtime-PM record for this node.
    pub fn pm(&self) -> &'a dyn RuntimePm {
        match *self {
            BusNode::Host(host) => host.pm(),
            BusNode::Target(target) => target.pm(),
            BusNode::Device(sdev) => sdev.pm(),
        }
    }

    /// Returns the storage device if this is a leaf.
    pub fn as_device(&self) -> Option<&'a StorageDevice> {
        match *self {
            BusNode::Device(sdev) => Some(sdev),
            _ => None,
        }
    }

    /// Returns `true` for leaf storage devices.
    pub fn is_leaf(&self) -> bool {
        self.as_device().is_some()
    }
}

impl fmt::Display for BusNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusNode::Host(host) => write!(f, "host{}", host.number()),
            BusNode::Target(target) => fmt::Display::fmt(&target.id(), f),
            BusNode::Device(sdev) => fmt::Display::fmt(&sdev.id(), f),
        }
    }
}

impl<'a> From<&'a StorageDevice> for BusNode<'a> {
    fn from(sdev: &'a StorageDevice) -> Self {
        BusNode::Device(sdev)
    }
}

impl<'a> From<&'a Target> for BusNode<'a> {
    fn from(target: &'a Target) -> Self {
        BusNode::Target(target)
    }
}

impl<'a> From<&'a HostController> for BusNode<'a> {
    fn from(host: &'a HostController) -> Self {
        BusNode::Host(host)
    }
}
