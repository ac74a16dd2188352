//! What the loader needs from the hypervisor's VM and vCPU objects.

use alloc::sync::Arc;
use core::fmt;

use hv_addresses::GuestPhysicalAddress;

use crate::boot_state::InitialCpuState;
use crate::config::VmConfig;
use crate::guest_memory::GuestMemory;
use crate::pio::{IoRange, PioError, PioHandler, PioHandlerIndex};

/// Hypervisor-wide VM number, used to tag log lines.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VmId(pub u16);

impl fmt::Display for VmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VM{}", self.0)
    }
}

/// Index of a vCPU within its VM.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VcpuId(pub u16);

impl VcpuId {
    /// The bootstrap processor.
    pub const BSP: Self = Self(0);
}

impl fmt::Display for VcpuId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vCPU{}", self.0)
    }
}

/// The guest software to boot and where it ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelInfo {
    /// Raw image bytes, shared with whoever supplied them.
    pub image: Arc<[u8]>,
    /// Where the image is placed in guest memory.
    pub load_addr: GuestPhysicalAddress,
    /// Set once a loader has located the entry point.
    pub entry_addr: Option<GuestPhysicalAddress>,
}

impl KernelInfo {
    #[must_use]
    pub fn new(image: impl Into<Arc<[u8]>>, load_addr: GuestPhysicalAddress) -> Self {
        Self {
            image: image.into(),
            load_addr,
            entry_addr: None,
        }
    }
}

/// One virtual processor, as far as loading and pausing it goes.
pub trait VirtualCpu {
    fn id(&self) -> VcpuId;

    /// Whether this is the vCPU that starts executing the kernel.
    fn is_bsp(&self) -> bool {
        self.id() == VcpuId::BSP
    }

    /// Replace the register file before the vCPU first enters the guest.
    fn set_initial_state(&mut self, state: &InitialCpuState);

    /// Stop executing guest code at the next opportunity.
    ///
    /// Must not block and must tolerate repeated calls from any thread.
    fn request_pause(&self);
}

/// A VM as the loader sees it: configuration, kernel, vCPUs, RAM and the
/// port I/O table.
///
/// The hypervisor implements this on its own VM object. The loader only
/// borrows it for the duration of one load.
pub trait VirtualMachine {
    type Vcpu: VirtualCpu;
    type Memory: GuestMemory;

    fn id(&self) -> VmId;

    /// Settings the VM was created with.
    fn config(&self) -> &VmConfig;

    /// The guest software attached at creation time.
    fn kernel_info(&self) -> &KernelInfo;

    /// Loaders record the final load and entry addresses here.
    fn kernel_info_mut(&mut self) -> &mut KernelInfo;

    /// All vCPUs, in no particular order.
    fn vcpus(&self) -> &[Self::Vcpu];

    /// The vCPU with the given id, if the VM has one.
    fn vcpu_mut(&mut self, id: VcpuId) -> Option<&mut Self::Vcpu>;

    /// Guest RAM, for writing the image and boot structures.
    fn memory_mut(&mut self) -> &mut Self::Memory;

    /// Attach `handler` to `range` in slot `index`.
    ///
    /// # Errors
    /// If the slot is taken or the range overlaps another handler.
    fn register_pio_handler(
        &mut self,
        index: PioHandlerIndex,
        range: IoRange,
        handler: Arc<dyn PioHandler<Self>>,
    ) -> Result<(), PioError>;

    /// Shorthand for the vCPU with [`VcpuId::BSP`].
    fn bsp_mut(&mut self) -> Option<&mut Self::Vcpu> {
        self.vcpu_mut(VcpuId::BSP)
    }
}
