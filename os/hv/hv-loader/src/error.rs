use hv_addresses::GuestPhysicalAddress;
use hv_multiboot::HeaderError;

use crate::pio::PioError;

/// Failure reported by the guest memory collaborator.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GuestMemoryError {
    /// No host page backs the address.
    #[error("{gpa} is not backed by guest memory")]
    Unmapped { gpa: GuestPhysicalAddress },
    /// The range starts inside guest memory but does not end there.
    #[error("{len} bytes at {gpa} run past the end of guest memory")]
    OutOfRange { gpa: GuestPhysicalAddress, len: usize },
}

/// Why a test kernel could not be prepared.
///
/// Whatever the variant, the VM must not be started and its
/// [`KernelInfo`](crate::KernelInfo) is left as it was.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    /// The image carries no usable multiboot header.
    #[error("kernel image rejected")]
    Header(#[from] HeaderError),
    /// A write or translation into guest RAM failed.
    #[error("guest memory write failed")]
    GuestMemory(#[from] GuestMemoryError),
    /// The host GDT image is shorter than its limit claims.
    #[error("host GDT limit {limit:#x} exceeds the {available} bytes provided")]
    HostGdtTruncated { limit: u16, available: usize },
    /// The boot info page would have to start below address zero.
    #[error("load address {load} leaves no room for the boot info page")]
    LoadAddressTooLow { load: GuestPhysicalAddress },
    /// The command line sits where a 32-bit multiboot field cannot point.
    #[error("command line at {cmdline} is beyond the 32-bit boot info range")]
    BootInfoAbove4GiB { cmdline: GuestPhysicalAddress },
    #[error("VM has no boot CPU")]
    NoBootCpu,
    /// The completion port's slot or range is already taken.
    #[error("failed to install the completion port")]
    Pio(#[from] PioError),
}
