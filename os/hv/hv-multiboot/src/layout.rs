//! Fixed guest-physical placement for test kernels.

use hv_addresses::{GuestPhysicalAddress, KIB, MIB};

/// Where the raw kernel image is copied.
pub const KERNEL_LOAD_ADDRESS: GuestPhysicalAddress = GuestPhysicalAddress::new(4 * MIB);

/// Where the flat boot GDT is written.
pub const GDT_ADDRESS: GuestPhysicalAddress = GuestPhysicalAddress::new(2 * MIB);

/// Distance of the info block below the load address.
pub const BOOT_INFO_OFFSET: u64 = 4 * KIB;

/// Distance of the command line above the info block.
pub const CMDLINE_OFFSET: u64 = 2 * KIB;

/// Command-line buffer size, terminator included.
pub const CMDLINE_CAPACITY: usize = 2 * 1024;

/// Longest command line copied before truncation.
pub const CMDLINE_MAX_LEN: usize = CMDLINE_CAPACITY - 1;

/// Placement of the boot-info page relative to a load address.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BootInfoLayout {
    pub info: GuestPhysicalAddress,
    pub cmdline: GuestPhysicalAddress,
}

impl BootInfoLayout {
    /// Layout below `load_addr`, or `None` if it would underflow.
    #[must_use]
    pub const fn below(load_addr: GuestPhysicalAddress) -> Option<Self> {
        let Some(info) = load_addr.checked_sub(BOOT_INFO_OFFSET) else {
            return None;
        };
        let Some(cmdline) = info.checked_add(CMDLINE_OFFSET) else {
            return None;
        };
        Some(Self { info, cmdline })
    }
}

/// Copy of `bootargs` bounded to [`CMDLINE_MAX_LEN`] bytes plus a NUL.
///
/// Returns the buffer and the number of valid bytes, terminator included.
#[must_use]
pub fn terminated_cmdline(bootargs: &[u8]) -> ([u8; CMDLINE_CAPACITY], usize) {
    let mut buf = [0u8; CMDLINE_CAPACITY];
    let len = bootargs.len().min(CMDLINE_MAX_LEN);
    buf[..len].copy_from_slice(&bootargs[..len]);
    (buf, len + 1)
}
