use hv_addresses::GuestPhysicalAddress;
use hv_multiboot::MultibootInfo;
use hv_multiboot::layout::{BootInfoLayout, terminated_cmdline};
use log::debug;

use crate::access::GuestAccess;
use crate::error::LoadError;
use crate::guest_memory::{GuestMemory, GuestMemoryWriter};

/// Write the info block and command line into the page below `load`.
///
/// Both writes go through the hypervisor's mapping of the page, inside one
/// `access` bracket that is closed again on every return path. Returns the
/// info block's address.
///
/// # Errors
/// [`LoadError::LoadAddressTooLow`] if `load` is below 4 KiB,
/// [`LoadError::BootInfoAbove4GiB`] if the command line would not be
/// reachable through a 32-bit pointer, or the memory collaborator's failure.
pub fn write_boot_info<M, A>(
    memory: &mut M,
    access: &A,
    load: GuestPhysicalAddress,
    memory_size: u64,
    bootargs: &str,
) -> Result<GuestPhysicalAddress, LoadError>
where
    M: GuestMemory,
    A: GuestAccess,
{
    let layout = BootInfoLayout::below(load).ok_or(LoadError::LoadAddressTooLow { load })?;
    let info = MultibootInfo::for_test_kernel(memory_size, layout.cmdline)
        .ok_or(LoadError::BootInfoAbove4GiB { cmdline: layout.cmdline })?;
    let (cmdline, len) = terminated_cmdline(bootargs.as_bytes());

    if bootargs.len() >= len {
        debug!("command line truncated from {} to {} bytes", bootargs.len(), len - 1);
    }

    let mut writer = GuestMemoryWriter::new(memory);
    let _guard = access.enter();
    writer.write_mapped(layout.info, &info.to_bytes())?;
    writer.write_mapped(layout.cmdline, &cmdline[..len])?;

    debug!(
        "boot info at {}: mem_upper={} KiB, cmdline at {}",
        layout.info, info.mem_upper, layout.cmdline
    );
    Ok(layout.info)
}
