use alloc::sync::Arc;

use hv_addresses::GuestPhysicalAddress;
use hv_multiboot::find_entry_offset;
use hv_multiboot::layout::{GDT_ADDRESS, KERNEL_LOAD_ADDRESS};
use hv_segmentation::FlatGdt;
use log::{debug, error, info};

use crate::access::{GuestAccess, PlatformAccess};
use crate::boot_info::write_boot_info;
use crate::boot_state::InitialCpuState;
use crate::completion::CompletionPort;
use crate::config::LoaderKind;
use crate::error::LoadError;
use crate::guest_memory::{GuestMemoryWriter, HostBootContext};
use crate::pio::PioHandlerIndex;
use crate::vm::{VirtualCpu, VirtualMachine};

/// Prepares a VM so that its BSP can be launched.
pub trait SoftwareLoader<V: VirtualMachine> {
    /// # Errors
    /// The VM must not be started if loading fails.
    fn load(&self, vm: &mut V, host: &HostBootContext<'_>) -> Result<(), LoadError>;
}

/// Pick the loader named by a VM's configuration.
///
/// The production loader lives with the hypervisor and is passed in.
pub fn select_loader<'a, V: VirtualMachine + 'static>(
    kind: LoaderKind,
    production: &'a dyn SoftwareLoader<V>,
) -> &'a dyn SoftwareLoader<V> {
    match kind {
        LoaderKind::Production => production,
        LoaderKind::UnitTest => &TestKernelLoader,
    }
}

/// Boots a raw multiboot test kernel in flat 32-bit protected mode.
///
/// The image is copied unmodified to 4 MiB regardless of the load address
/// the VM was created with. Its first instruction must directly follow the
/// multiboot header.
#[derive(Debug, Copy, Clone, Default)]
pub struct TestKernelLoader;

impl TestKernelLoader {
    /// [`SoftwareLoader::load`] with an explicit guest-access bracket.
    ///
    /// The VM's [`KernelInfo`](crate::KernelInfo) is only updated once every
    /// step has succeeded.
    ///
    /// # Errors
    /// See [`LoadError`]; nothing after the failing step is performed.
    pub fn load_with<V, A>(vm: &mut V, host: &HostBootContext<'_>, access: &A) -> Result<(), LoadError>
    where
        V: VirtualMachine + 'static,
        A: GuestAccess,
    {
        let id = vm.id();
        let image = Arc::clone(&vm.kernel_info().image);
        let memory_size = vm.config().memory_size;
        let bootargs = Arc::clone(&vm.config().bootargs);

        if vm.bsp_mut().is_none() {
            error!("{id}: no boot CPU to load");
            return Err(LoadError::NoBootCpu);
        }

        GuestMemoryWriter::new(vm.memory_mut()).alias_host_gdt(host)?;

        let offset = find_entry_offset(&image).inspect_err(|e| error!("{id}: {e}"))?;
        let load = KERNEL_LOAD_ADDRESS;
        let entry = load + u64::from(offset);
        debug!("{id}: multiboot entry at image offset {offset:#x}");

        let gdt = FlatGdt::new();
        let state = InitialCpuState::protected_mode_entry(entry, &gdt, GDT_ADDRESS);

        let mut writer = GuestMemoryWriter::new(vm.memory_mut());
        writer.write_kernel(load, &image)?;
        writer.write_gdt(GDT_ADDRESS, &gdt)?;

        let info = write_boot_info(vm.memory_mut(), access, load, memory_size, &bootargs)?;
        let state = state.with_boot_info(info);

        vm.bsp_mut().ok_or(LoadError::NoBootCpu)?.set_initial_state(&state);

        vm.register_pio_handler(
            PioHandlerIndex::TestDevice,
            CompletionPort::RANGE,
            Arc::new(CompletionPort),
        )?;

        let kernel = vm.kernel_info_mut();
        kernel.load_addr = load;
        kernel.entry_addr = Some(entry);

        info!(
            "{id}: test kernel ready, {} bytes at {load}, entry {entry}, boot info {info}",
            image.len()
        );
        Ok(())
    }

    /// Entry point a kernel image would have, without touching any VM.
    ///
    /// # Errors
    /// If the image has no multiboot header.
    pub fn entry_point(image: &[u8]) -> Result<GuestPhysicalAddress, LoadError> {
        Ok(KERNEL_LOAD_ADDRESS + u64::from(find_entry_offset(image)?))
    }
}

impl<V: VirtualMachine + 'static> SoftwareLoader<V> for TestKernelLoader {
    fn load(&self, vm: &mut V, host: &HostBootContext<'_>) -> Result<(), LoadError> {
        Self::load_with(vm, host, &PlatformAccess::default())
    }
}
