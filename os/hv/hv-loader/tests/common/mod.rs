#![allow(dead_code)]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use hv_addresses::{GuestPhysicalAddress, HostPhysicalAddress, HostVirtualAddress, MemoryAddress};
use hv_console::{ConsoleLogger, ConsoleSink};
use hv_loader::{
    AccessWidth, GuestMemory, GuestMemoryError, HostBootContext, InitialCpuState, IoRange, KernelInfo, PioBus,
    PioError, PioHandler, PioHandlerIndex, PioResult, RunState, VcpuId, VirtualCpu, VirtualMachine, VmConfig, VmId,
};
use hv_multiboot::MultibootHeader;
use hv_segmentation::DescriptorTablePointer;
use log::LevelFilter;

/// Header at offset 0 followed by `hlt; jmp $; nop`.
pub fn sixteen_byte_kernel() -> Vec<u8> {
    let mut image = MultibootHeader::with_flags(0).to_bytes().to_vec();
    image.extend_from_slice(&[0xF4, 0xEB, 0xFE, 0x90]);
    image
}

/// Flat guest RAM starting at GPA 0, backed at `hpa_base`.
pub struct FlatRam {
    pub bytes: Vec<u8>,
    pub hpa_base: u64,
    /// Calls to `copy_to_gpa`.
    pub copies: usize,
    /// Ranges handed out by `gpa_to_hva`.
    pub mappings: usize,
}

impl FlatRam {
    pub fn new(size: u64, hpa_base: u64) -> Self {
        Self {
            bytes: vec![0; usize::try_from(size).unwrap()],
            hpa_base,
            copies: 0,
            mappings: 0,
        }
    }

    fn span(&self, gpa: GuestPhysicalAddress, len: usize) -> Result<usize, GuestMemoryError> {
        let start = usize::try_from(gpa.as_u64()).unwrap();
        match start.checked_add(len) {
            Some(end) if end <= self.bytes.len() => Ok(start),
            _ => Err(GuestMemoryError::OutOfRange { gpa, len }),
        }
    }

    pub fn read(&self, gpa: u64, len: usize) -> &[u8] {
        let start = usize::try_from(gpa).unwrap();
        &self.bytes[start..start + len]
    }

    pub fn u32_at(&self, gpa: u64) -> u32 {
        u32::from_le_bytes(self.read(gpa, 4).try_into().unwrap())
    }

    pub fn u64_at(&self, gpa: u64) -> u64 {
        u64::from_le_bytes(self.read(gpa, 8).try_into().unwrap())
    }
}

// SAFETY: mapped ranges are bounds checked and point into `bytes`.
unsafe impl GuestMemory for FlatRam {
    fn gpa_to_hpa(&self, gpa: GuestPhysicalAddress) -> Result<HostPhysicalAddress, GuestMemoryError> {
        self.span(gpa, 1)
            .map_err(|_| GuestMemoryError::Unmapped { gpa })?;
        Ok(HostPhysicalAddress::new(self.hpa_base + gpa.as_u64()))
    }

    fn gpa_to_hva(&mut self, gpa: GuestPhysicalAddress, len: usize) -> Result<HostVirtualAddress, GuestMemoryError> {
        let start = self.span(gpa, len)?;
        self.mappings += 1;
        Ok(HostVirtualAddress::from_ptr(self.bytes.as_mut_ptr().wrapping_add(start)))
    }

    fn copy_to_gpa(&mut self, bytes: &[u8], gpa: GuestPhysicalAddress) -> Result<(), GuestMemoryError> {
        let start = self.span(gpa, bytes.len())?;
        self.bytes[start..start + bytes.len()].copy_from_slice(bytes);
        self.copies += 1;
        Ok(())
    }
}

pub struct MockVcpu {
    pub id: VcpuId,
    pub initial_state: Option<InitialCpuState>,
    pub run: RunState,
    pub pause_requests: AtomicUsize,
}

impl MockVcpu {
    pub fn new(id: u16) -> Self {
        Self {
            id: VcpuId(id),
            initial_state: None,
            run: RunState::new(),
            pause_requests: AtomicUsize::new(0),
        }
    }
}

impl VirtualCpu for MockVcpu {
    fn id(&self) -> VcpuId {
        self.id
    }

    fn set_initial_state(&mut self, state: &InitialCpuState) {
        self.initial_state = Some(*state);
    }

    fn request_pause(&self) {
        self.pause_requests.fetch_add(1, Ordering::SeqCst);
        self.run.request_pause();
    }
}

pub struct MockVm {
    pub id: VmId,
    pub config: VmConfig,
    pub kernel: KernelInfo,
    pub vcpus: Vec<MockVcpu>,
    pub memory: FlatRam,
    pub pio: PioBus<MockVm>,
}

impl MockVm {
    /// A VM with `vcpus` vCPUs (ids 0..n) and flat RAM backed 1:1.
    pub fn new(config: VmConfig, image: Vec<u8>, vcpus: u16) -> Self {
        let memory = FlatRam::new(config.memory_size, 0);
        Self {
            id: VmId(1),
            kernel: KernelInfo::new(image, GuestPhysicalAddress::new(0x10_0000)),
            config,
            vcpus: (0..vcpus).map(MockVcpu::new).collect(),
            memory,
            pio: PioBus::new(),
        }
    }

    pub fn bsp(&self) -> &MockVcpu {
        &self.vcpus[0]
    }

    pub fn outb(&self, port: u16, value: u8) -> PioResult {
        self.pio.write(self, port, AccessWidth::Byte, u32::from(value))
    }

    pub fn inl(&self, port: u16) -> PioResult {
        self.pio.read(self, port, AccessWidth::Dword)
    }

    pub fn start_all(&self) {
        for vcpu in &self.vcpus {
            vcpu.run.start();
        }
    }
}

impl VirtualMachine for MockVm {
    type Vcpu = MockVcpu;
    type Memory = FlatRam;

    fn id(&self) -> VmId {
        self.id
    }

    fn config(&self) -> &VmConfig {
        &self.config
    }

    fn kernel_info(&self) -> &KernelInfo {
        &self.kernel
    }

    fn kernel_info_mut(&mut self) -> &mut KernelInfo {
        &mut self.kernel
    }

    fn vcpus(&self) -> &[MockVcpu] {
        &self.vcpus
    }

    fn vcpu_mut(&mut self, id: VcpuId) -> Option<&mut MockVcpu> {
        self.vcpus.iter_mut().find(|v| v.id == id)
    }

    fn memory_mut(&mut self) -> &mut FlatRam {
        &mut self.memory
    }

    fn register_pio_handler(
        &mut self,
        index: PioHandlerIndex,
        range: IoRange,
        handler: Arc<dyn PioHandler<Self>>,
    ) -> Result<(), PioError> {
        self.pio.register(index, range, handler)
    }
}

/// Host GDT context whose table is identity mapped in a 1:1 [`FlatRam`].
pub fn identity_host() -> HostBootContext<'static> {
    static HOST_GDT: [u8; 24] = [0; 24];
    HostBootContext {
        gdt: DescriptorTablePointer::new(MemoryAddress::new(0x1000), 23),
        gdt_image: &HOST_GDT,
    }
}

pub struct Capture(Mutex<String>);

impl ConsoleSink for Capture {
    fn write_bytes(&self, bytes: &[u8]) {
        self.0
            .lock()
            .unwrap()
            .push_str(&String::from_utf8_lossy(bytes));
    }
}

static LOGGER: ConsoleLogger<Capture> =
    ConsoleLogger::new(Capture(Mutex::new(String::new())), LevelFilter::Debug);

/// Route `log` output of this test binary into memory.
pub fn capture_logs() {
    // Several tests call this; only the first install succeeds.
    let _ = LOGGER.install();
}

pub fn captured_logs() -> String {
    LOGGER.sink().0.lock().unwrap().clone()
}
