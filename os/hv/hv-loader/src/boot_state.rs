//! Register state for entering a multiboot kernel in flat protected mode.
//!
//! | Register | Value |
//! |----------|-------|
//! | RIP | entry point |
//! | CR0 | `PE \| ET \| NE` |
//! | GDTR | three-entry flat table |
//! | CS | `0x08`, flat 4 GiB code |
//! | DS, SS, ES, FS, GS | `0x10`, flat 4 GiB data |
//! | RAX | `0x2BADB002` |
//! | RBX | GPA of the info block |
//! | others | 0 |

use hv_addresses::GuestPhysicalAddress;
use hv_multiboot::INFO_MAGIC;
use hv_registers::{Cr0, GeneralPurposeRegisters, Gpr};
use hv_segmentation::{DescriptorTablePointer, FLAT_CS, FLAT_DS, FlatGdt, SegmentRegister};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct InitialCpuState {
    pub rip: u64,
    pub cr0: Cr0,
    pub gdtr: DescriptorTablePointer,
    pub cs: SegmentRegister,
    pub ds: SegmentRegister,
    pub ss: SegmentRegister,
    pub es: SegmentRegister,
    pub fs: SegmentRegister,
    pub gs: SegmentRegister,
    pub gprs: GeneralPurposeRegisters,
}

impl InitialCpuState {
    /// Flat protected-mode state starting at `entry`, with `gdt` loaded from
    /// `gdt_base`. All general-purpose registers are zero.
    #[must_use]
    pub fn protected_mode_entry(entry: GuestPhysicalAddress, gdt: &FlatGdt, gdt_base: GuestPhysicalAddress) -> Self {
        let code = SegmentRegister::from_descriptor(FLAT_CS.encode(), gdt.code());
        let data = SegmentRegister::from_descriptor(FLAT_DS.encode(), gdt.data());
        Self {
            rip: entry.as_u64(),
            cr0: Cr0::protected_mode_boot(),
            gdtr: FlatGdt::pointer_at(gdt_base.raw()),
            cs: code,
            ds: data,
            ss: data,
            es: data,
            fs: data,
            gs: data,
            gprs: GeneralPurposeRegisters::zeroed(),
        }
    }

    /// Multiboot handoff: `EAX` = magic, `EBX` = info block.
    #[must_use]
    pub fn with_boot_info(mut self, info: GuestPhysicalAddress) -> Self {
        self.gprs.set(Gpr::Rax, u64::from(INFO_MAGIC));
        self.gprs.set(Gpr::Rbx, info.as_u64());
        self
    }

    #[must_use]
    pub const fn data_segments(&self) -> [&SegmentRegister; 5] {
        [&self.ds, &self.ss, &self.es, &self.fs, &self.gs]
    }
}
