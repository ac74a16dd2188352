//! # Multiboot Information Block
//!
//! Only the leading fields up to `mods_addr` are ever populated for test
//! kernels; the remainder of the 88-byte block stays zero.

use bitfield_struct::bitfield;
use hv_addresses::GuestPhysicalAddress;

/// Validity flags for the optional info fields (`multiboot_info.flags`).
#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct InfoFlags {
    /// `mem_lower`/`mem_upper` are valid.
    pub memory: bool,
    /// `boot_device` is valid.
    pub boot_device: bool,
    /// `cmdline` is valid.
    pub cmdline: bool,
    /// `mods_count`/`mods_addr` are valid.
    pub mods: bool,
    pub aout_syms: bool,
    pub elf_shdr: bool,
    /// `mmap_length`/`mmap_addr` are valid.
    pub mmap: bool,
    #[bits(25, default = 0)]
    _reserved_7_31: u32,
}

impl InfoFlags {
    /// Flags set for a test-kernel handoff: memory, cmdline, mods.
    #[must_use]
    pub const fn test_kernel() -> Self {
        Self::new().with_memory(true).with_cmdline(true).with_mods(true)
    }
}

/// The multiboot v1 information structure as the guest reads it.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct MultibootInfo {
    pub flags: u32,
    /// KiB of memory below 1 MiB.
    pub mem_lower: u32,
    /// KiB of memory above 1 MiB.
    pub mem_upper: u32,
    pub boot_device: u32,
    /// GPA of a NUL-terminated command line.
    pub cmdline: u32,
    pub mods_count: u32,
    pub mods_addr: u32,
    pub syms: [u32; 4],
    pub mmap_length: u32,
    pub mmap_addr: u32,
    pub drives_length: u32,
    pub drives_addr: u32,
    pub config_table: u32,
    pub boot_loader_name: u32,
    pub apm_table: u32,
    pub vbe_control_info: u32,
    pub vbe_mode_info: u32,
    pub vbe_mode: u16,
    pub vbe_interface_seg: u16,
    pub vbe_interface_off: u16,
    pub vbe_interface_len: u16,
}

const _: () = assert!(size_of::<MultibootInfo>() == MultibootInfo::SIZE);

impl MultibootInfo {
    pub const SIZE: usize = 88;

    pub const OFFSET_FLAGS: usize = 0;
    pub const OFFSET_MEM_LOWER: usize = 4;
    pub const OFFSET_MEM_UPPER: usize = 8;
    pub const OFFSET_BOOT_DEVICE: usize = 12;
    pub const OFFSET_CMDLINE: usize = 16;
    pub const OFFSET_MODS_COUNT: usize = 20;
    pub const OFFSET_MODS_ADDR: usize = 24;

    /// Info block for a test kernel: `mem_lower = 0`, `mem_upper` in KiB,
    /// command line at `cmdline`, no modules.
    ///
    /// `mem_upper` saturates at `u32::MAX` KiB. Returns `None` if `cmdline`
    /// lies above 4 GiB, where the 32-bit field cannot point.
    #[must_use]
    pub fn for_test_kernel(memory_size: u64, cmdline: GuestPhysicalAddress) -> Option<Self> {
        let mem_upper = u32::try_from(memory_size / 1024).unwrap_or(u32::MAX);
        Some(Self {
            flags: InfoFlags::test_kernel().into_bits(),
            mem_lower: 0,
            mem_upper,
            cmdline: cmdline.try_as_u32()?,
            mods_count: 0,
            mods_addr: 0,
            ..Self::default()
        })
    }

    #[must_use]
    pub const fn info_flags(&self) -> InfoFlags {
        InfoFlags::from_bits(self.flags)
    }

    /// Little-endian byte image, identical to what the guest observes.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        let words = [
            self.flags,
            self.mem_lower,
            self.mem_upper,
            self.boot_device,
            self.cmdline,
            self.mods_count,
            self.mods_addr,
            self.syms[0],
            self.syms[1],
            self.syms[2],
            self.syms[3],
            self.mmap_length,
            self.mmap_addr,
            self.drives_length,
            self.drives_addr,
            self.config_table,
            self.boot_loader_name,
            self.apm_table,
            self.vbe_control_info,
            self.vbe_mode_info,
        ];
        for (chunk, w) in out.chunks_exact_mut(4).zip(words) {
            chunk.copy_from_slice(&w.to_le_bytes());
        }
        let halves = [
            self.vbe_mode,
            self.vbe_interface_seg,
            self.vbe_interface_off,
            self.vbe_interface_len,
        ];
        for (chunk, h) in out[80..].chunks_exact_mut(2).zip(halves) {
            chunk.copy_from_slice(&h.to_le_bytes());
        }
        out
    }
}
