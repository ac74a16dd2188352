//! # Multiboot (v1) Handoff for Test Kernels
//!
//! The pieces of the multiboot protocol a hypervisor needs to start a small
//! self-contained test kernel:
//!
//! * [`header`]: locate the 12-byte multiboot header in a raw image and
//!   derive the entry offset right behind it.
//! * [`info`]: the boot-information block handed to the kernel in `EBX`.
//! * [`layout`]: fixed guest-physical placement used in test mode.
//!
//! ## Guest-physical placement
//!
//! ```text
//! 0x0020_0000 ┌──────────────────────────────┐ GDT_ADDRESS (2 MiB)
//!             │ flat GDT (3 × 8 bytes)       │
//!             ├──────────────────────────────┤
//!             │            …                 │
//! 0x003F_F000 ├──────────────────────────────┤ boot_info_base = load − 4 KiB
//!             │ multiboot_info               │
//! 0x003F_F800 ├──────────────────────────────┤ cmdline = boot_info_base + 2 KiB
//!             │ command line (2 KiB, NUL)    │
//! 0x0040_0000 ├──────────────────────────────┤ KERNEL_LOAD_ADDRESS (4 MiB)
//!             │ raw kernel image             │
//!             │   +X      multiboot header   │
//!             │   +X+12   entry point        │
//!             └──────────────────────────────┘
//! ```
//!
//! ## Register handoff
//! `EAX` = [`INFO_MAGIC`], `EBX` = guest-physical address of the info block.

#![cfg_attr(not(any(test, doctest)), no_std)]

pub mod header;
pub mod info;
pub mod layout;

pub use header::{HeaderError, MultibootHeader, find_entry_offset};
pub use info::{InfoFlags, MultibootInfo};

/// Magic value identifying a multiboot header inside a kernel image.
pub const HEADER_MAGIC: u32 = 0x1BAD_B002;

/// Magic value the loader leaves in `EAX` for the kernel.
pub const INFO_MAGIC: u32 = 0x2BAD_B002;
