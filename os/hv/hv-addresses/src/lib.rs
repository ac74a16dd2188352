//! # Guest and Host Address Types
//!
//! Strongly typed wrappers for the three address spaces a hypervisor juggles
//! while building a guest:
//!
//! | Wrapper | Meaning |
//! |---------|---------|
//! | [`GuestPhysicalAddress`] | The guest's view of physical memory (GPA). |
//! | [`HostPhysicalAddress`] | Machine memory backing a guest page (HPA). |
//! | [`HostVirtualAddress`] | The hypervisor's mapping of that page (HVA). |
//!
//! All three are zero-cost `#[repr(transparent)]` wrappers around a
//! [`MemoryAddress`]. Mixing them up is a compile error, so translation
//! between spaces must go through the guest memory collaborator.
//!
//! ```rust
//! # use hv_addresses::*;
//! let load = GuestPhysicalAddress::new(4 * MIB);
//! let info = load.checked_sub(Size4K::SIZE).unwrap();
//! assert_eq!(info.as_u64(), 0x3F_F000);
//! assert!(load.is_aligned::<Size2M>());
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

mod memory_address;
mod spaces;

pub use memory_address::MemoryAddress;
pub use spaces::{GuestPhysicalAddress, HostPhysicalAddress, HostVirtualAddress};

use core::fmt;
use core::hash::Hash;

/// One KiB.
pub const KIB: u64 = 1024;

/// One MiB.
pub const MIB: u64 = 1024 * KIB;

/// Sealed trait pattern to restrict `PageSize` impls to our markers.
mod sealed {
    pub trait Sealed {}
}

/// Marker trait for the granularities the loader aligns against.
pub trait PageSize:
    sealed::Sealed + Clone + Copy + Eq + PartialEq + Ord + PartialOrd + Hash + fmt::Debug
{
    /// Size in bytes (power of two).
    const SIZE: u64;
    /// log2(SIZE).
    const SHIFT: u32;
}

/// 4 KiB page.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct Size4K;
impl sealed::Sealed for Size4K {}
impl PageSize for Size4K {
    const SIZE: u64 = 4 * KIB;
    const SHIFT: u32 = 12;
}

/// 2 MiB large page.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct Size2M;
impl sealed::Sealed for Size2M {}
impl PageSize for Size2M {
    const SIZE: u64 = 2 * MIB;
    const SHIFT: u32 = 21;
}

const _: () = {
    assert!(1 << Size4K::SHIFT == Size4K::SIZE);
    assert!(1 << Size2M::SHIFT == Size2M::SIZE);
};
