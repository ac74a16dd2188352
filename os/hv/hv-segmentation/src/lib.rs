//! # Guest Segmentation State
//!
//! Typed building blocks for the segmentation state a hypervisor hands to a
//! freshly created 32-bit protected-mode guest:
//!
//! - [`Dpl`] / [`Rpl`]: privilege levels stored in descriptors and selectors.
//! - [`SegmentDescriptor`]: bitfield view of an 8-byte GDT entry, produced by
//!   the named [`DescriptorBuilder`] instead of opaque hex literals.
//! - [`SegmentSelector`]: typed code/data selectors (index, TI, RPL).
//! - [`SegmentAccessRights`]: the attribute bytes of a descriptor, as loaded
//!   into a vCPU's hidden segment state.
//! - [`FlatGdt`]: the three-entry flat table (null, code, data).
//!
//! ## Flat table layout
//! Index | Selector | Meaning
//! ------|----------|--------
//! 0     | 0x00     | Null
//! 1     | 0x08     | Code, base 0, 4 GiB, DPL=0, execute/read ([`FLAT_CS`])
//! 2     | 0x10     | Data, base 0, 4 GiB, DPL=0, read/write ([`FLAT_DS`])

#![cfg_attr(not(any(test, doctest)), no_std)]

mod descriptor;
mod gdt;
mod privilege;
mod segment;
mod selector;

pub use descriptor::{DescriptorBuilder, SegmentAccessRights, SegmentDescriptor, SegmentKind};
pub use gdt::{DescriptorTablePointer, FLAT_CS, FLAT_DS, FlatGdt};
pub use privilege::{Dpl, Rpl};
pub use segment::SegmentRegister;
pub use selector::{CodeSel, DataSel, SegmentSelector, SegmentSelectorRaw, SelectorKind, Table};
