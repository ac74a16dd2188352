//! # Typed segment selectors
//!
//! ```text
//!  15            3 2  1  0
//! +----------------+--+----+
//! |   Index[12:0]  |TI| RPL|
//! +----------------+--+----+  (TI=0 → GDT, TI=1 → LDT)
//! ```
//!
//! The marker parameter keeps a data selector out of CS and vice versa when
//! filling in a vCPU's initial segment registers.

use crate::privilege::Rpl;
use bitfield_struct::bitfield;
use core::marker::PhantomData;

/// Which descriptor table a selector addresses.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
#[repr(u8)]
pub enum Table {
    Gdt = 0,
    Ldt = 1,
}

impl Table {
    #[inline]
    pub const fn from_bits(bits: u8) -> Self {
        if bits == 0 { Self::Gdt } else { Self::Ldt }
    }

    #[inline]
    pub const fn into_bits(self) -> u8 {
        self as u8
    }
}

/// Raw 16-bit selector encoding.
#[bitfield(u16)]
#[derive(Eq, PartialEq)]
pub struct SegmentSelectorRaw {
    #[bits(2)]
    pub rpl: Rpl,
    #[bits(1)]
    pub ti: Table,
    #[bits(13)]
    pub index: u16,
}

pub trait SelectorKind: Copy {}

/// Selector for CS.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum CodeSel {}

/// Selector for DS/ES/FS/GS/SS.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum DataSel {}

impl SelectorKind for CodeSel {}
impl SelectorKind for DataSel {}

#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct SegmentSelector<K: SelectorKind>(SegmentSelectorRaw, PhantomData<K>);

impl<K: SelectorKind> SegmentSelector<K> {
    /// GDT selector for `index` with the given RPL.
    #[inline]
    #[must_use]
    pub const fn new(index: u16, rpl: Rpl) -> Self {
        Self(
            SegmentSelectorRaw::new()
                .with_index(index)
                .with_ti(Table::Gdt)
                .with_rpl(rpl),
            PhantomData,
        )
    }

    #[inline]
    #[must_use]
    pub const fn raw(self) -> SegmentSelectorRaw {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn index(self) -> u16 {
        self.0.index()
    }

    /// Encoded value as loaded into a segment register.
    #[inline]
    #[must_use]
    pub const fn encode(self) -> u16 {
        self.0.into_bits()
    }
}
