//! # Code/data segment descriptors (typed builder)
//!
//! A legacy (non-system) descriptor is 8 bytes:
//!
//! ```text
//!  63     56 55 54 53 52 51  48 47 46 45 44 43  40 39     32 31          16 15           0
//! +---------+--+--+--+--+------+--+-----+--+------+---------+--------------+--------------+
//! | base_hi | G|DB| L|AV|lim_hi| P| DPL | S| type | base_mid|   base_lo    |   limit_lo   |
//! +---------+--+--+--+--+------+--+-----+--+------+---------+--------------+--------------+
//! ```
//!
//! Instead of embedding `0x00CF9B000000FFFF` in the loader, descriptors are
//! built from named fields via [`DescriptorBuilder`], so each property of the
//! flat boot table (base 0, 4 GiB span, ring 0, code vs. data, present) can be
//! checked on its own.

use crate::privilege::Dpl;
use bitfield_struct::bitfield;

/// Bit layout of a code/data segment descriptor.
#[bitfield(u64)]
#[derive(Eq, PartialEq)]
pub struct SegmentDescriptor {
    pub limit_lo: u16, // [15:0]
    pub base_lo: u16,  // [31:16]
    pub base_mid: u8,  // [39:32]
    #[bits(4)]
    pub typ: u8, // [43:40]
    pub s: bool, // [44]     1 = code/data
    #[bits(2)]
    pub dpl: Dpl, // [46:45]
    pub p: bool, // [47]
    #[bits(4)]
    pub limit_hi: u8, // [51:48]
    pub avl: bool,   // [52]
    pub l: bool,     // [53]     64-bit code
    pub db: bool,    // [54]     32-bit default operand size
    pub g: bool,     // [55]     4 KiB limit granularity
    pub base_hi: u8, // [63:56]
}

/// Attribute bytes (5 and 6) of a descriptor as a 16-bit value.
///
/// This is the segment "access rights" word a vCPU's hidden segment state is
/// programmed with, e.g. `0xCF9B` for a flat ring-0 code segment.
#[bitfield(u16)]
#[derive(Eq, PartialEq)]
pub struct SegmentAccessRights {
    #[bits(4)]
    pub typ: u8,
    pub s: bool,
    #[bits(2)]
    pub dpl: Dpl,
    pub p: bool,
    #[bits(4)]
    pub limit_hi: u8,
    pub avl: bool,
    pub l: bool,
    pub db: bool,
    pub g: bool,
}

/// Type-nibble bits shared by code and data descriptors.
mod type_bits {
    pub const ACCESSED: u8 = 0b0001;
    /// Code: readable. Data: writable.
    pub const READ_WRITE: u8 = 0b0010;
    /// Code: conforming. Data: expand-down.
    pub const CONFORMING_EXPAND_DOWN: u8 = 0b0100;
    pub const CODE: u8 = 0b1000;
}

/// What a non-system segment is used for.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum SegmentKind {
    Code { readable: bool, conforming: bool },
    Data { writable: bool, expand_down: bool },
}

impl SegmentKind {
    /// The type nibble, without the accessed bit.
    #[must_use]
    pub const fn type_nibble(self) -> u8 {
        match self {
            Self::Code {
                readable,
                conforming,
            } => {
                let mut t = type_bits::CODE;
                if readable {
                    t |= type_bits::READ_WRITE;
                }
                if conforming {
                    t |= type_bits::CONFORMING_EXPAND_DOWN;
                }
                t
            }
            Self::Data {
                writable,
                expand_down,
            } => {
                let mut t = 0;
                if writable {
                    t |= type_bits::READ_WRITE;
                }
                if expand_down {
                    t |= type_bits::CONFORMING_EXPAND_DOWN;
                }
                t
            }
        }
    }
}

/// Named-field builder for [`SegmentDescriptor`].
///
/// `limit` is the raw 20-bit limit field; with `granularity_4k` set it counts
/// 4 KiB units, so `0xF_FFFF` spans the full 4 GiB.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct DescriptorBuilder {
    base: u32,
    limit: u32,
    granularity_4k: bool,
    kind: SegmentKind,
    dpl: Dpl,
    present: bool,
    default_32bit: bool,
    accessed: bool,
}

impl DescriptorBuilder {
    /// Largest encodable raw limit.
    pub const MAX_LIMIT: u32 = 0xF_FFFF;

    /// A present, ring-0, byte-granular 16-bit segment of `kind` at base 0
    /// with a zero limit. Adjust with the setters below.
    #[must_use]
    pub const fn new(kind: SegmentKind) -> Self {
        Self {
            base: 0,
            limit: 0,
            granularity_4k: false,
            kind,
            dpl: Dpl::Ring0,
            present: true,
            default_32bit: false,
            accessed: false,
        }
    }

    /// Execute/read code, base 0, 4 GiB, 32-bit, ring 0, pre-marked accessed.
    #[must_use]
    pub const fn flat_code() -> Self {
        Self::new(SegmentKind::Code {
            readable: true,
            conforming: false,
        })
        .flat_4g()
    }

    /// Read/write data, base 0, 4 GiB, 32-bit, ring 0, pre-marked accessed.
    #[must_use]
    pub const fn flat_data() -> Self {
        Self::new(SegmentKind::Data {
            writable: true,
            expand_down: false,
        })
        .flat_4g()
    }

    const fn flat_4g(self) -> Self {
        self.base(0)
            .limit(Self::MAX_LIMIT)
            .granularity_4k(true)
            .default_32bit(true)
            .accessed(true)
    }

    #[must_use]
    pub const fn base(mut self, base: u32) -> Self {
        self.base = base;
        self
    }

    /// Raw 20-bit limit; higher bits are dropped.
    #[must_use]
    pub const fn limit(mut self, limit: u32) -> Self {
        self.limit = limit & Self::MAX_LIMIT;
        self
    }

    /// Count the limit in 4 KiB pages instead of bytes.
    #[must_use]
    pub const fn granularity_4k(mut self, on: bool) -> Self {
        self.granularity_4k = on;
        self
    }

    #[must_use]
    pub const fn dpl(mut self, dpl: Dpl) -> Self {
        self.dpl = dpl;
        self
    }

    #[must_use]
    pub const fn present(mut self, present: bool) -> Self {
        self.present = present;
        self
    }

    /// `D/B`: 32-bit default operand size and stack pointer.
    #[must_use]
    pub const fn default_32bit(mut self, on: bool) -> Self {
        self.default_32bit = on;
        self
    }

    /// The CPU sets the accessed bit on first load; setting it up front keeps
    /// the table read-only from the guest's point of view.
    #[must_use]
    pub const fn accessed(mut self, on: bool) -> Self {
        self.accessed = on;
        self
    }

    /// Encode as a code/data (`S = 1`) descriptor. `L` and `AVL` stay clear.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn build(self) -> SegmentDescriptor {
        let mut typ = self.kind.type_nibble();
        if self.accessed {
            typ |= type_bits::ACCESSED;
        }

        SegmentDescriptor::new()
            .with_limit_lo(self.limit as u16)
            .with_base_lo(self.base as u16)
            .with_base_mid((self.base >> 16) as u8)
            .with_typ(typ)
            .with_s(true)
            .with_dpl(self.dpl)
            .with_p(self.present)
            .with_limit_hi((self.limit >> 16) as u8)
            .with_avl(false)
            .with_l(false)
            .with_db(self.default_32bit)
            .with_g(self.granularity_4k)
            .with_base_hi((self.base >> 24) as u8)
    }
}

impl SegmentDescriptor {
    /// The mandatory all-zero entry 0.
    #[must_use]
    pub const fn null() -> Self {
        Self::new()
    }

    /// All 64 bits clear.
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.into_bits() == 0
    }

    /// The 32-bit base, reassembled from its three fields.
    #[must_use]
    pub const fn base(self) -> u32 {
        (self.base_lo() as u32) | ((self.base_mid() as u32) << 16) | ((self.base_hi() as u32) << 24)
    }

    /// Raw 20-bit limit field.
    #[must_use]
    pub const fn raw_limit(self) -> u32 {
        (self.limit_lo() as u32) | ((self.limit_hi() as u32) << 16)
    }

    /// Highest valid byte offset, honoring granularity.
    #[must_use]
    pub const fn limit_bytes(self) -> u32 {
        if self.g() {
            (self.raw_limit() << 12) | 0xFFF
        } else {
            self.raw_limit()
        }
    }

    /// Non-system descriptor with the executable bit set.
    #[must_use]
    pub const fn is_code(self) -> bool {
        self.s() && self.typ() & type_bits::CODE != 0
    }

    /// Non-system descriptor with the executable bit clear.
    #[must_use]
    pub const fn is_data(self) -> bool {
        self.s() && self.typ() & type_bits::CODE == 0
    }

    /// Base 0 and a limit covering the full 32-bit linear space.
    #[must_use]
    pub const fn is_flat_4g(self) -> bool {
        self.base() == 0 && self.limit_bytes() == u32::MAX
    }

    /// Bits 40..56, the form a vCPU's hidden segment state takes.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn access_rights(self) -> SegmentAccessRights {
        SegmentAccessRights::from_bits((self.into_bits() >> 40) as u16)
    }

    /// Little-endian table encoding.
    #[must_use]
    pub const fn to_bytes(self) -> [u8; 8] {
        self.into_bits().to_le_bytes()
    }
}

const _: () = {
    assert!(size_of::<SegmentDescriptor>() == 8);
    assert!(size_of::<SegmentAccessRights>() == 2);
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_code_matches_architectural_encoding() {
        let code = DescriptorBuilder::flat_code().build();
        assert_eq!(code.into_bits(), 0x00CF_9B00_0000_FFFF);
        assert!(code.is_code());
        assert!(code.is_flat_4g());
        assert!(code.p());
        assert_eq!(code.dpl(), Dpl::Ring0);
        assert!(code.db());
        assert!(!code.l());
    }

    #[test]
    fn flat_data_matches_architectural_encoding() {
        let data = DescriptorBuilder::flat_data().build();
        assert_eq!(data.into_bits(), 0x00CF_9300_0000_FFFF);
        assert!(data.is_data());
        assert!(data.is_flat_4g());
        assert_eq!(data.dpl(), Dpl::Ring0);
    }

    #[test]
    fn access_rights_are_attribute_bytes() {
        assert_eq!(
            DescriptorBuilder::flat_code().build().access_rights().into_bits(),
            0xCF9B
        );
        assert_eq!(
            DescriptorBuilder::flat_data().build().access_rights().into_bits(),
            0xCF93
        );
    }

    #[test]
    fn base_and_limit_are_split_across_fields() {
        let d = DescriptorBuilder::flat_data()
            .base(0x1234_5678)
            .limit(0x0_0FFF)
            .granularity_4k(false)
            .dpl(Dpl::Ring3)
            .build();
        assert_eq!(d.base(), 0x1234_5678);
        assert_eq!(d.base_hi(), 0x12);
        assert_eq!(d.base_mid(), 0x34);
        assert_eq!(d.base_lo(), 0x5678);
        assert_eq!(d.limit_bytes(), 0xFFF);
        assert!(!d.is_flat_4g());
        assert_eq!(d.dpl(), Dpl::Ring3);
    }

    #[test]
    fn limit_is_masked_to_twenty_bits() {
        let d = DescriptorBuilder::flat_code().limit(u32::MAX).build();
        assert_eq!(d.raw_limit(), DescriptorBuilder::MAX_LIMIT);
    }

    #[test]
    fn not_present_clears_p() {
        let d = DescriptorBuilder::flat_code().present(false).build();
        assert!(!d.p());
        assert_eq!(d.access_rights().into_bits() & 0x80, 0);
    }

    #[test]
    fn null_descriptor() {
        assert!(SegmentDescriptor::null().is_null());
        assert_eq!(SegmentDescriptor::null().to_bytes(), [0; 8]);
    }
}
