use crate::descriptor::{DescriptorBuilder, SegmentDescriptor};
use crate::privilege::Rpl;
use crate::selector::{CodeSel, DataSel, SegmentSelector};
use hv_addresses::MemoryAddress;

/// Ring-0 code selector into [`FlatGdt`] (index 1).
pub const FLAT_CS: SegmentSelector<CodeSel> = SegmentSelector::<CodeSel>::new(1, Rpl::Ring0);

/// Ring-0 data/stack selector into [`FlatGdt`] (index 2).
pub const FLAT_DS: SegmentSelector<DataSel> = SegmentSelector::<DataSel>::new(2, Rpl::Ring0);

const _: () = {
    assert!(FLAT_CS.encode() == 0x08);
    assert!(FLAT_DS.encode() == 0x10);
};

/// GDTR/IDTR contents: the table's linear base and its size minus one.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub struct DescriptorTablePointer {
    pub base: MemoryAddress,
    pub limit: u16,
}

impl DescriptorTablePointer {
    #[must_use]
    pub const fn new(base: MemoryAddress, limit: u16) -> Self {
        Self { base, limit }
    }

    /// Number of bytes the CPU reads from `base`.
    #[must_use]
    pub const fn byte_len(self) -> usize {
        self.limit as usize + 1
    }
}

/// Three-entry table for a flat 32-bit protected-mode guest.
#[repr(C, align(8))]
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct FlatGdt {
    null: SegmentDescriptor, // 0
    code: SegmentDescriptor, // 1
    data: SegmentDescriptor, // 2
}

impl Default for FlatGdt {
    fn default() -> Self {
        Self::new()
    }
}

impl FlatGdt {
    pub const ENTRIES: usize = 3;

    /// Size in bytes.
    pub const SIZE: usize = Self::ENTRIES * size_of::<SegmentDescriptor>();

    /// GDTR limit for this table (`3 * 8 - 1`).
    #[allow(clippy::cast_possible_truncation)]
    pub const LIMIT: u16 = (Self::SIZE - 1) as u16;

    #[must_use]
    pub const fn new() -> Self {
        Self {
            null: SegmentDescriptor::null(),
            code: DescriptorBuilder::flat_code().build(),
            data: DescriptorBuilder::flat_data().build(),
        }
    }

    #[must_use]
    pub const fn entries(&self) -> [SegmentDescriptor; Self::ENTRIES] {
        [self.null, self.code, self.data]
    }

    #[must_use]
    pub const fn code(&self) -> SegmentDescriptor {
        self.code
    }

    #[must_use]
    pub const fn data(&self) -> SegmentDescriptor {
        self.data
    }

    /// Pointer for this table placed at `base`.
    #[must_use]
    pub const fn pointer_at(base: MemoryAddress) -> DescriptorTablePointer {
        DescriptorTablePointer::new(base, Self::LIMIT)
    }

    /// Little-endian image as it must appear in guest memory.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        for (chunk, entry) in out.chunks_exact_mut(8).zip(self.entries()) {
            chunk.copy_from_slice(&entry.to_bytes());
        }
        out
    }
}

const _: () = {
    assert!(size_of::<FlatGdt>() == FlatGdt::SIZE);
    assert!(FlatGdt::LIMIT == 23);
};
