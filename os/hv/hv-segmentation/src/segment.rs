use crate::descriptor::{SegmentAccessRights, SegmentDescriptor};

/// Visible selector plus the hidden descriptor cache of one segment register.
///
/// A vCPU that is entered directly in protected mode never executes the
/// segment load itself, so the hypervisor fills the cache from the table.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub struct SegmentRegister {
    pub selector: u16,
    pub base: u64,
    pub limit: u32,
    pub access_rights: SegmentAccessRights,
}

impl SegmentRegister {
    /// Cache state for `selector` referencing `descriptor`.
    #[must_use]
    pub const fn from_descriptor(selector: u16, descriptor: SegmentDescriptor) -> Self {
        Self {
            selector,
            base: descriptor.base() as u64,
            limit: descriptor.limit_bytes(),
            access_rights: descriptor.access_rights(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FLAT_CS, FlatGdt};

    #[test]
    fn cached_state_follows_descriptor() {
        let cs = SegmentRegister::from_descriptor(FLAT_CS.encode(), FlatGdt::new().code());
        assert_eq!(cs.selector, 0x08);
        assert_eq!(cs.base, 0);
        assert_eq!(cs.limit, 0xFFFF_FFFF);
        assert_eq!(cs.access_rights.into_bits(), 0xCF9B);
    }
}
