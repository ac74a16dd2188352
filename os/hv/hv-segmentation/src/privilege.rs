//! Privilege levels as they appear in descriptors (DPL) and selectors (RPL).
//!
//! A guest booted by the test loader runs entirely at ring 0, but both types
//! carry all four levels so the bit encodings round-trip.

/// Descriptor Privilege Level, bits 45–46 of a segment descriptor.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
#[repr(u8)]
pub enum Dpl {
    Ring0 = 0,
    Ring1 = 1,
    Ring2 = 2,
    Ring3 = 3,
}

impl Dpl {
    #[inline]
    pub const fn into_bits(self) -> u8 {
        self as u8
    }

    #[inline]
    pub const fn from_bits(v: u8) -> Self {
        match v & 0b11 {
            0 => Self::Ring0,
            1 => Self::Ring1,
            2 => Self::Ring2,
            _ => Self::Ring3,
        }
    }
}

/// Requested Privilege Level, the low two bits of a selector.
///
/// For data segment loads the CPU checks `max(CPL, RPL) ≤ DPL`.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
#[repr(u8)]
pub enum Rpl {
    Ring0 = 0,
    Ring1 = 1,
    Ring2 = 2,
    Ring3 = 3,
}

impl Rpl {
    #[inline]
    pub const fn into_bits(self) -> u16 {
        self as u16
    }

    #[inline]
    pub const fn from_bits(v: u16) -> Self {
        match v & 0b11 {
            0 => Self::Ring0,
            1 => Self::Ring1,
            2 => Self::Ring2,
            _ => Self::Ring3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_roundtrip() {
        for b in 0u8..=3 {
            assert_eq!(Dpl::from_bits(b).into_bits(), b);
            assert_eq!(Rpl::from_bits(u16::from(b)).into_bits(), u16::from(b));
        }
        // Only the low two bits participate.
        assert_eq!(Dpl::from_bits(0b111), Dpl::Ring3);
    }
}
