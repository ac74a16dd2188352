//! # Multiboot Header Scanner
//!
//! The header must sit within the first 8 KiB of the image at a 32-bit
//! aligned offset. It consists of three little-endian words whose sum is
//! zero modulo 2³²:
//!
//! ```text
//! +0  magic     0x1BADB002
//! +4  flags
//! +8  checksum  -(magic + flags)
//! ```
//!
//! Test kernels place their first instruction immediately after the header,
//! so the entry offset is `header_offset + 12`.

use crate::HEADER_MAGIC;

/// Bytes from the image start that may contain the header.
pub const SEARCH_WINDOW: usize = 8 * 1024;

/// Required header alignment.
pub const HEADER_ALIGN: usize = 4;

/// Size of `(magic, flags, checksum)`.
pub const HEADER_LEN: usize = 12;

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HeaderError {
    #[error("no multiboot header in the first {} bytes of a {image_len}-byte image", SEARCH_WINDOW)]
    NotFound { image_len: usize },
}

/// A decoded multiboot header.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MultibootHeader {
    pub magic: u32,
    pub flags: u32,
    pub checksum: u32,
}

impl MultibootHeader {
    /// Decode three words at `offset`, without validating them.
    ///
    /// Returns `None` if fewer than 12 bytes remain.
    #[must_use]
    pub fn parse_at(image: &[u8], offset: usize) -> Option<Self> {
        let bytes = image.get(offset..offset.checked_add(HEADER_LEN)?)?;
        let word = |i: usize| u32::from_le_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]);
        Some(Self {
            magic: word(0),
            flags: word(4),
            checksum: word(8),
        })
    }

    /// Magic matches and the three words sum to zero.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.magic == HEADER_MAGIC
            && self
                .magic
                .wrapping_add(self.flags)
                .wrapping_add(self.checksum)
                == 0
    }

    /// A valid header for the given flags.
    #[must_use]
    pub const fn with_flags(flags: u32) -> Self {
        Self {
            magic: HEADER_MAGIC,
            flags,
            checksum: 0u32.wrapping_sub(HEADER_MAGIC).wrapping_sub(flags),
        }
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[0..4].copy_from_slice(&self.magic.to_le_bytes());
        out[4..8].copy_from_slice(&self.flags.to_le_bytes());
        out[8..12].copy_from_slice(&self.checksum.to_le_bytes());
        out
    }
}

/// Offset of the first valid header within the search window.
#[must_use]
pub fn find_header(image: &[u8]) -> Option<usize> {
    (0..SEARCH_WINDOW)
        .step_by(HEADER_ALIGN)
        .map_while(|offset| MultibootHeader::parse_at(image, offset).map(|h| (offset, h)))
        .find_map(|(offset, h)| h.is_valid().then_some(offset))
}

/// Entry offset (header offset + 12) relative to the image start.
///
/// # Errors
/// [`HeaderError::NotFound`] if no valid header exists in the window.
#[allow(clippy::cast_possible_truncation)]
pub fn find_entry_offset(image: &[u8]) -> Result<u32, HeaderError> {
    find_header(image)
        // Bounded by SEARCH_WINDOW, always fits.
        .map(|offset| (offset + HEADER_LEN) as u32)
        .ok_or(HeaderError::NotFound {
            image_len: image.len(),
        })
}
