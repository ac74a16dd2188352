use hv_addresses::{GuestPhysicalAddress, HostPhysicalAddress, HostVirtualAddress};
use hv_segmentation::{DescriptorTablePointer, FlatGdt};
use log::{debug, trace};

use crate::error::{GuestMemoryError, LoadError};

/// Guest RAM as seen from the hypervisor.
///
/// # Safety
/// An address returned by [`gpa_to_hva`](Self::gpa_to_hva) must be valid for
/// writes of the requested length, and must not alias memory the hypervisor
/// otherwise references, until the memory is next borrowed.
pub unsafe trait GuestMemory {
    /// Host-physical page backing `gpa`.
    ///
    /// # Errors
    /// If `gpa` is not backed.
    fn gpa_to_hpa(&self, gpa: GuestPhysicalAddress) -> Result<HostPhysicalAddress, GuestMemoryError>;

    /// The hypervisor's own mapping of `len` bytes at `gpa`.
    ///
    /// # Errors
    /// If any part of the range is not mapped into the hypervisor.
    fn gpa_to_hva(&mut self, gpa: GuestPhysicalAddress, len: usize) -> Result<HostVirtualAddress, GuestMemoryError>;

    /// Copy `bytes` to guest-physical `gpa`.
    ///
    /// # Errors
    /// If any part of the destination is not backed.
    fn copy_to_gpa(&mut self, bytes: &[u8], gpa: GuestPhysicalAddress) -> Result<(), GuestMemoryError>;
}

/// The hypervisor's own boot-time descriptor state.
#[derive(Debug, Copy, Clone)]
pub struct HostBootContext<'a> {
    pub gdt: DescriptorTablePointer,
    /// At least `gdt.limit + 1` bytes of the table.
    pub gdt_image: &'a [u8],
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AliasOutcome {
    /// The host table's address maps elsewhere in the guest; copied there.
    Copied { hpa: HostPhysicalAddress },
    /// Guest and host see the table at the same address.
    Identity,
}

/// Typed write operations the loader performs on guest RAM.
pub struct GuestMemoryWriter<'m, M: GuestMemory> {
    memory: &'m mut M,
}

impl<'m, M: GuestMemory> GuestMemoryWriter<'m, M> {
    pub const fn new(memory: &'m mut M) -> Self {
        Self { memory }
    }

    /// # Errors
    /// Propagates the collaborator's failure.
    pub fn write(&mut self, gpa: GuestPhysicalAddress, bytes: &[u8]) -> Result<(), GuestMemoryError> {
        trace!("write {} bytes to {gpa}", bytes.len());
        self.memory.copy_to_gpa(bytes, gpa)
    }

    /// Store `bytes` at `gpa` through the hypervisor's mapping of the page.
    ///
    /// On SMAP hosts the caller holds a [`GuestAccessGuard`](crate::GuestAccessGuard).
    ///
    /// # Errors
    /// If the range has no host mapping.
    pub fn write_mapped(&mut self, gpa: GuestPhysicalAddress, bytes: &[u8]) -> Result<(), GuestMemoryError> {
        let hva = self.memory.gpa_to_hva(gpa, bytes.len())?;
        trace!("write {} bytes to {gpa} via {hva}", bytes.len());
        // SAFETY: `GuestMemory` guarantees `bytes.len()` writable bytes at `hva`
        // while `self.memory` stays borrowed, and `bytes` cannot alias guest RAM.
        unsafe { core::ptr::copy_nonoverlapping(bytes.as_ptr(), hva.as_mut_ptr::<u8>(), bytes.len()) };
        Ok(())
    }

    /// # Errors
    /// Propagates the collaborator's failure.
    pub fn write_kernel(&mut self, load: GuestPhysicalAddress, image: &[u8]) -> Result<(), GuestMemoryError> {
        debug!("copying {}-byte kernel image to {load}", image.len());
        self.write(load, image)
    }

    /// # Errors
    /// Propagates the collaborator's failure.
    pub fn write_gdt(&mut self, at: GuestPhysicalAddress, gdt: &FlatGdt) -> Result<(), GuestMemoryError> {
        debug!("writing {}-entry GDT to {at}", FlatGdt::ENTRIES);
        self.write(at, &gdt.to_bytes())
    }

    /// Make the host GDT visible to the guest at the address the host uses.
    ///
    /// The base is looked up as if it were a guest address. When that lookup
    /// lands on the very same host page the table is already shared and
    /// nothing is copied.
    ///
    /// # Errors
    /// [`LoadError::HostGdtTruncated`] if the context carries fewer bytes than
    /// the limit covers, or the collaborator's failure.
    pub fn alias_host_gdt(&mut self, host: &HostBootContext<'_>) -> Result<AliasOutcome, LoadError> {
        let base = GuestPhysicalAddress::from(host.gdt.base.as_u64());
        let hpa = self.memory.gpa_to_hpa(base)?;
        if hpa == base.as_identity_hpa() {
            trace!("host GDT at {base} is identity mapped");
            return Ok(AliasOutcome::Identity);
        }

        let table = host
            .gdt_image
            .get(..host.gdt.byte_len())
            .ok_or(LoadError::HostGdtTruncated {
                limit: host.gdt.limit,
                available: host.gdt_image.len(),
            })?;
        debug!("aliasing host GDT ({} bytes) at {base}, backed by {hpa}", table.len());
        self.write(base, table)?;
        Ok(AliasOutcome::Copied { hpa })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hv_addresses::MemoryAddress;

    /// 64 KiB of RAM whose host-physical backing starts at `hpa_base`.
    struct Ram {
        bytes: Vec<u8>,
        hpa_base: u64,
    }

    impl Ram {
        fn new(hpa_base: u64) -> Self {
            Self {
                bytes: vec![0; 0x1_0000],
                hpa_base,
            }
        }

        fn check(&self, gpa: GuestPhysicalAddress, len: usize) -> Result<usize, GuestMemoryError> {
            let start = usize::try_from(gpa.as_u64()).unwrap();
            if start + len > self.bytes.len() {
                return Err(GuestMemoryError::OutOfRange { gpa, len });
            }
            Ok(start)
        }
    }

    // SAFETY: mapped ranges are bounds checked and point into `bytes`.
    unsafe impl GuestMemory for Ram {
        fn gpa_to_hpa(&self, gpa: GuestPhysicalAddress) -> Result<HostPhysicalAddress, GuestMemoryError> {
            self.check(gpa, 1)
                .map_err(|_| GuestMemoryError::Unmapped { gpa })?;
            Ok(HostPhysicalAddress::new(self.hpa_base + gpa.as_u64()))
        }

        fn gpa_to_hva(&mut self, gpa: GuestPhysicalAddress, len: usize) -> Result<HostVirtualAddress, GuestMemoryError> {
            let start = self.check(gpa, len)?;
            Ok(HostVirtualAddress::from_ptr(self.bytes.as_mut_ptr().wrapping_add(start)))
        }

        fn copy_to_gpa(&mut self, bytes: &[u8], gpa: GuestPhysicalAddress) -> Result<(), GuestMemoryError> {
            let start = self.check(gpa, bytes.len())?;
            self.bytes[start..start + bytes.len()].copy_from_slice(bytes);
            Ok(())
        }
    }

    fn host_gdt(base: u64, image: &[u8]) -> HostBootContext<'_> {
        let limit = u16::try_from(image.len() - 1).unwrap();
        HostBootContext {
            gdt: DescriptorTablePointer::new(MemoryAddress::new(base), limit),
            gdt_image: image,
        }
    }

    #[test]
    fn identity_mapped_host_gdt_is_not_copied() {
        let mut ram = Ram::new(0);
        let image = [0xAA; 24];
        let outcome = GuestMemoryWriter::new(&mut ram)
            .alias_host_gdt(&host_gdt(0x1000, &image))
            .unwrap();
        assert_eq!(outcome, AliasOutcome::Identity);
        assert!(ram.bytes[0x1000..0x1018].iter().all(|&b| b == 0));
    }

    #[test]
    fn relocated_host_gdt_is_copied_to_its_base() {
        let mut ram = Ram::new(0x8000_0000);
        let image: Vec<u8> = (0u8..40).collect();
        let outcome = GuestMemoryWriter::new(&mut ram)
            .alias_host_gdt(&host_gdt(0x2000, &image))
            .unwrap();
        assert_eq!(
            outcome,
            AliasOutcome::Copied {
                hpa: HostPhysicalAddress::new(0x8000_2000)
            }
        );
        assert_eq!(&ram.bytes[0x2000..0x2028], image.as_slice());
        assert_eq!(ram.bytes[0x2028], 0);
    }

    #[test]
    fn host_gdt_shorter_than_limit_is_rejected() {
        let mut ram = Ram::new(0x100_0000);
        let image = [0u8; 8];
        let host = HostBootContext {
            gdt: DescriptorTablePointer::new(MemoryAddress::new(0x2000), 23),
            gdt_image: &image,
        };
        assert_eq!(
            GuestMemoryWriter::new(&mut ram).alias_host_gdt(&host),
            Err(LoadError::HostGdtTruncated {
                limit: 23,
                available: 8
            })
        );
    }

    #[test]
    fn unmapped_host_gdt_base_propagates() {
        let mut ram = Ram::new(0x100_0000);
        let image = [0u8; 24];
        let err = GuestMemoryWriter::new(&mut ram)
            .alias_host_gdt(&host_gdt(0x10_0000, &image))
            .unwrap_err();
        assert!(matches!(err, LoadError::GuestMemory(GuestMemoryError::Unmapped { .. })));
    }

    #[test]
    fn gdt_lands_as_little_endian_entries() {
        let mut ram = Ram::new(0);
        GuestMemoryWriter::new(&mut ram)
            .write_gdt(GuestPhysicalAddress::new(0x800), &FlatGdt::new())
            .unwrap();
        let entry = |i: usize| u64::from_le_bytes(ram.bytes[0x800 + i * 8..0x808 + i * 8].try_into().unwrap());
        assert_eq!(entry(0), 0);
        assert_eq!(entry(1), 0x00CF_9B00_0000_FFFF);
        assert_eq!(entry(2), 0x00CF_9300_0000_FFFF);
    }

    #[test]
    fn mapped_write_lands_in_guest_ram() {
        let mut ram = Ram::new(0x4000_0000);
        GuestMemoryWriter::new(&mut ram)
            .write_mapped(GuestPhysicalAddress::new(0x3000), b"multiboot")
            .unwrap();
        assert_eq!(&ram.bytes[0x3000..0x3009], b"multiboot");
        assert_eq!(ram.bytes[0x3009], 0);
    }

    #[test]
    fn mapped_write_past_the_end_touches_nothing() {
        let mut ram = Ram::new(0);
        let err = GuestMemoryWriter::new(&mut ram)
            .write_mapped(GuestPhysicalAddress::new(0xFFFC), &[0xAB; 8])
            .unwrap_err();
        assert_eq!(
            err,
            GuestMemoryError::OutOfRange {
                gpa: GuestPhysicalAddress::new(0xFFFC),
                len: 8
            }
        );
        assert!(ram.bytes[0xFFFC..].iter().all(|&b| b == 0));
    }

    #[test]
    fn kernel_write_out_of_range_fails() {
        let mut ram = Ram::new(0);
        let err = GuestMemoryWriter::new(&mut ram)
            .write_kernel(GuestPhysicalAddress::new(0xFFF0), &[0; 32])
            .unwrap_err();
        assert_eq!(
            err,
            GuestMemoryError::OutOfRange {
                gpa: GuestPhysicalAddress::new(0xFFF0),
                len: 32
            }
        );
    }
}
