use crate::{MemoryAddress, PageSize};
use core::fmt;
use core::ops::{Add, AddAssign};

/// Generates one address-space wrapper around [`MemoryAddress`].
///
/// Every space gets the same surface; only the debug tag differs.
macro_rules! address_space {
    ($(#[$meta:meta])* $name:ident, $tag:literal) => {
        $(#[$meta])*
        #[repr(transparent)]
        #[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
        pub struct $name(MemoryAddress);

        impl $name {
            #[inline]
            #[must_use]
            pub const fn new(v: u64) -> Self {
                Self(MemoryAddress::new(v))
            }

            #[inline]
            #[must_use]
            pub const fn zero() -> Self {
                Self::new(0)
            }

            #[inline]
            #[must_use]
            pub const fn as_u64(self) -> u64 {
                self.0.as_u64()
            }

            #[inline]
            #[must_use]
            pub const fn raw(self) -> MemoryAddress {
                self.0
            }

            #[inline]
            #[must_use]
            pub const fn checked_add(self, rhs: u64) -> Option<Self> {
                match self.0.checked_add(rhs) {
                    Some(a) => Some(Self(a)),
                    None => None,
                }
            }

            #[inline]
            #[must_use]
            pub const fn checked_sub(self, rhs: u64) -> Option<Self> {
                match self.0.checked_sub(rhs) {
                    Some(a) => Some(Self(a)),
                    None => None,
                }
            }

            #[inline]
            #[must_use]
            pub const fn is_aligned<S: PageSize>(self) -> bool {
                self.0.is_aligned::<S>()
            }

            #[inline]
            #[must_use]
            pub const fn try_as_u32(self) -> Option<u32> {
                self.0.try_as_u32()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($tag, "(0x{:016X})"), self.as_u64())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<u64> for $name {
            #[inline]
            fn from(v: u64) -> Self {
                Self::new(v)
            }
        }

        impl From<$name> for u64 {
            #[inline]
            fn from(a: $name) -> Self {
                a.as_u64()
            }
        }

        impl Add<u64> for $name {
            type Output = Self;
            #[inline]
            fn add(self, rhs: u64) -> Self::Output {
                Self(self.0 + rhs)
            }
        }

        impl AddAssign<u64> for $name {
            #[inline]
            fn add_assign(&mut self, rhs: u64) {
                self.0 += rhs;
            }
        }
    };
}

address_space!(
    /// Guest-physical address (GPA).
    ///
    /// What the guest sees as physical memory. Only meaningful relative to
    /// one VM; translate through the VM's memory collaborator before touching
    /// the bytes.
    GuestPhysicalAddress,
    "GPA"
);

address_space!(
    /// Host-physical address (HPA) backing a guest page.
    ///
    /// During early boot the hypervisor's own structures may be identity
    /// aliased, i.e. a GPA can translate to the numerically same HPA.
    HostPhysicalAddress,
    "HPA"
);

address_space!(
    /// Host-virtual address (HVA): the hypervisor's mapping of an HPA.
    HostVirtualAddress,
    "HVA"
);

impl HostVirtualAddress {
    #[inline]
    #[must_use]
    pub fn from_ptr<T>(ptr: *const T) -> Self {
        Self::new(ptr as usize as u64)
    }

    /// The address as a raw pointer. Dereferencing it is up to the caller.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn as_mut_ptr<T>(self) -> *mut T {
        self.as_u64() as usize as *mut T
    }
}

impl GuestPhysicalAddress {
    /// Same numeric value viewed as a host-physical address.
    ///
    /// Used for the identity-alias check; not a translation.
    #[inline]
    #[must_use]
    pub const fn as_identity_hpa(self) -> HostPhysicalAddress {
        HostPhysicalAddress(self.0)
    }
}
