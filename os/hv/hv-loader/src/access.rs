//! Scoped guest-access bracket.
//!
//! On hosts running with SMAP, guest pages mapped into the hypervisor are
//! user pages, and supervisor stores to them fault unless `RFLAGS.AC` is set.
//! Writes that go through raw host mappings (as the boot-info writer does)
//! therefore open the bracket first and close it when done.
//!
//! The bracket is RAII: [`GuestAccess::enter`] returns a guard that closes it
//! on drop, so an early `?` return cannot leave access open.

/// A way to temporarily allow the hypervisor to touch guest-mapped pages.
pub trait GuestAccess {
    /// Allow access.
    fn open(&self);

    /// Revoke access again.
    fn close(&self);

    /// Open the bracket for the lifetime of the returned guard.
    #[must_use]
    fn enter(&self) -> GuestAccessGuard<'_, Self>
    where
        Self: Sized,
    {
        self.open();
        GuestAccessGuard { access: self }
    }
}

/// Closes the bracket on drop.
pub struct GuestAccessGuard<'a, A: GuestAccess> {
    access: &'a A,
}

impl<A: GuestAccess> Drop for GuestAccessGuard<'_, A> {
    fn drop(&mut self) {
        self.access.close();
    }
}

/// For hosts without SMAP.
#[derive(Debug, Copy, Clone, Default)]
pub struct NoopAccess;

impl GuestAccess for NoopAccess {
    #[inline]
    fn open(&self) {}

    #[inline]
    fn close(&self) {}
}

/// `stac` / `clac`.
#[cfg(all(feature = "smap", target_arch = "x86_64"))]
#[derive(Debug, Copy, Clone, Default)]
pub struct SmapAccess;

#[cfg(all(feature = "smap", target_arch = "x86_64"))]
impl GuestAccess for SmapAccess {
    #[inline(always)]
    #[allow(clippy::inline_always)]
    fn open(&self) {
        // Safety: only toggles RFLAGS.AC; requires CPL0 with SMAP enabled.
        unsafe {
            core::arch::asm!("stac", options(nomem, nostack));
        }
    }

    #[inline(always)]
    #[allow(clippy::inline_always)]
    fn close(&self) {
        // Safety: see `open`.
        unsafe {
            core::arch::asm!("clac", options(nomem, nostack));
        }
    }
}

/// The bracket used by [`TestKernelLoader`](crate::TestKernelLoader).
#[cfg(all(feature = "smap", target_arch = "x86_64"))]
pub type PlatformAccess = SmapAccess;

/// The bracket used by [`TestKernelLoader`](crate::TestKernelLoader).
#[cfg(not(all(feature = "smap", target_arch = "x86_64")))]
pub type PlatformAccess = NoopAccess;

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;

    #[derive(Default)]
    struct Counting {
        depth: Cell<i32>,
        opened: Cell<u32>,
    }

    impl GuestAccess for Counting {
        fn open(&self) {
            self.depth.set(self.depth.get() + 1);
            self.opened.set(self.opened.get() + 1);
        }

        fn close(&self) {
            self.depth.set(self.depth.get() - 1);
        }
    }

    fn copy() -> Result<(), ()> {
        Err(())
    }

    fn failing_write(access: &Counting) -> Result<(), ()> {
        let _guard = access.enter();
        assert_eq!(access.depth.get(), 1);
        copy()?;
        Ok(())
    }

    #[test]
    fn guard_closes_on_scope_exit() {
        let access = Counting::default();
        {
            let _guard = access.enter();
            assert_eq!(access.depth.get(), 1);
        }
        assert_eq!(access.depth.get(), 0);
        assert_eq!(access.opened.get(), 1);
    }

    #[test]
    fn guard_closes_on_error_path() {
        let access = Counting::default();
        assert!(failing_write(&access).is_err());
        assert_eq!(access.depth.get(), 0);
    }

    #[test]
    fn noop_is_inert() {
        let _guard = NoopAccess.enter();
    }
}
