//! Per-VM configuration.

use alloc::sync::Arc;

/// Which software loader prepares a VM's boot state.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum LoaderKind {
    /// The regular guest OS loader, provided by the embedding hypervisor.
    #[default]
    Production,
    /// The multiboot test-kernel loader from this crate.
    UnitTest,
}

/// Settings a VM is created with.
///
/// Built with [`VmConfig::new`] and the `with_*` methods:
///
/// ```
/// # use hv_loader::{LoaderKind, VmConfig};
/// let cfg = VmConfig::new(64 << 20).with_bootargs("selftest=vmx").unit_test();
/// assert_eq!(cfg.loader, LoaderKind::UnitTest);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmConfig {
    /// Guest RAM in bytes.
    pub memory_size: u64,
    /// Kernel command line; copied verbatim (up to the buffer size).
    pub bootargs: Arc<str>,
    /// Which loader [`select_loader`](crate::select_loader) hands out.
    pub loader: LoaderKind,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            memory_size: 0,
            bootargs: Arc::from(""),
            loader: LoaderKind::default(),
        }
    }
}

impl VmConfig {
    /// `memory_size` bytes of RAM, no command line, production loader.
    #[must_use]
    pub fn new(memory_size: u64) -> Self {
        Self {
            memory_size,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn with_memory_size(mut self, memory_size: u64) -> Self {
        self.memory_size = memory_size;
        self
    }

    /// Command line handed to the kernel. Longer than 2047 bytes is cut.
    #[must_use]
    pub fn with_bootargs(mut self, bootargs: impl Into<Arc<str>>) -> Self {
        self.bootargs = bootargs.into();
        self
    }

    #[must_use]
    pub const fn with_loader(mut self, loader: LoaderKind) -> Self {
        self.loader = loader;
        self
    }

    /// Shorthand for `with_loader(LoaderKind::UnitTest)`.
    #[must_use]
    pub const fn unit_test(self) -> Self {
        self.with_loader(LoaderKind::UnitTest)
    }
}
