//! # Test-Kernel Guest Loader
//!
//! Boots a minimal multiboot test kernel inside a VM so the hypervisor's
//! launch path can be exercised without a production guest. One call to
//! [`SoftwareLoader::load`] on a [`TestKernelLoader`]:
//!
//! 1. makes sure the VM has a bootstrap processor,
//! 2. copies the host GDT into the guest if the guest would otherwise see a
//!    different page at that address,
//! 3. locates the multiboot header and derives the entry point,
//! 4. copies the image to 4 MiB and a flat GDT to 2 MiB,
//! 5. writes the multiboot info block and command line below the image,
//! 6. loads the BSP with a flat protected-mode register state,
//! 7. installs the [`CompletionPort`] on I/O ports `0xF4..0xF8` and records
//!    the entry point in the VM's [`KernelInfo`].
//!
//! A test kernel ends its run with a single `out 0xF4, al`; the VM's vCPUs
//! are then paused and the harness can inspect the result.
//!
//! ## Collaborators
//! The hypervisor supplies the [`VirtualMachine`], [`VirtualCpu`] and
//! [`GuestMemory`] implementations. [`PioBus`] and [`RunState`] are ready-made
//! building blocks for those.
//!
//! ## Features
//! * `smap`: bracket raw guest writes with `stac`/`clac` (x86_64 only).

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

extern crate alloc;

pub mod access;
pub mod boot_info;
pub mod boot_state;
pub mod completion;
pub mod config;
pub mod error;
pub mod guest_memory;
pub mod loader;
pub mod pio;
pub mod run_state;
pub mod vm;

pub use access::{GuestAccess, GuestAccessGuard, NoopAccess, PlatformAccess};
pub use boot_state::InitialCpuState;
pub use completion::CompletionPort;
pub use config::{LoaderKind, VmConfig};
pub use error::{GuestMemoryError, LoadError};
pub use guest_memory::{AliasOutcome, GuestMemory, GuestMemoryWriter, HostBootContext};
pub use loader::{SoftwareLoader, TestKernelLoader, select_loader};
pub use pio::{AccessWidth, IoRange, PioBus, PioError, PioHandler, PioHandlerIndex, PioResult};
pub use run_state::{RunState, VcpuRunState};
pub use vm::{KernelInfo, VcpuId, VirtualCpu, VirtualMachine, VmId};
