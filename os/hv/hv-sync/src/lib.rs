//! # Hypervisor synchronization primitives
//!
//! Spin-based primitives for state shared between vCPU exit handlers running
//! on different physical CPUs. No blocking, no allocation.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod spin_lock;
mod sync_once_cell;

pub use spin_lock::{SpinLock, SpinLockGuard};
pub use sync_once_cell::SyncOnceCell;
