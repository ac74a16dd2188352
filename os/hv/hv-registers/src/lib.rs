//! # Typed x86 Guest Registers
//!
//! Register models used when composing a vCPU's initial state. Nothing here
//! touches the host CPU; values are handed to the vCPU collaborator, which
//! programs them into its VMCS/VMCB or emulated register file.

#![cfg_attr(not(any(test, doctest)), no_std)]

pub mod cr0;
pub mod gpr;

pub use cr0::Cr0;
pub use gpr::{GeneralPurposeRegisters, Gpr};
