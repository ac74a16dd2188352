//! # Hypervisor Debug Console
//!
//! Logging backend for the hypervisor while it is itself being run under
//! QEMU during VM-launch testing. Records from the `log` facade are formatted
//! as `"[LEVEL] target: message"` and pushed byte by byte into a
//! [`ConsoleSink`].
//!
//! ## Sinks
//! * [`DebugPortSink`] (feature `debugcon`, x86 only): QEMU's debug console on
//!   I/O port `0x402`. Capture it on the host with `-debugcon stdio`.
//! * Any other [`ConsoleSink`], e.g. a serial driver or an in-memory buffer.
//!
//! ## Setup
//! ```rust,ignore
//! use log::LevelFilter;
//!
//! hv_console::install_debug_port_logger(LevelFilter::Debug)?;
//! log::info!("loader ready");
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod logger;
mod sink;

pub use logger::ConsoleLogger;
#[cfg(feature = "debugcon")]
pub use logger::install_debug_port_logger;
#[cfg(feature = "debugcon")]
pub use sink::DebugPortSink;
pub use sink::{ConsoleSink, SinkWriter};
