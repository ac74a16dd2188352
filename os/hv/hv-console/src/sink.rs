use core::fmt;

/// Byte-oriented output channel for console text.
pub trait ConsoleSink: Send + Sync {
    fn write_bytes(&self, bytes: &[u8]);
}

impl<S: ConsoleSink + ?Sized> ConsoleSink for &S {
    fn write_bytes(&self, bytes: &[u8]) {
        (**self).write_bytes(bytes);
    }
}

/// [`fmt::Write`] adapter over a sink; never allocates.
pub struct SinkWriter<'a, S: ConsoleSink + ?Sized>(pub &'a S);

impl<S: ConsoleSink + ?Sized> fmt::Write for SinkWriter<'_, S> {
    #[inline]
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0.write_bytes(s.as_bytes());
        Ok(())
    }
}

/// QEMU's `-debugcon` port.
#[cfg(feature = "debugcon")]
#[derive(Copy, Clone, Debug, Default)]
pub struct DebugPortSink;

#[cfg(feature = "debugcon")]
impl DebugPortSink {
    /// The port QEMU's ISA debug console listens on.
    pub const PORT: u16 = 0x402;
}

#[cfg(feature = "debugcon")]
impl ConsoleSink for DebugPortSink {
    fn write_bytes(&self, bytes: &[u8]) {
        for &b in bytes {
            // Safety: port 0x402 is an output-only debug port; the hypervisor
            // runs at CPL0. On real hardware the write is decoded by nothing.
            unsafe { outb(Self::PORT, b) }
        }
    }
}

#[cfg(all(feature = "debugcon", any(target_arch = "x86", target_arch = "x86_64")))]
#[inline]
unsafe fn outb(port: u16, val: u8) {
    unsafe {
        core::arch::asm!(
            "out dx, al",
            in("dx") port,
            in("al") val,
            options(nomem, nostack, preserves_flags)
        );
    }
}

#[cfg(all(feature = "debugcon", not(any(target_arch = "x86", target_arch = "x86_64"))))]
#[inline]
unsafe fn outb(_port: u16, _val: u8) {}
