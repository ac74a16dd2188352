//! Port I/O handler registry.
//!
//! A VM owns one [`PioBus`] and forwards `IN`/`OUT` exits to it. Handlers are
//! stored in fixed slots named by [`PioHandlerIndex`] and are called without
//! the bus lock held, so a handler may itself inspect the VM.

use alloc::sync::Arc;
use core::fmt;

use hv_sync::SpinLock;
use log::{trace, warn};

/// Width of a single port access.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AccessWidth {
    Byte = 1,
    Word = 2,
    Dword = 4,
}

impl AccessWidth {
    /// Value read from a floating bus.
    #[must_use]
    pub const fn all_ones(self) -> u32 {
        match self {
            Self::Byte => 0xFF,
            Self::Word => 0xFFFF,
            Self::Dword => 0xFFFF_FFFF,
        }
    }
}

/// `[base, base + len)` in port space.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct IoRange {
    pub base: u16,
    pub len: u16,
}

impl IoRange {
    #[must_use]
    pub const fn new(base: u16, len: u16) -> Self {
        Self { base, len }
    }

    const fn end(self) -> u32 {
        self.base as u32 + self.len as u32
    }

    #[must_use]
    pub const fn contains(self, port: u16) -> bool {
        port >= self.base && (port as u32) < self.end()
    }

    #[must_use]
    pub const fn overlaps(self, other: Self) -> bool {
        (self.base as u32) < other.end() && (other.base as u32) < self.end()
    }
}

impl fmt::Display for IoRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}..{:#x}", self.base, self.end())
    }
}

/// Fixed handler slots.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PioHandlerIndex {
    Serial,
    Pci,
    Rtc,
    /// Debug/completion device used by test kernels.
    TestDevice,
}

impl PioHandlerIndex {
    pub const COUNT: usize = 4;
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PioError {
    #[error("handler slot {0:?} is already in use")]
    SlotOccupied(PioHandlerIndex),
    #[error("ports {range} overlap those of {existing:?}")]
    Overlap {
        range: IoRange,
        existing: PioHandlerIndex,
    },
    #[error("empty port range")]
    EmptyRange,
}

/// An emulated device on the port bus.
///
/// `V` is the VM the access came from, passed in at dispatch time.
pub trait PioHandler<V: ?Sized>: Send + Sync {
    /// `IN`: value to return to the guest.
    fn read(&self, vm: &V, port: u16, width: AccessWidth) -> u32;

    /// `OUT`: returns whether the write was accepted.
    fn write(&self, vm: &V, port: u16, width: AccessWidth, value: u32) -> bool;
}

/// Outcome of a dispatched access.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PioResult {
    /// A handler took the access; for reads, carries the value.
    Handled(u32),
    /// A handler owns the port but refused the write.
    Rejected,
    /// No handler owns the port.
    Unclaimed,
}

impl PioResult {
    /// Value to place in `AL`/`AX`/`EAX` for a read.
    #[must_use]
    pub const fn read_value(self, width: AccessWidth) -> u32 {
        match self {
            Self::Handled(v) => v,
            Self::Rejected | Self::Unclaimed => width.all_ones(),
        }
    }
}

struct Slot<V: ?Sized> {
    range: IoRange,
    handler: Arc<dyn PioHandler<V>>,
}

impl<V: ?Sized> Clone for Slot<V> {
    fn clone(&self) -> Self {
        Self {
            range: self.range,
            handler: Arc::clone(&self.handler),
        }
    }
}

/// Port I/O registry for one VM.
pub struct PioBus<V: ?Sized> {
    slots: SpinLock<[Option<Slot<V>>; PioHandlerIndex::COUNT]>,
}

impl<V: ?Sized> Default for PioBus<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: ?Sized> PioBus<V> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: SpinLock::new([None, None, None, None]),
        }
    }

    /// # Errors
    /// If `index` is taken, `range` is empty or overlaps another slot.
    pub fn register(
        &self,
        index: PioHandlerIndex,
        range: IoRange,
        handler: Arc<dyn PioHandler<V>>,
    ) -> Result<(), PioError> {
        if range.len == 0 {
            return Err(PioError::EmptyRange);
        }

        self.slots.with_lock(|slots| {
            if slots[index as usize].is_some() {
                return Err(PioError::SlotOccupied(index));
            }
            if let Some(existing) = Self::owner_of(slots, |s| s.range.overlaps(range)) {
                return Err(PioError::Overlap { range, existing });
            }
            slots[index as usize] = Some(Slot { range, handler });
            trace!("{index:?} handles ports {range}");
            Ok(())
        })
    }

    #[must_use]
    pub fn is_registered(&self, index: PioHandlerIndex) -> bool {
        self.slots.with_lock(|slots| slots[index as usize].is_some())
    }

    #[must_use]
    pub fn range_of(&self, index: PioHandlerIndex) -> Option<IoRange> {
        self.slots
            .with_lock(|slots| slots[index as usize].as_ref().map(|s| s.range))
    }

    pub fn read(&self, vm: &V, port: u16, width: AccessWidth) -> PioResult {
        match self.lookup(port) {
            Some(slot) => PioResult::Handled(slot.handler.read(vm, port, width)),
            None => {
                trace!("unclaimed read from port {port:#x}");
                PioResult::Unclaimed
            }
        }
    }

    pub fn write(&self, vm: &V, port: u16, width: AccessWidth, value: u32) -> PioResult {
        let Some(slot) = self.lookup(port) else {
            trace!("unclaimed write of {value:#x} to port {port:#x}");
            return PioResult::Unclaimed;
        };
        if slot.handler.write(vm, port, width, value) {
            PioResult::Handled(0)
        } else {
            warn!("write of {value:#x} to port {port:#x} rejected");
            PioResult::Rejected
        }
    }

    fn lookup(&self, port: u16) -> Option<Slot<V>> {
        self.slots.with_lock(|slots| {
            slots
                .iter()
                .flatten()
                .find(|s| s.range.contains(port))
                .cloned()
        })
    }

    fn owner_of(
        slots: &[Option<Slot<V>>; PioHandlerIndex::COUNT],
        pred: impl Fn(&Slot<V>) -> bool,
    ) -> Option<PioHandlerIndex> {
        const ALL: [PioHandlerIndex; PioHandlerIndex::COUNT] = [
            PioHandlerIndex::Serial,
            PioHandlerIndex::Pci,
            PioHandlerIndex::Rtc,
            PioHandlerIndex::TestDevice,
        ];
        ALL.into_iter()
            .zip(slots)
            .find_map(|(index, slot)| slot.as_ref().filter(|s| pred(s)).map(|_| index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Default)]
    struct Latch {
        last: AtomicU32,
    }

    impl PioHandler<()> for Latch {
        fn read(&self, _vm: &(), _port: u16, _width: AccessWidth) -> u32 {
            self.last.load(Ordering::SeqCst)
        }

        fn write(&self, _vm: &(), _port: u16, _width: AccessWidth, value: u32) -> bool {
            if value == 0xDEAD {
                return false;
            }
            self.last.store(value, Ordering::SeqCst);
            true
        }
    }

    #[test]
    fn range_arithmetic() {
        let r = IoRange::new(0xF4, 4);
        assert!(!r.contains(0xF3));
        assert!(r.contains(0xF4));
        assert!(r.contains(0xF7));
        assert!(!r.contains(0xF8));
        assert!(r.overlaps(IoRange::new(0xF7, 1)));
        assert!(!r.overlaps(IoRange::new(0xF8, 8)));
        assert!(IoRange::new(0xFFFF, 1).contains(0xFFFF));
    }

    #[test]
    fn dispatch_to_owner() {
        let bus = PioBus::<()>::new();
        bus.register(PioHandlerIndex::TestDevice, IoRange::new(0xF4, 4), Arc::new(Latch::default()))
            .unwrap();

        assert_eq!(bus.write(&(), 0xF6, AccessWidth::Word, 7), PioResult::Handled(0));
        assert_eq!(bus.read(&(), 0xF4, AccessWidth::Dword), PioResult::Handled(7));
        assert_eq!(bus.write(&(), 0xF4, AccessWidth::Dword, 0xDEAD), PioResult::Rejected);
    }

    #[test]
    fn unclaimed_reads_float_high() {
        let bus = PioBus::<()>::new();
        let r = bus.read(&(), 0x80, AccessWidth::Word);
        assert_eq!(r, PioResult::Unclaimed);
        assert_eq!(r.read_value(AccessWidth::Word), 0xFFFF);
        assert_eq!(bus.write(&(), 0x80, AccessWidth::Byte, 1), PioResult::Unclaimed);
    }

    #[test]
    fn registration_conflicts() {
        let bus = PioBus::<()>::new();
        let latch: Arc<dyn PioHandler<()>> = Arc::new(Latch::default());
        bus.register(PioHandlerIndex::TestDevice, IoRange::new(0xF4, 4), latch.clone())
            .unwrap();

        assert_eq!(
            bus.register(PioHandlerIndex::TestDevice, IoRange::new(0x10, 1), latch.clone()),
            Err(PioError::SlotOccupied(PioHandlerIndex::TestDevice))
        );
        assert_eq!(
            bus.register(PioHandlerIndex::Serial, IoRange::new(0xF0, 5), latch.clone()),
            Err(PioError::Overlap {
                range: IoRange::new(0xF0, 5),
                existing: PioHandlerIndex::TestDevice
            })
        );
        assert_eq!(
            bus.register(PioHandlerIndex::Rtc, IoRange::new(0x70, 0), latch.clone()),
            Err(PioError::EmptyRange)
        );
        bus.register(PioHandlerIndex::Serial, IoRange::new(0x3F8, 8), latch)
            .unwrap();
        assert_eq!(bus.range_of(PioHandlerIndex::Serial), Some(IoRange::new(0x3F8, 8)));
        assert!(!bus.is_registered(PioHandlerIndex::Pci));
    }
}
