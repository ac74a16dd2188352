use core::sync::atomic::{AtomicU8, Ordering};

/// Execution state of one vCPU.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum VcpuRunState {
    /// Created, not yet entered.
    Init = 0,
    Running = 1,
    /// A pause was requested; the vCPU stops at its next exit.
    PausePending = 2,
    /// No guest instructions execute until resumed.
    Paused = 3,
}

impl VcpuRunState {
    const fn from_raw(v: u8) -> Self {
        match v {
            0 => Self::Init,
            1 => Self::Running,
            2 => Self::PausePending,
            _ => Self::Paused,
        }
    }
}

/// Lock-free run-state cell shared between a vCPU thread and other CPUs.
///
/// `request_pause` may be called from any thread any number of times; only
/// the first call on a running (or not yet started) vCPU changes anything.
/// The owning vCPU thread calls [`RunState::settle`] on every exit to turn a
/// pending request into [`VcpuRunState::Paused`].
#[derive(Debug)]
pub struct RunState(AtomicU8);

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

impl RunState {
    #[must_use]
    pub const fn new() -> Self {
        Self(AtomicU8::new(VcpuRunState::Init as u8))
    }

    #[must_use]
    pub fn get(&self) -> VcpuRunState {
        VcpuRunState::from_raw(self.0.load(Ordering::Acquire))
    }

    /// `Init -> Running`. Returns whether this call started the vCPU.
    pub fn start(&self) -> bool {
        self.transition(VcpuRunState::Init, VcpuRunState::Running)
    }

    /// Ask the vCPU to pause. Never blocks.
    ///
    /// Returns whether this call placed the request.
    pub fn request_pause(&self) -> bool {
        let mut current = self.0.load(Ordering::Acquire);
        loop {
            match VcpuRunState::from_raw(current) {
                VcpuRunState::Init | VcpuRunState::Running => {}
                VcpuRunState::PausePending | VcpuRunState::Paused => return false,
            }
            match self.0.compare_exchange_weak(
                current,
                VcpuRunState::PausePending as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    #[must_use]
    pub fn pause_requested(&self) -> bool {
        matches!(
            self.get(),
            VcpuRunState::PausePending | VcpuRunState::Paused
        )
    }

    /// `PausePending -> Paused`; called by the vCPU thread at an exit.
    pub fn settle(&self) -> bool {
        self.transition(VcpuRunState::PausePending, VcpuRunState::Paused)
    }

    /// `Paused -> Running`.
    pub fn resume(&self) -> bool {
        self.transition(VcpuRunState::Paused, VcpuRunState::Running)
    }

    fn transition(&self, from: VcpuRunState, to: VcpuRunState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}
