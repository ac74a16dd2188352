use log::info;

use crate::pio::{AccessWidth, IoRange, PioHandler};
use crate::vm::{VirtualCpu, VirtualMachine};

/// Port a test kernel writes to when it is done.
///
/// Any write pauses every vCPU of the VM; reads are inert and float high.
#[derive(Debug, Copy, Clone, Default)]
pub struct CompletionPort;

impl CompletionPort {
    pub const BASE: u16 = 0xF4;
    pub const LEN: u16 = 4;
    pub const RANGE: IoRange = IoRange::new(Self::BASE, Self::LEN);
}

impl<V: VirtualMachine + ?Sized> PioHandler<V> for CompletionPort {
    fn read(&self, _vm: &V, _port: u16, width: AccessWidth) -> u32 {
        width.all_ones()
    }

    fn write(&self, vm: &V, port: u16, _width: AccessWidth, value: u32) -> bool {
        info!(
            "{}: test kernel signalled completion ({value:#x} to port {port:#x}), pausing {} vCPU(s)",
            vm.id(),
            vm.vcpus().len()
        );
        for vcpu in vm.vcpus() {
            vcpu.request_pause();
        }
        true
    }
}
