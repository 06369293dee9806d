//! The kernel context: everything the boot path builds and the trap entry
//! needs afterwards.

use ember_common::{IdtError, MemoryStats};
use ember_hal::InterruptController;
use spin::{Mutex, MutexGuard};

use crate::interrupts::{InterruptDescriptorTable, Interrupts};
use crate::memory::PhysicalMemoryManager;

/// Gate table, IRQ routing and the frame allocator.
///
/// Built once in `kernel_main` from parts that are already initialized: a
/// populated gate table, a remapped controller and a PMM that has consumed
/// the boot memory map.
pub struct Kernel<C> {
    idt: InterruptDescriptorTable,
    interrupts: Interrupts<C>,
    memory: Mutex<PhysicalMemoryManager>,
}

impl<C: InterruptController> Kernel<C> {
    pub fn new(idt: InterruptDescriptorTable, controller: C, memory: PhysicalMemoryManager) -> Self {
        Self {
            idt,
            interrupts: Interrupts::new(controller),
            memory: Mutex::new(memory),
        }
    }

    pub fn idt(&self) -> &InterruptDescriptorTable {
        &self.idt
    }

    pub fn interrupts(&self) -> &Interrupts<C> {
        &self.interrupts
    }

    /// Locks the frame allocator.
    ///
    /// IRQ handlers that allocate must not run while boot code holds this.
    pub fn memory(&self) -> MutexGuard<'_, PhysicalMemoryManager> {
        self.memory.lock()
    }

    pub fn memory_stats(&self) -> MemoryStats {
        self.memory.lock().stats()
    }

    /// Loads the gate table and then lets interrupts in.
    ///
    /// Nothing reaches the CPU if the table is incomplete.
    pub fn activate_interrupts(&'static self) -> Result<(), IdtError> {
        self.idt.load()?;
        #[cfg(target_arch = "x86_64")]
        crate::arch::x86_64::enable_interrupts();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::x86_64::pic::ChainedPics;
    use crate::boot::multiboot::BootInformation;
    use crate::interrupts::InterruptFrame;
    use crate::testutil::{BootInfoBuilder, RecordingPorts};

    fn kernel() -> Kernel<ChainedPics<RecordingPorts>> {
        let bytes = BootInfoBuilder::new()
            .memory_map(&[(0x20_0000, 0x60_0000, 1)])
            .build();
        let info = BootInformation::from_bytes(&bytes, 0x9000).unwrap();
        let mut pmm = PhysicalMemoryManager::new();
        pmm.init(&info);
        Kernel::new(
            InterruptDescriptorTable::new(),
            ChainedPics::new(RecordingPorts::new()),
            pmm,
        )
    }

    #[test]
    fn test_incomplete_table_is_never_activated() {
        let kernel: &'static _ = Box::leak(Box::new(kernel()));
        assert_eq!(kernel.activate_interrupts(), Err(IdtError::GateMissing(0)));
    }

    #[test]
    fn test_handler_allocates_from_context() {
        static CONTEXT: spin::Once<Kernel<ChainedPics<RecordingPorts>>> = spin::Once::new();
        static HANDLER: fn(&mut InterruptFrame) = |frame| {
            if let Some(kernel) = CONTEXT.get() {
                frame.rax = kernel.memory().allocate_frame().map_or(0, |addr| addr.as_u64());
            }
        };
        let kernel = CONTEXT.call_once(kernel);
        kernel.interrupts().install_handler(0, &HANDLER).unwrap();

        let mut frame = InterruptFrame::for_vector(32);
        kernel.interrupts().dispatch(&mut frame);

        assert_eq!(frame.rax, 0x20_0000);
        let stats = kernel.memory_stats();
        assert_eq!(stats.free, 0x60_0000 - 0x1000);
        assert!(stats.is_consistent());
    }
}
