//! Checks run inside the kernel once boot has finished.

use ember_common::IrqError;
use ember_hal::InterruptController;
use log::{error, info};

use crate::drivers::KEYBOARD_IRQ;
use crate::interrupts::{exception, IRQ_LINES};
use crate::kernel::Kernel;
use crate::memory::selftest::leak_check;

/// Frames the leak check allocates.
const LEAK_CHECK_FRAMES: usize = 5;

type Check<C> = fn(&Kernel<C>) -> Result<(), &'static str>;

/// Runs every boot self-test and returns `true` if all passed.
pub fn run_all<C: InterruptController>(kernel: &Kernel<C>) -> bool {
    let checks: [(&str, Check<C>); 4] = [
        ("frame_leak", frame_leak),
        ("memory_accounting", memory_accounting),
        ("gate_table", gate_table),
        ("irq_routing", irq_routing),
    ];

    info!("running {} self-tests", checks.len());
    let mut passed = 0;
    for (name, check) in checks {
        match check(kernel) {
            Ok(()) => {
                info!("test {} ... ok", name);
                passed += 1;
            }
            Err(reason) => error!("test {} ... FAILED: {}", name, reason),
        }
    }
    info!("{} of {} self-tests passed", passed, checks.len());
    passed == checks.len()
}

fn frame_leak<C: InterruptController>(kernel: &Kernel<C>) -> Result<(), &'static str> {
    let report = leak_check::<LEAK_CHECK_FRAMES>(&mut kernel.memory())
        .map_err(|_| "not enough free frames")?;
    if report.is_clean() {
        Ok(())
    } else {
        Err("used memory changed across allocate/free")
    }
}

fn memory_accounting<C: InterruptController>(kernel: &Kernel<C>) -> Result<(), &'static str> {
    if kernel.memory_stats().is_consistent() {
        Ok(())
    } else {
        Err("total != used + free")
    }
}

fn gate_table<C: InterruptController>(kernel: &Kernel<C>) -> Result<(), &'static str> {
    let idt = kernel.idt();
    idt.validate().map_err(|_| "a routed vector has no gate")?;
    if idt.gate(exception::DOUBLE_FAULT).stack_index() == 0 {
        return Err("double fault runs on the faulting stack");
    }
    Ok(())
}

fn irq_routing<C: InterruptController>(kernel: &Kernel<C>) -> Result<(), &'static str> {
    let interrupts = kernel.interrupts();
    if !interrupts.handler_installed(KEYBOARD_IRQ) {
        return Err("no keyboard handler");
    }
    match interrupts.remove_handler(IRQ_LINES as u8) {
        Err(IrqError::LineOutOfRange(_)) => Ok(()),
        Ok(()) => Err("line 16 accepted"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::x86_64::pic::ChainedPics;
    use crate::boot::multiboot::BootInformation;
    use crate::interrupts::{InterruptDescriptorTable, InterruptFrame, USED_VECTORS};
    use crate::memory::PhysicalMemoryManager;
    use crate::testutil::{BootInfoBuilder, RecordingPorts};

    fn kernel(complete_table: bool) -> Kernel<ChainedPics<RecordingPorts>> {
        let bytes = BootInfoBuilder::new()
            .memory_map(&[(0x20_0000, 0x60_0000, 1)])
            .build();
        let info = BootInformation::from_bytes(&bytes, 0x9000).unwrap();
        let mut pmm = PhysicalMemoryManager::new();
        pmm.init(&info);

        let mut idt = InterruptDescriptorTable::new();
        if complete_table {
            idt.install_stubs(&[0x10_0000; USED_VECTORS], 0x08);
            idt.set_stack_index(exception::DOUBLE_FAULT, 1);
        }
        Kernel::new(idt, ChainedPics::new(RecordingPorts::new()), pmm)
    }

    static NOOP: fn(&mut InterruptFrame) = |_| {};

    #[test]
    fn test_all_pass_on_a_booted_kernel() {
        let kernel = kernel(true);
        kernel.interrupts().install_handler(KEYBOARD_IRQ, &NOOP).unwrap();
        assert!(run_all(&kernel));
    }

    #[test]
    fn test_double_fault_needs_its_own_stack() {
        let mut idt = InterruptDescriptorTable::new();
        idt.install_stubs(&[0x10_0000; USED_VECTORS], 0x08);
        let kernel = Kernel::new(
            idt,
            ChainedPics::new(RecordingPorts::new()),
            PhysicalMemoryManager::new(),
        );
        assert_eq!(
            gate_table(&kernel),
            Err("double fault runs on the faulting stack")
        );
    }

    #[test]
    fn test_missing_pieces_fail() {
        let kernel = kernel(false);
        assert!(!run_all(&kernel));
        assert_eq!(gate_table(&kernel), Err("a routed vector has no gate"));
        assert_eq!(irq_routing(&kernel), Err("no keyboard handler"));
        assert_eq!(frame_leak(&kernel), Ok(()));
    }
}
