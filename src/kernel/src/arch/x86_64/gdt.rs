//! Runtime GDT with a task state segment.
//!
//! Replaces the trampoline's boot GDT so the double fault handler gets its
//! own stack: a kernel stack overflow then ends in the fatal diagnostic
//! instead of a triple fault. Selectors keep the boot layout, 0x08 code and
//! 0x10 data, with the TSS after them.

use core::cell::UnsafeCell;

use spin::Once;
use x86_64::structures::gdt::{Descriptor, GlobalDescriptorTable, SegmentSelector};
use x86_64::structures::tss::TaskStateSegment;
use x86_64::VirtAddr;

/// Interrupt stack table slot for double faults, as written into the gate.
pub const DOUBLE_FAULT_IST: u8 = 1;

const DOUBLE_FAULT_STACK_SIZE: usize = 4096 * 5;

#[repr(C, align(16))]
struct Stack(UnsafeCell<[u8; DOUBLE_FAULT_STACK_SIZE]>);

// SAFETY: only the CPU touches the stack, on a double fault.
unsafe impl Sync for Stack {}

static DOUBLE_FAULT_STACK: Stack = Stack(UnsafeCell::new([0; DOUBLE_FAULT_STACK_SIZE]));

static TSS: Once<TaskStateSegment> = Once::new();
static GDT: Once<(GlobalDescriptorTable, Selectors)> = Once::new();

/// Segment selectors of the runtime GDT.
#[derive(Debug, Clone, Copy)]
pub struct Selectors {
    pub code: SegmentSelector,
    pub data: SegmentSelector,
    pub tss: SegmentSelector,
}

/// A TSS whose double fault slot points at `stack_top`.
fn task_state(stack_top: VirtAddr) -> TaskStateSegment {
    let mut tss = TaskStateSegment::new();
    tss.interrupt_stack_table[usize::from(DOUBLE_FAULT_IST - 1)] = stack_top;
    tss
}

fn descriptor_table(tss: &'static TaskStateSegment) -> (GlobalDescriptorTable, Selectors) {
    let mut gdt = GlobalDescriptorTable::new();
    let code = gdt.append(Descriptor::kernel_code_segment());
    let data = gdt.append(Descriptor::kernel_data_segment());
    let tss = gdt.append(Descriptor::tss_segment(tss));
    (gdt, Selectors { code, data, tss })
}

/// Loads the runtime GDT, reloads the segment registers and the task
/// register. Later calls do nothing.
pub fn init() -> Selectors {
    let mut first = false;
    let (gdt, selectors) = GDT.call_once(|| {
        first = true;
        let tss = TSS.call_once(|| {
            let stack_bottom = VirtAddr::from_ptr(DOUBLE_FAULT_STACK.0.get());
            task_state(stack_bottom + DOUBLE_FAULT_STACK_SIZE as u64)
        });
        descriptor_table(tss)
    });
    if first {
        use x86_64::instructions::segmentation::{Segment, CS, DS, ES, SS};
        use x86_64::instructions::tables::load_tss;

        gdt.load();
        // SAFETY: the selectors index the table just loaded and it lives
        // for the rest of the kernel's life.
        unsafe {
            CS::set_reg(selectors.code);
            DS::set_reg(selectors.data);
            ES::set_reg(selectors.data);
            SS::set_reg(selectors.data);
            load_tss(selectors.tss);
        }
    }
    *selectors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interrupts::KERNEL_CODE_SELECTOR;

    #[test]
    fn test_double_fault_stack_slot() {
        let tss = task_state(VirtAddr::new(0x40_5000));
        let interrupt_stack_table = tss.interrupt_stack_table;
        assert_eq!(interrupt_stack_table[0], VirtAddr::new(0x40_5000));
        assert!(interrupt_stack_table[1..].iter().all(|top| top.is_null()));
    }

    #[test]
    fn test_selectors_keep_boot_layout() {
        let tss: &'static _ = Box::leak(Box::new(task_state(VirtAddr::new(0x1000))));
        let (_, selectors) = descriptor_table(tss);

        assert_eq!(selectors.code.0, KERNEL_CODE_SELECTOR);
        assert_eq!(selectors.data.0, 0x10);
        assert_eq!(selectors.tss.0, 0x18);
    }
}
