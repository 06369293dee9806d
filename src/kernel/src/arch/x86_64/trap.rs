//! Per-vector entry stubs and the Rust side of the common trap entry.
//!
//! Each stub leaves the stack in the shape of [`InterruptFrame`]: a dummy
//! error code when the CPU pushed none, the vector, then the general purpose
//! registers pushed by `trap_common`.

use log::error;
use spin::Once;
use x86_64::registers::control::Cr2;

use super::pic::ChainedPics;
use super::port::HardwarePorts;
use crate::interrupts::{Dispatch, InterruptFrame};
use crate::kernel::Kernel;

/// The PIC pair on real hardware.
pub type Pics = ChainedPics<HardwarePorts>;

static KERNEL: Once<Kernel<Pics>> = Once::new();

/// Parks `kernel` where the trap entry can find it.
///
/// The first context wins; later calls return it and drop their argument.
pub fn install(kernel: Kernel<Pics>) -> &'static Kernel<Pics> {
    KERNEL.call_once(|| kernel)
}

/// The installed kernel context, if any.
pub fn kernel() -> Option<&'static Kernel<Pics>> {
    KERNEL.get()
}

#[cfg_attr(not(target_os = "none"), allow(dead_code))]
extern "C" fn trap_entry(frame: *mut InterruptFrame) {
    // SAFETY: `trap_common` passes its stack pointer, which points at a
    // complete frame that stays put until we return.
    let frame = unsafe { &mut *frame };
    let Some(kernel) = KERNEL.get() else {
        panic!("interrupt {} before the kernel context exists", frame.vector);
    };

    match kernel.interrupts().dispatch(frame) {
        Dispatch::Irq { .. } => {}
        Dispatch::Fatal(exception) => {
            kernel.interrupts().silence();
            error!("{}", exception);
            if exception.is_page_fault() {
                panic!("{}\n  cr2={:#018x}", exception, Cr2::read_raw());
            }
            panic!("{}", exception);
        }
        Dispatch::Unrouted(vector) => {
            kernel.interrupts().silence();
            panic!("interrupt on unrouted vector {} at rip={:#x}", vector, frame.rip);
        }
    }
}

#[cfg(target_os = "none")]
pub use stubs::stub_addresses;

#[cfg(target_os = "none")]
mod stubs {
    use core::arch::naked_asm;

    use super::trap_entry;
    use crate::interrupts::USED_VECTORS;

    #[unsafe(naked)]
    extern "C" fn trap_common() {
        naked_asm!(
            "push rax",
            "push rbx",
            "push rcx",
            "push rdx",
            "push rsi",
            "push rdi",
            "push rbp",
            "push r8",
            "push r9",
            "push r10",
            "push r11",
            "push r12",
            "push r13",
            "push r14",
            "push r15",
            "mov rdi, rsp",
            "cld",
            "call {entry}",
            "pop r15",
            "pop r14",
            "pop r13",
            "pop r12",
            "pop r11",
            "pop r10",
            "pop r9",
            "pop r8",
            "pop rbp",
            "pop rdi",
            "pop rsi",
            "pop rdx",
            "pop rcx",
            "pop rbx",
            "pop rax",
            // vector and error code
            "add rsp, 16",
            "iretq",
            entry = sym trap_entry,
        )
    }

    macro_rules! stubs {
        (@stub $name:ident, $vector:literal) => {
            #[unsafe(naked)]
            extern "C" fn $name() {
                naked_asm!(
                    "push 0",
                    "push {vector}",
                    "jmp {common}",
                    vector = const $vector,
                    common = sym trap_common,
                )
            }
        };
        (@stub $name:ident, $vector:literal, error_code) => {
            #[unsafe(naked)]
            extern "C" fn $name() {
                naked_asm!(
                    "push {vector}",
                    "jmp {common}",
                    vector = const $vector,
                    common = sym trap_common,
                )
            }
        };
        ($($name:ident = $vector:literal $(, $error_code:ident)?;)*) => {
            $(stubs!(@stub $name, $vector $(, $error_code)?);)*

            static STUBS: [extern "C" fn(); USED_VECTORS] = [$($name),*];
        };
    }

    stubs! {
        vector_0 = 0;
        vector_1 = 1;
        vector_2 = 2;
        vector_3 = 3;
        vector_4 = 4;
        vector_5 = 5;
        vector_6 = 6;
        vector_7 = 7;
        vector_8 = 8, error_code;
        vector_9 = 9;
        vector_10 = 10, error_code;
        vector_11 = 11, error_code;
        vector_12 = 12, error_code;
        vector_13 = 13, error_code;
        vector_14 = 14, error_code;
        vector_15 = 15;
        vector_16 = 16;
        vector_17 = 17, error_code;
        vector_18 = 18;
        vector_19 = 19;
        vector_20 = 20;
        vector_21 = 21, error_code;
        vector_22 = 22;
        vector_23 = 23;
        vector_24 = 24;
        vector_25 = 25;
        vector_26 = 26;
        vector_27 = 27;
        vector_28 = 28;
        vector_29 = 29, error_code;
        vector_30 = 30, error_code;
        vector_31 = 31;
        vector_32 = 32;
        vector_33 = 33;
        vector_34 = 34;
        vector_35 = 35;
        vector_36 = 36;
        vector_37 = 37;
        vector_38 = 38;
        vector_39 = 39;
        vector_40 = 40;
        vector_41 = 41;
        vector_42 = 42;
        vector_43 = 43;
        vector_44 = 44;
        vector_45 = 45;
        vector_46 = 46;
        vector_47 = 47;
    }

    /// Entry addresses of the stubs for vectors `0..48`, in vector order.
    pub fn stub_addresses() -> [u64; USED_VECTORS] {
        STUBS.map(|stub| stub as usize as u64)
    }
}
