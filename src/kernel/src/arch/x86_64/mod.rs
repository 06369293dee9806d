//! x86_64 architecture support.
//!
//! Boot trampoline, runtime GDT, port I/O, the 8259 PIC pair, the trap
//! entry, and the VGA and serial outputs.

pub mod gdt;
pub mod pic;
pub mod port;
pub mod serial;
pub mod trap;
pub mod vga;

pub use port::HardwarePorts;
pub use serial::SERIAL;
pub use trap::Pics;
pub use vga::{Color, Writer, WRITER};

#[cfg(target_os = "none")]
core::arch::global_asm!(include_str!("boot.s"), options(att_syntax));

/// Halts the CPU until the next interrupt.
#[inline]
pub fn hlt() {
    x86_64::instructions::hlt();
}

/// Sets IF so the PIC's lines reach the CPU.
#[inline]
pub fn enable_interrupts() {
    x86_64::instructions::interrupts::enable();
}

/// Idles forever, waking only to service interrupts.
pub fn halt_loop() -> ! {
    loop {
        hlt();
    }
}

/// Stops the CPU for good: interrupts off, then `hlt`.
pub fn halt() -> ! {
    x86_64::instructions::interrupts::disable();
    halt_loop()
}
