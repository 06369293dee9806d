//! Ember kernel
//!
//! The bootstrap core of a freestanding x86_64 kernel: it takes over from a
//! Multiboot2 loader, routes CPU exceptions and legacy IRQs to kernel code,
//! and hands out physical memory in 4 KiB frames.
//!
//! # Architecture
//!
//! - `arch`: boot trampoline, trap entry, PIC, port I/O, VGA and serial
//! - `boot`: Multiboot2 information reader and boot progress display
//! - `interrupts`: gate table, register snapshot and IRQ dispatch
//! - `memory`: bitmap physical frame allocator
//! - `kernel`: the context tying these together after boot
//!
//! # Safety
//!
//! Outside of host unit tests this is a `#![no_std]` kernel. All unsafe code
//! states the invariant it relies on.

#![cfg_attr(not(test), no_std)]

pub mod arch;
pub mod boot;
pub mod drivers;
pub mod interrupts;
pub mod kernel;
pub mod logger;
pub mod memory;
pub mod selftest;
pub mod testutil;

pub use kernel::Kernel;

/// Brings up the diagnostic outputs: serial, the `log` backend and VGA.
///
/// Safe to call more than once; only the first call has an effect.
#[cfg(target_arch = "x86_64")]
pub fn init() {
    arch::x86_64::serial::init();
    if let Err(e) = logger::init() {
        crate::serial_println!("[WARN] kernel log not installed: {}", e);
    }
    arch::x86_64::vga::init();
}
