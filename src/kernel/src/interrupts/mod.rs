//! Interrupt descriptor table, register snapshots and dispatch.
//!
//! Vectors 0-31 are CPU exceptions, 32-47 the sixteen legacy IRQ lines after
//! the PIC remap. Nothing above 47 is routed.

mod dispatch;
pub mod exception;
mod frame;
pub mod idt;

pub use dispatch::{Dispatch, Interrupts, IrqHandler};
pub use exception::CpuException;
pub use frame::InterruptFrame;
pub use idt::{GateDescriptor, InterruptDescriptorTable};

/// Number of legacy IRQ lines.
pub const IRQ_LINES: usize = 16;

/// Vector of IRQ line 0.
pub const IRQ_BASE_VECTOR: u8 = 32;

/// Vectors that get an entry stub.
pub const USED_VECTORS: usize = IRQ_BASE_VECTOR as usize + IRQ_LINES;

/// Kernel code segment set up by the boot trampoline's GDT.
pub const KERNEL_CODE_SELECTOR: u16 = 0x08;
