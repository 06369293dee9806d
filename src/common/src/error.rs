//! System-wide error types for Ember.

use core::fmt;

/// Physical memory errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MemoryError {
    /// Every managed frame is in use.
    OutOfFrames,
}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryError::OutOfFrames => write!(f, "out of physical frames"),
        }
    }
}

/// IRQ handler registration errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IrqError {
    /// The IRQ line is not one of the 16 legacy lines.
    LineOutOfRange(u8),
}

impl fmt::Display for IrqError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrqError::LineOutOfRange(line) => {
                write!(f, "IRQ line {} out of range (0..16)", line)
            }
        }
    }
}

/// Interrupt descriptor table errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IdtError {
    /// A vector that must be routed has no present gate.
    GateMissing(u8),
}

impl fmt::Display for IdtError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdtError::GateMissing(vector) => {
                write!(f, "no gate installed for vector {}", vector)
            }
        }
    }
}

/// Boot information parsing errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BootInfoError {
    /// The pointer handed over by the bootloader was null.
    NullPointer,
    /// The structure is not 8-byte aligned.
    Misaligned(usize),
    /// Fewer bytes than the fixed header were supplied.
    TooShort(usize),
    /// The header declares more bytes than are available.
    SizeMismatch {
        /// Size recorded in the header.
        declared: u32,
        /// Bytes actually available.
        available: usize,
    },
}

impl fmt::Display for BootInfoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootInfoError::NullPointer => write!(f, "boot information pointer is null"),
            BootInfoError::Misaligned(addr) => {
                write!(f, "boot information at {:#x} is not 8-byte aligned", addr)
            }
            BootInfoError::TooShort(len) => {
                write!(f, "boot information too short ({} bytes)", len)
            }
            BootInfoError::SizeMismatch {
                declared,
                available,
            } => write!(
                f,
                "boot information declares {} bytes but only {} are available",
                declared, available
            ),
        }
    }
}

/// Any error the kernel core can report during bring-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    /// See [`MemoryError`].
    Memory(MemoryError),
    /// See [`IrqError`].
    Irq(IrqError),
    /// See [`IdtError`].
    Idt(IdtError),
    /// See [`BootInfoError`].
    BootInfo(BootInfoError),
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelError::Memory(e) => write!(f, "memory: {}", e),
            KernelError::Irq(e) => write!(f, "irq: {}", e),
            KernelError::Idt(e) => write!(f, "idt: {}", e),
            KernelError::BootInfo(e) => write!(f, "boot info: {}", e),
        }
    }
}

impl From<MemoryError> for KernelError {
    fn from(e: MemoryError) -> Self {
        KernelError::Memory(e)
    }
}

impl From<IrqError> for KernelError {
    fn from(e: IrqError) -> Self {
        KernelError::Irq(e)
    }
}

impl From<IdtError> for KernelError {
    fn from(e: IdtError) -> Self {
        KernelError::Idt(e)
    }
}

impl From<BootInfoError> for KernelError {
    fn from(e: BootInfoError) -> Self {
        KernelError::BootInfo(e)
    }
}
