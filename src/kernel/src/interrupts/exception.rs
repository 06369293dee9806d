//! CPU exception vectors 0-31.

use core::fmt;

use super::InterruptFrame;

pub const DIVIDE_ERROR: u8 = 0;
pub const DEBUG: u8 = 1;
pub const NMI: u8 = 2;
pub const BREAKPOINT: u8 = 3;
pub const INVALID_OPCODE: u8 = 6;
pub const DOUBLE_FAULT: u8 = 8;
pub const GENERAL_PROTECTION: u8 = 13;
pub const PAGE_FAULT: u8 = 14;

/// Number of vectors reserved for CPU exceptions.
pub const EXCEPTION_VECTORS: u8 = 32;

const NAMES: [&str; EXCEPTION_VECTORS as usize] = [
    "DIVIDE ERROR",
    "DEBUG",
    "NON-MASKABLE INTERRUPT",
    "BREAKPOINT",
    "OVERFLOW",
    "BOUND RANGE EXCEEDED",
    "INVALID OPCODE",
    "DEVICE NOT AVAILABLE",
    "DOUBLE FAULT",
    "COPROCESSOR SEGMENT OVERRUN",
    "INVALID TSS",
    "SEGMENT NOT PRESENT",
    "STACK-SEGMENT FAULT",
    "GENERAL PROTECTION FAULT",
    "PAGE FAULT",
    "RESERVED",
    "X87 FLOATING-POINT EXCEPTION",
    "ALIGNMENT CHECK",
    "MACHINE CHECK",
    "SIMD FLOATING-POINT EXCEPTION",
    "VIRTUALIZATION EXCEPTION",
    "CONTROL PROTECTION EXCEPTION",
    "RESERVED",
    "RESERVED",
    "RESERVED",
    "RESERVED",
    "RESERVED",
    "RESERVED",
    "HYPERVISOR INJECTION EXCEPTION",
    "VMM COMMUNICATION EXCEPTION",
    "SECURITY EXCEPTION",
    "RESERVED",
];

/// Returns `true` if the CPU pushes an error code for `vector`.
pub const fn has_error_code(vector: u8) -> bool {
    matches!(vector, 8 | 10..=14 | 17 | 21 | 29 | 30)
}

/// Human readable name of an exception vector.
pub fn name(vector: u8) -> &'static str {
    NAMES.get(vector as usize).copied().unwrap_or("NOT AN EXCEPTION")
}

/// A CPU exception taken by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuException {
    pub vector: u8,
    pub error_code: u64,
    pub rip: u64,
    pub cs: u64,
    pub rflags: u64,
    pub rsp: u64,
}

impl CpuException {
    pub(crate) fn from_frame(frame: &InterruptFrame) -> Self {
        Self {
            vector: frame.vector as u8,
            error_code: frame.error_code,
            rip: frame.rip,
            cs: frame.cs,
            rflags: frame.rflags,
            rsp: frame.rsp,
        }
    }

    pub fn name(&self) -> &'static str {
        name(self.vector)
    }

    pub fn is_page_fault(&self) -> bool {
        self.vector == PAGE_FAULT
    }
}

impl fmt::Display for CpuException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EXCEPTION: {} (vector {}", self.name(), self.vector)?;
        if has_error_code(self.vector) {
            write!(f, ", error code {:#x}", self.error_code)?;
        }
        write!(
            f,
            ")\n  rip={:#018x} cs={:#06x} rflags={:#010x} rsp={:#018x}",
            self.rip, self.cs, self.rflags, self.rsp
        )
    }
}
