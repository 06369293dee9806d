//! Attribute byte of an x86_64 gate descriptor.

use bitflags::bitflags;

bitflags! {
    /// Type and attribute bits of an IDT gate.
    ///
    /// Bits 0..=3 hold the gate type, bits 5..=6 the descriptor privilege
    /// level and bit 7 the present flag.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct GateAttributes: u8 {
        /// 64-bit interrupt gate (clears IF on entry).
        const INTERRUPT_GATE = 0x0E;
        /// 64-bit trap gate (leaves IF untouched).
        const TRAP_GATE      = 0x0F;
        /// Low bit of the DPL field.
        const DPL_LOW        = 1 << 5;
        /// High bit of the DPL field.
        const DPL_HIGH       = 1 << 6;
        /// Descriptor is present.
        const PRESENT        = 1 << 7;
    }
}

impl GateAttributes {
    /// Present, ring 0, interrupt gate (`0x8E`).
    pub const KERNEL_INTERRUPT: Self =
        Self::from_bits_truncate(Self::PRESENT.bits() | Self::INTERRUPT_GATE.bits());

    /// Returns the descriptor privilege level.
    pub const fn dpl(self) -> u8 {
        (self.bits() >> 5) & 0b11
    }

    /// Returns `true` if the present bit is set.
    pub const fn is_present(self) -> bool {
        self.contains(Self::PRESENT)
    }
}
