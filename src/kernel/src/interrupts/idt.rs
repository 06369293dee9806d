//! Interrupt Descriptor Table.

use core::mem::size_of;

use ember_common::{GateAttributes, IdtError};
use x86_64::structures::DescriptorTablePointer;
use x86_64::VirtAddr;

use super::USED_VECTORS;

/// Number of gates in the table.
pub const IDT_ENTRIES: usize = 256;

/// A 64-bit gate descriptor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C)]
pub struct GateDescriptor {
    offset_low: u16,
    selector: u16,
    ist: u8,
    attributes: u8,
    offset_mid: u16,
    offset_high: u32,
    reserved: u32,
}

impl GateDescriptor {
    /// A gate that is not present.
    pub const MISSING: Self = Self {
        offset_low: 0,
        selector: 0,
        ist: 0,
        attributes: 0,
        offset_mid: 0,
        offset_high: 0,
        reserved: 0,
    };

    /// A gate jumping to `handler` through code segment `selector`.
    pub const fn new(handler: u64, selector: u16, attributes: GateAttributes) -> Self {
        Self {
            offset_low: handler as u16,
            selector,
            ist: 0,
            attributes: attributes.bits(),
            offset_mid: (handler >> 16) as u16,
            offset_high: (handler >> 32) as u32,
            reserved: 0,
        }
    }

    /// The handler address reassembled from the three offset fields.
    pub const fn handler_address(&self) -> u64 {
        self.offset_low as u64 | (self.offset_mid as u64) << 16 | (self.offset_high as u64) << 32
    }

    pub const fn selector(&self) -> u16 {
        self.selector
    }

    pub const fn attributes(&self) -> GateAttributes {
        GateAttributes::from_bits_retain(self.attributes)
    }

    pub const fn is_present(&self) -> bool {
        self.attributes().is_present()
    }

    /// Interrupt stack table slot the CPU switches to, 0 for none.
    pub const fn stack_index(&self) -> u8 {
        self.ist
    }
}

/// The full table of 256 gates.
#[derive(Debug, Clone)]
#[repr(C, align(16))]
pub struct InterruptDescriptorTable {
    gates: [GateDescriptor; IDT_ENTRIES],
}

impl Default for InterruptDescriptorTable {
    fn default() -> Self {
        Self::new()
    }
}

impl InterruptDescriptorTable {
    /// A table with every gate missing.
    pub const fn new() -> Self {
        Self {
            gates: [GateDescriptor::MISSING; IDT_ENTRIES],
        }
    }

    pub fn set_gate(
        &mut self,
        vector: u8,
        handler: u64,
        selector: u16,
        attributes: GateAttributes,
    ) {
        self.gates[vector as usize] = GateDescriptor::new(handler, selector, attributes);
    }

    /// Makes `vector` run on interrupt stack table slot `ist` (1-7).
    ///
    /// # Panics
    ///
    /// Panics if `ist` is not a valid slot.
    pub fn set_stack_index(&mut self, vector: u8, ist: u8) {
        assert!((1..=7).contains(&ist), "IST slot {} out of range", ist);
        self.gates[vector as usize].ist = ist;
    }

    pub fn gate(&self, vector: u8) -> &GateDescriptor {
        &self.gates[vector as usize]
    }

    /// Points vectors `0..48` at the entry stubs, one per vector.
    pub fn install_stubs(&mut self, stubs: &[u64; USED_VECTORS], selector: u16) {
        for (vector, &handler) in stubs.iter().enumerate() {
            self.set_gate(
                vector as u8,
                handler,
                selector,
                GateAttributes::KERNEL_INTERRUPT,
            );
        }
    }

    /// Checks that every routed vector has a present gate.
    pub fn validate(&self) -> Result<(), IdtError> {
        match self.gates[..USED_VECTORS]
            .iter()
            .position(|gate| !gate.is_present())
        {
            Some(vector) => Err(IdtError::GateMissing(vector as u8)),
            None => Ok(()),
        }
    }

    /// The `(limit, base)` pair `lidt` expects.
    pub fn pointer(&self) -> DescriptorTablePointer {
        DescriptorTablePointer {
            limit: (size_of::<Self>() - 1) as u16,
            base: VirtAddr::from_ptr(self),
        }
    }

    /// Loads the table into the CPU.
    ///
    /// Fails without touching the CPU if any of vectors `0..48` is missing.
    pub fn load(&'static self) -> Result<(), IdtError> {
        self.validate()?;
        #[cfg(target_arch = "x86_64")]
        // SAFETY: the table is 'static and every routed vector points at a stub.
        unsafe {
            x86_64::instructions::tables::lidt(&self.pointer());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_stubs() -> [u64; USED_VECTORS] {
        core::array::from_fn(|vector| 0xFFFF_8000_0010_0000 + vector as u64 * 16)
    }

    #[test]
    fn test_descriptor_is_sixteen_bytes() {
        assert_eq!(size_of::<GateDescriptor>(), 16);
        assert_eq!(size_of::<InterruptDescriptorTable>(), 4096);
    }

    #[test]
    fn test_handler_address_split() {
        let gate = GateDescriptor::new(
            0x1234_5678_9ABC_DEF0,
            0x08,
            GateAttributes::KERNEL_INTERRUPT,
        );
        assert_eq!(gate.offset_low, 0xDEF0);
        assert_eq!(gate.offset_mid, 0x9ABC);
        assert_eq!(gate.offset_high, 0x1234_5678);
        assert_eq!(gate.handler_address(), 0x1234_5678_9ABC_DEF0);
        assert_eq!(gate.selector(), 0x08);
        assert_eq!(gate.ist, 0);
        assert_eq!(gate.reserved, 0);
    }

    #[test]
    fn test_install_stubs_fills_routed_vectors() {
        let stubs = fake_stubs();
        let mut idt = InterruptDescriptorTable::new();
        idt.install_stubs(&stubs, 0x08);

        for vector in 0..USED_VECTORS as u8 {
            let gate = idt.gate(vector);
            assert_eq!(gate.handler_address(), stubs[vector as usize]);
            assert_eq!(gate.attributes().bits(), 0x8E);
            assert_eq!(gate.attributes().dpl(), 0);
            assert_eq!(gate.selector(), 0x08);
        }
        for vector in USED_VECTORS as u8..=255 {
            assert_eq!(*idt.gate(vector), GateDescriptor::MISSING);
        }
        assert_eq!(idt.validate(), Ok(()));
    }

    #[test]
    fn test_stack_index_keeps_handler() {
        let stubs = fake_stubs();
        let mut idt = InterruptDescriptorTable::new();
        idt.install_stubs(&stubs, 0x08);
        idt.set_stack_index(8, 1);

        assert_eq!(idt.gate(8).stack_index(), 1);
        assert_eq!(idt.gate(8).handler_address(), stubs[8]);
        assert_eq!(idt.gate(8).attributes(), GateAttributes::KERNEL_INTERRUPT);
        assert_eq!(idt.gate(14).stack_index(), 0);
    }

    #[test]
    #[should_panic(expected = "IST slot 0 out of range")]
    fn test_stack_index_zero_is_rejected() {
        InterruptDescriptorTable::new().set_stack_index(8, 0);
    }

    #[test]
    fn test_missing_gate_blocks_load() {
        let mut idt = InterruptDescriptorTable::new();
        assert_eq!(idt.validate(), Err(IdtError::GateMissing(0)));

        idt.install_stubs(&fake_stubs(), 0x08);
        idt.set_gate(45, 0, 0, GateAttributes::empty());

        let idt: &'static InterruptDescriptorTable = Box::leak(Box::new(idt));
        assert_eq!(idt.load(), Err(IdtError::GateMissing(45)));
    }

    #[test]
    fn test_pointer() {
        let idt = InterruptDescriptorTable::new();
        let pointer = idt.pointer();
        // The pointer is packed; copy the fields out before comparing.
        assert_eq!({ pointer.limit }, 4095);
        assert_eq!({ pointer.base }, VirtAddr::from_ptr(&idt));
    }
}
