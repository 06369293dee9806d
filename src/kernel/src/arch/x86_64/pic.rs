//! Support for the primary and secondary 8259 Programmable Interrupt Controllers (PICs).

use ember_hal::{InterruptController, PortIo};

/// The offset of the first PIC (master).
///
/// IRQs 0..7 are mapped to interrupts 32..39.
pub const PIC_1_OFFSET: u8 = 32;

/// The offset of the second PIC (slave).
///
/// IRQs 8..15 are mapped to interrupts 40..47.
pub const PIC_2_OFFSET: u8 = PIC_1_OFFSET + 8;

const PIC_1_COMMAND: u16 = 0x20;
const PIC_1_DATA: u16 = 0x21;
const PIC_2_COMMAND: u16 = 0xA0;
const PIC_2_DATA: u16 = 0xA1;

/// ICW1: initialize, expect ICW4.
const ICW1_INIT: u8 = 0x11;
/// ICW3 for the primary: a secondary sits on IRQ 2.
const ICW3_PRIMARY: u8 = 0x04;
/// ICW3 for the secondary: its cascade identity.
const ICW3_SECONDARY: u8 = 0x02;
/// ICW4: 8086 mode.
const ICW4_8086: u8 = 0x01;
const EOI: u8 = 0x20;

/// The cascaded PIC pair, driven through `P`.
#[derive(Debug)]
pub struct ChainedPics<P> {
    ports: P,
}

impl<P: PortIo> ChainedPics<P> {
    pub const fn new(ports: P) -> Self {
        Self { ports }
    }

    pub fn ports(&self) -> &P {
        &self.ports
    }

    pub fn ports_mut(&mut self) -> &mut P {
        &mut self.ports
    }

    /// Current `(primary, secondary)` interrupt masks.
    pub fn masks(&mut self) -> (u8, u8) {
        (
            self.ports.read_u8(PIC_1_DATA),
            self.ports.read_u8(PIC_2_DATA),
        )
    }

    pub fn set_masks(&mut self, primary: u8, secondary: u8) {
        self.ports.write_u8(PIC_1_DATA, primary);
        self.ports.write_u8(PIC_2_DATA, secondary);
    }

    fn command(&mut self, port: u16, value: u8) {
        self.ports.write_u8(port, value);
        self.ports.io_wait();
    }
}

impl<P: PortIo> InterruptController for ChainedPics<P> {
    /// Runs the ICW1-ICW4 sequence on both chips, keeping their masks.
    fn remap(&mut self) {
        let (primary_mask, secondary_mask) = self.masks();

        self.command(PIC_1_COMMAND, ICW1_INIT);
        self.command(PIC_2_COMMAND, ICW1_INIT);
        self.command(PIC_1_DATA, PIC_1_OFFSET);
        self.command(PIC_2_DATA, PIC_2_OFFSET);
        self.command(PIC_1_DATA, ICW3_PRIMARY);
        self.command(PIC_2_DATA, ICW3_SECONDARY);
        self.command(PIC_1_DATA, ICW4_8086);
        self.command(PIC_2_DATA, ICW4_8086);

        self.set_masks(primary_mask, secondary_mask);
    }

    /// The secondary has to be acknowledged before the primary it cascades through.
    fn end_of_interrupt(&mut self, irq: u8) {
        if irq >= 8 {
            self.ports.write_u8(PIC_2_COMMAND, EOI);
        }
        self.ports.write_u8(PIC_1_COMMAND, EOI);
    }

    fn disable(&mut self) {
        self.set_masks(u8::MAX, u8::MAX);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{PortAccess, RecordingPorts};

    #[test]
    fn test_remap_sequence() {
        let mut pics = ChainedPics::new(
            RecordingPorts::new()
                .with_input(PIC_1_DATA, 0xB8)
                .with_input(PIC_2_DATA, 0x8E),
        );
        pics.remap();

        assert_eq!(
            pics.ports().writes(),
            [
                (0x20, 0x11),
                (0xA0, 0x11),
                (0x21, 32),
                (0xA1, 40),
                (0x21, 0x04),
                (0xA1, 0x02),
                (0x21, 0x01),
                (0xA1, 0x01),
                (0x21, 0xB8),
                (0xA1, 0x8E),
            ]
        );
        assert_eq!(pics.masks(), (0xB8, 0x8E));
    }

    #[test]
    fn test_every_command_is_followed_by_io_wait() {
        let mut pics = ChainedPics::new(RecordingPorts::new());
        pics.remap();

        let accesses = pics.ports().accesses();
        assert_eq!(pics.ports().io_waits(), 8);
        // Skip the two mask reads and stop before the mask restore.
        for pair in accesses[2..18].chunks(2) {
            assert!(matches!(pair[0], PortAccess::Write(port, _) if port != 0x80));
            assert_eq!(pair[1], PortAccess::Write(0x80, 0));
        }
    }

    #[test]
    fn test_masks_are_read_before_initialization() {
        let mut pics = ChainedPics::new(RecordingPorts::new());
        pics.remap();

        let accesses = pics.ports().accesses();
        assert_eq!(accesses[0], PortAccess::Read(0x21));
        assert_eq!(accesses[1], PortAccess::Read(0xA1));
    }

    #[test]
    fn test_end_of_interrupt() {
        let mut pics = ChainedPics::new(RecordingPorts::new());
        for irq in 0..8 {
            pics.end_of_interrupt(irq);
        }
        assert_eq!(pics.ports().writes(), [(0x20, 0x20); 8]);

        let mut pics = ChainedPics::new(RecordingPorts::new());
        pics.end_of_interrupt(8);
        pics.end_of_interrupt(15);
        assert_eq!(
            pics.ports().writes(),
            [(0xA0, 0x20), (0x20, 0x20), (0xA0, 0x20), (0x20, 0x20)]
        );
    }

    #[test]
    fn test_acknowledge_after_remap() {
        let mut pics = ChainedPics::new(RecordingPorts::new());
        pics.remap();
        pics.ports_mut().clear();

        pics.end_of_interrupt(1);
        assert_eq!(pics.ports().accesses(), [PortAccess::Write(0x20, 0x20)]);
    }

    #[test]
    fn test_disable_masks_all_lines() {
        let mut pics = ChainedPics::new(RecordingPorts::new());
        pics.disable();
        assert_eq!(pics.masks(), (0xFF, 0xFF));
    }
}
