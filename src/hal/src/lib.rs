//! Ember Hardware Abstraction Layer (HAL) traits.
//!
//! This crate defines the seams between the kernel core and the hardware it
//! drives, so the core can be exercised against recording fakes.

#![no_std]

/// Byte-wide access to the x86 I/O port space.
pub trait PortIo {
    /// Reads one byte from `port`.
    fn read_u8(&mut self, port: u16) -> u8;
    /// Writes one byte to `port`.
    fn write_u8(&mut self, port: u16, value: u8);

    /// Gives slow devices time to settle between commands.
    ///
    /// Writes to port `0x80` (POST diagnostics), which nothing decodes.
    fn io_wait(&mut self) {
        self.write_u8(0x80, 0);
    }
}

/// Trait for a text-based console output.
pub trait Console {
    /// Writes a string to the console.
    fn write_str(&mut self, s: &str);
    /// Clears the console screen.
    fn clear(&mut self);
}

/// Trait for a legacy, vector-offset based interrupt controller.
pub trait InterruptController {
    /// Moves the controller's IRQ lines off the CPU exception vectors.
    fn remap(&mut self);
    /// Signals the end of the interrupt raised on `irq` (a line, not a vector).
    fn end_of_interrupt(&mut self, irq: u8);
    /// Masks every line.
    fn disable(&mut self);
}
