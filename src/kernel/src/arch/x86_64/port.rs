//! Real port I/O through `in`/`out`.

use ember_hal::PortIo;
use x86_64::instructions::port::Port;

/// Unrestricted access to the I/O port space.
///
/// Only meaningful in ring 0; constructing one is the caller's promise that
/// the kernel owns the ports it is about to touch.
#[derive(Debug)]
pub struct HardwarePorts {
    _private: (),
}

impl HardwarePorts {
    /// # Safety
    ///
    /// Must run in ring 0, and the ports written through this value must not
    /// be driven by anyone else concurrently.
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl PortIo for HardwarePorts {
    fn read_u8(&mut self, port: u16) -> u8 {
        // SAFETY: guaranteed by `HardwarePorts::new`.
        unsafe { Port::new(port).read() }
    }

    fn write_u8(&mut self, port: u16, value: u8) {
        // SAFETY: guaranteed by `HardwarePorts::new`.
        unsafe { Port::new(port).write(value) }
    }
}
