//! COM1 serial output, the kernel log's sink.

use core::fmt::{self, Write};

use spin::{Mutex, Once};
use uart_16550::SerialPort;
use x86_64::instructions::interrupts;

/// COM1 I/O port address.
const COM1_PORT: u16 = 0x3F8;

/// COM1, set up on first use.
pub static SERIAL: Once<Mutex<SerialPort>> = Once::new();

/// Programs the UART. Later calls do nothing.
pub fn init() {
    port();
}

fn port() -> &'static Mutex<SerialPort> {
    SERIAL.call_once(|| {
        // SAFETY: 0x3F8 is COM1 and nothing else in the kernel drives it.
        let mut serial = unsafe { SerialPort::new(COM1_PORT) };
        serial.init();
        Mutex::new(serial)
    })
}

/// Prints to the serial port without a newline.
#[macro_export]
macro_rules! serial_print {
    ($($arg:tt)*) => {
        $crate::arch::x86_64::serial::_print(format_args!($($arg)*))
    };
}

/// Prints to the serial port with a newline.
#[macro_export]
macro_rules! serial_println {
    () => ($crate::serial_print!("\n"));
    ($($arg:tt)*) => ($crate::serial_print!("{}\n", format_args!($($arg)*)))
}

#[doc(hidden)]
pub fn _print(args: fmt::Arguments) {
    // An IRQ handler that logs must not find the port locked by the code it
    // interrupted.
    interrupts::without_interrupts(|| {
        let _ = port().lock().write_fmt(args);
    });
}

/// Writes from the panic path.
///
/// Skips the lock if it is held: the holder was interrupted for good.
pub fn emergency_print(args: fmt::Arguments) {
    let serial = port();
    if let Some(mut serial) = serial.try_lock() {
        let _ = serial.write_fmt(args);
    } else {
        // SAFETY: the previous holder will never run again.
        unsafe { serial.force_unlock() };
        let _ = serial.lock().write_fmt(args);
    }
}
