//! Boot-time support: the Multiboot2 reader and the progress display.
//!
//! Progress lines look like Linux boot messages, `[ OK ] Message`, on the
//! VGA console. Each line is mirrored to the kernel log.

#[cfg(target_arch = "x86_64")]
pub mod banner;
pub mod multiboot;

#[cfg(target_arch = "x86_64")]
pub use console::{log, log_detail, log_section};

/// Boot status indicators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// `[ OK ]` in green
    Ok,
    /// `[FAIL]` in red
    Fail,
    /// `[WARN]` in yellow
    Warn,
    /// `[INFO]` in cyan
    Info,
}

impl Status {
    /// Bracketed tag printed in front of the message.
    pub fn tag(self) -> &'static str {
        match self {
            Status::Ok => "[ OK ]",
            Status::Fail => "[FAIL]",
            Status::Warn => "[WARN]",
            Status::Info => "[INFO]",
        }
    }

    fn level(self) -> log::Level {
        match self {
            Status::Ok | Status::Info => log::Level::Info,
            Status::Warn => log::Level::Warn,
            Status::Fail => log::Level::Error,
        }
    }
}

#[cfg(target_arch = "x86_64")]
mod console {
    use core::fmt;

    use ember_hal::Console;

    use super::Status;
    use crate::arch::x86_64::vga::{self, Color};
    use crate::println;

    /// Logs a boot stage with its status.
    pub fn log(status: Status, message: &str) {
        log::log!(target: "boot", status.level(), "{} {}", status.tag(), message);
        let color = match status {
            Status::Ok => Color::LightGreen,
            Status::Fail => Color::LightRed,
            Status::Warn => Color::Yellow,
            Status::Info => Color::LightCyan,
        };
        vga::with_writer(|screen| {
            screen.set_color(color, Color::Black);
            screen.write_str(status.tag());
            screen.set_color(Color::White, Color::Black);
            screen.write_str(" ");
            screen.write_str(message);
            screen.write_str("\n");
        });
    }

    /// Logs an indented detail line under the previous stage.
    pub fn log_detail(args: fmt::Arguments) {
        log::debug!(target: "boot", "       {}", args);
        println!("       {}", args);
    }

    /// Prints a section header after a blank line.
    pub fn log_section(name: &str) {
        println!();
        vga::set_color(Color::LightCyan, Color::Black);
        println!("-- {} --", name);
        vga::set_color(Color::White, Color::Black);
    }
}
