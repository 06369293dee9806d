//! `log` backend writing to COM1.

use core::sync::atomic::{AtomicBool, Ordering};

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use spin::Once;

/// Level used unless the `verbose-boot` feature is on.
#[cfg(not(feature = "verbose-boot"))]
pub const DEFAULT_LEVEL: LevelFilter = LevelFilter::Info;
#[cfg(feature = "verbose-boot")]
pub const DEFAULT_LEVEL: LevelFilter = LevelFilter::Trace;

/// Writes `[LEVEL] target: message` lines to the serial port.
#[derive(Debug)]
pub struct SerialLogger {
    max_level: LevelFilter,
}

static LOGGER: Once<SerialLogger> = Once::new();
static INSTALLED: AtomicBool = AtomicBool::new(false);

impl SerialLogger {
    pub const fn new(max_level: LevelFilter) -> Self {
        Self { max_level }
    }

    /// Installs the logger as the global `log` backend.
    pub fn init(self) -> Result<(), SetLoggerError> {
        let max_level = self.max_level;
        log::set_logger(LOGGER.call_once(|| self))?;
        log::set_max_level(max_level);
        INSTALLED.store(true, Ordering::Release);
        Ok(())
    }
}

impl Log for SerialLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        #[cfg(target_arch = "x86_64")]
        crate::serial_println!("[{}] {}: {}", record.level(), record.target(), record.args());
    }

    fn flush(&self) {}
}

/// Returns `true` once a [`SerialLogger`] is the `log` backend.
pub fn installed() -> bool {
    INSTALLED.load(Ordering::Acquire)
}

/// Installs a [`SerialLogger`] at [`DEFAULT_LEVEL`].
///
/// Succeeds without doing anything if one is already installed. Fails if
/// some other logger holds the `log` facade.
pub fn init() -> Result<(), SetLoggerError> {
    if installed() {
        return Ok(());
    }
    SerialLogger::new(DEFAULT_LEVEL).init()
}
