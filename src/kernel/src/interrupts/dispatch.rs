//! Routing from the common trap entry to exception reports and IRQ handlers.

use core::sync::atomic::{AtomicU64, Ordering};

use ember_common::IrqError;
use ember_hal::InterruptController;
use log::{debug, trace};
use spin::Mutex;

use super::exception::{CpuException, EXCEPTION_VECTORS};
use super::{InterruptFrame, IRQ_BASE_VECTOR, IRQ_LINES};

/// A device driver's interrupt routine.
///
/// Handlers run with interrupts disabled, before the controller is
/// acknowledged. They must not block.
pub trait IrqHandler: Sync {
    fn handle(&self, frame: &mut InterruptFrame);
}

impl<F> IrqHandler for F
where
    F: Fn(&mut InterruptFrame) + Sync,
{
    fn handle(&self, frame: &mut InterruptFrame) {
        self(frame)
    }
}

/// What the dispatcher did with one interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// A CPU exception. The kernel cannot continue.
    Fatal(CpuException),
    /// A hardware IRQ; `handled` is false if no handler was installed.
    Irq { line: u8, handled: bool },
    /// A vector outside the routed range.
    Unrouted(u8),
}

/// IRQ handler table, per-line counters and the controller that needs the
/// end-of-interrupt.
pub struct Interrupts<C> {
    handlers: Mutex<[Option<&'static dyn IrqHandler>; IRQ_LINES]>,
    counts: [AtomicU64; IRQ_LINES],
    controller: Mutex<C>,
}

impl<C: InterruptController> Interrupts<C> {
    pub const fn new(controller: C) -> Self {
        Self {
            handlers: Mutex::new([None; IRQ_LINES]),
            counts: [const { AtomicU64::new(0) }; IRQ_LINES],
            controller: Mutex::new(controller),
        }
    }

    /// Routes IRQ `line` to `handler`, replacing any previous handler.
    pub fn install_handler(
        &self,
        line: u8,
        handler: &'static dyn IrqHandler,
    ) -> Result<(), IrqError> {
        let slot = check_line(line)?;
        let previous = without_interrupts(|| self.handlers.lock()[slot].replace(handler));
        if previous.is_some() {
            debug!("irq {}: replaced handler", line);
        } else {
            debug!("irq {}: handler installed", line);
        }
        Ok(())
    }

    pub fn remove_handler(&self, line: u8) -> Result<(), IrqError> {
        let slot = check_line(line)?;
        without_interrupts(|| self.handlers.lock()[slot] = None);
        Ok(())
    }

    /// Returns `true` if a handler is routed to `line`. Out-of-range lines
    /// never have one.
    pub fn handler_installed(&self, line: u8) -> bool {
        check_line(line).is_ok_and(|slot| without_interrupts(|| self.handlers.lock()[slot].is_some()))
    }

    /// How many times `line` has been dispatched.
    pub fn irq_count(&self, line: u8) -> u64 {
        check_line(line).map_or(0, |slot| self.counts[slot].load(Ordering::Relaxed))
    }

    pub fn irq_counts(&self) -> [u64; IRQ_LINES] {
        core::array::from_fn(|slot| self.counts[slot].load(Ordering::Relaxed))
    }

    pub fn controller(&self) -> &Mutex<C> {
        &self.controller
    }

    /// Masks every line on the controller, if nothing else holds it.
    ///
    /// Used on the way to a halt, where waiting on the lock could hang.
    pub fn silence(&self) {
        if let Some(mut controller) = self.controller.try_lock() {
            controller.disable();
        }
    }

    /// Handles one interrupt described by `frame`.
    ///
    /// Exceptions are reported back without touching the controller. For an
    /// IRQ the handler runs first and the end-of-interrupt is sent whether
    /// or not a handler was installed.
    pub fn dispatch(&self, frame: &mut InterruptFrame) -> Dispatch {
        let vector = frame.vector;
        if vector < u64::from(EXCEPTION_VECTORS) {
            return Dispatch::Fatal(CpuException::from_frame(frame));
        }
        let line = vector - u64::from(IRQ_BASE_VECTOR);
        if line >= IRQ_LINES as u64 {
            return Dispatch::Unrouted(vector as u8);
        }
        let line = line as u8;
        let slot = line as usize;

        self.counts[slot].fetch_add(1, Ordering::Relaxed);
        // Copy the handler out so it may touch the table itself.
        let handler = self.handlers.lock()[slot];
        if let Some(handler) = handler {
            handler.handle(frame);
        } else {
            trace!("irq {}: no handler", line);
        }
        self.controller.lock().end_of_interrupt(line);

        Dispatch::Irq {
            line,
            handled: handler.is_some(),
        }
    }
}

/// Runs `f` with IRQs masked, so `dispatch` never finds the handler table
/// locked by the code it interrupted.
///
/// Host builds run without ring 0 and call `f` directly.
#[cfg(target_os = "none")]
fn without_interrupts<R>(f: impl FnOnce() -> R) -> R {
    x86_64::instructions::interrupts::without_interrupts(f)
}

#[cfg(not(target_os = "none"))]
fn without_interrupts<R>(f: impl FnOnce() -> R) -> R {
    f()
}

fn check_line(line: u8) -> Result<usize, IrqError> {
    if usize::from(line) < IRQ_LINES {
        Ok(usize::from(line))
    } else {
        Err(IrqError::LineOutOfRange(line))
    }
}
