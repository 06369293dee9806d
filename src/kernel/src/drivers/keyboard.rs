//! PS/2 keyboard on IRQ 1.

use ember_hal::PortIo;
use pc_keyboard::{layouts, DecodedKey, HandleControl, ScancodeSet1};
use spin::Mutex;

use crate::interrupts::{InterruptFrame, IrqHandler};

/// IRQ line the PS/2 controller raises for the first port.
pub const KEYBOARD_IRQ: u8 = 1;

/// PS/2 controller data port.
const DATA_PORT: u16 = 0x60;

type Decoder = pc_keyboard::Keyboard<layouts::Us104Key, ScancodeSet1>;

struct State<P> {
    ports: P,
    decoder: Decoder,
}

/// Reads one scancode per interrupt and passes completed characters to a
/// callback.
pub struct Keyboard<P> {
    state: Mutex<State<P>>,
    on_char: fn(char),
}

impl<P: PortIo> Keyboard<P> {
    pub const fn new(ports: P, on_char: fn(char)) -> Self {
        Self {
            state: Mutex::new(State {
                ports,
                decoder: pc_keyboard::Keyboard::new(
                    ScancodeSet1::new(),
                    layouts::Us104Key,
                    HandleControl::Ignore,
                ),
            }),
            on_char,
        }
    }

    fn read_char(&self) -> Option<char> {
        let mut state = self.state.lock();
        let scancode = state.ports.read_u8(DATA_PORT);
        let event = state.decoder.add_byte(scancode).ok().flatten()?;
        match state.decoder.process_keyevent(event)? {
            DecodedKey::Unicode(c) => Some(c),
            DecodedKey::RawKey(_) => None,
        }
    }
}

impl<P: PortIo + Send> IrqHandler for Keyboard<P> {
    fn handle(&self, _frame: &mut InterruptFrame) {
        if let Some(c) = self.read_char() {
            (self.on_char)(c);
        }
    }
}
