//! VGA text console at 0xB8000, the boot progress display.

use core::fmt;
use core::ptr;

use ember_hal::Console;
use spin::{Mutex, Once};
use x86_64::instructions::interrupts;

const VGA_BUFFER_ADDR: usize = 0xB8000;
const BUFFER_HEIGHT: usize = 25;
const BUFFER_WIDTH: usize = 80;
const TAB_WIDTH: usize = 8;

/// Glyph shown for bytes outside printable ASCII.
const PLACEHOLDER: u8 = 0xFE;

/// The 16 text mode colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Color {
    Black = 0,
    Blue = 1,
    Green = 2,
    Cyan = 3,
    Red = 4,
    Magenta = 5,
    Brown = 6,
    LightGray = 7,
    DarkGray = 8,
    LightBlue = 9,
    LightGreen = 10,
    LightCyan = 11,
    LightRed = 12,
    Pink = 13,
    Yellow = 14,
    White = 15,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
struct Attribute(u8);

impl Attribute {
    const fn new(foreground: Color, background: Color) -> Self {
        Self((background as u8) << 4 | (foreground as u8))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
struct Cell {
    glyph: u8,
    attribute: Attribute,
}

/// Layout of the text mode frame buffer.
#[repr(transparent)]
pub struct Buffer {
    cells: [[Cell; BUFFER_WIDTH]; BUFFER_HEIGHT],
}

/// Writes to the bottom line of a [`Buffer`], scrolling everything up on
/// newline.
pub struct Writer {
    column: usize,
    attribute: Attribute,
    buffer: &'static mut Buffer,
}

impl Writer {
    /// Takes over `buffer`; its previous contents stay on screen.
    pub fn new(buffer: &'static mut Buffer) -> Self {
        Self {
            column: 0,
            attribute: Attribute::new(Color::White, Color::Black),
            buffer,
        }
    }

    pub fn set_color(&mut self, foreground: Color, background: Color) {
        self.attribute = Attribute::new(foreground, background);
    }

    pub fn write_byte(&mut self, byte: u8) {
        match byte {
            b'\n' => self.new_line(),
            b'\t' => {
                let stop = (self.column / TAB_WIDTH + 1) * TAB_WIDTH;
                while self.column < stop.min(BUFFER_WIDTH) {
                    self.put(b' ');
                }
            }
            0x20..=0x7e => self.put(byte),
            _ => self.put(PLACEHOLDER),
        }
    }

    fn put(&mut self, glyph: u8) {
        if self.column >= BUFFER_WIDTH {
            self.new_line();
        }
        let cell = Cell {
            glyph,
            attribute: self.attribute,
        };
        self.store(BUFFER_HEIGHT - 1, self.column, cell);
        self.column += 1;
    }

    fn store(&mut self, row: usize, column: usize, cell: Cell) {
        // SAFETY: the reference is valid; volatile because the card scans
        // the buffer behind our back.
        unsafe { ptr::write_volatile(&mut self.buffer.cells[row][column], cell) }
    }

    fn load(&self, row: usize, column: usize) -> Cell {
        // SAFETY: as in `store`.
        unsafe { ptr::read_volatile(&self.buffer.cells[row][column]) }
    }

    fn new_line(&mut self) {
        for row in 1..BUFFER_HEIGHT {
            for column in 0..BUFFER_WIDTH {
                let cell = self.load(row, column);
                self.store(row - 1, column, cell);
            }
        }
        self.clear_row(BUFFER_HEIGHT - 1);
        self.column = 0;
    }

    fn clear_row(&mut self, row: usize) {
        let blank = Cell {
            glyph: b' ',
            attribute: self.attribute,
        };
        for column in 0..BUFFER_WIDTH {
            self.store(row, column, blank);
        }
    }

    pub fn clear_screen(&mut self) {
        for row in 0..BUFFER_HEIGHT {
            self.clear_row(row);
        }
        self.column = 0;
    }
}

impl fmt::Write for Writer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        s.bytes().for_each(|byte| self.write_byte(byte));
        Ok(())
    }
}

impl Console for Writer {
    fn write_str(&mut self, s: &str) {
        s.bytes().for_each(|byte| self.write_byte(byte));
    }

    fn clear(&mut self) {
        self.clear_screen();
    }
}

/// The screen, set up on first use.
pub static WRITER: Once<Mutex<Writer>> = Once::new();

/// Attaches the global writer to the VGA buffer. Later calls do nothing.
pub fn init() {
    writer();
}

fn writer() -> &'static Mutex<Writer> {
    WRITER.call_once(|| {
        // SAFETY: the boot trampoline identity maps the legacy VGA window and
        // `WRITER` is the only owner of it.
        let buffer = unsafe { &mut *(VGA_BUFFER_ADDR as *mut Buffer) };
        Mutex::new(Writer::new(buffer))
    })
}

/// Runs `f` on the locked screen with interrupts masked, so output from
/// `f` is never split by an interrupt handler's.
pub fn with_writer<R>(f: impl FnOnce(&mut Writer) -> R) -> R {
    interrupts::without_interrupts(|| f(&mut *writer().lock()))
}

/// Changes the colors of everything printed afterwards.
pub fn set_color(foreground: Color, background: Color) {
    with_writer(|screen| screen.set_color(foreground, background));
}

pub fn clear_screen() {
    with_writer(|screen| Console::clear(screen));
}

/// Prints to the VGA buffer without a newline.
#[macro_export]
macro_rules! print {
    ($($arg:tt)*) => {
        $crate::arch::x86_64::vga::_print(format_args!($($arg)*))
    };
}

/// Prints to the VGA buffer with a newline.
#[macro_export]
macro_rules! println {
    () => ($crate::print!("\n"));
    ($($arg:tt)*) => ($crate::print!("{}\n", format_args!($($arg)*)))
}

#[doc(hidden)]
pub fn _print(args: fmt::Arguments) {
    use core::fmt::Write;

    with_writer(|screen| {
        let _ = screen.write_fmt(args);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::fmt::Write;

    fn writer() -> Writer {
        let blank = Cell {
            glyph: 0,
            attribute: Attribute(0),
        };
        let buffer = Box::leak(Box::new(Buffer {
            cells: [[blank; BUFFER_WIDTH]; BUFFER_HEIGHT],
        }));
        Writer::new(buffer)
    }

    fn line(writer: &Writer, row: usize) -> String {
        (0..BUFFER_WIDTH)
            .map(|column| writer.load(row, column).glyph as char)
            .collect::<String>()
            .trim_end_matches([' ', '\0'])
            .to_string()
    }

    #[test]
    fn test_text_lands_on_bottom_line_and_scrolls() {
        let mut writer = writer();
        write!(writer, "[ OK ] first\nsecond").unwrap();

        assert_eq!(line(&writer, BUFFER_HEIGHT - 2), "[ OK ] first");
        assert_eq!(line(&writer, BUFFER_HEIGHT - 1), "second");
    }

    #[test]
    fn test_long_lines_wrap() {
        let mut writer = writer();
        let text = "x".repeat(BUFFER_WIDTH + 3);
        fmt::Write::write_str(&mut writer, &text).unwrap();

        assert_eq!(line(&writer, BUFFER_HEIGHT - 2).len(), BUFFER_WIDTH);
        assert_eq!(line(&writer, BUFFER_HEIGHT - 1), "xxx");
    }

    #[test]
    fn test_non_ascii_and_colors() {
        let mut writer = writer();
        writer.set_color(Color::LightGreen, Color::Black);
        fmt::Write::write_str(&mut writer, "é").unwrap();

        let cell = writer.load(BUFFER_HEIGHT - 1, 0);
        assert_eq!(cell.glyph, PLACEHOLDER);
        assert_eq!(cell.attribute, Attribute(0x0A));
        // "é" is two UTF-8 bytes.
        assert_eq!(writer.column, 2);
    }

    #[test]
    fn test_tab_and_clear() {
        let mut writer = writer();
        Console::write_str(&mut writer, "a\tb");
        assert_eq!(line(&writer, BUFFER_HEIGHT - 1), "a       b");

        Console::clear(&mut writer);
        assert_eq!(writer.column, 0);
        assert_eq!(line(&writer, BUFFER_HEIGHT - 1), "");
    }
}
