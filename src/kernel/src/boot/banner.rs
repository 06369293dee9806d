//! Boot banner.

use crate::arch::x86_64::vga::{self, Color};
use crate::println;

/// Prints the Ember banner and platform line.
pub fn print_banner() {
    vga::set_color(Color::LightRed, Color::Black);
    println!("  ___          _             ");
    println!(" | __|_ __  __| |__  ___ _ _ ");
    println!(" | _|| '  \\/ _` '_ \\/ -_) '_|");
    println!(" |___|_|_|_\\__,_.__/\\___|_|  ");
    println!();
    vga::set_color(Color::LightBlue, Color::Black);
    println!(" Ember v{} - x86_64 long mode", env!("CARGO_PKG_VERSION"));
    vga::set_color(Color::White, Color::Black);
    println!();
}
