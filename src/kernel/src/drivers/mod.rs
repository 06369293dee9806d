//! Device drivers built on the IRQ handler contract.

pub mod keyboard;

pub use keyboard::{Keyboard, KEYBOARD_IRQ};
