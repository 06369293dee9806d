//! Architecture-specific code. Ember only runs on x86_64.

#[cfg(target_arch = "x86_64")]
pub mod x86_64;

#[cfg(target_arch = "x86_64")]
pub use self::x86_64::{halt, halt_loop, hlt};
