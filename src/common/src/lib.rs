//! Types shared between the Ember kernel crates.
//!
//! Nothing in here touches hardware; it is plain data plus the error
//! taxonomy the kernel reports through `Result`.

#![no_std]
#![warn(missing_docs)]

pub mod error;
pub mod gate;
pub mod memory;

pub use error::{BootInfoError, IdtError, IrqError, KernelError, MemoryError};
pub use gate::GateAttributes;
pub use memory::{MemoryStats, RegionKind};
