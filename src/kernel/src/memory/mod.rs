//! Physical memory management.
//!
//! Physical memory is handed out in [`FRAME_SIZE`] frames tracked by one bit
//! each. The bitmap covers [`MAX_PHYSICAL_MEMORY`]; anything above that is
//! simply never managed.

pub mod bitmap;
mod pmm;
pub mod selftest;

pub use bitmap::FrameBitmap;
pub use pmm::PhysicalMemoryManager;

/// Size of one physical frame.
pub const FRAME_SIZE: u64 = 4096;

/// Upper bound of managed physical memory (128 MiB).
pub const MAX_PHYSICAL_MEMORY: u64 = 128 * 1024 * 1024;

/// Number of frames the bitmap can track.
pub const MAX_FRAMES: usize = (MAX_PHYSICAL_MEMORY / FRAME_SIZE) as usize;

/// Everything below this address holds the kernel image and stays reserved.
pub const KERNEL_RESERVED_END: u64 = 0x20_0000;

const _: () = {
    assert!(FRAME_SIZE.is_power_of_two());
    assert!(MAX_FRAMES % 64 == 0);
    assert!(KERNEL_RESERVED_END % FRAME_SIZE == 0);
};
