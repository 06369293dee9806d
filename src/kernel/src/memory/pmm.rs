//! Bitmap physical frame allocator.

use ember_common::{MemoryError, MemoryStats};
use log::{debug, info, warn};
use x86_64::structures::paging::{FrameAllocator, FrameDeallocator, PhysFrame, Size4KiB};
use x86_64::PhysAddr;

use super::{FrameBitmap, FRAME_SIZE, KERNEL_RESERVED_END, MAX_FRAMES, MAX_PHYSICAL_MEMORY};
use crate::boot::multiboot::BootInformation;

/// Owns the frame bitmap and the counters derived from it.
///
/// Until [`init`](Self::init) runs every frame is considered used.
pub struct PhysicalMemoryManager {
    bitmap: FrameBitmap,
    total_memory: u64,
    total_frames: u64,
    used_frames: u64,
}

impl Default for PhysicalMemoryManager {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicalMemoryManager {
    /// Creates a manager with no usable memory.
    ///
    /// No frame is managed yet, so every allocation fails until `init`.
    pub const fn new() -> Self {
        Self {
            bitmap: FrameBitmap::new(),
            total_memory: 0,
            total_frames: 0,
            used_frames: 0,
        }
    }

    /// Rebuilds the bitmap from the boot memory map.
    ///
    /// Only regions the loader reports as available are freed. The kernel
    /// image below [`KERNEL_RESERVED_END`] and the boot information structure
    /// itself are reserved again afterwards, whatever the map says.
    pub fn init(&mut self, boot_info: &BootInformation<'_>) {
        self.bitmap.fill();
        self.total_memory = 0;
        self.total_frames = MAX_FRAMES as u64;
        self.used_frames = MAX_FRAMES as u64;

        info!(
            "parsing boot information ({} bytes at {:#x})",
            boot_info.total_size(),
            boot_info.start_address()
        );
        for region in boot_info.memory_regions() {
            debug!(
                "  {:#014x}..{:#014x} {:?}",
                region.base,
                region.end(),
                region.kind
            );
            if region.is_available() {
                self.unreserve_region(region.base, region.length);
                self.total_memory = self.total_memory.max(region.end());
            }
        }

        self.reserve_region(0, KERNEL_RESERVED_END);
        self.reserve_region(boot_info.start_address(), boot_info.total_size());

        if self.total_memory == 0 {
            if let Some(meminfo) = boot_info.basic_memory_info() {
                warn!("no usable memory map, sizing memory from basic meminfo");
                self.total_memory = meminfo.memory_end();
            }
        }
        if self.total_memory == 0 || self.total_memory > MAX_PHYSICAL_MEMORY {
            self.total_memory = MAX_PHYSICAL_MEMORY;
        }
        self.total_frames = self.total_memory / FRAME_SIZE;
        self.used_frames = self.bitmap.count_set(self.total_frames as usize) as u64;

        info!(
            "pmm: {} KiB total, {} KiB used, {} KiB free",
            self.total_memory / 1024,
            self.used_memory() / 1024,
            self.free_memory() / 1024
        );
    }

    /// Allocates the lowest free frame.
    pub fn allocate_frame(&mut self) -> Result<PhysAddr, MemoryError> {
        let index = self
            .bitmap
            .first_clear(self.total_frames as usize)
            .ok_or(MemoryError::OutOfFrames)?;
        self.mark_frame_used(index as u64);
        Ok(PhysAddr::new(index as u64 * FRAME_SIZE))
    }

    /// Returns the frame containing `addr` to the pool.
    ///
    /// Freeing a frame that is already free does nothing.
    pub fn free_frame(&mut self, addr: PhysAddr) {
        if addr.is_null() {
            warn!("ignoring free of physical address 0");
            return;
        }
        self.mark_frame_free(addr.as_u64() / FRAME_SIZE);
    }

    /// Marks every frame touching `[base, base + length)` used.
    pub fn reserve_region(&mut self, base: u64, length: u64) {
        let start = base / FRAME_SIZE;
        let end = base.saturating_add(length).div_ceil(FRAME_SIZE);
        for index in start..end.min(self.total_frames) {
            self.mark_frame_used(index);
        }
    }

    /// Marks every frame fully inside `[base, base + length)` free.
    ///
    /// A partially covered trailing frame stays reserved.
    pub fn unreserve_region(&mut self, base: u64, length: u64) {
        let start = base / FRAME_SIZE;
        let end = base.saturating_add(length) / FRAME_SIZE;
        for index in start..end.min(self.total_frames) {
            self.mark_frame_free(index);
        }
    }

    /// Returns `true` if the frame containing `addr` is used, reserved or unmanaged.
    pub fn is_frame_used(&self, addr: PhysAddr) -> bool {
        let index = addr.as_u64() / FRAME_SIZE;
        index >= self.total_frames || self.bitmap.is_set(index as usize)
    }

    /// Managed physical memory in bytes.
    pub fn total_memory(&self) -> u64 {
        self.total_memory
    }

    /// Bytes in used frames.
    pub fn used_memory(&self) -> u64 {
        self.used_frames * FRAME_SIZE
    }

    /// Bytes in free frames.
    pub fn free_memory(&self) -> u64 {
        self.total_memory - self.used_memory()
    }

    /// Number of managed frames.
    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// Number of used frames.
    pub fn used_frames(&self) -> u64 {
        self.used_frames
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> MemoryStats {
        MemoryStats {
            total: self.total_memory(),
            used: self.used_memory(),
            free: self.free_memory(),
        }
    }

    fn mark_frame_used(&mut self, index: u64) {
        if index < self.total_frames && self.bitmap.set(index as usize) {
            self.used_frames += 1;
        }
    }

    fn mark_frame_free(&mut self, index: u64) {
        if index < self.total_frames && self.bitmap.clear(index as usize) {
            self.used_frames -= 1;
        }
    }
}

// SAFETY: frames are only handed out while their bitmap bit is clear, and
// the bit stays set until the frame is deallocated.
unsafe impl FrameAllocator<Size4KiB> for PhysicalMemoryManager {
    fn allocate_frame(&mut self) -> Option<PhysFrame<Size4KiB>> {
        PhysicalMemoryManager::allocate_frame(self)
            .ok()
            .map(PhysFrame::containing_address)
    }
}

impl FrameDeallocator<Size4KiB> for PhysicalMemoryManager {
    unsafe fn deallocate_frame(&mut self, frame: PhysFrame<Size4KiB>) {
        self.free_frame(frame.start_address());
    }
}
