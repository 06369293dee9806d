//! Allocate-and-release check run once during boot.

use ember_common::MemoryError;
use log::{info, warn};
use x86_64::PhysAddr;

use super::PhysicalMemoryManager;

/// Outcome of [`leak_check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeakReport {
    /// Frames allocated during the check.
    pub frames: usize,
    /// Used memory before the allocations.
    pub used_before: u64,
    /// Used memory while the frames were held.
    pub used_during: u64,
    /// Used memory after the frames were released.
    pub used_after: u64,
}

impl LeakReport {
    /// Returns `true` if releasing the frames restored the original usage.
    pub fn is_clean(&self) -> bool {
        self.used_before == self.used_after
    }
}

/// Allocates `N` frames, releases them and compares used memory.
///
/// If the pool runs dry part way through, the frames obtained so far are
/// released before the error is returned.
pub fn leak_check<const N: usize>(
    pmm: &mut PhysicalMemoryManager,
) -> Result<LeakReport, MemoryError> {
    let used_before = pmm.used_memory();
    let mut frames = [PhysAddr::zero(); N];

    for i in 0..N {
        match pmm.allocate_frame() {
            Ok(addr) => frames[i] = addr,
            Err(e) => {
                for addr in &frames[..i] {
                    pmm.free_frame(*addr);
                }
                warn!("leak check stopped after {} of {} frames", i, N);
                return Err(e);
            }
        }
    }
    let used_during = pmm.used_memory();

    for addr in &frames {
        pmm.free_frame(*addr);
    }
    let report = LeakReport {
        frames: N,
        used_before,
        used_during,
        used_after: pmm.used_memory(),
    };

    if report.is_clean() {
        info!("leak check: {} frames allocated and released", N);
    } else {
        warn!(
            "leak check: used memory {:#x} -> {:#x}",
            report.used_before, report.used_after
        );
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boot::multiboot::BootInformation;
    use crate::memory::FRAME_SIZE;
    use crate::testutil::BootInfoBuilder;

    fn pmm_with_free_frames(frames: u64) -> PhysicalMemoryManager {
        let bytes = BootInfoBuilder::new()
            .memory_map(&[(0x20_0000, frames * FRAME_SIZE, 1)])
            .build();
        let info = BootInformation::from_bytes(&bytes, 0x9000).unwrap();
        let mut pmm = PhysicalMemoryManager::new();
        pmm.init(&info);
        pmm
    }

    #[test]
    fn test_leak_check_is_clean() {
        let mut pmm = pmm_with_free_frames(16);

        let report = leak_check::<5>(&mut pmm).unwrap();
        assert!(report.is_clean());
        assert_eq!(report.used_during - report.used_before, 5 * FRAME_SIZE);
        assert_eq!(pmm.free_memory(), 16 * FRAME_SIZE);
    }

    #[test]
    fn test_leak_check_releases_partial_allocation() {
        let mut pmm = pmm_with_free_frames(3);

        assert_eq!(leak_check::<5>(&mut pmm), Err(MemoryError::OutOfFrames));
        assert_eq!(pmm.free_memory(), 3 * FRAME_SIZE);
    }
}
