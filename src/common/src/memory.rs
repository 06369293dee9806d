//! Physical memory bookkeeping types.

/// Kind of a region reported by the boot memory map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RegionKind {
    /// Usable RAM.
    Available,
    /// Reserved by firmware or hardware.
    Reserved,
    /// ACPI tables; usable once they have been parsed.
    AcpiReclaimable,
    /// ACPI non-volatile storage.
    Nvs,
    /// Defective RAM.
    BadMemory,
    /// A type this kernel does not know about.
    Unknown(u32),
}

impl From<u32> for RegionKind {
    fn from(raw: u32) -> Self {
        match raw {
            1 => RegionKind::Available,
            2 => RegionKind::Reserved,
            3 => RegionKind::AcpiReclaimable,
            4 => RegionKind::Nvs,
            5 => RegionKind::BadMemory,
            other => RegionKind::Unknown(other),
        }
    }
}

/// Snapshot of the physical memory counters, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MemoryStats {
    /// Managed physical memory.
    pub total: u64,
    /// Memory in used or reserved frames.
    pub used: u64,
    /// Memory in free frames.
    pub free: u64,
}

impl MemoryStats {
    /// Returns `true` if the counters add up.
    pub const fn is_consistent(&self) -> bool {
        self.used + self.free == self.total
    }
}
