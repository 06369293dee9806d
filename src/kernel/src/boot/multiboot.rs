//! Multiboot2 boot information reader.
//!
//! The bootloader leaves a tag list in memory and hands its address over in
//! `ebx`. Everything here reads that blob through bounds-checked slices: a tag
//! whose declared size would run past the structure's `total_size` ends the
//! walk instead of being trusted.

use core::ffi::CStr;
use core::slice::ChunksExact;

use ember_common::{BootInfoError, RegionKind};

/// Value a Multiboot2 loader leaves in `eax`.
pub const BOOTLOADER_MAGIC: u32 = 0x36d7_6289;

/// `total_size` + `reserved`.
const HEADER_SIZE: usize = 8;
/// `type` + `size`.
const TAG_HEADER_SIZE: usize = 8;
/// `entry_size` + `entry_version` in front of the memory map entries.
const MEMORY_MAP_HEADER_SIZE: usize = 8;
/// `base_addr` + `length` + `type` + `reserved`.
const MEMORY_MAP_ENTRY_SIZE: usize = 24;
const TAG_ALIGN: usize = 8;

/// Tag type numbers.
pub mod tag_type {
    /// Terminates the tag list.
    pub const END: u32 = 0;
    /// Kernel command line.
    pub const COMMAND_LINE: u32 = 1;
    /// Name of the bootloader.
    pub const BOOT_LOADER_NAME: u32 = 2;
    /// Amount of lower and upper memory.
    pub const BASIC_MEMORY_INFO: u32 = 4;
    /// Physical memory map.
    pub const MEMORY_MAP: u32 = 6;
}

fn read_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    let raw = bytes.get(offset..offset.checked_add(4)?)?;
    Some(u32::from_le_bytes(raw.try_into().ok()?))
}

fn read_u64(bytes: &[u8], offset: usize) -> Option<u64> {
    let raw = bytes.get(offset..offset.checked_add(8)?)?;
    Some(u64::from_le_bytes(raw.try_into().ok()?))
}

/// A validated view of the Multiboot2 information structure.
#[derive(Debug, Clone, Copy)]
pub struct BootInformation<'a> {
    bytes: &'a [u8],
    start: u64,
}

impl<'a> BootInformation<'a> {
    /// Wraps `bytes`, which were found at physical address `start`.
    ///
    /// The view is cut to the `total_size` recorded in the header.
    pub fn from_bytes(bytes: &'a [u8], start: u64) -> Result<Self, BootInfoError> {
        if bytes.len() < HEADER_SIZE {
            return Err(BootInfoError::TooShort(bytes.len()));
        }
        let declared = read_u32(bytes, 0).ok_or(BootInfoError::TooShort(bytes.len()))?;
        if (declared as usize) < HEADER_SIZE {
            return Err(BootInfoError::TooShort(declared as usize));
        }
        if declared as usize > bytes.len() {
            return Err(BootInfoError::SizeMismatch {
                declared,
                available: bytes.len(),
            });
        }
        Ok(Self {
            bytes: &bytes[..declared as usize],
            start,
        })
    }

    /// Reads the structure the bootloader placed at `addr`.
    ///
    /// # Safety
    ///
    /// `addr` must be the identity-mapped address handed over by a Multiboot2
    /// loader, and the structure must stay untouched for the kernel's
    /// lifetime (the PMM reserves it).
    pub unsafe fn from_ptr(addr: usize) -> Result<BootInformation<'static>, BootInfoError> {
        if addr == 0 {
            return Err(BootInfoError::NullPointer);
        }
        if addr % TAG_ALIGN != 0 {
            return Err(BootInfoError::Misaligned(addr));
        }
        // SAFETY: the caller guarantees `addr` points at a boot information
        // header, which starts with the 4-byte `total_size` field.
        let total = unsafe { core::ptr::read(addr as *const u32) } as usize;
        if total < HEADER_SIZE {
            return Err(BootInfoError::TooShort(total));
        }
        // SAFETY: the header says `total` bytes follow, and the caller
        // guarantees that memory is mapped and stays alive.
        let bytes = unsafe { core::slice::from_raw_parts(addr as *const u8, total) };
        BootInformation::from_bytes(bytes, addr as u64)
    }

    /// Physical address of the structure.
    pub fn start_address(&self) -> u64 {
        self.start
    }

    /// Size of the structure in bytes, as declared in its header.
    pub fn total_size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Iterates over all tags up to the end tag.
    pub fn tags(&self) -> Tags<'a> {
        Tags {
            bytes: self.bytes,
            offset: HEADER_SIZE,
            done: false,
        }
    }

    /// The first memory map tag, if any.
    pub fn memory_map(&self) -> Option<MemoryMap<'a>> {
        self.tags().find_map(|tag| match tag {
            Tag::MemoryMap(map) => Some(map),
            _ => None,
        })
    }

    /// The basic memory information tag, if any.
    pub fn basic_memory_info(&self) -> Option<BasicMemoryInfo> {
        self.tags().find_map(|tag| match tag {
            Tag::BasicMemoryInfo(info) => Some(info),
            _ => None,
        })
    }

    /// The kernel command line, if the loader passed one.
    pub fn command_line(&self) -> Option<&'a str> {
        self.tags().find_map(|tag| match tag {
            Tag::CommandLine(cmdline) => Some(cmdline),
            _ => None,
        })
    }

    /// The loader's self-reported name.
    pub fn boot_loader_name(&self) -> Option<&'a str> {
        self.tags().find_map(|tag| match tag {
            Tag::BootLoaderName(name) => Some(name),
            _ => None,
        })
    }

    /// Every region of every memory map tag.
    pub fn memory_regions(&self) -> impl Iterator<Item = MemoryRegion> + 'a {
        self.tags()
            .filter_map(|tag| match tag {
                Tag::MemoryMap(map) => Some(map.regions()),
                _ => None,
            })
            .flatten()
    }
}

/// A decoded tag.
#[derive(Debug, Clone, Copy)]
pub enum Tag<'a> {
    /// Kernel command line.
    CommandLine(&'a str),
    /// Bootloader name.
    BootLoaderName(&'a str),
    /// Lower/upper memory sizes.
    BasicMemoryInfo(BasicMemoryInfo),
    /// Physical memory map.
    MemoryMap(MemoryMap<'a>),
    /// Any tag this kernel does not interpret, or one with a malformed body.
    Other {
        /// Raw tag type.
        tag_type: u32,
        /// Bytes after the tag header.
        payload: &'a [u8],
    },
}

impl<'a> Tag<'a> {
    fn parse(tag_type: u32, payload: &'a [u8]) -> Self {
        let other = Tag::Other { tag_type, payload };
        match tag_type {
            tag_type::COMMAND_LINE => c_str(payload).map_or(other, Tag::CommandLine),
            tag_type::BOOT_LOADER_NAME => c_str(payload).map_or(other, Tag::BootLoaderName),
            tag_type::BASIC_MEMORY_INFO => match (read_u32(payload, 0), read_u32(payload, 4)) {
                (Some(lower_kib), Some(upper_kib)) => Tag::BasicMemoryInfo(BasicMemoryInfo {
                    lower_kib,
                    upper_kib,
                }),
                _ => other,
            },
            tag_type::MEMORY_MAP => MemoryMap::parse(payload).map_or(other, Tag::MemoryMap),
            _ => other,
        }
    }
}

fn c_str(payload: &[u8]) -> Option<&str> {
    CStr::from_bytes_until_nul(payload).ok()?.to_str().ok()
}

/// Lazy iterator over the tags of a [`BootInformation`].
#[derive(Debug, Clone)]
pub struct Tags<'a> {
    bytes: &'a [u8],
    offset: usize,
    done: bool,
}

impl<'a> Iterator for Tags<'a> {
    type Item = Tag<'a>;

    fn next(&mut self) -> Option<Tag<'a>> {
        if self.done {
            return None;
        }
        let start = self.offset;
        let (Some(tag_type), Some(size)) = (
            read_u32(self.bytes, start),
            read_u32(self.bytes, start + 4),
        ) else {
            self.done = true;
            return None;
        };
        let size = size as usize;
        let end = start.saturating_add(size);
        if tag_type == tag_type::END || size < TAG_HEADER_SIZE || end > self.bytes.len() {
            self.done = true;
            return None;
        }

        self.offset = end.next_multiple_of(TAG_ALIGN);
        Some(Tag::parse(tag_type, &self.bytes[start + TAG_HEADER_SIZE..end]))
    }
}

/// `mem_lower`/`mem_upper` as reported by the loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BasicMemoryInfo {
    /// KiB of conventional memory below 1 MiB.
    pub lower_kib: u32,
    /// KiB of contiguous memory starting at 1 MiB.
    pub upper_kib: u32,
}

impl BasicMemoryInfo {
    /// First byte past the upper memory block.
    pub fn memory_end(&self) -> u64 {
        0x10_0000 + u64::from(self.upper_kib) * 1024
    }
}

/// A memory map tag.
#[derive(Debug, Clone, Copy)]
pub struct MemoryMap<'a> {
    entry_size: usize,
    entry_version: u32,
    entries: &'a [u8],
}

impl<'a> MemoryMap<'a> {
    fn parse(payload: &'a [u8]) -> Option<Self> {
        Some(Self {
            entry_size: read_u32(payload, 0)? as usize,
            entry_version: read_u32(payload, 4)?,
            entries: payload.get(MEMORY_MAP_HEADER_SIZE..)?,
        })
    }

    /// Version of the entry layout (0 for every known loader).
    pub fn entry_version(&self) -> u32 {
        self.entry_version
    }

    /// Iterates over the entries.
    ///
    /// Entries are read with the declared stride, so loaders that append
    /// fields stay readable. A stride smaller than the known entry layout
    /// yields nothing.
    pub fn regions(&self) -> MemoryRegions<'a> {
        let (entries, stride) = if self.entry_size < MEMORY_MAP_ENTRY_SIZE {
            (&self.entries[..0], MEMORY_MAP_ENTRY_SIZE)
        } else {
            (self.entries, self.entry_size)
        };
        MemoryRegions(entries.chunks_exact(stride))
    }
}

/// Iterator over [`MemoryRegion`]s of one memory map tag.
#[derive(Debug, Clone)]
pub struct MemoryRegions<'a>(ChunksExact<'a, u8>);

impl Iterator for MemoryRegions<'_> {
    type Item = MemoryRegion;

    fn next(&mut self) -> Option<MemoryRegion> {
        let entry = self.0.next()?;
        Some(MemoryRegion {
            base: read_u64(entry, 0)?,
            length: read_u64(entry, 8)?,
            kind: RegionKind::from(read_u32(entry, 16)?),
        })
    }
}

/// One physical memory range of the boot memory map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryRegion {
    /// First byte of the region.
    pub base: u64,
    /// Length in bytes.
    pub length: u64,
    /// What the firmware says the range is.
    pub kind: RegionKind,
}

impl MemoryRegion {
    /// First byte past the region.
    pub fn end(&self) -> u64 {
        self.base.saturating_add(self.length)
    }

    /// Returns `true` for RAM the kernel may hand out.
    pub fn is_available(&self) -> bool {
        self.kind == RegionKind::Available
    }
}
