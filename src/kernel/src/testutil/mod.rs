//! Test support: the QEMU exit device and, for host tests, fakes for the
//! hardware the kernel talks to.

/// Port of QEMU's `isa-debug-exit` device.
pub const QEMU_EXIT_PORT: u16 = 0xf4;

/// Exit codes written to the `isa-debug-exit` device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum QemuExitCode {
    /// Boot self-tests passed.
    Success = 0x10,
    /// A boot self-test failed.
    Failed = 0x11,
}

/// Terminates QEMU with `exit_code`.
///
/// QEMU reports `(code << 1) | 1` to the host, so `Success` shows up as 33
/// and `Failed` as 35. Without the device (real hardware) the write is
/// ignored and the call returns.
pub fn exit_qemu(exit_code: QemuExitCode) {
    #[cfg(target_arch = "x86_64")]
    {
        use x86_64::instructions::port::Port;

        // SAFETY: the debug exit port has no side effects other than stopping
        // the emulator.
        unsafe {
            Port::new(QEMU_EXIT_PORT).write(exit_code as u32);
        }
    }
}

#[cfg(test)]
pub use fakes::{BootInfoBuilder, PortAccess, RecordingPorts};

#[cfg(test)]
mod fakes {
    use std::collections::{BTreeMap, VecDeque};
    use std::vec::Vec;

    use ember_hal::PortIo;

    use crate::boot::multiboot::tag_type;

    /// One access seen by [`RecordingPorts`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum PortAccess {
        /// A byte was read from the port.
        Read(u16),
        /// A byte was written to the port.
        Write(u16, u8),
    }

    /// A `PortIo` that records every access and serves reads from a table.
    #[derive(Debug, Default)]
    pub struct RecordingPorts {
        accesses: Vec<PortAccess>,
        inputs: BTreeMap<u16, u8>,
        queued: BTreeMap<u16, VecDeque<u8>>,
    }

    impl RecordingPorts {
        pub fn new() -> Self {
            Self::default()
        }

        /// Makes reads of `port` return `value` until the port is written.
        /// Unset ports read as 0.
        pub fn with_input(mut self, port: u16, value: u8) -> Self {
            self.inputs.insert(port, value);
            self
        }

        /// Makes successive reads of `port` return `values`, one each,
        /// before falling back to the [`with_input`](Self::with_input) value.
        pub fn with_queued(mut self, port: u16, values: &[u8]) -> Self {
            self.queued.entry(port).or_default().extend(values);
            self
        }

        pub fn accesses(&self) -> &[PortAccess] {
            &self.accesses
        }

        /// Writes in order, without the `io_wait` delay writes to port 0x80.
        pub fn writes(&self) -> Vec<(u16, u8)> {
            self.accesses
                .iter()
                .filter_map(|access| match *access {
                    PortAccess::Write(port, value) if port != 0x80 => Some((port, value)),
                    _ => None,
                })
                .collect()
        }

        /// Number of delay writes to port 0x80.
        pub fn io_waits(&self) -> usize {
            self.accesses
                .iter()
                .filter(|access| matches!(access, PortAccess::Write(0x80, _)))
                .count()
        }

        pub fn clear(&mut self) {
            self.accesses.clear();
        }
    }

    impl PortIo for RecordingPorts {
        fn read_u8(&mut self, port: u16) -> u8 {
            self.accesses.push(PortAccess::Read(port));
            if let Some(value) = self.queued.get_mut(&port).and_then(VecDeque::pop_front) {
                return value;
            }
            self.inputs.get(&port).copied().unwrap_or(0)
        }

        fn write_u8(&mut self, port: u16, value: u8) {
            self.accesses.push(PortAccess::Write(port, value));
            self.inputs.insert(port, value);
        }
    }

    /// Assembles a Multiboot2 information structure in memory.
    #[derive(Debug, Default)]
    pub struct BootInfoBuilder {
        tags: Vec<u8>,
    }

    impl BootInfoBuilder {
        pub fn new() -> Self {
            Self::default()
        }

        /// Appends a raw tag and pads it to the next 8-byte boundary.
        pub fn tag(mut self, tag_type: u32, payload: &[u8]) -> Self {
            let size = 8 + payload.len() as u32;
            self.tags.extend_from_slice(&tag_type.to_le_bytes());
            self.tags.extend_from_slice(&size.to_le_bytes());
            self.tags.extend_from_slice(payload);
            while self.tags.len() % 8 != 0 {
                self.tags.push(0);
            }
            self
        }

        /// Appends a memory map of `(base, length, type)` entries.
        pub fn memory_map(self, entries: &[(u64, u64, u32)]) -> Self {
            self.memory_map_with_stride(24, entries)
        }

        /// Like [`memory_map`](Self::memory_map) with a custom `entry_size`.
        pub fn memory_map_with_stride(self, stride: u32, entries: &[(u64, u64, u32)]) -> Self {
            let mut payload = Vec::new();
            payload.extend_from_slice(&stride.to_le_bytes());
            payload.extend_from_slice(&0u32.to_le_bytes());
            for &(base, length, kind) in entries {
                let start = payload.len();
                payload.extend_from_slice(&base.to_le_bytes());
                payload.extend_from_slice(&length.to_le_bytes());
                payload.extend_from_slice(&kind.to_le_bytes());
                payload.resize(start + stride as usize, 0);
            }
            self.tag(tag_type::MEMORY_MAP, &payload)
        }

        pub fn basic_memory_info(self, lower_kib: u32, upper_kib: u32) -> Self {
            let mut payload = Vec::new();
            payload.extend_from_slice(&lower_kib.to_le_bytes());
            payload.extend_from_slice(&upper_kib.to_le_bytes());
            self.tag(tag_type::BASIC_MEMORY_INFO, &payload)
        }

        pub fn command_line(self, cmdline: &str) -> Self {
            self.string_tag(tag_type::COMMAND_LINE, cmdline)
        }

        pub fn boot_loader_name(self, name: &str) -> Self {
            self.string_tag(tag_type::BOOT_LOADER_NAME, name)
        }

        fn string_tag(self, tag_type: u32, value: &str) -> Self {
            let mut payload = Vec::from(value.as_bytes());
            payload.push(0);
            self.tag(tag_type, &payload)
        }

        /// Emits header, tags and the end tag.
        pub fn build(self) -> Vec<u8> {
            let mut bytes = Vec::with_capacity(8 + self.tags.len() + 8);
            bytes.extend_from_slice(&[0; 8]);
            bytes.extend_from_slice(&self.tags);
            bytes.extend_from_slice(&tag_type::END.to_le_bytes());
            bytes.extend_from_slice(&8u32.to_le_bytes());
            let total = bytes.len() as u32;
            bytes[..4].copy_from_slice(&total.to_le_bytes());
            bytes
        }
    }
}
