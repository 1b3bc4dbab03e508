//! Physical memory dispatcher.
//!
//! This module implements the single physical address space shared by every
//! core and hardware block. It provides:
//! 1. **RAM ranges:** `(start, length)` windows with owned byte buffers.
//! 2. **Special ranges:** MMIO windows backed by device callbacks.
//! 3. **Access routing:** Every typed or raw access is fully contained in
//!    exactly one range or fails with a bus error.
//!
//! The RAM path is endian-neutral: bytes move in memory order and the caller
//! applies any swap. Device callbacks likewise see memory-order bytes at the
//! post-translation physical address, with whatever width the CPU issued.

use tracing::error;

use crate::common::{MemError, MemoryError, Scalar};
use crate::mem::buffer::RamBuffer;

/// A memory-mapped I/O device attached to a special range.
///
/// Callbacks return `true` when the access was handled; `false` is a fatal
/// error (the device exists but rejected the access, e.g. an unsupported
/// width). Devices that care about width must check `buf.len()`.
pub trait MmioDevice {
    /// Returns a short name for this device (e.g. `"IPC0"`), used in logs.
    fn name(&self) -> &str;
    /// Fills `buf` from the device at the given physical address.
    fn read(&mut self, addr: u32, buf: &mut [u8]) -> bool;
    /// Writes `buf` into the device at the given physical address.
    fn write(&mut self, addr: u32, buf: &[u8]) -> bool;
}

/// Read callback type for [`MmioHandlers`].
pub type ReadFn = Box<dyn FnMut(u32, &mut [u8]) -> bool>;
/// Write callback type for [`MmioHandlers`].
pub type WriteFn = Box<dyn FnMut(u32, &[u8]) -> bool>;

/// Adapter wrapping a pair of closures as an [`MmioDevice`].
///
/// This is the registration contract for embedders that model a hardware
/// block as two functions rather than a type.
pub struct MmioHandlers {
    name: &'static str,
    read: ReadFn,
    write: WriteFn,
}

impl MmioHandlers {
    /// Creates a device from a name and a read/write closure pair.
    pub fn new(name: &'static str, read: ReadFn, write: WriteFn) -> Self {
        Self { name, read, write }
    }
}

impl MmioDevice for MmioHandlers {
    fn name(&self) -> &str {
        self.name
    }

    fn read(&mut self, addr: u32, buf: &mut [u8]) -> bool {
        (self.read)(addr, buf)
    }

    fn write(&mut self, addr: u32, buf: &[u8]) -> bool {
        (self.write)(addr, buf)
    }
}

/// A `(start, length)` window of the physical address space.
#[derive(Clone, Copy)]
struct Range {
    start: u32,
    length: u32,
}

impl Range {
    /// Returns whether `[addr, addr + len)` lies entirely inside this range.
    fn contains(&self, addr: u32, len: u32) -> bool {
        u64::from(addr) >= u64::from(self.start)
            && u64::from(addr) + u64::from(len) <= u64::from(self.start) + u64::from(self.length)
    }

    /// Returns whether `[start, start + length)` overlaps this range.
    fn collides(&self, start: u32, length: u32) -> bool {
        u64::from(start) < u64::from(self.start) + u64::from(self.length)
            && u64::from(self.start) < u64::from(start) + u64::from(length)
    }
}

struct RamRange {
    range: Range,
    buffer: RamBuffer,
}

struct SpecialRange {
    range: Range,
    device: Box<dyn MmioDevice>,
}

/// The shared physical address space: RAM ranges plus MMIO special ranges.
///
/// Ranges are registered at setup and never destroyed. Lookup is a linear
/// scan; the physical map of the platform has on the order of a dozen
/// ranges.
#[derive(Default)]
pub struct PhysicalMemory {
    ranges: Vec<RamRange>,
    special: Vec<SpecialRange>,
}

impl PhysicalMemory {
    /// Creates an empty physical address space.
    pub fn new() -> Self {
        Self::default()
    }

    fn check_overlap(&self, start: u32, length: u32) -> Result<(), MemoryError> {
        if length == 0 || u64::from(start) + u64::from(length) > 1 << 32 {
            return Err(MemoryError::Bounds { start, length });
        }
        let all = self
            .ranges
            .iter()
            .map(|r| r.range)
            .chain(self.special.iter().map(|r| r.range));
        for other in all {
            if other.collides(start, length) {
                return Err(MemoryError::Overlap {
                    start,
                    length,
                    other_start: other.start,
                    other_length: other.length,
                });
            }
        }
        Ok(())
    }

    /// Registers a RAM range with an owned, zero-filled buffer.
    ///
    /// # Errors
    ///
    /// Fails if the new range collides with any existing range, RAM or MMIO.
    pub fn add_ram(&mut self, start: u32, length: u32) -> Result<(), MemoryError> {
        self.check_overlap(start, length)?;
        self.ranges.push(RamRange {
            range: Range { start, length },
            buffer: RamBuffer::new(length as usize),
        });
        Ok(())
    }

    /// Registers an MMIO range backed by a device.
    ///
    /// # Errors
    ///
    /// Fails if the new range collides with any existing range, RAM or MMIO.
    pub fn add_device(
        &mut self,
        start: u32,
        length: u32,
        device: Box<dyn MmioDevice>,
    ) -> Result<(), MemoryError> {
        self.check_overlap(start, length)?;
        self.special.push(SpecialRange {
            range: Range { start, length },
            device,
        });
        Ok(())
    }

    /// Reads raw memory-order bytes at a physical address.
    ///
    /// # Errors
    ///
    /// `Bus` if no range fully contains the access, `Fatal` if a device
    /// rejected it.
    pub fn read_bytes(&mut self, addr: u32, out: &mut [u8]) -> Result<(), MemError> {
        let len = out.len() as u32;
        for r in &self.ranges {
            if r.range.contains(addr, len) {
                let offset = (addr - r.range.start) as usize;
                out.copy_from_slice(r.buffer.read_slice(offset, out.len()));
                return Ok(());
            }
        }
        for r in &mut self.special {
            if r.range.contains(addr, len) {
                if r.device.read(addr, out) {
                    return Ok(());
                }
                error!(
                    device = r.device.name(),
                    addr = format_args!("{addr:#010x}"),
                    len,
                    "MMIO read rejected by device"
                );
                return Err(MemError::Fatal);
            }
        }
        error!(
            addr = format_args!("{addr:#010x}"),
            len, "illegal memory read"
        );
        Err(MemError::Bus)
    }

    /// Writes raw memory-order bytes at a physical address.
    ///
    /// # Errors
    ///
    /// `Bus` if no range fully contains the access, `Fatal` if a device
    /// rejected it.
    pub fn write_bytes(&mut self, addr: u32, data: &[u8]) -> Result<(), MemError> {
        let len = data.len() as u32;
        for r in &mut self.ranges {
            if r.range.contains(addr, len) {
                let offset = (addr - r.range.start) as usize;
                r.buffer.write_slice(offset, data);
                return Ok(());
            }
        }
        for r in &mut self.special {
            if r.range.contains(addr, len) {
                if r.device.write(addr, data) {
                    return Ok(());
                }
                error!(
                    device = r.device.name(),
                    addr = format_args!("{addr:#010x}"),
                    len,
                    "MMIO write rejected by device"
                );
                return Err(MemError::Fatal);
            }
        }
        error!(
            addr = format_args!("{addr:#010x}"),
            len, "illegal memory write"
        );
        Err(MemError::Bus)
    }

    /// Reads a typed value in memory order.
    ///
    /// # Errors
    ///
    /// Same outcomes as [`PhysicalMemory::read_bytes`].
    pub fn read<T: Scalar>(&mut self, addr: u32) -> Result<T, MemError> {
        let mut raw = [0u8; 8];
        let buf = &mut raw[..T::SIZE];
        self.read_bytes(addr, buf)?;
        Ok(T::from_ne_bytes(buf))
    }

    /// Writes a typed value in memory order.
    ///
    /// # Errors
    ///
    /// Same outcomes as [`PhysicalMemory::write_bytes`].
    pub fn write<T: Scalar>(&mut self, addr: u32, value: T) -> Result<(), MemError> {
        let mut raw = [0u8; 8];
        let buf = &mut raw[..T::SIZE];
        value.to_ne_bytes(buf);
        self.write_bytes(addr, buf)
    }

    /// Returns the device registered at the given base address, if any.
    ///
    /// Intended for embedders poking device state from outside the bus.
    pub fn device_mut(&mut self, start: u32) -> Option<&mut (dyn MmioDevice + '_)> {
        let r = self.special.iter_mut().find(|r| r.range.start == start)?;
        Some(&mut *r.device)
    }
}
