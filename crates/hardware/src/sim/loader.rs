//! ELF boot-image loading.
//!
//! Boot images are 32-bit ELF files of either endianness. Only `PT_LOAD`
//! segments are honored: their file bytes are copied to their physical
//! addresses through the dispatcher, and any memory-size tail beyond the
//! file size is zeroed. Validation (magic, class, version, header sizes)
//! is the parser's job; a malformed image is rejected before any byte
//! lands in RAM.

use std::fs;
use std::path::Path;

use object::read::elf::ElfFile32;
use object::{Object, ObjectSegment};
use tracing::debug;

use crate::common::LoadError;
use crate::mem::PhysicalMemory;

/// Loads a 32-bit ELF image into physical memory.
///
/// # Arguments
///
/// * `physmem` - Dispatcher the segment bytes are written through.
/// * `image` - The raw image bytes.
///
/// # Returns
///
/// The image's entry point.
///
/// # Errors
///
/// [`LoadError::Parse`] for a malformed image, [`LoadError::Placement`]
/// when a segment does not fit a registered memory range.
pub fn load_elf(physmem: &mut PhysicalMemory, image: &[u8]) -> Result<u32, LoadError> {
    let file: ElfFile32<'_> = ElfFile32::parse(image)?;

    for segment in file.segments() {
        let addr = segment.address() as u32;
        let data = segment.data()?;
        let memsize = segment.size() as u32;

        debug!(
            addr = format_args!("{addr:#010x}"),
            filesize = data.len(),
            memsize,
            "loading segment"
        );

        if !data.is_empty() {
            physmem
                .write_bytes(addr, data)
                .map_err(|_| LoadError::Placement {
                    addr,
                    length: memsize,
                })?;
        }

        // Zero the bss tail in case an earlier segment or image left bytes
        // behind in the window.
        if memsize as usize > data.len() {
            let zeros = vec![0u8; memsize as usize - data.len()];
            physmem
                .write_bytes(addr.wrapping_add(data.len() as u32), &zeros)
                .map_err(|_| LoadError::Placement {
                    addr,
                    length: memsize,
                })?;
        }
    }

    Ok(file.entry() as u32)
}

/// Loads a 32-bit ELF image from disk into physical memory.
///
/// # Errors
///
/// [`LoadError::Io`] when the file cannot be read, plus everything
/// [`load_elf`] reports.
pub fn load_elf_file(physmem: &mut PhysicalMemory, path: &Path) -> Result<u32, LoadError> {
    let image = fs::read(path)?;
    load_elf(physmem, &image)
}
