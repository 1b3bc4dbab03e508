//! RAM buffer implementation.
//!
//! This module provides a safe wrapper around raw memory allocation for the
//! emulated RAM ranges. It uses lazy allocation via `mmap` on Unix systems to
//! optimize host memory usage and startup time; the console's main memory
//! ranges are large and mostly untouched during early boot.

use std::slice;

/// A wrapper around a raw memory buffer backing one RAM range.
///
/// On Unix systems, this uses `mmap` to allocate anonymous memory, which
/// allows for lazy allocation (pages are only allocated by the OS when
/// accessed). This significantly improves startup time and memory pressure
/// for multi-gigabyte RAM ranges.
pub struct RamBuffer {
    ptr: *mut u8,
    size: usize,
    is_mmap: bool,
}

impl RamBuffer {
    /// Creates a new RAM buffer of the specified size, zero-filled.
    ///
    /// On Unix, uses `mmap` for lazy allocation; on other platforms,
    /// allocates a `Vec`.
    ///
    /// # Arguments
    ///
    /// * `size` - Size of the buffer in bytes.
    ///
    /// # Panics
    ///
    /// Panics if the host refuses the anonymous mapping; there is no way to
    /// run the machine without its RAM.
    pub fn new(size: usize) -> Self {
        #[cfg(unix)]
        {
            use std::ptr;
            let ptr = unsafe {
                libc::mmap(
                    ptr::null_mut(),
                    size,
                    libc::PROT_READ | libc::PROT_WRITE,
                    libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                    -1,
                    0,
                )
            };

            assert!(
                ptr != libc::MAP_FAILED,
                "failed to mmap RAM buffer of size {size}"
            );

            Self {
                ptr: ptr.cast::<u8>(),
                size,
                is_mmap: true,
            }
        }

        #[cfg(not(unix))]
        {
            let mut vec = vec![0u8; size];
            let ptr = vec.as_mut_ptr();
            std::mem::forget(vec);
            Self {
                ptr,
                size,
                is_mmap: false,
            }
        }
    }

    /// Returns the size of the buffer in bytes.
    pub fn len(&self) -> usize {
        self.size
    }

    /// Returns `true` if the buffer has zero length.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Reads a slice of memory.
    ///
    /// # Panics
    ///
    /// Panics if the requested window exceeds the buffer; the dispatcher
    /// checks containment before calling.
    pub fn read_slice(&self, offset: usize, len: usize) -> &[u8] {
        assert!(offset + len <= self.size, "RAM read out of bounds");
        // SAFETY: the assertion above keeps the window inside the allocation,
        // which lives as long as `self`.
        unsafe { slice::from_raw_parts(self.ptr.add(offset), len) }
    }

    /// Writes a slice of memory.
    ///
    /// # Panics
    ///
    /// Panics if the written window exceeds the buffer.
    pub fn write_slice(&mut self, offset: usize, data: &[u8]) {
        assert!(offset + data.len() <= self.size, "RAM write out of bounds");
        // SAFETY: the assertion above keeps the window inside the allocation.
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), self.ptr.add(offset), data.len());
        }
    }
}

impl Drop for RamBuffer {
    fn drop(&mut self) {
        if self.is_mmap {
            #[cfg(unix)]
            // SAFETY: ptr/size came from a successful mmap in `new`.
            unsafe {
                libc::munmap(self.ptr.cast(), self.size);
            }
        } else {
            #[cfg(not(unix))]
            // SAFETY: ptr/size/capacity came from the Vec forgotten in `new`.
            unsafe {
                let _ = Vec::from_raw_parts(self.ptr, self.size, self.size);
            }
        }
    }
}
