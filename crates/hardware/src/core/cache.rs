//! Per-access-type translation cache.
//!
//! A tiny software TLB private to each MMU. One entry is kept per access
//! type (instruction fetch, data read, data write); each entry records the
//! `(virtual_base, physical_base, mask)` of the last successful walk. A hit
//! must reproduce exactly the mapping a full page-table walk would produce
//! under the current MMU state, so the owning MMU invalidates the cache
//! whenever its translation inputs change.

use crate::common::AccessType;

#[derive(Clone, Copy, Default)]
struct CacheEntry {
    vbase: u32,
    pbase: u32,
    mask: u32,
    valid: bool,
}

/// Translation cache with one slot per access type.
#[derive(Default)]
pub struct TranslationCache {
    entries: [CacheEntry; 3],
}

impl TranslationCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a virtual address for the given access type.
    ///
    /// # Returns
    ///
    /// The translated physical address on a hit, otherwise `None`.
    #[inline]
    pub fn lookup(&self, ty: AccessType, addr: u32) -> Option<u32> {
        let entry = &self.entries[ty.index()];
        if entry.valid && (addr & !entry.mask) == entry.vbase {
            return Some(entry.pbase | (addr & entry.mask));
        }
        None
    }

    /// Records a successful translation.
    ///
    /// # Arguments
    ///
    /// * `ty` - Access type the walk was performed for.
    /// * `vaddr` - The virtual address that was translated.
    /// * `pbase` - Physical base of the page or section.
    /// * `mask` - Low-bit mask of the page or section (e.g. `0xFFF`).
    #[inline]
    pub fn update(&mut self, ty: AccessType, vaddr: u32, pbase: u32, mask: u32) {
        self.entries[ty.index()] = CacheEntry {
            vbase: vaddr & !mask,
            pbase,
            mask,
            valid: true,
        };
    }

    /// Drops every entry.
    pub fn invalidate(&mut self) {
        for entry in &mut self.entries {
            entry.valid = false;
        }
    }
}
