//! ARM two-level page-table MMU.
//!
//! Translation walks a first-level table of 4096 section descriptors indexed
//! by the top 12 address bits. Sections map 1 MiB directly; coarse
//! descriptors point at a second-level table of 256 small-page descriptors
//! mapping 4 KiB each. Large/tiny pages do not occur in the firmware this
//! machine runs and are rejected. A per-access-type translation cache sits in
//! front of the walk; any change to the table base or the enable bit drops it.

use tracing::warn;

use crate::common::AccessType;
use crate::core::cache::TranslationCache;
use crate::mem::PhysicalMemory;

/// ARM MMU: translation-table walker plus translation cache.
pub struct ArmMmu {
    ttbr: u32,
    enabled: bool,
    cache_enabled: bool,
    swap: bool,
    cache: TranslationCache,
}

impl ArmMmu {
    /// Creates a disabled MMU.
    ///
    /// # Arguments
    ///
    /// * `big_endian` - Byte order of the owning CPU; page-table reads carry
    ///   the same swap as its typed accesses.
    pub fn new(big_endian: bool) -> Self {
        Self {
            ttbr: 0,
            enabled: false,
            cache_enabled: true,
            swap: crate::common::endian::needs_swap(big_endian),
            cache: TranslationCache::new(),
        }
    }

    /// Sets the translation table base register and drops the cache.
    pub fn set_ttbr(&mut self, base: u32) {
        self.ttbr = base;
        self.cache.invalidate();
    }

    /// Returns the translation table base register.
    pub fn ttbr(&self) -> u32 {
        self.ttbr
    }

    /// Enables or disables translation; identity mapping while disabled.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        self.cache.invalidate();
    }

    /// Returns whether translation is enabled.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Enables or disables the translation cache.
    pub fn set_cache_enabled(&mut self, enabled: bool) {
        self.cache_enabled = enabled;
    }

    /// Drops every translation-cache entry (TLB invalidate operations).
    pub fn invalidate_cache(&mut self) {
        self.cache.invalidate();
    }

    fn read32(&self, physmem: &mut PhysicalMemory, addr: u32) -> Option<u32> {
        let value: u32 = physmem.read(addr).ok()?;
        Some(if self.swap { value.swap_bytes() } else { value })
    }

    /// Resolves a virtual address to a physical address.
    ///
    /// # Arguments
    ///
    /// * `physmem` - Dispatcher used for the descriptor fetches.
    /// * `addr` - Virtual address.
    /// * `ty` - Access type (keys the translation cache).
    ///
    /// # Returns
    ///
    /// The physical address, or `None` on a translation fault.
    pub fn translate(
        &mut self,
        physmem: &mut PhysicalMemory,
        addr: u32,
        ty: AccessType,
    ) -> Option<u32> {
        if !self.enabled {
            return Some(addr);
        }
        if self.cache_enabled {
            if let Some(paddr) = self.cache.lookup(ty, addr) {
                return Some(paddr);
            }
        }

        let first_desc = self.read32(physmem, self.ttbr.wrapping_add((addr >> 20) * 4))?;
        match first_desc & 3 {
            1 => {
                // Coarse page table.
                let table_base = first_desc & !0x3FF;
                let offset = ((addr >> 12) & 0xFF) * 4;
                let second_desc = self.read32(physmem, table_base.wrapping_add(offset))?;
                match second_desc & 3 {
                    2 => {
                        // Small page.
                        let page_base = second_desc & !0xFFF;
                        self.cache.update(ty, addr, page_base, 0xFFF);
                        Some(page_base | (addr & 0xFFF))
                    }
                    0 => None,
                    kind => {
                        warn!(kind, "unsupported second-level descriptor type");
                        None
                    }
                }
            }
            2 => {
                // Section.
                let section_base = first_desc & !0xFFFFF;
                self.cache.update(ty, addr, section_base, 0xFFFFF);
                Some(section_base | (addr & 0xFFFFF))
            }
            0 => None,
            kind => {
                warn!(kind, "unsupported first-level descriptor type");
                None
            }
        }
    }
}
