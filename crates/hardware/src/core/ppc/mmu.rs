//! PowerPC BAT + hashed-page-table MMU.
//!
//! Translation tries, in order:
//! 1. The per-access-type translation cache.
//! 2. The block address translation array for the access type (8 entries,
//!    128 KiB granules, supervisor/user validity bits, PP protection).
//! 3. The hashed page table: the segment register of the address selects a
//!    VSID and protection key, the primary hash (and its complement for the
//!    secondary walk) selects a group of 8 PTEs at `SDR1`, and a matching,
//!    valid, access-permitted PTE yields the physical page.
//!
//! The page size is configurable through `set_rpn_size`; segment-register,
//! SDR1, and BAT writes all drop the translation cache. Instruction and
//! data translation enables and the supervisor state are sampled from the
//! MSR on every call, so exception entry (which clears IR/DR) takes effect
//! immediately.

use tracing::{error, warn};

use crate::common::AccessType;
use crate::core::cache::TranslationCache;
use crate::core::ppc::PpcCore;
use crate::mem::PhysicalMemory;

/// PowerPC MMU: BAT arrays, segment registers, hashed page table walker.
pub struct PpcMmu {
    dbat_upper: [u32; 8],
    dbat_lower: [u32; 8],
    ibat_upper: [u32; 8],
    ibat_lower: [u32; 8],
    sr: [u32; 16],
    sdr1: u32,

    page_index_shift: u32,
    page_index_mask: u32,
    byte_offset_mask: u32,
    api_shift: u32,

    cache_enabled: bool,
    swap: bool,
    cache: TranslationCache,
}

impl Default for PpcMmu {
    fn default() -> Self {
        Self::new()
    }
}

impl PpcMmu {
    /// Creates an MMU with 4 KiB pages and everything invalid.
    pub fn new() -> Self {
        let mut mmu = Self {
            dbat_upper: [0; 8],
            dbat_lower: [0; 8],
            ibat_upper: [0; 8],
            ibat_lower: [0; 8],
            sr: [0; 16],
            sdr1: 0,
            page_index_shift: 0,
            page_index_mask: 0,
            byte_offset_mask: 0,
            api_shift: 0,
            cache_enabled: true,
            swap: crate::common::endian::needs_swap(true),
            cache: TranslationCache::new(),
        };
        mmu.set_rpn_size(20);
        mmu
    }

    /// Reconfigures the page size from the RPN width in bits.
    ///
    /// 20 RPN bits give the architectural 4 KiB pages; the derived page
    /// index shift, index mask, byte offset mask, and API shift follow.
    pub fn set_rpn_size(&mut self, bits: u32) {
        self.page_index_shift = 32 - bits;
        self.page_index_mask = (1 << (28 - self.page_index_shift)) - 1;
        self.byte_offset_mask = (1 << self.page_index_shift) - 1;
        self.api_shift = 22 - self.page_index_shift;
        self.cache.invalidate();
    }

    /// Writes a segment register and drops the translation cache.
    pub fn set_segment(&mut self, index: usize, value: u32) {
        self.sr[index] = value;
        self.cache.invalidate();
    }

    /// Reads a segment register.
    pub fn segment(&self, index: usize) -> u32 {
        self.sr[index]
    }

    /// Writes SDR1 (page-table base and hash mask) and drops the cache.
    pub fn set_sdr1(&mut self, value: u32) {
        self.sdr1 = value;
        self.cache.invalidate();
    }

    /// Reads SDR1.
    pub fn sdr1(&self) -> u32 {
        self.sdr1
    }

    /// Writes an instruction BAT register half and drops the cache.
    pub fn set_ibat(&mut self, index: usize, upper: bool, value: u32) {
        if upper {
            self.ibat_upper[index] = value;
        } else {
            self.ibat_lower[index] = value;
        }
        self.cache.invalidate();
    }

    /// Reads an instruction BAT register half.
    pub fn ibat(&self, index: usize, upper: bool) -> u32 {
        if upper {
            self.ibat_upper[index]
        } else {
            self.ibat_lower[index]
        }
    }

    /// Writes a data BAT register half and drops the cache.
    pub fn set_dbat(&mut self, index: usize, upper: bool, value: u32) {
        if upper {
            self.dbat_upper[index] = value;
        } else {
            self.dbat_lower[index] = value;
        }
        self.cache.invalidate();
    }

    /// Reads a data BAT register half.
    pub fn dbat(&self, index: usize, upper: bool) -> u32 {
        if upper {
            self.dbat_upper[index]
        } else {
            self.dbat_lower[index]
        }
    }

    /// Enables or disables the translation cache.
    pub fn set_cache_enabled(&mut self, enabled: bool) {
        self.cache_enabled = enabled;
    }

    /// Drops every translation-cache entry (`tlbie`, `icbi`).
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
    /// * `physmem` - Dispatcher used for the page-table reads.
    /// * `addr` - Virtual address.
    /// * `ty` - Access type.
    /// * `msr` - Current MSR; supplies IR/DR enables and supervisor state.
    ///
    /// # Returns
    ///
    /// The physical address, or `None` on a translation or protection fault.
    pub fn translate(
        &mut self,
        physmem: &mut PhysicalMemory,
        addr: u32,
        ty: AccessType,
        msr: u32,
    ) -> Option<u32> {
        let enabled = if ty == AccessType::Instruction {
            msr & PpcCore::MSR_IR != 0
        } else {
            msr & PpcCore::MSR_DR != 0
        };
        if !enabled {
            return Some(addr);
        }

        if self.cache_enabled {
            if let Some(paddr) = self.cache.lookup(ty, addr) {
                return Some(paddr);
            }
        }

        let supervisor = msr & PpcCore::MSR_PR == 0;
        if let Some(paddr) = self.translate_bat(addr, ty, supervisor) {
            return Some(paddr);
        }

        let segment = self.sr[(addr >> 28) as usize];
        if segment >> 31 != 0 {
            error!(
                addr = format_args!("{addr:#010x}"),
                "direct-store segment access"
            );
            return None;
        }

        // Segment bit 28 is no-execute; it only blocks the page-table path
        // for instruction fetches.
        if segment & 0x10000000 == 0 || ty != AccessType::Instruction {
            let page_index = (addr >> self.page_index_shift) & self.page_index_mask;
            let vsid = segment & 0xFFFFFF;

            let key = if supervisor {
                segment >> 30 & 1 != 0 // Ks
            } else {
                segment >> 29 & 1 != 0 // Kp
            };

            let primary_hash = (vsid & 0x7FFFF) ^ page_index;
            if let Some(paddr) =
                self.search_page_table(physmem, addr, vsid, page_index, primary_hash, false, key, ty)
            {
                return Some(paddr);
            }
            if let Some(paddr) =
                self.search_page_table(physmem, addr, vsid, page_index, !primary_hash, true, key, ty)
            {
                return Some(paddr);
            }
        }

        warn!(
            addr = format_args!("{addr:#010x}"),
            ty = ?ty,
            "page translation failed"
        );
        None
    }

    fn translate_bat(&mut self, addr: u32, ty: AccessType, supervisor: bool) -> Option<u32> {
        let write = ty == AccessType::DataWrite;
        let (upper, lower) = if ty == AccessType::Instruction {
            (&self.ibat_upper, &self.ibat_lower)
        } else {
            (&self.dbat_upper, &self.dbat_lower)
        };

        for i in 0..8 {
            // Read/write protection
            let pp = lower[i] & 3;
            if pp == 0 || (pp & 1 != 0 && write) {
                continue;
            }

            // User/supervisor validity
            let vp = upper[i] & 1 != 0;
            let vs = upper[i] & 2 != 0;
            if !((vp && !supervisor) || (vs && supervisor)) {
                continue;
            }

            // Block index and size
            let addr_mask = !((upper[i] >> 2) & 0x7FF);
            let effective_block = upper[i] >> 17;
            let addr_block = addr >> 17;
            if effective_block & addr_mask != addr_block & addr_mask {
                continue;
            }

            let brpn = lower[i] >> 17;
            let mapped_block = (addr_block & !addr_mask) | (brpn & addr_mask);
            self.cache.update(ty, addr, mapped_block << 17, 0x1FFFF);
            return Some((addr & 0x1FFFF) | (mapped_block << 17));
        }
        None
    }

    #[allow(clippy::too_many_arguments)]
    fn search_page_table(
        &mut self,
        physmem: &mut PhysicalMemory,
        addr: u32,
        vsid: u32,
        page_index: u32,
        hash: u32,
        secondary: bool,
        key: bool,
        ty: AccessType,
    ) -> Option<u32> {
        let write = ty == AccessType::DataWrite;
        let page_table = self.sdr1 & 0xFFFF0000;
        let page_mask = self.sdr1 & 0x1FF;
        let masked_hash = hash & ((page_mask << 10) | 0x3FF);
        let api = page_index >> self.api_shift;

        let mut pte_addr = page_table | (masked_hash << 6);
        for _ in 0..8 {
            let hi = self.read32(physmem, pte_addr)?;
            let lo = self.read32(physmem, pte_addr + 4)?;
            pte_addr += 8;

            // Validity
            if hi >> 31 == 0 {
                continue;
            }
            if (hi >> 6 & 1 != 0) != secondary {
                continue;
            }
            if hi >> 7 & 0xFFFFFF != vsid {
                continue;
            }
            if hi & 0x3F != api {
                continue;
            }

            // Protection
            let pp = lo & 3;
            if key && pp == 0 {
                continue;
            }
            if write && (pp == 3 || (key && pp == 1)) {
                continue;
            }

            let page_base = lo & 0xFFFFF000;
            self.cache.update(ty, addr, page_base, self.byte_offset_mask);
            return Some(page_base | (addr & self.byte_offset_mask));
        }
        None
    }
}
