//! Translation cache tests.

use pretty_assertions::assert_eq;

use hydra_core::common::AccessType;
use hydra_core::core::cache::TranslationCache;

#[test]
fn empty_cache_misses() {
    let cache = TranslationCache::new();
    assert_eq!(cache.lookup(AccessType::DataRead, 0x1234), None);
}

#[test]
fn hit_substitutes_the_physical_base() {
    let mut cache = TranslationCache::new();
    cache.update(AccessType::DataRead, 0x00001234, 0x10000000, 0xFFF);

    assert_eq!(cache.lookup(AccessType::DataRead, 0x00001777), Some(0x10000777));
    // Outside the page: miss.
    assert_eq!(cache.lookup(AccessType::DataRead, 0x00002000), None);
}

#[test]
fn low_bits_survive_translation() {
    let mut cache = TranslationCache::new();
    cache.update(AccessType::Instruction, 0x00345678, 0x80000000, 0xFFFFF);

    let paddr = cache.lookup(AccessType::Instruction, 0x00345678).unwrap();
    assert_eq!(paddr & 0xFFFFF, 0x00345678 & 0xFFFFF);
}

#[test]
fn entries_are_keyed_by_access_type() {
    let mut cache = TranslationCache::new();
    cache.update(AccessType::DataRead, 0x1000, 0x5000, 0xFFF);

    assert!(cache.lookup(AccessType::DataRead, 0x1000).is_some());
    assert_eq!(cache.lookup(AccessType::DataWrite, 0x1000), None);
    assert_eq!(cache.lookup(AccessType::Instruction, 0x1000), None);
}

#[test]
fn invalidate_drops_everything() {
    let mut cache = TranslationCache::new();
    cache.update(AccessType::DataRead, 0x1000, 0x5000, 0xFFF);
    cache.update(AccessType::DataWrite, 0x1000, 0x5000, 0xFFF);

    cache.invalidate();
    assert_eq!(cache.lookup(AccessType::DataRead, 0x1000), None);
    assert_eq!(cache.lookup(AccessType::DataWrite, 0x1000), None);
}
