//! ELF loader tests.

use std::io::Write;

use pretty_assertions::assert_eq;

use crate::common::elf::{self, Order};
use hydra_core::PhysicalMemory;
use hydra_core::common::LoadError;
use hydra_core::sim::loader;

fn physmem() -> PhysicalMemory {
    let mut physmem = PhysicalMemory::new();
    physmem.add_ram(0, 0x40000).unwrap();
    physmem
}

#[test]
fn big_endian_image_loads_at_its_physical_address() {
    let mut physmem = physmem();
    let payload = [0xDE, 0xAD, 0xBE, 0xEF, 0x01, 0x02, 0x03, 0x04];
    let image = elf::build(Order::Big, 0x2000, 0x2000, &payload, 8);

    let entry = loader::load_elf(&mut physmem, &image).unwrap();
    assert_eq!(entry, 0x2000);

    let mut raw = [0u8; 8];
    physmem.read_bytes(0x2000, &mut raw).unwrap();
    assert_eq!(raw, payload);
}

#[test]
fn little_endian_image_loads_the_same_way() {
    let mut physmem = physmem();
    let payload = [0x11, 0x22, 0x33, 0x44];
    let image = elf::build(Order::Little, 0x3000, 0x3000, &payload, 4);

    let entry = loader::load_elf(&mut physmem, &image).unwrap();
    assert_eq!(entry, 0x3000);

    let mut raw = [0u8; 4];
    physmem.read_bytes(0x3000, &mut raw).unwrap();
    assert_eq!(raw, payload);
}

#[test]
fn bss_tail_is_zeroed() {
    let mut physmem = physmem();
    // Dirty the window first.
    physmem.write_bytes(0x2000, &[0xFF; 16]).unwrap();

    let payload = [0xAA; 8];
    let image = elf::build(Order::Big, 0x2000, 0x2000, &payload, 12);
    loader::load_elf(&mut physmem, &image).unwrap();

    let mut raw = [0u8; 16];
    physmem.read_bytes(0x2000, &mut raw).unwrap();
    assert_eq!(&raw[..8], &[0xAA; 8]);
    assert_eq!(&raw[8..12], &[0; 4]);
    assert_eq!(&raw[12..], &[0xFF; 4]);
}

#[test]
fn bad_magic_is_a_parse_error() {
    let mut physmem = physmem();
    let mut image = elf::build(Order::Big, 0x2000, 0x2000, &[0u8; 4], 4);
    image[0] = 0x7E;

    let err = loader::load_elf(&mut physmem, &image).unwrap_err();
    assert!(matches!(err, LoadError::Parse(_)));
}

#[test]
fn segment_outside_memory_is_a_placement_error() {
    let mut physmem = physmem();
    let image = elf::build(Order::Big, 0, 0xF0000000, &[0u8; 4], 4);

    let err = loader::load_elf(&mut physmem, &image).unwrap_err();
    assert!(matches!(err, LoadError::Placement { addr: 0xF0000000, .. }));
}

#[test]
fn images_load_from_disk() {
    let mut physmem = physmem();
    let image = elf::build(Order::Big, 0x2000, 0x2000, &[1, 2, 3, 4], 4);

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&image).unwrap();

    let entry = loader::load_elf_file(&mut physmem, file.path()).unwrap();
    assert_eq!(entry, 0x2000);
}

#[test]
fn missing_file_is_an_io_error() {
    let mut physmem = physmem();
    let err =
        loader::load_elf_file(&mut physmem, std::path::Path::new("/nonexistent.elf")).unwrap_err();
    assert!(matches!(err, LoadError::Io(_)));
}
