//! ARM two-level page-table MMU tests.

use pretty_assertions::assert_eq;

use crate::common::asm::arm;
use crate::common::harness::ArmContext;
use hydra_core::PhysicalMemory;
use hydra_core::common::AccessType;
use hydra_core::core::arm::ArmMmu;

fn setup() -> (PhysicalMemory, ArmMmu) {
    let mut physmem = PhysicalMemory::new();
    physmem.add_ram(0, 0x40000).unwrap();
    // Little-endian core: descriptors are little-endian in RAM.
    let mut mmu = ArmMmu::new(false);
    mmu.set_ttbr(0x4000);
    mmu.set_enabled(true);
    (physmem, mmu)
}

fn write_desc(physmem: &mut PhysicalMemory, addr: u32, desc: u32) {
    physmem.write_bytes(addr, &desc.to_le_bytes()).unwrap();
}

#[test]
fn section_descriptor_maps_one_megabyte() {
    let (mut physmem, mut mmu) = setup();
    write_desc(&mut physmem, 0x4000, 0x10000C02); // section, base 0x10000000

    assert_eq!(
        mmu.translate(&mut physmem, 0x00001234, AccessType::DataRead),
        Some(0x10001234)
    );
    // Low 20 bits pass through untouched.
    assert_eq!(
        mmu.translate(&mut physmem, 0x000FFFFF, AccessType::DataRead),
        Some(0x100FFFFF)
    );
}

#[test]
fn coarse_table_maps_small_pages() {
    let (mut physmem, mut mmu) = setup();
    write_desc(&mut physmem, 0x4000, 0x00005001); // coarse table at 0x5000
    write_desc(&mut physmem, 0x5008, 0x00030002); // entry 2: small page 0x30000

    assert_eq!(
        mmu.translate(&mut physmem, 0x00002345, AccessType::DataRead),
        Some(0x00030345)
    );
    // A second-level fault entry.
    assert_eq!(
        mmu.translate(&mut physmem, 0x00003345, AccessType::DataRead),
        None
    );
}

#[test]
fn crossing_a_section_boundary_walks_again() {
    let (mut physmem, mut mmu) = setup();
    write_desc(&mut physmem, 0x4000, 0x10000C02); // section 0 mapped
    write_desc(&mut physmem, 0x4004, 0); // section 1 faults

    assert_eq!(
        mmu.translate(&mut physmem, 0x000FFFFC, AccessType::DataRead),
        Some(0x100FFFFC)
    );
    // One byte past the section: the cached entry cannot answer this.
    assert_eq!(
        mmu.translate(&mut physmem, 0x00100000, AccessType::DataRead),
        None
    );
}

#[test]
fn fault_descriptor_fails_translation() {
    let (mut physmem, mut mmu) = setup();
    write_desc(&mut physmem, 0x4000, 0);

    assert_eq!(
        mmu.translate(&mut physmem, 0x00001234, AccessType::DataRead),
        None
    );
}

#[test]
fn disabled_mmu_is_identity() {
    let (mut physmem, mut mmu) = setup();
    mmu.set_enabled(false);

    assert_eq!(
        mmu.translate(&mut physmem, 0xABCD1234, AccessType::Instruction),
        Some(0xABCD1234)
    );
}

#[test]
fn table_edits_take_effect_after_invalidation() {
    let (mut physmem, mut mmu) = setup();
    write_desc(&mut physmem, 0x4000, 0x10000C02);

    assert_eq!(
        mmu.translate(&mut physmem, 0x00001234, AccessType::DataRead),
        Some(0x10001234)
    );

    // Rewriting the descriptor alone is not observed: the cache still holds
    // the old mapping.
    write_desc(&mut physmem, 0x4000, 0x20000C02);
    assert_eq!(
        mmu.translate(&mut physmem, 0x00001234, AccessType::DataRead),
        Some(0x10001234)
    );

    mmu.invalidate_cache();
    assert_eq!(
        mmu.translate(&mut physmem, 0x00001234, AccessType::DataRead),
        Some(0x20001234)
    );
}

#[test]
fn ttbr_write_drops_the_cache() {
    let (mut physmem, mut mmu) = setup();
    write_desc(&mut physmem, 0x4000, 0x10000C02);
    let _ = mmu.translate(&mut physmem, 0x00001234, AccessType::DataRead);

    write_desc(&mut physmem, 0x8000, 0x30000C02);
    mmu.set_ttbr(0x8000);

    assert_eq!(
        mmu.translate(&mut physmem, 0x00001234, AccessType::DataRead),
        Some(0x30001234)
    );
}

#[test]
fn cp15_writes_configure_the_interpreter_mmu() {
    let mut ctx = ArmContext::new();
    // First-level entry 0: identity section, so fetches keep working once
    // translation turns on.
    ctx.physmem
        .borrow_mut()
        .write_bytes(0x4000, &0x00000C02u32.to_le_bytes())
        .unwrap();

    ctx.cpu.core.regs[0] = 0x4000; // TTBR
    ctx.cpu.core.regs[1] = 1; // control: translation enable

    // MCR p15 c2 (TTBR), MCR p15 c1 (control), MRC p15 c2 readback.
    ctx.load_program(
        0x100,
        &[arm::mcr_p15(2, 0), arm::mcr_p15(1, 1), arm::mrc_p15(2, 3)],
    );
    assert!(ctx.run(3));

    assert!(ctx.cpu.mmu.enabled());
    assert_eq!(ctx.cpu.mmu.ttbr(), 0x4000);
    assert_eq!(ctx.cpu.core.regs[3], 0x4000);
}

#[test]
fn cp15_non_mmu_registers_fall_through_to_the_hook() {
    let mut ctx = ArmContext::new();
    // Without a coprocessor hook, an unhandled register is fatal.
    ctx.load_program(0x100, &[arm::mrc_p15(0, 3)]);
    assert!(!ctx.run(1));
    assert!(ctx.cpu.debug.fatal());

    // With a hook installed it supplies the value.
    let mut ctx = ArmContext::new();
    ctx.cpu
        .set_coproc_read_handler(Box::new(|_core, reg| (reg.rn == 0).then_some(0x41007)));
    ctx.load_program(0x100, &[arm::mrc_p15(0, 3)]);
    assert!(ctx.run(1));
    assert_eq!(ctx.cpu.core.regs[3], 0x41007);
}

#[test]
fn cache_entries_are_per_access_type() {
    let (mut physmem, mut mmu) = setup();
    write_desc(&mut physmem, 0x4000, 0x10000C02);

    let _ = mmu.translate(&mut physmem, 0x00001234, AccessType::DataRead);
    write_desc(&mut physmem, 0x4000, 0x20000C02);

    // The data-read slot still hits; an instruction fetch walks fresh.
    assert_eq!(
        mmu.translate(&mut physmem, 0x00001234, AccessType::DataRead),
        Some(0x10001234)
    );
    assert_eq!(
        mmu.translate(&mut physmem, 0x00001234, AccessType::Instruction),
        Some(0x20001234)
    );
}
