//! ARM load/store, multiple-transfer, and swap tests.

use pretty_assertions::assert_eq;

use crate::common::asm::arm;
use crate::common::harness::ArmContext;

#[test]
fn word_store_load_round_trip() {
    let mut ctx = ArmContext::new();
    ctx.cpu.core.regs[0] = 0x2000;
    ctx.cpu.core.regs[1] = 0xCAFEBABE;

    ctx.load_program(0x100, &[arm::str_imm(1, 0, 0), arm::ldr_imm(2, 0, 0)]);
    assert!(ctx.run(2));

    assert_eq!(ctx.cpu.core.regs[2], 0xCAFEBABE);
    // This core runs little-endian: guest byte order lands in RAM.
    let mut raw = [0u8; 4];
    ctx.physmem.borrow_mut().read_bytes(0x2000, &mut raw).unwrap();
    assert_eq!(raw, 0xCAFEBABEu32.to_le_bytes());
}

#[test]
fn byte_and_half_round_trips_with_sign_extension() {
    let mut ctx = ArmContext::new();
    ctx.cpu.core.regs[0] = 0x2000;
    ctx.cpu.core.regs[1] = 0x8001;

    ctx.load_program(
        0x100,
        &[
            arm::strh_imm(1, 0, 0),
            arm::ldrh_imm(2, 0, 0),
            arm::ldrsh_imm(3, 0, 0),
            arm::strb_imm(1, 0, 8),
            arm::ldrb_imm(4, 0, 8),
            arm::ldrsb_imm(5, 0, 8),
        ],
    );
    assert!(ctx.run(6));

    assert_eq!(ctx.cpu.core.regs[2], 0x8001);
    assert_eq!(ctx.cpu.core.regs[3], 0xFFFF8001);
    assert_eq!(ctx.cpu.core.regs[4], 0x01);
    // 0x8001 truncates to 0x01, which is non-negative as a byte.
    assert_eq!(ctx.cpu.core.regs[5], 0x01);

    // A genuinely negative byte.
    ctx.cpu.core.regs[1] = 0x80;
    ctx.load_program(0x200, &[arm::strb_imm(1, 0, 12), arm::ldrsb_imm(6, 0, 12)]);
    assert!(ctx.run(2));
    assert_eq!(ctx.cpu.core.regs[6], 0xFFFFFF80);
}

#[test]
fn post_indexed_load_writes_back() {
    let mut ctx = ArmContext::new();
    ctx.cpu.core.regs[0] = 0x2000;
    ctx.physmem
        .borrow_mut()
        .write_bytes(0x2000, &0x11223344u32.to_le_bytes())
        .unwrap();

    // LDR R1, [R0], #4 (post-index: P=0, implicit writeback)
    let ldr_post = 0xE4900000 | (0 << 16) | (1 << 12) | 4;
    ctx.load_program(0x100, &[ldr_post]);
    assert!(ctx.step());

    assert_eq!(ctx.cpu.core.regs[1], 0x11223344);
    assert_eq!(ctx.cpu.core.regs[0], 0x2004);
}

#[test]
fn stm_ldm_round_trip() {
    let mut ctx = ArmContext::new();
    ctx.cpu.core.regs[0] = 0x2000;
    ctx.cpu.core.regs[1] = 0x11;
    ctx.cpu.core.regs[2] = 0x22;
    ctx.cpu.core.regs[3] = 0x33;

    ctx.load_program(0x100, &[arm::stmia(0, 0b1110, false)]);
    assert!(ctx.step());

    ctx.cpu.core.regs[1] = 0;
    ctx.cpu.core.regs[2] = 0;
    ctx.cpu.core.regs[3] = 0;
    ctx.load_program(0x200, &[arm::ldmia(0, 0b1110, false)]);
    assert!(ctx.step());

    assert_eq!(ctx.cpu.core.regs[1], 0x11);
    assert_eq!(ctx.cpu.core.regs[2], 0x22);
    assert_eq!(ctx.cpu.core.regs[3], 0x33);
}

#[test]
fn stmdb_descends_like_push() {
    let mut ctx = ArmContext::new();
    ctx.cpu.core.regs[13] = 0x3000;
    ctx.cpu.core.regs[1] = 0xAA;
    ctx.cpu.core.regs[2] = 0xBB;

    // STMDB SP!, {R1, R2}
    ctx.load_program(0x100, &[arm::stmdb(13, 0b110, true)]);
    assert!(ctx.step());

    assert_eq!(ctx.cpu.core.regs[13], 0x2FF8);
    assert_eq!(ctx.cpu.read::<u32>(0x2FF8).unwrap(), 0xAA);
    assert_eq!(ctx.cpu.read::<u32>(0x2FFC).unwrap(), 0xBB);
}

#[test]
fn ldm_writeback_with_base_in_list_lets_writeback_win() {
    let mut ctx = ArmContext::new();
    ctx.cpu.core.regs[0] = 0x2000;
    {
        let mut physmem = ctx.physmem.borrow_mut();
        physmem.write_bytes(0x2000, &0x1111u32.to_le_bytes()).unwrap();
        physmem.write_bytes(0x2004, &0x2222u32.to_le_bytes()).unwrap();
    }

    // LDMIA R0!, {R0, R1}: the final base writeback overwrites the loaded R0.
    ctx.load_program(0x100, &[arm::ldmia(0, 0b11, true)]);
    assert!(ctx.step());

    assert_eq!(ctx.cpu.core.regs[1], 0x2222);
    assert_eq!(ctx.cpu.core.regs[0], 0x2008);
}

#[test]
fn swp_exchanges_register_and_memory() {
    let mut ctx = ArmContext::new();
    ctx.cpu.core.regs[0] = 0x2000;
    ctx.cpu.core.regs[2] = 0x22222222;
    ctx.physmem
        .borrow_mut()
        .write_bytes(0x2000, &0x11111111u32.to_le_bytes())
        .unwrap();

    // SWP R1, R2, [R0]
    ctx.load_program(0x100, &[arm::swp(1, 2, 0)]);
    assert!(ctx.step());

    assert_eq!(ctx.cpu.core.regs[1], 0x11111111);
    assert_eq!(ctx.cpu.read::<u32>(0x2000).unwrap(), 0x22222222);
}
