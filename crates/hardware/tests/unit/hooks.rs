//! Breakpoint, watchpoint, alarm, and fault-recovery tests.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use pretty_assertions::assert_eq;

use crate::common::asm::{arm, ppc};
use crate::common::harness::{ArmContext, PpcContext};

#[cfg(feature = "debug-hooks")]
#[test]
fn breakpoint_fires_at_the_step_boundary() {
    let mut ctx = PpcContext::new();
    let hit: Rc<RefCell<Vec<u32>>> = Rc::new(RefCell::new(Vec::new()));

    ctx.cpu.debug.breakpoints.push(0x1004);
    let log = Rc::clone(&hit);
    ctx.cpu.set_breakpoint_handler(Box::new(move |_core, pc| {
        log.borrow_mut().push(pc);
        false
    }));

    ctx.load_program(
        0x1000,
        &[ppc::addi(3, 3, 1), ppc::addi(3, 3, 1), ppc::addi(3, 3, 1)],
    );
    assert!(!ctx.run(0));

    assert_eq!(*hit.borrow(), vec![0x1004]);
    // Only the instruction before the breakpoint executed.
    assert_eq!(ctx.cpu.core.regs[3], 1);
}

#[cfg(feature = "debug-hooks")]
#[test]
fn breakpoint_handler_may_continue() {
    let mut ctx = PpcContext::new();
    ctx.cpu.debug.breakpoints.push(0x1004);
    ctx.cpu.set_breakpoint_handler(Box::new(|_core, _pc| true));

    ctx.load_program(
        0x1000,
        &[ppc::addi(3, 3, 1), ppc::addi(3, 3, 1), ppc::addi(3, 3, 1)],
    );
    assert!(ctx.run(3));
    assert_eq!(ctx.cpu.core.regs[3], 3);
}

#[cfg(feature = "debug-hooks")]
#[test]
fn write_watchpoint_reports_address_and_direction() {
    let mut ctx = PpcContext::new();
    let hit: Rc<RefCell<Vec<(u32, bool)>>> = Rc::new(RefCell::new(Vec::new()));

    // Watch a byte in the middle of the stored word.
    ctx.cpu.debug.watch_write.push(0x2002);
    let log = Rc::clone(&hit);
    ctx.cpu.set_watchpoint_handler(
        true,
        Box::new(move |_core, addr, write| {
            log.borrow_mut().push((addr, write));
            false
        }),
    );

    ctx.cpu.core.regs[1] = 0x2000;
    ctx.load_program(0x1000, &[ppc::stw(3, 1, 0)]);
    assert!(!ctx.run(0));

    assert_eq!(*hit.borrow(), vec![(0x2002, true)]);
}

#[cfg(feature = "debug-hooks")]
#[test]
fn read_watchpoint_ignores_code_fetches() {
    let mut ctx = PpcContext::new();
    let hits = Rc::new(Cell::new(0u32));

    // Watch the program's own address: fetches must not trip it.
    ctx.cpu.debug.watch_read.push(0x1000);
    let counter = Rc::clone(&hits);
    ctx.cpu.set_watchpoint_handler(
        false,
        Box::new(move |_core, _addr, _write| {
            counter.set(counter.get() + 1);
            true
        }),
    );

    ctx.load_program(0x1000, &[ppc::addi(3, 3, 1), ppc::addi(3, 3, 1)]);
    assert!(ctx.run(2));
    assert_eq!(hits.get(), 0);

    // A data load of the same address does trip it. The hit is delivered
    // at the next step boundary, so run one trailing instruction.
    ctx.cpu.core.regs[1] = 0x1000;
    ctx.load_program(0x2000, &[ppc::lwz(4, 1, 0), ppc::addi(3, 3, 1)]);
    assert!(ctx.run(2));
    assert_eq!(hits.get(), 1);
}

#[test]
fn alarm_fires_on_its_interval() {
    let mut ctx = PpcContext::new();
    let fires = Rc::new(Cell::new(0u32));
    let counter = Rc::clone(&fires);
    ctx.cpu.set_alarm(
        3,
        Box::new(move |_core| {
            counter.set(counter.get() + 1);
            true
        }),
    );

    // Tight self-loop.
    ctx.load_program(0x1000, &[ppc::b(0, false)]);
    assert!(ctx.run(9));
    assert_eq!(fires.get(), 3);
}

#[test]
fn alarm_can_stop_the_run() {
    let mut ctx = PpcContext::new();
    ctx.cpu.set_alarm(2, Box::new(|_core| false));

    ctx.load_program(0x1000, &[ppc::b(0, false)]);
    assert!(!ctx.run(0));
}

#[test]
fn unimplemented_opcode_is_recoverable() {
    let mut ctx = PpcContext::new();
    // Primary opcode 0 is not implemented; execution reports it and moves on.
    crate::common::harness::write_words_be(&ctx.physmem, 0x1000, &[0x00000003]);
    crate::common::harness::write_words_be(&ctx.physmem, 0x1004, &[ppc::addi(3, 0, 9)]);
    ctx.cpu.core.pc = 0x1000;

    assert!(ctx.run(2));
    assert!(!ctx.cpu.debug.fatal());
    assert_eq!(ctx.cpu.core.regs[3], 9);
}

#[test]
fn missing_data_error_handler_stops_the_machine() {
    let mut ctx = PpcContext::new();
    ctx.cpu.core.regs[3] = 0x00800000;
    ctx.load_program(0x1000, &[ppc::lwz(4, 3, 0)]);

    assert!(!ctx.run(1));
    assert!(ctx.cpu.debug.fatal());
}

#[test]
fn arm_software_interrupt_routes_to_the_hook() {
    let mut ctx = ArmContext::new();
    let seen: Rc<RefCell<Vec<u32>>> = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&seen);
    ctx.cpu.set_swi_handler(Box::new(move |_core, imm| {
        log.borrow_mut().push(imm);
        true
    }));

    ctx.load_program(0x100, &[arm::swi(0xAB)]);
    assert!(ctx.run(1));
    assert_eq!(*seen.borrow(), vec![0xAB]);

    // Without a handler the trigger is fatal.
    let mut ctx = ArmContext::new();
    ctx.load_program(0x100, &[arm::swi(0xAB)]);
    assert!(!ctx.run(1));
    assert!(ctx.cpu.debug.fatal());
}

#[test]
fn arm_undefined_instruction_routes_to_the_hook() {
    let mut ctx = ArmContext::new();
    let hits = Rc::new(Cell::new(0u32));
    let counter = Rc::clone(&hits);
    ctx.cpu.set_undefined_handler(Box::new(move |core| {
        counter.set(counter.get() + 1);
        core.trigger_exception(hydra_core::core::arm::ArmException::UndefinedInstruction);
        true
    }));

    // An encoding in the architecturally undefined space; the handler
    // vectors the core and reports the instruction as handled.
    ctx.load_program(0x100, &[0xE6000010]);
    assert!(ctx.step());
    assert!(!ctx.cpu.debug.fatal());
    assert_eq!(hits.get(), 1);
    assert_eq!(ctx.cpu.core.regs[hydra_core::core::arm::PC], 0xFFFF0004);
}

#[cfg(feature = "debug-hooks")]
#[test]
fn arm_breakpoints_share_the_same_contract() {
    let mut ctx = ArmContext::new();
    let hit = Rc::new(Cell::new(0u32));

    ctx.cpu.debug.breakpoints.push(0x104);
    let counter = Rc::clone(&hit);
    ctx.cpu.set_breakpoint_handler(Box::new(move |_core, _pc| {
        counter.set(counter.get() + 1);
        false
    }));

    ctx.load_program(
        0x100,
        &[
            arm::dp_imm(13, false, 0, 0, 0, 1), // MOV R0, #1
            arm::dp_imm(13, false, 0, 0, 0, 2),
        ],
    );
    assert!(!ctx.run(0));
    assert_eq!(hit.get(), 1);
    assert_eq!(ctx.cpu.core.regs[0], 1);
}
