//! ARM interpreter: fetch, condition evaluation, typed access, and hooks.
//!
//! One step fetches 4 bytes (ARM state) or 2 bytes (Thumb state) at the PC,
//! advances the PC, and dispatches into the decode trees in [`super::exec`]
//! and [`super::thumb`]. All operand memory traffic funnels through the typed
//! `read`/`write` methods here: watchpoint scan, MMU translation, physical
//! dispatch, endian swap. Translation and bus failures route to the
//! data/fetch error hooks; a hook that returns `true` has redirected the core
//! to its exception vector and execution continues there.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::error;

use crate::common::{AccessType, MemError, Scalar};
use crate::core::arm::mmu::ArmMmu;
use crate::core::arm::{ArmCore, PC, exec, thumb};
use crate::core::interp::{DebugState, Processor};
use crate::mem::PhysicalMemory;

/// Coprocessor register coordinates of an MRC/MCR transfer.
#[derive(Clone, Copy, Debug)]
pub struct CoprocReg {
    /// Coprocessor number (bits 8-11).
    pub coproc: u32,
    /// Opcode 1 field.
    pub opc: u32,
    /// CRn field.
    pub rn: u32,
    /// CRm field.
    pub rm: u32,
    /// Opcode 2 field.
    pub ty: u32,
}

/// Data-abort hook: `(core, address, is_write) -> recovered`.
pub type DataErrorFn = Box<dyn FnMut(&mut ArmCore, u32, bool) -> bool>;
/// Fetch-abort hook: `(core, address) -> recovered`.
pub type FetchErrorFn = Box<dyn FnMut(&mut ArmCore, u32) -> bool>;
/// Breakpoint hook: `(core, pc) -> continue`.
pub type BreakpointFn = Box<dyn FnMut(&mut ArmCore, u32) -> bool>;
/// Watchpoint hook: `(core, address, is_write) -> continue`.
pub type WatchpointFn = Box<dyn FnMut(&mut ArmCore, u32, bool) -> bool>;
/// Alarm hook: `(core) -> continue`.
pub type AlarmFn = Box<dyn FnMut(&mut ArmCore) -> bool>;
/// Coprocessor read hook: returns the value, or `None` on failure.
pub type CoprocReadFn = Box<dyn FnMut(&mut ArmCore, CoprocReg) -> Option<u32>>;
/// Coprocessor write hook.
pub type CoprocWriteFn = Box<dyn FnMut(&mut ArmCore, CoprocReg, u32) -> bool>;
/// Software interrupt hook: `(core, immediate) -> handled`.
pub type SwiFn = Box<dyn FnMut(&mut ArmCore, u32) -> bool>;
/// Undefined instruction hook.
pub type UndefinedFn = Box<dyn FnMut(&mut ArmCore) -> bool>;

#[derive(Default)]
struct ArmHooks {
    data_error: Option<DataErrorFn>,
    fetch_error: Option<FetchErrorFn>,
    breakpoint: Option<BreakpointFn>,
    watch_read: Option<WatchpointFn>,
    watch_write: Option<WatchpointFn>,
    alarm: Option<AlarmFn>,
    coproc_read: Option<CoprocReadFn>,
    coproc_write: Option<CoprocWriteFn>,
    swi: Option<SwiFn>,
    undefined: Option<UndefinedFn>,
}

/// ARM32/Thumb16 interpreter.
pub struct ArmInterpreter {
    /// Architectural core state.
    pub core: ArmCore,
    /// The core's MMU.
    pub mmu: ArmMmu,
    /// Breakpoints, watchpoints, alarm counter, fatal flag.
    pub debug: DebugState,
    physmem: Rc<RefCell<PhysicalMemory>>,
    swap: bool,
    hooks: ArmHooks,
    cp15_control: u32,
}

impl ArmInterpreter {
    /// Creates an interpreter over the shared physical address space.
    ///
    /// # Arguments
    ///
    /// * `physmem` - The shared dispatcher.
    /// * `big_endian` - Byte order the core runs in.
    pub fn new(physmem: Rc<RefCell<PhysicalMemory>>, big_endian: bool) -> Self {
        Self {
            core: ArmCore::new(),
            mmu: ArmMmu::new(big_endian),
            debug: DebugState::new(),
            physmem,
            swap: crate::common::endian::needs_swap(big_endian),
            hooks: ArmHooks::default(),
            cp15_control: 0,
        }
    }

    /// Installs the data-abort hook.
    pub fn set_data_error_handler(&mut self, hook: DataErrorFn) {
        self.hooks.data_error = Some(hook);
    }

    /// Installs the fetch-abort hook.
    pub fn set_fetch_error_handler(&mut self, hook: FetchErrorFn) {
        self.hooks.fetch_error = Some(hook);
    }

    /// Installs the breakpoint hook.
    pub fn set_breakpoint_handler(&mut self, hook: BreakpointFn) {
        self.hooks.breakpoint = Some(hook);
    }

    /// Installs a watchpoint hook for the given direction.
    pub fn set_watchpoint_handler(&mut self, write: bool, hook: WatchpointFn) {
        if write {
            self.hooks.watch_write = Some(hook);
        } else {
            self.hooks.watch_read = Some(hook);
        }
    }

    /// Arms the per-step alarm.
    pub fn set_alarm(&mut self, interval: u32, hook: AlarmFn) {
        self.debug.set_alarm(interval);
        self.hooks.alarm = Some(hook);
    }

    /// Installs the coprocessor read hook (non-MMU registers).
    pub fn set_coproc_read_handler(&mut self, hook: CoprocReadFn) {
        self.hooks.coproc_read = Some(hook);
    }

    /// Installs the coprocessor write hook (non-MMU registers).
    pub fn set_coproc_write_handler(&mut self, hook: CoprocWriteFn) {
        self.hooks.coproc_write = Some(hook);
    }

    /// Installs the software interrupt hook.
    pub fn set_swi_handler(&mut self, hook: SwiFn) {
        self.hooks.swi = Some(hook);
    }

    /// Installs the undefined instruction hook.
    pub fn set_undefined_handler(&mut self, hook: UndefinedFn) {
        self.hooks.undefined = Some(hook);
    }

    /// Reads a typed data value at a virtual address.
    ///
    /// Returns `None` when the instruction must be aborted; whether the fault
    /// was fatal is recorded on the debug state.
    pub fn read<T: Scalar>(&mut self, addr: u32) -> Option<T> {
        self.read_access(addr, false)
    }

    /// Reads a typed value as an instruction fetch.
    pub fn read_code<T: Scalar>(&mut self, addr: u32) -> Option<T> {
        self.read_access(addr, true)
    }

    fn read_access<T: Scalar>(&mut self, addr: u32, code: bool) -> Option<T> {
        #[cfg(feature = "debug-hooks")]
        if !code {
            self.debug.check_watchpoints(false, addr, T::SIZE as u32);
        }

        let ty = if code {
            AccessType::Instruction
        } else {
            AccessType::DataRead
        };

        let physmem = Rc::clone(&self.physmem);
        let mut physmem = physmem.borrow_mut();
        let Some(paddr) = self.mmu.translate(&mut physmem, addr, ty) else {
            drop(physmem);
            self.memory_error(addr, false, code);
            return None;
        };

        match physmem.read::<T>(paddr) {
            Ok(value) => Some(if self.swap { value.swap_bytes() } else { value }),
            Err(MemError::Fatal) => {
                self.debug.raise_fatal();
                None
            }
            Err(MemError::Bus) => {
                drop(physmem);
                self.memory_error(addr, false, code);
                None
            }
        }
    }

    /// Writes a typed data value at a virtual address.
    ///
    /// Returns `false` when the instruction must be aborted.
    pub fn write<T: Scalar>(&mut self, addr: u32, value: T) -> bool {
        #[cfg(feature = "debug-hooks")]
        self.debug.check_watchpoints(true, addr, T::SIZE as u32);

        let value = if self.swap { value.swap_bytes() } else { value };

        let physmem = Rc::clone(&self.physmem);
        let mut physmem = physmem.borrow_mut();
        let Some(paddr) = self
            .mmu
            .translate(&mut physmem, addr, AccessType::DataWrite)
        else {
            drop(physmem);
            self.memory_error(addr, true, false);
            return false;
        };

        match physmem.write::<T>(paddr, value) {
            Ok(()) => true,
            Err(MemError::Fatal) => {
                self.debug.raise_fatal();
                false
            }
            Err(MemError::Bus) => {
                drop(physmem);
                self.memory_error(addr, true, false);
                false
            }
        }
    }

    fn memory_error(&mut self, addr: u32, write: bool, code: bool) {
        let recovered = if code {
            match self.hooks.fetch_error.as_mut() {
                Some(hook) => hook(&mut self.core, addr),
                None => {
                    error!("no fetch error handler installed");
                    self.debug.raise_fatal();
                    return;
                }
            }
        } else {
            match self.hooks.data_error.as_mut() {
                Some(hook) => hook(&mut self.core, addr, write),
                None => {
                    error!("no data error handler installed");
                    self.debug.raise_fatal();
                    return;
                }
            }
        };
        if !recovered {
            self.debug.raise_fatal();
        }
    }

    /// Evaluates an ARM condition code against the CPSR flags.
    pub fn check_condition(&self, cond: u32) -> bool {
        let n = self.core.flag(ArmCore::N);
        let z = self.core.flag(ArmCore::Z);
        let c = self.core.flag(ArmCore::C);
        let v = self.core.flag(ArmCore::V);
        match cond {
            0 => z,            // EQ
            1 => !z,           // NE
            2 => c,            // CS
            3 => !c,           // CC
            4 => n,            // MI
            5 => !n,           // PL
            6 => v,            // VS
            7 => !v,           // VC
            8 => c && !z,      // HI
            9 => !c || z,      // LS
            10 => n == v,      // GE
            11 => n != v,      // LT
            12 => !z && n == v, // GT
            13 => z || n != v, // LE
            _ => true,         // AL, NV
        }
    }

    pub(crate) fn handle_coproc_read(&mut self, reg: CoprocReg) -> Option<u32> {
        if reg.coproc == 15 && reg.opc == 0 {
            // System control registers that feed the MMU are held locally.
            match reg.rn {
                1 => return Some(self.cp15_control),
                2 => return Some(self.mmu.ttbr()),
                _ => {}
            }
        }
        match self.hooks.coproc_read.as_mut() {
            Some(hook) => {
                let value = hook(&mut self.core, reg);
                if value.is_none() {
                    self.debug.raise_fatal();
                }
                value
            }
            None => {
                error!("no coprocessor read handler installed");
                self.debug.raise_fatal();
                None
            }
        }
    }

    pub(crate) fn handle_coproc_write(&mut self, reg: CoprocReg, value: u32) -> bool {
        if reg.coproc == 15 && reg.opc == 0 {
            match reg.rn {
                1 => {
                    self.cp15_control = value;
                    self.mmu.set_enabled(value & 1 != 0);
                    return true;
                }
                2 => {
                    self.mmu.set_ttbr(value);
                    return true;
                }
                // Instruction/data cache maintenance: nothing to maintain.
                7 => return true,
                8 => {
                    self.mmu.invalidate_cache();
                    return true;
                }
                _ => {}
            }
        }
        match self.hooks.coproc_write.as_mut() {
            Some(hook) => {
                let ok = hook(&mut self.core, reg, value);
                if !ok {
                    self.debug.raise_fatal();
                }
                ok
            }
            None => {
                error!("no coprocessor write handler installed");
                self.debug.raise_fatal();
                false
            }
        }
    }

    pub(crate) fn handle_swi(&mut self, imm: u32) -> bool {
        match self.hooks.swi.as_mut() {
            Some(hook) => {
                let ok = hook(&mut self.core, imm);
                if !ok {
                    self.debug.raise_fatal();
                }
                ok
            }
            None => {
                error!("no software interrupt handler installed");
                self.debug.raise_fatal();
                false
            }
        }
    }

    pub(crate) fn handle_undefined(&mut self) -> bool {
        match self.hooks.undefined.as_mut() {
            Some(hook) => {
                let ok = hook(&mut self.core);
                if !ok {
                    self.debug.raise_fatal();
                }
                ok
            }
            None => {
                error!("no undefined instruction handler installed");
                self.debug.raise_fatal();
                false
            }
        }
    }

    fn step_arm(&mut self) -> bool {
        let Some(word) = self.read_code::<u32>(self.core.regs[PC]) else {
            return false;
        };
        let instr = exec::ArmInstr(word);
        self.core.regs[PC] = self.core.regs[PC].wrapping_add(4);

        if !self.check_condition(instr.cond()) {
            return true;
        }
        exec::execute(self, instr)
    }

    fn step_thumb(&mut self) -> bool {
        let Some(half) = self.read_code::<u16>(self.core.regs[PC]) else {
            return false;
        };
        let instr = thumb::ThumbInstr(half);
        self.core.regs[PC] = self.core.regs[PC].wrapping_add(2);
        thumb::execute(self, instr)
    }
}

impl Processor for ArmInterpreter {
    fn step(&mut self) -> bool {
        if self.core.thumb {
            self.step_thumb()
        } else {
            self.step_arm()
        }
    }

    fn pc(&self) -> u32 {
        self.core.regs[PC]
    }

    fn debug_mut(&mut self) -> &mut DebugState {
        &mut self.debug
    }

    fn dispatch_alarm(&mut self) -> bool {
        match self.hooks.alarm.as_mut() {
            Some(hook) => hook(&mut self.core),
            None => true,
        }
    }

    fn dispatch_breakpoint(&mut self, pc: u32) -> bool {
        match self.hooks.breakpoint.as_mut() {
            Some(hook) => hook(&mut self.core, pc),
            None => {
                error!("no breakpoint handler installed");
                false
            }
        }
    }

    fn dispatch_watchpoint(&mut self, addr: u32, write: bool) -> bool {
        let hook = if write {
            self.hooks.watch_write.as_mut()
        } else {
            self.hooks.watch_read.as_mut()
        };
        match hook {
            Some(hook) => hook(&mut self.core, addr, write),
            None => {
                error!("no watchpoint handler installed");
                false
            }
        }
    }

    fn as_arm_mut(&mut self) -> Option<&mut ArmInterpreter> {
        Some(self)
    }
}
