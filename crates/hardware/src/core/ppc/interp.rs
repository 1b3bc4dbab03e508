//! PowerPC interpreter: fetch loop, typed access, and MMU-backing SPRs.
//!
//! One step fetches the 4-byte big-endian word at the PC, advances the PC,
//! and dispatches through [`super::exec`]. Typed accesses compose the
//! watchpoint scan, MMU translation (with the live MSR), physical dispatch,
//! and byte swap. Data stores additionally snoop the shared lwarx/stwcx
//! reservation so a conditional store observes intervening writes from the
//! other cores.
//!
//! `mtspr`/`mfspr` traffic for SDR1 and the BAT banks, and `mtsr`/`mfsr`,
//! are applied directly to the owned MMU (invalidating its translation
//! cache); everything else falls through to the core's SPR hooks.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::error;

use crate::common::{AccessType, MemError, Scalar};
use crate::core::interp::{DebugState, Processor};
use crate::core::ppc::mmu::PpcMmu;
use crate::core::ppc::{PpcCore, exec, spr};
use crate::ipc::Reservation;
use crate::mem::PhysicalMemory;

/// Data-fault hook: `(core, address, is_write) -> recovered`.
pub type DataErrorFn = Box<dyn FnMut(&mut PpcCore, u32, bool) -> bool>;
/// Fetch-fault hook: `(core, address) -> recovered`.
pub type FetchErrorFn = Box<dyn FnMut(&mut PpcCore, u32) -> bool>;
/// Breakpoint hook: `(core, pc) -> continue`.
pub type BreakpointFn = Box<dyn FnMut(&mut PpcCore, u32) -> bool>;
/// Watchpoint hook: `(core, address, is_write) -> continue`.
pub type WatchpointFn = Box<dyn FnMut(&mut PpcCore, u32, bool) -> bool>;
/// Alarm hook: `(core) -> continue`.
pub type AlarmFn = Box<dyn FnMut(&mut PpcCore) -> bool>;

#[derive(Default)]
struct PpcHooks {
    data_error: Option<DataErrorFn>,
    fetch_error: Option<FetchErrorFn>,
    breakpoint: Option<BreakpointFn>,
    watch_read: Option<WatchpointFn>,
    watch_write: Option<WatchpointFn>,
    alarm: Option<AlarmFn>,
}

/// PowerPC interpreter.
pub struct PpcInterpreter {
    /// Architectural core state.
    pub core: PpcCore,
    /// The core's MMU.
    pub mmu: PpcMmu,
    /// Breakpoints, watchpoints, alarm counter, fatal flag.
    pub debug: DebugState,
    physmem: Rc<RefCell<PhysicalMemory>>,
    reservation: Rc<RefCell<Reservation>>,
    swap: bool,
    hooks: PpcHooks,
}

impl PpcInterpreter {
    /// Creates an interpreter over the shared physical address space and
    /// reservation cell.
    pub fn new(
        physmem: Rc<RefCell<PhysicalMemory>>,
        reservation: Rc<RefCell<Reservation>>,
    ) -> Self {
        Self {
            core: PpcCore::new(),
            mmu: PpcMmu::new(),
            debug: DebugState::new(),
            physmem,
            reservation,
            swap: crate::common::endian::needs_swap(true),
            hooks: PpcHooks::default(),
        }
    }

    /// Installs the data-fault hook.
    pub fn set_data_error_handler(&mut self, hook: DataErrorFn) {
        self.hooks.data_error = Some(hook);
    }

    /// Installs the fetch-fault hook.
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

    /// Reads a typed data value at an effective address.
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
        let Some(paddr) = self.mmu.translate(&mut physmem, addr, ty, self.core.msr) else {
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

    /// Writes a typed data value at an effective address.
    pub fn write<T: Scalar>(&mut self, addr: u32, value: T) -> bool {
        #[cfg(feature = "debug-hooks")]
        self.debug.check_watchpoints(true, addr, T::SIZE as u32);

        self.reservation
            .borrow_mut()
            .snoop_store(self.core.upir, addr, T::SIZE as u32);

        let value = if self.swap { value.swap_bytes() } else { value };

        let physmem = Rc::clone(&self.physmem);
        let mut physmem = physmem.borrow_mut();
        let Some(paddr) =
            self.mmu
                .translate(&mut physmem, addr, AccessType::DataWrite, self.core.msr)
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

    /// Claims the shared reservation for this core at `addr`.
    pub(crate) fn reserve(&mut self, addr: u32) {
        self.reservation.borrow_mut().reserve(self.core.upir, addr);
    }

    /// Returns whether this core still holds the reservation at `addr`.
    pub(crate) fn check_reservation(&self, addr: u32) -> bool {
        self.reservation.borrow().is_reserved(self.core.upir, addr)
    }

    /// Drops the shared reservation.
    pub(crate) fn clear_reservation(&mut self) {
        self.reservation.borrow_mut().clear();
    }

    /// Reads an SPR, intercepting the MMU-backing registers.
    pub(crate) fn spr_read(&mut self, num: u32) -> Option<u32> {
        match num {
            spr::SDR1 => Some(self.mmu.sdr1()),
            spr::IBAT0U..=spr::IBAT3L => {
                let off = num - spr::IBAT0U;
                Some(self.mmu.ibat((off / 2) as usize, off % 2 == 0))
            }
            spr::DBAT0U..=spr::DBAT3L => {
                let off = num - spr::DBAT0U;
                Some(self.mmu.dbat((off / 2) as usize, off % 2 == 0))
            }
            spr::IBAT4U..=spr::IBAT7L => {
                let off = num - spr::IBAT4U;
                Some(self.mmu.ibat(4 + (off / 2) as usize, off % 2 == 0))
            }
            spr::DBAT4U..=spr::DBAT7L => {
                let off = num - spr::DBAT4U;
                Some(self.mmu.dbat(4 + (off / 2) as usize, off % 2 == 0))
            }
            _ => {
                let value = self.core.get_spr(num);
                if value.is_none() {
                    self.debug.raise_fatal();
                }
                value
            }
        }
    }

    /// Writes an SPR, intercepting the MMU-backing registers.
    pub(crate) fn spr_write(&mut self, num: u32, value: u32) -> bool {
        match num {
            spr::SDR1 => self.mmu.set_sdr1(value),
            spr::IBAT0U..=spr::IBAT3L => {
                let off = num - spr::IBAT0U;
                self.mmu.set_ibat((off / 2) as usize, off % 2 == 0, value);
            }
            spr::DBAT0U..=spr::DBAT3L => {
                let off = num - spr::DBAT0U;
                self.mmu.set_dbat((off / 2) as usize, off % 2 == 0, value);
            }
            spr::IBAT4U..=spr::IBAT7L => {
                let off = num - spr::IBAT4U;
                self.mmu.set_ibat(4 + (off / 2) as usize, off % 2 == 0, value);
            }
            spr::DBAT4U..=spr::DBAT7L => {
                let off = num - spr::DBAT4U;
                self.mmu.set_dbat(4 + (off / 2) as usize, off % 2 == 0, value);
            }
            _ => {
                if !self.core.set_spr(num, value) {
                    self.debug.raise_fatal();
                    return false;
                }
            }
        }
        true
    }
}

impl Processor for PpcInterpreter {
    fn step(&mut self) -> bool {
        let Some(word) = self.read_code::<u32>(self.core.pc) else {
            return false;
        };
        self.core.pc = self.core.pc.wrapping_add(4);
        exec::execute(self, exec::PpcInstr(word))
    }

    fn pc(&self) -> u32 {
        self.core.pc
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

    fn as_ppc_mut(&mut self) -> Option<&mut PpcInterpreter> {
        Some(self)
    }
}
