//! Whole-machine construction and wiring.
//!
//! A [`Machine`] is the ownership root: physical memory with the
//! configured RAM windows and the three inter-processor mailboxes, one ARM
//! interpreter, three PowerPC interpreters sharing a reservation cell, and
//! the scheduler that drives them in fixed order (ARM first, then the
//! application cores). Default fault routing is installed so translation
//! and bus failures become the architectural exceptions:
//!
//! * ARM data or fetch fault → data abort at the high vector.
//! * PPC data fault → DAR/DSISR update, then DSI.
//! * PPC fetch fault → ISI.
//!
//! Peripheral models are registered by the embedder on the shared
//! dispatcher; the interpreters' coprocessor/SPR/SWI hooks stay external.

use std::cell::RefCell;
use std::rc::Rc;

use crate::common::{LoadError, MemoryError};
use crate::config::Config;
use crate::core::arm::{ArmException, ArmInterpreter};
use crate::core::ppc::{PpcException, PpcInterpreter};
use crate::ipc::{Mailbox, Reservation};
use crate::mem::PhysicalMemory;
use crate::sim::loader;
use crate::sim::scheduler::Scheduler;

/// Scheduler index of the security/IO processor.
pub const ARM_CPU: usize = 0;
/// Scheduler index of the first application processor.
pub const PPC_CPU0: usize = 1;
/// Number of application processors.
pub const PPC_COUNT: usize = 3;

/// The assembled machine.
pub struct Machine {
    physmem: Rc<RefCell<PhysicalMemory>>,
    /// The scheduler owning the four interpreters.
    pub scheduler: Scheduler,
}

impl Machine {
    /// Builds a machine from the configuration.
    ///
    /// # Errors
    ///
    /// Fails when the configured RAM windows or mailbox windows overlap.
    pub fn new(config: &Config) -> Result<Self, MemoryError> {
        let mut physmem = PhysicalMemory::new();
        for window in &config.system.ram {
            physmem.add_ram(window.start, window.length)?;
        }
        for i in 0..PPC_COUNT {
            let base = config.system.mailbox_base + (i as u32) * 0x10;
            physmem.add_device(base, 0x10, Box::new(Mailbox::new(i, base)))?;
        }

        let physmem = Rc::new(RefCell::new(physmem));
        let reservation = Rc::new(RefCell::new(Reservation::new()));
        let mut scheduler = Scheduler::new();

        let mut arm = ArmInterpreter::new(Rc::clone(&physmem), config.arm.big_endian);
        arm.set_data_error_handler(Box::new(|core, _addr, _write| {
            core.trigger_exception(ArmException::DataAbort);
            true
        }));
        arm.set_fetch_error_handler(Box::new(|core, _addr| {
            core.trigger_exception(ArmException::DataAbort);
            true
        }));
        let _ = scheduler.add(Box::new(arm), config.arm.quantum);

        for i in 0..PPC_COUNT {
            let mut ppc = PpcInterpreter::new(Rc::clone(&physmem), Rc::clone(&reservation));
            ppc.core.upir = i as u32;

            ppc.set_data_error_handler(Box::new(|core, addr, write| {
                core.dar = addr;
                core.dsisr = if write { 0x42000000 } else { 0x40000000 };
                core.trigger_exception(PpcException::Dsi)
            }));
            ppc.set_fetch_error_handler(Box::new(|core, _addr| {
                core.trigger_exception(PpcException::Isi)
            }));

            let tick = config.ppc.timebase_interval;
            ppc.set_alarm(
                tick,
                Box::new(move |core| {
                    core.tb = core.tb.wrapping_add(u64::from(tick));
                    true
                }),
            );

            let _ = scheduler.add(Box::new(ppc), config.ppc.quantum);
        }

        Ok(Self { physmem, scheduler })
    }

    /// Returns a handle on the shared physical address space.
    pub fn physmem(&self) -> Rc<RefCell<PhysicalMemory>> {
        Rc::clone(&self.physmem)
    }

    /// Returns the security/IO processor.
    pub fn arm_mut(&mut self) -> Option<&mut ArmInterpreter> {
        self.scheduler
            .processor_mut(ARM_CPU)
            .and_then(|cpu| cpu.as_arm_mut())
    }

    /// Returns an application processor by index (0..3).
    pub fn ppc_mut(&mut self, index: usize) -> Option<&mut PpcInterpreter> {
        if index >= PPC_COUNT {
            return None;
        }
        self.scheduler
            .processor_mut(PPC_CPU0 + index)
            .and_then(|cpu| cpu.as_ppc_mut())
    }

    /// Loads an ELF boot image into physical memory.
    ///
    /// # Returns
    ///
    /// The image's entry point; place it into a core's PC and `resume` the
    /// core to boot it.
    ///
    /// # Errors
    ///
    /// See [`loader::load_elf`].
    pub fn load_elf(&mut self, image: &[u8]) -> Result<u32, LoadError> {
        loader::load_elf(&mut self.physmem.borrow_mut(), image)
    }

    /// Marks a core runnable by scheduler index.
    pub fn resume(&mut self, index: usize) -> bool {
        self.scheduler.resume(index)
    }

    /// Runs the machine; see [`Scheduler::run`].
    pub fn run(&mut self) -> bool {
        self.scheduler.run()
    }
}
