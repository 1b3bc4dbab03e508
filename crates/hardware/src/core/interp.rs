//! Interpreter base: the `Processor` trait and per-core debug state.
//!
//! Both interpreters share the same outer loop contract:
//! 1. `step()` executes one instruction and returns `false` when the
//!    instruction was aborted (memory fault, unimplemented opcode).
//! 2. An aborted step only stops `run()` if the fault went unrecovered —
//!    a data/fetch-abort handler that redirected the core to its exception
//!    vector clears the way for execution to continue transparently.
//! 3. After every step the alarm counter ticks, and (when compiled in)
//!    pending watchpoint hits and breakpoints are delivered.

/// Per-core debug and loop state shared by both interpreter families.
///
/// Breakpoint and watchpoint lists are plain sorted-or-not vectors; they are
/// small and only scanned when the `debug-hooks` feature is compiled in.
#[derive(Default)]
pub struct DebugState {
    /// Program-counter breakpoints checked at each step boundary.
    pub breakpoints: Vec<u32>,
    /// Data-read watchpoint addresses.
    pub watch_read: Vec<u32>,
    /// Data-write watchpoint addresses.
    pub watch_write: Vec<u32>,
    watch_hit: Option<(u32, bool)>,
    alarm_interval: u32,
    alarm_timer: u32,
    fatal: bool,
}

impl DebugState {
    /// Creates an empty debug state with no alarm.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms the per-step alarm with the given interval (0 disarms it).
    pub fn set_alarm(&mut self, interval: u32) {
        self.alarm_interval = interval;
        self.alarm_timer = interval;
    }

    /// Returns whether an unrecovered error has been raised.
    pub fn fatal(&self) -> bool {
        self.fatal
    }

    /// Marks the current fault as unrecoverable; `run()` will stop.
    pub fn raise_fatal(&mut self) {
        self.fatal = true;
    }

    /// Records a watchpoint hit covering `[addr, addr + len)`.
    ///
    /// The hit is delivered at the next step boundary, not mid-instruction.
    #[cfg(feature = "debug-hooks")]
    pub(crate) fn check_watchpoints(&mut self, write: bool, addr: u32, len: u32) {
        let list = if write {
            &self.watch_write
        } else {
            &self.watch_read
        };
        for &wp in list {
            if addr <= wp && wp < addr.wrapping_add(len) {
                self.watch_hit = Some((wp, write));
            }
        }
    }

    /// Ticks the alarm; returns `true` when it fires (and reloads it).
    fn tick_alarm(&mut self) -> bool {
        if self.alarm_interval == 0 {
            return false;
        }
        self.alarm_timer -= 1;
        if self.alarm_timer == 0 {
            self.alarm_timer = self.alarm_interval;
            return true;
        }
        false
    }

    #[cfg(feature = "debug-hooks")]
    fn take_watch_hit(&mut self) -> Option<(u32, bool)> {
        self.watch_hit.take()
    }
}

/// An instruction interpreter the scheduler can drive.
///
/// `run` is provided; implementors supply single-stepping, the PC, and the
/// hook dispatchers for alarms, breakpoints, and watchpoints.
pub trait Processor {
    /// Executes one instruction. Returns `false` if the step was aborted.
    fn step(&mut self) -> bool;

    /// Returns the current program counter.
    fn pc(&self) -> u32;

    /// Returns the shared debug/loop state.
    fn debug_mut(&mut self) -> &mut DebugState;

    /// Invoked when the per-step alarm fires. Returns `false` to stop.
    fn dispatch_alarm(&mut self) -> bool;

    /// Invoked when the PC matches a breakpoint. Returns `false` to stop.
    fn dispatch_breakpoint(&mut self, pc: u32) -> bool;

    /// Invoked when a deferred watchpoint hit is delivered.
    fn dispatch_watchpoint(&mut self, addr: u32, write: bool) -> bool;

    /// Downcast to the ARM interpreter, if that is what this is.
    fn as_arm_mut(&mut self) -> Option<&mut crate::core::arm::ArmInterpreter> {
        None
    }

    /// Downcast to a PowerPC interpreter, if that is what this is.
    fn as_ppc_mut(&mut self) -> Option<&mut crate::core::ppc::PpcInterpreter> {
        None
    }

    /// Executes `steps` instructions (0 means unbounded).
    ///
    /// Returns `false` when execution failed without recovery; the outer
    /// scheduler stops the whole system in that case.
    fn run(&mut self, steps: u32) -> bool {
        let mut remaining = steps;
        loop {
            if !self.step() {
                // A failed step whose exception callback recovered it leaves
                // the core at its exception vector; keep going.
                if self.debug_mut().fatal() {
                    return false;
                }
            }

            if self.debug_mut().tick_alarm() && !self.dispatch_alarm() {
                return false;
            }

            if steps != 0 {
                remaining -= 1;
                if remaining == 0 {
                    return true;
                }
            }

            #[cfg(feature = "debug-hooks")]
            {
                if let Some((addr, write)) = self.debug_mut().take_watch_hit() {
                    if !self.dispatch_watchpoint(addr, write) {
                        return false;
                    }
                }

                let pc = self.pc();
                if self.debug_mut().breakpoints.contains(&pc)
                    && !self.dispatch_breakpoint(pc)
                {
                    return false;
                }
            }
        }
    }
}
