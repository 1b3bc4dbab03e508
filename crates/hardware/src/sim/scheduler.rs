//! Cooperative round-robin scheduler.
//!
//! The scheduler owns the four interpreters and drives them in insertion
//! order, each for its configured quantum of instructions. Participants
//! start paused and are marked runnable with [`Scheduler::resume`]; this is
//! how boot order is expressed (the security processor releases the
//! application cores by poking a reset register, whose device model calls
//! `resume`). After every full sweep the scheduler's own alarms tick —
//! hardware models use these for periodic work that must not depend on any
//! single core being runnable.

use std::cell::Cell;
use std::rc::Rc;

use tracing::error;

use crate::core::interp::Processor;

/// Scheduler alarm callback; returning `false` stops [`Scheduler::run`].
pub type SchedulerAlarmFn = Box<dyn FnMut() -> bool>;

struct Entry {
    cpu: Box<dyn Processor>,
    steps: u32,
    running: bool,
}

struct Alarm {
    interval: u32,
    timer: u32,
    callback: SchedulerAlarmFn,
}

/// Round-robin driver for the machine's interpreters.
#[derive(Default)]
pub struct Scheduler {
    entries: Vec<Entry>,
    alarms: Vec<Alarm>,
    current: Rc<Cell<usize>>,
}

impl Scheduler {
    /// Creates an empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an interpreter with its quantum size; it starts paused.
    ///
    /// # Returns
    ///
    /// The participant's index, used with `resume` and `processor_mut`.
    pub fn add(&mut self, cpu: Box<dyn Processor>, steps: u32) -> usize {
        self.entries.push(Entry {
            cpu,
            steps,
            running: false,
        });
        self.entries.len() - 1
    }

    /// Marks a participant runnable.
    pub fn resume(&mut self, index: usize) -> bool {
        if let Some(entry) = self.entries.get_mut(index) {
            entry.running = true;
            return true;
        }
        error!(index, "scheduler index out of range");
        false
    }

    /// Marks a participant paused; it keeps its state and can be resumed.
    pub fn suspend(&mut self, index: usize) -> bool {
        if let Some(entry) = self.entries.get_mut(index) {
            entry.running = false;
            return true;
        }
        error!(index, "scheduler index out of range");
        false
    }

    /// Registers a periodic alarm measured in whole sweeps.
    pub fn add_alarm(&mut self, interval: u32, callback: SchedulerAlarmFn) {
        self.alarms.push(Alarm {
            interval,
            timer: interval,
            callback,
        });
    }

    /// Returns the index of the participant currently executing.
    pub fn current_index(&self) -> usize {
        self.current.get()
    }

    /// Returns a shared handle on the current index, for device models that
    /// need to attribute an access to the CPU that issued it.
    pub fn current_handle(&self) -> Rc<Cell<usize>> {
        Rc::clone(&self.current)
    }

    /// Returns a participant for direct manipulation (state setup, debug).
    pub fn processor_mut(&mut self, index: usize) -> Option<&mut (dyn Processor + '_)> {
        let entry = self.entries.get_mut(index)?;
        Some(&mut *entry.cpu)
    }

    /// Runs the machine until a participant fails without recovery
    /// (returns `false`) or an alarm requests a stop (returns `true`).
    pub fn run(&mut self) -> bool {
        loop {
            for index in 0..self.entries.len() {
                self.current.set(index);
                if self.entries[index].running {
                    let steps = self.entries[index].steps;
                    if !self.entries[index].cpu.run(steps) {
                        return false;
                    }
                }
            }
            self.current.set(0);

            let mut stop = false;
            for alarm in &mut self.alarms {
                alarm.timer -= 1;
                if alarm.timer == 0 {
                    alarm.timer = alarm.interval;
                    if !(alarm.callback)() {
                        stop = true;
                    }
                }
            }
            if stop {
                return true;
            }
        }
    }
}
