//! Heterogeneous multi-core console emulator library.
//!
//! This crate implements the execution and memory subsystem of a game
//! console built around one 32-bit ARM security/IO processor and three
//! 32-bit PowerPC application processors, all sharing a single physical
//! address space:
//! 1. **Memory:** RAM ranges with owned buffers plus MMIO special ranges
//!    behind device callbacks, dispatched by full containment.
//! 2. **MMUs:** ARM two-level page tables and PowerPC BAT + hashed page
//!    table, each with a small per-access-type translation cache.
//! 3. **Cores:** ARM banked-mode register file and PowerPC SPR bank, with
//!    their exception models.
//! 4. **Interpreters:** ARM32/Thumb16 and PowerPC decode+execute, sharing
//!    one typed-access and run-loop contract.
//! 5. **Simulation:** Cooperative round-robin scheduler, ELF loading, and
//!    the `Machine` builder that wires a whole console.

/// Common types (endianness, typed access, errors).
pub mod common;
/// Machine configuration (defaults, JSON deserialization).
pub mod config;
/// CPU cores: interpreters, register files, MMUs.
pub mod core;
/// Cross-core coordination: reservation cell and mailboxes.
pub mod ipc;
/// Physical memory: RAM backing and the access dispatcher.
pub mod mem;
/// Simulation: scheduler, loader, machine builder.
pub mod sim;

/// Root configuration type; use `Config::default()` or deserialize JSON.
pub use crate::config::Config;
/// The shared physical address space.
pub use crate::mem::PhysicalMemory;
/// Top-level machine; owns the cores, memory, and scheduler.
pub use crate::sim::Machine;
/// Cooperative round-robin scheduler.
pub use crate::sim::Scheduler;
