//! CPU cores: interpreters, register files, and address translation.
//!
//! This module holds everything that executes guest instructions:
//! 1. **Interpreter base:** The [`Processor`] trait with the shared
//!    run-N-steps loop, plus the per-core debug state (breakpoints,
//!    watchpoints, alarm, fatal flag).
//! 2. **Translation cache:** The small per-MMU software TLB.
//! 3. **ARM:** Core state, two-level page-table MMU, ARM32/Thumb interpreters.
//! 4. **PowerPC:** Core state, BAT + hashed-page-table MMU, interpreter.

/// ARM core state, MMU, and interpreters.
pub mod arm;
/// Per-access-type translation cache.
pub mod cache;
/// Interpreter base: `Processor` trait and debug state.
pub mod interp;
/// PowerPC core state, MMU, and interpreter.
pub mod ppc;

pub use cache::TranslationCache;
pub use interp::{DebugState, Processor};
