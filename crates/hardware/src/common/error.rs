//! Access outcomes and setup-time errors.
//!
//! Two different failure worlds live here:
//! 1. **Runtime access outcomes** (`MemError`): the dispatcher's tri-state
//!    protocol. A `Bus` error feeds the CPU's data/fetch-abort path and may be
//!    recovered by an exception handler; a `Fatal` error stops the machine.
//! 2. **Setup-time errors** (`MemoryError`, `LoadError`, `ConfigError`):
//!    construction failures that propagate upward with `?` and prevent the
//!    machine from being built at all.

use thiserror::Error;

/// Outcome of a physical memory access that did not complete.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemError {
    /// A device callback failed or a required handler was missing.
    /// Execution halts; nothing recovers from this.
    Fatal,
    /// No registered range claims the address. Routed to the CPU's
    /// data/fetch-abort exception path.
    Bus,
}

/// Errors raised while building the physical address map.
#[derive(Debug, Error)]
pub enum MemoryError {
    /// A new RAM or MMIO range collides with an already registered one.
    #[error(
        "memory range ({start:#010x}, {length:#x}) overlaps existing range \
         ({other_start:#010x}, {other_length:#x})"
    )]
    Overlap {
        /// Start of the rejected range.
        start: u32,
        /// Length of the rejected range.
        length: u32,
        /// Start of the range already present.
        other_start: u32,
        /// Length of the range already present.
        other_length: u32,
    },

    /// A range was given a zero length or wraps past the 32-bit address space.
    #[error("memory range ({start:#010x}, {length:#x}) is empty or wraps the address space")]
    Bounds {
        /// Start of the rejected range.
        start: u32,
        /// Length of the rejected range.
        length: u32,
    },
}

/// Errors raised while loading a boot image.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The image is not a valid 32-bit ELF file.
    #[error("invalid ELF image: {0}")]
    Parse(#[from] object::read::Error),

    /// A loadable segment points outside every registered memory range.
    #[error("segment ({addr:#010x}, {length:#x}) does not fit a registered memory range")]
    Placement {
        /// Physical address of the rejected segment.
        addr: u32,
        /// Length of the rejected segment.
        length: u32,
    },

    /// The image could not be read from disk.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors raised while parsing a machine configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file is not valid JSON or is missing fields.
    #[error("invalid machine configuration: {0}")]
    Parse(#[from] serde_json::Error),
}
