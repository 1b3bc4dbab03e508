//! Common types shared by the memory system and the interpreters.
//!
//! This module collects the small building blocks everything else is written
//! in terms of:
//! 1. **Endianness:** Host/guest byte-order facts and the swap decision.
//! 2. **Typed access:** The `Scalar` trait for 1/2/4/8-byte bus values.
//! 3. **Errors:** Runtime access outcomes and setup-time error enums.

/// Access classification and the `Scalar` typed-access trait.
pub mod data;
/// Host and guest endianness.
pub mod endian;
/// Access outcomes and setup-time errors.
pub mod error;

pub use data::{AccessType, Scalar};
pub use endian::Endianness;
pub use error::{ConfigError, LoadError, MemError, MemoryError};
