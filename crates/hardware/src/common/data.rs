//! Memory access classification and typed bus values.
//!
//! These types are used for the following:
//! 1. **Translation:** The MMUs key their caches and protection checks on the
//!    access type.
//! 2. **Typed access:** The `Scalar` trait lets the dispatcher and the
//!    interpreters move 1/2/4/8-byte values as raw bytes, with the byte swap
//!    applied exactly once at the interpreter boundary.

/// Type of memory access operation.
///
/// Used to distinguish instruction fetches from data loads and stores for
/// translation-cache keying and protection enforcement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessType {
    /// Instruction fetch.
    Instruction,
    /// Data load.
    DataRead,
    /// Data store.
    DataWrite,
}

impl AccessType {
    /// Returns a dense index for per-type translation-cache slots.
    #[inline]
    pub(crate) fn index(self) -> usize {
        match self {
            Self::Instruction => 0,
            Self::DataRead => 1,
            Self::DataWrite => 2,
        }
    }
}

/// A fixed-width unsigned value that can cross the bus.
///
/// The dispatcher deals exclusively in native-order bytes; `swap_bytes` is
/// applied by the caller when guest and host byte order disagree.
pub trait Scalar: Copy {
    /// Width of the value in bytes.
    const SIZE: usize;

    /// Reconstructs a value from native-order bytes.
    fn from_ne_bytes(bytes: &[u8]) -> Self;
    /// Writes the value as native-order bytes into `out`.
    fn to_ne_bytes(self, out: &mut [u8]);
    /// Reverses the byte order of the value.
    fn swap_bytes(self) -> Self;
}

macro_rules! impl_scalar {
    ($($ty:ty),*) => {$(
        impl Scalar for $ty {
            const SIZE: usize = size_of::<$ty>();

            #[inline]
            fn from_ne_bytes(bytes: &[u8]) -> Self {
                let mut raw = [0u8; size_of::<$ty>()];
                raw.copy_from_slice(bytes);
                <$ty>::from_ne_bytes(raw)
            }

            #[inline]
            fn to_ne_bytes(self, out: &mut [u8]) {
                out.copy_from_slice(&<$ty>::to_ne_bytes(self));
            }

            #[inline]
            fn swap_bytes(self) -> Self {
                <$ty>::swap_bytes(self)
            }
        }
    )*};
}

impl_scalar!(u8, u16, u32, u64);
