//! Host and guest endianness.
//!
//! Two independent facts are modeled: the host's byte order (a compile-time
//! constant) and each CPU's byte order (a per-interpreter configuration).
//! Their disagreement collapses into a single `swap` flag applied at the
//! typed-access boundary only; raw byte transfers never swap.

/// Byte order of a CPU or of the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endianness {
    /// Least significant byte first.
    Little,
    /// Most significant byte first.
    Big,
}

/// Returns the byte order of the host this emulator is running on.
#[inline]
pub fn host() -> Endianness {
    if cfg!(target_endian = "big") {
        Endianness::Big
    } else {
        Endianness::Little
    }
}

/// Returns whether typed accesses for a guest CPU need a byte swap.
///
/// # Arguments
///
/// * `guest_big` - `true` if the guest CPU is big-endian.
#[inline]
pub fn needs_swap(guest_big: bool) -> bool {
    guest_big != (host() == Endianness::Big)
}
