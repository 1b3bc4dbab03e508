//! Cross-core coordination: the lwarx/stwcx reservation and the
//! inter-processor mailboxes.

/// Inter-processor mailbox MMIO device.
pub mod mailbox;

pub use mailbox::Mailbox;

/// The shared load-reserve/store-conditional cell.
///
/// One reservation exists across all application cores: `lwarx` claims it
/// with the issuing core's id and the effective address, `stwcx` completes
/// only while the same core still holds the same address. A store from any
/// other core that touches the reserved word drops the reservation, so the
/// conditional store observes the intervening write and fails.
#[derive(Default)]
pub struct Reservation {
    owner: u32,
    address: u32,
    held: bool,
}

impl Reservation {
    /// Creates an empty reservation cell.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the reservation for `owner` at `address`.
    pub fn reserve(&mut self, owner: u32, address: u32) {
        self.owner = owner;
        self.address = address;
        self.held = true;
    }

    /// Returns whether `owner` still holds the reservation at `address`.
    pub fn is_reserved(&self, owner: u32, address: u32) -> bool {
        self.held && self.owner == owner && self.address == address
    }

    /// Drops the reservation.
    pub fn clear(&mut self) {
        self.held = false;
    }

    /// Observes a store of `len` bytes at `address` by core `writer`.
    ///
    /// Clears the reservation when another core's store overlaps the
    /// reserved word.
    pub fn snoop_store(&mut self, writer: u32, address: u32, len: u32) {
        if self.held
            && self.owner != writer
            && u64::from(address) < u64::from(self.address) + 4
            && u64::from(self.address) < u64::from(address) + u64::from(len)
        {
            self.held = false;
        }
    }
}
