//! Inter-processor mailbox.
//!
//! Each application core owns one mailbox shared with the security
//! processor. The register file is four 32-bit words:
//!
//! * `0x0`: PPCMSG — message from the application core.
//! * `0x4`: PPCCTRL — application-core view of the handshake flags.
//! * `0x8`: ARMMSG — message from the security processor.
//! * `0xC`: ARMCTRL — security-processor view of the handshake flags.
//!
//! The handshake is four flags: X1/X2 are requests raised by the
//! application core and acknowledged by the security processor, Y1/Y2 the
//! reverse. Control writes set request bits with write-one-to-set and clear
//! the peer's bits with write-one-to-clear; each side additionally latches
//! its two interrupt-enable bits, readable back through its own control
//! register. The pending lines for an interrupt controller are exposed via
//! [`Mailbox::irq_pending`].

use tracing::warn;

use crate::mem::MmioDevice;

/// Offset of the application-core message register.
const PPCMSG: u32 = 0x0;
/// Offset of the application-core control register.
const PPCCTRL: u32 = 0x4;
/// Offset of the security-processor message register.
const ARMMSG: u32 = 0x8;
/// Offset of the security-processor control register.
const ARMCTRL: u32 = 0xC;

/// One inter-processor mailbox.
///
/// All accesses must be 32-bit; other widths are rejected. Bytes on the bus
/// are big-endian, the shared byte order of both processor families on this
/// platform.
pub struct Mailbox {
    name: String,
    base: u32,
    ppcmsg: u32,
    armmsg: u32,
    x1: bool,
    x2: bool,
    y1: bool,
    y2: bool,
    ix1: bool,
    ix2: bool,
    iy1: bool,
    iy2: bool,
}

impl Mailbox {
    /// Creates a mailbox mapped at `base`.
    ///
    /// # Arguments
    ///
    /// * `index` - Which application core this mailbox belongs to (names the
    ///   device in logs).
    /// * `base` - Physical base address of the four-register window.
    pub fn new(index: usize, base: u32) -> Self {
        Self {
            name: format!("IPC{index}"),
            base,
            ppcmsg: 0,
            armmsg: 0,
            x1: false,
            x2: false,
            y1: false,
            y2: false,
            ix1: false,
            ix2: false,
            iy1: false,
            iy2: false,
        }
    }

    /// Returns the pending interrupt lines `(to_arm, to_ppc)`.
    pub fn irq_pending(&self) -> (bool, bool) {
        let to_arm = (self.x1 && self.ix1) || (self.x2 && self.ix2);
        let to_ppc = (self.y1 && self.iy1) || (self.y2 && self.iy2);
        (to_arm, to_ppc)
    }

    fn read_reg(&mut self, offset: u32) -> u32 {
        match offset {
            PPCMSG => self.ppcmsg,
            PPCCTRL => {
                u32::from(self.x1)
                    | u32::from(self.y2) << 1
                    | u32::from(self.y1) << 2
                    | u32::from(self.x2) << 3
                    | u32::from(self.iy1) << 4
                    | u32::from(self.iy2) << 5
            }
            ARMMSG => self.armmsg,
            ARMCTRL => {
                u32::from(self.y1)
                    | u32::from(self.x2) << 1
                    | u32::from(self.x1) << 2
                    | u32::from(self.y2) << 3
                    | u32::from(self.ix1) << 4
                    | u32::from(self.ix2) << 5
            }
            _ => {
                warn!(device = %self.name, offset, "unknown mailbox read");
                0
            }
        }
    }

    fn write_reg(&mut self, offset: u32, value: u32) {
        match offset {
            PPCMSG => self.ppcmsg = value,
            PPCCTRL => {
                if value & 1 != 0 {
                    self.x1 = true;
                }
                if value & 2 != 0 {
                    self.y2 = false;
                }
                if value & 4 != 0 {
                    self.y1 = false;
                }
                if value & 8 != 0 {
                    self.x2 = true;
                }
                self.iy1 = value & 0x10 != 0;
                self.iy2 = value & 0x20 != 0;
            }
            ARMMSG => self.armmsg = value,
            ARMCTRL => {
                if value & 1 != 0 {
                    self.y1 = true;
                }
                if value & 2 != 0 {
                    self.x2 = false;
                }
                if value & 4 != 0 {
                    self.x1 = false;
                }
                if value & 8 != 0 {
                    self.y2 = true;
                }
                self.ix1 = value & 0x10 != 0;
                self.ix2 = value & 0x20 != 0;
            }
            _ => {
                warn!(
                    device = %self.name,
                    offset,
                    value = format_args!("{value:#010x}"),
                    "unknown mailbox write"
                );
            }
        }
    }
}

impl MmioDevice for Mailbox {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&mut self, addr: u32, buf: &mut [u8]) -> bool {
        if buf.len() != 4 {
            warn!(device = %self.name, len = buf.len(), "mailbox access width must be 32 bits");
            return false;
        }
        let value = self.read_reg(addr - self.base);
        buf.copy_from_slice(&value.to_be_bytes());
        true
    }

    fn write(&mut self, addr: u32, buf: &[u8]) -> bool {
        if buf.len() != 4 {
            warn!(device = %self.name, len = buf.len(), "mailbox access width must be 32 bits");
            return false;
        }
        let mut raw = [0u8; 4];
        raw.copy_from_slice(buf);
        self.write_reg(addr - self.base, u32::from_be_bytes(raw));
        true
    }
}
