//! Machine configuration.
//!
//! This module defines the configuration structures used to parameterize the
//! emulated machine. It provides:
//! 1. **Defaults:** The baseline physical map and scheduling constants.
//! 2. **Structures:** RAM windows, mailbox placement, per-core quanta.
//!
//! Configuration is supplied as JSON (see [`Config::from_json`]) or built
//! with `Config::default()`.

use serde::Deserialize;

use crate::common::ConfigError;

/// Default configuration constants for the emulated machine.
mod defaults {
    use super::RamWindow;

    /// The small low memory range the boot ROM and early firmware live in
    /// (32 MiB at the bottom of the address space).
    pub const MEM1: RamWindow = RamWindow {
        start: 0x00000000,
        length: 0x02000000,
    };

    /// On-chip SRAM used by the security processor (2.875 MiB).
    pub const MEM0: RamWindow = RamWindow {
        start: 0x08000000,
        length: 0x002E0000,
    };

    /// Main memory (1 GiB). Backed by a lazily allocated buffer, so the
    /// untouched majority costs nothing on the host.
    pub const MEM2: RamWindow = RamWindow {
        start: 0x10000000,
        length: 0x40000000,
    };

    /// Base address of the three inter-processor mailbox windows.
    pub const MAILBOX_BASE: u32 = 0x0D000400;

    /// Instructions one core executes before the scheduler moves on.
    pub const QUANTUM: u32 = 500;

    /// Instructions between time-base bumps on each application core.
    pub const TIMEBASE_INTERVAL: u32 = 256;
}

/// One `(start, length)` RAM window of the physical map.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct RamWindow {
    /// Physical start address.
    pub start: u32,
    /// Length in bytes.
    pub length: u32,
}

/// Physical map configuration.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// RAM windows registered at boot.
    pub ram: Vec<RamWindow>,
    /// Base address of the mailbox register windows (0x10 bytes per core).
    pub mailbox_base: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            ram: vec![defaults::MEM1, defaults::MEM0, defaults::MEM2],
            mailbox_base: defaults::MAILBOX_BASE,
        }
    }
}

/// Security/IO processor configuration.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct ArmConfig {
    /// Scheduler quantum in instructions.
    pub quantum: u32,
    /// Byte order of the core. The platform runs its ARM big-endian.
    pub big_endian: bool,
}

impl Default for ArmConfig {
    fn default() -> Self {
        Self {
            quantum: defaults::QUANTUM,
            big_endian: true,
        }
    }
}

/// Application processor configuration (shared by all three cores).
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct PpcConfig {
    /// Scheduler quantum in instructions.
    pub quantum: u32,
    /// Instructions between time-base bumps.
    pub timebase_interval: u32,
}

impl Default for PpcConfig {
    fn default() -> Self {
        Self {
            quantum: defaults::QUANTUM,
            timebase_interval: defaults::TIMEBASE_INTERVAL,
        }
    }
}

/// Root machine configuration.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Physical map.
    pub system: SystemConfig,
    /// Security/IO processor.
    pub arm: ArmConfig,
    /// Application processors.
    pub ppc: PpcConfig,
}

impl Config {
    /// Parses a configuration from JSON.
    ///
    /// Missing fields take their defaults, so `{}` is a valid configuration.
    ///
    /// # Errors
    ///
    /// Fails when the text is not valid JSON or a field has the wrong shape.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }
}
