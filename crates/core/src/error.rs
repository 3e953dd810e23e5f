//! Error taxonomy for internal CPU faults (§7).
//!
//! Every variant is caught at the CPU tick boundary, logged with context, and the
//! pipeline resets to `Fetch` for the next instruction. No error here is meant to
//! escape to the host process.

use crate::{Byte, Word};
use thiserror::Error;

/// A fault raised while decoding or executing an instruction.
///
/// Carries the program counter and opcode active when the fault was detected so the
/// host's diagnostic log line has enough context to reproduce it.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SimError {
    #[error("unknown opcode {opcode:#04x} at pc {pc:#06x}")]
    UnknownOpcode { pc: Word, opcode: Byte },

    #[error("memory address {address:#06x} out of range")]
    MemoryOutOfRange { address: u32 },

    #[error("invalid SYS sub-code {sub_code:#04x} in X at pc {pc:#06x}")]
    InvalidSyscall { pc: Word, sub_code: Byte },

    #[error("read MDR before the matching MMU read completed at pc {pc:#06x}")]
    LoadProtocolViolation { pc: Word },
}
