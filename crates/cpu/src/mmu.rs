//! Stateless façade over [`Memory`] plus the program-load queue (§4.2).

use crate::memory::Memory;
use sim_core::{Byte, SimError, Word};
use std::collections::VecDeque;

/// Presents the two-phase (address-then-data) transaction protocol to the CPU and
/// drains a queued program into memory one byte per tick.
#[derive(Debug, Default)]
pub struct Mmu {
    program_queue: VecDeque<Byte>,
    load_address: Word,
    is_loading: bool,
}

impl Mmu {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Latch `addr` into the MAR and queue a read. The result is available from
    /// [`get_mdr`](Self::get_mdr) no earlier than the following tick.
    pub fn trigger_read(&self, memory: &mut Memory, addr: Word) {
        memory.set_mar(addr);
        memory.queue_read();
    }

    /// Latch `value` into the MDR and queue a write at whatever address is already
    /// in the MAR (set by a prior [`trigger_read`](Self::trigger_read) or
    /// [`write_immediate`](Self::write_immediate)).
    pub fn trigger_write(&self, memory: &mut Memory, value: Byte) {
        memory.set_mdr(value);
        memory.queue_write();
    }

    /// Latch both MAR and MDR and queue a write in one call.
    pub fn write_immediate(&self, memory: &mut Memory, addr: Word, value: Byte) {
        memory.set_mar(addr);
        memory.set_mdr(value);
        memory.queue_write();
    }

    /// Read the most recently latched MDR.
    ///
    /// Returns [`SimError::LoadProtocolViolation`] if a read was triggered but
    /// [`Memory::tick`] has not yet committed it — reading across that boundary
    /// early is a caller bug, not a hardware condition. `pc` is only used to give
    /// the error context for logging.
    pub fn get_mdr(&self, memory: &Memory, pc: Word) -> Result<Byte, SimError> {
        if memory.read_pending() {
            return Err(SimError::LoadProtocolViolation { pc });
        }
        Ok(memory.mdr())
    }

    /// Reset state, queue `bytes` for sequential load starting at 0x0000, and prime
    /// the first write so the first byte lands on the next `Memory::tick`.
    pub fn set_program(&mut self, memory: &mut Memory, bytes: &[u8]) {
        self.program_queue.clear();
        self.program_queue.extend(bytes.iter().copied().map(Byte));
        self.load_address = Word::ZERO;
        self.is_loading = !self.program_queue.is_empty();
        if self.is_loading {
            self.advance_load(memory);
        }
    }

    /// Pop the next queued byte and write it at `load_address`, advancing the
    /// address. Clears [`is_program_loading`](Self::is_program_loading) once the
    /// queue drains. Called by [`Memory::tick`]'s caller whenever a write commits
    /// while loading is in progress (§4.1).
    pub fn advance_load(&mut self, memory: &mut Memory) {
        match self.program_queue.pop_front() {
            Some(byte) => {
                self.write_immediate(memory, self.load_address, byte);
                self.load_address += 1;
            }
            None => self.is_loading = false,
        }
    }

    #[must_use]
    pub fn is_program_loading(&self) -> bool {
        self.is_loading
    }

    pub fn reset(&mut self, memory: &mut Memory) {
        self.program_queue.clear();
        self.load_address = Word::ZERO;
        self.is_loading = false;
        memory.reset();
    }
}
