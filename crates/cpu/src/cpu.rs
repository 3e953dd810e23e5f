//! The five-stage pipeline: Fetch, Decode, Execute, Writeback, InterruptCheck (§4.5).

use crate::flags::Flags;
use crate::instruction::{DecodeEntry, DecodeTable, InstructionSet};
use crate::interrupt::Interrupt;
use crate::memory::Memory;
use crate::mmu::Mmu;
use log::{debug, warn};
use sim_core::{Byte, SimError, Word};

/// Which stage the pipeline is currently in. Every tick advances exactly one
/// stage's worth of work; some stages take more than one tick to finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Fetch,
    Decode,
    Execute,
    Writeback,
    InterruptCheck,
}

#[derive(Debug)]
pub struct Cpu {
    pub a: Byte,
    pub x: Byte,
    pub y: Byte,
    pub pc: Word,
    pub flags: Flags,

    pub(crate) opcode: Byte,
    pub(crate) operand: [Byte; 2],
    pub(crate) fetch_count: u8,
    pub(crate) current_fetch: u8,
    fetch_in_flight: bool,

    pub(crate) execute_pulse: u8,
    pub(crate) sys_cursor: Word,
    pub(crate) write_address: Option<Word>,
    pub(crate) write_value: Option<Byte>,

    step: Step,
    current_entry: Option<DecodeEntry>,
    decode_table: DecodeTable,
    instruction_set: Box<dyn InstructionSet>,

    pending_interrupt: Option<Interrupt>,
    stop_requested: bool,

    /// Whether ADC honors an incoming Carry flag. Exposed as a config knob rather
    /// than hardcoded so a program can be run both ways (§6, §8).
    pub use_carry: bool,

    /// Text SYS has printed so far. The host reads and clears this between runs.
    pub console_output: String,
}

impl Cpu {
    #[must_use]
    pub fn new(instruction_set: Box<dyn InstructionSet>) -> Self {
        let decode_table = instruction_set.decode_table();
        Self {
            a: Byte::ZERO,
            x: Byte::ZERO,
            y: Byte::ZERO,
            pc: Word::ZERO,
            flags: Flags::empty(),
            opcode: Byte::ZERO,
            operand: [Byte::ZERO; 2],
            fetch_count: 0,
            current_fetch: 0,
            fetch_in_flight: false,
            execute_pulse: 0,
            sys_cursor: Word::ZERO,
            write_address: None,
            write_value: None,
            step: Step::Fetch,
            current_entry: None,
            decode_table,
            instruction_set,
            pending_interrupt: None,
            stop_requested: false,
            use_carry: false,
            console_output: String::new(),
        }
    }

    #[must_use]
    pub fn instruction_set(&self) -> &dyn InstructionSet {
        self.instruction_set.as_ref()
    }

    #[must_use]
    pub fn step(&self) -> Step {
        self.step
    }

    #[must_use]
    pub fn stop_requested(&self) -> bool {
        self.stop_requested
    }

    pub fn request_stop(&mut self) {
        self.stop_requested = true;
    }

    pub fn clear_stop_request(&mut self) {
        self.stop_requested = false;
    }

    #[must_use]
    pub fn pending_interrupt(&self) -> Option<&Interrupt> {
        self.pending_interrupt.as_ref()
    }

    pub fn set_pending_interrupt(&mut self, interrupt: Option<Interrupt>) {
        self.pending_interrupt = interrupt;
    }

    pub fn reset(&mut self) {
        self.a = Byte::ZERO;
        self.x = Byte::ZERO;
        self.y = Byte::ZERO;
        self.pc = Word::ZERO;
        self.flags = Flags::empty();
        self.step = Step::Fetch;
        self.current_entry = None;
        self.fetch_in_flight = false;
        self.fetch_count = 0;
        self.current_fetch = 0;
        self.execute_pulse = 0;
        self.write_address = None;
        self.write_value = None;
        self.pending_interrupt = None;
        self.stop_requested = false;
        self.console_output.clear();
    }

    /// Advance the pipeline by one clock pulse. Faults are caught here, logged, and
    /// reset the pipeline back to Fetch rather than propagating out to the caller —
    /// a single bad instruction should not crash the host (§7).
    pub fn tick(&mut self, mmu: &mut Mmu, memory: &mut Memory) {
        if mmu.is_program_loading() {
            return;
        }

        let outcome = match self.step {
            Step::Fetch => self.pulse_fetch(mmu, memory),
            Step::Decode => self.pulse_decode(mmu, memory),
            Step::Execute => self.pulse_execute(mmu, memory),
            Step::Writeback => self.pulse_writeback(mmu, memory),
            Step::InterruptCheck => {
                self.pulse_interrupt_check();
                Ok(())
            }
        };

        if let Err(error) = outcome {
            warn!("cpu fault at pc={}: {error}", self.pc);
            self.step = Step::Fetch;
            self.fetch_in_flight = false;
            self.current_fetch = 0;
            self.fetch_count = 0;
        }
    }

    /// Read one byte through the two-phase memory protocol: the first pulse
    /// triggers the read, the second consumes the MDR once `Memory::tick` has
    /// committed it. Returns `Ok(None)` while the read is still in flight.
    fn pulse_in_step(
        &mut self,
        mmu: &mut Mmu,
        memory: &mut Memory,
        addr: Word,
    ) -> Result<Option<Byte>, SimError> {
        if !self.fetch_in_flight {
            mmu.trigger_read(memory, addr);
            self.fetch_in_flight = true;
            return Ok(None);
        }
        let value = mmu.get_mdr(memory, self.pc)?;
        self.fetch_in_flight = false;
        Ok(Some(value))
    }

    fn pulse_fetch(&mut self, mmu: &mut Mmu, memory: &mut Memory) -> Result<(), SimError> {
        match self.pulse_in_step(mmu, memory, self.pc)? {
            None => Ok(()),
            Some(opcode) => {
                self.opcode = opcode;
                self.pc += 1;
                self.step = Step::Decode;
                Ok(())
            }
        }
    }

    fn pulse_decode(&mut self, mmu: &mut Mmu, memory: &mut Memory) -> Result<(), SimError> {
        if self.current_entry.is_none() {
            let entry = self.decode_table.get(self.opcode).ok_or(SimError::UnknownOpcode {
                pc: self.pc,
                opcode: self.opcode,
            })?;
            self.fetch_count = (entry.operand_width)(self);
            self.current_fetch = 0;
            self.current_entry = Some(entry);
            debug!("decoded {} at pc={}", entry.tag, self.pc);
        }

        if self.current_fetch >= self.fetch_count {
            self.execute_pulse = 0;
            self.write_address = None;
            self.write_value = None;
            self.step = Step::Execute;
            return Ok(());
        }

        match self.pulse_in_step(mmu, memory, self.pc)? {
            None => Ok(()),
            Some(byte) => {
                self.operand[self.current_fetch as usize] = byte;
                self.pc += 1;
                self.current_fetch += 1;
                Ok(())
            }
        }
    }

    fn pulse_execute(&mut self, mmu: &mut Mmu, memory: &mut Memory) -> Result<(), SimError> {
        let entry = self.current_entry.expect("Execute only runs after Decode resolves an entry");
        let needs_more = (entry.micro_op)(self, mmu, memory)?;
        if !needs_more {
            self.current_entry = None;
            self.step = if self.write_address.is_some() && self.write_value.is_some() {
                Step::Writeback
            } else {
                Step::InterruptCheck
            };
        }
        Ok(())
    }

    /// Both `write_address` and `write_value` must be set for a write to be staged
    /// — a lone value with no address (or vice versa) is not a pending write. This
    /// is an explicit correction over a looser truthy check.
    fn pulse_writeback(&mut self, mmu: &mut Mmu, memory: &mut Memory) -> Result<(), SimError> {
        if let (Some(address), Some(value)) = (self.write_address, self.write_value) {
            mmu.write_immediate(memory, address, value);
        }
        self.write_address = None;
        self.write_value = None;
        self.step = Step::InterruptCheck;
        Ok(())
    }

    fn pulse_interrupt_check(&mut self) {
        if let Some(interrupt) = self.pending_interrupt.take() {
            debug!("servicing interrupt from {}", interrupt.device_name);
            if interrupt.device_name == "Keyboard" && matches!(interrupt.data.0, b'q' | b'Q') {
                self.request_stop();
            }
        }
        self.step = Step::Fetch;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::Mos6502InstructionSet;
    use crate::mmu::Mmu;

    fn new_cpu() -> Cpu {
        Cpu::new(Box::new(Mos6502InstructionSet))
    }

    /// Runs enough pulses for one full Fetch→Decode→Execute→Writeback→InterruptCheck
    /// cycle, servicing the memory transaction each tick generates along the way.
    fn run_one_instruction(cpu: &mut Cpu, mmu: &mut Mmu, memory: &mut Memory) {
        let mut left_fetch = false;
        for _ in 0..32 {
            cpu.tick(mmu, memory);
            let event = memory.tick();
            if event.write_completed && mmu.is_program_loading() {
                mmu.advance_load(memory);
            }
            if cpu.step() != Step::Fetch {
                left_fetch = true;
            } else if left_fetch {
                break;
            }
        }
    }

    #[test]
    fn lda_immediate_loads_accumulator_and_leaves_flags_untouched() {
        let mut memory = Memory::new();
        let mut mmu = Mmu::new();
        mmu.set_program(&mut memory, &[0xA9, 0x2A]);

        let mut cpu = new_cpu();
        run_one_instruction(&mut cpu, &mut mmu, &mut memory);

        assert_eq!(cpu.a, Byte(0x2A));
        assert!(!cpu.flags.zero());
        assert!(!cpu.flags.carry());
        assert_eq!(cpu.pc, Word(2));
    }

    #[test]
    fn unknown_opcode_resets_pipeline_to_fetch_without_crashing() {
        let mut memory = Memory::new();
        let mut mmu = Mmu::new();
        mmu.set_program(&mut memory, &[0x02]);

        let mut cpu = new_cpu();
        run_one_instruction(&mut cpu, &mut mmu, &mut memory);

        assert_eq!(cpu.step(), Step::Fetch);
        assert_eq!(cpu.pc, Word(1));
    }

    #[test]
    fn writeback_requires_both_address_and_value() {
        let mut memory = Memory::new();
        let mut mmu = Mmu::new();
        let mut cpu = new_cpu();

        cpu.write_address = Some(Word(0x10));
        cpu.write_value = None;
        cpu.pulse_writeback(&mut mmu, &mut memory).unwrap();
        memory.tick();
        assert_eq!(memory.peek(Word(0x10)), Byte::ZERO);
        assert_eq!(cpu.step(), Step::InterruptCheck);
    }

    #[test]
    fn writeback_commits_when_both_are_set() {
        let mut memory = Memory::new();
        let mut mmu = Mmu::new();
        let mut cpu = new_cpu();

        cpu.write_address = Some(Word(0x10));
        cpu.write_value = Some(Byte(0x42));
        cpu.pulse_writeback(&mut mmu, &mut memory).unwrap();
        memory.tick();
        assert_eq!(memory.peek(Word(0x10)), Byte(0x42));
    }

    #[test]
    fn keyboard_q_interrupt_requests_stop() {
        let mut cpu = new_cpu();
        cpu.set_pending_interrupt(Some(Interrupt::keyboard(Byte(b'q'))));
        cpu.pulse_interrupt_check();
        assert!(cpu.stop_requested());
        assert!(cpu.pending_interrupt().is_none());
    }
}
