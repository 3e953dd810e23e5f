//! Top-level coordinator wiring Memory, Mmu, Cpu, Clock, InterruptController, and
//! Keyboard together (§5, §9).

use crate::clock::Clock;
use crate::cpu::Cpu;
use crate::interrupt::InterruptController;
use crate::keyboard::Keyboard;
use crate::memory::Memory;
use crate::mmu::Mmu;
use crate::program::{Program, RegisterSnapshot};
use log::info;
use sim_core::Byte;

/// Whether a completed run matched its program's expected register snapshot. Only
/// meaningful when the program supplied one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    NoExpectation,
    Pass,
    Fail,
}

pub struct System {
    cpu: Cpu,
    mmu: Mmu,
    memory: Memory,
    clock: Clock,
    interrupts: InterruptController,
    keyboard: Keyboard,
    expected: Option<RegisterSnapshot>,
}

impl System {
    #[must_use]
    pub fn new(cpu: Cpu) -> Self {
        Self {
            cpu,
            mmu: Mmu::new(),
            memory: Memory::new(),
            clock: Clock::default(),
            interrupts: InterruptController::new(),
            keyboard: Keyboard::new(),
            expected: None,
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn load(&mut self, program: &Program) {
        self.cpu.reset();
        self.mmu.reset(&mut self.memory);
        self.interrupts.clear();
        self.mmu.set_program(&mut self.memory, &program.code);
        self.expected = program.expected;
        info!("loaded program \"{}\" ({} bytes)", program.name, program.code.len());
    }

    pub fn publish_key(&mut self, byte: Byte) {
        self.keyboard.publish(byte);
    }

    #[must_use]
    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    #[must_use]
    pub fn console_output(&self) -> &str {
        &self.cpu.console_output
    }

    /// Drive every component forward by exactly one clock pulse, in the fixed
    /// order CPU, Memory, InterruptController (§4.4). A memory write committing
    /// while a program load is in progress feeds the next queued byte, since
    /// `Memory` has no reference back to `Mmu` to do that itself (§4.1, §4.2).
    pub fn pulse(&mut self) {
        self.cpu.tick(&mut self.mmu, &mut self.memory);

        let event = self.memory.tick();
        if event.write_completed && self.mmu.is_program_loading() {
            self.mmu.advance_load(&mut self.memory);
        }

        self.keyboard.tick(&mut self.interrupts);
        self.interrupts.tick(&mut self.cpu);

        self.clock.advance();
    }

    /// Run until the CPU requests a stop (BRK, SYS halt, or a keyboard `q`/`Q`),
    /// pacing each pulse with the clock's configured period.
    pub fn run(&mut self) -> Verdict {
        while !self.cpu.stop_requested() {
            self.pulse();
            self.clock.sleep_until_next_tick();
        }
        self.verdict()
    }

    #[cfg(test)]
    pub(crate) fn mmu_is_loading_for_test(&self) -> bool {
        self.mmu.is_program_loading()
    }

    #[cfg(test)]
    pub(crate) fn memory_peek_for_test(&self, addr: sim_core::Word) -> Byte {
        self.memory.peek(addr)
    }

    #[must_use]
    pub fn verdict(&self) -> Verdict {
        match self.expected {
            None => Verdict::NoExpectation,
            Some(expected) => {
                let actual = RegisterSnapshot {
                    a: self.cpu.a,
                    x: self.cpu.x,
                    y: self.cpu.y,
                    z: self.cpu.flags.zero(),
                    c: self.cpu.flags.carry(),
                };
                if actual == expected {
                    Verdict::Pass
                } else {
                    Verdict::Fail
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::Mos6502InstructionSet;
    use crate::program::Program;
    use sim_core::Word;

    fn new_system() -> System {
        System::new(Cpu::new(Box::new(Mos6502InstructionSet)))
    }

    #[test]
    fn brk_stops_the_run() {
        let mut system = new_system();
        system.load(&Program::new("halt", vec![0x00]));
        let verdict = system.run();
        assert_eq!(verdict, Verdict::NoExpectation);
        assert!(system.cpu().stop_requested());
    }

    #[test]
    fn lda_then_tax_reaches_the_expected_snapshot() {
        let mut system = new_system();
        let program = Program::new("transfer", vec![0xA9, 0x05, 0xAA, 0x00]).with_expected(RegisterSnapshot {
            a: Byte(5),
            x: Byte(5),
            y: Byte::ZERO,
            z: false,
            c: false,
        });
        system.load(&program);
        let verdict = system.run();
        assert_eq!(verdict, Verdict::Pass);
    }

    #[test]
    fn sys_x3_prints_the_string_at_the_absolute_operand() {
        let mut system = new_system();
        let code = vec![
            0xA2, 0x03, // LDX #3
            0xFF, 0x06, 0x00, // SYS <0x0006>
            0x00, // BRK
            b'H', b'i', 0x00,
        ];
        system.load(&Program::new("string-print", code));
        system.run();
        assert_eq!(system.console_output(), "Hi");
        assert_eq!(system.cpu().x, Byte(3));
    }

    #[test]
    fn sys_x1_prints_y_as_decimal() {
        let mut system = new_system();
        let code = vec![
            0xA0, 0x2A, // LDY #42
            0xA2, 0x01, // LDX #1
            0xFF, // SYS (X=1 takes no operand byte)
            0x00, // BRK
        ];
        system.load(&Program::new("integer-print", code));
        system.run();
        assert_eq!(system.console_output(), "42");
    }

    #[test]
    fn sys_x2_prints_the_string_at_the_zero_page_address_in_y() {
        let mut system = new_system();
        let mut code = vec![
            0xA0, 0x10, // LDY #$10 (zero-page string address)
            0xA2, 0x02, // LDX #2
            0xFF, // SYS (X=2 takes no operand byte)
            0x00, // BRK
        ];
        code.extend(std::iter::repeat(0xEA).take(0x10 - code.len()));
        code.extend_from_slice(&[b'H', b'i', 0x00]);
        system.load(&Program::new("zero-page-string-print", code));
        system.run();
        assert_eq!(system.console_output(), "Hi");
        assert_eq!(system.cpu().x, Byte(2));
    }

    #[test]
    fn cpx_then_bne_skips_the_poisoned_instruction() {
        let mut system = new_system();
        let code = vec![
            0xA2, 0x05, // LDX #5
            0xEC, 0x20, 0x00, // CPX $0020 (M[0x20] == 0)
            0xD0, 0x02, // BNE +2
            0xEA, 0xEA, // skipped NOPs
            0x00, // BRK
        ];
        let program = Program::new("branch-taken", code).with_expected(RegisterSnapshot {
            a: Byte::ZERO,
            x: Byte(5),
            y: Byte::ZERO,
            z: false,
            c: true,
        });
        system.load(&program);
        let verdict = system.run();
        assert_eq!(verdict, Verdict::Pass);
    }

    #[test]
    fn adc_overflow_sets_carry_without_touching_zero() {
        let mut system = new_system();
        let code = vec![
            0xA9, 0xFF, // LDA #$FF
            0x8D, 0x10, 0x00, // STA $0010
            0xA9, 0x02, // LDA #$02
            0x6D, 0x10, 0x00, // ADC $0010
            0x00, // BRK
        ];
        system.load(&Program::new("adc-carry", code));
        system.run();
        assert_eq!(system.cpu().a, Byte(0x01));
        assert!(system.cpu().flags.carry());
        assert!(!system.cpu().flags.zero());
    }

    #[test]
    fn keyboard_q_halts_a_running_program() {
        let mut system = new_system();
        system.load(&Program::new("spin", vec![0xEA, 0xEA, 0xEA, 0xEA]));
        system.publish_key(Byte(b'q'));
        for _ in 0..64 {
            if system.cpu().stop_requested() {
                break;
            }
            system.pulse();
        }
        assert!(system.cpu().stop_requested());
    }

    #[test]
    fn sta_then_lda_round_trips_through_memory() {
        let mut system = new_system();
        let code = vec![
            0xA9, 0x77, // LDA #$77
            0x8D, 0x30, 0x00, // STA $0030
            0xA9, 0x00, // LDA #$00 (clobber A before reloading)
            0xAD, 0x30, 0x00, // LDA $0030
            0x00, // BRK
        ];
        system.load(&Program::new("sta-lda-roundtrip", code));
        system.run();
        assert_eq!(system.cpu().a, Byte(0x77));
    }

    #[test]
    fn tax_then_txa_preserves_the_accumulator() {
        let mut system = new_system();
        let code = vec![
            0xA9, 0x5A, // LDA #$5A
            0xAA, // TAX
            0xA9, 0x00, // LDA #$00 (clobber A)
            0x8A, // TXA
            0x00, // BRK
        ];
        system.load(&Program::new("tax-txa-roundtrip", code));
        system.run();
        assert_eq!(system.cpu().a, Byte(0x5A));
        assert_eq!(system.cpu().x, Byte(0x5A));
    }

    #[test]
    fn is_program_loading_holds_for_exactly_the_program_length() {
        let mut system = new_system();
        let code = vec![0xA9, 0x2A, 0x00];
        system.load(&Program::new("loading-window", code.clone()));

        for tick in 0..code.len() {
            assert!(system.mmu_is_loading_for_test(), "expected still loading at tick {tick}");
            system.pulse();
        }
        assert!(!system.mmu_is_loading_for_test());
    }

    #[test]
    fn inc_applied_256_times_returns_to_the_original_value() {
        let mut system = new_system();
        // INC $0050 repeated 256 times, then BRK.
        let mut code = Vec::new();
        for _ in 0..256 {
            code.extend_from_slice(&[0xEE, 0x50, 0x00]);
        }
        code.push(0x00);
        system.load(&Program::new("inc-wraps", code));
        system.run();
        assert_eq!(system.memory_peek_for_test(Word(0x0050)), Byte::ZERO);
    }
}
