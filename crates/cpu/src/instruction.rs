//! Opcode decode table and micro-op bodies for the Execute pipeline stage (§4.5).
//!
//! Each opcode gets its own micro-op rather than each mnemonic getting one: by the
//! time Execute runs, the addressing mode that was live during Decode is gone
//! (`fetch_count`/`current_fetch` are cleared before Execute starts), so there is
//! nothing left at Execute time to re-derive "immediate vs absolute" from. Baking the
//! addressing behavior into the opcode's own function sidesteps that entirely.

use crate::cpu::Cpu;
use crate::memory::Memory;
use crate::mmu::Mmu;
use sim_core::{ascii, Byte, SimError, Word};

/// Mnemonic tag, used only for logging/display — never for dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstructionTag {
    Lda,
    Ldx,
    Ldy,
    Sta,
    Txa,
    Tya,
    Tax,
    Tay,
    Adc,
    Cpx,
    Bne,
    Inc,
    Nop,
    Brk,
    Sys,
}

impl std::fmt::Display for InstructionTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            InstructionTag::Lda => "LDA",
            InstructionTag::Ldx => "LDX",
            InstructionTag::Ldy => "LDY",
            InstructionTag::Sta => "STA",
            InstructionTag::Txa => "TXA",
            InstructionTag::Tya => "TYA",
            InstructionTag::Tax => "TAX",
            InstructionTag::Tay => "TAY",
            InstructionTag::Adc => "ADC",
            InstructionTag::Cpx => "CPX",
            InstructionTag::Bne => "BNE",
            InstructionTag::Inc => "INC",
            InstructionTag::Nop => "NOP",
            InstructionTag::Brk => "BRK",
            InstructionTag::Sys => "SYS",
        };
        f.write_str(name)
    }
}

/// A micro-op runs once per Execute pulse. `Ok(true)` means it needs another pulse
/// before it is done; `Ok(false)` means Execute is finished for this instruction.
pub type MicroOp = fn(&mut Cpu, &mut Mmu, &mut Memory) -> Result<bool, SimError>;

/// How many operand bytes Decode should fetch before Execute runs. A plain function
/// pointer rather than a fixed count because SYS (0xFF) is the one opcode whose
/// operand width depends on the X register already loaded by the time Decode reads
/// it (§4.5, §6).
pub type OperandWidthFn = fn(&Cpu) -> u8;

#[derive(Clone, Copy)]
pub struct DecodeEntry {
    pub tag: InstructionTag,
    pub operand_width: OperandWidthFn,
    pub micro_op: MicroOp,
}

impl std::fmt::Debug for DecodeEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodeEntry").field("tag", &self.tag).finish()
    }
}

fn zero_operands(_cpu: &Cpu) -> u8 {
    0
}

fn one_operand(_cpu: &Cpu) -> u8 {
    1
}

fn two_operands(_cpu: &Cpu) -> u8 {
    2
}

/// SYS dispatches on X: sub-code 3 (16-bit operand print) needs a two-byte operand;
/// sub-codes 1 and 2 take no operand byte at all (their addresses come from Y).
fn sys_operand_width(cpu: &Cpu) -> u8 {
    if cpu.x == Byte(3) {
        2
    } else {
        0
    }
}

/// The address named by a two-byte little-endian operand.
fn absolute_address(cpu: &Cpu) -> Word {
    Word::from_little_endian(cpu.operand[0], cpu.operand[1])
}

// --- load/store/transfer ---------------------------------------------------

// None of LDA/LDX/LDY/STA/TXA/TYA/TAX/TAY/INC touch Z or C. Flags are set only by
// the two instructions documented as doing so: ADC (Carry only) and CPX (both).

fn lda_immediate(cpu: &mut Cpu, _mmu: &mut Mmu, _memory: &mut Memory) -> Result<bool, SimError> {
    cpu.a = cpu.operand[0];
    Ok(false)
}

fn lda_absolute(cpu: &mut Cpu, mmu: &mut Mmu, memory: &mut Memory) -> Result<bool, SimError> {
    read_absolute_then(cpu, mmu, memory, |cpu, value| cpu.a = value)
}

fn ldx_immediate(cpu: &mut Cpu, _mmu: &mut Mmu, _memory: &mut Memory) -> Result<bool, SimError> {
    cpu.x = cpu.operand[0];
    Ok(false)
}

fn ldx_absolute(cpu: &mut Cpu, mmu: &mut Mmu, memory: &mut Memory) -> Result<bool, SimError> {
    read_absolute_then(cpu, mmu, memory, |cpu, value| cpu.x = value)
}

fn ldy_immediate(cpu: &mut Cpu, _mmu: &mut Mmu, _memory: &mut Memory) -> Result<bool, SimError> {
    cpu.y = cpu.operand[0];
    Ok(false)
}

fn ldy_absolute(cpu: &mut Cpu, mmu: &mut Mmu, memory: &mut Memory) -> Result<bool, SimError> {
    read_absolute_then(cpu, mmu, memory, |cpu, value| cpu.y = value)
}

fn sta_absolute(cpu: &mut Cpu, _mmu: &mut Mmu, _memory: &mut Memory) -> Result<bool, SimError> {
    cpu.write_address = Some(absolute_address(cpu));
    cpu.write_value = Some(cpu.a);
    Ok(false)
}

fn txa(cpu: &mut Cpu, _mmu: &mut Mmu, _memory: &mut Memory) -> Result<bool, SimError> {
    cpu.a = cpu.x;
    Ok(false)
}

fn tya(cpu: &mut Cpu, _mmu: &mut Mmu, _memory: &mut Memory) -> Result<bool, SimError> {
    cpu.a = cpu.y;
    Ok(false)
}

fn tax(cpu: &mut Cpu, _mmu: &mut Mmu, _memory: &mut Memory) -> Result<bool, SimError> {
    cpu.x = cpu.a;
    Ok(false)
}

fn tay(cpu: &mut Cpu, _mmu: &mut Mmu, _memory: &mut Memory) -> Result<bool, SimError> {
    cpu.y = cpu.a;
    Ok(false)
}

// --- arithmetic / compare ----------------------------------------------------

/// ADC deliberately never touches Zero — only Carry. That asymmetry is preserved
/// as specified rather than "fixed" to match a conventional 6502 ADC.
fn adc_absolute(cpu: &mut Cpu, mmu: &mut Mmu, memory: &mut Memory) -> Result<bool, SimError> {
    read_absolute_then(cpu, mmu, memory, |cpu, value| {
        let carry_in = u16::from(cpu.use_carry && cpu.flags.carry());
        let sum = u16::from(cpu.a.0) + u16::from(value.0) + carry_in;
        cpu.a = Byte(sum as u8);
        cpu.flags.set_carry(sum > 0xFF);
    })
}

fn cpx_absolute(cpu: &mut Cpu, mmu: &mut Mmu, memory: &mut Memory) -> Result<bool, SimError> {
    read_absolute_then(cpu, mmu, memory, |cpu, value| {
        cpu.flags.set_zero(cpu.x == value);
        cpu.flags.set_carry(cpu.x.0 >= value.0);
    })
}

fn inc_absolute(cpu: &mut Cpu, mmu: &mut Mmu, memory: &mut Memory) -> Result<bool, SimError> {
    read_absolute_then(cpu, mmu, memory, |cpu, value| {
        let incremented = value + 1;
        cpu.write_address = Some(absolute_address(cpu));
        cpu.write_value = Some(incremented);
    })
}

// --- control flow / misc -----------------------------------------------------

fn bne(cpu: &mut Cpu, _mmu: &mut Mmu, _memory: &mut Memory) -> Result<bool, SimError> {
    if !cpu.flags.zero() {
        cpu.pc = cpu.pc.offset_by_signed_byte(cpu.operand[0]);
    }
    Ok(false)
}

fn nop(_cpu: &mut Cpu, _mmu: &mut Mmu, _memory: &mut Memory) -> Result<bool, SimError> {
    Ok(false)
}

fn brk(cpu: &mut Cpu, _mmu: &mut Mmu, _memory: &mut Memory) -> Result<bool, SimError> {
    cpu.request_stop();
    Ok(false)
}

/// SYS (0xFF) dispatches on X:
/// - X=1: print Y as a decimal integer.
/// - X=2: print a NUL-terminated ASCII string starting at zero-page address Y.
/// - X=3: print a NUL-terminated ASCII string starting at the 16-bit operand address.
fn sys(cpu: &mut Cpu, mmu: &mut Mmu, memory: &mut Memory) -> Result<bool, SimError> {
    match cpu.x.0 {
        1 => {
            cpu.console_output.push_str(&cpu.y.0.to_string());
            Ok(false)
        }
        2 => print_string_at(cpu, mmu, memory, Word(u16::from(cpu.y.0))),
        3 => print_string_at(cpu, mmu, memory, absolute_address(cpu)),
        other => Err(SimError::InvalidSyscall {
            pc: cpu.pc,
            sub_code: Byte(other),
        }),
    }
}

/// Reads and appends one character per Execute pulse until a NUL terminator is
/// found. Uses `cpu.sys_cursor` to track the address across pulses and
/// `cpu.execute_pulse` to know whether a read is already in flight.
fn print_string_at(
    cpu: &mut Cpu,
    mmu: &mut Mmu,
    memory: &mut Memory,
    start: Word,
) -> Result<bool, SimError> {
    if cpu.execute_pulse == 0 {
        cpu.sys_cursor = start;
    }
    if cpu.execute_pulse % 2 == 0 {
        mmu.trigger_read(memory, cpu.sys_cursor);
        cpu.execute_pulse += 1;
        return Ok(true);
    }
    let byte = mmu.get_mdr(memory, cpu.pc)?;
    if byte == Byte::ZERO {
        return Ok(false);
    }
    if let Some(ch) = ascii::decode(byte) {
        cpu.console_output.push(ch);
    }
    cpu.sys_cursor += 1;
    cpu.execute_pulse += 1;
    Ok(true)
}

/// Shared two-pulse "trigger read, then consume MDR" shape used by every absolute
/// addressing-mode instruction that reads memory during Execute.
fn read_absolute_then(
    cpu: &mut Cpu,
    mmu: &mut Mmu,
    memory: &mut Memory,
    apply: impl FnOnce(&mut Cpu, Byte),
) -> Result<bool, SimError> {
    if cpu.execute_pulse == 0 {
        mmu.trigger_read(memory, absolute_address(cpu));
        cpu.execute_pulse += 1;
        return Ok(true);
    }
    let value = mmu.get_mdr(memory, cpu.pc)?;
    apply(cpu, value);
    Ok(false)
}

/// The full 256-entry decode table. Unimplemented opcodes decode to `None`, which
/// the CPU turns into [`SimError::UnknownOpcode`] at Decode time.
#[derive(Clone, Copy)]
pub struct DecodeTable([Option<DecodeEntry>; 256]);

impl std::fmt::Debug for DecodeTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodeTable")
            .field("populated", &self.0.iter().filter(|e| e.is_some()).count())
            .finish()
    }
}

impl DecodeTable {
    #[must_use]
    pub const fn empty() -> Self {
        Self([None; 256])
    }

    #[must_use]
    pub const fn with(mut self, opcode: u8, entry: DecodeEntry) -> Self {
        self.0[opcode as usize] = Some(entry);
        self
    }

    #[must_use]
    pub fn get(&self, opcode: Byte) -> Option<DecodeEntry> {
        self.0[opcode.as_usize()]
    }
}

/// A swappable source of opcode behavior, mirroring how the CPU never hardcodes a
/// single instruction set.
pub trait InstructionSet: std::fmt::Debug {
    fn decode_table(&self) -> DecodeTable;
}

/// The one instruction set this simulator ships: the documented ~18-opcode subset.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mos6502InstructionSet;

impl InstructionSet for Mos6502InstructionSet {
    fn decode_table(&self) -> DecodeTable {
        DecodeTable::empty()
            .with(
                0x00,
                DecodeEntry {
                    tag: InstructionTag::Brk,
                    operand_width: zero_operands,
                    micro_op: brk,
                },
            )
            .with(
                0xA9,
                DecodeEntry {
                    tag: InstructionTag::Lda,
                    operand_width: one_operand,
                    micro_op: lda_immediate,
                },
            )
            .with(
                0xAD,
                DecodeEntry {
                    tag: InstructionTag::Lda,
                    operand_width: two_operands,
                    micro_op: lda_absolute,
                },
            )
            .with(
                0xA2,
                DecodeEntry {
                    tag: InstructionTag::Ldx,
                    operand_width: one_operand,
                    micro_op: ldx_immediate,
                },
            )
            .with(
                0xAE,
                DecodeEntry {
                    tag: InstructionTag::Ldx,
                    operand_width: two_operands,
                    micro_op: ldx_absolute,
                },
            )
            .with(
                0xA0,
                DecodeEntry {
                    tag: InstructionTag::Ldy,
                    operand_width: one_operand,
                    micro_op: ldy_immediate,
                },
            )
            .with(
                0xAC,
                DecodeEntry {
                    tag: InstructionTag::Ldy,
                    operand_width: two_operands,
                    micro_op: ldy_absolute,
                },
            )
            .with(
                0x8D,
                DecodeEntry {
                    tag: InstructionTag::Sta,
                    operand_width: two_operands,
                    micro_op: sta_absolute,
                },
            )
            .with(
                0x8A,
                DecodeEntry {
                    tag: InstructionTag::Txa,
                    operand_width: zero_operands,
                    micro_op: txa,
                },
            )
            .with(
                0x98,
                DecodeEntry {
                    tag: InstructionTag::Tya,
                    operand_width: zero_operands,
                    micro_op: tya,
                },
            )
            .with(
                0xAA,
                DecodeEntry {
                    tag: InstructionTag::Tax,
                    operand_width: zero_operands,
                    micro_op: tax,
                },
            )
            .with(
                0xA8,
                DecodeEntry {
                    tag: InstructionTag::Tay,
                    operand_width: zero_operands,
                    micro_op: tay,
                },
            )
            .with(
                0x6D,
                DecodeEntry {
                    tag: InstructionTag::Adc,
                    operand_width: two_operands,
                    micro_op: adc_absolute,
                },
            )
            .with(
                0xEC,
                DecodeEntry {
                    tag: InstructionTag::Cpx,
                    operand_width: two_operands,
                    micro_op: cpx_absolute,
                },
            )
            .with(
                0xD0,
                DecodeEntry {
                    tag: InstructionTag::Bne,
                    operand_width: one_operand,
                    micro_op: bne,
                },
            )
            .with(
                0xEE,
                DecodeEntry {
                    tag: InstructionTag::Inc,
                    operand_width: two_operands,
                    micro_op: inc_absolute,
                },
            )
            .with(
                0xEA,
                DecodeEntry {
                    tag: InstructionTag::Nop,
                    operand_width: zero_operands,
                    micro_op: nop,
                },
            )
            .with(
                0xFF,
                DecodeEntry {
                    tag: InstructionTag::Sys,
                    operand_width: sys_operand_width,
                    micro_op: sys,
                },
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlisted_opcodes_decode_to_none() {
        let table = Mos6502InstructionSet.decode_table();
        assert!(table.get(Byte(0x02)).is_none());
    }

    #[test]
    fn lda_immediate_decodes_with_one_operand_byte() {
        let table = Mos6502InstructionSet.decode_table();
        let entry = table.get(Byte(0xA9)).expect("0xA9 is LDA #imm");
        assert_eq!(entry.tag, InstructionTag::Lda);
    }

    #[test]
    fn sys_operand_width_depends_on_x() {
        let mut cpu = Cpu::new(Box::new(Mos6502InstructionSet));
        cpu.x = Byte(3);
        assert_eq!(sys_operand_width(&cpu), 2);
        cpu.x = Byte(1);
        assert_eq!(sys_operand_width(&cpu), 0);
        cpu.x = Byte(2);
        assert_eq!(sys_operand_width(&cpu), 0);
    }
}
