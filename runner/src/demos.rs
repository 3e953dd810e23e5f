//! Bundled sample programs exercising each documented instruction path.
//!
//! This catalog (and the interactive hex-entry front end it stands in for) is an
//! arbitrary producer of program bytes as far as the simulator core is concerned —
//! any byte sequence the host hands to [`sim_cpu::System::load`] is equally valid.

use sim_cpu::{Program, RegisterSnapshot};
use sim_core::Byte;

#[must_use]
pub fn catalog() -> Vec<Program> {
    vec![
        basic_transfer(),
        string_print(),
        adc_without_carry(),
        adc_with_carry(),
        branch_taken(),
        integer_print(),
    ]
}

/// LDA #$05; TAX; LDA #$03; TXA; BRK.
fn basic_transfer() -> Program {
    let code = vec![0xA9, 0x05, 0xAA, 0xA9, 0x03, 0x8A, 0x00];
    Program::new("basic-transfer", code).with_expected(RegisterSnapshot {
        a: Byte(0x05),
        x: Byte(0x05),
        y: Byte::ZERO,
        z: false,
        c: false,
    })
}

/// LDX #3; SYS <absolute "Hello!\0">; BRK; the string itself follows in memory.
fn string_print() -> Program {
    let code = vec![
        0xA2, 0x03, // LDX #3
        0xFF, 0x06, 0x00, // SYS <0x0006>
        0x00, // BRK
        b'H', b'e', b'l', b'l', b'o', b'!', 0x00,
    ];
    Program::new("string-print", code).with_expected(RegisterSnapshot {
        a: Byte::ZERO,
        x: Byte(0x03),
        y: Byte::ZERO,
        z: false,
        c: false,
    })
}

/// LDA #$FE; STA $0010; LDA #$01; ADC $0010; BRK (no incoming carry, no overflow).
fn adc_without_carry() -> Program {
    let code = vec![
        0xA9, 0xFE, // LDA #$FE
        0x8D, 0x10, 0x00, // STA $0010
        0xA9, 0x01, // LDA #$01
        0x6D, 0x10, 0x00, // ADC $0010
        0x00, // BRK
    ];
    Program::new("adc-without-carry", code).with_expected(RegisterSnapshot {
        a: Byte(0xFF),
        x: Byte::ZERO,
        y: Byte::ZERO,
        z: false,
        c: false,
    })
}

/// LDA #$FF; STA $0010; LDA #$02; ADC $0010; BRK (sum overflows 8 bits, sets Carry).
fn adc_with_carry() -> Program {
    let code = vec![
        0xA9, 0xFF, // LDA #$FF
        0x8D, 0x10, 0x00, // STA $0010
        0xA9, 0x02, // LDA #$02
        0x6D, 0x10, 0x00, // ADC $0010
        0x00, // BRK
    ];
    Program::new("adc-with-carry", code).with_expected(RegisterSnapshot {
        a: Byte(0x01),
        x: Byte::ZERO,
        y: Byte::ZERO,
        z: false,
        c: true,
    })
}

/// LDX #5; CPX $0020 (M[0x0020] is 0 by default, so X >= M and X != M); BNE +2
/// (taken, skips two NOPs); BRK.
fn branch_taken() -> Program {
    let code = vec![
        0xA2, 0x05, // LDX #5
        0xEC, 0x20, 0x00, // CPX $0020
        0xD0, 0x02, // BNE +2
        0xEA, 0xEA, // NOP, NOP (skipped)
        0x00, // BRK
    ];
    Program::new("branch-taken", code).with_expected(RegisterSnapshot {
        a: Byte::ZERO,
        x: Byte(0x05),
        y: Byte::ZERO,
        z: false,
        c: true,
    })
}

/// LDA #$2A; STA $0040; LDY $0040; LDX #1; SYS (prints Y in decimal); BRK.
fn integer_print() -> Program {
    let code = vec![
        0xA9, 0x2A, // LDA #$2A
        0x8D, 0x40, 0x00, // STA $0040
        0xAC, 0x40, 0x00, // LDY $0040
        0xA2, 0x01, // LDX #1
        0xFF, // SYS (X=1 takes no operand byte)
        0x00, // BRK
    ];
    Program::new("integer-print", code).with_expected(RegisterSnapshot {
        a: Byte(0x2A),
        x: Byte(0x01),
        y: Byte(0x2A),
        z: false,
        c: false,
    })
}
