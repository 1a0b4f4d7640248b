#![macro_use]

use crate::asm::Assembler;
use crate::constants::RESET_PC;
use crate::cpu::Cpu;

/// Assemble at the reset origin, load, and run until the machine halts.
pub fn run_program(text: &str) -> Cpu {
    let program = match Assembler::new(text).assemble(RESET_PC) {
        Ok(program) => program,
        Err(err) => err.panic_nicely(),
    };
    let mut cpu = Cpu::new();
    cpu.load(&program);
    cpu.pc = program.start;
    cpu.run(100_000);
    assert!(cpu.halted, "the program did not halt:\n{}", text);
    cpu
}

/// Assemble instructions at 0x0100, load them into an existing machine, and
/// execute exactly one step per instruction, the way the harness does.
pub fn execute(cpu: &mut Cpu, text: &str) {
    let program = match Assembler::new(text).assemble(0x0100) {
        Ok(program) => program,
        Err(err) => err.panic_nicely(),
    };
    let steps = program.byte_len() / 2;
    cpu.load(&program);
    cpu.pc = 0x0100;
    for _ in 0..steps {
        cpu.step();
    }
}

/// A fresh machine with some registers preloaded.
pub fn machine_with(registers: &[(usize, u8)]) -> Cpu {
    let mut cpu = Cpu::new();
    for (register, value) in registers {
        cpu.registers[*register] = *value;
    }
    cpu
}

pub fn assert_register(cpu: &Cpu, register: usize, value: u8) {
    if cpu.registers[register] != value {
        panic!(
            "\nExpected R{} to be {:#04x} ({:#010b}) but it was {:#04x} ({:#010b})",
            register, value, value, cpu.registers[register], cpu.registers[register]
        );
    }
}

/// Check all three flags at once and report every one that is off.
pub fn assert_flags(cpu: &Cpu, zero: bool, carry: bool, negative: bool) {
    let mut result = String::new();
    if cpu.zero != zero {
        result.push_str(&format!(
            "Expected Z to be {} but it was {}\n",
            zero, cpu.zero
        ));
    }
    if cpu.carry != carry {
        result.push_str(&format!(
            "Expected C to be {} but it was {}\n",
            carry, cpu.carry
        ));
    }
    if cpu.negative != negative {
        result.push_str(&format!(
            "Expected N to be {} but it was {}\n",
            negative, cpu.negative
        ));
    }
    if !result.is_empty() {
        panic!("\n{}", result);
    }
}

/// Run a program to halt, then assert one register and the Z/C/N flags.
///
///                TestName  Register  Value  [Z, C, N]  Program
///                |         |         |      |          |
/// register_test!(add1,     1,        0x05,  [f, f, f], "...");
#[macro_export]
macro_rules! register_test {
    ($name:ident, $register:expr, $value:expr, [$zero:expr, $carry:expr, $negative:expr], $text:expr) => {
        #[test]
        fn $name() {
            let cpu = run_program($text);
            assert_register(&cpu, $register, $value);
            assert_flags(&cpu, $zero, $carry, $negative);
        }
    };
}

/// Run a program to halt and assert only the flags.
#[macro_export]
macro_rules! flags_test {
    ($name:ident, [$zero:expr, $carry:expr, $negative:expr], $text:expr) => {
        #[test]
        fn $name() {
            let cpu = run_program($text);
            assert_flags(&cpu, $zero, $carry, $negative);
        }
    };
}
