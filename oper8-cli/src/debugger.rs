use crate::run;
use colored::*;
use oper8_core::cpu::Cpu;
use oper8_core::opcodes;
use std::io::{self, BufRead, Write};
use std::path::Path;

/// Dump the register file, flags, PC, and the disassembled next
/// instruction. Shared with the REPL's `regs` command.
pub fn print_state(cpu: &Cpu) {
    for row in 0..2 {
        let mut line = String::new();
        for col in 0..8 {
            let register = row * 8 + col;
            line.push_str(&format!(
                "{} {:02X}   ",
                format!("R{:<2}", register).cyan(),
                cpu.registers[register]
            ));
        }
        println!("{}", line.trim_end());
    }

    let next = opcodes::disassemble(
        cpu.read_u8(cpu.pc),
        cpu.read_u8(cpu.pc.wrapping_add(1)),
    );
    let mut tail = format!("{}", next.bold());
    if cpu.halted {
        tail = format!("{} {}", "halted".bright_red(), tail);
    }
    println!(
        "{} {:04X}  Z:{} C:{} N:{}  {}",
        "PC".cyan(),
        cpu.pc,
        cpu.zero as u8,
        cpu.carry as u8,
        cpu.negative as u8,
        tail
    );
}

/// Debug mode: show the state, step on Enter, `r` runs to halt, `q` quits.
pub fn start(path: &Path) -> i32 {
    let program = match run::load_file(path) {
        Ok(program) => program,
        Err(error) => {
            eprintln!("{}", error);
            return 1;
        }
    };
    let mut cpu = Cpu::new();
    cpu.load(&program);
    cpu.pc = program.start;

    println!(
        "Single-stepping {}. Enter steps, r runs to halt, q quits.",
        path.display()
    );
    let stdin = io::stdin();
    loop {
        print_state(&cpu);
        if cpu.halted {
            return 0;
        }

        print!("dbg> ");
        let _ = io::stdout().flush();
        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => return 0,
            Ok(_) => {}
            Err(err) => {
                eprintln!("{}", err);
                return 1;
            }
        }
        match line.trim() {
            "" => {
                cpu.step();
            }
            "r" => {
                let outcome = run::run_machine(&mut cpu);
                println!("{} steps", outcome.steps);
            }
            "q" => return 0,
            other => eprintln!("unknown input \"{}\"", other),
        }
    }
}
