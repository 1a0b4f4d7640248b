use crate::debugger;
use crate::run;
use colored::*;
use oper8_core::asm::{parse_number, parse_register};
use oper8_core::cpu::Cpu;
use oper8_core::harness;
use oper8_core::opcodes;
use std::io::{self, BufRead, Write};
use std::path::Path;

const PROMPT: &str = "oper8> ";

enum CommandResult {
    Continue,
    Quit,
}

/// The interactive REPL. Errors abort the current command only; the machine
/// persists between commands.
pub fn start(path: Option<&Path>) -> i32 {
    let mut cpu = Cpu::new();
    if let Some(path) = path {
        if let Err(error) = load(&mut cpu, &path.display().to_string()) {
            eprintln!("{}", error);
        }
    }
    println!(
        "OPER-8 interactive. Type {} for the command list.",
        "help".bold()
    );

    let stdin = io::stdin();
    loop {
        print!("{}", PROMPT);
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
        match command(&mut cpu, line.trim()) {
            CommandResult::Continue => {}
            CommandResult::Quit => return 0,
        }
    }
}

fn command(cpu: &mut Cpu, line: &str) -> CommandResult {
    if line.is_empty() {
        return CommandResult::Continue;
    }
    let mut parts = line.splitn(2, char::is_whitespace);
    let word = parts.next().unwrap();
    let rest = parts.next().unwrap_or("").trim();

    let result = match word {
        "help" | "h" | "?" => {
            print_help();
            Ok(())
        }
        "quit" | "q" | "exit" => return CommandResult::Quit,
        "load" | "l" => load(cpu, rest),
        "run" | "r" => {
            let outcome = run::run_machine(cpu);
            if let Some(code) = outcome.fault {
                println!(
                    "{}",
                    format!("fault {:#04x} reached the backstop handler", code)
                        .bright_red()
                );
            } else if outcome.halted {
                println!("halted after {} steps", outcome.steps);
            } else {
                println!("paused after {} steps", outcome.steps);
            }
            Ok(())
        }
        "step" | "s" => step(cpu, rest),
        "regs" => {
            debugger::print_state(cpu);
            Ok(())
        }
        "mem" | "m" => mem(cpu, rest),
        "dis" => dis(cpu, rest),
        "set" => set(cpu, rest),
        "poke" => poke(cpu, rest),
        "reset" => {
            cpu.reset();
            Ok(())
        }
        "test" => test(rest),
        unknown => Err(format!("unknown command \"{}\", try help", unknown)),
    };
    if let Err(error) = result {
        eprintln!("{}", error.bright_red());
    }
    CommandResult::Continue
}

fn print_help() {
    println!(
        "\
  load <path>          assemble (.asm) or load a raw binary and reset the PC
  run                  run until the machine halts
  step [n]             execute n instructions (default 1) and show the state
  regs                 show registers, flags, and the next instruction
  mem <addr> [len]     hex dump of memory
  dis [addr] [n]       disassemble n instructions (default 8, from the PC)
  set <r|pc|z|c|n> <v> set a register, the PC, or a flag
  poke <addr> <b>...   write bytes into memory
  test <single-step>   run one single-step test string
  reset                reset the machine
  quit                 leave"
    );
}

fn load(cpu: &mut Cpu, rest: &str) -> Result<(), String> {
    if rest.is_empty() {
        return Err("load expects a path".to_string());
    }
    let program = run::load_file(Path::new(rest))?;
    cpu.reset();
    cpu.load(&program);
    cpu.pc = program.start;
    println!(
        "loaded {} byte(s), PC at {:04X}",
        program.byte_len(),
        program.start
    );
    Ok(())
}

fn step(cpu: &mut Cpu, rest: &str) -> Result<(), String> {
    let count: u64 = if rest.is_empty() {
        1
    } else {
        rest.parse()
            .map_err(|_| format!("malformed step count \"{}\"", rest))?
    };
    for _ in 0..count {
        cpu.step();
    }
    debugger::print_state(cpu);
    Ok(())
}

fn mem(cpu: &mut Cpu, rest: &str) -> Result<(), String> {
    let mut args = rest.split_whitespace();
    let addr = match args.next() {
        Some(token) => parse_number(token)?,
        None => return Err("mem expects an address".to_string()),
    };
    let len = match args.next() {
        Some(token) => parse_number(token)?,
        None => 64,
    };
    let mut offset = 0;
    while offset < len {
        let row = addr.wrapping_add(offset);
        let mut line = format!("{}", format!("{:04X}:", row).cyan());
        for column in 0..16 {
            if offset + column >= len {
                break;
            }
            line.push_str(&format!(
                " {:02X}",
                cpu.read_u8(row.wrapping_add(column))
            ));
        }
        println!("{}", line);
        offset += 16;
    }
    Ok(())
}

fn dis(cpu: &mut Cpu, rest: &str) -> Result<(), String> {
    let mut args = rest.split_whitespace();
    let mut addr = match args.next() {
        Some(token) => parse_number(token)?,
        None => cpu.pc,
    };
    let count: u16 = match args.next() {
        Some(token) => parse_number(token)?,
        None => 8,
    };
    for _ in 0..count {
        let op = cpu.read_u8(addr);
        let arg = cpu.read_u8(addr.wrapping_add(1));
        println!(
            "{}  {:02X} {:02X}  {}",
            format!("{:04X}", addr).cyan(),
            op,
            arg,
            opcodes::disassemble(op, arg)
        );
        addr = addr.wrapping_add(2);
    }
    Ok(())
}

fn set(cpu: &mut Cpu, rest: &str) -> Result<(), String> {
    let mut args = rest.split_whitespace();
    let target = args
        .next()
        .ok_or_else(|| "set expects a target and a value".to_string())?;
    let value = args
        .next()
        .ok_or_else(|| "set expects a target and a value".to_string())?;

    match target.to_uppercase().as_str() {
        "PC" => cpu.pc = parse_number(value)?,
        "Z" => cpu.zero = parse_flag(value)?,
        "C" => cpu.carry = parse_flag(value)?,
        "N" => cpu.negative = parse_flag(value)?,
        _ => {
            let register = parse_register(target)? as usize;
            let byte = parse_number(value)?;
            if byte > 0xff {
                return Err(format!("value {} does not fit in a byte", byte));
            }
            cpu.registers[register] = byte as u8;
        }
    }
    Ok(())
}

fn parse_flag(value: &str) -> Result<bool, String> {
    match value {
        "0" => Ok(false),
        "1" => Ok(true),
        _ => Err(format!("flag value must be 0 or 1, not \"{}\"", value)),
    }
}

fn poke(cpu: &mut Cpu, rest: &str) -> Result<(), String> {
    let mut args = rest.split_whitespace();
    let mut addr = match args.next() {
        Some(token) => parse_number(token)?,
        None => return Err("poke expects an address and bytes".to_string()),
    };
    let mut wrote = false;
    for token in args {
        let byte = parse_number(token)?;
        if byte > 0xff {
            return Err(format!("value {} does not fit in a byte", byte));
        }
        cpu.write_u8(addr, byte as u8);
        addr = addr.wrapping_add(1);
        wrote = true;
    }
    if !wrote {
        return Err("poke expects at least one byte".to_string());
    }
    Ok(())
}

fn test(rest: &str) -> Result<(), String> {
    if rest.is_empty() {
        return Err("test expects a single-step test string".to_string());
    }
    let mismatches = harness::run_test(rest)?;
    if mismatches.is_empty() {
        println!("{}", "pass".green());
    } else {
        print!("{}", harness::render_mismatches(&mismatches));
    }
    Ok(())
}
