use colored::*;
use oper8_core::asm::{Assembler, Program, Segment};
use oper8_core::constants::{reserved, RESET_PC};
use oper8_core::cpu::Cpu;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;
use std::rc::Rc;

/// Programs get a generous budget before the host calls it a runaway.
pub const STEP_BUDGET: u64 = 100_000_000;

/// How many steps run between polls of stdin, so interactive programs see
/// their input without starving the host.
pub const YIELD_INTERVAL: u64 = 1_000;

/// Load a program from disk: `.asm` sources are assembled, anything else is
/// a raw binary image placed at the reset origin.
pub fn load_file(path: &Path) -> Result<Program, String> {
    let is_asm = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("asm"))
        .unwrap_or(false);
    if is_asm {
        let text = fs::read_to_string(path)
            .map_err(|err| format!("unable to read {}: {}", path.display(), err))?;
        Assembler::new(&text)
            .assemble(RESET_PC)
            .map_err(|err| err.nice_message().to_string())
    } else {
        let bytes = fs::read(path)
            .map_err(|err| format!("unable to read {}: {}", path.display(), err))?;
        Ok(Program {
            start: RESET_PC,
            segments: vec![Segment {
                addr: RESET_PC,
                bytes,
            }],
        })
    }
}

pub struct RunOutcome {
    pub steps: u64,
    pub halted: bool,
    /// Set when the machine halted in the backstop handler with a fault
    /// code still in R0.
    pub fault: Option<u8>,
}

/// Step to halt or budget exhaustion. Output bytes go straight to stdout;
/// pending stdin bytes are drained into the input queue between bursts.
pub fn run_machine(cpu: &mut Cpu) -> RunOutcome {
    let input_queue: Rc<RefCell<VecDeque<u8>>> = Rc::new(RefCell::new(VecDeque::new()));
    let queue = input_queue.clone();
    cpu.on_char_input =
        Some(Box::new(move || queue.borrow_mut().pop_front().unwrap_or(0)));
    cpu.on_char_output = Some(Box::new(|byte| {
        let mut stdout = io::stdout();
        let _ = stdout.write_all(&[byte]);
        let _ = stdout.flush();
    }));

    let mut keys = termion::async_stdin().bytes();
    let mut steps = 0;
    while steps < STEP_BUDGET && !cpu.halted {
        steps += cpu.run(YIELD_INTERVAL.min(STEP_BUDGET - steps));
        while let Some(Ok(byte)) = keys.next() {
            input_queue.borrow_mut().push_back(byte);
        }
    }
    cpu.on_char_input = None;
    cpu.on_char_output = None;

    let fault = detect_fault(cpu);
    RunOutcome {
        steps,
        halted: cpu.halted,
        fault,
    }
}

/// An untrapped fault parks the machine in the backstop handler with the
/// code in R0; that is the only way the host observes one.
fn detect_fault(cpu: &Cpu) -> Option<u8> {
    if cpu.halted
        && cpu.pc == reserved::BACKSTOP_HANDLER
        && (0x01..=0x0f).contains(&cpu.registers[0])
    {
        Some(cpu.registers[0])
    } else {
        None
    }
}

/// Load and run to halt. Exit code 0 on a clean halt, 1 on an assembly
/// error, a surfaced fault, or an exhausted step budget.
pub fn run_file(path: &Path) -> i32 {
    let program = match load_file(path) {
        Ok(program) => program,
        Err(error) => {
            eprintln!("{}", error);
            return 1;
        }
    };
    let mut cpu = Cpu::new();
    cpu.load(&program);
    cpu.pc = program.start;

    let outcome = run_machine(&mut cpu);
    if let Some(code) = outcome.fault {
        eprintln!(
            "{}",
            format!(
                "fault {:#04x} reached the backstop handler after {} steps",
                code, outcome.steps
            )
            .bright_red()
        );
        return 1;
    }
    if !outcome.halted {
        eprintln!(
            "{}",
            format!("program did not halt within {} steps", outcome.steps).bright_red()
        );
        return 1;
    }
    0
}
