mod debugger;
mod repl;
mod run;

use colored::*;
use oper8_core::harness;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use structopt::clap::ErrorKind;
use structopt::StructOpt;

/// The OPER-8 fantasy CPU toolchain: assembler, interpreter, interactive
/// REPL, and single-step test harness.
#[derive(StructOpt)]
#[structopt(name = "oper8")]
struct Opt {
    /// A program to run: .asm sources are assembled, anything else loads as
    /// a raw binary at 0x0200
    #[structopt(parse(from_os_str))]
    path: Option<PathBuf>,

    /// Start an interactive REPL, optionally with the program preloaded
    #[structopt(short = "i", long = "interactive")]
    interactive: bool,

    /// Single-step the program with a state dump between instructions
    #[structopt(short = "d", long = "debug")]
    debug: bool,

    /// Run one single-step test, e.g. "R0:05 R1:00 ; DIV R0, R1 ; R0:02"
    #[structopt(long = "ss", value_name = "test")]
    single_step: Option<String>,

    /// Run every single-step test in a line-oriented file
    #[structopt(short = "t", long = "test", value_name = "file", parse(from_os_str))]
    test_file: Option<PathBuf>,
}

fn main() {
    let opt = match Opt::from_iter_safe(std::env::args()) {
        Ok(opt) => opt,
        Err(err) => match err.kind {
            ErrorKind::HelpDisplayed | ErrorKind::VersionDisplayed => {
                println!("{}", err.message);
                process::exit(0);
            }
            _ => {
                eprintln!("{}", err.message);
                process::exit(2);
            }
        },
    };
    process::exit(dispatch(&opt));
}

fn dispatch(opt: &Opt) -> i32 {
    if let Some(test) = &opt.single_step {
        return run_single_step_test(test);
    }
    if let Some(path) = &opt.test_file {
        return run_test_file(path);
    }
    if opt.interactive {
        return repl::start(opt.path.as_deref());
    }
    if opt.debug {
        return match &opt.path {
            Some(path) => debugger::start(path),
            None => {
                eprintln!("debug mode expects a program path");
                2
            }
        };
    }
    match &opt.path {
        Some(path) => run::run_file(path),
        None => {
            eprintln!("nothing to do, try --help");
            2
        }
    }
}

fn run_single_step_test(test: &str) -> i32 {
    match harness::run_test(test) {
        Ok(mismatches) => {
            if mismatches.is_empty() {
                println!("{}", "pass".green());
                0
            } else {
                println!("{} {}", "FAIL".bright_red().bold(), test);
                print!("{}", harness::render_mismatches(&mismatches));
                1
            }
        }
        Err(error) => {
            eprintln!("{}", error.bright_red());
            1
        }
    }
}

fn run_test_file(path: &Path) -> i32 {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            eprintln!("unable to read {}: {}", path.display(), err);
            return 1;
        }
    };
    let report = harness::run_test_file(&text);
    print!("{}", report.render());
    if report.all_passed() {
        0
    } else {
        1
    }
}
