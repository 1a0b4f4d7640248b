//! The single-step test harness: a declarative property-checker that applies
//! preconditions to a fresh machine, executes a handful of assembled
//! instructions, and verifies postconditions.
//!
//! A test is one string of semicolon-separated groups. The first group holds
//! the preconditions, the last the postconditions, and every group between
//! them is one instruction:
//!
//! ```text
//! R0:12 R1:34 R2:56 R3:78 ; ADD R1, R3 ; ADC R0, R2 ; R0:68 R1:AC C:0
//! ```

use crate::asm::Assembler;
use crate::cpu::Cpu;
use colored::*;

/// Single-step tests assemble and execute here, away from the reset PC.
pub const TEST_ORIGIN: u16 = 0x0100;

/// One `NAME:VALUE` token. Conditions double as setters (preconditions) and
/// checkers (postconditions).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Condition {
    Register(usize, u8),
    Pc(u16),
    Zero(bool),
    Carry(bool),
    Negative(bool),
    Memory(u16, u8),
}

impl Condition {
    pub fn parse(token: &str) -> Result<Condition, String> {
        let folded = token.to_uppercase();
        let (name, value) = match folded.find(':') {
            Some(index) => (&folded[..index], &folded[index + 1..]),
            None => {
                return Err(format!(
                    "expected NAME:VALUE but found \"{}\"",
                    token
                ))
            }
        };

        if name == "PC" {
            return Ok(Condition::Pc(parse_hex_u16(value)?));
        }
        if let "Z" | "C" | "N" = name {
            let set = match value {
                "0" => false,
                "1" => true,
                _ => return Err(format!("flag value must be 0 or 1 in \"{}\"", token)),
            };
            return Ok(match name {
                "Z" => Condition::Zero(set),
                "C" => Condition::Carry(set),
                _ => Condition::Negative(set),
            });
        }
        if name.starts_with("M[") && name.ends_with(']') {
            let addr = parse_hex_u16(&name[2..name.len() - 1])?;
            return Ok(Condition::Memory(addr, parse_hex_u8(value)?));
        }
        if let Some(digits) = name.strip_prefix('R') {
            match digits.parse::<usize>() {
                Ok(register) if register < 16 => {
                    return Ok(Condition::Register(register, parse_hex_u8(value)?));
                }
                _ => {}
            }
        }
        Err(format!("unknown condition \"{}\"", token))
    }

    fn apply(&self, cpu: &mut Cpu) {
        match *self {
            Condition::Register(register, value) => cpu.registers[register] = value,
            Condition::Pc(value) => cpu.pc = value,
            Condition::Zero(value) => cpu.zero = value,
            Condition::Carry(value) => cpu.carry = value,
            Condition::Negative(value) => cpu.negative = value,
            Condition::Memory(addr, value) => cpu.write_u8(addr, value),
        }
    }

    fn check(&self, cpu: &Cpu) -> Option<Mismatch> {
        let (label, expected, actual) = match *self {
            Condition::Register(register, value) => (
                format!("R{}", register),
                format!("{:02X}", value),
                format!("{:02X}", cpu.registers[register]),
            ),
            Condition::Pc(value) => (
                "PC".to_string(),
                format!("{:04X}", value),
                format!("{:04X}", cpu.pc),
            ),
            Condition::Zero(value) => flag_strings("Z", value, cpu.zero),
            Condition::Carry(value) => flag_strings("C", value, cpu.carry),
            Condition::Negative(value) => flag_strings("N", value, cpu.negative),
            Condition::Memory(addr, value) => (
                format!("M[{:04X}]", addr),
                format!("{:02X}", value),
                format!("{:02X}", cpu.read_u8(addr)),
            ),
        };
        if expected == actual {
            None
        } else {
            Some(Mismatch {
                condition: label,
                expected,
                actual,
            })
        }
    }
}

fn flag_strings(name: &str, expected: bool, actual: bool) -> (String, String, String) {
    (
        name.to_string(),
        if expected { "1" } else { "0" }.to_string(),
        if actual { "1" } else { "0" }.to_string(),
    )
}

fn parse_hex_u8(digits: &str) -> Result<u8, String> {
    u8::from_str_radix(digits, 16)
        .map_err(|_| format!("malformed hex byte \"{}\"", digits))
}

fn parse_hex_u16(digits: &str) -> Result<u16, String> {
    u16::from_str_radix(digits, 16)
        .map_err(|_| format!("malformed hex address \"{}\"", digits))
}

/// One postcondition that did not hold.
#[derive(Debug, Clone, PartialEq)]
pub struct Mismatch {
    pub condition: String,
    pub expected: String,
    pub actual: String,
}

pub struct SingleStepTest {
    pub preconditions: Vec<Condition>,
    pub instructions: Vec<String>,
    pub postconditions: Vec<Condition>,
}

impl SingleStepTest {
    pub fn parse(text: &str) -> Result<SingleStepTest, String> {
        let groups: Vec<&str> = text.split(';').collect();
        if groups.len() < 3 {
            return Err(
                "expected \"preconditions ; instructions ; postconditions\"".to_string()
            );
        }
        let preconditions = parse_conditions(groups[0])?;
        let postconditions = parse_conditions(groups[groups.len() - 1])?;
        let instructions: Vec<String> = groups[1..groups.len() - 1]
            .iter()
            .map(|group| group.trim().to_string())
            .filter(|group| !group.is_empty())
            .collect();
        if instructions.is_empty() {
            return Err("expected at least one instruction".to_string());
        }
        Ok(SingleStepTest {
            preconditions,
            instructions,
            postconditions,
        })
    }

    /// Build a fresh machine, apply the preconditions, execute one step per
    /// instruction, and collect every postcondition that fails to hold. An
    /// assembly error aborts the test instead.
    pub fn run(&self) -> Result<Vec<Mismatch>, String> {
        let mut cpu = Cpu::new();
        for condition in &self.preconditions {
            condition.apply(&mut cpu);
        }

        let source = self.instructions.join("\n");
        let program = Assembler::new(&source)
            .assemble(TEST_ORIGIN)
            .map_err(|err| err.to_string())?;
        cpu.load(&program);
        cpu.pc = TEST_ORIGIN;

        for _ in 0..self.instructions.len() {
            cpu.step();
        }

        Ok(self
            .postconditions
            .iter()
            .filter_map(|condition| condition.check(&cpu))
            .collect())
    }
}

fn parse_conditions(group: &str) -> Result<Vec<Condition>, String> {
    group.split_whitespace().map(Condition::parse).collect()
}

/// Parse and run one test string. Ok holds the mismatches, empty on a pass.
pub fn run_test(text: &str) -> Result<Vec<Mismatch>, String> {
    SingleStepTest::parse(text)?.run()
}

pub fn render_mismatches(mismatches: &[Mismatch]) -> String {
    let mut out = String::new();
    for mismatch in mismatches {
        out.push_str(&format!(
            "  expected {} to be {} but it was {}\n",
            mismatch.condition.bold(),
            mismatch.expected.green(),
            mismatch.actual.bright_red()
        ));
    }
    out
}

/// One line of a test file that did not pass.
pub struct FailedTest {
    pub line: usize,
    pub text: String,
    /// Set when the test never ran (parse or assembly problem).
    pub error: Option<String>,
    pub mismatches: Vec<Mismatch>,
}

pub struct FileReport {
    pub passed: usize,
    pub failures: Vec<FailedTest>,
}

impl FileReport {
    pub fn all_passed(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn total(&self) -> usize {
        self.passed + self.failures.len()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for failure in &self.failures {
            out.push_str(&format!(
                "{} line {}: {}\n",
                "FAIL".bright_red().bold(),
                failure.line,
                failure.text
            ));
            if let Some(error) = &failure.error {
                out.push_str(&format!("  {}\n", error.bright_red()));
            }
            out.push_str(&render_mismatches(&failure.mismatches));
        }
        let summary = format!("{} of {} tests passed", self.passed, self.total());
        if self.all_passed() {
            out.push_str(&format!("{}\n", summary.green()));
        } else {
            out.push_str(&format!("{}\n", summary.bright_red()));
        }
        out
    }
}

/// Run every test in a line-oriented file. Blank lines and `//` comments are
/// skipped; a line that fails to parse counts as a failed test.
pub fn run_test_file(text: &str) -> FileReport {
    let mut report = FileReport {
        passed: 0,
        failures: Vec::new(),
    };
    for (index, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with("//") {
            continue;
        }
        match run_test(line) {
            Ok(mismatches) => {
                if mismatches.is_empty() {
                    report.passed += 1;
                } else {
                    report.failures.push(FailedTest {
                        line: index + 1,
                        text: line.to_string(),
                        error: None,
                        mismatches,
                    });
                }
            }
            Err(error) => {
                report.failures.push(FailedTest {
                    line: index + 1,
                    text: line.to_string(),
                    error: Some(error),
                    mismatches: Vec::new(),
                });
            }
        }
    }
    report
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_the_three_groups() {
        let test =
            SingleStepTest::parse("R0:05 Z:1 ; INC R0 ; R0:06 Z:0").unwrap();
        assert_eq!(
            test.preconditions,
            vec![Condition::Register(0, 0x05), Condition::Zero(true)]
        );
        assert_eq!(test.instructions, vec!["INC R0".to_string()]);
        assert_eq!(
            test.postconditions,
            vec![Condition::Register(0, 0x06), Condition::Zero(false)]
        );
    }

    #[test]
    fn middle_groups_are_individual_instructions() {
        let test = SingleStepTest::parse(
            "R0:12 R1:34 R2:56 R3:78 ; ADD R1, R3 ; ADC R0, R2 ; R0:68 R1:AC C:0",
        )
        .unwrap();
        assert_eq!(test.instructions.len(), 2);
        assert!(test.run().unwrap().is_empty());
    }

    #[test]
    fn passing_test_reports_no_mismatches() {
        let mismatches = run_test("R1:02 R2:03 ; ADD R1, R2 ; R1:05 Z:0 C:0").unwrap();
        assert!(mismatches.is_empty());
    }

    #[test]
    fn every_failed_postcondition_is_reported() {
        let mismatches = run_test("R1:02 R2:03 ; ADD R1, R2 ; R1:09 Z:1").unwrap();
        assert_eq!(mismatches.len(), 2);
        assert_eq!(mismatches[0].condition, "R1");
        assert_eq!(mismatches[0].expected, "09");
        assert_eq!(mismatches[0].actual, "05");
        assert_eq!(mismatches[1].condition, "Z");
    }

    #[test]
    fn memory_and_pc_conditions() {
        let mismatches = run_test(
            "R0:AB M[0300]:00 ; LDI1 $03 ; LDI2 $00 ; STOR R0, R1 ; M[0300]:AB PC:0106",
        )
        .unwrap();
        assert!(mismatches.is_empty(), "{:?}", mismatches);
    }

    #[test]
    fn div_by_zero_lands_in_the_backstop() {
        // Spec scenario: the fault code is in R0, the faulting PC is saved to
        // the zero page, and the PC sits at the default handler.
        let mismatches = run_test(
            "R0:05 R1:00 ; DIV R0, R1 ; R0:02 M[00FC]:01 M[00FD]:00 PC:FFFE",
        )
        .unwrap();
        assert!(mismatches.is_empty(), "{:?}", mismatches);
    }

    #[test]
    fn condition_tokens_are_case_insensitive() {
        assert!(run_test("r5:7f ; inc r5 ; r5:80 n:1").unwrap().is_empty());
    }

    #[test]
    fn rejects_malformed_tests() {
        assert!(SingleStepTest::parse("R0:05").is_err());
        assert!(SingleStepTest::parse("R0:05 ; ; R0:05").is_err());
        assert!(run_test("Q9:00 ; NOP ; Z:0").is_err());
        assert!(run_test("Z:2 ; NOP ; Z:0").is_err());
        assert!(run_test("R0:00 ; FROB R1 ; R0:00").is_err());
    }

    #[test]
    fn file_runner_skips_comments_and_counts_results() {
        let report = run_test_file(
            "
// flag basics
R1:02 R2:03 ; ADD R1, R2 ; R1:05

R1:FF R2:01 ; ADD R1, R2 ; R1:00 Z:1 C:1
R1:00 ; INC R1 ; R1:02
",
        );
        assert_eq!(report.total(), 3);
        assert_eq!(report.passed, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].line, 6);
        assert!(!report.all_passed());
    }

    #[test]
    fn file_runner_counts_malformed_lines_as_failures() {
        let report = run_test_file("not a test\n");
        assert_eq!(report.total(), 1);
        assert!(report.failures[0].error.is_some());
    }
}
