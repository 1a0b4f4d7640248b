//! The canonical OPER-8 encoding tables. Every instruction is exactly two
//! bytes: the opcode, then one operand byte whose interpretation depends on
//! the instruction's shape.

/// How the second instruction byte is interpreted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    /// The operand byte is unused and assembles to zero.
    None,
    /// The whole second byte is an immediate value.
    Immediate,
    /// The second byte is a signed displacement relative to the next
    /// instruction, added to PC+2 when the branch is taken.
    Offset,
    /// One register index in the high nibble.
    Register,
    /// Two register indexes, `(x << 4) | y`.
    RegisterPair,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Instruction {
    NOP,
    /// LDI0..LDI15. The destination register is baked into the mnemonic, so
    /// the whole operand byte is free for the immediate.
    LDI(u8),
    // Moves
    MOV,
    SWAP,
    LOAD,
    STOR,
    LOADZ,
    STORZ,
    // Arithmetic
    ADD,
    ADC,
    SUB,
    SBC,
    INC,
    DEC,
    CMP,
    MUL,
    DIV,
    // Logic
    AND,
    OR,
    XOR,
    NOT,
    SHL,
    SHR,
    TEST,
    // Control flow
    JMP,
    JMPL,
    JZ,
    JNZ,
    JC,
    JNC,
    JN,
    CALL,
    CALLL,
    RET,
    // Stack
    PUSH,
    POP,
    // Character I/O
    PRINT,
    INPUT,
    HLT,
}

impl Instruction {
    pub fn op_code(&self) -> u8 {
        match self {
            Instruction::NOP => 0x00,
            Instruction::LDI(register) => 0x10 | (register & 0x0f),
            Instruction::MOV => 0x20,
            Instruction::SWAP => 0x21,
            Instruction::LOAD => 0x22,
            Instruction::STOR => 0x23,
            Instruction::LOADZ => 0x24,
            Instruction::STORZ => 0x25,
            Instruction::ADD => 0x30,
            Instruction::ADC => 0x31,
            Instruction::SUB => 0x32,
            Instruction::SBC => 0x33,
            Instruction::INC => 0x34,
            Instruction::DEC => 0x35,
            Instruction::CMP => 0x36,
            Instruction::MUL => 0x37,
            Instruction::DIV => 0x38,
            Instruction::AND => 0x40,
            Instruction::OR => 0x41,
            Instruction::XOR => 0x42,
            Instruction::NOT => 0x43,
            Instruction::SHL => 0x44,
            Instruction::SHR => 0x45,
            Instruction::TEST => 0x46,
            Instruction::JMP => 0x50,
            Instruction::JMPL => 0x51,
            Instruction::JZ => 0x52,
            Instruction::JNZ => 0x53,
            Instruction::JC => 0x54,
            Instruction::JNC => 0x55,
            Instruction::JN => 0x56,
            Instruction::CALL => 0x57,
            Instruction::CALLL => 0x58,
            Instruction::RET => 0x59,
            Instruction::PUSH => 0x60,
            Instruction::POP => 0x61,
            Instruction::PRINT => 0x70,
            Instruction::INPUT => 0x71,
            Instruction::HLT => 0xff,
        }
    }

    pub fn shape(&self) -> Shape {
        match self {
            Instruction::NOP | Instruction::RET | Instruction::HLT => Shape::None,
            Instruction::LDI(_) | Instruction::LOADZ | Instruction::STORZ => {
                Shape::Immediate
            }
            Instruction::JMP
            | Instruction::JZ
            | Instruction::JNZ
            | Instruction::JC
            | Instruction::JNC
            | Instruction::JN
            | Instruction::CALL => Shape::Offset,
            Instruction::INC
            | Instruction::DEC
            | Instruction::NOT
            | Instruction::SHL
            | Instruction::SHR
            | Instruction::PRINT
            | Instruction::INPUT => Shape::Register,
            Instruction::MOV
            | Instruction::SWAP
            | Instruction::LOAD
            | Instruction::STOR
            | Instruction::ADD
            | Instruction::ADC
            | Instruction::SUB
            | Instruction::SBC
            | Instruction::CMP
            | Instruction::MUL
            | Instruction::DIV
            | Instruction::AND
            | Instruction::OR
            | Instruction::XOR
            | Instruction::TEST
            | Instruction::JMPL
            | Instruction::CALLL
            | Instruction::PUSH
            | Instruction::POP => Shape::RegisterPair,
        }
    }

    /// The canonical upper-case mnemonic.
    pub fn mnemonic(&self) -> String {
        match self {
            Instruction::NOP => "NOP".to_string(),
            Instruction::LDI(register) => format!("LDI{}", register),
            Instruction::MOV => "MOV".to_string(),
            Instruction::SWAP => "SWAP".to_string(),
            Instruction::LOAD => "LOAD".to_string(),
            Instruction::STOR => "STOR".to_string(),
            Instruction::LOADZ => "LOADZ".to_string(),
            Instruction::STORZ => "STORZ".to_string(),
            Instruction::ADD => "ADD".to_string(),
            Instruction::ADC => "ADC".to_string(),
            Instruction::SUB => "SUB".to_string(),
            Instruction::SBC => "SBC".to_string(),
            Instruction::INC => "INC".to_string(),
            Instruction::DEC => "DEC".to_string(),
            Instruction::CMP => "CMP".to_string(),
            Instruction::MUL => "MUL".to_string(),
            Instruction::DIV => "DIV".to_string(),
            Instruction::AND => "AND".to_string(),
            Instruction::OR => "OR".to_string(),
            Instruction::XOR => "XOR".to_string(),
            Instruction::NOT => "NOT".to_string(),
            Instruction::SHL => "SHL".to_string(),
            Instruction::SHR => "SHR".to_string(),
            Instruction::TEST => "TEST".to_string(),
            Instruction::JMP => "JMP".to_string(),
            Instruction::JMPL => "JMPL".to_string(),
            Instruction::JZ => "JZ".to_string(),
            Instruction::JNZ => "JNZ".to_string(),
            Instruction::JC => "JC".to_string(),
            Instruction::JNC => "JNC".to_string(),
            Instruction::JN => "JN".to_string(),
            Instruction::CALL => "CALL".to_string(),
            Instruction::CALLL => "CALLL".to_string(),
            Instruction::RET => "RET".to_string(),
            Instruction::PUSH => "PUSH".to_string(),
            Instruction::POP => "POP".to_string(),
            Instruction::PRINT => "PRINT".to_string(),
            Instruction::INPUT => "INPUT".to_string(),
            Instruction::HLT => "HLT".to_string(),
        }
    }

    /// True for the seven mnemonics that take a PC-relative displacement, and
    /// therefore resolve a bare label operand to an offset rather than an
    /// absolute address.
    pub fn is_relative_branch(&self) -> bool {
        matches!(
            self,
            Instruction::JMP
                | Instruction::JZ
                | Instruction::JNZ
                | Instruction::JC
                | Instruction::JNC
                | Instruction::JN
                | Instruction::CALL
        )
    }
}

pub fn match_instruction(string: &str) -> Option<Instruction> {
    let folded = string.to_uppercase();
    // LDI0..LDI15 are sixteen distinct mnemonics sharing a prefix.
    if let Some(suffix) = folded.strip_prefix("LDI") {
        return match suffix.parse::<u8>() {
            Ok(register) if register < 16 => Some(Instruction::LDI(register)),
            _ => None,
        };
    }
    let instruction = match folded.as_str() {
        "NOP" => Instruction::NOP,
        "MOV" => Instruction::MOV,
        "SWAP" => Instruction::SWAP,
        "LOAD" => Instruction::LOAD,
        "STOR" => Instruction::STOR,
        "LOADZ" => Instruction::LOADZ,
        "STORZ" => Instruction::STORZ,
        "ADD" => Instruction::ADD,
        "ADC" => Instruction::ADC,
        "SUB" => Instruction::SUB,
        "SBC" => Instruction::SBC,
        "INC" => Instruction::INC,
        "DEC" => Instruction::DEC,
        "CMP" => Instruction::CMP,
        "MUL" => Instruction::MUL,
        "DIV" => Instruction::DIV,
        "AND" => Instruction::AND,
        "OR" => Instruction::OR,
        "XOR" => Instruction::XOR,
        "NOT" => Instruction::NOT,
        "SHL" => Instruction::SHL,
        "SHR" => Instruction::SHR,
        "TEST" => Instruction::TEST,
        "JMP" => Instruction::JMP,
        "JMPL" => Instruction::JMPL,
        "JZ" => Instruction::JZ,
        "JNZ" => Instruction::JNZ,
        "JC" => Instruction::JC,
        "JNC" => Instruction::JNC,
        "JN" => Instruction::JN,
        "CALL" => Instruction::CALL,
        "CALLL" => Instruction::CALLL,
        "RET" => Instruction::RET,
        "PUSH" => Instruction::PUSH,
        "POP" => Instruction::POP,
        "PRINT" => Instruction::PRINT,
        "INPUT" => Instruction::INPUT,
        "HLT" => Instruction::HLT,
        _ => return None,
    };
    Some(instruction)
}

pub fn instruction_from_op_code(op: u8) -> Option<Instruction> {
    let instruction = match op {
        0x00 => Instruction::NOP,
        0x10..=0x1f => Instruction::LDI(op & 0x0f),
        0x20 => Instruction::MOV,
        0x21 => Instruction::SWAP,
        0x22 => Instruction::LOAD,
        0x23 => Instruction::STOR,
        0x24 => Instruction::LOADZ,
        0x25 => Instruction::STORZ,
        0x30 => Instruction::ADD,
        0x31 => Instruction::ADC,
        0x32 => Instruction::SUB,
        0x33 => Instruction::SBC,
        0x34 => Instruction::INC,
        0x35 => Instruction::DEC,
        0x36 => Instruction::CMP,
        0x37 => Instruction::MUL,
        0x38 => Instruction::DIV,
        0x40 => Instruction::AND,
        0x41 => Instruction::OR,
        0x42 => Instruction::XOR,
        0x43 => Instruction::NOT,
        0x44 => Instruction::SHL,
        0x45 => Instruction::SHR,
        0x46 => Instruction::TEST,
        0x50 => Instruction::JMP,
        0x51 => Instruction::JMPL,
        0x52 => Instruction::JZ,
        0x53 => Instruction::JNZ,
        0x54 => Instruction::JC,
        0x55 => Instruction::JNC,
        0x56 => Instruction::JN,
        0x57 => Instruction::CALL,
        0x58 => Instruction::CALLL,
        0x59 => Instruction::RET,
        0x60 => Instruction::PUSH,
        0x61 => Instruction::POP,
        0x70 => Instruction::PRINT,
        0x71 => Instruction::INPUT,
        0xff => Instruction::HLT,
        _ => return None,
    };
    Some(instruction)
}

/// Render one decoded instruction. The function is total: opcodes outside the
/// table come back as `??? [$oo $pp]` rather than an error.
pub fn disassemble(op: u8, arg: u8) -> String {
    let instruction = match instruction_from_op_code(op) {
        Some(instruction) => instruction,
        None => return format!("??? [${:02X} ${:02X}]", op, arg),
    };
    let mnemonic = instruction.mnemonic();
    match instruction.shape() {
        Shape::None => mnemonic,
        Shape::Immediate => format!("{} ${:02X}", mnemonic, arg),
        Shape::Offset => format!("{} {:+}", mnemonic, arg as i8),
        Shape::Register => format!("{} R{}", mnemonic, arg >> 4),
        Shape::RegisterPair => format!("{} R{}, R{}", mnemonic, arg >> 4, arg & 0x0f),
    }
}

/// Every instruction in the canonical table, in opcode order. Handy for
/// exhaustive round-trip checks and for the REPL's mnemonic listing.
pub fn all_instructions() -> Vec<Instruction> {
    let mut instructions = vec![Instruction::NOP];
    for register in 0..16 {
        instructions.push(Instruction::LDI(register));
    }
    instructions.extend_from_slice(&[
        Instruction::MOV,
        Instruction::SWAP,
        Instruction::LOAD,
        Instruction::STOR,
        Instruction::LOADZ,
        Instruction::STORZ,
        Instruction::ADD,
        Instruction::ADC,
        Instruction::SUB,
        Instruction::SBC,
        Instruction::INC,
        Instruction::DEC,
        Instruction::CMP,
        Instruction::MUL,
        Instruction::DIV,
        Instruction::AND,
        Instruction::OR,
        Instruction::XOR,
        Instruction::NOT,
        Instruction::SHL,
        Instruction::SHR,
        Instruction::TEST,
        Instruction::JMP,
        Instruction::JMPL,
        Instruction::JZ,
        Instruction::JNZ,
        Instruction::JC,
        Instruction::JNC,
        Instruction::JN,
        Instruction::CALL,
        Instruction::CALLL,
        Instruction::RET,
        Instruction::PUSH,
        Instruction::POP,
        Instruction::PRINT,
        Instruction::INPUT,
        Instruction::HLT,
    ]);
    instructions
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn op_codes_round_trip_through_the_decoder() {
        for instruction in all_instructions() {
            assert_eq!(
                instruction_from_op_code(instruction.op_code()),
                Some(instruction),
                "opcode {:#04x}",
                instruction.op_code()
            );
        }
    }

    #[test]
    fn mnemonics_round_trip_through_the_matcher() {
        for instruction in all_instructions() {
            assert_eq!(
                match_instruction(&instruction.mnemonic()),
                Some(instruction)
            );
            // The matcher is case-insensitive.
            assert_eq!(
                match_instruction(&instruction.mnemonic().to_lowercase()),
                Some(instruction)
            );
        }
    }

    #[test]
    fn ldi_mnemonics_are_bounds_checked() {
        assert_eq!(match_instruction("LDI0"), Some(Instruction::LDI(0)));
        assert_eq!(match_instruction("ldi15"), Some(Instruction::LDI(15)));
        assert_eq!(match_instruction("LDI16"), None);
        assert_eq!(match_instruction("LDI"), None);
        assert_eq!(match_instruction("LDIA"), None);
    }

    #[test]
    fn disassembles_each_operand_shape() {
        assert_eq!(disassemble(0x00, 0x00), "NOP");
        assert_eq!(disassemble(0x13, 0x48), "LDI3 $48");
        assert_eq!(disassemble(0x20, 0x3a), "MOV R3, R10");
        assert_eq!(disassemble(0x34, 0xf0), "INC R15");
        assert_eq!(disassemble(0x50, 0x04), "JMP +4");
        assert_eq!(disassemble(0x52, 0xfe), "JZ -2");
        assert_eq!(disassemble(0x24, 0xfa), "LOADZ $FA");
        assert_eq!(disassemble(0xff, 0xff), "HLT");
    }

    #[test]
    fn unknown_op_codes_render_as_raw_bytes() {
        assert_eq!(disassemble(0x02, 0xab), "??? [$02 $AB]");
        assert_eq!(disassemble(0x80, 0x00), "??? [$80 $00]");
    }

    #[test]
    fn instruction_list_covers_the_whole_table_once() {
        let instructions = all_instructions();
        assert_eq!(instructions.len(), 54);
        let mut op_codes: Vec<u8> =
            instructions.iter().map(|i| i.op_code()).collect();
        op_codes.sort_unstable();
        op_codes.dedup();
        assert_eq!(op_codes.len(), instructions.len());
    }
}
