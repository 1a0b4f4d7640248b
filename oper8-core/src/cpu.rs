use crate::asm::Program;
use crate::constants::{
    reserved, FaultCode, MEMORY_SIZE, REGISTER_COUNT, RESET_PC, STACK_POINTER_HI,
    STACK_POINTER_LO,
};
use crate::opcodes::{instruction_from_op_code, Instruction};

pub mod opcodes_arithmetic;
pub mod opcodes_jump;
pub mod opcodes_logical;
pub mod opcodes_move;

#[cfg(test)]
mod test_helpers;


pub type CharOutputFn = Box<dyn FnMut(u8)>;
pub type CharInputFn = Box<dyn FnMut() -> u8>;

/// What a single `step` call did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepResult {
    /// An instruction was fetched and dispatched. Fault entry counts: the
    /// machine did real work redirecting through the vector.
    Executed,
    /// The machine is halted and refused to step.
    DidNotRun,
}

/// This struct implements the OPER-8 fantasy CPU: sixteen byte-wide
/// registers, a flat 64 KiB memory, and a fixed-width 2-byte instruction
/// encoding.
pub struct Cpu {
    /// R0..R15. All arithmetic results are stored modulo 256. Nothing is
    /// architecturally reserved, though R0 receives fault codes and by
    /// convention R14:R15 form the stack pointer (R14 high).
    pub registers: [u8; REGISTER_COUNT],

    /// The flat address space. 16-bit quantities are always two consecutive
    /// bytes, high first.
    pub memory: Vec<u8>,

    /// "PC" - Program counter. Instructions are two bytes, so the PC must be
    /// even before every fetch; an odd PC faults instead of fetching.
    pub pc: u16,

    /// "Z" - set when the last flag-affecting result was zero.
    pub zero: bool,

    /// "C" - unsigned overflow on add, borrow on subtract, the shifted-out
    /// bit on shifts. Logical ops clear it, except TEST which preserves it.
    pub carry: bool,

    /// "N" - bit 7 of the last flag-affecting result.
    pub negative: bool,

    /// Set by HLT. A halted machine refuses to step until reset.
    pub halted: bool,

    /// Invoked by PRINT, and by data stores to the character-out cell.
    pub on_char_output: Option<CharOutputFn>,

    /// Polled by INPUT, and by data loads from the character-in cell. Must
    /// not block; return 0 when no byte is pending.
    pub on_char_input: Option<CharInputFn>,

    pub tick_count: u64,
}

impl Cpu {
    pub fn new() -> Cpu {
        let mut cpu = Cpu {
            registers: [0; REGISTER_COUNT],
            memory: vec![0; MEMORY_SIZE],
            pc: RESET_PC,
            zero: false,
            carry: false,
            negative: false,
            halted: false,
            on_char_output: None,
            on_char_input: None,
            tick_count: 0,
        };
        cpu.reset();
        cpu
    }

    /// Registers and memory cleared, flags down, PC at 0x0200, and the
    /// fault plumbing installed: the vector at 0x00FE points at the backstop
    /// handler, which holds a HLT pair so an untrapped fault halts cleanly.
    pub fn reset(&mut self) {
        self.registers = [0; REGISTER_COUNT];
        for byte in self.memory.iter_mut() {
            *byte = 0;
        }
        self.pc = RESET_PC;
        self.zero = false;
        self.carry = false;
        self.negative = false;
        self.halted = false;
        self.tick_count = 0;

        self.write_u16(reserved::FAULT_VECTOR, reserved::BACKSTOP_HANDLER);
        self.write_u8(reserved::BACKSTOP_HANDLER, Instruction::HLT.op_code());
        self.write_u8(
            reserved::BACKSTOP_HANDLER.wrapping_add(1),
            Instruction::HLT.op_code(),
        );
    }

    /// Copy a byte image into memory starting at `addr`. Bytes that would
    /// run past the top of memory are dropped.
    pub fn load_program(&mut self, bytes: &[u8], addr: u16) {
        let start = addr as usize;
        let len = bytes.len().min(MEMORY_SIZE - start);
        self.memory[start..start + len].copy_from_slice(&bytes[..len]);
    }

    /// Load every segment of an assembled program.
    pub fn load(&mut self, program: &Program) {
        for segment in &program.segments {
            self.load_program(&segment.bytes, segment.addr);
        }
    }

    pub fn read_u8(&self, addr: u16) -> u8 {
        self.memory[addr as usize]
    }

    pub fn write_u8(&mut self, addr: u16, value: u8) {
        self.memory[addr as usize] = value;
    }

    /// Big-endian 16-bit read from a consecutive pair.
    pub fn read_u16(&self, addr: u16) -> u16 {
        u16::from_be_bytes([self.read_u8(addr), self.read_u8(addr.wrapping_add(1))])
    }

    pub fn write_u16(&mut self, addr: u16, value: u16) {
        let [hi, lo] = value.to_be_bytes();
        self.write_u8(addr, hi);
        self.write_u8(addr.wrapping_add(1), lo);
    }

    /// A data load as issued by LOAD/LOADZ. The character-in cell pulls from
    /// the input callback instead of memory.
    pub(crate) fn data_read(&mut self, addr: u16) -> u8 {
        if addr == reserved::CHAR_IN {
            if let Some(on_char_input) = &mut self.on_char_input {
                return on_char_input();
            }
        }
        self.read_u8(addr)
    }

    /// A data store as issued by STOR/STORZ. The byte always lands in
    /// memory; the character-out cell additionally forwards it to the
    /// output callback.
    pub(crate) fn data_write(&mut self, addr: u16, value: u8) {
        self.write_u8(addr, value);
        if addr == reserved::CHAR_OUT {
            if let Some(on_char_output) = &mut self.on_char_output {
                on_char_output(value);
            }
        }
    }

    /// The 16-bit address formed from the register pair (r, r+1 mod 16),
    /// high byte in the lower-indexed register.
    pub(crate) fn register_pair_address(&self, register: usize) -> u16 {
        u16::from_be_bytes([
            self.registers[register],
            self.registers[(register + 1) & 0x0f],
        ])
    }

    pub(crate) fn stack_pointer(&self) -> u16 {
        u16::from_be_bytes([
            self.registers[STACK_POINTER_HI],
            self.registers[STACK_POINTER_LO],
        ])
    }

    pub(crate) fn set_stack_pointer(&mut self, sp: u16) {
        let [hi, lo] = sp.to_be_bytes();
        self.registers[STACK_POINTER_HI] = hi;
        self.registers[STACK_POINTER_LO] = lo;
    }

    /// These flags are commonly set together.
    pub(crate) fn set_zero_negative(&mut self, value: u8) {
        self.zero = value == 0;
        self.negative = value & 0b1000_0000 != 0;
    }

    pub(crate) fn advance_pc(&mut self) {
        self.pc = self.pc.wrapping_add(2);
    }

    /// Fault entry: the code lands in R0, the PC of the faulting instruction
    /// is saved big-endian to the zero page, and execution redirects through
    /// the fault vector. Faults are not resumable; the handler sees where
    /// the fault happened, not a way back into it.
    pub fn fault(&mut self, code: FaultCode) {
        self.fault_with_code(code as u8);
    }

    pub fn fault_with_code(&mut self, code: u8) {
        self.registers[0] = code;
        self.write_u16(reserved::FAULT_SAVED_PC, self.pc);
        self.pc = self.read_u16(reserved::FAULT_VECTOR);
    }

    /// One fetch-decode-execute cycle.
    pub fn step(&mut self) -> StepResult {
        if self.halted {
            return StepResult::DidNotRun;
        }
        self.tick_count += 1;

        if self.pc & 1 == 1 {
            self.fault(FaultCode::MisalignedPc);
            return StepResult::Executed;
        }

        let op = self.read_u8(self.pc);
        let arg = self.read_u8(self.pc.wrapping_add(1));
        let x = (arg >> 4) as usize;
        let y = (arg & 0x0f) as usize;

        let instruction = match instruction_from_op_code(op) {
            Some(instruction) => instruction,
            None => {
                // The PC is not advanced first: the handler sees the address
                // of the offending opcode.
                self.fault(FaultCode::InvalidOpcode);
                return StepResult::Executed;
            }
        };

        match instruction {
            Instruction::NOP => self.advance_pc(),
            Instruction::LDI(register) => {
                opcodes_move::ldi(self, register as usize, arg)
            }
            Instruction::MOV => opcodes_move::mov(self, x, y),
            Instruction::SWAP => opcodes_move::swap(self, x, y),
            Instruction::LOAD => opcodes_move::load(self, x, y),
            Instruction::STOR => opcodes_move::stor(self, x, y),
            Instruction::LOADZ => opcodes_move::loadz(self, arg),
            Instruction::STORZ => opcodes_move::storz(self, arg),
            Instruction::ADD => opcodes_arithmetic::add(self, x, y),
            Instruction::ADC => opcodes_arithmetic::adc(self, x, y),
            Instruction::SUB => opcodes_arithmetic::sub(self, x, y),
            Instruction::SBC => opcodes_arithmetic::sbc(self, x, y),
            Instruction::INC => opcodes_arithmetic::inc(self, x),
            Instruction::DEC => opcodes_arithmetic::dec(self, x),
            Instruction::CMP => opcodes_arithmetic::cmp(self, x, y),
            Instruction::MUL => opcodes_arithmetic::mul(self, x, y),
            Instruction::DIV => opcodes_arithmetic::div(self, x, y),
            Instruction::AND => opcodes_logical::and(self, x, y),
            Instruction::OR => opcodes_logical::or(self, x, y),
            Instruction::XOR => opcodes_logical::xor(self, x, y),
            Instruction::NOT => opcodes_logical::not(self, x),
            Instruction::SHL => opcodes_logical::shl(self, x),
            Instruction::SHR => opcodes_logical::shr(self, x),
            Instruction::TEST => opcodes_logical::test(self, x, y),
            Instruction::JMP => opcodes_jump::jmp(self, arg),
            Instruction::JMPL => opcodes_jump::jmpl(self, x, y),
            Instruction::JZ => opcodes_jump::jz(self, arg),
            Instruction::JNZ => opcodes_jump::jnz(self, arg),
            Instruction::JC => opcodes_jump::jc(self, arg),
            Instruction::JNC => opcodes_jump::jnc(self, arg),
            Instruction::JN => opcodes_jump::jn(self, arg),
            Instruction::CALL => opcodes_jump::call(self, arg),
            Instruction::CALLL => opcodes_jump::calll(self, x, y),
            Instruction::RET => opcodes_jump::ret(self),
            Instruction::PUSH => opcodes_jump::push(self, x, y),
            Instruction::POP => opcodes_jump::pop(self, x, y),
            Instruction::PRINT => opcodes_move::print(self, x),
            Instruction::INPUT => opcodes_move::input(self, x),
            // The PC stays on the HLT itself.
            Instruction::HLT => self.halted = true,
        }

        StepResult::Executed
    }

    /// Step until halted or the budget runs out. Returns how many steps
    /// actually executed.
    pub fn run(&mut self, max_steps: u64) -> u64 {
        let mut steps_taken = 0;
        while steps_taken < max_steps {
            match self.step() {
                StepResult::Executed => steps_taken += 1,
                StepResult::DidNotRun => break,
            }
        }
        steps_taken
    }
}
