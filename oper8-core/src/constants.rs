/// The OPER-8 address space is a flat 64 KiB.
pub const MEMORY_SIZE: usize = 0x1_0000;

/// The register file holds sixteen byte-wide registers, R0..R15.
pub const REGISTER_COUNT: usize = 16;

/// Where the program counter points after a reset, and where the CLI loads
/// programs by default.
pub const RESET_PC: u16 = 0x0200;

// By convention R14:R15 form the 16-bit stack pointer, R14 holding the
// high byte. The engine itself reserves nothing; CALL/RET/PUSH/POP read
// and write these two registers.
pub const STACK_POINTER_HI: usize = 14;
pub const STACK_POINTER_LO: usize = 15;

/// Zero-page cells and the top of memory carry architectural meaning. They
/// are ordinary memory in every other respect.
pub mod reserved {
    /// The PC at the moment of a fault is saved here, big-endian.
    pub const FAULT_SAVED_PC: u16 = 0x00FC;
    /// Every fault reads its new PC from this big-endian pair.
    pub const FAULT_VECTOR: u16 = 0x00FE;
    /// Reset points the fault vector here and installs a HLT pair, so an
    /// untrapped fault halts cleanly.
    pub const BACKSTOP_HANDLER: u16 = 0xFFFE;
    /// Data stores to this cell are forwarded to the character-output
    /// callback in addition to memory.
    pub const CHAR_OUT: u16 = 0x00FA;
    /// Data loads from this cell pull from the character-input callback
    /// instead of memory.
    pub const CHAR_IN: u16 = 0x00FB;
}

/// Fault codes written to R0 on fault entry. 0x04..0x0F are reserved for
/// future architectural faults, 0x10..0xFF are available to programs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FaultCode {
    InvalidOpcode = 0x01,
    DivZero = 0x02,
    MisalignedPc = 0x03,
}
