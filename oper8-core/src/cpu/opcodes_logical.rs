use crate::cpu::Cpu;

/// Bitwise and
/// Function: Rx := Rx & Ry
/// Flags: Z N, C cleared
pub fn and(cpu: &mut Cpu, x: usize, y: usize) {
    let result = cpu.registers[x] & cpu.registers[y];
    cpu.registers[x] = result;
    cpu.set_zero_negative(result);
    cpu.carry = false;
    cpu.advance_pc();
}

/// Bitwise or
/// Function: Rx := Rx | Ry
/// Flags: Z N, C cleared
pub fn or(cpu: &mut Cpu, x: usize, y: usize) {
    let result = cpu.registers[x] | cpu.registers[y];
    cpu.registers[x] = result;
    cpu.set_zero_negative(result);
    cpu.carry = false;
    cpu.advance_pc();
}

/// Bitwise exclusive or
/// Function: Rx := Rx ^ Ry
/// Flags: Z N, C cleared
pub fn xor(cpu: &mut Cpu, x: usize, y: usize) {
    let result = cpu.registers[x] ^ cpu.registers[y];
    cpu.registers[x] = result;
    cpu.set_zero_negative(result);
    cpu.carry = false;
    cpu.advance_pc();
}

/// Bitwise complement
/// Function: Rx := ~Rx
/// Flags: Z N, C cleared
pub fn not(cpu: &mut Cpu, x: usize) {
    let result = !cpu.registers[x];
    cpu.registers[x] = result;
    cpu.set_zero_negative(result);
    cpu.carry = false;
    cpu.advance_pc();
}

/// Shift left through carry
/// Function: Rx := (Rx << 1) | C, C := old bit 7
/// Flags: Z C N
pub fn shl(cpu: &mut Cpu, x: usize) {
    let value = cpu.registers[x];
    let carry_in = if cpu.carry { 1 } else { 0 };
    let result = (value << 1) | carry_in;
    cpu.carry = value & 0b1000_0000 != 0;
    cpu.registers[x] = result;
    cpu.set_zero_negative(result);
    cpu.advance_pc();
}

/// Shift right through carry
/// Function: Rx := (Rx >> 1) | (C << 7), C := old bit 0
/// Flags: Z C N (the new bit 7 is the old C, so N mirrors it)
pub fn shr(cpu: &mut Cpu, x: usize) {
    let value = cpu.registers[x];
    let carry_in = if cpu.carry { 0b1000_0000 } else { 0 };
    let result = (value >> 1) | carry_in;
    cpu.carry = value & 1 != 0;
    cpu.registers[x] = result;
    cpu.set_zero_negative(result);
    cpu.advance_pc();
}

/// Bit test
/// Function: Rx & Ry, flags only
/// Flags: Z N, C preserved
pub fn test(cpu: &mut Cpu, x: usize, y: usize) {
    let result = cpu.registers[x] & cpu.registers[y];
    cpu.set_zero_negative(result);
    cpu.advance_pc();
}
