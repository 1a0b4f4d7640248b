use crate::constants::FaultCode;
use crate::cpu::Cpu;

/// Add
/// Function: Rx := Rx + Ry
/// Flags: Z C N
pub fn add(cpu: &mut Cpu, x: usize, y: usize) {
    let raw = cpu.registers[x] as u16 + cpu.registers[y] as u16;
    cpu.carry = raw > 0xff;
    let result = (raw & 0xff) as u8;
    cpu.registers[x] = result;
    cpu.set_zero_negative(result);
    cpu.advance_pc();
}

/// Add with carry
/// Function: Rx := Rx + Ry + C
/// Flags: Z C N
pub fn adc(cpu: &mut Cpu, x: usize, y: usize) {
    let carry_in = if cpu.carry { 1 } else { 0 };
    let raw = cpu.registers[x] as u16 + cpu.registers[y] as u16 + carry_in;
    cpu.carry = raw > 0xff;
    let result = (raw & 0xff) as u8;
    cpu.registers[x] = result;
    cpu.set_zero_negative(result);
    cpu.advance_pc();
}

/// Subtract
/// Function: Rx := Rx - Ry, C set on borrow
/// Flags: Z C N
pub fn sub(cpu: &mut Cpu, x: usize, y: usize) {
    let minuend = cpu.registers[x];
    let subtrahend = cpu.registers[y];
    cpu.carry = subtrahend > minuend;
    let result = minuend.wrapping_sub(subtrahend);
    cpu.registers[x] = result;
    cpu.set_zero_negative(result);
    cpu.advance_pc();
}

/// Subtract with borrow
/// Function: Rx := Rx - Ry - C
/// Flags: Z C N
pub fn sbc(cpu: &mut Cpu, x: usize, y: usize) {
    let minuend = cpu.registers[x];
    let subtrahend = cpu.registers[y];
    let borrow_in = if cpu.carry { 1u8 } else { 0 };
    cpu.carry = subtrahend as u16 + borrow_in as u16 > minuend as u16;
    let result = minuend.wrapping_sub(subtrahend).wrapping_sub(borrow_in);
    cpu.registers[x] = result;
    cpu.set_zero_negative(result);
    cpu.advance_pc();
}

/// Increment
/// Function: Rx := Rx + 1, C set on wrap $FF -> $00
/// Flags: Z C N
pub fn inc(cpu: &mut Cpu, x: usize) {
    let raw = cpu.registers[x] as u16 + 1;
    cpu.carry = raw > 0xff;
    let result = (raw & 0xff) as u8;
    cpu.registers[x] = result;
    cpu.set_zero_negative(result);
    cpu.advance_pc();
}

/// Decrement
/// Function: Rx := Rx - 1, C set on borrow ($00 -> $FF)
/// Flags: Z C N
pub fn dec(cpu: &mut Cpu, x: usize) {
    cpu.carry = cpu.registers[x] == 0;
    let result = cpu.registers[x].wrapping_sub(1);
    cpu.registers[x] = result;
    cpu.set_zero_negative(result);
    cpu.advance_pc();
}

/// Compare
/// Function: Rx - Ry, flags only
/// Flags: Z C N
pub fn cmp(cpu: &mut Cpu, x: usize, y: usize) {
    let minuend = cpu.registers[x];
    let subtrahend = cpu.registers[y];
    cpu.carry = subtrahend > minuend;
    let result = minuend.wrapping_sub(subtrahend);
    cpu.set_zero_negative(result);
    cpu.advance_pc();
}

/// Multiply
/// Function: Rx:Rx+1 := Rx * Ry, the 16-bit product high byte first
/// Flags: Z C N (N from bit 7 of the low byte)
pub fn mul(cpu: &mut Cpu, x: usize, y: usize) {
    let raw = cpu.registers[x] as u16 * cpu.registers[y] as u16;
    let low = (raw & 0xff) as u8;
    cpu.registers[x] = (raw >> 8) as u8;
    cpu.registers[(x + 1) & 0x0f] = low;
    cpu.zero = raw == 0;
    cpu.carry = raw > 0xff;
    cpu.negative = low & 0b1000_0000 != 0;
    cpu.advance_pc();
}

/// Divide
/// Function: Rx := Rx / Ry, Rx+1 := Rx mod Ry; a zero divisor faults
/// Flags: Z C N (C cleared, N from bit 7 of the quotient)
pub fn div(cpu: &mut Cpu, x: usize, y: usize) {
    let divisor = cpu.registers[y];
    if divisor == 0 {
        // The PC still points at the DIV; the handler sees where.
        cpu.fault(FaultCode::DivZero);
        return;
    }
    let dividend = cpu.registers[x];
    let quotient = dividend / divisor;
    let remainder = dividend % divisor;
    cpu.registers[x] = quotient;
    cpu.registers[(x + 1) & 0x0f] = remainder;
    cpu.zero = quotient == 0;
    cpu.carry = false;
    cpu.negative = quotient & 0b1000_0000 != 0;
    cpu.advance_pc();
}
