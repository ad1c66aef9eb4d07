//! Bytecode instruction set for the Monkey VM
//!
//! This module defines the complete opcode catalogue plus the pure,
//! stateless encoder/decoder/disassembler around it. No state is kept here:
//! `make`/`read_operands`/`disassemble` are plain functions over byte slices,
//! consistent with the rest of the toolchain's arms-length split between
//! "what the bytes mean" (this module) and "who emits/consumes them"
//! (`compiler`, `vm`).

use std::fmt;

/// Bytecode instruction stream: one opcode byte followed by 0, 1, or 2
/// operand bytes, widths fixed per opcode (see `Definition::operand_widths`).
pub type Instructions = Vec<u8>;

/// A single bytecode opcode.
///
/// Stack-based VM instruction set. Each opcode has a fixed, known-in-advance
/// operand width (see `Definition::lookup`), so decoding never needs to
/// consult the operand values themselves.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    // === Constants & literals ===
    /// Push `Constants[operand]` onto the stack. Operand: u16 index.
    Constant = 0,
    PushTrue = 1,
    PushFalse = 2,
    PushNull = 3,

    // === Arithmetic ===
    Add = 4,
    Sub = 5,
    Mul = 6,
    Div = 7,

    // === Stack ===
    /// Discard top of stack. Emitted exactly once per expression statement.
    Pop = 8,

    // === Comparison ===
    Equal = 9,
    NotEqual = 10,
    GreaterThan = 11,

    // === Unary ===
    Minus = 12,
    Bang = 13,

    // === Control flow ===
    /// Unconditional jump. Operand: u16 absolute byte offset.
    Jump = 14,
    /// Pop the top of stack; if not truthy, jump. Operand: u16 absolute
    /// byte offset.
    JumpNotTruthy = 15,

    // === Variables ===
    GetGlobal = 16,
    SetGlobal = 17,
    /// Operand: u8 slot, relative to the current frame's base pointer.
    GetLocal = 18,
    SetLocal = 19,

    // === Aggregates ===
    /// Operand: u16 element count. Pops that many values and pushes an
    /// `Array` preserving source order.
    Array = 20,
    /// Operand: u16 `2 * pairs`. Pops that many key/value pairs and pushes
    /// a `Hash`.
    Hash = 21,
    /// Pops index, then container; pushes the indexed element (or `Null`).
    Index = 22,

    // === Calls & returns ===
    /// Operand: u8 argument count.
    Call = 23,
    ReturnValue = 24,
    Return = 25,

    // === Built-ins ===
    /// Operand: u8 index into the built-in registry.
    GetBuiltin = 26,

    // === Closures ===
    /// Operand: u16 constant-pool index of the `CompiledFunction`, then u8
    /// free-variable count.
    Closure = 27,
    /// Operand: u8 index into the executing closure's free-variable list.
    GetFree = 28,
    /// Push the currently executing closure.
    CurrentClosure = 29,
}

impl Opcode {
    pub(crate) fn from_byte(b: u8) -> Result<Opcode, String> {
        use Opcode::*;
        Ok(match b {
            0 => Constant,
            1 => PushTrue,
            2 => PushFalse,
            3 => PushNull,
            4 => Add,
            5 => Sub,
            6 => Mul,
            7 => Div,
            8 => Pop,
            9 => Equal,
            10 => NotEqual,
            11 => GreaterThan,
            12 => Minus,
            13 => Bang,
            14 => Jump,
            15 => JumpNotTruthy,
            16 => GetGlobal,
            17 => SetGlobal,
            18 => GetLocal,
            19 => SetLocal,
            20 => Array,
            21 => Hash,
            22 => Index,
            23 => Call,
            24 => ReturnValue,
            25 => Return,
            26 => GetBuiltin,
            27 => Closure,
            28 => GetFree,
            29 => CurrentClosure,
            other => return Err(format!("opcode {other} undefined")),
        })
    }
}

/// Static metadata about an opcode: its mnemonic and the byte width of each
/// of its operands, in order.
#[derive(Debug, Clone)]
pub struct Definition {
    pub name: &'static str,
    pub operand_widths: Vec<u8>,
}

/// Looks up the `Definition` for an opcode. The only way this fails is an
/// out-of-range byte reaching it, which should never happen against bytes
/// this crate itself produced.
pub fn lookup(op: u8) -> Result<Definition, String> {
    let opcode = Opcode::from_byte(op)?;
    Ok(definition(opcode))
}

fn definition(op: Opcode) -> Definition {
    use Opcode::*;
    let (name, widths): (&'static str, Vec<u8>) = match op {
        Constant => ("OpConstant", vec![2]),
        PushTrue => ("OpTrue", vec![]),
        PushFalse => ("OpFalse", vec![]),
        PushNull => ("OpNull", vec![]),
        Add => ("OpAdd", vec![]),
        Sub => ("OpSub", vec![]),
        Mul => ("OpMul", vec![]),
        Div => ("OpDiv", vec![]),
        Pop => ("OpPop", vec![]),
        Equal => ("OpEqual", vec![]),
        NotEqual => ("OpNotEqual", vec![]),
        GreaterThan => ("OpGreaterThan", vec![]),
        Minus => ("OpMinus", vec![]),
        Bang => ("OpBang", vec![]),
        Jump => ("OpJump", vec![2]),
        JumpNotTruthy => ("OpJumpNotTruthy", vec![2]),
        GetGlobal => ("OpGetGlobal", vec![2]),
        SetGlobal => ("OpSetGlobal", vec![2]),
        GetLocal => ("OpGetLocal", vec![1]),
        SetLocal => ("OpSetLocal", vec![1]),
        Array => ("OpArray", vec![2]),
        Hash => ("OpHash", vec![2]),
        Index => ("OpIndex", vec![]),
        Call => ("OpCall", vec![1]),
        ReturnValue => ("OpReturnValue", vec![]),
        Return => ("OpReturn", vec![]),
        GetBuiltin => ("OpGetBuiltin", vec![1]),
        Closure => ("OpClosure", vec![2, 1]),
        GetFree => ("OpGetFree", vec![1]),
        CurrentClosure => ("OpCurrentClosure", vec![]),
    };
    Definition {
        name,
        operand_widths: widths,
    }
}

/// Encodes one instruction. Operands are given as plain `usize`s and
/// truncated to their opcode's declared width. Called only with opcodes
/// this module defines, so there is no undefined-opcode case to report here.
pub fn make(op: Opcode, operands: &[usize]) -> Instructions {
    let def = definition(op);
    let mut instruction = Vec::with_capacity(1 + def.operand_widths.iter().map(|w| *w as usize).sum::<usize>());
    instruction.push(op as u8);

    for (operand, width) in operands.iter().zip(def.operand_widths.iter()) {
        match width {
            2 => instruction.extend_from_slice(&(*operand as u16).to_be_bytes()),
            1 => instruction.push(*operand as u8),
            other => panic!("unsupported operand width {other}"),
        }
    }

    instruction
}

pub fn read_u16(ins: &[u8]) -> u16 {
    u16::from_be_bytes([ins[0], ins[1]])
}

pub fn read_u8(ins: &[u8]) -> u8 {
    ins[0]
}

/// Decodes the operands of one instruction (sans opcode byte) per `def`.
/// Returns the decoded operands and the total number of bytes consumed.
pub fn read_operands(def: &Definition, ins: &[u8]) -> (Vec<usize>, usize) {
    let mut operands = Vec::with_capacity(def.operand_widths.len());
    let mut offset = 0;

    for width in &def.operand_widths {
        match width {
            2 => {
                operands.push(read_u16(&ins[offset..]) as usize);
                offset += 2;
            }
            1 => {
                operands.push(read_u8(&ins[offset..]) as usize);
                offset += 1;
            }
            other => panic!("unsupported operand width {other}"),
        }
    }

    (operands, offset)
}

/// Formats an entire instruction stream, one line per instruction, as
/// `%04d OpName operand…` with the byte offset as a 4-digit prefix.
pub fn disassemble(ins: &Instructions) -> String {
    use fmt::Write;
    let mut out = String::new();
    let mut i = 0;
    while i < ins.len() {
        match lookup(ins[i]) {
            Ok(def) => {
                let (operands, read) = read_operands(&def, &ins[i + 1..]);
                writeln!(out, "{:04} {}", i, fmt_instruction(&def, &operands)).unwrap();
                i += 1 + read;
            }
            Err(e) => {
                writeln!(out, "{i:04} ERROR: {e}").unwrap();
                i += 1;
            }
        }
    }
    out
}

fn fmt_instruction(def: &Definition, operands: &[usize]) -> String {
    match operands.len() {
        0 => def.name.to_string(),
        1 => format!("{} {}", def.name, operands[0]),
        2 => format!("{} {} {}", def.name, operands[0], operands[1]),
        n => format!("ERROR: unhandled operand count {n} for {}", def.name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn make_encodes_operands_big_endian() {
        let cases: Vec<(Opcode, Vec<usize>, Vec<u8>)> = vec![
            (Opcode::Constant, vec![65534], vec![Opcode::Constant as u8, 255, 254]),
            (Opcode::Add, vec![], vec![Opcode::Add as u8]),
            (Opcode::GetLocal, vec![255], vec![Opcode::GetLocal as u8, 255]),
            (
                Opcode::Closure,
                vec![65534, 255],
                vec![Opcode::Closure as u8, 255, 254, 255],
            ),
        ];
        for (op, operands, expected) in cases {
            assert_eq!(make(op, &operands), expected);
        }
    }

    #[test]
    fn make_and_read_operands_are_inverse() {
        let cases: Vec<(Opcode, Vec<usize>, usize)> = vec![
            (Opcode::Constant, vec![65535], 2),
            (Opcode::GetLocal, vec![255], 1),
            (Opcode::Closure, vec![65535, 255], 2),
        ];
        for (op, operands, bytes_read) in cases {
            let instruction = make(op, &operands);
            let def = lookup(instruction[0]).unwrap();
            let (decoded, n) = read_operands(&def, &instruction[1..]);
            assert_eq!(n, bytes_read);
            assert_eq!(decoded, operands);
        }
    }

    #[test]
    fn disassembles_a_mixed_instruction_stream() {
        let instructions: Instructions = [
            make(Opcode::Add, &[]),
            make(Opcode::GetLocal, &[1]),
            make(Opcode::Constant, &[2]),
            make(Opcode::Constant, &[65535]),
            make(Opcode::Closure, &[65535, 255]),
        ]
        .concat();

        let expected = "0000 OpAdd\n\
                         0001 OpGetLocal 1\n\
                         0003 OpConstant 2\n\
                         0006 OpConstant 65535\n\
                         0009 OpClosure 65535 255\n";

        assert_eq!(disassemble(&instructions), expected);
    }
}
