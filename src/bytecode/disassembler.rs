//! Bytecode disassembler for development and debugging.

use std::fmt::Write;

use crate::bytecode::chunk::Chunk;
use crate::bytecode::opcode::OpCode;

/// Disassemble a chunk (and every function it owns) into a listing.
pub fn disassemble_chunk(chunk: &Chunk, name: &str) -> String {
    let mut output = String::new();
    write_chunk(chunk, name, &mut output);
    output
}

fn write_chunk(chunk: &Chunk, name: &str, output: &mut String) {
    writeln!(output, "== {} ==", name).unwrap();

    let mut offset = 0;
    while offset < chunk.code.len() {
        offset = disassemble_instruction(chunk, offset, output);
    }

    for function in chunk.functions() {
        writeln!(output).unwrap();
        let title = if function.name.is_empty() {
            format!("<anonymous> (arity: {})", function.arity)
        } else {
            format!("{} (arity: {})", function.name, function.arity)
        };
        write_chunk(&function.chunk, &title, output);
    }
}

/// Disassemble one instruction; returns the offset of the next one.
pub fn disassemble_instruction(chunk: &Chunk, offset: usize, output: &mut String) -> usize {
    write!(output, "{:04} ", offset).unwrap();

    // line column, with `|` when unchanged from the previous byte
    let line = chunk.line_at(offset);
    if offset > 0 && line == chunk.line_at(offset - 1) {
        write!(output, "   | ").unwrap();
    } else {
        write!(output, "{:4} ", line).unwrap();
    }

    let byte = chunk.code[offset];
    let op = match OpCode::from_u8(byte) {
        Some(op) => op,
        None => {
            writeln!(output, "Unknown opcode {}", byte).unwrap();
            return offset + 1;
        }
    };

    match op {
        // inline integers
        OpCode::ConstI8 => {
            let value = chunk.code[offset + 1] as i8;
            writeln!(output, "{:<12?} {}", op, value).unwrap();
            offset + 2
        }
        OpCode::ConstI16 => {
            let value = chunk.read_u16(offset + 1) as i16;
            writeln!(output, "{:<12?} {}", op, value).unwrap();
            offset + 3
        }

        // pool references, shown with the constant itself
        OpCode::Constant | OpCode::Closure | OpCode::GetGlobal | OpCode::SetGlobal => {
            let idx = chunk.read_u16(offset + 1);
            match chunk.constant(idx) {
                Some(value) => {
                    writeln!(output, "{:<12?} {} ({:?})", op, idx, value).unwrap()
                }
                None => writeln!(output, "{:<12?} {} (?)", op, idx).unwrap(),
            }
            offset + 3
        }

        // slot and count operands
        OpCode::GetLocal | OpCode::SetLocal | OpCode::Call | OpCode::Yarn => {
            let operand = chunk.code[offset + 1];
            writeln!(output, "{:<12?} {}", op, operand).unwrap();
            offset + 2
        }

        OpCode::Builtin => {
            let index = chunk.code[offset + 1];
            let arg_count = chunk.code[offset + 2];
            writeln!(output, "{:<12?} {} (args: {})", op, index, arg_count).unwrap();
            offset + 3
        }

        // jumps, shown with their absolute target
        OpCode::Jump | OpCode::JumpIfLie | OpCode::JumpIfTru => {
            let jump = chunk.read_u16(offset + 1) as i16;
            let target = offset as i64 + 3 + jump as i64;
            writeln!(output, "{:<12?} {} -> {}", op, jump, target).unwrap();
            offset + 3
        }

        OpCode::Loop => {
            let jump = chunk.read_u16(offset + 1) as usize;
            let target = offset + 3 - jump;
            writeln!(output, "{:<12?} {} -> {}", op, jump, target).unwrap();
            offset + 3
        }

        // everything else has no operands
        _ => {
            writeln!(output, "{:?}", op).unwrap();
            offset + 1
        }
    }
}
