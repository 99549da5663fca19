use std::fmt::Write;

use crate::chunk::*;

/// Render every instruction of `chunk` under a `== name ==` header.
pub fn disassemble_chunk(chunk: &Chunk, name: &str) -> String {
    let mut out = format!("== {} ==\n", name);
    let mut offset = 0;
    while offset < chunk.len() {
        let (line, next) = disassemble_instruction(chunk, offset);
        out.push_str(&line);
        out.push('\n');
        offset = next;
    }
    out
}

/// Render the instruction at `offset`; returns the text and the offset of the
/// following instruction.
pub fn disassemble_instruction(chunk: &Chunk, offset: usize) -> (String, usize) {
    let mut out = format!("{:04} ", offset);

    let line = chunk.line_for(offset);
    if offset > 0 && line == chunk.line_for(offset - 1) {
        out.push_str("   | ");
    } else {
        let _ = write!(out, "{:>4} ", line.unwrap_or(0));
    }

    let Some(&op) = chunk.code().get(offset) else {
        out.push_str("<end of code>");
        return (out, offset + 1);
    };

    let next = match op {
        OP_CONSTANT => {
            let index = chunk.code().get(offset + 1).map(|b| *b as usize);
            constant_instruction(&mut out, "OP_CONSTANT", chunk, index);
            offset + 2
        }
        OP_CONSTANT_LONG => {
            let index = chunk.read_u24(offset + 1);
            constant_instruction(&mut out, "OP_CONSTANT_LONG", chunk, index);
            offset + 4
        }
        _ => match opcode_name(op) {
            Some(name) => {
                out.push_str(name);
                offset + 1
            }
            None => {
                let _ = write!(out, "Unknown opcode {}", op);
                offset + 1
            }
        },
    };
    (out, next)
}

fn constant_instruction(out: &mut String, name: &str, chunk: &Chunk, index: Option<usize>) {
    let Some(index) = index else {
        let _ = write!(out, "{} <missing operand>", name);
        return;
    };
    match chunk.constant(index) {
        Some(value) => {
            let _ = write!(out, "{:<16} {:>4} '{}'", name, index, value);
        }
        None => {
            let _ = write!(out, "{:<16} {:>4} <bad index>", name, index);
        }
    }
}
