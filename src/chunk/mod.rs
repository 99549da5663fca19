use serde::Serialize;

use crate::value::Value;

pub mod buffer;
pub use buffer::Buffer;

// ── Opcodes ──────────────────────────────────────────────────────────
//
// One byte per opcode, followed by a fixed operand width:
//   CONSTANT       1 byte constant index
//   CONSTANT_LONG  3 byte constant index, little-endian
//   everything else takes no operand

pub const OP_CONSTANT: u8 = 0;
pub const OP_CONSTANT_LONG: u8 = 1;
pub const OP_ADD: u8 = 2;
pub const OP_SUBTRACT: u8 = 3;
pub const OP_MULTIPLY: u8 = 4;
pub const OP_DIVIDE: u8 = 5;
pub const OP_NEGATE: u8 = 6;
pub const OP_RETURN: u8 = 7;

/// Largest constant pool a chunk can address (24-bit index).
pub const MAX_CONSTANTS: usize = 1 << 24;

/// Mnemonic for an opcode byte, `None` for bytes that are not opcodes.
pub fn opcode_name(op: u8) -> Option<&'static str> {
    let name = match op {
        OP_CONSTANT => "OP_CONSTANT",
        OP_CONSTANT_LONG => "OP_CONSTANT_LONG",
        OP_ADD => "OP_ADD",
        OP_SUBTRACT => "OP_SUBTRACT",
        OP_MULTIPLY => "OP_MULTIPLY",
        OP_DIVIDE => "OP_DIVIDE",
        OP_NEGATE => "OP_NEGATE",
        OP_RETURN => "OP_RETURN",
        _ => return None,
    };
    Some(name)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChunkError {
    #[error("Too many constants in one chunk.")]
    TooManyConstants,
}

/// First code offset belonging to a source line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LineStart {
    pub offset: usize,
    pub line: u32,
}

// ── Chunk ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize)]
pub struct Chunk {
    code: Buffer<u8>,
    constants: Buffer<Value>,
    lines: Buffer<LineStart>,
}

impl Chunk {
    pub fn new() -> Self {
        Chunk::default()
    }

    /// Append one byte. A line entry is recorded only when `line` differs from
    /// the line of the previous byte.
    pub fn write(&mut self, byte: u8, line: u32) {
        self.code.push(byte);

        if self.lines.last().is_some_and(|start| start.line == line) {
            return;
        }
        self.lines.push(LineStart { offset: self.code.len() - 1, line });
    }

    pub fn add_constant(&mut self, value: Value) -> usize {
        self.constants.push(value);
        self.constants.len() - 1
    }

    /// Add `value` to the pool and emit the instruction that loads it, picking
    /// the short or long form from the resulting index.
    pub fn write_constant(&mut self, value: Value, line: u32) -> Result<usize, ChunkError> {
        if self.constants.len() >= MAX_CONSTANTS {
            return Err(ChunkError::TooManyConstants);
        }
        let index = self.add_constant(value);

        if index <= u8::MAX as usize {
            self.write(OP_CONSTANT, line);
            self.write(index as u8, line);
        } else {
            let [lo, mid, hi, _] = (index as u32).to_le_bytes();
            self.write(OP_CONSTANT_LONG, line);
            self.write(lo, line);
            self.write(mid, line);
            self.write(hi, line);
        }
        Ok(index)
    }

    /// Source line of the instruction at `offset`: the line of the greatest
    /// recorded offset not past it.
    pub fn line_for(&self, offset: usize) -> Option<u32> {
        let after = self.lines.partition_point(|start| start.offset <= offset);
        after.checked_sub(1).map(|i| self.lines[i].line)
    }

    /// Decode the 3-byte little-endian operand starting at `offset`.
    pub fn read_u24(&self, offset: usize) -> Option<usize> {
        match self.code.as_slice().get(offset..offset + 3) {
            Some(&[lo, mid, hi]) => Some(u32::from_le_bytes([lo, mid, hi, 0]) as usize),
            _ => None,
        }
    }

    pub fn constant(&self, index: usize) -> Option<Value> {
        self.constants.get(index).copied()
    }

    pub fn code(&self) -> &[u8] {
        &self.code
    }

    pub fn constants(&self) -> &[Value] {
        &self.constants
    }

    pub fn lines(&self) -> &[LineStart] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub fn code_capacity(&self) -> usize {
        self.code.capacity()
    }

    /// Free every buffer and return to the state of `Chunk::new()`.
    pub fn release(&mut self) {
        self.code.release();
        self.constants.release();
        self.lines.release();
    }
}
