use crate::chunk::*;
use crate::disasm;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum VmError {
    #[error("{message}\n[line {line}] in script")]
    Runtime { message: String, line: u32 },
    #[error("stack underflow at offset {offset}")]
    StackUnderflow { offset: usize },
    #[error("unknown opcode {op} at offset {offset}")]
    UnknownOpcode { op: u8, offset: usize },
    #[error("constant index {index} out of range at offset {offset}")]
    BadConstant { index: usize, offset: usize },
    #[error("reached end of code without OP_RETURN")]
    MissingReturn,
}

type VmResult<T> = Result<T, VmError>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VmOptions {
    /// Emit a trace event with the stack and the next instruction before
    /// every step.
    pub trace_execution: bool,
}

/// Stack machine. The operand stack outlives individual runs and is reset,
/// not reallocated, at the start of each one.
#[derive(Debug, Default)]
pub struct Vm {
    stack: Buffer<Value>,
    options: VmOptions,
}

impl Vm {
    pub fn new() -> Self {
        Vm::default()
    }

    pub fn with_options(options: VmOptions) -> Self {
        Vm { stack: Buffer::new(), options }
    }

    /// Execute `chunk` until `OP_RETURN` and hand back the returned value.
    /// Any error leaves the stack empty.
    pub fn interpret(&mut self, chunk: &Chunk) -> VmResult<Value> {
        self.reset_stack();
        tracing::debug!(code = chunk.len(), "vm start");
        let result = self.run(chunk);
        match &result {
            Ok(value) => tracing::debug!(%value, "vm halt"),
            Err(e) => {
                tracing::debug!(error = %e, "vm error");
                self.reset_stack();
            }
        }
        result
    }

    pub fn stack_len(&self) -> usize {
        self.stack.len()
    }

    pub fn stack_capacity(&self) -> usize {
        self.stack.capacity()
    }

    fn reset_stack(&mut self) {
        self.stack.clear();
    }

    fn run(&mut self, chunk: &Chunk) -> VmResult<Value> {
        let mut ip = 0;
        loop {
            if self.options.trace_execution {
                self.trace(chunk, ip);
            }

            let op = read_byte(chunk, &mut ip)?;
            match op {
                OP_CONSTANT => {
                    let index = read_byte(chunk, &mut ip)? as usize;
                    let value = read_constant(chunk, index, ip - 2)?;
                    self.stack.push(value);
                }
                OP_CONSTANT_LONG => {
                    let index = chunk.read_u24(ip).ok_or(VmError::MissingReturn)?;
                    ip += 3;
                    let value = read_constant(chunk, index, ip - 4)?;
                    self.stack.push(value);
                }
                OP_ADD => self.binary_op(chunk, ip, |a, b| a + b)?,
                OP_SUBTRACT => self.binary_op(chunk, ip, |a, b| a - b)?,
                OP_MULTIPLY => self.binary_op(chunk, ip, |a, b| a * b)?,
                OP_DIVIDE => self.binary_op(chunk, ip, |a, b| a / b)?,
                OP_NEGATE => {
                    let operand = self.peek(0).ok_or(VmError::StackUnderflow { offset: ip - 1 })?;
                    let Ok(n) = operand.as_number() else {
                        return Err(runtime_error(chunk, ip, "Operand must be a number."));
                    };
                    self.stack.pop();
                    self.stack.push(Value::Number(-n));
                }
                OP_RETURN => {
                    return self.stack.pop().ok_or(VmError::StackUnderflow { offset: ip - 1 });
                }
                _ => return Err(VmError::UnknownOpcode { op, offset: ip - 1 }),
            }
        }
    }

    /// Pops `b` then `a` and pushes `a op b`, after checking both are numbers.
    fn binary_op(&mut self, chunk: &Chunk, ip: usize, op: fn(f64, f64) -> f64) -> VmResult<()> {
        let (Some(b), Some(a)) = (self.peek(0), self.peek(1)) else {
            return Err(VmError::StackUnderflow { offset: ip - 1 });
        };
        let (Ok(b), Ok(a)) = (b.as_number(), a.as_number()) else {
            return Err(runtime_error(chunk, ip, "Operands must be numbers."));
        };
        self.stack.pop();
        self.stack.pop();
        self.stack.push(Value::Number(op(a, b)));
        Ok(())
    }

    fn peek(&self, distance: usize) -> Option<Value> {
        let index = self.stack.len().checked_sub(distance + 1)?;
        self.stack.get(index).copied()
    }

    fn trace(&self, chunk: &Chunk, ip: usize) {
        let stack: String = self.stack.iter().map(|v| format!("[ {} ]", v)).collect();
        let (instruction, _) = disasm::disassemble_instruction(chunk, ip);
        tracing::trace!(stack = %stack, "{}", instruction);
    }
}

fn read_byte(chunk: &Chunk, ip: &mut usize) -> VmResult<u8> {
    let byte = *chunk.code().get(*ip).ok_or(VmError::MissingReturn)?;
    *ip += 1;
    Ok(byte)
}

fn read_constant(chunk: &Chunk, index: usize, offset: usize) -> VmResult<Value> {
    chunk.constant(index).ok_or(VmError::BadConstant { index, offset })
}

/// `ip` has already moved past the opcode, so the failing instruction sits
/// at `ip - 1`.
fn runtime_error(chunk: &Chunk, ip: usize, message: &str) -> VmError {
    let line = chunk.line_for(ip - 1).unwrap_or(0);
    VmError::Runtime { message: message.to_string(), line }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile;

    fn run(source: &str) -> Value {
        let chunk = compile(source).unwrap();
        Vm::new().interpret(&chunk).unwrap()
    }

    fn number(source: &str) -> f64 {
        run(source).as_number().unwrap()
    }

    #[test]
    fn vm_precedence() {
        assert_eq!(number("1 + 2 * 3"), 7.0);
        assert_eq!(number("(1 + 2) * 3 - -4"), 13.0);
        assert_eq!(number("10 - 4 - 3"), 3.0);
        assert_eq!(number("16 / 4 / 2"), 2.0);
        assert_eq!(number("-2 * 3"), -6.0);
    }

    #[test]
    fn vm_scenario_expression() {
        assert_eq!(number("1.2 + 3.4 / 5.6 - 2"), 1.2 + 3.4 / 5.6 - 2.0);
    }

    #[test]
    fn vm_divide_by_zero_is_ieee() {
        assert_eq!(number("1 / 0"), f64::INFINITY);
        assert!(number("0 / 0").is_nan());
    }

    #[test]
    fn vm_long_constants() {
        let source = (0..300).map(|i| i.to_string()).collect::<Vec<_>>().join(" + ");
        assert_eq!(number(&source), (0..300).sum::<i32>() as f64);
    }

    #[test]
    fn vm_negate_boolean_is_runtime_error() {
        let mut chunk = Chunk::new();
        chunk.write_constant(Value::Bool(true), 7).unwrap();
        chunk.write(OP_NEGATE, 7);
        chunk.write(OP_RETURN, 7);

        let mut vm = Vm::new();
        let err = vm.interpret(&chunk).unwrap_err();
        assert_eq!(
            err,
            VmError::Runtime { message: "Operand must be a number.".to_string(), line: 7 }
        );
        assert_eq!(err.to_string(), "Operand must be a number.\n[line 7] in script");
        assert_eq!(vm.stack_len(), 0);
    }

    #[test]
    fn vm_binary_on_nil_is_runtime_error() {
        let mut chunk = Chunk::new();
        chunk.write_constant(Value::Number(1.0), 1).unwrap();
        chunk.write_constant(Value::Nil, 2).unwrap();
        chunk.write(OP_ADD, 3);
        chunk.write(OP_RETURN, 3);

        let mut vm = Vm::new();
        let err = vm.interpret(&chunk).unwrap_err();
        assert_eq!(
            err,
            VmError::Runtime { message: "Operands must be numbers.".to_string(), line: 3 }
        );
        assert_eq!(vm.stack_len(), 0);
    }

    #[test]
    fn vm_runs_hand_assembled_chunk() {
        let mut chunk = Chunk::new();
        chunk.write_constant(Value::Number(1.2), 123).unwrap();
        chunk.write_constant(Value::Number(3.4), 123).unwrap();
        chunk.write(OP_ADD, 123);
        chunk.write_constant(Value::Number(5.6), 123).unwrap();
        chunk.write(OP_DIVIDE, 123);
        chunk.write(OP_NEGATE, 123);
        chunk.write(OP_RETURN, 123);

        let value = Vm::new().interpret(&chunk).unwrap();
        assert_eq!(value, Value::Number(-((1.2 + 3.4) / 5.6)));
    }

    #[test]
    fn vm_underflow_is_a_fault() {
        let mut chunk = Chunk::new();
        chunk.write(OP_ADD, 1);
        let mut vm = Vm::new();
        assert_eq!(vm.interpret(&chunk), Err(VmError::StackUnderflow { offset: 0 }));

        let mut chunk = Chunk::new();
        chunk.write(OP_RETURN, 1);
        assert_eq!(vm.interpret(&chunk), Err(VmError::StackUnderflow { offset: 0 }));
        assert_eq!(vm.stack_len(), 0);
    }

    #[test]
    fn vm_unknown_opcode() {
        let mut chunk = Chunk::new();
        chunk.write_constant(Value::Number(1.0), 1).unwrap();
        chunk.write(0xEE, 1);
        let mut vm = Vm::new();
        assert_eq!(vm.interpret(&chunk), Err(VmError::UnknownOpcode { op: 0xEE, offset: 2 }));
        assert_eq!(vm.stack_len(), 0);
    }

    #[test]
    fn vm_missing_return() {
        let mut chunk = Chunk::new();
        chunk.write_constant(Value::Number(1.0), 1).unwrap();
        assert_eq!(Vm::new().interpret(&chunk), Err(VmError::MissingReturn));
    }

    #[test]
    fn vm_bad_constant_index() {
        let mut chunk = Chunk::new();
        chunk.write(OP_CONSTANT, 1);
        chunk.write(4, 1);
        assert_eq!(
            Vm::new().interpret(&chunk),
            Err(VmError::BadConstant { index: 4, offset: 0 })
        );
    }

    #[test]
    fn vm_stack_is_reused_between_runs() {
        // right-nested additions keep every operand on the stack at once
        let source = (1..=20).map(|i| format!("{i} + (")).collect::<String>() + "0" + &")".repeat(20);
        let chunk = compile(&source).unwrap();

        let mut vm = Vm::new();
        assert_eq!(vm.interpret(&chunk).unwrap(), Value::Number(210.0));
        assert_eq!(vm.stack_capacity(), 32);
        assert_eq!(vm.stack_len(), 0);

        assert_eq!(vm.interpret(&compile("1").unwrap()).unwrap(), Value::Number(1.0));
        assert_eq!(vm.stack_capacity(), 32);
    }

    #[test]
    fn vm_trace_does_not_change_result() {
        let chunk = compile("2 * (3 + 4)").unwrap();
        let mut vm = Vm::with_options(VmOptions { trace_execution: true });
        assert_eq!(vm.interpret(&chunk).unwrap(), Value::Number(14.0));
    }
}
