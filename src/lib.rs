//! cynch compiles arithmetic expressions to bytecode and runs them on a
//! stack VM.
//!
//! Source text is scanned by [`lexer`], turned into a [`chunk::Chunk`] by
//! [`compiler`] and executed by [`vm`].

pub mod chunk;
pub mod compiler;
pub mod diagnostic;
pub mod disasm;
pub mod lexer;
pub mod value;
pub mod vm;

use compiler::CompileErrors;
use value::Value;
use vm::{Vm, VmError};

#[derive(Debug, thiserror::Error)]
pub enum InterpretError {
    #[error(transparent)]
    Compile(#[from] CompileErrors),
    #[error(transparent)]
    Runtime(#[from] VmError),
}

/// Compile and run `source` on `vm`. The chunk lives only for this call.
pub fn interpret_on(vm: &mut Vm, source: &str) -> Result<Value, InterpretError> {
    let chunk = compiler::compile(source)?;
    Ok(vm.interpret(&chunk)?)
}

/// Compile and run `source` on a fresh VM.
pub fn interpret(source: &str) -> Result<Value, InterpretError> {
    interpret_on(&mut Vm::new(), source)
}
