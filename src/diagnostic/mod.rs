pub mod ansi;
pub mod json;

use crate::compiler::{CompileError, ErrorLocation};
use crate::vm::VmError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Compile,
    Runtime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub phase: Phase,
    pub message: String,
    pub line: Option<u32>,
    /// Only set for compile errors.
    pub location: Option<ErrorLocation>,
    pub source: Option<String>,
}

impl Diagnostic {
    pub fn runtime(message: impl Into<String>) -> Self {
        Diagnostic {
            phase: Phase::Runtime,
            message: message.into(),
            line: None,
            location: None,
            source: None,
        }
    }

    pub fn with_line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Text of the 1-based `line` in the attached source, if any.
    pub fn source_line(&self) -> Option<&str> {
        let line = self.line?;
        let source = self.source.as_deref()?;
        source.lines().nth(line.checked_sub(1)? as usize)
    }

    /// The canonical one- or two-line form printed to stderr.
    pub fn render_plain(&self) -> String {
        match (self.phase, self.line) {
            (Phase::Compile, line) => format!(
                "[line {}] Error{}: {}",
                line.unwrap_or(0),
                self.location.as_ref().map(ToString::to_string).unwrap_or_default(),
                self.message
            ),
            (Phase::Runtime, Some(line)) => format!("{}\n[line {}] in script", self.message, line),
            (Phase::Runtime, None) => self.message.clone(),
        }
    }
}

impl From<&CompileError> for Diagnostic {
    fn from(e: &CompileError) -> Self {
        Diagnostic {
            phase: Phase::Compile,
            message: e.message.clone(),
            line: Some(e.line),
            location: Some(e.location.clone()),
            source: None,
        }
    }
}

impl From<&VmError> for Diagnostic {
    fn from(e: &VmError) -> Self {
        match e {
            VmError::Runtime { message, line } => Diagnostic::runtime(message.clone()).with_line(*line),
            fault => Diagnostic::runtime(fault.to_string()),
        }
    }
}
