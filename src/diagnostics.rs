use std::fmt;

use thiserror::Error;

/// Classification of a failure anywhere in the load/evaluate pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    FileNotFound,
    TranspileFailure,
    ModuleResolution,
    Compile,
    Runtime,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorKind::FileNotFound => "FileNotFound",
            ErrorKind::TranspileFailure => "TranspileFailure",
            ErrorKind::ModuleResolution => "ModuleResolutionError",
            ErrorKind::Compile => "CompileError",
            ErrorKind::Runtime => "RuntimeException",
        };
        f.write_str(label)
    }
}

/// The error half of an evaluation: what went wrong, in which unit, and where.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub kind: ErrorKind,
    pub message: String,
    pub unit: Option<String>,
    pub line: Option<u32>,
    pub notes: Vec<String>,
}

impl Diagnostic {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            unit: None,
            line: None,
            notes: Vec::new(),
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        match (&self.unit, self.line) {
            (Some(unit), Some(line)) => write!(f, " ({unit}:{line})")?,
            (Some(unit), None) => write!(f, " ({unit})")?,
            (None, Some(line)) => write!(f, " (line {line})")?,
            (None, None) => {}
        }
        for note in &self.notes {
            write!(f, "\n  note: {note}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostic {}

/// Every evaluation produces exactly one of these.
pub type EvalResult<T> = std::result::Result<T, Diagnostic>;

/// Errors raised while setting the host up, as opposed to while evaluating.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("{0}")]
    Diagnostic(#[from] Diagnostic),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("engine error: {0}")]
    Engine(#[from] rquickjs::Error),
    #[error("line editor error: {0}")]
    Editor(#[from] rustyline::error::ReadlineError),
}

pub type Result<T> = std::result::Result<T, HostError>;
