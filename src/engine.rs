use crate::{
    diagnostics::{Diagnostic, ErrorKind},
    unit::SourceUnit,
};

/// The narrow slice of an embedded language engine the host pipeline needs.
///
/// The pipeline never talks to a concrete engine directly; it is generic over
/// this trait so the CommonJS and native-module paths stay engine-agnostic.
pub trait Engine {
    type Value: Clone;

    /// Compiles and runs `source` as a program in the shared global scope.
    fn run_script(&self, name: &str, source: &str) -> Result<Self::Value, Thrown>;

    /// Compiles and runs `source` through the engine's module records.
    /// Nested imports go through the module hook registered for the engine.
    fn run_module(&self, name: &str, source: &str) -> Result<Self::Value, Thrown>;

    fn new_object(&self) -> Result<Self::Value, Thrown>;

    fn get(&self, target: &Self::Value, key: &str) -> Result<Self::Value, Thrown>;

    fn set(&self, target: &Self::Value, key: &str, value: Self::Value) -> Result<(), Thrown>;

    fn call(&self, function: &Self::Value, args: Vec<Self::Value>) -> Result<Self::Value, Thrown>;

    /// Enumerable own property names, in insertion order.
    fn own_keys(&self, target: &Self::Value) -> Result<Vec<String>, Thrown>;

    /// Display string for a value, or `None` for the "no value" sentinel.
    fn render(&self, value: &Self::Value) -> Option<String>;

    /// `JSON.stringify` of a value; `None` when it has no JSON form.
    fn to_json(&self, value: &Self::Value) -> Result<Option<String>, Thrown>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrownKind {
    /// The source did not parse.
    Syntax,
    /// Running code threw.
    Exception,
}

/// An uncaught throw, already rendered out of the engine's value space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thrown {
    pub kind: ThrownKind,
    pub message: String,
    pub line: Option<u32>,
}

impl Thrown {
    pub fn exception(message: impl Into<String>) -> Self {
        Self {
            kind: ThrownKind::Exception,
            message: message.into(),
            line: None,
        }
    }

    /// Attributes the throw to `unit`. Line positions are kept only for
    /// units that span more than one line.
    pub fn into_diagnostic(self, unit: &SourceUnit) -> Diagnostic {
        let kind = match self.kind {
            ThrownKind::Syntax => ErrorKind::Compile,
            ThrownKind::Exception => ErrorKind::Runtime,
        };
        let mut diagnostic = Diagnostic::new(kind, self.message).with_unit(unit.specifier().as_str());
        if let Some(line) = self.line.filter(|_| unit.is_multiline()) {
            diagnostic = diagnostic.with_line(line);
        }
        diagnostic
    }
}
