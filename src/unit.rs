use std::fmt;

/// A module name as written by the caller, or the location it normalized to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleSpecifier(String);

impl ModuleSpecifier {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleSpecifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModuleSpecifier {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ModuleSpecifier {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// How a unit gets evaluated. Fixed when the unit is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    /// Top-level program in the shared global scope.
    Script,
    /// Body of a synthesized `(exports, module)` wrapper.
    CommonJSModule,
    /// Evaluated through the engine's own import/export machinery.
    NativeModule,
}

#[derive(Debug, Clone)]
pub struct SourceUnit {
    specifier: ModuleSpecifier,
    text: String,
    kind: UnitKind,
    transpiled: bool,
}

impl SourceUnit {
    pub fn new(specifier: impl Into<ModuleSpecifier>, text: impl Into<String>, kind: UnitKind) -> Self {
        Self {
            specifier: specifier.into(),
            text: text.into(),
            kind,
            transpiled: false,
        }
    }

    pub fn script(name: &str, text: impl Into<String>) -> Self {
        Self::new(name, text, UnitKind::Script)
    }

    pub(crate) fn mark_transpiled(mut self) -> Self {
        self.transpiled = true;
        self
    }

    pub fn specifier(&self) -> &ModuleSpecifier {
        &self.specifier
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn kind(&self) -> UnitKind {
        self.kind
    }

    /// Whether the text already went through the transpile stage.
    pub fn is_transpiled(&self) -> bool {
        self.transpiled
    }

    pub fn is_multiline(&self) -> bool {
        self.text.trim_end_matches('\n').contains('\n')
    }
}
