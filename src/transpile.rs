use std::{fmt, path::Path};

use rquickjs::{CatchResultExt, Context, Function, Runtime};

use crate::{
    config::TransformConfig,
    diagnostics::{Diagnostic, ErrorKind, Result},
    jsx::JsxTranspiler,
    loader::{FsLoader, SourceLoader},
    unit::ModuleSpecifier,
};

/// A pure source-to-source rewrite applied before evaluation.
///
/// Implementations must return identical output for identical input and must
/// not carry state from one call into the next.
pub trait Transpile {
    fn transform(&self, source: &str) -> std::result::Result<String, TranspileError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranspileError {
    pub message: String,
    pub line: Option<u32>,
}

impl TranspileError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: None,
        }
    }

    pub fn with_line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }

    pub fn into_diagnostic(self, specifier: &ModuleSpecifier) -> Diagnostic {
        let mut diagnostic = Diagnostic::new(ErrorKind::TranspileFailure, self.message)
            .with_unit(specifier.as_str());
        if let Some(line) = self.line {
            diagnostic = diagnostic.with_line(line);
        }
        diagnostic
    }
}

impl fmt::Display for TranspileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{} (line {line})", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for TranspileError {}

/// Runs a prebuilt transform bundle (for example a bundled sucrase) inside a
/// private QuickJS runtime and calls one of its global functions per source.
///
/// The bundle's runtime never shares a context with user code.
pub struct BundleTranspiler {
    entry: String,
    context: Context,
    _runtime: Runtime,
}

impl BundleTranspiler {
    pub fn load(path: &Path, entry: impl Into<String>) -> Result<Self> {
        let bundle = FsLoader.load(path)?;
        Self::from_source(&bundle, entry)
    }

    pub fn from_source(bundle: &str, entry: impl Into<String>) -> Result<Self> {
        let runtime = Runtime::new()?;
        let context = Context::full(&runtime)?;
        context.with(|ctx| {
            ctx.eval::<(), _>(bundle).catch(&ctx).map_err(|err| {
                Diagnostic::new(
                    ErrorKind::TranspileFailure,
                    format!("transform bundle failed to initialise: {err}"),
                )
            })
        })?;
        Ok(Self {
            entry: entry.into(),
            context,
            _runtime: runtime,
        })
    }
}

impl Transpile for BundleTranspiler {
    fn transform(&self, source: &str) -> std::result::Result<String, TranspileError> {
        self.context.with(|ctx| {
            let function: Option<Function> = ctx
                .globals()
                .get(self.entry.as_str())
                .map_err(|err| TranspileError::new(format!("cannot read `{}`: {err}", self.entry)))?;
            let function = function.ok_or_else(|| {
                TranspileError::new(format!("transform bundle does not define `{}`", self.entry))
            })?;
            function
                .call::<_, String>((source,))
                .catch(&ctx)
                .map_err(|err| TranspileError::new(err.to_string()))
        })
    }
}

impl fmt::Debug for BundleTranspiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BundleTranspiler")
            .field("entry", &self.entry)
            .finish_non_exhaustive()
    }
}

/// Builds the transpile stage described by `config`, if any.
pub fn from_config(config: &TransformConfig) -> Result<Option<Box<dyn Transpile>>> {
    match config {
        TransformConfig::Disabled => Ok(None),
        TransformConfig::Jsx { factory, fragment } => Ok(Some(Box::new(JsxTranspiler::new(
            factory.clone(),
            fragment.clone(),
        )))),
        TransformConfig::Bundle { path, entry } => {
            tracing::debug!(bundle = %path.display(), %entry, "loading transform bundle");
            Ok(Some(Box::new(BundleTranspiler::load(path, entry.clone())?)))
        }
    }
}
