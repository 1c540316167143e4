use std::path::{Path, PathBuf};

use crate::{
    config::{EntryMode, HostConfig},
    diagnostics::{Diagnostic, ErrorKind, Result},
    loader::{FsLoader, SourceLoader},
    transpile::{self, Transpile},
    unit::{ModuleSpecifier, SourceUnit, UnitKind},
};

/// Why a specifier is being resolved. Decides the unit kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    /// `require()`/`verdemod()` from running code.
    Require,
    /// Static `import` inside a native module.
    Import,
    /// The program's top-level entry file.
    Entry(EntryMode),
}

/// Turns specifiers into evaluation units.
///
/// Nothing is cached: every call re-reads the file and re-runs the
/// transpile stage, and a module that requires itself is not detected here.
pub struct ModuleResolver {
    root: PathBuf,
    default_extension: String,
    transpile_extensions: Vec<String>,
    loader: Box<dyn SourceLoader>,
    transpiler: Option<Box<dyn Transpile>>,
}

impl ModuleResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let defaults = HostConfig::default();
        Self {
            root: root.into(),
            default_extension: defaults.default_extension,
            transpile_extensions: defaults.transpile_extensions,
            loader: Box::new(FsLoader),
            transpiler: None,
        }
    }

    pub fn from_config(config: &HostConfig) -> Result<Self> {
        let mut resolver = Self::new(config.root.clone())
            .with_default_extension(config.default_extension.clone())
            .with_transpile_extensions(config.transpile_extensions.clone());
        resolver.transpiler = transpile::from_config(&config.transform)?;
        Ok(resolver)
    }

    pub fn with_loader(mut self, loader: impl SourceLoader + 'static) -> Self {
        self.loader = Box::new(loader);
        self
    }

    pub fn with_transpiler(mut self, transpiler: impl Transpile + 'static) -> Self {
        self.transpiler = Some(Box::new(transpiler));
        self
    }

    pub fn with_default_extension(mut self, extension: impl Into<String>) -> Self {
        self.default_extension = extension.into();
        self
    }

    pub fn with_transpile_extensions(mut self, extensions: Vec<String>) -> Self {
        self.transpile_extensions = extensions;
        self
    }

    /// Maps a specifier to the file it names, appending the default
    /// extension when the specifier has none.
    pub fn normalize(&self, specifier: &str) -> std::result::Result<PathBuf, Diagnostic> {
        let invalid = |reason: &str| {
            Diagnostic::new(
                ErrorKind::ModuleResolution,
                format!("invalid module specifier `{specifier}`: {reason}"),
            )
            .with_unit(specifier)
        };
        if specifier.trim().is_empty() {
            return Err(invalid("specifier is empty"));
        }
        if specifier.contains('\0') {
            return Err(invalid("specifier contains a NUL byte"));
        }
        if specifier.ends_with('/') || specifier.ends_with('\\') {
            return Err(invalid("specifier names a directory"));
        }

        let mut name = specifier.to_string();
        if Path::new(specifier).extension().is_none() {
            name.push('.');
            name.push_str(&self.default_extension);
        }
        let path = Path::new(&name);
        let resolved = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };
        tracing::debug!(%specifier, resolved = %resolved.display(), "normalized specifier");
        Ok(resolved)
    }

    pub fn resolve(&self, specifier: &str, request: Request) -> std::result::Result<SourceUnit, Diagnostic> {
        let path = self.normalize(specifier)?;
        self.resolve_path(&path, request)
    }

    /// Loads an already-normalized location.
    pub fn resolve_path(&self, path: &Path, request: Request) -> std::result::Result<SourceUnit, Diagnostic> {
        let text = self.loader.load(path)?;
        let name = path.display().to_string();

        let (text, transpiled) = match &self.transpiler {
            Some(transpiler) if self.wants_transpile(path) => {
                tracing::debug!(unit = %name, "applying transpile stage");
                let output = transpiler
                    .transform(&text)
                    .map_err(|err| err.into_diagnostic(&ModuleSpecifier::new(name.as_str())))?;
                (output, true)
            }
            _ => (text, false),
        };

        let kind = classify(path, &text, request);
        tracing::debug!(unit = %name, ?kind, "resolved unit");
        let unit = SourceUnit::new(name, text, kind);
        Ok(if transpiled { unit.mark_transpiled() } else { unit })
    }

    fn wants_transpile(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.transpile_extensions.iter().any(|wanted| wanted == ext))
    }
}

/// Picks the unit kind for a freshly loaded file.
pub fn classify(path: &Path, text: &str, request: Request) -> UnitKind {
    match request {
        Request::Require => UnitKind::CommonJSModule,
        Request::Import | Request::Entry(EntryMode::Module) => UnitKind::NativeModule,
        Request::Entry(EntryMode::Script) => UnitKind::Script,
        Request::Entry(EntryMode::Auto) => {
            let is_mjs = path.extension().and_then(|ext| ext.to_str()) == Some("mjs");
            if is_mjs || looks_like_module(text) {
                UnitKind::NativeModule
            } else {
                UnitKind::Script
            }
        }
    }
}

/// True when some line opens with an `import` or `export` declaration.
/// Dynamic `import(...)` calls do not count.
pub fn looks_like_module(text: &str) -> bool {
    text.lines().map(str::trim_start).any(|line| {
        let declaration = |keyword: &str| {
            line.strip_prefix(keyword).is_some_and(|rest| {
                rest.starts_with(|c: char| c.is_whitespace() || matches!(c, '{' | '*' | '"' | '\''))
            })
        };
        declaration("import") || declaration("export")
    })
}
