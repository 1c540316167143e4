use std::{fs, path::Path};

use crate::diagnostics::{Diagnostic, ErrorKind};

/// Reads the raw text behind a resolved module location.
pub trait SourceLoader {
    fn load(&self, path: &Path) -> Result<String, Diagnostic>;
}

/// Loads modules straight from the filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsLoader;

impl SourceLoader for FsLoader {
    fn load(&self, path: &Path) -> Result<String, Diagnostic> {
        // Unreadable and non-UTF-8 files are both reported as missing.
        match fs::read_to_string(path) {
            Ok(text) => {
                tracing::debug!(path = %path.display(), bytes = text.len(), "loaded source");
                Ok(text)
            }
            Err(err) => {
                let mut diagnostic = Diagnostic::new(
                    ErrorKind::FileNotFound,
                    format!("cannot open `{}`: {err}", path.display()),
                )
                .with_unit(path.display().to_string());
                if let Some(code) = err.raw_os_error() {
                    diagnostic = diagnostic.with_note(format!("os error code: {code}"));
                }
                Err(diagnostic)
            }
        }
    }
}
