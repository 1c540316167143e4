//! Host library for running QuickJS scripts from the command line.
//! Resolves module specifiers, optionally transpiles JSX, loads CommonJS and
//! native modules, and drives one-shot, line-by-line and REPL execution
//! against a single shared context.

pub mod batch;
pub mod bindings;
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod evaluator;
pub mod jsx;
pub mod loader;
pub mod quickjs;
pub mod repl;
pub mod resolver;
pub mod runtime;
pub mod transpile;
pub mod unit;
pub mod wrapper;

pub use bindings::{Captured, Streams};
pub use config::{EntryMode, HostConfig, TransformConfig};
pub use diagnostics::{Diagnostic, ErrorKind, EvalResult, HostError};
pub use repl::Repl;
pub use resolver::{ModuleResolver, Request};
pub use runtime::ExecutionContext;
pub use unit::{ModuleSpecifier, SourceUnit, UnitKind};
