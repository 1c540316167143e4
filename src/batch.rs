//! Line-at-a-time execution of a whole file.
//!
//! This is an approximation, not a way to run programs. Every physical line
//! is compiled and run as its own script, so a statement spread over several
//! lines fails to parse, and the last expression value of each line is
//! printed as if typed into a REPL. Use the regular entry path for anything
//! that is not a flat list of one-line statements.

use crate::{diagnostics::EvalResult, runtime::ExecutionContext, unit::SourceUnit};

/// The result of one physical line. `line` is 1-based and counts blank lines.
#[derive(Debug, Clone, PartialEq)]
pub struct LineReport {
    pub line: usize,
    pub outcome: EvalResult<Option<String>>,
}

/// Evaluates each non-blank line of `text` in order against `context`,
/// printing values and `[line N]`-prefixed errors as it goes.
pub fn run(context: &ExecutionContext, name: &str, text: &str) -> Vec<LineReport> {
    let streams = context.streams();
    let mut reports = Vec::new();
    for (idx, source) in text.lines().enumerate() {
        if source.trim().is_empty() {
            continue;
        }
        let line = idx + 1;
        let unit = SourceUnit::script(&format!("{name}:{line}"), source);
        let outcome = context.evaluate(&unit);
        match &outcome {
            Ok(Some(value)) => streams.out.write_line(value),
            Ok(None) => {}
            Err(diagnostic) => streams.err.write_line(&format!("[line {line}] {diagnostic}")),
        }
        reports.push(LineReport { line, outcome });
    }
    reports
}
