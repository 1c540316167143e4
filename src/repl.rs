use std::{
    io::BufRead,
    iter::Peekable,
    path::{Path, PathBuf},
    str::Chars,
};

use rustyline::{DefaultEditor, error::ReadlineError};

use crate::{
    diagnostics::{Diagnostic, Result},
    jsx::{EXPRESSION_KEYWORDS, EXPRESSION_PUNCTUATION},
    runtime::ExecutionContext,
    unit::SourceUnit,
};

const SENTINELS: &[&str] = &[":quit", ":exit"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplState {
    Reading,
    Evaluating,
    Reporting,
    Closed,
}

/// What evaluating one logical input produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Value(String),
    /// The input evaluated to the "no value" sentinel.
    Silent,
    Error(Diagnostic),
}

/// One read from an input stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadLine {
    Line(String),
    /// Ctrl-C: drop whatever has been typed so far.
    Interrupted,
    Eof,
}

pub trait LineSource {
    fn read_line(&mut self, prompt: &str) -> Result<ReadLine>;
}

/// Line editor input with history, for terminals.
pub struct Interactive {
    editor: DefaultEditor,
    history: Option<PathBuf>,
}

impl Interactive {
    pub fn new(history: Option<PathBuf>) -> Result<Self> {
        let mut editor = DefaultEditor::new()?;
        if let Some(path) = &history {
            if let Err(err) = editor.load_history(path) {
                tracing::debug!("no history loaded from {}: {err}", path.display());
            }
        }
        Ok(Self { editor, history })
    }

    pub fn save_history(&mut self) {
        let Some(path) = &self.history else {
            return;
        };
        if let Err(err) = self.editor.save_history(path) {
            tracing::warn!("failed to save history to {}: {err}", path.display());
        }
    }
}

impl LineSource for Interactive {
    fn read_line(&mut self, prompt: &str) -> Result<ReadLine> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    if let Err(err) = self.editor.add_history_entry(line.as_str()) {
                        tracing::warn!("failed to add history entry: {err}");
                    }
                }
                Ok(ReadLine::Line(line))
            }
            Err(ReadlineError::Interrupted) => Ok(ReadLine::Interrupted),
            Err(ReadlineError::Eof) => Ok(ReadLine::Eof),
            Err(err) => Err(err.into()),
        }
    }
}

/// Plain buffered input, for pipes and tests. Prompts are not echoed.
pub struct Piped<R> {
    reader: R,
}

impl<R: BufRead> Piped<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> LineSource for Piped<R> {
    fn read_line(&mut self, _prompt: &str) -> Result<ReadLine> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(ReadLine::Eof);
        }
        let trimmed = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed);
        Ok(ReadLine::Line(line))
    }
}

pub struct Repl {
    context: ExecutionContext,
    state: ReplState,
    prompt: String,
    continuation_prompt: String,
}

impl Repl {
    pub fn new(context: ExecutionContext) -> Self {
        Self {
            context,
            state: ReplState::Reading,
            prompt: "> ".into(),
            continuation_prompt: "... ".into(),
        }
    }

    pub fn with_prompts(mut self, prompt: impl Into<String>, continuation: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self.continuation_prompt = continuation.into();
        self
    }

    pub fn state(&self) -> ReplState {
        self.state
    }

    fn transition(&mut self, next: ReplState) {
        tracing::trace!(from = ?self.state, to = ?next, "repl transition");
        self.state = next;
    }

    /// Evaluates one logical input as a script against the session context.
    pub fn eval_input(&mut self, input: &str) -> Outcome {
        self.transition(ReplState::Evaluating);
        let unit = SourceUnit::script("<repl>", input);
        let outcome = match self.context.evaluate(&unit) {
            Ok(Some(value)) => Outcome::Value(value),
            Ok(None) => Outcome::Silent,
            Err(diagnostic) => Outcome::Error(diagnostic),
        };
        self.transition(ReplState::Reporting);
        outcome
    }

    fn report(&mut self, outcome: &Outcome) {
        let streams = self.context.streams();
        match outcome {
            Outcome::Value(value) => streams.out.write_line(value),
            Outcome::Silent => {}
            Outcome::Error(diagnostic) => streams.err.write_line(&diagnostic.to_string()),
        }
        self.transition(ReplState::Reading);
    }

    /// Reads and evaluates until the sentinel command or end of input.
    pub fn run_with(&mut self, source: &mut impl LineSource) -> Result<()> {
        let mut pending = String::new();
        self.transition(ReplState::Reading);
        while self.state != ReplState::Closed {
            let prompt = if pending.is_empty() {
                &self.prompt
            } else {
                &self.continuation_prompt
            };
            let line = match source.read_line(prompt)? {
                ReadLine::Line(line) => line,
                ReadLine::Interrupted => {
                    pending.clear();
                    continue;
                }
                ReadLine::Eof => {
                    // Unbalanced input left at end of stream is still reported.
                    if !pending.trim().is_empty() {
                        let input = std::mem::take(&mut pending);
                        let outcome = self.eval_input(&input);
                        self.report(&outcome);
                    }
                    self.transition(ReplState::Closed);
                    break;
                }
            };
            if pending.is_empty() && SENTINELS.contains(&line.trim()) {
                self.transition(ReplState::Closed);
                break;
            }

            if !pending.is_empty() {
                pending.push('\n');
            }
            pending.push_str(&line);
            if pending.trim().is_empty() {
                pending.clear();
                continue;
            }
            if needs_continuation(&pending) {
                continue;
            }

            let input = std::mem::take(&mut pending);
            let outcome = self.eval_input(&input);
            self.report(&outcome);
        }
        Ok(())
    }

    /// Runs against a line editor, loading and saving `history` if given.
    pub fn run_interactive(&mut self, history: Option<&Path>) -> Result<()> {
        let mut input = Interactive::new(history.map(Path::to_path_buf))?;
        let result = self.run_with(&mut input);
        input.save_history();
        result
    }
}

/// True while `text` leaves a bracket, template literal or block comment open.
pub fn needs_continuation(text: &str) -> bool {
    let mut depth: i64 = 0;
    let mut regex_allowed = true;
    let mut word = String::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c.is_alphanumeric() || c == '_' || c == '$' {
            word.push(c);
            continue;
        }
        if !word.is_empty() {
            regex_allowed = EXPRESSION_KEYWORDS.contains(&word.as_str());
            word.clear();
        }
        match c {
            '"' | '\'' => {
                while let Some(next) = chars.next() {
                    match next {
                        '\\' => {
                            chars.next();
                        }
                        '\n' => break,
                        next if next == c => break,
                        _ => {}
                    }
                }
                regex_allowed = false;
            }
            '`' => {
                loop {
                    match chars.next() {
                        None => return true,
                        Some('\\') => {
                            chars.next();
                        }
                        Some('`') => break,
                        Some(_) => {}
                    }
                }
                regex_allowed = false;
            }
            '/' if chars.peek() == Some(&'/') => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                loop {
                    match chars.next() {
                        None => return true,
                        Some('*') if chars.peek() == Some(&'/') => {
                            chars.next();
                            break;
                        }
                        Some(_) => {}
                    }
                }
            }
            '/' if regex_allowed => {
                skip_regex(&mut chars);
                regex_allowed = false;
            }
            '(' | '[' | '{' => {
                depth += 1;
                regex_allowed = true;
            }
            ')' | ']' => {
                depth -= 1;
                regex_allowed = false;
            }
            '}' => {
                depth -= 1;
                regex_allowed = true;
            }
            c if c.is_whitespace() => {}
            c => regex_allowed = EXPRESSION_PUNCTUATION.contains(c),
        }
    }
    depth > 0
}

/// Skips a regex body after its opening `/`. A regex never spans lines, so an
/// unterminated one ends at the newline and is left for the engine to reject.
fn skip_regex(chars: &mut Peekable<Chars<'_>>) {
    let mut in_class = false;
    while let Some(c) = chars.next() {
        match c {
            '\n' => return,
            '\\' => {
                chars.next();
            }
            '[' => in_class = true,
            ']' => in_class = false,
            '/' if !in_class => return,
            _ => {}
        }
    }
}
