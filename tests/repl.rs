use std::io::Cursor;

use verde::{
    Captured, ErrorKind, ExecutionContext, HostConfig, Repl, Streams,
    repl::{Outcome, Piped, ReplState, needs_continuation},
};

fn session() -> (Repl, Captured) {
    let (streams, captured) = Streams::captured();
    let context =
        ExecutionContext::from_config(&HostConfig::default(), streams).expect("create context");
    (Repl::new(context), captured)
}

fn run(input: &str) -> (Repl, Captured) {
    let (mut repl, captured) = session();
    repl.run_with(&mut Piped::new(Cursor::new(input.to_string())))
        .expect("session should run");
    (repl, captured)
}

#[test]
fn bindings_persist_between_inputs() {
    let (mut repl, _) = session();
    assert_eq!(repl.eval_input("let x = 1;"), Outcome::Silent);
    assert_eq!(repl.eval_input("x + 1;"), Outcome::Value("2".into()));
    assert_eq!(repl.state(), ReplState::Reporting);
}

#[test]
fn errors_are_reported_as_outcomes() {
    let (mut repl, _) = session();
    match repl.eval_input("undefinedName") {
        Outcome::Error(diagnostic) => {
            assert_eq!(diagnostic.kind, ErrorKind::Runtime);
            assert_eq!(diagnostic.unit.as_deref(), Some("<repl>"));
        }
        other => panic!("expected error, got {other:?}"),
    }
}

#[test]
fn values_are_printed_in_order() {
    let (repl, captured) = run("let x = 1;\nx + 1;\n'done'\n");
    assert_eq!(captured.stdout(), "2\ndone\n");
    assert_eq!(repl.state(), ReplState::Closed);
}

#[test]
fn undefined_results_print_nothing() {
    let (_, captured) = run("undefined\nvoid 0\nnull\n");
    assert_eq!(captured.stdout(), "null\n");
}

#[test]
fn an_error_does_not_end_the_session() {
    let (_, captured) = run("throw new Error('bad');\n1 + 1\n");
    assert!(captured.stderr().contains("bad"), "{}", captured.stderr());
    assert_eq!(captured.stdout(), "2\n");
}

#[test]
fn sentinel_closes_the_session() {
    let (repl, captured) = run("1\n:quit\n2\n");
    assert_eq!(captured.stdout(), "1\n");
    assert_eq!(repl.state(), ReplState::Closed);
}

#[test]
fn blank_lines_are_skipped() {
    let (_, captured) = run("\n   \n3 * 3\n");
    assert_eq!(captured.stdout(), "9\n");
    assert_eq!(captured.stderr(), "");
}

#[test]
fn open_brackets_continue_onto_the_next_line() {
    let (_, captured) = run("function add(a, b) {\n  return a + b;\n}\nadd(2, 3)\n");
    assert_eq!(captured.stdout(), "5\n");
    assert_eq!(captured.stderr(), "");
}

#[test]
fn sentinel_inside_pending_input_is_code() {
    let (_, captured) = run("[\n:quit\n]\n4\n");
    assert!(!captured.stderr().is_empty());
    assert_eq!(captured.stdout(), "4\n");
}

#[test]
fn brackets_inside_regex_literals_do_not_continue() {
    let (_, captured) = run("/\\(/.test('(')\n/[{]/.test('{')\n1 + 1\n");
    assert_eq!(captured.stdout(), "true\ntrue\n2\n");
    assert_eq!(captured.stderr(), "");
}

#[test]
fn unfinished_input_at_end_of_stream_is_reported() {
    let (repl, captured) = run("1\nfoo(\n");
    assert_eq!(captured.stdout(), "1\n");
    assert!(captured.stderr().contains("CompileError"), "{}", captured.stderr());
    assert_eq!(repl.state(), ReplState::Closed);
}

#[test]
fn continuation_tracks_unclosed_constructs() {
    assert!(needs_continuation("if (x) {"));
    assert!(needs_continuation("call(1,\n  [2,"));
    assert!(needs_continuation("`template"));
    assert!(needs_continuation("/* open comment"));
    assert!(!needs_continuation("f(1)"));
    assert!(!needs_continuation("'{'"));
    assert!(!needs_continuation("x // {"));
    assert!(!needs_continuation("}"));
    assert!(!needs_continuation("/\\(/.test('(')"));
    assert!(!needs_continuation("const re = /[{(]/;"));
    assert!(!needs_continuation("return /'/"));
    assert!(needs_continuation("total = a / (b"));
}
