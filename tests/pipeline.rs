use std::{fs, path::Path};

use tempfile::{TempDir, tempdir};
use verde::{
    Captured, Diagnostic, EntryMode, ErrorKind, ExecutionContext, HostConfig, Request, Streams,
    UnitKind, batch,
};

fn context_in(root: &Path) -> (ExecutionContext, Captured) {
    let (streams, captured) = Streams::captured();
    let config = HostConfig {
        root: root.to_path_buf(),
        ..HostConfig::default()
    };
    let context = ExecutionContext::from_config(&config, streams).expect("create context");
    (context, captured)
}

fn workspace(files: &[(&str, &str)]) -> TempDir {
    let dir = tempdir().expect("create temp dir");
    for (name, contents) in files {
        fs::write(dir.path().join(name), contents).expect("write module");
    }
    dir
}

fn eval(context: &ExecutionContext, source: &str) -> Option<String> {
    context
        .eval_script("<test>", source)
        .expect("evaluation should succeed")
}

fn eval_error(context: &ExecutionContext, source: &str) -> Diagnostic {
    match context.eval_script("<test>", source) {
        Ok(value) => panic!("expected error, received value {value:?}"),
        Err(diagnostic) => diagnostic,
    }
}

#[test]
fn module_exports_reassignment_is_returned() {
    let dir = workspace(&[("lib.js", "module.exports = {a:1};")]);
    let (context, _) = context_in(dir.path());
    let module = context.load_module("lib").expect("load lib");
    assert_eq!(module.json.as_deref(), Some(r#"{"a":1}"#));
    assert_eq!(module.entries.get("a"), Some(&Some("1".to_string())));
}

#[test]
fn exports_mutated_in_place_are_returned() {
    let dir = workspace(&[("lib.js", "exports.answer = 42;\nexports.name = 'lib';\n")]);
    let (context, _) = context_in(dir.path());
    let module = context.load_module("lib").expect("load lib");
    let keys: Vec<_> = module.entries.keys().cloned().collect();
    assert_eq!(keys, vec!["answer".to_string(), "name".to_string()]);
    assert_eq!(module.json.as_deref(), Some(r#"{"answer":42,"name":"lib"}"#));
}

#[test]
fn exports_reflect_state_when_body_finishes() {
    let dir = workspace(&[(
        "late.js",
        "exports.early = 1;\nmodule.exports = { late: true };\nmodule.exports.later = 2;\n",
    )]);
    let (context, _) = context_in(dir.path());
    let module = context.load_module("late").expect("load late");
    assert_eq!(module.json.as_deref(), Some(r#"{"late":true,"later":2}"#));
}

#[test]
fn primitive_exports_have_no_entries() {
    let dir = workspace(&[("answer.js", "module.exports = 42;")]);
    let (context, _) = context_in(dir.path());
    let module = context.load_module("answer").expect("load answer");
    assert_eq!(module.display.as_deref(), Some("42"));
    assert!(module.entries.is_empty());
}

#[test]
fn nested_require_keeps_exports_per_load() {
    let dir = workspace(&[
        (
            "outer.js",
            "exports.name = 'outer';\nconst inner = require('inner');\nexports.fromInner = inner.name;\n",
        ),
        ("inner.js", "exports.name = 'inner';\n"),
    ]);
    let (context, _) = context_in(dir.path());
    let module = context.load_module("outer").expect("load outer");
    assert_eq!(
        module.json.as_deref(),
        Some(r#"{"name":"outer","fromInner":"inner"}"#)
    );
}

#[test]
fn verdemod_and_require_load_the_same_module() {
    let dir = workspace(&[("greet.js", "module.exports = (who) => 'hi ' + who;")]);
    let (context, _) = context_in(dir.path());
    assert_eq!(eval(&context, "verdemod('greet')('there')").as_deref(), Some("hi there"));
    assert_eq!(eval(&context, "require('greet')('you')").as_deref(), Some("hi you"));
}

#[test]
fn every_require_reloads_the_module() {
    let dir = workspace(&[("counter.js", "globalThis.loads = (globalThis.loads || 0) + 1;\n")]);
    let (context, _) = context_in(dir.path());
    eval(&context, "require('counter'); require('counter');");
    assert_eq!(eval(&context, "loads").as_deref(), Some("2"));
}

#[test]
fn throwing_module_yields_no_exports() {
    let dir = workspace(&[("broken.js", "exports.partial = 1;\nthrow new Error('boom');\n")]);
    let (context, _) = context_in(dir.path());
    let err = context.load_module("broken").expect_err("load should fail");
    assert_eq!(err.kind, ErrorKind::Runtime);
    assert!(err.message.contains("boom"), "{err}");
}

#[test]
fn module_syntax_error_is_a_compile_error() {
    let dir = workspace(&[("bad.js", "module.exports = {;\n")]);
    let (context, _) = context_in(dir.path());
    let err = context.load_module("bad").expect_err("load should fail");
    assert_eq!(err.kind, ErrorKind::Compile);
    assert_eq!(err.line, None);
    assert!(err.unit.as_deref().is_some_and(|unit| unit.ends_with("bad.js")), "{err}");
}

#[test]
fn module_syntax_error_reports_the_module_line() {
    let dir = workspace(&[("bad.js", "exports.a = 1;\nexports.b = 2;\nexports.c = ;\n")]);
    let (context, _) = context_in(dir.path());
    let err = context.load_module("bad").expect_err("load should fail");
    assert_eq!(err.kind, ErrorKind::Compile);
    assert_eq!(err.line, Some(3));
}

#[test]
fn missing_module_is_file_not_found() {
    let dir = workspace(&[]);
    let (context, _) = context_in(dir.path());
    let err = context.load_module("nowhere").expect_err("load should fail");
    assert_eq!(err.kind, ErrorKind::FileNotFound);
}

#[test]
fn failed_require_surfaces_in_the_calling_script() {
    let dir = workspace(&[]);
    let (context, _) = context_in(dir.path());
    let err = eval_error(&context, "require('nowhere')");
    assert_eq!(err.kind, ErrorKind::Runtime);
    assert!(err.message.contains("FileNotFound"), "{err}");
}

#[test]
fn caught_require_failure_does_not_abort_the_script() {
    let dir = workspace(&[]);
    let (context, _) = context_in(dir.path());
    let value = eval(
        &context,
        "let status = 'loaded';\ntry { require('nowhere'); } catch (e) { status = 'missing'; }\nstatus",
    );
    assert_eq!(value.as_deref(), Some("missing"));
}

#[test]
fn multi_line_errors_carry_the_line() {
    let dir = workspace(&[]);
    let (context, _) = context_in(dir.path());
    let err = eval_error(&context, "let a = 1;\nlet b = 2;\nnull.x;\n");
    assert_eq!(err.kind, ErrorKind::Runtime);
    assert_eq!(err.line, Some(3));
    assert_eq!(err.unit.as_deref(), Some("<test>"));
}

#[test]
fn single_line_errors_have_no_line() {
    let dir = workspace(&[]);
    let (context, _) = context_in(dir.path());
    let err = eval_error(&context, "null.x");
    assert_eq!(err.line, None);
    assert!(err.message.starts_with("TypeError"), "{err}");
}

#[test]
fn syntax_errors_are_compile_errors() {
    let dir = workspace(&[]);
    let (context, _) = context_in(dir.path());
    let err = eval_error(&context, "let = ;");
    assert_eq!(err.kind, ErrorKind::Compile);
    assert_eq!(err.line, None);
}

#[test]
fn multi_line_syntax_errors_carry_the_line() {
    let dir = workspace(&[]);
    let (context, _) = context_in(dir.path());
    let err = eval_error(&context, "let a = 1;\nlet b = 2;\nlet = ;\n");
    assert_eq!(err.kind, ErrorKind::Compile);
    assert_eq!(err.line, Some(3));
}

#[test]
fn thrown_primitives_are_rendered() {
    let dir = workspace(&[]);
    let (context, _) = context_in(dir.path());
    let err = eval_error(&context, "throw 42");
    assert_eq!(err.kind, ErrorKind::Runtime);
    assert_eq!(err.message, "42");
}

#[test]
fn undefined_results_render_as_no_value() {
    let dir = workspace(&[]);
    let (context, _) = context_in(dir.path());
    assert_eq!(eval(&context, "let x = 1;"), None);
    assert_eq!(eval(&context, "null").as_deref(), Some("null"));
    assert_eq!(eval(&context, "[1, 2]").as_deref(), Some("1,2"));
}

#[test]
fn print_functions_join_arguments_with_spaces() {
    let dir = workspace(&[]);
    let (context, captured) = context_in(dir.path());
    eval(&context, "console.log('a', 1, true); print('p'); console.error('bad', 2);");
    assert_eq!(captured.stdout(), "a 1 true\np\n");
    assert_eq!(captured.stderr(), "bad 2\n");
}

#[test]
fn reinstalling_bindings_is_a_no_op() {
    let dir = workspace(&[]);
    let (context, captured) = context_in(dir.path());
    eval(&context, "console.marker = 'kept';");
    assert!(!context.install_bindings().expect("install"));
    eval(&context, "console.log(console.marker)");
    assert_eq!(captured.stdout(), "kept\n");
}

#[test]
fn native_module_entry_resolves_imports() {
    let dir = workspace(&[
        ("dep.js", "export const value = 41;\n"),
        ("main.mjs", "import { value } from 'dep';\nconsole.log(value + 1);\n"),
    ]);
    let (context, captured) = context_in(dir.path());
    let unit = context
        .resolver()
        .resolve_path(&dir.path().join("main.mjs"), Request::Entry(EntryMode::Auto))
        .expect("resolve entry");
    assert_eq!(unit.kind(), UnitKind::NativeModule);
    assert_eq!(context.evaluate(&unit), Ok(None));
    assert_eq!(captured.stdout(), "42\n");
}

#[test]
fn native_module_missing_import_is_reported() {
    let dir = workspace(&[("main.mjs", "import { value } from 'absent';\nconsole.log(value);\n")]);
    let (context, captured) = context_in(dir.path());
    let unit = context
        .resolver()
        .resolve_path(&dir.path().join("main.mjs"), Request::Entry(EntryMode::Auto))
        .expect("resolve entry");
    assert!(context.evaluate(&unit).is_err());
    assert_eq!(captured.stdout(), "");
}

#[test]
fn jsx_modules_are_transpiled_before_loading() {
    let dir = workspace(&[(
        "view.jsx",
        "module.exports = <div id=\"x\">hi {name}</div>;\n",
    )]);
    let (context, _) = context_in(dir.path());
    eval(
        &context,
        "globalThis.React = { createElement: (type, props, ...children) => ({ type, props, children }) };\nglobalThis.name = 'you';",
    );
    let module = context.load_module("view.jsx").expect("load view");
    assert_eq!(
        module.json.as_deref(),
        Some(r#"{"type":"div","props":{"id":"x"},"children":["hi ","you"]}"#)
    );
}

#[test]
fn jsx_failures_are_transpile_failures() {
    let dir = workspace(&[("broken.jsx", "module.exports = <div>;\n")]);
    let (context, _) = context_in(dir.path());
    let err = context.load_module("broken.jsx").expect_err("load should fail");
    assert_eq!(err.kind, ErrorKind::TranspileFailure);
}

#[test]
fn batch_lines_report_per_line() {
    let dir = workspace(&[]);
    let (context, captured) = context_in(dir.path());
    let reports = batch::run(&context, "ops.js", "no;\nop;\n");
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].line, 1);
    assert_eq!(reports[1].line, 2);
    for report in &reports {
        let err = report.outcome.as_ref().expect_err("undefined names throw");
        assert_eq!(err.kind, ErrorKind::Runtime);
    }
    let stderr = captured.stderr();
    assert!(stderr.contains("[line 1]"), "{stderr}");
    assert!(stderr.contains("[line 2]"), "{stderr}");
}

#[test]
fn batch_lines_share_state_and_count_blank_lines() {
    let dir = workspace(&[]);
    let (context, captured) = context_in(dir.path());
    let reports = batch::run(&context, "calc.js", "var a = 2;\n\na * 3\n");
    let lines: Vec<_> = reports.iter().map(|report| report.line).collect();
    assert_eq!(lines, vec![1, 3]);
    assert_eq!(reports[1].outcome, Ok(Some("6".to_string())));
    assert_eq!(captured.stdout(), "6\n");
}

#[test]
fn batch_lines_break_statements_spanning_lines() {
    let dir = workspace(&[]);
    let (context, _) = context_in(dir.path());
    let reports = batch::run(&context, "fn.js", "function f() {\n  return 1;\n}\n");
    let err = reports[0].outcome.as_ref().expect_err("first line is incomplete");
    assert_eq!(err.kind, ErrorKind::Compile);
}
