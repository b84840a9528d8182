// Integration tests for the tracer: whole scripts in, exact trace output out

use linetrace::tracer::{trace_source, ColorChoice, TraceError, TraceOptions};
use linetrace::Terminal;
use pretty_assertions::assert_eq;

fn plain() -> TraceOptions {
    TraceOptions {
        color: ColorChoice::Never,
        ..TraceOptions::default()
    }
}

fn run(source: &str, options: &TraceOptions) -> (Result<(), TraceError>, String) {
    let (terminal, buffer) = Terminal::capture();
    let result = trace_source(source, "script.py", options, terminal);
    (result, buffer.contents())
}

fn trace(source: &str) -> String {
    let (result, out) = run(source, &plain());
    assert!(result.is_ok(), "script failed: {:?}", result);
    out
}

fn lines(expected: &[&str]) -> String {
    expected.iter().map(|line| format!("{}\n", line)).collect()
}

#[test]
fn test_empty_script() {
    assert_eq!(
        trace(""),
        lines(&["--> <module>", "  <no variables>", "<-- <module> (returned None)"])
    );
}

#[test]
fn test_function_call_is_nested() {
    let source = "def f():\n    return 5\nf()\n";
    assert_eq!(
        trace(source),
        lines(&[
            "--> <module>",
            "  <no variables>",
            "  --> f",
            "    <no variables>",
            "  <-- f (returned 5)",
            "<-- <module> (returned None)",
        ])
    );
}

#[test]
fn test_locals_shadow_module_names() {
    let source = "def f(x):\n    y = x + 1\n    return y\na = f(4)\n";
    assert_eq!(
        trace(source),
        lines(&[
            "--> <module>",
            "  <no variables>",
            "  --> f",
            "    x = 4",
            "    x = 4, y = 5",
            "  <-- f (returned 5)",
            "  a = 5",
            "<-- <module> (returned None)",
        ])
    );

    let source = "x = 'outer'\ndef f(x):\n    return x\nf('inner')\n";
    let out = trace(source);
    assert!(out.contains("    x = 'inner'\n"), "{}", out);
}

#[test]
fn test_loop_prints_each_change() {
    let source = "total = 0\nfor i in range(3):\n    total += i\n";
    assert_eq!(
        trace(source),
        lines(&[
            "--> <module>",
            "  <no variables>",
            "  total = 0",
            "  total = 0, i = 0",
            "  total = 0, i = 1",
            "  total = 1, i = 1",
            "  total = 1, i = 2",
            "  total = 3, i = 2",
            "<-- <module> (returned None)",
        ])
    );
}

#[test]
fn test_module_changes_lag_inside_calls() {
    let source = "def bump():\n    global n\n    n = 5\n    return n\nn = 1\nbump()\n";
    assert_eq!(
        trace(source),
        lines(&[
            "--> <module>",
            "  <no variables>",
            "  n = 1",
            "  --> bump",
            "    n = 1",
            "  <-- bump (returned 5)",
            "  n = 5",
            "<-- <module> (returned None)",
        ])
    );
}

#[test]
fn test_live_globals_refresh_inside_calls() {
    let source = "def bump():\n    global n\n    n = 5\n    return n\nn = 1\nbump()\n";
    let options = TraceOptions {
        live_globals: true,
        ..plain()
    };
    let (result, out) = run(source, &options);
    assert!(result.is_ok());
    assert_eq!(
        out,
        lines(&[
            "--> <module>",
            "  <no variables>",
            "  n = 1",
            "  --> bump",
            "    n = 1",
            "    n = 5",
            "  <-- bump (returned 5)",
            "<-- <module> (returned None)",
        ])
    );
}

#[test]
fn test_caller_view_reprinted_after_return() {
    let source = "x = 1\ndef f():\n    z = 3\n    return z\nf()\nprint(x)\n";
    assert_eq!(
        trace(source),
        lines(&[
            "--> <module>",
            "  <no variables>",
            "  x = 1",
            "  --> f",
            "    x = 1",
            "    z = 3, x = 1",
            "  <-- f (returned 3)",
            "  x = 1",
            "1",
            "<-- <module> (returned None)",
        ])
    );
}

#[test]
fn test_shown_name_rebound_to_hidden_value() {
    let source = "x = 1\nx = len\nprint(x)\n";
    assert_eq!(
        trace(source),
        lines(&[
            "--> <module>",
            "  <no variables>",
            "  x = 1",
            "  x = <built-in function len>",
            "<built-in function len>",
            "<-- <module> (returned None)",
        ])
    );
}

#[test]
fn test_deleted_name_keeps_last_value() {
    let source = "a = 1\nb = 2\ndel a\nprint(b)\n";
    assert_eq!(
        trace(source),
        lines(&[
            "--> <module>",
            "  <no variables>",
            "  a = 1",
            "  a = 1, b = 2",
            "2",
            "<-- <module> (returned None)",
        ])
    );
}

#[test]
fn test_library_frames_are_not_traced() {
    let source = "def double(x):\n    return x * 2\nr = map(double, [1, 2])\n";
    assert_eq!(
        trace(source),
        lines(&[
            "--> <module>",
            "  <no variables>",
            "  --> double",
            "    x = 1",
            "  <-- double (returned 2)",
            "  --> double",
            "    x = 2",
            "  <-- double (returned 4)",
            "  r = [2, 4]",
            "<-- <module> (returned None)",
        ])
    );
}

#[test]
fn test_print_output_interleaves() {
    let source = "a = 1\nprint('hello', a)\n";
    assert_eq!(
        trace(source),
        lines(&[
            "--> <module>",
            "  <no variables>",
            "  a = 1",
            "hello 1",
            "<-- <module> (returned None)",
        ])
    );
}

#[test]
fn test_handled_exception() {
    let source = "try:\n    x = 1 / 0\nexcept ZeroDivisionError:\n    x = 0\n";
    assert_eq!(
        trace(source),
        lines(&[
            "--> <module>",
            "  <no variables>",
            "  --- exception ---",
            "  ZeroDivisionError: division by zero",
            "  x = 0",
            "<-- <module> (returned None)",
        ])
    );
}

#[test]
fn test_exception_reported_in_every_frame() {
    let source = "def f():\n    return [][0]\nf()\n";
    let (result, out) = run(source, &plain());
    assert_eq!(
        out,
        lines(&[
            "--> <module>",
            "  <no variables>",
            "  --> f",
            "    <no variables>",
            "    --- exception ---",
            "    IndexError: list index out of range",
            "  <-- f (returned None)",
            "  --- exception ---",
            "  IndexError: list index out of range",
            "<-- <module> (returned None)",
        ])
    );

    let err = result.unwrap_err();
    assert_eq!(err.exit_code(), 1);
    assert_eq!(
        err.report().unwrap(),
        lines(&[
            "Traceback (most recent call last):",
            "  File \"script.py\", line 3, in <module>",
            "    f()",
            "  File \"script.py\", line 2, in f",
            "    return [][0]",
            "IndexError: list index out of range",
        ])
    );
}

#[test]
fn test_dunders_are_opt_in() {
    let source = "__secret__ = 1\nx = 2\n";
    assert_eq!(
        trace(source),
        lines(&["--> <module>", "  <no variables>", "  x = 2", "<-- <module> (returned None)"])
    );

    let options = TraceOptions {
        display_dunders: true,
        ..plain()
    };
    let (_, out) = run(source, &options);
    assert!(out.contains("__name__ = '__main__'"), "{}", out);
    assert!(out.contains("__secret__ = 1, x = 2"), "{}", out);
}

#[test]
fn test_unrepresentables_are_opt_in() {
    let source = "def f():\n    return len\nx = f()\n";
    assert_eq!(
        trace(source),
        lines(&[
            "--> <module>",
            "  <no variables>",
            "  --> f",
            "    <no variables>",
            "  <-- f (returned <built-in function len>)",
            "<-- <module> (returned None)",
        ])
    );

    let options = TraceOptions {
        display_unrepresentables: true,
        ..plain()
    };
    let (_, out) = run(source, &options);
    assert!(out.contains("    f = <function f>\n"), "{}", out);
    assert!(out.contains("  f = <function f>, x = <built-in function len>\n"), "{}", out);
}

#[test]
fn test_shared_list_renders_current_contents() {
    let source = "xs = []\ndef push(v):\n    xs.append(v)\npush(1)\n";
    let out = trace(source);
    assert!(out.contains("  --> push\n    v = 1, xs = []\n    v = 1, xs = [1]\n  <-- push (returned None)\n"), "{}", out);
    assert!(out.contains("  xs = [1]\n<-- <module>"), "{}", out);
}

#[test]
fn test_recursion_limit() {
    let source = "def down(n):\n    return down(n + 1)\ndown(0)\n";
    let options = TraceOptions {
        recursion_limit: 20,
        ..plain()
    };
    let (result, out) = run(source, &options);
    let err = result.unwrap_err();
    assert_eq!(err.exit_code(), 1);
    assert!(err
        .report()
        .unwrap()
        .ends_with("RecursionError: maximum recursion depth exceeded\n"));
    assert!(out.ends_with("<-- <module> (returned None)\n"));
}

#[test]
fn test_output_is_deterministic() {
    let source = "d = {'b': 1, 'a': [1, 2.5, None]}\ndef f(k):\n    return d[k]\nfor k in sorted(d):\n    f(k)\n";
    assert_eq!(trace(source), trace(source));
}
