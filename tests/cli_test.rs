// Command-line tests: exit codes, stream separation and flags

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

fn script(source: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(source.as_bytes()).unwrap();
    file
}

fn linetrace() -> Command {
    let mut cmd = Command::cargo_bin("linetrace").unwrap();
    cmd.env_remove("LINETRACE_LOG");
    cmd
}

#[test]
fn test_traces_script() {
    let file = script("a = 1\n");
    linetrace()
        .arg(file.path())
        .assert()
        .success()
        .stdout("--> <module>\n  <no variables>\n  a = 1\n<-- <module> (returned None)\n")
        .stderr("");
}

#[test]
fn test_missing_file() {
    linetrace()
        .arg("/no/such/dir/script.py")
        .assert()
        .code(2)
        .stdout("")
        .stderr(predicate::str::contains("can't open file '/no/such/dir/script.py'"));
}

#[test]
fn test_missing_argument_is_usage_error() {
    linetrace()
        .assert()
        .failure()
        .stdout("")
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_syntax_error() {
    let file = script("x = 1\nif x\n    pass\n");
    linetrace()
        .arg(file.path())
        .assert()
        .code(1)
        .stdout("")
        .stderr(predicate::str::contains(", line 2\n    if x\n"))
        .stderr(predicate::str::contains("SyntaxError: "));
}

#[test]
fn test_uncaught_exception() {
    let file = script("x = 1\ny = x / 0\n");
    linetrace()
        .arg(file.path())
        .assert()
        .code(1)
        .stdout(predicate::str::contains("  --- exception ---\n  ZeroDivisionError: division by zero\n"))
        .stdout(predicate::str::ends_with("<-- <module> (returned None)\n"))
        .stderr(predicate::str::starts_with("Traceback (most recent call last):\n"))
        .stderr(predicate::str::contains("    y = x / 0\n"))
        .stderr(predicate::str::ends_with("ZeroDivisionError: division by zero\n"));
}

#[test]
fn test_exit_status() {
    let file = script("a = 1\nexit(3)\nb = 2\n");
    linetrace()
        .arg(file.path())
        .assert()
        .code(3)
        .stdout(predicate::str::contains("b = 2").not())
        .stderr("");

    let file = script("exit('goodbye')\n");
    linetrace().arg(file.path()).assert().code(1).stderr("goodbye\n");

    let file = script("exit()\n");
    linetrace().arg(file.path()).assert().success().stderr("");
}

#[test]
fn test_verbose_lists_source() {
    let file = script("a = 1\n");
    linetrace()
        .arg("-v")
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::starts_with(format!(
            "{} CODE {}\n   1 a = 1\n",
            "-".repeat(27),
            "-".repeat(27)
        )))
        .stdout(predicate::str::contains("Stack (top frame first):"));
}

#[test]
fn test_color_flag() {
    let file = script("a = 1\n");
    linetrace()
        .args(["--color", "always"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("\u{1b}["));

    // Captured output is not a terminal
    linetrace()
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("\u{1b}[").not());
}

#[test]
fn test_repeated_runs_are_identical() {
    let file = script("def f(n):\n    if n == 0:\n        return 1\n    return n * f(n - 1)\nprint(f(5))\n");
    let first = linetrace().arg(file.path()).output().unwrap();
    let second = linetrace().arg(file.path()).output().unwrap();
    assert!(first.status.success());
    assert_eq!(first.stdout, second.stdout);
}

#[test]
fn test_huge_repetition_is_a_script_error() {
    let file = script("s = 'a' * 10 ** 18\n");
    linetrace()
        .arg(file.path())
        .assert()
        .code(1)
        .stderr(predicate::str::ends_with("MemoryError\n"));
}

#[test]
fn test_help_describes_dunder_prefix() {
    linetrace()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Show names that start with `__`"));
}
