//! Script exception types
//!
//! This module defines [`ScriptError`], which represents an exception raised by a
//! running script (as opposed to parse errors). Unlike a fatal runtime error, a
//! `ScriptError` can be caught by the script's own `try`/`except`; only when it
//! escapes the module frame does it end the run, at which point its collected
//! traceback is printed.

use crate::memory::value::{SnapshotError, Value};
use crate::parser::ast::SourceLocation;
use std::fmt::Write as _;
use std::rc::Rc;

/// Built-in exception classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExceptionKind {
    BaseException,
    Exception,
    SystemExit,
    ArithmeticError,
    ZeroDivisionError,
    OverflowError,
    LookupError,
    IndexError,
    KeyError,
    NameError,
    UnboundLocalError,
    TypeError,
    ValueError,
    AttributeError,
    AssertionError,
    MemoryError,
    RuntimeError,
    RecursionError,
    StopIteration,
}

impl ExceptionKind {
    pub const ALL: [ExceptionKind; 19] = [
        ExceptionKind::BaseException,
        ExceptionKind::Exception,
        ExceptionKind::SystemExit,
        ExceptionKind::ArithmeticError,
        ExceptionKind::ZeroDivisionError,
        ExceptionKind::OverflowError,
        ExceptionKind::LookupError,
        ExceptionKind::IndexError,
        ExceptionKind::KeyError,
        ExceptionKind::NameError,
        ExceptionKind::UnboundLocalError,
        ExceptionKind::TypeError,
        ExceptionKind::ValueError,
        ExceptionKind::AttributeError,
        ExceptionKind::AssertionError,
        ExceptionKind::MemoryError,
        ExceptionKind::RuntimeError,
        ExceptionKind::RecursionError,
        ExceptionKind::StopIteration,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ExceptionKind::BaseException => "BaseException",
            ExceptionKind::Exception => "Exception",
            ExceptionKind::SystemExit => "SystemExit",
            ExceptionKind::ArithmeticError => "ArithmeticError",
            ExceptionKind::ZeroDivisionError => "ZeroDivisionError",
            ExceptionKind::OverflowError => "OverflowError",
            ExceptionKind::LookupError => "LookupError",
            ExceptionKind::IndexError => "IndexError",
            ExceptionKind::KeyError => "KeyError",
            ExceptionKind::NameError => "NameError",
            ExceptionKind::UnboundLocalError => "UnboundLocalError",
            ExceptionKind::TypeError => "TypeError",
            ExceptionKind::ValueError => "ValueError",
            ExceptionKind::AttributeError => "AttributeError",
            ExceptionKind::AssertionError => "AssertionError",
            ExceptionKind::MemoryError => "MemoryError",
            ExceptionKind::RuntimeError => "RuntimeError",
            ExceptionKind::RecursionError => "RecursionError",
            ExceptionKind::StopIteration => "StopIteration",
        }
    }

    pub fn parent(self) -> Option<ExceptionKind> {
        use ExceptionKind::*;
        match self {
            BaseException => None,
            Exception | SystemExit => Some(BaseException),
            ZeroDivisionError | OverflowError => Some(ArithmeticError),
            IndexError | KeyError => Some(LookupError),
            UnboundLocalError => Some(NameError),
            RecursionError => Some(RuntimeError),
            ArithmeticError | LookupError | NameError | TypeError | ValueError
            | AttributeError | AssertionError | MemoryError | RuntimeError | StopIteration => {
                Some(Exception)
            }
        }
    }

    /// Whether an `except other:` clause catches this kind
    pub fn is_subclass_of(self, other: ExceptionKind) -> bool {
        let mut kind = Some(self);
        while let Some(k) = kind {
            if k == other {
                return true;
            }
            kind = k.parent();
        }
        false
    }
}

/// An exception instance: its class and constructor arguments
#[derive(Debug, Clone, PartialEq)]
pub struct ExceptionValue {
    pub kind: ExceptionKind,
    pub args: Vec<Value>,
}

impl ExceptionValue {
    pub fn new(kind: ExceptionKind, args: Vec<Value>) -> Self {
        ExceptionValue { kind, args }
    }

    /// `str()` of the exception
    pub fn message(&self) -> Result<String, SnapshotError> {
        match self.args.as_slice() {
            [] => Ok(String::new()),
            [key] if self.kind == ExceptionKind::KeyError => key.repr(),
            [arg] => arg.to_str(),
            args => Value::tuple(args.to_vec()).repr(),
        }
    }

    /// `Kind: message`, or just `Kind` for an empty message
    pub fn summary(&self) -> String {
        let message = self
            .message()
            .unwrap_or_else(|_| "<exception str() failed>".to_string());
        if message.is_empty() {
            self.kind.name().to_string()
        } else {
            format!("{}: {}", self.kind.name(), message)
        }
    }
}

/// One frame an exception unwound through
#[derive(Debug, Clone, PartialEq)]
pub struct TracebackEntry {
    pub filename: Rc<str>,
    pub function: String,
    pub line: usize,
}

/// A raised script exception
#[derive(Debug, Clone, thiserror::Error)]
#[error("{}", .exception.summary())]
pub struct ScriptError {
    pub exception: Rc<ExceptionValue>,
    pub location: SourceLocation,
    /// Innermost frame first
    pub traceback: Vec<TracebackEntry>,
    /// Frame id that already fired an exception event for this error
    pub(crate) reported_in: Option<u64>,
}

impl ScriptError {
    /// Raise `kind` with a single message argument
    pub fn new(kind: ExceptionKind, message: impl Into<String>, location: SourceLocation) -> Self {
        let message: String = message.into();
        Self::raise(
            Rc::new(ExceptionValue::new(kind, vec![Value::str(&message)])),
            location,
        )
    }

    /// Raise an existing exception instance
    pub fn raise(exception: Rc<ExceptionValue>, location: SourceLocation) -> Self {
        ScriptError {
            exception,
            location,
            traceback: Vec::new(),
            reported_in: None,
        }
    }

    pub fn kind(&self) -> ExceptionKind {
        self.exception.kind
    }

    pub fn type_error(message: impl Into<String>, location: SourceLocation) -> Self {
        Self::new(ExceptionKind::TypeError, message, location)
    }

    pub fn value_error(message: impl Into<String>, location: SourceLocation) -> Self {
        Self::new(ExceptionKind::ValueError, message, location)
    }

    pub fn index_error(message: impl Into<String>, location: SourceLocation) -> Self {
        Self::new(ExceptionKind::IndexError, message, location)
    }

    pub fn overflow(location: SourceLocation) -> Self {
        Self::new(
            ExceptionKind::OverflowError,
            "integer result out of 64-bit range",
            location,
        )
    }

    /// A value too large to build
    pub fn memory(location: SourceLocation) -> Self {
        Self::raise(
            Rc::new(ExceptionValue::new(ExceptionKind::MemoryError, Vec::new())),
            location,
        )
    }

    pub fn zero_division(message: impl Into<String>, location: SourceLocation) -> Self {
        Self::new(ExceptionKind::ZeroDivisionError, message, location)
    }

    pub fn key_error(key: Value, location: SourceLocation) -> Self {
        Self::raise(
            Rc::new(ExceptionValue::new(ExceptionKind::KeyError, vec![key])),
            location,
        )
    }

    pub fn unhashable(type_name: &str, location: SourceLocation) -> Self {
        Self::type_error(format!("unhashable type: '{}'", type_name), location)
    }

    /// Map a failed stringification onto the exception a script sees
    pub fn from_snapshot(err: SnapshotError, location: SourceLocation) -> Self {
        Self::new(ExceptionKind::RecursionError, err.to_string(), location)
    }

    /// Render a traceback, most recent call last
    ///
    /// `source_line` looks up the text of a line in a file, if available.
    pub fn render_traceback(&self, source_line: impl Fn(&str, usize) -> Option<String>) -> String {
        let mut out = String::from("Traceback (most recent call last):\n");
        for entry in self.traceback.iter().rev() {
            let _ = writeln!(
                out,
                "  File \"{}\", line {}, in {}",
                entry.filename, entry.line, entry.function
            );
            if let Some(text) = source_line(&entry.filename, entry.line) {
                let text = text.trim();
                if !text.is_empty() {
                    let _ = writeln!(out, "    {}", text);
                }
            }
        }
        out.push_str(&self.exception.summary());
        out.push('\n');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hierarchy() {
        assert!(ExceptionKind::ZeroDivisionError.is_subclass_of(ExceptionKind::ArithmeticError));
        assert!(ExceptionKind::KeyError.is_subclass_of(ExceptionKind::Exception));
        assert!(ExceptionKind::RecursionError.is_subclass_of(ExceptionKind::RuntimeError));
        assert!(!ExceptionKind::SystemExit.is_subclass_of(ExceptionKind::Exception));
        assert!(ExceptionKind::SystemExit.is_subclass_of(ExceptionKind::BaseException));
        assert!(!ExceptionKind::Exception.is_subclass_of(ExceptionKind::ValueError));
    }

    #[test]
    fn test_messages() {
        let err = ScriptError::new(ExceptionKind::ValueError, "bad value", SourceLocation::default());
        assert_eq!(err.to_string(), "ValueError: bad value");

        let key = ScriptError::key_error(Value::str("k"), SourceLocation::default());
        assert_eq!(key.to_string(), "KeyError: 'k'");

        let bare = ExceptionValue::new(ExceptionKind::AssertionError, vec![]);
        assert_eq!(bare.summary(), "AssertionError");

        let many = ExceptionValue::new(ExceptionKind::Exception, vec![Value::Int(1), Value::str("a")]);
        assert_eq!(many.summary(), "Exception: (1, 'a')");
    }

    #[test]
    fn test_traceback_rendering() {
        let mut err = ScriptError::zero_division("division by zero", SourceLocation::default());
        err.traceback.push(TracebackEntry {
            filename: Rc::from("t.py"),
            function: "f".to_string(),
            line: 2,
        });
        err.traceback.push(TracebackEntry {
            filename: Rc::from("t.py"),
            function: "<module>".to_string(),
            line: 3,
        });

        let source = ["def f():", "    return 1 / 0", "f()"];
        let rendered = err.render_traceback(|_, line| source.get(line - 1).map(|s| s.to_string()));
        assert_eq!(
            rendered,
            "Traceback (most recent call last):\n  File \"t.py\", line 3, in <module>\n    f()\n  File \"t.py\", line 2, in f\n    return 1 / 0\nZeroDivisionError: division by zero\n"
        );
    }
}
