//! Built-in function implementations
//!
//! This module provides the native built-ins that scripts can call without
//! defining them. The remaining library functions (`sum`, `sorted`, `map`, ...)
//! are written in the scripting language itself and live in `prelude`.
//!
//! # Supported Built-ins
//!
//! - `print(*args, sep=' ', end='\n')`: output to the terminal
//! - `len`, `abs`, `min`, `max` (with `key=` and `default=`), `chr`, `ord`
//! - Type conversions: `str`, `repr`, `int`, `float`, `bool`, `list`, `tuple`, `dict`
//! - `range(stop)` / `range(start, stop[, step])`
//! - `exit([code])`: raises `SystemExit`
//!
//! # Implementation Notes
//!
//! - Conversions that are types (`int`, `list`, ...) repr as `<class 'int'>`
//! - Only `print`, `min`, `max` and `dict` accept keyword arguments

use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::{ExceptionKind, ExceptionValue, ScriptError};
use crate::memory::value::{Dict, RangeValue, Value};
use crate::parser::ast::SourceLocation;
use std::num::IntErrorKind;
use std::rc::Rc;

/// Native built-in functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Print,
    Len,
    Range,
    Str,
    Repr,
    Int,
    Float,
    Bool,
    Abs,
    Min,
    Max,
    List,
    Tuple,
    Dict,
    Chr,
    Ord,
    Exit,
}

impl Builtin {
    pub const ALL: [Builtin; 17] = [
        Builtin::Print,
        Builtin::Len,
        Builtin::Range,
        Builtin::Str,
        Builtin::Repr,
        Builtin::Int,
        Builtin::Float,
        Builtin::Bool,
        Builtin::Abs,
        Builtin::Min,
        Builtin::Max,
        Builtin::List,
        Builtin::Tuple,
        Builtin::Dict,
        Builtin::Chr,
        Builtin::Ord,
        Builtin::Exit,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Print => "print",
            Builtin::Len => "len",
            Builtin::Range => "range",
            Builtin::Str => "str",
            Builtin::Repr => "repr",
            Builtin::Int => "int",
            Builtin::Float => "float",
            Builtin::Bool => "bool",
            Builtin::Abs => "abs",
            Builtin::Min => "min",
            Builtin::Max => "max",
            Builtin::List => "list",
            Builtin::Tuple => "tuple",
            Builtin::Dict => "dict",
            Builtin::Chr => "chr",
            Builtin::Ord => "ord",
            Builtin::Exit => "exit",
        }
    }

    /// Whether the built-in is a type rather than a plain function
    pub fn is_type(self) -> bool {
        matches!(
            self,
            Builtin::Range
                | Builtin::Str
                | Builtin::Int
                | Builtin::Float
                | Builtin::Bool
                | Builtin::List
                | Builtin::Tuple
                | Builtin::Dict
        )
    }

    fn accepts_keywords(self) -> bool {
        matches!(self, Builtin::Print | Builtin::Min | Builtin::Max | Builtin::Dict)
    }
}

/// Check a positional argument count against `min..=max`
pub(crate) fn check_arity(
    name: &str,
    given: usize,
    min: usize,
    max: usize,
    location: SourceLocation,
) -> Result<(), ScriptError> {
    if (min..=max).contains(&given) {
        return Ok(());
    }

    let plural = |n: usize| if n == 1 { "" } else { "s" };
    let message = if min == max && min == 1 {
        format!("{}() takes exactly one argument ({} given)", name, given)
    } else if min == max && min == 0 {
        format!("{}() takes no arguments ({} given)", name, given)
    } else if given < min {
        format!("{} expected at least {} argument{}, got {}", name, min, plural(min), given)
    } else {
        format!("{} expected at most {} argument{}, got {}", name, max, plural(max), given)
    };
    Err(ScriptError::type_error(message, location))
}

pub(crate) fn reject_keywords(
    name: &str,
    kwargs: &[(String, Value)],
    location: SourceLocation,
) -> Result<(), ScriptError> {
    if kwargs.is_empty() {
        Ok(())
    } else {
        Err(ScriptError::type_error(
            format!("{}() takes no keyword arguments", name),
            location,
        ))
    }
}

/// Require an integer argument (`bool` counts)
pub(crate) fn expect_int(value: &Value, location: SourceLocation) -> Result<i64, ScriptError> {
    value.as_int().ok_or_else(|| {
        ScriptError::type_error(
            format!("'{}' object cannot be interpreted as an integer", value.type_name()),
            location,
        )
    })
}

fn parse_int(text: &str, base: u32, location: SourceLocation) -> Result<i64, ScriptError> {
    let invalid = || {
        ScriptError::value_error(
            format!(
                "invalid literal for int() with base {}: {}",
                base,
                crate::memory::value::quote_str(text)
            ),
            location,
        )
    };

    let trimmed = text.trim();
    let digits = trimmed.trim_start_matches(['+', '-']);
    if digits.starts_with('_') || digits.ends_with('_') || digits.contains("__") {
        return Err(invalid());
    }

    i64::from_str_radix(&trimmed.replace('_', ""), base).map_err(|err| match err.kind() {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => ScriptError::new(
            ExceptionKind::OverflowError,
            "int too large to convert to 64-bit integer",
            location,
        ),
        _ => invalid(),
    })
}

fn float_to_int(x: f64, location: SourceLocation) -> Result<i64, ScriptError> {
    if x.is_nan() {
        return Err(ScriptError::value_error("cannot convert float NaN to integer", location));
    }
    if x.is_infinite() {
        return Err(ScriptError::new(
            ExceptionKind::OverflowError,
            "cannot convert float infinity to integer",
            location,
        ));
    }
    let truncated = x.trunc();
    // i64::MAX as f64 rounds up to 2^63, which is already out of range
    if truncated >= i64::MAX as f64 || truncated < i64::MIN as f64 {
        return Err(ScriptError::overflow(location));
    }
    Ok(truncated as i64)
}

impl Interpreter {
    pub(crate) fn call_builtin(
        &mut self,
        builtin: Builtin,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
        location: SourceLocation,
    ) -> Result<Value, ScriptError> {
        if !builtin.accepts_keywords() {
            reject_keywords(builtin.name(), &kwargs, location)?;
        }

        let name = builtin.name();
        match builtin {
            Builtin::Print => self.builtin_print(&args, kwargs, location),
            Builtin::Min | Builtin::Max => self.builtin_extreme(builtin, args, kwargs, location),
            Builtin::Dict => self.builtin_dict(args, kwargs, location),

            Builtin::Len => {
                check_arity(name, args.len(), 1, 1, location)?;
                let len = match &args[0] {
                    Value::Str(s) => s.chars().count(),
                    Value::List(items) => items.borrow().len(),
                    Value::Tuple(items) => items.len(),
                    Value::Dict(dict) => dict.borrow().len(),
                    Value::Range(range) => range.len(),
                    other => {
                        return Err(ScriptError::type_error(
                            format!("object of type '{}' has no len()", other.type_name()),
                            location,
                        ))
                    }
                };
                Ok(Value::Int(len as i64))
            }

            Builtin::Range => {
                check_arity(name, args.len(), 1, 3, location)?;
                let ints = args
                    .iter()
                    .map(|arg| expect_int(arg, location))
                    .collect::<Result<Vec<_>, _>>()?;
                let (start, stop, step) = match ints.as_slice() {
                    [stop] => (0, *stop, 1),
                    [start, stop] => (*start, *stop, 1),
                    [start, stop, step, ..] => (*start, *stop, *step),
                    [] => (0, 0, 1),
                };
                if step == 0 {
                    return Err(ScriptError::value_error("range() arg 3 must not be zero", location));
                }
                Ok(Value::Range(RangeValue { start, stop, step }))
            }

            Builtin::Str => {
                check_arity(name, args.len(), 0, 1, location)?;
                match args.first() {
                    Some(value) => Ok(Value::str(
                        &value.to_str().map_err(|err| ScriptError::from_snapshot(err, location))?,
                    )),
                    None => Ok(Value::str("")),
                }
            }

            Builtin::Repr => {
                check_arity(name, args.len(), 1, 1, location)?;
                let repr = args[0]
                    .repr()
                    .map_err(|err| ScriptError::from_snapshot(err, location))?;
                Ok(Value::str(&repr))
            }

            Builtin::Int => {
                check_arity(name, args.len(), 0, 2, location)?;
                match args.as_slice() {
                    [] => Ok(Value::Int(0)),
                    [Value::Float(x)] => Ok(Value::Int(float_to_int(*x, location)?)),
                    [Value::Str(s)] => Ok(Value::Int(parse_int(s, 10, location)?)),
                    [value] => value.as_int().map(Value::Int).ok_or_else(|| {
                        ScriptError::type_error(
                            format!(
                                "int() argument must be a string or a real number, not '{}'",
                                value.type_name()
                            ),
                            location,
                        )
                    }),
                    [value, base, ..] => {
                        let base = expect_int(base, location)?;
                        let Value::Str(s) = value else {
                            return Err(ScriptError::type_error(
                                "int() can't convert non-string with explicit base",
                                location,
                            ));
                        };
                        if !(2..=36).contains(&base) {
                            return Err(ScriptError::value_error(
                                "int() base must be >= 2 and <= 36",
                                location,
                            ));
                        }
                        Ok(Value::Int(parse_int(s, base as u32, location)?))
                    }
                }
            }

            Builtin::Float => {
                check_arity(name, args.len(), 0, 1, location)?;
                match args.first() {
                    None => Ok(Value::Float(0.0)),
                    Some(Value::Str(s)) => s
                        .trim()
                        .replace('_', "")
                        .parse::<f64>()
                        .map(Value::Float)
                        .map_err(|_| {
                            ScriptError::value_error(
                                format!(
                                    "could not convert string to float: {}",
                                    crate::memory::value::quote_str(s)
                                ),
                                location,
                            )
                        }),
                    Some(value) => value.as_float().map(Value::Float).ok_or_else(|| {
                        ScriptError::type_error(
                            format!(
                                "float() argument must be a string or a real number, not '{}'",
                                value.type_name()
                            ),
                            location,
                        )
                    }),
                }
            }

            Builtin::Bool => {
                check_arity(name, args.len(), 0, 1, location)?;
                Ok(Value::Bool(args.first().is_some_and(Value::is_truthy)))
            }

            Builtin::Abs => {
                check_arity(name, args.len(), 1, 1, location)?;
                match &args[0] {
                    Value::Float(x) => Ok(Value::Float(x.abs())),
                    value => match value.as_int() {
                        Some(n) => Ok(Value::Int(
                            n.checked_abs().ok_or_else(|| ScriptError::overflow(location))?,
                        )),
                        None => Err(ScriptError::type_error(
                            format!("bad operand type for abs(): '{}'", value.type_name()),
                            location,
                        )),
                    },
                }
            }

            Builtin::List | Builtin::Tuple => {
                check_arity(name, args.len(), 0, 1, location)?;
                let items = match args.first() {
                    Some(iterable) => self.collect_iterable(iterable, location)?,
                    None => Vec::new(),
                };
                Ok(if builtin == Builtin::List {
                    Value::list(items)
                } else {
                    Value::tuple(items)
                })
            }

            Builtin::Chr => {
                check_arity(name, args.len(), 1, 1, location)?;
                let code = expect_int(&args[0], location)?;
                u32::try_from(code)
                    .ok()
                    .and_then(char::from_u32)
                    .map(|c| Value::str(c.encode_utf8(&mut [0; 4])))
                    .ok_or_else(|| ScriptError::value_error("chr() arg not in range(0x110000)", location))
            }

            Builtin::Ord => {
                check_arity(name, args.len(), 1, 1, location)?;
                let Value::Str(s) = &args[0] else {
                    return Err(ScriptError::type_error(
                        format!(
                            "ord() expected string of length 1, but {} found",
                            args[0].type_name()
                        ),
                        location,
                    ));
                };
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(Value::Int(c as i64)),
                    _ => Err(ScriptError::type_error(
                        format!(
                            "ord() expected a character, but string of length {} found",
                            s.chars().count()
                        ),
                        location,
                    )),
                }
            }

            Builtin::Exit => {
                check_arity(name, args.len(), 0, 1, location)?;
                Err(ScriptError::raise(
                    Rc::new(ExceptionValue::new(ExceptionKind::SystemExit, args)),
                    location,
                ))
            }
        }
    }

    fn builtin_print(
        &mut self,
        args: &[Value],
        kwargs: Vec<(String, Value)>,
        location: SourceLocation,
    ) -> Result<Value, ScriptError> {
        let mut sep = " ".to_string();
        let mut end = "\n".to_string();

        for (key, value) in kwargs {
            let slot = match key.as_str() {
                "sep" => &mut sep,
                "end" => &mut end,
                other => {
                    return Err(ScriptError::type_error(
                        format!("'{}' is an invalid keyword argument for print()", other),
                        location,
                    ))
                }
            };
            match value {
                Value::None => {}
                Value::Str(s) => *slot = s.to_string(),
                other => {
                    return Err(ScriptError::type_error(
                        format!("{} must be None or a string, not {}", key, other.type_name()),
                        location,
                    ))
                }
            }
        }

        let mut line = String::new();
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                line.push_str(&sep);
            }
            line.push_str(&arg.to_str().map_err(|err| ScriptError::from_snapshot(err, location))?);
        }
        line.push_str(&end);

        self.terminal.write_str(&line);
        Ok(Value::None)
    }

    /// `min` and `max`
    fn builtin_extreme(
        &mut self,
        builtin: Builtin,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
        location: SourceLocation,
    ) -> Result<Value, ScriptError> {
        let name = builtin.name();
        let mut key = Value::None;
        let mut default = None;
        for (keyword, value) in kwargs {
            match keyword.as_str() {
                "key" => key = value,
                "default" => default = Some(value),
                other => {
                    return Err(ScriptError::type_error(
                        format!("'{}' is an invalid keyword argument for {}()", other, name),
                        location,
                    ))
                }
            }
        }

        let candidates = match args.len() {
            0 => return Err(ScriptError::type_error(
                format!("{} expected at least 1 argument, got 0", name),
                location,
            )),
            1 => self.collect_iterable(&args[0], location)?,
            _ => {
                if default.is_some() {
                    return Err(ScriptError::type_error(
                        format!(
                            "Cannot specify a default for {}() with multiple positional arguments",
                            name
                        ),
                        location,
                    ));
                }
                args
            }
        };

        let mut best: Option<(Value, Value)> = None;
        for candidate in candidates {
            let rank = match &key {
                Value::None => candidate.clone(),
                func => self.call_value(func, vec![candidate.clone()], Vec::new(), location)?,
            };
            let better = match &best {
                None => true,
                Some((_, best_rank)) if builtin == Builtin::Min => {
                    self.less_than(&rank, best_rank, location)?
                }
                Some((_, best_rank)) => self.less_than(best_rank, &rank, location)?,
            };
            if better {
                best = Some((candidate, rank));
            }
        }

        match (best, default) {
            (Some((value, _)), _) => Ok(value),
            (None, Some(default)) => Ok(default),
            (None, None) => Err(ScriptError::value_error(
                format!("{}() iterable argument is empty", name),
                location,
            )),
        }
    }

    fn builtin_dict(
        &mut self,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
        location: SourceLocation,
    ) -> Result<Value, ScriptError> {
        check_arity("dict", args.len(), 0, 1, location)?;
        let mut dict = Dict::new();
        if let Some(source) = args.first() {
            self.update_dict(&mut dict, source, location)?;
        }
        for (key, value) in kwargs {
            dict.insert(Value::str(&key), value)
                .map_err(|type_name| ScriptError::unhashable(type_name, location))?;
        }
        Ok(Value::dict(dict))
    }

    /// Merge a dict, or an iterable of key/value pairs, into `target`
    pub(crate) fn update_dict(
        &self,
        target: &mut Dict,
        source: &Value,
        location: SourceLocation,
    ) -> Result<(), ScriptError> {
        let entries: Vec<(Value, Value)> = match source {
            Value::Dict(other) => other
                .borrow()
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
            iterable => {
                let mut entries = Vec::new();
                for (i, item) in self.iterate(iterable, location)?.enumerate() {
                    let pair = self.iterate(&item, location).map_err(|_| {
                        ScriptError::type_error(
                            format!(
                                "cannot convert dictionary update sequence element #{} to a sequence",
                                i
                            ),
                            location,
                        )
                    })?;
                    let pair: Vec<Value> = pair.collect();
                    let [key, value] = <[Value; 2]>::try_from(pair).map_err(|pair| {
                        ScriptError::value_error(
                            format!(
                                "dictionary update sequence element #{} has length {}; 2 is required",
                                i,
                                pair.len()
                            ),
                            location,
                        )
                    })?;
                    entries.push((key, value));
                }
                entries
            }
        };

        for (key, value) in entries {
            target
                .insert(key, value)
                .map_err(|type_name| ScriptError::unhashable(type_name, location))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::interpreter::engine::Interpreter;
    use crate::interpreter::errors::ScriptError;
    use crate::parser::parse_program;
    use crate::terminal::Terminal;

    fn run(source: &str) -> Result<String, ScriptError> {
        let (terminal, buffer) = Terminal::capture();
        let program = parse_program(source).unwrap();
        Interpreter::new(terminal).run(&program, "test.py")?;
        Ok(buffer.contents())
    }

    fn error(source: &str) -> String {
        run(source).unwrap_err().to_string()
    }

    #[test]
    fn test_print_keywords() {
        assert_eq!(run("print(1, 'a', None, sep='-', end='!\\n')\n").unwrap(), "1-a-None!\n");
        assert_eq!(run("print()\nprint('x', end='')\n").unwrap(), "\nx");
        assert_eq!(
            error("print(1, sep=2)\n"),
            "TypeError: sep must be None or a string, not int"
        );
    }

    #[test]
    fn test_conversions() {
        let out = run("print(int('  -42 '), int(3.9), int('ff', 16), float('1.5'), str(2.0), bool([]))\n").unwrap();
        assert_eq!(out, "-42 3 255 1.5 2.0 False\n");
        assert_eq!(error("int('x1')\n"), "ValueError: invalid literal for int() with base 10: 'x1'");
        assert_eq!(error("float('abc')\n"), "ValueError: could not convert string to float: 'abc'");
    }

    #[test]
    fn test_len_and_range() {
        let out = run("print(len('héllo'), len({'a': 1}), len(range(0, 10, 3)), list(range(5, 0, -2)))\n").unwrap();
        assert_eq!(out, "5 1 4 [5, 3, 1]\n");
        assert_eq!(error("len(5)\n"), "TypeError: object of type 'int' has no len()");
        assert_eq!(error("range(1, 2, 0)\n"), "ValueError: range() arg 3 must not be zero");
    }

    #[test]
    fn test_min_max() {
        let out = run("print(min(3, 1, 2), max([1, 5, 2]), max(['a', 'bbb', 'cc'], key=len), min([], default=7))\n").unwrap();
        assert_eq!(out, "1 5 bbb 7\n");
        assert_eq!(error("max([])\n"), "ValueError: max() iterable argument is empty");
    }

    #[test]
    fn test_dict_constructor() {
        let out = run("print(dict([('a', 1), ('b', 2)]), dict(x=1), dict({'k': 'v'}))\n").unwrap();
        assert_eq!(out, "{'a': 1, 'b': 2} {'x': 1} {'k': 'v'}\n");
        assert_eq!(
            error("dict([(1, 2, 3)])\n"),
            "ValueError: dictionary update sequence element #0 has length 3; 2 is required"
        );
    }

    #[test]
    fn test_chr_ord_abs() {
        assert_eq!(run("print(chr(65), ord('a'), abs(-3), abs(-2.5))\n").unwrap(), "A 97 3 2.5\n");
        assert_eq!(
            error("ord('ab')\n"),
            "TypeError: ord() expected a character, but string of length 2 found"
        );
    }

    #[test]
    fn test_keyword_rejection() {
        assert_eq!(error("len([1], x=2)\n"), "TypeError: len() takes no keyword arguments");
        assert_eq!(error("len()\n"), "TypeError: len() takes exactly one argument (0 given)");
    }

    #[test]
    fn test_exit_raises_system_exit() {
        let err = run("exit(3)\n").unwrap_err();
        assert_eq!(err.to_string(), "SystemExit: 3");
    }
}
