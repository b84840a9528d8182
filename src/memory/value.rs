//! Runtime value representation
//!
//! This module defines the [`Value`] enum, which represents all possible runtime values
//! of a script. Scalars are stored inline; containers are reference counted so that
//! aliasing behaves like the scripting language expects (two names bound to the same
//! list observe each other's mutations).
//!
//! # Value Types
//!
//! - [`Value::None`], [`Value::Bool`], [`Value::Int`] (64-bit), [`Value::Float`]
//! - [`Value::Str`]: immutable text
//! - [`Value::List`] and [`Value::Dict`]: shared, mutable containers
//! - [`Value::Tuple`]: shared, immutable sequence
//! - [`Value::Range`]: lazy arithmetic progression
//! - [`Value::Slice`]: the bounds of a `[lower:upper:step]` subscript
//! - [`Value::Function`], [`Value::Builtin`], [`Value::Method`]: callables
//! - [`Value::ExceptionClass`], [`Value::Exception`]: exception types and instances
//!
//! # Representation
//!
//! [`Value::repr`] produces the debug representation shown by the tracer. It is the
//! only fallible rendering: self-containing containers are cut short with `[...]`,
//! and nesting deeper than [`MAX_REPR_DEPTH`] yields a [`SnapshotError`].

use crate::interpreter::builtins::Builtin;
use crate::interpreter::errors::{ExceptionKind, ExceptionValue};
use crate::memory::stack::Namespace;
use crate::parser::ast::FunctionDef;
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::fmt::Write as _;
use std::rc::Rc;

/// Deepest container nesting [`Value::repr`] will render
pub const MAX_REPR_DEPTH: usize = 256;

/// Failure to stringify a value
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SnapshotError {
    #[error("maximum recursion depth exceeded while getting the repr of an object")]
    TooDeep,
}

/// Runtime values in the interpreter
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    List(Rc<RefCell<Vec<Value>>>),
    Tuple(Rc<[Value]>),
    Dict(Rc<RefCell<Dict>>),
    Range(RangeValue),
    Slice(Rc<SliceValue>),
    Function(Rc<Function>),
    Builtin(Builtin),
    Method(Rc<BoundMethod>),
    ExceptionClass(ExceptionKind),
    Exception(Rc<ExceptionValue>),
}

/// A user-defined function together with the environment it was defined in
pub struct Function {
    pub def: Rc<FunctionDef>,
    /// Evaluated default values, aligned with the trailing parameters
    pub defaults: Vec<Value>,
    pub globals: Namespace,
    pub filename: Rc<str>,
}

impl Function {
    pub fn name(&self) -> &str {
        &self.def.name
    }
}

// The globals usually contain the function itself
impl std::fmt::Debug for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.def.name)
            .field("filename", &self.filename)
            .finish_non_exhaustive()
    }
}

/// A built-in method looked up on a receiver, e.g. `xs.append`
#[derive(Debug)]
pub struct BoundMethod {
    pub receiver: Value,
    pub name: String,
}

/// `range(start, stop, step)`; `step` is never zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RangeValue {
    pub start: i64,
    pub stop: i64,
    pub step: i64,
}

impl RangeValue {
    pub fn len(&self) -> usize {
        let (lo, hi, step) = if self.step > 0 {
            (self.start as i128, self.stop as i128, self.step as i128)
        } else {
            (self.stop as i128, self.start as i128, -(self.step as i128))
        };
        if lo >= hi {
            0
        } else {
            ((hi - lo - 1) / step + 1) as usize
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element at `index` (already normalized to `0..len`)
    pub fn get(&self, index: usize) -> i64 {
        self.start + self.step * index as i64
    }
}

/// `lower:upper:step` inside a subscript; absent bounds are `None`
#[derive(Debug, Clone, PartialEq)]
pub struct SliceValue {
    pub lower: Value,
    pub upper: Value,
    pub step: Value,
}

impl Value {
    pub fn str(text: &str) -> Value {
        Value::Str(Rc::from(text))
    }

    pub fn list(items: Vec<Value>) -> Value {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn tuple(items: Vec<Value>) -> Value {
        Value::Tuple(Rc::from(items))
    }

    pub fn dict(dict: Dict) -> Value {
        Value::Dict(Rc::new(RefCell::new(dict)))
    }

    /// Name of the value's type as scripts see it
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Dict(_) => "dict",
            Value::Range(_) => "range",
            Value::Slice(_) => "slice",
            Value::Function(_) => "function",
            Value::Builtin(b) if b.is_type() => "type",
            Value::Builtin(_) | Value::Method(_) => "builtin_function_or_method",
            Value::ExceptionClass(_) => "type",
            Value::Exception(exc) => exc.kind.name(),
        }
    }

    /// Truth value testing
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(x) => *x != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.borrow().is_empty(),
            Value::Tuple(items) => !items.is_empty(),
            Value::Dict(dict) => !dict.borrow().is_empty(),
            Value::Range(range) => !range.is_empty(),
            _ => true,
        }
    }

    /// Get the integer value of an `int` or `bool`
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Bool(b) => Some(*b as i64),
            _ => None,
        }
    }

    /// Get the numeric value of an `int`, `bool` or `float`
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(x) => Some(*x),
            other => other.as_int().map(|n| n as f64),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Identity comparison (`is`)
    pub fn is(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Str(a), Value::Str(b)) => Rc::ptr_eq(a, b) || a == b,
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
            (Value::Tuple(a), Value::Tuple(b)) => Rc::ptr_eq(a, b),
            (Value::Dict(a), Value::Dict(b)) => Rc::ptr_eq(a, b),
            (Value::Range(a), Value::Range(b)) => a == b,
            (Value::Slice(a), Value::Slice(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => a == b,
            (Value::Method(a), Value::Method(b)) => Rc::ptr_eq(a, b),
            (Value::ExceptionClass(a), Value::ExceptionClass(b)) => a == b,
            (Value::Exception(a), Value::Exception(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Debug representation (`repr()`)
    pub fn repr(&self) -> Result<String, SnapshotError> {
        let mut writer = ReprWriter::default();
        writer.write_value(self)?;
        Ok(writer.out)
    }

    /// Informal representation (`str()`, `print`)
    pub fn to_str(&self) -> Result<String, SnapshotError> {
        match self {
            Value::Str(s) => Ok(s.to_string()),
            Value::Exception(exc) => exc.message(),
            other => other.repr(),
        }
    }
}

/// Equality with the scripting language's semantics (`1 == 1.0 == True`)
impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (Value::Tuple(a), Value::Tuple(b)) => Rc::ptr_eq(a, b) || a == b,
            (Value::Dict(a), Value::Dict(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (Value::Range(a), Value::Range(b)) => {
                let (la, lb) = (a.len(), b.len());
                la == lb && (la == 0 || (a.start == b.start && (la == 1 || a.step == b.step)))
            }
            (Value::Slice(a), Value::Slice(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => a == b,
            (Value::Method(a), Value::Method(b)) => a.name == b.name && a.receiver.is(&b.receiver),
            (Value::ExceptionClass(a), Value::ExceptionClass(b)) => a == b,
            (Value::Exception(a), Value::Exception(b)) => Rc::ptr_eq(a, b),
            (Value::Float(a), b) => b.as_float().is_some_and(|b| *a == b),
            (a, Value::Float(b)) => a.as_float().is_some_and(|a| a == *b),
            (a, b) => match (a.as_int(), b.as_int()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }
}

/// Format a float the way the scripting language does: shortest round-trip digits,
/// scientific notation outside `1e-4 <= |x| < 1e16`, always visibly a float.
pub fn format_float(x: f64) -> String {
    if x.is_nan() {
        return "nan".to_string();
    }
    if x.is_infinite() {
        return if x > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let sign = if x.is_sign_negative() { "-" } else { "" };
    if x == 0.0 {
        return format!("{sign}0.0");
    }

    // `{:e}` yields the shortest round-trip digits, e.g. "1.5e-5"
    let sci = format!("{:e}", x.abs());
    let (mantissa, exponent) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let point = exponent + 1;

    if !(-4 < point && point <= 16) {
        let (first, rest) = digits.split_at(1);
        let fraction = if rest.is_empty() {
            String::new()
        } else {
            format!(".{rest}")
        };
        let exp_sign = if exponent < 0 { '-' } else { '+' };
        return format!("{sign}{first}{fraction}e{exp_sign}{:02}", exponent.abs());
    }

    let body = if point <= 0 {
        format!("0.{}{}", "0".repeat((-point) as usize), digits)
    } else if point as usize >= digits.len() {
        format!("{}{}.0", digits, "0".repeat(point as usize - digits.len()))
    } else {
        let (whole, fraction) = digits.split_at(point as usize);
        format!("{whole}.{fraction}")
    };
    format!("{sign}{body}")
}

/// Quote and escape a string literal
pub fn quote_str(text: &str) -> String {
    let quote = if text.contains('\'') && !text.contains('"') {
        '"'
    } else {
        '\''
    };

    let mut out = String::with_capacity(text.len() + 2);
    out.push(quote);
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 || (0x7f..=0xa0).contains(&(c as u32)) => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

/// Recursive repr with cycle and depth tracking
#[derive(Default)]
struct ReprWriter {
    out: String,
    /// Addresses of the containers currently being rendered
    active: Vec<usize>,
    depth: usize,
}

impl ReprWriter {
    fn write_value(&mut self, value: &Value) -> Result<(), SnapshotError> {
        match value {
            Value::None => self.out.push_str("None"),
            Value::Bool(true) => self.out.push_str("True"),
            Value::Bool(false) => self.out.push_str("False"),
            Value::Int(n) => {
                let _ = write!(self.out, "{n}");
            }
            Value::Float(x) => self.out.push_str(&format_float(*x)),
            Value::Str(s) => self.out.push_str(&quote_str(s)),
            Value::List(items) => {
                let addr = Rc::as_ptr(items) as *const () as usize;
                self.nested(addr, "[...]", |w| w.write_items("[", &items.borrow(), "]"))?;
            }
            Value::Tuple(items) => {
                if items.len() == 1 {
                    self.out.push('(');
                    self.enter(|w| w.write_value(&items[0]))?;
                    self.out.push_str(",)");
                } else {
                    self.enter(|w| w.write_items("(", items, ")"))?;
                }
            }
            Value::Dict(dict) => {
                let addr = Rc::as_ptr(dict) as *const () as usize;
                self.nested(addr, "{...}", |w| {
                    w.out.push('{');
                    for (i, (key, value)) in dict.borrow().iter().enumerate() {
                        if i > 0 {
                            w.out.push_str(", ");
                        }
                        w.write_value(key)?;
                        w.out.push_str(": ");
                        w.write_value(value)?;
                    }
                    w.out.push('}');
                    Ok(())
                })?;
            }
            Value::Range(range) => {
                if range.step == 1 {
                    let _ = write!(self.out, "range({}, {})", range.start, range.stop);
                } else {
                    let _ = write!(
                        self.out,
                        "range({}, {}, {})",
                        range.start, range.stop, range.step
                    );
                }
            }
            Value::Slice(slice) => {
                self.out.push_str("slice(");
                self.enter(|w| {
                    w.write_value(&slice.lower)?;
                    w.out.push_str(", ");
                    w.write_value(&slice.upper)?;
                    w.out.push_str(", ");
                    w.write_value(&slice.step)
                })?;
                self.out.push(')');
            }
            Value::Function(func) => {
                let _ = write!(self.out, "<function {}>", func.name());
            }
            Value::Builtin(b) if b.is_type() => {
                let _ = write!(self.out, "<class '{}'>", b.name());
            }
            Value::Builtin(b) => {
                let _ = write!(self.out, "<built-in function {}>", b.name());
            }
            Value::Method(method) => {
                let _ = write!(
                    self.out,
                    "<built-in method {} of {} object>",
                    method.name,
                    method.receiver.type_name()
                );
            }
            Value::ExceptionClass(kind) => {
                let _ = write!(self.out, "<class '{}'>", kind.name());
            }
            Value::Exception(exc) => {
                self.out.push_str(exc.kind.name());
                self.enter(|w| w.write_items("(", &exc.args, ")"))?;
            }
        }
        Ok(())
    }

    fn write_items(&mut self, open: &str, items: &[Value], close: &str) -> Result<(), SnapshotError> {
        self.out.push_str(open);
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.write_value(item)?;
        }
        self.out.push_str(close);
        Ok(())
    }

    /// Render a mutable container, substituting `placeholder` when it contains itself
    fn nested(
        &mut self,
        addr: usize,
        placeholder: &str,
        render: impl FnOnce(&mut Self) -> Result<(), SnapshotError>,
    ) -> Result<(), SnapshotError> {
        if self.active.contains(&addr) {
            self.out.push_str(placeholder);
            return Ok(());
        }
        self.active.push(addr);
        let result = self.enter(render);
        self.active.pop();
        result
    }

    /// Render one level of nesting, failing past [`MAX_REPR_DEPTH`]
    fn enter(
        &mut self,
        render: impl FnOnce(&mut Self) -> Result<(), SnapshotError>,
    ) -> Result<(), SnapshotError> {
        if self.depth >= MAX_REPR_DEPTH {
            return Err(SnapshotError::TooDeep);
        }
        self.depth += 1;
        let result = render(self);
        self.depth -= 1;
        result
    }
}

/// Hashable projection of a value, used as a dict key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HashKey {
    None,
    Int(i64),
    Float(u64),
    Str(Rc<str>),
    Tuple(Vec<HashKey>),
    Range(RangeValue),
    Builtin(Builtin),
    Class(ExceptionKind),
    Identity(usize),
}

impl HashKey {
    /// Build the key for `value`; `Err` carries the type name of an unhashable value
    pub fn new(value: &Value) -> Result<HashKey, &'static str> {
        Ok(match value {
            Value::None => HashKey::None,
            Value::Bool(b) => HashKey::Int(*b as i64),
            Value::Int(n) => HashKey::Int(*n),
            Value::Float(x) => {
                // Integral floats must collide with the equal int
                if x.fract() == 0.0 && x.abs() < 9.2e18 {
                    HashKey::Int(*x as i64)
                } else {
                    HashKey::Float(x.to_bits())
                }
            }
            Value::Str(s) => HashKey::Str(s.clone()),
            Value::Tuple(items) => {
                HashKey::Tuple(items.iter().map(HashKey::new).collect::<Result<_, _>>()?)
            }
            Value::Range(range) => HashKey::Range(*range),
            Value::Builtin(b) => HashKey::Builtin(*b),
            Value::ExceptionClass(kind) => HashKey::Class(*kind),
            Value::Function(func) => HashKey::Identity(Rc::as_ptr(func) as *const () as usize),
            Value::Exception(exc) => HashKey::Identity(Rc::as_ptr(exc) as *const () as usize),
            other => return Err(other.type_name()),
        })
    }
}

/// Insertion-ordered dictionary
#[derive(Debug, Clone, Default)]
pub struct Dict {
    entries: Vec<(Value, Value)>,
    index: FxHashMap<HashKey, usize>,
}

impl Dict {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &Value) -> Result<Option<&Value>, &'static str> {
        let hash_key = HashKey::new(key)?;
        Ok(self.index.get(&hash_key).map(|&i| &self.entries[i].1))
    }

    pub fn contains_key(&self, key: &Value) -> Result<bool, &'static str> {
        Ok(self.get(key)?.is_some())
    }

    /// Insert or overwrite; an existing key keeps its position and original key object
    pub fn insert(&mut self, key: Value, value: Value) -> Result<(), &'static str> {
        let hash_key = HashKey::new(&key)?;
        match self.index.get(&hash_key) {
            Some(&i) => self.entries[i].1 = value,
            None => {
                self.index.insert(hash_key, self.entries.len());
                self.entries.push((key, value));
            }
        }
        Ok(())
    }

    pub fn remove(&mut self, key: &Value) -> Result<Option<Value>, &'static str> {
        let hash_key = HashKey::new(key)?;
        let Some(position) = self.index.remove(&hash_key) else {
            return Ok(None);
        };
        let (_, value) = self.entries.remove(position);
        for slot in self.index.values_mut() {
            if *slot > position {
                *slot -= 1;
            }
        }
        Ok(Some(value))
    }

    /// Remove and return the most recently inserted entry
    pub fn pop_last(&mut self) -> Option<(Value, Value)> {
        let (key, value) = self.entries.pop()?;
        if let Ok(hash_key) = HashKey::new(&key) {
            self.index.remove(&hash_key);
        }
        Some((key, value))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Value, &Value)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn keys(&self) -> Vec<Value> {
        self.entries.iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn values(&self) -> Vec<Value> {
        self.entries.iter().map(|(_, v)| v.clone()).collect()
    }
}

impl PartialEq for Dict {
    fn eq(&self, other: &Dict) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(key, value)| matches!(other.get(key), Ok(Some(v)) if v == value))
    }
}

/// Iterator over an iterable value
///
/// Lists are iterated live, by position, so appending during a `for` loop
/// extends the loop.
pub enum ValueIter {
    List {
        items: Rc<RefCell<Vec<Value>>>,
        position: usize,
    },
    Items(std::vec::IntoIter<Value>),
    Range {
        range: RangeValue,
        position: usize,
    },
}

impl ValueIter {
    /// Start iterating; `Err` carries the type name of a non-iterable value
    pub fn new(value: &Value) -> Result<ValueIter, &'static str> {
        Ok(match value {
            Value::List(items) => ValueIter::List {
                items: items.clone(),
                position: 0,
            },
            Value::Tuple(items) => ValueIter::Items(items.to_vec().into_iter()),
            Value::Str(s) => ValueIter::Items(
                s.chars()
                    .map(|c| Value::Str(Rc::from(c.to_string())))
                    .collect::<Vec<_>>()
                    .into_iter(),
            ),
            Value::Dict(dict) => ValueIter::Items(dict.borrow().keys().into_iter()),
            Value::Range(range) => ValueIter::Range {
                range: *range,
                position: 0,
            },
            other => return Err(other.type_name()),
        })
    }
}

impl Iterator for ValueIter {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        match self {
            ValueIter::List { items, position } => {
                let item = items.borrow().get(*position).cloned()?;
                *position += 1;
                Some(item)
            }
            ValueIter::Items(items) => items.next(),
            ValueIter::Range { range, position } => {
                if *position >= range.len() {
                    return None;
                }
                let item = range.get(*position);
                *position += 1;
                Some(Value::Int(item))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_formatting() {
        assert_eq!(format_float(1.0), "1.0");
        assert_eq!(format_float(0.1), "0.1");
        assert_eq!(format_float(-2.5), "-2.5");
        assert_eq!(format_float(1e16), "1e+16");
        assert_eq!(format_float(1e15), "1000000000000000.0");
        assert_eq!(format_float(1.5e-5), "1.5e-05");
        assert_eq!(format_float(0.0001), "0.0001");
        assert_eq!(format_float(123.456), "123.456");
        assert_eq!(format_float(-0.0), "-0.0");
        assert_eq!(format_float(f64::INFINITY), "inf");
        assert_eq!(format_float(f64::NAN), "nan");
        assert_eq!(format_float(0.1 + 0.2), "0.30000000000000004");
    }

    #[test]
    fn test_string_quoting() {
        assert_eq!(quote_str("abc"), "'abc'");
        assert_eq!(quote_str("it's"), "\"it's\"");
        assert_eq!(quote_str("both ' and \""), "'both \\' and \"'");
        assert_eq!(quote_str("a\nb\\"), "'a\\nb\\\\'");
        assert_eq!(quote_str("\x01"), "'\\x01'");
    }

    #[test]
    fn test_container_repr() {
        let value = Value::list(vec![
            Value::Int(1),
            Value::str("a"),
            Value::tuple(vec![Value::None]),
            Value::tuple(vec![]),
        ]);
        assert_eq!(value.repr().unwrap(), "[1, 'a', (None,), ()]");

        let mut dict = Dict::new();
        dict.insert(Value::str("k"), Value::Bool(true)).unwrap();
        dict.insert(Value::Int(2), Value::Float(0.5)).unwrap();
        assert_eq!(Value::dict(dict).repr().unwrap(), "{'k': True, 2: 0.5}");

        let range = Value::Range(RangeValue {
            start: 0,
            stop: 10,
            step: 2,
        });
        assert_eq!(range.repr().unwrap(), "range(0, 10, 2)");
    }

    #[test]
    fn test_self_containing_list() {
        let list = Rc::new(RefCell::new(vec![Value::Int(1)]));
        list.borrow_mut().push(Value::List(list.clone()));
        assert_eq!(Value::List(list.clone()).repr().unwrap(), "[1, [...]]");
        // Break the cycle so the test does not leak
        list.borrow_mut().clear();
    }

    #[test]
    fn test_deep_nesting_is_an_error() {
        let mut value = Value::Int(0);
        for _ in 0..(MAX_REPR_DEPTH + 10) {
            value = Value::list(vec![value]);
        }
        assert_eq!(value.repr(), Err(SnapshotError::TooDeep));
    }

    #[test]
    fn test_numeric_equality_and_hashing() {
        assert_eq!(Value::Int(1), Value::Float(1.0));
        assert_eq!(Value::Bool(true), Value::Int(1));
        assert_ne!(Value::Int(1), Value::str("1"));

        let mut dict = Dict::new();
        dict.insert(Value::Int(1), Value::str("int")).unwrap();
        dict.insert(Value::Float(1.0), Value::str("float")).unwrap();
        assert_eq!(dict.len(), 1);
        assert_eq!(dict.get(&Value::Bool(true)).unwrap(), Some(&Value::str("float")));
        assert_eq!(dict.insert(Value::list(vec![]), Value::None), Err("list"));
    }

    #[test]
    fn test_dict_remove_keeps_order() {
        let mut dict = Dict::new();
        for key in ["a", "b", "c"] {
            dict.insert(Value::str(key), Value::None).unwrap();
        }
        dict.remove(&Value::str("a")).unwrap();
        dict.insert(Value::str("d"), Value::None).unwrap();
        assert_eq!(
            dict.keys(),
            vec![Value::str("b"), Value::str("c"), Value::str("d")]
        );
        assert_eq!(dict.get(&Value::str("c")).unwrap(), Some(&Value::None));
    }

    #[test]
    fn test_range_len() {
        let range = |start, stop, step| RangeValue { start, stop, step };
        assert_eq!(range(0, 5, 1).len(), 5);
        assert_eq!(range(0, 10, 3).len(), 4);
        assert_eq!(range(5, 0, -1).len(), 5);
        assert_eq!(range(5, 0, 1).len(), 0);
    }

    #[test]
    fn test_list_iteration_is_live() {
        let items = Rc::new(RefCell::new(vec![Value::Int(1)]));
        let mut iter = ValueIter::new(&Value::List(items.clone())).unwrap();
        assert_eq!(iter.next(), Some(Value::Int(1)));
        items.borrow_mut().push(Value::Int(2));
        assert_eq!(iter.next(), Some(Value::Int(2)));
        assert_eq!(iter.next(), None);
    }
}
