//! Subscript access (`obj[index]`) on sequences and dicts
//!
//! - Integer indices may be negative and count from the end
//! - Slices follow the usual clamping rules and never fail on out-of-range bounds
//! - Slice assignment with step 1 may change the list's length; extended slices may not

use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::ScriptError;
use crate::memory::value::{RangeValue, SliceValue, Value};
use crate::parser::ast::SourceLocation;

/// Resolved slice bounds over a sequence of known length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SliceIndices {
    start: i64,
    stop: i64,
    step: i64,
}

impl SliceIndices {
    pub(crate) fn resolve(
        slice: &SliceValue,
        len: usize,
        location: SourceLocation,
    ) -> Result<Self, ScriptError> {
        let len = len as i64;
        let step = match bound(&slice.step, location)? {
            None => 1,
            Some(0) => return Err(ScriptError::value_error("slice step cannot be zero", location)),
            Some(step) => step,
        };

        let (lower_default, upper_default, min, max) = if step > 0 {
            (0, len, 0, len)
        } else {
            (len - 1, -1, -1, len - 1)
        };

        let clamp = |index: Option<i64>, default: i64| match index {
            None => default,
            Some(i) if i < 0 => (i + len).clamp(min, max),
            Some(i) => i.clamp(min, max),
        };

        Ok(SliceIndices {
            start: clamp(bound(&slice.lower, location)?, lower_default),
            stop: clamp(bound(&slice.upper, location)?, upper_default),
            step,
        })
    }

    /// Positions selected by the slice, in slice order
    pub(crate) fn positions(&self) -> Vec<usize> {
        let mut positions = Vec::new();
        let mut i = self.start;
        while (self.step > 0 && i < self.stop) || (self.step < 0 && i > self.stop) {
            positions.push(i as usize);
            i += self.step;
        }
        positions
    }
}

fn bound(value: &Value, location: SourceLocation) -> Result<Option<i64>, ScriptError> {
    match value {
        Value::None => Ok(None),
        other => other.as_int().map(Some).ok_or_else(|| {
            ScriptError::type_error(
                "slice indices must be integers or None or have an __index__ method",
                location,
            )
        }),
    }
}

/// Map a possibly negative index onto `0..len`
fn normalize_index(index: i64, len: usize) -> Option<usize> {
    let resolved = if index < 0 { index + len as i64 } else { index };
    if (0..len as i64).contains(&resolved) {
        Some(resolved as usize)
    } else {
        None
    }
}

fn pick<T: Clone>(items: &[T], indices: &SliceIndices) -> Vec<T> {
    indices.positions().into_iter().map(|i| items[i].clone()).collect()
}

impl Interpreter {
    /// Sequence index for `container`, producing the type's own error messages
    fn sequence_index(
        &self,
        container: &Value,
        index: &Value,
        len: usize,
        out_of_range: &str,
        location: SourceLocation,
    ) -> Result<usize, ScriptError> {
        let Some(index) = index.as_int() else {
            let message = match container {
                Value::Str(_) => format!("string indices must be integers, not '{}'", index.type_name()),
                other => format!(
                    "{} indices must be integers or slices, not {}",
                    other.type_name(),
                    index.type_name()
                ),
            };
            return Err(ScriptError::type_error(message, location));
        };
        normalize_index(index, len).ok_or_else(|| ScriptError::index_error(out_of_range, location))
    }

    pub(crate) fn get_item(
        &self,
        object: &Value,
        index: &Value,
        location: SourceLocation,
    ) -> Result<Value, ScriptError> {
        match (object, index) {
            (Value::Dict(dict), key) => dict
                .borrow()
                .get(key)
                .map_err(|type_name| ScriptError::unhashable(type_name, location))?
                .cloned()
                .ok_or_else(|| ScriptError::key_error(key.clone(), location)),

            (Value::List(items), Value::Slice(slice)) => {
                let items = items.borrow();
                let indices = SliceIndices::resolve(slice, items.len(), location)?;
                Ok(Value::list(pick(&items, &indices)))
            }
            (Value::Tuple(items), Value::Slice(slice)) => {
                let indices = SliceIndices::resolve(slice, items.len(), location)?;
                Ok(Value::tuple(pick(items, &indices)))
            }
            (Value::Str(text), Value::Slice(slice)) => {
                let chars: Vec<char> = text.chars().collect();
                let indices = SliceIndices::resolve(slice, chars.len(), location)?;
                Ok(Value::str(&pick(&chars, &indices).into_iter().collect::<String>()))
            }
            (Value::Range(range), Value::Slice(slice)) => {
                let indices = SliceIndices::resolve(slice, range.len(), location)?;
                let scaled = |i: i64| {
                    i.checked_mul(range.step)
                        .and_then(|offset| range.start.checked_add(offset))
                        .ok_or_else(|| ScriptError::overflow(location))
                };
                Ok(Value::Range(RangeValue {
                    start: scaled(indices.start)?,
                    stop: scaled(indices.stop)?,
                    step: range
                        .step
                        .checked_mul(indices.step)
                        .ok_or_else(|| ScriptError::overflow(location))?,
                }))
            }

            (Value::List(items), _) => {
                let items = items.borrow();
                let i = self.sequence_index(object, index, items.len(), "list index out of range", location)?;
                Ok(items[i].clone())
            }
            (Value::Tuple(items), _) => {
                let i = self.sequence_index(object, index, items.len(), "tuple index out of range", location)?;
                Ok(items[i].clone())
            }
            (Value::Str(text), _) => {
                let len = text.chars().count();
                let i = self.sequence_index(object, index, len, "string index out of range", location)?;
                let c = text.chars().nth(i).unwrap_or_default();
                Ok(Value::str(c.encode_utf8(&mut [0; 4])))
            }
            (Value::Range(range), _) => {
                let i = self.sequence_index(
                    object,
                    index,
                    range.len(),
                    "range object index out of range",
                    location,
                )?;
                Ok(Value::Int(range.get(i)))
            }

            (other, _) => Err(ScriptError::type_error(
                format!("'{}' object is not subscriptable", other.type_name()),
                location,
            )),
        }
    }

    pub(crate) fn set_item(
        &self,
        object: &Value,
        index: Value,
        value: Value,
        location: SourceLocation,
    ) -> Result<(), ScriptError> {
        match object {
            Value::Dict(dict) => dict
                .borrow_mut()
                .insert(index, value)
                .map_err(|type_name| ScriptError::unhashable(type_name, location)),

            Value::List(items) => {
                if let Value::Slice(slice) = &index {
                    // Collect first: the source may be the list itself
                    let replacement = self.collect_iterable(&value, location)?;
                    return self.assign_slice(&mut items.borrow_mut(), slice, replacement, location);
                }
                let mut items = items.borrow_mut();
                let i = self.sequence_index(
                    object,
                    &index,
                    items.len(),
                    "list assignment index out of range",
                    location,
                )?;
                items[i] = value;
                Ok(())
            }

            other => Err(ScriptError::type_error(
                format!("'{}' object does not support item assignment", other.type_name()),
                location,
            )),
        }
    }

    fn assign_slice(
        &self,
        items: &mut Vec<Value>,
        slice: &SliceValue,
        replacement: Vec<Value>,
        location: SourceLocation,
    ) -> Result<(), ScriptError> {
        let indices = SliceIndices::resolve(slice, items.len(), location)?;

        if indices.step == 1 {
            let stop = indices.stop.max(indices.start) as usize;
            items.splice(indices.start as usize..stop, replacement);
            return Ok(());
        }

        let positions = indices.positions();
        if positions.len() != replacement.len() {
            return Err(ScriptError::value_error(
                format!(
                    "attempt to assign sequence of size {} to extended slice of size {}",
                    replacement.len(),
                    positions.len()
                ),
                location,
            ));
        }
        for (i, value) in positions.into_iter().zip(replacement) {
            items[i] = value;
        }
        Ok(())
    }

    pub(crate) fn delete_item(
        &self,
        object: &Value,
        index: &Value,
        location: SourceLocation,
    ) -> Result<(), ScriptError> {
        match object {
            Value::Dict(dict) => {
                let removed = dict
                    .borrow_mut()
                    .remove(index)
                    .map_err(|type_name| ScriptError::unhashable(type_name, location))?;
                match removed {
                    Some(_) => Ok(()),
                    None => Err(ScriptError::key_error(index.clone(), location)),
                }
            }

            Value::List(items) => {
                let mut items = items.borrow_mut();
                if let Value::Slice(slice) = index {
                    let indices = SliceIndices::resolve(slice, items.len(), location)?;
                    let mut doomed = indices.positions();
                    doomed.sort_unstable();
                    for i in doomed.into_iter().rev() {
                        items.remove(i);
                    }
                    return Ok(());
                }
                let i = self.sequence_index(
                    object,
                    index,
                    items.len(),
                    "list assignment index out of range",
                    location,
                )?;
                items.remove(i);
                Ok(())
            }

            other => Err(ScriptError::type_error(
                format!("'{}' object doesn't support item deletion", other.type_name()),
                location,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_program;
    use crate::terminal::Terminal;
    use std::rc::Rc;

    fn indices(lower: Value, upper: Value, step: Value, len: usize) -> Vec<usize> {
        let slice = SliceValue { lower, upper, step };
        SliceIndices::resolve(&slice, len, SourceLocation::default())
            .unwrap()
            .positions()
    }

    fn run(source: &str) -> Result<String, ScriptError> {
        let (terminal, buffer) = Terminal::capture();
        let program = parse_program(source).unwrap();
        Interpreter::new(terminal).run(&program, "test.py")?;
        Ok(buffer.contents())
    }

    #[test]
    fn test_slice_resolution() {
        assert_eq!(indices(Value::None, Value::None, Value::None, 3), vec![0, 1, 2]);
        assert_eq!(indices(Value::Int(-2), Value::None, Value::None, 5), vec![3, 4]);
        assert_eq!(indices(Value::None, Value::None, Value::Int(-1), 3), vec![2, 1, 0]);
        assert_eq!(indices(Value::Int(1), Value::Int(100), Value::Int(2), 6), vec![1, 3, 5]);
        assert_eq!(indices(Value::Int(10), Value::Int(20), Value::None, 3), Vec::<usize>::new());
        assert_eq!(indices(Value::Int(-100), Value::Int(1), Value::None, 3), vec![0]);
    }

    #[test]
    fn test_zero_step() {
        let slice = SliceValue {
            lower: Value::None,
            upper: Value::None,
            step: Value::Int(0),
        };
        let err = SliceIndices::resolve(&slice, 3, SourceLocation::default()).unwrap_err();
        assert_eq!(err.to_string(), "ValueError: slice step cannot be zero");
    }

    #[test]
    fn test_indexing() {
        let out = run("xs = [1, 2, 3]\nprint(xs[-1], 'abc'[1], (4, 5)[0], range(0, 10, 3)[2])\n").unwrap();
        assert_eq!(out, "3 b 4 6\n");

        let err = run("print([1][1])\n").unwrap_err();
        assert_eq!(err.to_string(), "IndexError: list index out of range");

        let err = run("print({'a': 1}['b'])\n").unwrap_err();
        assert_eq!(err.to_string(), "KeyError: 'b'");

        let err = run("print(5[0])\n").unwrap_err();
        assert_eq!(err.to_string(), "TypeError: 'int' object is not subscriptable");
    }

    #[test]
    fn test_slicing() {
        let out = run("xs = [0, 1, 2, 3, 4]\nprint(xs[1:3], xs[::-2], 'hello'[1:4], (1, 2, 3)[:1], range(10)[2:8:3])\n").unwrap();
        assert_eq!(out, "[1, 2] [4, 2, 0] ell (1,) range(2, 8, 3)\n");
    }

    #[test]
    fn test_slice_assignment_and_deletion() {
        let out = run("xs = [0, 1, 2, 3]\nxs[1:3] = ['a']\nprint(xs)\nxs[:] = xs + xs\nprint(xs)\ndel xs[::2]\nprint(xs)\n").unwrap();
        assert_eq!(out, "[0, 'a', 3]\n[0, 'a', 3, 0, 'a', 3]\n['a', 0, 3]\n");

        let err = run("xs = [0, 1, 2]\nxs[::2] = [9]\n").unwrap_err();
        assert_eq!(
            err.to_string(),
            "ValueError: attempt to assign sequence of size 1 to extended slice of size 2"
        );
    }

    #[test]
    fn test_tuple_is_immutable() {
        let (terminal, _) = Terminal::capture();
        let interp = Interpreter::new(terminal);
        let tuple = Value::Tuple(Rc::from(vec![Value::Int(1)]));
        let err = interp
            .set_item(&tuple, Value::Int(0), Value::Int(2), SourceLocation::default())
            .unwrap_err();
        assert_eq!(err.to_string(), "TypeError: 'tuple' object does not support item assignment");
    }
}
