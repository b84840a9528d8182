use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::{ExceptionKind, ScriptError};
use crate::memory::value::Value;
use crate::parser::ast::{BinOp, SourceLocation};

/// Numeric operands promoted to a common type
enum Numbers {
    Ints(i64, i64),
    Floats(f64, f64),
}

fn numbers(left: &Value, right: &Value) -> Option<Numbers> {
    match (left, right) {
        (Value::Float(_), _) | (_, Value::Float(_)) => {
            Some(Numbers::Floats(left.as_float()?, right.as_float()?))
        }
        _ => Some(Numbers::Ints(left.as_int()?, right.as_int()?)),
    }
}

/// Floor division on integers, rounding toward negative infinity
fn floor_div(a: i64, b: i64) -> Option<i64> {
    let q = a.checked_div(b)?;
    if (a % b != 0) && ((a < 0) != (b < 0)) {
        q.checked_sub(1)
    } else {
        Some(q)
    }
}

/// Modulo on integers; the result takes the sign of the divisor
fn floor_mod(a: i64, b: i64) -> Option<i64> {
    let r = a.checked_rem(b)?;
    if r != 0 && ((r < 0) != (b < 0)) {
        Some(r + b)
    } else {
        Some(r)
    }
}

fn float_mod(a: f64, b: f64) -> f64 {
    let r = a % b;
    if r != 0.0 && ((r < 0.0) != (b < 0.0)) {
        r + b
    } else {
        r
    }
}

/// Longest sequence (or string, in bytes) a repetition may build
pub(crate) const MAX_SEQUENCE_LEN: usize = 1 << 28;

/// Length of `len` items repeated `count` times, if it fits
fn repeated_len(len: usize, count: usize, location: SourceLocation) -> Result<usize, ScriptError> {
    len.checked_mul(count)
        .filter(|total| *total <= MAX_SEQUENCE_LEN)
        .ok_or_else(|| ScriptError::memory(location))
}

/// Repeat a sequence `count` times
fn repeat<T: Clone>(items: &[T], count: usize, location: SourceLocation) -> Result<Vec<T>, ScriptError> {
    if items.is_empty() {
        return Ok(Vec::new());
    }
    let mut out = Vec::with_capacity(repeated_len(items.len(), count, location)?);
    for _ in 0..count {
        out.extend_from_slice(items);
    }
    Ok(out)
}

impl Interpreter {
    pub(crate) fn binary_op(
        &self,
        op: BinOp,
        left: &Value,
        right: &Value,
        location: SourceLocation,
    ) -> Result<Value, ScriptError> {
        let result = match op {
            BinOp::Add => self.add_values(left, right, location)?,
            BinOp::Sub => match numbers(left, right) {
                Some(Numbers::Ints(a, b)) => {
                    Some(Value::Int(a.checked_sub(b).ok_or_else(|| ScriptError::overflow(location))?))
                }
                Some(Numbers::Floats(a, b)) => Some(Value::Float(a - b)),
                None => None,
            },
            BinOp::Mul => self.mul_values(left, right, location)?,
            BinOp::Div => match numbers(left, right) {
                Some(Numbers::Ints(a, b)) => {
                    if b == 0 {
                        return Err(ScriptError::zero_division("division by zero", location));
                    }
                    Some(Value::Float(a as f64 / b as f64))
                }
                Some(Numbers::Floats(a, b)) => {
                    if b == 0.0 {
                        return Err(ScriptError::zero_division("float division by zero", location));
                    }
                    Some(Value::Float(a / b))
                }
                None => None,
            },
            BinOp::FloorDiv => match numbers(left, right) {
                Some(Numbers::Ints(a, b)) => {
                    if b == 0 {
                        return Err(ScriptError::zero_division(
                            "integer division or modulo by zero",
                            location,
                        ));
                    }
                    Some(Value::Int(floor_div(a, b).ok_or_else(|| ScriptError::overflow(location))?))
                }
                Some(Numbers::Floats(a, b)) => {
                    if b == 0.0 {
                        return Err(ScriptError::zero_division(
                            "float floor division by zero",
                            location,
                        ));
                    }
                    Some(Value::Float((a / b).floor()))
                }
                None => None,
            },
            BinOp::Mod => match numbers(left, right) {
                Some(Numbers::Ints(a, b)) => {
                    if b == 0 {
                        return Err(ScriptError::zero_division(
                            "integer division or modulo by zero",
                            location,
                        ));
                    }
                    Some(Value::Int(floor_mod(a, b).ok_or_else(|| ScriptError::overflow(location))?))
                }
                Some(Numbers::Floats(a, b)) => {
                    if b == 0.0 {
                        return Err(ScriptError::zero_division("float modulo", location));
                    }
                    Some(Value::Float(float_mod(a, b)))
                }
                None => None,
            },
            BinOp::Pow => self.pow_values(left, right, location)?,
            BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor => {
                match (left, right) {
                    (Value::Bool(a), Value::Bool(b)) => Some(Value::Bool(match op {
                        BinOp::BitAnd => a & b,
                        BinOp::BitOr => a | b,
                        _ => a ^ b,
                    })),
                    _ => match (left.as_int(), right.as_int()) {
                        (Some(a), Some(b)) => Some(Value::Int(match op {
                            BinOp::BitAnd => a & b,
                            BinOp::BitOr => a | b,
                            _ => a ^ b,
                        })),
                        _ => None,
                    },
                }
            }
            BinOp::Shl | BinOp::Shr => match (left.as_int(), right.as_int()) {
                (Some(a), Some(b)) => Some(Value::Int(self.shift(op, a, b, location)?)),
                _ => None,
            },
        };

        result.ok_or_else(|| {
            ScriptError::type_error(
                format!(
                    "unsupported operand type(s) for {}: '{}' and '{}'",
                    op.symbol(),
                    left.type_name(),
                    right.type_name()
                ),
                location,
            )
        })
    }

    fn add_values(
        &self,
        left: &Value,
        right: &Value,
        location: SourceLocation,
    ) -> Result<Option<Value>, ScriptError> {
        Ok(match (left, right) {
            (Value::Str(a), Value::Str(b)) => {
                let mut joined = String::with_capacity(a.len() + b.len());
                joined.push_str(a);
                joined.push_str(b);
                Some(Value::str(&joined))
            }
            (Value::List(a), Value::List(b)) => {
                let mut items = a.borrow().clone();
                items.extend(b.borrow().iter().cloned());
                Some(Value::list(items))
            }
            (Value::Tuple(a), Value::Tuple(b)) => {
                Some(Value::tuple(a.iter().chain(b.iter()).cloned().collect()))
            }
            _ => match numbers(left, right) {
                Some(Numbers::Ints(a, b)) => {
                    Some(Value::Int(a.checked_add(b).ok_or_else(|| ScriptError::overflow(location))?))
                }
                Some(Numbers::Floats(a, b)) => Some(Value::Float(a + b)),
                None => None,
            },
        })
    }

    fn mul_values(
        &self,
        left: &Value,
        right: &Value,
        location: SourceLocation,
    ) -> Result<Option<Value>, ScriptError> {
        // Non-positive counts give an empty result
        let repeated = |sequence: &Value, count: i64| -> Result<Option<Value>, ScriptError> {
            let count = usize::try_from(count).unwrap_or(0);
            Ok(match sequence {
                Value::Str(s) => {
                    repeated_len(s.len(), count, location)?;
                    Some(Value::str(&s.repeat(count)))
                }
                Value::List(items) => Some(Value::list(repeat(&items.borrow(), count, location)?)),
                Value::Tuple(items) => Some(Value::tuple(repeat(items, count, location)?)),
                _ => None,
            })
        };

        Ok(match (left, right) {
            (Value::Str(_) | Value::List(_) | Value::Tuple(_), count) => match count.as_int() {
                Some(n) => repeated(left, n)?,
                None => None,
            },
            (count, Value::Str(_) | Value::List(_) | Value::Tuple(_)) => match count.as_int() {
                Some(n) => repeated(right, n)?,
                None => None,
            },
            _ => match numbers(left, right) {
                Some(Numbers::Ints(a, b)) => {
                    Some(Value::Int(a.checked_mul(b).ok_or_else(|| ScriptError::overflow(location))?))
                }
                Some(Numbers::Floats(a, b)) => Some(Value::Float(a * b)),
                None => None,
            },
        })
    }

    fn pow_values(
        &self,
        left: &Value,
        right: &Value,
        location: SourceLocation,
    ) -> Result<Option<Value>, ScriptError> {
        Ok(match numbers(left, right) {
            Some(Numbers::Ints(base, exp)) if exp >= 0 => {
                let exp = u32::try_from(exp).map_err(|_| ScriptError::overflow(location))?;
                Some(Value::Int(
                    base.checked_pow(exp).ok_or_else(|| ScriptError::overflow(location))?,
                ))
            }
            Some(Numbers::Ints(base, exp)) => Some(Value::Float(self.float_pow(
                base as f64,
                exp as f64,
                location,
            )?)),
            Some(Numbers::Floats(base, exp)) => {
                Some(Value::Float(self.float_pow(base, exp, location)?))
            }
            None => None,
        })
    }

    fn float_pow(&self, base: f64, exp: f64, location: SourceLocation) -> Result<f64, ScriptError> {
        if base == 0.0 && exp < 0.0 {
            return Err(ScriptError::zero_division(
                "0.0 cannot be raised to a negative power",
                location,
            ));
        }
        if base < 0.0 && exp.fract() != 0.0 {
            return Err(ScriptError::value_error("math domain error", location));
        }
        let result = base.powf(exp);
        if result.is_infinite() && base.is_finite() && exp.is_finite() {
            return Err(ScriptError::new(
                ExceptionKind::OverflowError,
                "(34, 'Numerical result out of range')",
                location,
            ));
        }
        Ok(result)
    }

    fn shift(&self, op: BinOp, value: i64, count: i64, location: SourceLocation) -> Result<i64, ScriptError> {
        if count < 0 {
            return Err(ScriptError::value_error("negative shift count", location));
        }

        if op == BinOp::Shr {
            return Ok(if count >= 64 {
                if value < 0 {
                    -1
                } else {
                    0
                }
            } else {
                value >> count
            });
        }

        if value == 0 {
            return Ok(0);
        }
        if count >= 64 {
            return Err(ScriptError::overflow(location));
        }
        let shifted = value << count;
        if shifted >> count != value {
            return Err(ScriptError::overflow(location));
        }
        Ok(shifted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminal::Terminal;

    fn op(op: BinOp, left: Value, right: Value) -> Result<Value, ScriptError> {
        let (terminal, _) = Terminal::capture();
        Interpreter::new(terminal).binary_op(op, &left, &right, SourceLocation::default())
    }

    #[test]
    fn test_integer_arithmetic() {
        assert_eq!(op(BinOp::Add, Value::Int(2), Value::Int(3)).unwrap(), Value::Int(5));
        assert_eq!(op(BinOp::FloorDiv, Value::Int(-7), Value::Int(2)).unwrap(), Value::Int(-4));
        assert_eq!(op(BinOp::Mod, Value::Int(-7), Value::Int(2)).unwrap(), Value::Int(1));
        assert_eq!(op(BinOp::Mod, Value::Int(7), Value::Int(-2)).unwrap(), Value::Int(-1));
        assert_eq!(op(BinOp::Div, Value::Int(7), Value::Int(2)).unwrap(), Value::Float(3.5));
        assert_eq!(op(BinOp::Pow, Value::Int(2), Value::Int(10)).unwrap(), Value::Int(1024));
        assert_eq!(op(BinOp::Pow, Value::Int(2), Value::Int(-1)).unwrap(), Value::Float(0.5));
        assert_eq!(op(BinOp::Shl, Value::Int(1), Value::Int(4)).unwrap(), Value::Int(16));
        assert_eq!(op(BinOp::Shr, Value::Int(-16), Value::Int(2)).unwrap(), Value::Int(-4));
    }

    #[test]
    fn test_overflow_and_zero_division() {
        let err = op(BinOp::Mul, Value::Int(i64::MAX), Value::Int(2)).unwrap_err();
        assert_eq!(err.kind(), ExceptionKind::OverflowError);

        let err = op(BinOp::Div, Value::Int(1), Value::Int(0)).unwrap_err();
        assert_eq!(err.to_string(), "ZeroDivisionError: division by zero");

        let err = op(BinOp::Mod, Value::Float(1.0), Value::Float(0.0)).unwrap_err();
        assert_eq!(err.kind(), ExceptionKind::ZeroDivisionError);
    }

    #[test]
    fn test_sequence_operators() {
        assert_eq!(op(BinOp::Add, Value::str("ab"), Value::str("c")).unwrap(), Value::str("abc"));
        assert_eq!(op(BinOp::Mul, Value::str("ab"), Value::Int(2)).unwrap(), Value::str("abab"));
        assert_eq!(
            op(BinOp::Mul, Value::Int(2), Value::list(vec![Value::None])).unwrap(),
            Value::list(vec![Value::None, Value::None])
        );
        assert_eq!(
            op(BinOp::Add, Value::tuple(vec![Value::Int(1)]), Value::tuple(vec![Value::Int(2)])).unwrap(),
            Value::tuple(vec![Value::Int(1), Value::Int(2)])
        );
    }

    #[test]
    fn test_huge_repetition_raises_memory_error() {
        let huge = Value::Int(1_000_000_000_000_000_000);
        let err = op(BinOp::Mul, Value::str("a"), huge.clone()).unwrap_err();
        assert_eq!(err.kind(), ExceptionKind::MemoryError);
        assert_eq!(err.to_string(), "MemoryError");

        let err = op(BinOp::Mul, Value::list(vec![Value::Int(0)]), huge.clone()).unwrap_err();
        assert_eq!(err.kind(), ExceptionKind::MemoryError);

        let err = op(BinOp::Mul, huge.clone(), Value::tuple(vec![Value::None])).unwrap_err();
        assert_eq!(err.kind(), ExceptionKind::MemoryError);

        let err = op(BinOp::Mul, Value::str("ab"), Value::Int(i64::MAX)).unwrap_err();
        assert_eq!(err.kind(), ExceptionKind::MemoryError);

        // Nothing to build
        assert_eq!(op(BinOp::Mul, Value::str(""), huge.clone()).unwrap(), Value::str(""));
        assert_eq!(op(BinOp::Mul, Value::list(vec![]), huge).unwrap(), Value::list(vec![]));
        assert_eq!(op(BinOp::Mul, Value::str("ab"), Value::Int(-3)).unwrap(), Value::str(""));
    }

    #[test]
    fn test_unsupported_operands() {
        let err = op(BinOp::Add, Value::Int(1), Value::str("a")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "TypeError: unsupported operand type(s) for +: 'int' and 'str'"
        );
    }
}
