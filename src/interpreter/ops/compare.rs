use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::ScriptError;
use crate::memory::value::Value;
use crate::parser::ast::{CmpOp, SourceLocation};
use std::cmp::Ordering;

impl Interpreter {
    /// Evaluate one link of a comparison chain
    pub(crate) fn compare(
        &self,
        op: CmpOp,
        left: &Value,
        right: &Value,
        location: SourceLocation,
    ) -> Result<bool, ScriptError> {
        Ok(match op {
            CmpOp::Eq => left == right,
            CmpOp::Ne => left != right,
            CmpOp::Is => left.is(right),
            CmpOp::IsNot => !left.is(right),
            CmpOp::In => self.contains(right, left, location)?,
            CmpOp::NotIn => !self.contains(right, left, location)?,
            CmpOp::Lt | CmpOp::Le | CmpOp::Gt | CmpOp::Ge => {
                // NaN is unordered: every ordering comparison is false
                let Some(ordering) = self.order(op, left, right, location)? else {
                    return Ok(false);
                };
                match op {
                    CmpOp::Lt => ordering == Ordering::Less,
                    CmpOp::Le => ordering != Ordering::Greater,
                    CmpOp::Gt => ordering == Ordering::Greater,
                    _ => ordering != Ordering::Less,
                }
            }
        })
    }

    /// `a < b`, used by sorting and `min`/`max`
    pub(crate) fn less_than(
        &self,
        left: &Value,
        right: &Value,
        location: SourceLocation,
    ) -> Result<bool, ScriptError> {
        self.compare(CmpOp::Lt, left, right, location)
    }

    fn order(
        &self,
        op: CmpOp,
        left: &Value,
        right: &Value,
        location: SourceLocation,
    ) -> Result<Option<Ordering>, ScriptError> {
        match (left, right) {
            (Value::Str(a), Value::Str(b)) => return Ok(Some(a.cmp(b))),
            (Value::List(a), Value::List(b)) => {
                return self.order_sequences(op, &a.borrow(), &b.borrow(), location)
            }
            (Value::Tuple(a), Value::Tuple(b)) => {
                return self.order_sequences(op, a, b, location)
            }
            _ => {}
        }

        match (left, right) {
            (Value::Int(_) | Value::Bool(_), Value::Int(_) | Value::Bool(_)) => {
                Ok(left.as_int().cmp(&right.as_int()).into())
            }
            _ => match (left.as_float(), right.as_float()) {
                (Some(a), Some(b)) => Ok(a.partial_cmp(&b)),
                _ => Err(ScriptError::type_error(
                    format!(
                        "'{}' not supported between instances of '{}' and '{}'",
                        op.symbol(),
                        left.type_name(),
                        right.type_name()
                    ),
                    location,
                )),
            },
        }
    }

    /// Lexicographic ordering: the first unequal pair decides, then length
    fn order_sequences(
        &self,
        op: CmpOp,
        left: &[Value],
        right: &[Value],
        location: SourceLocation,
    ) -> Result<Option<Ordering>, ScriptError> {
        for (a, b) in left.iter().zip(right) {
            if a != b {
                return self.order(op, a, b, location);
            }
        }
        Ok(Some(left.len().cmp(&right.len())))
    }

    /// Membership test (`needle in container`)
    pub(crate) fn contains(
        &self,
        container: &Value,
        needle: &Value,
        location: SourceLocation,
    ) -> Result<bool, ScriptError> {
        match container {
            Value::List(items) => Ok(items.borrow().iter().any(|item| item == needle)),
            Value::Tuple(items) => Ok(items.iter().any(|item| item == needle)),
            Value::Dict(dict) => dict
                .borrow()
                .contains_key(needle)
                .map_err(|type_name| ScriptError::unhashable(type_name, location)),
            Value::Str(haystack) => match needle {
                Value::Str(needle) => Ok(haystack.contains(&**needle)),
                other => Err(ScriptError::type_error(
                    format!(
                        "'in <string>' requires string as left operand, not {}",
                        other.type_name()
                    ),
                    location,
                )),
            },
            Value::Range(range) => {
                let n = match needle {
                    Value::Float(x) if x.fract() == 0.0 => Some(*x as i64),
                    Value::Float(_) => None,
                    other => other.as_int(),
                };
                Ok(n.is_some_and(|n| {
                    let in_bounds = if range.step > 0 {
                        n >= range.start && n < range.stop
                    } else {
                        n <= range.start && n > range.stop
                    };
                    in_bounds && (n as i128 - range.start as i128) % range.step as i128 == 0
                }))
            }
            other => Err(ScriptError::type_error(
                format!("argument of type '{}' is not iterable", other.type_name()),
                location,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminal::Terminal;

    fn cmp(op: CmpOp, left: Value, right: Value) -> Result<bool, ScriptError> {
        let (terminal, _) = Terminal::capture();
        Interpreter::new(terminal).compare(op, &left, &right, SourceLocation::default())
    }

    fn ints(values: &[i64]) -> Value {
        Value::list(values.iter().map(|n| Value::Int(*n)).collect())
    }

    #[test]
    fn test_mixed_numeric_ordering() {
        assert!(cmp(CmpOp::Lt, Value::Int(1), Value::Float(1.5)).unwrap());
        assert!(cmp(CmpOp::Ge, Value::Bool(true), Value::Int(1)).unwrap());
        assert!(!cmp(CmpOp::Lt, Value::Float(f64::NAN), Value::Int(1)).unwrap());
        assert!(!cmp(CmpOp::Ge, Value::Float(f64::NAN), Value::Int(1)).unwrap());
    }

    #[test]
    fn test_sequence_ordering() {
        assert!(cmp(CmpOp::Lt, ints(&[1, 2]), ints(&[1, 3])).unwrap());
        assert!(cmp(CmpOp::Lt, ints(&[1, 2]), ints(&[1, 2, 0])).unwrap());
        assert!(cmp(CmpOp::Le, ints(&[1, 2]), ints(&[1, 2])).unwrap());
        assert!(cmp(CmpOp::Gt, Value::str("b"), Value::str("abc")).unwrap());
    }

    #[test]
    fn test_unorderable_types() {
        let err = cmp(CmpOp::Lt, Value::Int(1), Value::str("a")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "TypeError: '<' not supported between instances of 'int' and 'str'"
        );
    }

    #[test]
    fn test_membership() {
        assert!(cmp(CmpOp::In, Value::Int(2), ints(&[1, 2])).unwrap());
        assert!(cmp(CmpOp::NotIn, Value::str("z"), Value::str("abc")).unwrap());
        assert!(cmp(CmpOp::In, Value::str("bc"), Value::str("abc")).unwrap());

        let (terminal, _) = Terminal::capture();
        let interp = Interpreter::new(terminal);
        let evens = Value::Range(crate::memory::value::RangeValue {
            start: 0,
            stop: 10,
            step: 2,
        });
        let loc = SourceLocation::default();
        assert!(interp.contains(&evens, &Value::Int(4), loc).unwrap());
        assert!(!interp.contains(&evens, &Value::Int(5), loc).unwrap());
        assert!(!interp.contains(&evens, &Value::Int(10), loc).unwrap());

        let err = cmp(CmpOp::In, Value::Int(1), Value::Int(2)).unwrap_err();
        assert_eq!(err.to_string(), "TypeError: argument of type 'int' is not iterable");
    }

    #[test]
    fn test_identity() {
        let xs = ints(&[1]);
        assert!(cmp(CmpOp::Is, xs.clone(), xs.clone()).unwrap());
        assert!(!cmp(CmpOp::Is, xs, ints(&[1])).unwrap());
        assert!(cmp(CmpOp::IsNot, Value::None, Value::Int(0)).unwrap());
    }
}
