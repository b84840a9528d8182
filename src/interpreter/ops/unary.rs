use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::ScriptError;
use crate::memory::value::Value;
use crate::parser::ast::{SourceLocation, UnOp};

impl Interpreter {
    pub(crate) fn unary_op(
        &self,
        op: UnOp,
        operand: &Value,
        location: SourceLocation,
    ) -> Result<Value, ScriptError> {
        let result = match (op, operand) {
            (UnOp::Not, value) => Some(Value::Bool(!value.is_truthy())),
            (UnOp::Neg, Value::Float(x)) => Some(Value::Float(-x)),
            (UnOp::Neg, value) => match value.as_int() {
                Some(n) => Some(Value::Int(
                    n.checked_neg().ok_or_else(|| ScriptError::overflow(location))?,
                )),
                None => None,
            },
            (UnOp::Pos, Value::Float(x)) => Some(Value::Float(*x)),
            (UnOp::Pos, value) => value.as_int().map(Value::Int),
            (UnOp::Invert, value) => value.as_int().map(|n| Value::Int(!n)),
        };

        result.ok_or_else(|| {
            let symbol = match op {
                UnOp::Neg => "-",
                UnOp::Pos => "+",
                UnOp::Invert => "~",
                UnOp::Not => "not",
            };
            ScriptError::type_error(
                format!("bad operand type for unary {}: '{}'", symbol, operand.type_name()),
                location,
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminal::Terminal;

    fn op(op: UnOp, operand: Value) -> Result<Value, ScriptError> {
        let (terminal, _) = Terminal::capture();
        Interpreter::new(terminal).unary_op(op, &operand, SourceLocation::default())
    }

    #[test]
    fn test_unary_operators() {
        assert_eq!(op(UnOp::Neg, Value::Int(3)).unwrap(), Value::Int(-3));
        assert_eq!(op(UnOp::Neg, Value::Bool(true)).unwrap(), Value::Int(-1));
        assert_eq!(op(UnOp::Pos, Value::Float(1.5)).unwrap(), Value::Float(1.5));
        assert_eq!(op(UnOp::Invert, Value::Int(5)).unwrap(), Value::Int(-6));
        assert_eq!(op(UnOp::Not, Value::str("")).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_bad_operand() {
        let err = op(UnOp::Neg, Value::str("a")).unwrap_err();
        assert_eq!(err.to_string(), "TypeError: bad operand type for unary -: 'str'");

        let err = op(UnOp::Neg, Value::Int(i64::MIN)).unwrap_err();
        assert!(err.to_string().starts_with("OverflowError"));
    }
}
