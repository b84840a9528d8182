//! Assignment targets
//!
//! Resolves the left-hand side of `=`, `for` and augmented assignment:
//!
//! - Names bind in the current scope (see `engine::store_name`)
//! - Subscripts store into lists and dicts, including slice assignment
//! - Tuple and list targets unpack any iterable element by element

use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::{ExceptionKind, ScriptError};
use crate::memory::value::Value;
use crate::parser::ast::Expr;

impl Interpreter {
    pub(crate) fn assign_target(&mut self, target: &Expr, value: Value) -> Result<(), ScriptError> {
        match target {
            Expr::Name(name, location) => self.store_name(name, value, *location),

            Expr::Subscript {
                object,
                index,
                location,
            } => {
                let object = self.eval_expr(object)?;
                let index = self.eval_expr(index)?;
                self.set_item(&object, index, value, *location)
            }

            Expr::Tuple(targets, location) | Expr::List(targets, location) => {
                let items = match &value {
                    Value::Tuple(items) => items.to_vec(),
                    Value::List(items) => items.borrow().clone(),
                    other => self.iterate(other, *location).map_err(|_| {
                        ScriptError::type_error(
                            format!("cannot unpack non-iterable {} object", other.type_name()),
                            *location,
                        )
                    })?.collect(),
                };

                if items.len() > targets.len() {
                    return Err(ScriptError::value_error(
                        format!("too many values to unpack (expected {})", targets.len()),
                        *location,
                    ));
                }
                if items.len() < targets.len() {
                    return Err(ScriptError::value_error(
                        format!(
                            "not enough values to unpack (expected {}, got {})",
                            targets.len(),
                            items.len()
                        ),
                        *location,
                    ));
                }

                for (target, item) in targets.iter().zip(items) {
                    self.assign_target(target, item)?;
                }
                Ok(())
            }

            other => Err(ScriptError::new(
                ExceptionKind::RuntimeError,
                "cannot assign to expression",
                other.location(),
            )),
        }
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

    #[test]
    fn test_nested_unpacking() {
        let out = run("[a, (b, c)] = 'x', 'yz'\nprint(a, b, c)\n").unwrap();
        assert_eq!(out, "x y z\n");
    }

    #[test]
    fn test_unpacking_errors() {
        let err = run("a, b = [1, 2, 3]\n").unwrap_err();
        assert_eq!(err.to_string(), "ValueError: too many values to unpack (expected 2)");

        let err = run("a, b, c = (1, 2)\n").unwrap_err();
        assert_eq!(
            err.to_string(),
            "ValueError: not enough values to unpack (expected 3, got 2)"
        );

        let err = run("a, b = 5\n").unwrap_err();
        assert_eq!(err.to_string(), "TypeError: cannot unpack non-iterable int object");
    }

    #[test]
    fn test_subscript_targets() {
        let out = run("d = {}\nxs = [0, 0]\nd['k'], xs[1] = 1, 2\nprint(d, xs)\n").unwrap();
        assert_eq!(out, "{'k': 1} [0, 2]\n");
    }
}
