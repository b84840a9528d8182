//! Expression evaluation implementation
//!
//! This module evaluates every expression form to a [`Value`]:
//!
//! - Literals and displays (lists, tuples, dicts)
//! - Name lookups (see `engine` for the scoping rules)
//! - Operators, delegated to `ops`
//! - Short-circuiting `and`/`or`, which yield the deciding operand
//! - Calls, attribute access and subscripts
//!
//! Operands are evaluated left to right.

use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::ScriptError;
use crate::memory::value::{Dict, SliceValue, Value};
use crate::parser::ast::*;
use std::rc::Rc;

impl Interpreter {
    pub(crate) fn eval_expr(&mut self, expr: &Expr) -> Result<Value, ScriptError> {
        match expr {
            Expr::NoneLiteral(_) => Ok(Value::None),
            Expr::BoolLiteral(b, _) => Ok(Value::Bool(*b)),
            Expr::IntLiteral(n, _) => Ok(Value::Int(*n)),
            Expr::FloatLiteral(x, _) => Ok(Value::Float(*x)),
            Expr::StringLiteral(s, _) => Ok(Value::Str(Rc::from(s.as_str()))),

            Expr::Name(name, location) => self.load_name(name, *location),

            Expr::List(items, _) => Ok(Value::list(self.eval_exprs(items)?)),
            Expr::Tuple(items, _) => Ok(Value::tuple(self.eval_exprs(items)?)),
            Expr::Dict(entries, location) => {
                let mut dict = Dict::new();
                for (key, value) in entries {
                    let key = self.eval_expr(key)?;
                    let value = self.eval_expr(value)?;
                    dict.insert(key, value)
                        .map_err(|type_name| ScriptError::unhashable(type_name, *location))?;
                }
                Ok(Value::dict(dict))
            }

            Expr::BinaryOp {
                op,
                left,
                right,
                location,
            } => {
                let left = self.eval_expr(left)?;
                let right = self.eval_expr(right)?;
                self.binary_op(*op, &left, &right, *location)
            }

            Expr::UnaryOp {
                op,
                operand,
                location,
            } => {
                let operand = self.eval_expr(operand)?;
                self.unary_op(*op, &operand, *location)
            }

            Expr::BoolOp {
                op, left, right, ..
            } => {
                let left = self.eval_expr(left)?;
                let decided = match op {
                    BoolOp::And => !left.is_truthy(),
                    BoolOp::Or => left.is_truthy(),
                };
                if decided {
                    Ok(left)
                } else {
                    self.eval_expr(right)
                }
            }

            Expr::Compare {
                left,
                comparisons,
                location,
            } => {
                let mut left = self.eval_expr(left)?;
                for (op, right) in comparisons {
                    let right = self.eval_expr(right)?;
                    if !self.compare(*op, &left, &right, *location)? {
                        return Ok(Value::Bool(false));
                    }
                    left = right;
                }
                Ok(Value::Bool(true))
            }

            Expr::Conditional {
                condition,
                then_expr,
                else_expr,
                ..
            } => {
                if self.eval_expr(condition)?.is_truthy() {
                    self.eval_expr(then_expr)
                } else {
                    self.eval_expr(else_expr)
                }
            }

            Expr::Call {
                func,
                args,
                location,
            } => {
                let callee = self.eval_expr(func)?;
                let mut positional = Vec::new();
                let mut keywords = Vec::new();
                for arg in args {
                    match arg {
                        Argument::Positional(expr) => positional.push(self.eval_expr(expr)?),
                        Argument::Keyword(name, expr) => {
                            keywords.push((name.clone(), self.eval_expr(expr)?))
                        }
                    }
                }
                self.call_value(&callee, positional, keywords, *location)
            }

            Expr::Attribute {
                object,
                name,
                location,
            } => {
                let object = self.eval_expr(object)?;
                self.get_attribute(object, name, *location)
            }

            Expr::Subscript {
                object,
                index,
                location,
            } => {
                let object = self.eval_expr(object)?;
                let index = self.eval_expr(index)?;
                self.get_item(&object, &index, *location)
            }

            Expr::Slice {
                lower,
                upper,
                step,
                ..
            } => {
                let lower = self.eval_optional(lower.as_deref())?;
                let upper = self.eval_optional(upper.as_deref())?;
                let step = self.eval_optional(step.as_deref())?;
                Ok(Value::Slice(Rc::new(SliceValue { lower, upper, step })))
            }
        }
    }

    fn eval_exprs(&mut self, exprs: &[Expr]) -> Result<Vec<Value>, ScriptError> {
        exprs.iter().map(|expr| self.eval_expr(expr)).collect()
    }

    fn eval_optional(&mut self, expr: Option<&Expr>) -> Result<Value, ScriptError> {
        match expr {
            Some(expr) => self.eval_expr(expr),
            None => Ok(Value::None),
        }
    }
}
