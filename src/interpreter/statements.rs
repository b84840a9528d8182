//! Statement execution implementation
//!
//! This module handles the execution of all statement types, including:
//!
//! - Expression statements, assignments and augmented assignments
//! - Control flow (`if`/`elif`/`else`; loops live in `loops`)
//! - Function definitions and returns
//! - `global`, `del`, `assert`, `raise`, `try`/`except`
//!
//! # Line events
//!
//! [`Interpreter::exec_statement`] fires the `Line` event before a statement runs,
//! except for statements that share a physical line after `;` and for `global`
//! declarations. `elif` tests and matched `except` clauses fire at their own
//! lines.

use crate::interpreter::engine::{ControlFlow, Interpreter};
use crate::interpreter::errors::{ExceptionKind, ExceptionValue, ScriptError};
use crate::memory::value::{Function, Value};
use crate::parser::ast::*;
use std::rc::Rc;

impl Interpreter {
    /// Execute statements until one changes control flow
    pub(crate) fn exec_block(&mut self, body: &[Stmt]) -> Result<ControlFlow, ScriptError> {
        for stmt in body {
            let flow = self.exec_statement(stmt)?;
            if !matches!(flow, ControlFlow::Normal) {
                return Ok(flow);
            }
        }
        Ok(ControlFlow::Normal)
    }

    pub(crate) fn exec_statement(&mut self, stmt: &Stmt) -> Result<ControlFlow, ScriptError> {
        if stmt.fires_line_event() {
            self.trace_line(stmt.location.line);
        } else {
            self.set_line(stmt.location.line);
        }

        self.exec_statement_kind(stmt).map_err(|mut err| {
            self.report_exception(&mut err);
            err
        })
    }

    fn exec_statement_kind(&mut self, stmt: &Stmt) -> Result<ControlFlow, ScriptError> {
        let location = stmt.location;

        match &stmt.kind {
            StmtKind::Expr(expr) => {
                self.eval_expr(expr)?;
            }
            StmtKind::Assign { targets, value } => {
                let value = self.eval_expr(value)?;
                for target in targets {
                    self.assign_target(target, value.clone())?;
                }
            }
            StmtKind::AugAssign { target, op, value } => {
                self.exec_aug_assign(target, *op, value, location)?;
            }
            StmtKind::If { branches, orelse } => {
                for (i, branch) in branches.iter().enumerate() {
                    if i > 0 {
                        self.trace_line(branch.location.line);
                    }
                    if self.eval_expr(&branch.condition)?.is_truthy() {
                        return self.exec_block(&branch.body);
                    }
                }
                if let Some(orelse) = orelse {
                    return self.exec_block(orelse);
                }
            }
            StmtKind::While { condition, body } => {
                return self.exec_while(condition, body, location);
            }
            StmtKind::For { target, iter, body } => {
                return self.exec_for(target, iter, body, location);
            }
            StmtKind::FunctionDef(def) => {
                self.exec_function_def(def, location)?;
            }
            StmtKind::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval_expr(expr)?,
                    None => Value::None,
                };
                return Ok(ControlFlow::Return(value));
            }
            StmtKind::Global(_) | StmtKind::Pass => {}
            StmtKind::Del(targets) => {
                for target in targets {
                    self.delete_target(target)?;
                }
            }
            StmtKind::Assert { test, message } => {
                if !self.eval_expr(test)?.is_truthy() {
                    let args = match message {
                        Some(expr) => vec![self.eval_expr(expr)?],
                        None => Vec::new(),
                    };
                    return Err(ScriptError::raise(
                        Rc::new(ExceptionValue::new(ExceptionKind::AssertionError, args)),
                        location,
                    ));
                }
            }
            StmtKind::Raise(exception) => {
                return Err(self.exec_raise(exception.as_ref(), location)?);
            }
            StmtKind::Try { body, handlers } => {
                return self.exec_try(body, handlers);
            }
            StmtKind::Break => return Ok(ControlFlow::Break),
            StmtKind::Continue => return Ok(ControlFlow::Continue),
        }

        Ok(ControlFlow::Normal)
    }

    fn exec_aug_assign(
        &mut self,
        target: &Expr,
        op: BinOp,
        value: &Expr,
        location: SourceLocation,
    ) -> Result<(), ScriptError> {
        match target {
            Expr::Name(name, name_loc) => {
                let current = self.load_name(name, *name_loc)?;
                let rhs = self.eval_expr(value)?;
                let result = self.inplace_op(op, current, &rhs, location)?;
                self.store_name(name, result, location)
            }
            Expr::Subscript { object, index, .. } => {
                // Object and index are evaluated once
                let object = self.eval_expr(object)?;
                let index = self.eval_expr(index)?;
                let current = self.get_item(&object, &index, location)?;
                let rhs = self.eval_expr(value)?;
                let result = self.inplace_op(op, current, &rhs, location)?;
                self.set_item(&object, index, result, location)
            }
            _ => Err(ScriptError::new(
                ExceptionKind::RuntimeError,
                "illegal expression for augmented assignment",
                location,
            )),
        }
    }

    /// `+=` extends a list in place; everything else rebinds
    fn inplace_op(
        &mut self,
        op: BinOp,
        current: Value,
        rhs: &Value,
        location: SourceLocation,
    ) -> Result<Value, ScriptError> {
        if let (BinOp::Add, Value::List(items)) = (op, &current) {
            let extra = self.collect_iterable(rhs, location)?;
            items.borrow_mut().extend(extra);
            return Ok(current);
        }
        self.binary_op(op, &current, rhs, location)
    }

    fn exec_function_def(
        &mut self,
        def: &Rc<FunctionDef>,
        location: SourceLocation,
    ) -> Result<(), ScriptError> {
        let mut defaults = Vec::new();
        for param in &def.params {
            if let Some(default) = &param.default {
                defaults.push(self.eval_expr(default)?);
            }
        }

        let frame = self.current_frame(location)?;
        let function = Function {
            def: def.clone(),
            defaults,
            globals: frame.globals.clone(),
            filename: frame.filename.clone(),
        };

        self.store_name(&def.name, Value::Function(Rc::new(function)), location)
    }

    /// Build the error a `raise` statement throws
    fn exec_raise(
        &mut self,
        exception: Option<&Expr>,
        location: SourceLocation,
    ) -> Result<ScriptError, ScriptError> {
        let Some(expr) = exception else {
            return match self.handling.last() {
                Some(active) => Ok(ScriptError::raise(active.clone(), location)),
                None => Ok(ScriptError::new(
                    ExceptionKind::RuntimeError,
                    "No active exception to reraise",
                    location,
                )),
            };
        };

        match self.eval_expr(expr)? {
            Value::Exception(exception) => Ok(ScriptError::raise(exception, location)),
            Value::ExceptionClass(kind) => Ok(ScriptError::raise(
                Rc::new(ExceptionValue::new(kind, Vec::new())),
                location,
            )),
            _ => Ok(ScriptError::type_error(
                "exceptions must derive from BaseException",
                location,
            )),
        }
    }

    fn exec_try(
        &mut self,
        body: &[Stmt],
        handlers: &[ExceptHandler],
    ) -> Result<ControlFlow, ScriptError> {
        let err = match self.exec_block(body) {
            Ok(flow) => return Ok(flow),
            Err(err) => err,
        };

        for handler in handlers {
            if !self.handler_matches(handler, &err)? {
                continue;
            }

            self.trace_line(handler.location.line);
            if let Some(binding) = &handler.binding {
                self.store_name(binding, Value::Exception(err.exception.clone()), handler.location)?;
            }

            self.handling.push(err.exception.clone());
            let result = self.exec_block(&handler.body);
            self.handling.pop();

            // The `as` name does not outlive its handler
            if let Some(binding) = &handler.binding {
                let _ = self.delete_name(binding, handler.location);
            }
            return result;
        }

        Err(err)
    }

    fn handler_matches(
        &mut self,
        handler: &ExceptHandler,
        err: &ScriptError,
    ) -> Result<bool, ScriptError> {
        let Some(kind_name) = &handler.kind else {
            return Ok(true);
        };

        match self.load_name(kind_name, handler.location)? {
            Value::ExceptionClass(kind) => Ok(err.kind().is_subclass_of(kind)),
            _ => Err(ScriptError::type_error(
                "catching classes that do not inherit from BaseException is not allowed",
                handler.location,
            )),
        }
    }

    fn delete_target(&mut self, target: &Expr) -> Result<(), ScriptError> {
        match target {
            Expr::Name(name, location) => self.delete_name(name, *location),
            Expr::Subscript {
                object,
                index,
                location,
            } => {
                let object = self.eval_expr(object)?;
                let index = self.eval_expr(index)?;
                self.delete_item(&object, &index, *location)
            }
            other => Err(ScriptError::new(
                ExceptionKind::RuntimeError,
                "cannot delete expression",
                other.location(),
            )),
        }
    }
}
