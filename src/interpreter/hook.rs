//! Instrumentation seam between the interpreter and a tracer
//!
//! The interpreter calls [`TraceHook::on_event`] synchronously at every call,
//! line, return and exception boundary of a frame. The hook inspects the frame it
//! is handed (name, file, line, bindings) and answers with a [`TraceDirective`].
//!
//! Only the answer to [`TraceEvent::Call`] matters: a frame answered with
//! [`TraceDirective::Skip`] receives no further events, while the frames it calls
//! are offered their own `Call` event as usual.

use crate::interpreter::errors::ExceptionValue;
use crate::memory::stack::Frame;
use crate::memory::value::Value;

/// A step of the running program
#[derive(Debug, Clone, Copy)]
pub enum TraceEvent<'a> {
    /// Arguments are bound; the first statement has not run yet
    Call,
    /// A statement (or loop header) at `frame.line` is about to run
    Line,
    /// The frame is finishing with this value
    Return(&'a Value),
    /// An exception is passing through the frame
    Exception(&'a ExceptionValue),
}

impl TraceEvent<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            TraceEvent::Call => "call",
            TraceEvent::Line => "line",
            TraceEvent::Return(_) => "return",
            TraceEvent::Exception(_) => "exception",
        }
    }
}

/// Answer of a hook to an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceDirective {
    Trace,
    Skip,
}

/// Receiver of trace events
pub trait TraceHook {
    fn on_event(&mut self, frame: &Frame, event: TraceEvent<'_>) -> TraceDirective;
}
