//! The line tracer
//!
//! [`Tracer`] is the [`TraceHook`] that turns interpreter events into trace
//! output:
//!
//! ```text
//! --> <module>
//!   <no variables>
//!   a = 1
//! <-- <module> (returned None)
//! ```
//!
//! - `Call`: `--> name`, then the new frame's merged snapshot one level deeper
//! - `Line`: the merged snapshot, unless it repeats the snapshot printed just
//!   before at any depth
//! - `Return`: a final snapshot refresh, then `<-- name (returned value)`
//! - `Exception`: `--- exception ---` and `Kind: message`
//!
//! Frames from any file other than the traced script (the prelude) are skipped.
//!
//! [`trace_file`] and [`trace_source`] run a whole session on a large-stack
//! thread: parse, execute under the tracer, detach, and hand back a
//! [`TraceError`] for the binary to report.

pub mod render;

use crate::interpreter::engine::{Interpreter, DEFAULT_RECURSION_LIMIT};
use crate::interpreter::errors::{ExceptionKind, ExceptionValue, ScriptError};
use crate::interpreter::hook::{TraceDirective, TraceEvent, TraceHook};
use crate::interpreter::prelude::{PRELUDE_FILENAME, PRELUDE_SOURCE};
use crate::memory::stack::Frame;
use crate::memory::value::Value;
use crate::parser::{parse_program, ParseError};
use crate::snapshot::{stringify, SnapshotStack, VisibilityPolicy};
use crate::terminal::Terminal;
use render::{LineStyle, Render};
use std::fmt::Write as _;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::thread;

/// When to style markers with color
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ColorChoice {
    /// Only when the output is a terminal
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorChoice {
    pub fn enabled(self, terminal: &Terminal) -> bool {
        match self {
            ColorChoice::Auto => terminal.is_tty(),
            ColorChoice::Always => true,
            ColorChoice::Never => false,
        }
    }
}

/// Session settings
#[derive(Debug, Clone)]
pub struct TraceOptions {
    /// Source listing, per-event headers and full stack dumps
    pub verbose: bool,
    pub display_dunders: bool,
    pub display_unrepresentables: bool,
    /// Refresh the module scope on every event instead of only on its own
    pub live_globals: bool,
    pub recursion_limit: usize,
    pub color: ColorChoice,
}

impl Default for TraceOptions {
    fn default() -> Self {
        TraceOptions {
            verbose: false,
            display_dunders: false,
            display_unrepresentables: false,
            live_globals: false,
            recursion_limit: DEFAULT_RECURSION_LIMIT,
            color: ColorChoice::Auto,
        }
    }
}

impl TraceOptions {
    pub fn visibility(&self) -> VisibilityPolicy {
        VisibilityPolicy {
            display_dunders: self.display_dunders,
            display_unrepresentables: self.display_unrepresentables,
        }
    }
}

/// Failure of a tracing session
#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    #[error("can't open file '{}': {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("{filename}: {error}")]
    Syntax {
        filename: String,
        /// Text of the offending line
        line: Option<String>,
        error: ParseError,
    },

    /// The script ended with an exception (including `SystemExit`)
    #[error("{summary}")]
    Script {
        kind: ExceptionKind,
        summary: String,
        /// Exit status the exception maps to
        status: i32,
        /// Traceback, or the `SystemExit` message
        message: Option<String>,
    },

    #[error("failed to start the tracing thread: {0}")]
    Spawn(#[source] io::Error),
}

impl TraceError {
    /// Process exit status for this failure
    pub fn exit_code(&self) -> i32 {
        match self {
            TraceError::Io { .. } => 2,
            TraceError::Syntax { .. } | TraceError::Spawn(_) => 1,
            TraceError::Script { status, .. } => *status,
        }
    }

    /// What to print on standard error, if anything
    pub fn report(&self) -> Option<String> {
        match self {
            TraceError::Io { .. } | TraceError::Spawn(_) => Some(format!("linetrace: {}\n", self)),
            TraceError::Syntax {
                filename,
                line,
                error,
            } => Some(syntax_report(filename, line.as_deref(), error)),
            TraceError::Script { message, .. } => message.clone(),
        }
    }

    /// Exception class that ended the script, if one did
    pub fn exception_kind(&self) -> Option<ExceptionKind> {
        match self {
            TraceError::Script { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Detach a script failure from the interpreter's values
    fn script(error: &ScriptError, traceback: String) -> Self {
        let exception = &error.exception;
        let (status, message) = if error.kind() == ExceptionKind::SystemExit {
            let status = match exception.args.as_slice() {
                [] | [Value::None] => 0,
                [code] => code.as_int().map_or(1, |n| n as i32),
                _ => 1,
            };
            (status, system_exit_message(exception))
        } else {
            (1, Some(traceback))
        };
        TraceError::Script {
            kind: error.kind(),
            summary: error.to_string(),
            status,
            message,
        }
    }
}

/// `exit('message')` prints its argument; integer and empty exits print nothing
fn system_exit_message(exception: &ExceptionValue) -> Option<String> {
    match exception.args.as_slice() {
        [] | [Value::None] | [Value::Int(_)] | [Value::Bool(_)] => None,
        _ => exception.message().ok().map(|message| format!("{}\n", message)),
    }
}

fn syntax_report(filename: &str, line: Option<&str>, error: &ParseError) -> String {
    let mut out = format!("  File \"{}\", line {}\n", filename, error.location.line);
    if let Some(text) = line {
        let trimmed = text.trim_start();
        let indent = text.chars().count() - trimmed.chars().count();
        let caret = error.location.column.saturating_sub(1).saturating_sub(indent);
        let _ = writeln!(out, "    {}", trimmed.trim_end());
        let _ = writeln!(out, "    {}^", " ".repeat(caret));
    }
    let _ = writeln!(out, "SyntaxError: {}", error.message);
    out
}

/// Trace hook printing variable snapshots and call markers
pub struct Tracer {
    filename: Rc<str>,
    lines: Vec<String>,
    verbose: bool,
    live_globals: bool,
    snapshots: SnapshotStack,
    render: Render,
}

impl Tracer {
    pub fn new(filename: &str, source: &str, options: &TraceOptions, terminal: Terminal) -> Self {
        let color = options.color.enabled(&terminal);
        Tracer {
            filename: Rc::from(filename),
            lines: source.lines().map(str::to_string).collect(),
            verbose: options.verbose,
            live_globals: options.live_globals,
            snapshots: SnapshotStack::new(options.visibility()),
            render: Render::new(terminal, color),
        }
    }

    /// `CODE` header and numbered source, printed before a verbose run
    pub fn print_listing(&self) {
        self.render.header("CODE");
        for (i, line) in self.lines.iter().enumerate() {
            self.render.plain(&format!("{:>4} {}", i + 1, line));
        }
    }

    fn source_line(&self, line: usize) -> &str {
        line.checked_sub(1)
            .and_then(|i| self.lines.get(i))
            .map_or("", |text| text.trim())
    }

    fn trace_call(&mut self, frame: &Frame) {
        self.render
            .log_styled(&format!("--> {}", frame.name), LineStyle::Call);
        self.snapshots.push(frame);
        self.render.enter();

        let view = self.snapshots.merged();
        self.snapshots.mark_shown(&view);
        self.render.log(&view);
    }

    fn trace_line(&mut self, frame: &Frame) {
        self.snapshots.refresh_top(frame);
        if self.live_globals {
            self.snapshots.refresh_module(&frame.globals.borrow());
        }

        let view = self.snapshots.merged();
        if self.snapshots.mark_shown(&view) {
            self.render.log(&view);
        } else if self.verbose {
            self.render.log(&format!("stack unchanged: {}", view));
        }

        if self.verbose {
            self.render.log("Stack (top frame first):");
            for (i, scope) in self.snapshots.frames_top_first().enumerate() {
                self.render.log(&format!(" Frame -{}: {}", i + 1, scope));
            }
        }
    }

    fn trace_return(&mut self, frame: &Frame, value: &Value) {
        self.trace_line(frame);
        self.snapshots.pop();
        self.render.leave();
        self.render.log_styled(
            &format!("<-- {} (returned {})", frame.name, stringify(value)),
            LineStyle::Return,
        );
    }

    fn trace_exception(&mut self, exception: &ExceptionValue) {
        self.render.log_styled("--- exception ---", LineStyle::Exception);
        self.render
            .log_styled(&exception.summary(), LineStyle::Exception);
    }
}

impl TraceHook for Tracer {
    fn on_event(&mut self, frame: &Frame, event: TraceEvent<'_>) -> TraceDirective {
        if matches!(event, TraceEvent::Call) && frame.filename != self.filename {
            tracing::trace!(frame = %frame.name, file = %frame.filename, "skipping frame");
            return TraceDirective::Skip;
        }

        if self.verbose {
            self.render.header("");
            self.render.plain(&format!(
                "{} {} line {}: {}",
                event.name(),
                frame.name,
                frame.line,
                self.source_line(frame.line)
            ));
        }

        match event {
            TraceEvent::Call => self.trace_call(frame),
            TraceEvent::Line => self.trace_line(frame),
            TraceEvent::Return(value) => self.trace_return(frame, value),
            TraceEvent::Exception(exception) => self.trace_exception(exception),
        }
        TraceDirective::Trace
    }
}

/// Trace the script at `path`, writing to standard output
pub fn trace_file(path: &Path, options: &TraceOptions) -> Result<(), TraceError> {
    let source = std::fs::read_to_string(path).map_err(|source| TraceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    trace_source(&source, &path.display().to_string(), options, Terminal::stdout())
}

/// Native stack for the session thread
///
/// Every script call recurses through the evaluator, so the default recursion
/// limit needs far more than a spawned thread's default stack.
pub const SESSION_STACK_SIZE: usize = 256 * 1024 * 1024;

/// Trace `source` as if it were the file `filename`
///
/// The session runs on its own thread with [`SESSION_STACK_SIZE`] bytes of
/// stack; this call blocks until it finishes.
pub fn trace_source(
    source: &str,
    filename: &str,
    options: &TraceOptions,
    terminal: Terminal,
) -> Result<(), TraceError> {
    thread::scope(|scope| -> Result<(), TraceError> {
        let worker = thread::Builder::new()
            .name("linetrace".to_string())
            .stack_size(SESSION_STACK_SIZE)
            .spawn_scoped(scope, move || session(source, filename, options, terminal))
            .map_err(TraceError::Spawn)?;
        match worker.join() {
            Ok(result) => result,
            Err(payload) => std::panic::resume_unwind(payload),
        }
    })
}

fn session(
    source: &str,
    filename: &str,
    options: &TraceOptions,
    terminal: Terminal,
) -> Result<(), TraceError> {
    let program = parse_program(source).map_err(|error| TraceError::Syntax {
        filename: filename.to_string(),
        line: error
            .location
            .line
            .checked_sub(1)
            .and_then(|i| source.lines().nth(i))
            .map(str::to_string),
        error,
    })?;

    let tracer = Tracer::new(filename, source, options, terminal.clone());
    if options.verbose {
        tracer.print_listing();
    }

    let mut interpreter = Interpreter::new(terminal.clone());
    interpreter.set_recursion_limit(options.recursion_limit);
    interpreter.set_hook(Box::new(tracer));

    tracing::info!(filename, "tracing started");
    let result = interpreter.run(&program, filename);
    interpreter.take_hook();
    terminal.flush();
    tracing::info!(filename, ok = result.is_ok(), "tracing finished");

    result.map_err(|error| {
        let lookup = |file: &str, line: usize| {
            let text = if file == filename {
                source
            } else if file == PRELUDE_FILENAME {
                PRELUDE_SOURCE
            } else {
                return None;
            };
            line.checked_sub(1)
                .and_then(|i| text.lines().nth(i))
                .map(str::to_string)
        };
        TraceError::script(&error, error.render_traceback(lookup))
    })
}
