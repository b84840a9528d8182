// linetrace: run a script and print its variables line by line

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use linetrace::interpreter::engine::DEFAULT_RECURSION_LIMIT;
use linetrace::{trace_file, ColorChoice, TraceError, TraceOptions};

/// Trace a script, printing the variables in scope after every line
#[derive(Debug, Parser)]
#[command(name = "linetrace", version, about)]
struct Args {
    /// Print the source listing, per-event headers and the full frame stack
    #[arg(short, long)]
    verbose: bool,

    /// Show names that start with `__`
    #[arg(long)]
    display_dunders: bool,

    /// Show values whose representation cannot be produced
    #[arg(long)]
    display_unrepresentables: bool,

    /// Refresh module variables on every event, not only on module lines
    #[arg(long)]
    live_globals: bool,

    /// Maximum call depth before RecursionError
    #[arg(long, default_value_t = DEFAULT_RECURSION_LIMIT)]
    recursion_limit: usize,

    /// When to color call, return and exception lines
    #[arg(long, value_enum, default_value_t = ColorChoice::Auto)]
    color: ColorChoice,

    /// Script to trace
    file: PathBuf,
}

impl Args {
    fn options(&self) -> TraceOptions {
        TraceOptions {
            verbose: self.verbose,
            display_dunders: self.display_dunders,
            display_unrepresentables: self.display_unrepresentables,
            live_globals: self.live_globals,
            recursion_limit: self.recursion_limit,
            color: self.color,
        }
    }
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_env("LINETRACE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn report(err: &TraceError) -> ExitCode {
    if let Some(message) = err.report() {
        let mut stderr = io::stderr().lock();
        let _ = stderr.write_all(message.as_bytes());
        let _ = stderr.flush();
    }
    ExitCode::from((err.exit_code() & 0xff) as u8)
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging();

    match trace_file(&args.file, &args.options()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report(&err),
    }
}
