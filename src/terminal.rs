//! Output stream shared by the traced program and the tracer
//!
//! The script's `print` output and the tracer's lines go through the same
//! [`Terminal`], so they interleave in execution order. Writes never fail from the
//! caller's point of view: the first I/O error is logged and every later write is
//! dropped, which keeps a closed pipe from aborting the traced program.
//!
//! A [`Terminal`] is `Send`, so a session can hand it to the thread that runs
//! the script.

use crossterm::tty::IsTty;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

struct Sink {
    out: Box<dyn Write + Send>,
    broken: bool,
}

/// Cloneable handle to one append-only output stream
#[derive(Clone)]
pub struct Terminal {
    sink: Arc<Mutex<Sink>>,
    tty: bool,
}

impl Terminal {
    pub fn new(out: impl Write + Send + 'static) -> Self {
        Terminal {
            sink: Arc::new(Mutex::new(Sink {
                out: Box::new(out),
                broken: false,
            })),
            tty: false,
        }
    }

    // A panicking writer leaves the sink usable
    fn sink(&self) -> MutexGuard<'_, Sink> {
        self.sink.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Terminal writing to the process's standard output
    pub fn stdout() -> Self {
        let stdout = io::stdout();
        let tty = stdout.is_tty();
        Terminal {
            tty,
            ..Self::new(stdout)
        }
    }

    /// Terminal writing into memory, for tests and embedding
    pub fn capture() -> (Self, SharedBuffer) {
        let buffer = SharedBuffer::default();
        (Self::new(buffer.clone()), buffer)
    }

    pub fn write_str(&self, text: &str) {
        let mut sink = self.sink();
        if sink.broken {
            return;
        }
        if let Err(err) = sink.out.write_all(text.as_bytes()) {
            sink.broken = true;
            tracing::warn!(error = %err, "output stream failed; further output is dropped");
        }
    }

    pub fn write_line(&self, line: &str) {
        let mut text = String::with_capacity(line.len() + 1);
        text.push_str(line);
        text.push('\n');
        self.write_str(&text);
    }

    pub fn flush(&self) {
        let mut sink = self.sink();
        if sink.broken {
            return;
        }
        if let Err(err) = sink.out.flush() {
            sink.broken = true;
            tracing::warn!(error = %err, "output stream failed; further output is dropped");
        }
    }

    /// Whether the stream is an interactive terminal
    pub fn is_tty(&self) -> bool {
        self.tty
    }

    /// Whether a write has failed
    pub fn is_broken(&self) -> bool {
        self.sink().broken
    }
}

/// In-memory writer whose contents stay readable through clones
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    fn bytes(&self) -> MutexGuard<'_, Vec<u8>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.bytes()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_capture_interleaves_writes() {
        let (terminal, buffer) = Terminal::capture();
        let clone = terminal.clone();
        terminal.write_str("a");
        clone.write_line("b");
        terminal.write_line("c");
        assert_eq!(buffer.contents(), "ab\nc\n");
    }

    #[test]
    fn test_failed_stream_is_disabled() {
        let terminal = Terminal::new(FailingWriter);
        terminal.write_line("lost");
        assert!(terminal.is_broken());
        terminal.write_line("also lost");
    }

    #[test]
    fn test_terminal_crosses_threads() {
        let (terminal, buffer) = Terminal::capture();
        std::thread::spawn(move || terminal.write_line("from a thread"))
            .join()
            .unwrap();
        assert_eq!(buffer.contents(), "from a thread\n");
    }

    #[test]
    fn test_capture_is_not_a_tty() {
        let (terminal, _) = Terminal::capture();
        assert!(!terminal.is_tty());
    }
}
