//! Line rendering for the tracer
//!
//! [`Render`] owns the call-depth counter and writes one indented line per call
//! to the shared [`Terminal`]. Markers and exception lines are optionally
//! styled; the indentation itself never is.

use crate::terminal::Terminal;
use crossterm::style::Stylize;

/// Width of verbose-mode headers
pub const HEADER_WIDTH: usize = 60;

/// Kind of line, for styling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStyle {
    Plain,
    Call,
    Return,
    Exception,
}

pub struct Render {
    terminal: Terminal,
    depth: usize,
    color: bool,
}

impl Render {
    pub fn new(terminal: Terminal, color: bool) -> Self {
        Render {
            terminal,
            depth: 0,
            color,
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Indent one level deeper (entering a call)
    pub fn enter(&mut self) {
        self.depth += 1;
    }

    /// Back out one level (after a return marker)
    pub fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Write `text` at the current depth
    pub fn log(&self, text: &str) {
        self.log_styled(text, LineStyle::Plain);
    }

    pub fn log_styled(&self, text: &str, style: LineStyle) {
        let indent = "  ".repeat(self.depth);
        let line = if self.color {
            match style {
                LineStyle::Plain => text.to_string(),
                LineStyle::Call => text.green().to_string(),
                LineStyle::Return => text.blue().to_string(),
                LineStyle::Exception => text.red().to_string(),
            }
        } else {
            text.to_string()
        };
        self.terminal.write_line(&format!("{}{}", indent, line));
    }

    /// Write an unindented line
    pub fn plain(&self, text: &str) {
        self.terminal.write_line(text);
    }

    /// A full-width dashed rule, with `title` centred in it when given
    pub fn header(&self, title: &str) {
        self.terminal.write_line(&header_line(title));
    }
}

fn header_line(title: &str) -> String {
    if title.is_empty() {
        return "-".repeat(HEADER_WIDTH);
    }
    let dashes = HEADER_WIDTH.saturating_sub(title.chars().count() + 2);
    let front = "-".repeat(dashes / 2);
    let back = "-".repeat(dashes - dashes / 2);
    format!("{} {} {}", front, title, back)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_is_full_width() {
        assert_eq!(header_line(""), "-".repeat(60));
        let code = header_line("CODE");
        assert_eq!(code.len(), HEADER_WIDTH);
        assert_eq!(code, format!("{} CODE {}", "-".repeat(27), "-".repeat(27)));
        assert_eq!(header_line("ODD"), format!("{} ODD {}", "-".repeat(27), "-".repeat(28)));
    }

    #[test]
    fn test_indentation_follows_depth() {
        let (terminal, buffer) = Terminal::capture();
        let mut render = Render::new(terminal, false);
        render.log("--> <module>");
        render.enter();
        render.log("a = 1");
        render.enter();
        render.leave();
        render.leave();
        render.leave();
        render.log_styled("<-- <module> (returned None)", LineStyle::Return);
        assert_eq!(render.depth(), 0);
        assert_eq!(buffer.contents(), "--> <module>\n  a = 1\n<-- <module> (returned None)\n");
    }

    #[test]
    fn test_color_wraps_text_but_not_indentation() {
        let (terminal, buffer) = Terminal::capture();
        let mut render = Render::new(terminal, true);
        render.enter();
        render.log_styled("--> f", LineStyle::Call);
        let out = buffer.contents();
        assert!(out.starts_with("  \u{1b}["));
        assert!(out.contains("--> f"));
    }
}
