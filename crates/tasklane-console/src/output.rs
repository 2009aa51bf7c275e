//! Styled log lines and line prompts.

use std::sync::Arc;

use console::Style;

use crate::error::ConsoleError;
use crate::terminal::{RealTerminal, Stream, TerminalIO};

/// Console front end over a [`TerminalIO`].
///
/// ```rust
/// use tasklane_console::{Console, MockTerminal};
///
/// let console = Console::with_terminal(MockTerminal::interactive());
/// let written = console.success("done\n")?;
/// assert_eq!(written, 5);
/// assert_eq!(console.terminal().stdout(), "done\n");
/// # Ok::<(), tasklane_console::ConsoleError>(())
/// ```
#[derive(Clone)]
pub struct Console<T: TerminalIO = RealTerminal> {
    terminal: Arc<T>,
}

impl Console<RealTerminal> {
    /// A console on the process terminal.
    pub fn new() -> Self {
        Self {
            terminal: Arc::new(RealTerminal),
        }
    }
}

impl Default for Console<RealTerminal> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TerminalIO> Console<T> {
    /// A console on a custom terminal, usually a mock.
    pub fn with_terminal(terminal: T) -> Self {
        Self {
            terminal: Arc::new(terminal),
        }
    }

    pub fn terminal(&self) -> &T {
        &self.terminal
    }

    /// Writes a plain message to stdout.
    pub fn log(&self, message: &str) -> Result<usize, ConsoleError> {
        self.emit(Stream::Stdout, message, None)
    }

    /// Writes a green message to stdout.
    pub fn success(&self, message: &str) -> Result<usize, ConsoleError> {
        self.emit(Stream::Stdout, message, Some(Style::new().green()))
    }

    /// Writes a blue message to stdout.
    pub fn info(&self, message: &str) -> Result<usize, ConsoleError> {
        self.emit(Stream::Stdout, message, Some(Style::new().blue()))
    }

    /// Writes a bold yellow message to stderr.
    pub fn warning(&self, message: &str) -> Result<usize, ConsoleError> {
        self.emit(Stream::Stderr, message, Some(Style::new().yellow().bold()))
    }

    /// Writes a red message to stderr.
    pub fn error(&self, message: &str) -> Result<usize, ConsoleError> {
        self.emit(Stream::Stderr, message, Some(Style::new().red()))
    }

    /// Prints `question` and returns the trimmed answer.
    ///
    /// Returns an empty string without prompting when the console is not
    /// interactive.
    pub fn confirm(&self, question: &str) -> Result<String, ConsoleError> {
        if !self.is_interactive() {
            return Ok(String::new());
        }
        self.log(question)?;
        let line = self.terminal.read_line()?;
        Ok(line.trim().to_string())
    }

    /// Titles the terminal window, typically with the running command.
    ///
    /// Returns false without writing anything when the console is not
    /// interactive.
    pub fn title(&self, title: &str) -> Result<bool, ConsoleError> {
        if !self.is_interactive() {
            return Ok(false);
        }
        self.terminal.set_title(title)?;
        Ok(true)
    }

    pub fn is_interactive(&self) -> bool {
        self.terminal.is_terminal()
    }

    /// Applies `style` when the terminal has colors enabled.
    pub(crate) fn paint(&self, text: &str, style: Style) -> String {
        if self.terminal.colors_enabled() {
            style.force_styling(true).apply_to(text).to_string()
        } else {
            text.to_string()
        }
    }

    pub(crate) fn emit(
        &self,
        stream: Stream,
        message: &str,
        style: Option<Style>,
    ) -> Result<usize, ConsoleError> {
        let text = match style {
            Some(style) => self.paint(message, style),
            None => message.to_string(),
        };
        Ok(self.terminal.write(stream, &text)?)
    }
}

/// True when the process terminal is interactive.
pub fn is_interactive() -> bool {
    RealTerminal.is_terminal()
}

/// Terminates the process with `code`.
pub fn exit(code: i32) -> ! {
    tracing::debug!(code, "exiting");
    std::process::exit(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminal::MockTerminal;

    fn plain() -> Console<MockTerminal> {
        Console::with_terminal(MockTerminal::interactive())
    }

    fn colored() -> Console<MockTerminal> {
        Console::with_terminal(MockTerminal::interactive().with_colors(true))
    }

    #[test]
    fn test_plain_output_routes_streams() {
        let console = plain();
        console.log("a").unwrap();
        console.success("b").unwrap();
        console.info("c").unwrap();
        console.warning("d").unwrap();
        console.error("e").unwrap();

        assert_eq!(console.terminal().stdout(), "abc");
        assert_eq!(console.terminal().stderr(), "de");
    }

    #[test]
    fn test_byte_count_without_colors() {
        assert_eq!(plain().error("failure").unwrap(), 7);
        assert_eq!(plain().log("héllo").unwrap(), 6);
    }

    #[test]
    fn test_colors_wrap_message() {
        let console = colored();
        let written = console.success("ok").unwrap();
        let out = console.terminal().stdout();

        assert!(out.starts_with("\u{1b}["));
        assert!(out.contains("ok"));
        assert!(out.ends_with("\u{1b}[0m"));
        assert_eq!(written, out.len());
        assert!(written > 2);
    }

    #[test]
    fn test_log_is_never_styled() {
        let console = colored();
        console.log("raw").unwrap();
        assert_eq!(console.terminal().stdout(), "raw");
    }

    #[test]
    fn test_confirm_reads_trimmed_line() {
        let console = Console::with_terminal(MockTerminal::interactive().with_lines(["  Y  "]));
        let answer = console.confirm("Proceed? ").unwrap();
        assert_eq!(answer, "Y");
        assert_eq!(console.terminal().stdout(), "Proceed? ");
    }

    #[test]
    fn test_title_writes_osc_sequence() {
        let console = plain();
        assert!(console.title("tasklane build").unwrap());
        assert_eq!(console.terminal().stdout(), "\u{1b}]0;tasklane build\u{7}");
    }

    #[test]
    fn test_title_skipped_when_piped() {
        let console = Console::with_terminal(MockTerminal::non_terminal());
        assert!(!console.title("tasklane build").unwrap());
        assert_eq!(console.terminal().stdout(), "");
    }

    #[test]
    fn test_confirm_non_interactive_is_empty() {
        let console = Console::with_terminal(MockTerminal::non_terminal().with_lines(["Y"]));
        assert_eq!(console.confirm("Proceed? ").unwrap(), "");
        assert_eq!(console.terminal().stdout(), "");
    }
}
