//! Terminal abstraction.
//!
//! Every console helper talks to the terminal through [`TerminalIO`], so the
//! same code drives a real TTY ([`RealTerminal`]) or a scripted one
//! ([`MockTerminal`]) in tests.

use std::io::{self, IsTerminal};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use console::Term;

/// Output stream selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

/// A key press, as far as the select menu cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    Enter,
    Space,
    Tab,
    Backspace,
    Escape,
    CtrlC,
    Char(char),
    Other,
}

impl From<console::Key> for Key {
    fn from(key: console::Key) -> Self {
        match key {
            console::Key::ArrowUp => Key::Up,
            console::Key::ArrowDown => Key::Down,
            console::Key::ArrowLeft => Key::Left,
            console::Key::ArrowRight => Key::Right,
            console::Key::Enter => Key::Enter,
            console::Key::Tab => Key::Tab,
            console::Key::Backspace => Key::Backspace,
            console::Key::Escape => Key::Escape,
            console::Key::CtrlC => Key::CtrlC,
            console::Key::Char(' ') => Key::Space,
            console::Key::Char('\n') | console::Key::Char('\r') => Key::Enter,
            console::Key::Char(c) => Key::Char(c),
            _ => Key::Other,
        }
    }
}

/// Abstraction over terminal I/O for testability.
pub trait TerminalIO: Send + Sync {
    /// True when both stdin and stdout are attached to a terminal.
    fn is_terminal(&self) -> bool;

    /// True when ANSI styling should be emitted.
    fn colors_enabled(&self) -> bool;

    /// Writes `text` unchanged and returns the number of bytes written.
    fn write(&self, stream: Stream, text: &str) -> io::Result<usize>;

    /// Reads one line. Returns an empty string at end of input.
    fn read_line(&self) -> io::Result<String>;

    /// Reads a single key press without echo.
    fn read_key(&self) -> io::Result<Key>;

    fn clear_screen(&self) -> io::Result<()>;

    fn hide_cursor(&self) -> io::Result<()>;

    fn show_cursor(&self) -> io::Result<()>;

    /// Sets the terminal window title (OSC 0).
    fn set_title(&self, title: &str) -> io::Result<()> {
        self.write(Stream::Stdout, &format!("\u{1b}]0;{}\u{7}", title))
            .map(|_| ())
    }
}

/// The process terminal, backed by `console::Term`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealTerminal;

impl RealTerminal {
    fn term(stream: Stream) -> Term {
        match stream {
            Stream::Stdout => Term::stdout(),
            Stream::Stderr => Term::stderr(),
        }
    }
}

impl TerminalIO for RealTerminal {
    fn is_terminal(&self) -> bool {
        io::stdin().is_terminal() && Term::stdout().is_term()
    }

    fn colors_enabled(&self) -> bool {
        console::colors_enabled()
    }

    fn write(&self, stream: Stream, text: &str) -> io::Result<usize> {
        let term = Self::term(stream);
        term.write_str(text)?;
        term.flush()?;
        Ok(text.len())
    }

    fn read_line(&self) -> io::Result<String> {
        let mut line = String::new();
        io::stdin().read_line(&mut line)?;
        Ok(line)
    }

    fn read_key(&self) -> io::Result<Key> {
        Term::stdout().read_key().map(Key::from)
    }

    fn clear_screen(&self) -> io::Result<()> {
        Term::stdout().clear_screen()
    }

    fn hide_cursor(&self) -> io::Result<()> {
        Term::stdout().hide_cursor()
    }

    fn show_cursor(&self) -> io::Result<()> {
        Term::stdout().show_cursor()
    }
}

/// Mock terminal for testing.
///
/// Plays back scripted lines and keys, and records everything written so
/// tests can assert on it.
#[derive(Debug)]
pub struct MockTerminal {
    is_terminal: bool,
    colors: bool,
    lines: Vec<String>,
    line_index: AtomicUsize,
    keys: Vec<Key>,
    key_index: AtomicUsize,
    written: Mutex<Vec<(Stream, String)>>,
    clears: AtomicUsize,
}

impl MockTerminal {
    fn build(is_terminal: bool) -> Self {
        Self {
            is_terminal,
            colors: false,
            lines: Vec::new(),
            line_index: AtomicUsize::new(0),
            keys: Vec::new(),
            key_index: AtomicUsize::new(0),
            written: Mutex::new(Vec::new()),
            clears: AtomicUsize::new(0),
        }
    }

    /// An interactive terminal with no scripted input.
    pub fn interactive() -> Self {
        Self::build(true)
    }

    /// Simulates piped or redirected I/O.
    pub fn non_terminal() -> Self {
        Self::build(false)
    }

    /// Lines returned by successive `read_line` calls.
    pub fn with_lines(mut self, lines: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.lines = lines.into_iter().map(Into::into).collect();
        self
    }

    /// Keys returned by successive `read_key` calls.
    pub fn with_keys(mut self, keys: impl IntoIterator<Item = Key>) -> Self {
        self.keys = keys.into_iter().collect();
        self
    }

    pub fn with_colors(mut self, colors: bool) -> Self {
        self.colors = colors;
        self
    }

    /// Everything written to `stream`, concatenated.
    pub fn output(&self, stream: Stream) -> String {
        self.written
            .lock()
            .map(|written| {
                written
                    .iter()
                    .filter(|(s, _)| *s == stream)
                    .map(|(_, text)| text.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn stdout(&self) -> String {
        self.output(Stream::Stdout)
    }

    pub fn stderr(&self) -> String {
        self.output(Stream::Stderr)
    }

    /// Number of `clear_screen` calls so far.
    pub fn clear_count(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

impl TerminalIO for MockTerminal {
    fn is_terminal(&self) -> bool {
        self.is_terminal
    }

    fn colors_enabled(&self) -> bool {
        self.colors
    }

    fn write(&self, stream: Stream, text: &str) -> io::Result<usize> {
        let mut written = self
            .written
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "mock terminal poisoned"))?;
        written.push((stream, text.to_string()));
        Ok(text.len())
    }

    fn read_line(&self) -> io::Result<String> {
        let idx = self.line_index.fetch_add(1, Ordering::SeqCst);
        match self.lines.get(idx) {
            Some(line) => Ok(format!("{}\n", line)),
            None => Ok(String::new()),
        }
    }

    fn read_key(&self) -> io::Result<Key> {
        let idx = self.key_index.fetch_add(1, Ordering::SeqCst);
        self.keys
            .get(idx)
            .copied()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no more scripted keys"))
    }

    fn clear_screen(&self) -> io::Result<()> {
        self.clears.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn hide_cursor(&self) -> io::Result<()> {
        Ok(())
    }

    fn show_cursor(&self) -> io::Result<()> {
        Ok(())
    }
}
