//! Terminal helpers for tasklane commands.
//!
//! Task actions and hooks use these for their visible effects:
//!
//! - [`Console`]: plain and colored log lines, a line prompt
//!   ([`Console::confirm`]), the window title ([`Console::title`]) and an
//!   interactive radio/checkbox menu ([`Console::select`])
//! - [`execute`] and [`execute_argv`]: run a shell command line or a
//!   program with arguments, with stdin, streamed output and a timeout
//! - [`run_loop`]: call a function at a fixed interval until it breaks
//!
//! All terminal access goes through [`TerminalIO`]. Tests swap in
//! [`MockTerminal`] to script input and capture output:
//!
//! ```rust
//! use tasklane_console::{Console, Key, MockTerminal, SelectMenu};
//!
//! let terminal = MockTerminal::interactive()
//!     .with_keys([Key::Down, Key::Space])
//!     .with_lines(["Y"]);
//! let console = Console::with_terminal(terminal);
//!
//! let menu = SelectMenu::new("Environment?")
//!     .option("dev", "Development")
//!     .option("prod", "Production");
//! let picked = console.select(&menu)?;
//! assert_eq!(picked, vec![("prod".to_string(), "Production".to_string())]);
//! # Ok::<(), tasklane_console::ConsoleError>(())
//! ```
//!
//! Colors follow `console`'s detection (`NO_COLOR`, `CLICOLOR`, TTY checks);
//! [`Console::log`] output is never styled.

mod error;
mod exec;
mod output;
mod poll;
mod select;
mod terminal;

pub use error::ConsoleError;

pub use exec::{execute, execute_argv, ExecOptions, ExecOutput, FAILURE_EXIT_CODE};

pub use output::{exit, is_interactive, Console};

pub use poll::{run_loop, LoopConfig};

pub use select::{MenuLine, SelectMenu, SelectState, Step};

pub use terminal::{Key, MockTerminal, RealTerminal, Stream, TerminalIO};
