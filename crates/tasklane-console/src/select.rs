//! Interactive radio and checkbox menus.
//!
//! [`SelectState`] is the pure state machine (cursor, selections, pending
//! confirmation); [`Console::select`] drives it from key presses and renders
//! it after every change.
//!
//! Controls: up/down move the cursor (wrapping), space toggles the option
//! under the cursor, enter asks for confirmation once something is selected,
//! escape or ctrl-c cancels. Reaching `max_selections` also asks for
//! confirmation. Answering anything but `Y` clears the selection and resumes.

use console::Style;

use crate::error::ConsoleError;
use crate::output::Console;
use crate::terminal::{Key, Stream, TerminalIO};

const RADIO_SELECTED: &str = "[●]";
const RADIO_UNSELECTED: &str = "[○]";
const CHECKBOX_SELECTED: &str = "[✔]";
const CHECKBOX_UNSELECTED: &str = "[ ]";
const CURSOR_MARK: &str = " <-";
const CONFIRM_PROMPT: &str = "Confirm selection? [Y/N] ";

/// A menu definition: prompt, keyed options, selection limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectMenu {
    prompt: String,
    options: Vec<(String, String)>,
    max_selections: usize,
}

impl SelectMenu {
    /// A single-choice menu with no options yet.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            options: Vec::new(),
            max_selections: 1,
        }
    }

    /// Appends an option shown as `label ( key )`.
    pub fn option(mut self, key: impl Into<String>, label: impl Into<String>) -> Self {
        self.options.push((key.into(), label.into()));
        self
    }

    /// How many options may be picked. 1 renders radio buttons, anything else
    /// checkboxes; 0 means no limit.
    pub fn max_selections(mut self, max: usize) -> Self {
        self.max_selections = max;
        self
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Options as `(key, label)` pairs, in display order.
    pub fn options(&self) -> &[(String, String)] {
        &self.options
    }

    fn markers(&self) -> (&'static str, &'static str) {
        if self.max_selections == 1 {
            (RADIO_SELECTED, RADIO_UNSELECTED)
        } else {
            (CHECKBOX_SELECTED, CHECKBOX_UNSELECTED)
        }
    }
}

/// What the menu loop should do after a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Redraw and keep reading keys.
    Continue,
    /// Ask the user to confirm the current selection.
    Confirm,
    /// Abort the menu.
    Cancel,
}

/// One rendered menu line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuLine {
    pub text: String,
    pub selected: bool,
}

/// Cursor and selection state of a menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectState {
    len: usize,
    max: usize,
    cursor: usize,
    selected: Vec<usize>,
    confirming: bool,
}

impl SelectState {
    pub fn new(len: usize, max: usize) -> Self {
        Self {
            len,
            max,
            cursor: 0,
            selected: Vec::new(),
            confirming: false,
        }
    }

    pub fn for_menu(menu: &SelectMenu) -> Self {
        Self::new(menu.options.len(), menu.max_selections)
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Selected option indices, in the order they were picked.
    pub fn selected(&self) -> &[usize] {
        &self.selected
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.selected.contains(&index)
    }

    pub fn up(&mut self) {
        if self.len > 0 {
            self.cursor = self.cursor.checked_sub(1).unwrap_or(self.len - 1);
        }
    }

    pub fn down(&mut self) {
        if self.len > 0 {
            self.cursor = (self.cursor + 1) % self.len;
        }
    }

    /// Selects or deselects the option under the cursor. In single-choice
    /// mode a new pick replaces the previous one.
    pub fn toggle(&mut self) {
        if self.len == 0 {
            return;
        }
        if let Some(pos) = self.selected.iter().position(|&i| i == self.cursor) {
            self.selected.remove(pos);
            return;
        }
        if self.max == 1 {
            self.selected.clear();
        }
        self.selected.push(self.cursor);
    }

    /// True once the selection limit is reached or enter was pressed with a
    /// non-empty selection.
    pub fn awaiting_confirmation(&self) -> bool {
        self.confirming || (self.max > 0 && self.selected.len() == self.max)
    }

    /// Drops the selection after a declined confirmation.
    pub fn reject(&mut self) {
        self.selected.clear();
        self.confirming = false;
    }

    /// Applies a key press.
    pub fn handle(&mut self, key: Key) -> Step {
        match key {
            Key::Up => self.up(),
            Key::Down => self.down(),
            Key::Space => self.toggle(),
            Key::Enter if !self.selected.is_empty() => self.confirming = true,
            Key::Escape | Key::CtrlC => return Step::Cancel,
            _ => {}
        }
        if self.awaiting_confirmation() {
            Step::Confirm
        } else {
            Step::Continue
        }
    }

    /// Renders the option lines (prompt excluded).
    pub fn render(&self, menu: &SelectMenu) -> Vec<MenuLine> {
        let (on, off) = menu.markers();
        menu.options
            .iter()
            .enumerate()
            .map(|(index, (key, label))| {
                let selected = self.is_selected(index);
                let marker = if selected { on } else { off };
                let cursor = if index == self.cursor { CURSOR_MARK } else { "" };
                MenuLine {
                    text: format!("{} {} ( {} ){}", marker, label, key, cursor),
                    selected,
                }
            })
            .collect()
    }

    /// The selected `(key, label)` pairs, in pick order.
    pub fn selection(&self, menu: &SelectMenu) -> Vec<(String, String)> {
        self.selected
            .iter()
            .filter_map(|&i| menu.options.get(i).cloned())
            .collect()
    }
}

impl<T: TerminalIO> Console<T> {
    /// Runs an interactive menu and returns the confirmed `(key, label)`
    /// pairs.
    ///
    /// Returns an empty selection when the console is not interactive or the
    /// menu has no options. Fails with [`ConsoleError::Cancelled`] on escape
    /// or ctrl-c.
    pub fn select(&self, menu: &SelectMenu) -> Result<Vec<(String, String)>, ConsoleError> {
        if !self.is_interactive() || menu.options.is_empty() {
            return Ok(Vec::new());
        }

        let _cursor = HiddenCursor::new(self.terminal())?;
        let mut state = SelectState::for_menu(menu);
        self.draw(menu, &state)?;

        loop {
            let key = self.terminal().read_key()?;
            match state.handle(key) {
                Step::Cancel => {
                    tracing::debug!("select cancelled");
                    return Err(ConsoleError::Cancelled);
                }
                Step::Continue => self.draw(menu, &state)?,
                Step::Confirm => {
                    self.draw(menu, &state)?;
                    let answer = self.confirm(CONFIRM_PROMPT)?;
                    if answer.eq_ignore_ascii_case("y") {
                        return Ok(state.selection(menu));
                    }
                    state.reject();
                    self.draw(menu, &state)?;
                }
            }
        }
    }

    fn draw(&self, menu: &SelectMenu, state: &SelectState) -> Result<(), ConsoleError> {
        self.terminal().clear_screen()?;
        self.emit(Stream::Stdout, &menu.prompt, None)?;
        if !menu.prompt.ends_with('\n') {
            self.emit(Stream::Stdout, "\n", None)?;
        }
        for line in state.render(menu) {
            let text = format!("{}\n", line.text);
            let style = line.selected.then(|| Style::new().cyan().bold());
            self.emit(Stream::Stdout, &text, style)?;
        }
        Ok(())
    }
}

/// Hides the cursor until dropped.
struct HiddenCursor<'a, T: TerminalIO> {
    terminal: &'a T,
}

impl<'a, T: TerminalIO> HiddenCursor<'a, T> {
    fn new(terminal: &'a T) -> std::io::Result<Self> {
        terminal.hide_cursor()?;
        Ok(Self { terminal })
    }
}

impl<T: TerminalIO> Drop for HiddenCursor<'_, T> {
    fn drop(&mut self) {
        let _ = self.terminal.show_cursor();
    }
}
