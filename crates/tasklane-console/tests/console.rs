//! Integration tests for tasklane-console.
//!
//! Interactive behavior is driven through `MockTerminal`, so these run the same
//! way in a terminal and in CI.

use tasklane_console::{Console, ConsoleError, Key, MockTerminal, SelectMenu, Stream};

fn environments(max: usize) -> SelectMenu {
    SelectMenu::new("Deploy to:")
        .option("dev", "Development")
        .option("stage", "Staging")
        .option("prod", "Production")
        .max_selections(max)
}

// ============================================================================
// Select: radio mode
// ============================================================================

#[test]
fn radio_pick_and_confirm() {
    let terminal = MockTerminal::interactive()
        .with_keys([Key::Down, Key::Space])
        .with_lines(["Y"]);
    let console = Console::with_terminal(terminal);

    let picked = console.select(&environments(1)).unwrap();
    assert_eq!(picked, vec![("stage".to_string(), "Staging".to_string())]);

    let out = console.terminal().stdout();
    assert!(out.contains("Deploy to:\n"));
    assert!(out.contains("[●] Staging ( stage ) <-\n"));
    assert!(out.contains("Confirm selection? [Y/N] "));
}

#[test]
fn declined_confirmation_starts_over() {
    let terminal = MockTerminal::interactive()
        .with_keys([Key::Space, Key::Up, Key::Space])
        .with_lines(["N", "Y"]);
    let console = Console::with_terminal(terminal);

    let picked = console.select(&environments(1)).unwrap();
    assert_eq!(picked, vec![("prod".to_string(), "Production".to_string())]);
}

#[test]
fn escape_cancels() {
    let terminal = MockTerminal::interactive().with_keys([Key::Down, Key::Escape]);
    let console = Console::with_terminal(terminal);

    let err = console.select(&environments(1)).unwrap_err();
    assert!(matches!(err, ConsoleError::Cancelled));
}

#[test]
fn every_change_redraws() {
    let terminal = MockTerminal::interactive()
        .with_keys([Key::Down, Key::Down, Key::Space])
        .with_lines(["Y"]);
    let console = Console::with_terminal(terminal);

    console.select(&environments(1)).unwrap();
    // Initial draw, two moves, the pick.
    assert_eq!(console.terminal().clear_count(), 4);
}

// ============================================================================
// Select: checkbox mode
// ============================================================================

#[test]
fn checkbox_enter_confirms_partial_selection() {
    let terminal = MockTerminal::interactive()
        .with_keys([Key::Space, Key::Down, Key::Down, Key::Space, Key::Enter])
        .with_lines(["y"]);
    let console = Console::with_terminal(terminal);

    let picked = console.select(&environments(0)).unwrap();
    assert_eq!(
        picked,
        vec![
            ("dev".to_string(), "Development".to_string()),
            ("prod".to_string(), "Production".to_string()),
        ]
    );
    assert!(console.terminal().stdout().contains("[✔] Development ( dev )\n"));
}

#[test]
fn checkbox_limit_triggers_confirmation() {
    let terminal = MockTerminal::interactive()
        .with_keys([Key::Space, Key::Down, Key::Space])
        .with_lines(["Y"]);
    let console = Console::with_terminal(terminal);

    let picked = console.select(&environments(2)).unwrap();
    assert_eq!(picked.len(), 2);
}

#[test]
fn running_out_of_keys_is_an_io_error() {
    let terminal = MockTerminal::interactive().with_keys([Key::Down]);
    let console = Console::with_terminal(terminal);

    let err = console.select(&environments(1)).unwrap_err();
    assert!(matches!(err, ConsoleError::Io(_)));
}

#[test]
fn non_interactive_select_is_empty() {
    let console = Console::with_terminal(MockTerminal::non_terminal().with_keys([Key::Space]));
    assert!(console.select(&environments(1)).unwrap().is_empty());
    assert_eq!(console.terminal().stdout(), "");
}

#[test]
fn empty_menu_is_empty() {
    let console = Console::with_terminal(MockTerminal::interactive());
    assert!(console.select(&SelectMenu::new("Nothing")).unwrap().is_empty());
}

#[test]
fn selected_lines_are_highlighted_with_colors() {
    let terminal = MockTerminal::interactive()
        .with_colors(true)
        .with_keys([Key::Space])
        .with_lines(["Y"]);
    let console = Console::with_terminal(terminal);

    console.select(&environments(1)).unwrap();
    let out = console.terminal().output(Stream::Stdout);
    assert!(out.contains("\u{1b}["));
    assert!(out.contains("[○] Staging ( stage )\n"));
}

// ============================================================================
// Log lines
// ============================================================================

#[test]
fn warnings_and_errors_go_to_stderr() {
    let console = Console::with_terminal(MockTerminal::non_terminal());
    console.info("building\n").unwrap();
    console.warning("slow\n").unwrap();
    console.error("failed\n").unwrap();

    assert_eq!(console.terminal().stdout(), "building\n");
    assert_eq!(console.terminal().stderr(), "slow\nfailed\n");
}
