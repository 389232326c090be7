//! Key handling for the chat screen.
//!
//! Handlers edit UI-only state (input box, focus, selection, scroll) in place
//! and return the actions that need the reducer.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tui_textarea::Input as TAInput;

use crate::core::app::{App, AppAction, Focus};

pub fn handle_key(app: &mut App, key: &KeyEvent, page_height: u16) -> Vec<AppAction> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match key.code {
        KeyCode::Char('c') if ctrl => return vec![AppAction::Quit],
        KeyCode::Esc => return vec![AppAction::Quit],
        KeyCode::Char('n') if ctrl => return vec![AppAction::NewChat],
        KeyCode::Char('r') if ctrl => return vec![AppAction::RetryFailed],
        KeyCode::Char('l') if ctrl => return vec![AppAction::RefreshChatList],
        KeyCode::Tab | KeyCode::BackTab => {
            app.toggle_focus();
            return Vec::new();
        }
        KeyCode::PageUp => {
            app.scroll_up(page_height.max(1));
            return Vec::new();
        }
        KeyCode::PageDown => {
            app.scroll_down(page_height.max(1));
            return Vec::new();
        }
        _ => {}
    }

    match app.focus {
        Focus::Input => handle_input_key(app, key),
        Focus::Sidebar => handle_sidebar_key(app, key),
    }
}

fn handle_input_key(app: &mut App, key: &KeyEvent) -> Vec<AppAction> {
    if key.code == KeyCode::Enter {
        if key
            .modifiers
            .intersects(KeyModifiers::SHIFT | KeyModifiers::ALT)
        {
            app.input.insert_newline();
            return Vec::new();
        }
        if app.is_loading() {
            return Vec::new();
        }
        return vec![AppAction::SubmitInput];
    }

    app.input.input(TAInput::from(*key));
    Vec::new()
}

fn handle_sidebar_key(app: &mut App, key: &KeyEvent) -> Vec<AppAction> {
    match key.code {
        KeyCode::Up => {
            app.sidebar.select_previous();
            Vec::new()
        }
        KeyCode::Down => {
            app.sidebar.select_next();
            Vec::new()
        }
        KeyCode::Enter => vec![AppAction::OpenSelectedChat],
        KeyCode::Backspace => {
            let mut term = app.sidebar.search_term().to_string();
            if term.pop().is_none() {
                return Vec::new();
            }
            vec![AppAction::SearchTermChanged { term }]
        }
        KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            let mut term = app.sidebar.search_term().to_string();
            term.push(ch);
            vec![AppAction::SearchTermChanged { term }]
        }
        _ => Vec::new(),
    }
}

/// Strips control characters that would corrupt the layout, keeping line
/// breaks and tabs.
pub(crate) fn sanitize_pasted_text(text: &str) -> String {
    text.replace("\r\n", "\n")
        .replace('\r', "\n")
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

pub fn handle_paste(app: &mut App, text: &str) -> Vec<AppAction> {
    let text = sanitize_pasted_text(text);
    match app.focus {
        Focus::Input => {
            app.input.insert_str(&text);
            Vec::new()
        }
        Focus::Sidebar => {
            let mut term = app.sidebar.search_term().to_string();
            term.push_str(text.lines().next().unwrap_or_default());
            vec![AppAction::SearchTermChanged { term }]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::app::apply_action;
    use crate::utils::test_utils::create_test_app;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn press_with(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn enter_submits_and_modified_enter_inserts_newline() {
        let mut app = create_test_app();
        for ch in "hi".chars() {
            handle_key(&mut app, &press(KeyCode::Char(ch)), 10);
        }
        let actions = handle_key(
            &mut app,
            &press_with(KeyCode::Enter, KeyModifiers::SHIFT),
            10,
        );
        assert!(actions.is_empty());
        handle_key(&mut app, &press(KeyCode::Char('!')), 10);
        assert_eq!(app.input_text(), "hi\n!");

        let actions = handle_key(&mut app, &press(KeyCode::Enter), 10);
        assert!(matches!(actions.as_slice(), [AppAction::SubmitInput]));
    }

    #[test]
    fn enter_is_ignored_while_loading() {
        let mut app = create_test_app();
        app.input.insert_str("first");
        apply_action(&mut app, AppAction::SubmitInput).unwrap();
        app.input.insert_str("second");

        assert!(handle_key(&mut app, &press(KeyCode::Enter), 10).is_empty());
    }

    #[test]
    fn sidebar_typing_edits_search_term() {
        let mut app = create_test_app();
        handle_key(&mut app, &press(KeyCode::Tab), 10);
        assert_eq!(app.focus, Focus::Sidebar);

        let actions = handle_key(&mut app, &press(KeyCode::Char('o')), 10);
        let [AppAction::SearchTermChanged { term }] = actions.as_slice() else {
            panic!("expected search action");
        };
        assert_eq!(term, "o");
        apply_action(
            &mut app,
            AppAction::SearchTermChanged { term: term.clone() },
        );

        let actions = handle_key(&mut app, &press(KeyCode::Backspace), 10);
        assert!(matches!(
            actions.as_slice(),
            [AppAction::SearchTermChanged { term }] if term.is_empty()
        ));
        assert_eq!(app.input_text(), "");
    }

    #[test]
    fn global_shortcuts_map_to_actions() {
        let mut app = create_test_app();
        let ctrl = KeyModifiers::CONTROL;
        assert!(matches!(
            handle_key(&mut app, &press_with(KeyCode::Char('n'), ctrl), 10).as_slice(),
            [AppAction::NewChat]
        ));
        assert!(matches!(
            handle_key(&mut app, &press_with(KeyCode::Char('r'), ctrl), 10).as_slice(),
            [AppAction::RetryFailed]
        ));
        assert!(matches!(
            handle_key(&mut app, &press_with(KeyCode::Char('l'), ctrl), 10).as_slice(),
            [AppAction::RefreshChatList]
        ));
        assert!(matches!(
            handle_key(&mut app, &press_with(KeyCode::Char('c'), ctrl), 10).as_slice(),
            [AppAction::Quit]
        ));
    }

    #[test]
    fn page_keys_scroll_history() {
        let mut app = create_test_app();
        handle_key(&mut app, &press(KeyCode::PageUp), 8);
        assert_eq!(app.scroll_back, 8);
        handle_key(&mut app, &press(KeyCode::PageDown), 5);
        assert_eq!(app.scroll_back, 3);
    }

    #[test]
    fn sanitize_paste_text_removes_control_characters() {
        assert_eq!(sanitize_pasted_text("a\r\nb\x1b[0m\tc"), "a\nb[0m\tc");
    }

    #[test]
    fn paste_into_sidebar_uses_first_line() {
        let mut app = create_test_app();
        app.focus = Focus::Sidebar;
        let actions = handle_paste(&mut app, "OutOfMemoryError\nat line 3");
        assert!(matches!(
            actions.as_slice(),
            [AppAction::SearchTermChanged { term }] if term == "OutOfMemoryError"
        ));
    }
}
