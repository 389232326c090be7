use std::time::Duration;

use chrono::{DateTime, Local};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::api::ChatListItem;
use crate::core::app::{App, Focus, StatusKind};
use crate::core::message::{Delivery, Message, Sender};
use crate::ui::markdown::render_markdown;
use crate::ui::markdown_wrap::wrap_line;

const SIDEBAR_WIDTH: u16 = 34;
const MAX_INPUT_LINES: u16 = 6;
const USER_PREFIX: &str = "You: ";
const USER_CONTINUATION_INDENT: &str = "     ";
const INDICATOR_FRAMES: [&str; 2] = ["^ v ^", "v ^ v"];
const INDICATOR_FRAME_MS: u128 = 400;
const KEY_HINTS: &str =
    "Enter send • Shift+Enter newline • Tab sidebar • Ctrl+N new chat • Ctrl+R retry • Ctrl+C quit";

/// Frame of the loading indicator for the time since the request started.
pub fn loading_indicator(elapsed: Duration) -> &'static str {
    let frame = (elapsed.as_millis() / INDICATOR_FRAME_MS) as usize % INDICATOR_FRAMES.len();
    INDICATOR_FRAMES[frame]
}

pub fn ui(f: &mut Frame, app: &mut App) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(20)])
        .split(f.area());

    render_sidebar(f, app, columns[0]);

    let input_lines = (app.input.lines().len() as u16).clamp(1, MAX_INPUT_LINES);
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(1),
            Constraint::Length(input_lines + 2), // +2 for borders
        ])
        .split(columns[1]);

    render_messages(f, app, rows[0]);
    render_status(f, app, rows[1]);
    render_input(f, app, rows[2]);
}

fn title_line(app: &App) -> String {
    let location = match app.location.key() {
        Some(_) => app.location.path(),
        None => "new chat".to_string(),
    };
    format!(
        "logchat v{} • {} • {} • Logging: {}",
        env!("CARGO_PKG_VERSION"),
        app.base_url,
        location,
        app.logging_status()
    )
}

fn user_lines(message: &Message) -> Vec<Line<'static>> {
    let prefix_style = Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD);
    let text_style = match message.delivery {
        Delivery::Pending => Style::default().fg(Color::Gray),
        _ => Style::default().fg(Color::Cyan),
    };

    let mut lines: Vec<Line<'static>> = message
        .text
        .lines()
        .enumerate()
        .map(|(i, text)| {
            let lead = if i == 0 {
                Span::styled(USER_PREFIX, prefix_style)
            } else {
                Span::raw(USER_CONTINUATION_INDENT)
            };
            Line::from(vec![lead, Span::styled(text.to_string(), text_style)])
        })
        .collect();
    if lines.is_empty() {
        lines.push(Line::from(Span::styled(USER_PREFIX, prefix_style)));
    }

    if message.delivery == Delivery::Failed {
        if let Some(last) = lines.last_mut() {
            last.spans.push(Span::styled(
                "  ✗ not sent",
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ));
        }
    }
    lines
}

/// Wrapped transcript lines for the message pane, including the loading
/// indicator while a request is in flight.
pub fn build_message_lines(app: &App, width: u16) -> Vec<Line<'static>> {
    let width = width.max(1) as usize;
    let mut lines = Vec::new();

    for message in app.conversation.messages() {
        let rendered = match message.sender {
            Sender::User => user_lines(message),
            Sender::Bot => render_markdown(&message.text),
        };
        for line in &rendered {
            lines.extend(wrap_line(line, width));
        }
        lines.push(Line::default());
    }

    if app.is_loading() {
        lines.push(Line::from(Span::styled(
            loading_indicator(app.pulse_start.elapsed()),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )));
    }
    lines
}

fn render_messages(f: &mut Frame, app: &mut App, area: Rect) {
    let lines = build_message_lines(app, area.width);

    let available_height = area.height.saturating_sub(1); // Account for title
    let total = lines.len().min(u16::MAX as usize) as u16;
    let max_offset = total.saturating_sub(available_height);
    app.scroll_back = app.scroll_back.min(max_offset);
    let scroll_offset = max_offset - app.scroll_back;

    let title = Span::styled(
        title_line(app),
        Style::default().add_modifier(Modifier::BOLD),
    );
    let messages = Paragraph::new(lines)
        .block(Block::default().title(title))
        .scroll((scroll_offset, 0));
    f.render_widget(messages, area);
}

fn render_status(f: &mut Frame, app: &App, area: Rect) {
    let line = match &app.status {
        Some(status) => {
            let color = match status.kind {
                StatusKind::Info => Color::Green,
                StatusKind::Error => Color::Red,
            };
            Line::from(Span::styled(status.text.clone(), Style::default().fg(color)))
        }
        None => Line::from(Span::styled(
            KEY_HINTS,
            Style::default().fg(Color::DarkGray),
        )),
    };
    f.render_widget(Paragraph::new(line), area);
}

fn render_input(f: &mut Frame, app: &mut App, area: Rect) {
    let focused = app.focus == Focus::Input;
    let title = if app.is_loading() {
        "Waiting for reply..."
    } else if app.conversation.has_failed_message() {
        "Type your message (Ctrl+R to retry the failed one)"
    } else {
        "Type your message"
    };
    let border_style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::Reset)
    };
    app.input.set_block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .title(title),
    );
    let cursor_style = if focused {
        Style::default().add_modifier(Modifier::REVERSED)
    } else {
        Style::default()
    };
    app.input.set_cursor_style(cursor_style);
    f.render_widget(&app.input, area);
}

fn format_latest_time(item: &ChatListItem) -> String {
    item.latest_time
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|utc| utc.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

fn sidebar_rows(app: &App) -> Vec<ListItem<'static>> {
    app.sidebar
        .items()
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let mut lines = vec![Line::from(vec![
                Span::styled(
                    format!("{} ", app.sidebar.icon(i)),
                    Style::default().fg(Color::Magenta),
                ),
                Span::raw(item.title()),
            ])];
            let when = format_latest_time(item);
            if !when.is_empty() {
                lines.push(Line::from(Span::styled(
                    format!("  {when}"),
                    Style::default().fg(Color::DarkGray),
                )));
            }
            ListItem::new(lines)
        })
        .collect()
}

fn render_sidebar(f: &mut Frame, app: &App, area: Rect) {
    let focused = app.focus == Focus::Sidebar;
    let border_style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    let title = if app.sidebar.is_loading() {
        "Chats ..."
    } else {
        "Chats"
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(title);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(inner);

    let search_text = if app.sidebar.search_term().is_empty() && !focused {
        Span::styled("type to search", Style::default().fg(Color::DarkGray))
    } else {
        Span::raw(app.sidebar.search_term().to_string())
    };
    let search = Paragraph::new(Line::from(search_text))
        .block(Block::default().borders(Borders::ALL).title("Search"));
    f.render_widget(search, rows[0]);

    let new_chat = Paragraph::new(Line::from(Span::styled(
        "+ New chat (Ctrl+N)",
        Style::default().fg(Color::Green),
    )));
    f.render_widget(new_chat, rows[1]);

    let highlight = if focused {
        Style::default().add_modifier(Modifier::REVERSED)
    } else {
        Style::default().add_modifier(Modifier::BOLD)
    };
    let list = List::new(sidebar_rows(app)).highlight_style(highlight);
    let mut state = ListState::default();
    if !app.sidebar.items().is_empty() {
        state.select(Some(app.sidebar.selected()));
    }
    f.render_stateful_widget(list, rows[2], &mut state);

    if focused {
        let cursor_x = rows[0].x + 1 + app.sidebar.search_term().chars().count() as u16;
        let max_x = rows[0].x + rows[0].width.saturating_sub(2);
        f.set_cursor_position((cursor_x.min(max_x), rows[0].y + 1));
    }
}
