//! Event polling, dispatching, and UI rendering loop.
//!
//! Terminal input is read on a dedicated task and forwarded as [`UiEvent`]s.
//! Each turn of the loop routes pending input through the key handlers,
//! applies queued actions, spawns the resulting commands, and redraws at a
//! bounded frame rate.

use std::{
    error::Error,
    io,
    sync::Arc,
    time::{Duration, Instant},
};

use ratatui::crossterm::event::{self, Event, KeyEventKind};
use ratatui::prelude::Size;
use tokio::sync::mpsc;

use crate::api::ChatApi;
use crate::core::app::{apply_actions, App, AppAction, AppActionDispatcher};
use crate::ui::renderer::ui;

use super::executors::spawn_command;
use super::keybindings::{handle_key, handle_paste};
use super::lifecycle::{restore_terminal, setup_terminal, SharedTerminal};
use super::AppHandle;

const MAX_FPS: u64 = 30;

#[derive(Debug)]
pub enum UiEvent {
    Crossterm(Event),
}

async fn current_terminal_size(terminal: &SharedTerminal) -> Size {
    let terminal_guard = terminal.lock().await;
    terminal_guard.size().unwrap_or_default()
}

/// Rows PageUp/PageDown move: the message pane minus some overlap.
fn page_height(term_size: Size) -> u16 {
    term_size.height.saturating_sub(8).max(1)
}

async fn try_draw_frame(
    app: &AppHandle,
    terminal: &SharedTerminal,
    request_redraw: &mut bool,
    last_draw: &mut Instant,
    frame_duration: Duration,
) -> io::Result<()> {
    if !*request_redraw {
        return Ok(());
    }

    let now = Instant::now();
    if now.duration_since(*last_draw) < frame_duration {
        return Ok(());
    }

    let mut terminal_guard = terminal.lock().await;
    app.update(|app| terminal_guard.draw(|f| ui(f, app)).map(|_| ()))
        .await?;
    *last_draw = now;
    *request_redraw = false;
    Ok(())
}

struct EventProcessingOutcome {
    events_processed: bool,
    exit_requested: bool,
}

async fn process_ui_events(
    app: &AppHandle,
    event_rx: &mut mpsc::UnboundedReceiver<UiEvent>,
    dispatcher: &AppActionDispatcher,
    term_size: Size,
) -> EventProcessingOutcome {
    let mut outcome = EventProcessingOutcome {
        events_processed: false,
        exit_requested: false,
    };

    while let Ok(ev) = event_rx.try_recv() {
        outcome.events_processed = true;
        let actions = match ev {
            UiEvent::Crossterm(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                app.update(|app| handle_key(app, &key, page_height(term_size)))
                    .await
            }
            UiEvent::Crossterm(Event::Paste(text)) => {
                app.update(|app| handle_paste(app, &text)).await
            }
            UiEvent::Crossterm(_) => Vec::new(),
        };

        if actions.iter().any(|action| matches!(action, AppAction::Quit)) {
            outcome.exit_requested = true;
        }
        dispatcher.dispatch_many(actions);
        if outcome.exit_requested {
            break;
        }
    }

    outcome
}

async fn drain_action_queue(
    app: &AppHandle,
    api: &Arc<dyn ChatApi>,
    dispatcher: &AppActionDispatcher,
    action_rx: &mut mpsc::UnboundedReceiver<AppAction>,
) -> bool {
    let mut pending = Vec::new();
    while let Ok(action) = action_rx.try_recv() {
        pending.push(action);
    }

    if pending.is_empty() {
        return false;
    }

    let commands = app.update(|app| apply_actions(app, pending)).await;
    for cmd in commands {
        spawn_command(api.clone(), dispatcher.clone(), cmd);
    }
    true
}

fn spawn_event_reader(event_tx: mpsc::UnboundedSender<UiEvent>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if let Ok(true) = event::poll(Duration::from_millis(10)) {
                match event::read() {
                    Ok(ev) => {
                        if event_tx.send(UiEvent::Crossterm(ev)).is_err() {
                            break;
                        }
                    }
                    Err(_) => {
                        continue;
                    }
                }
            } else {
                tokio::task::yield_now().await;
            }
        }
    })
}

pub async fn run_chat(app: App, api: Arc<dyn ChatApi>) -> Result<(), Box<dyn Error>> {
    let app = AppHandle::new(app);

    let (action_tx, mut action_rx) = mpsc::unbounded_channel::<AppAction>();
    let dispatcher = AppActionDispatcher::new(action_tx);

    for cmd in app.update(|app| app.startup_commands()).await {
        spawn_command(api.clone(), dispatcher.clone(), cmd);
    }

    let terminal = setup_terminal()?;

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<UiEvent>();
    let event_reader_handle = spawn_event_reader(event_tx);

    let frame_duration = Duration::from_millis(1000 / MAX_FPS);
    let mut last_draw = Instant::now() - frame_duration;
    let mut request_redraw = true;

    let result = 'main_loop: loop {
        if app.read(|app| app.exit_requested).await {
            break 'main_loop Ok(());
        }

        if let Err(err) = try_draw_frame(
            &app,
            &terminal,
            &mut request_redraw,
            &mut last_draw,
            frame_duration,
        )
        .await
        {
            break 'main_loop Err(err.into());
        }

        let term_size = current_terminal_size(&terminal).await;
        let event_outcome = process_ui_events(&app, &mut event_rx, &dispatcher, term_size).await;
        if event_outcome.events_processed {
            request_redraw = true;
        }

        let actions_applied =
            drain_action_queue(&app, &api, &dispatcher, &mut action_rx).await;
        if actions_applied {
            request_redraw = true;
        }

        if event_outcome.exit_requested {
            break 'main_loop Ok(());
        }

        // Keep the loading indicator moving.
        if app.read(|app| app.is_loading()).await {
            request_redraw = true;
        }

        let idle = !event_outcome.events_processed && !actions_applied && !request_redraw;
        if idle {
            tokio::time::sleep(Duration::from_millis(16)).await;
        } else if request_redraw {
            tokio::time::sleep(frame_duration.saturating_sub(last_draw.elapsed())).await;
        }
    };

    event_reader_handle.abort();
    restore_terminal(&terminal).await?;

    result
}
