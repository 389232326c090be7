use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{App, Focus, StatusKind};
use crate::api::{ApiError, ChatListItem, HistoryEntry};
use crate::core::conversation::{
    HistoryOutcome, HistoryRequest, SendOutcome, SendReply, SendRequest,
};
use crate::core::message::Message;
use crate::core::session::SessionKey;
use crate::core::sidebar::{ListOutcome, ListRequest};

#[derive(Debug)]
pub enum AppAction {
    SubmitInput,
    RetryFailed,
    NewChat,
    OpenSelectedChat,
    SearchTermChanged {
        term: String,
    },
    RefreshChatList,
    SendCompleted {
        request_id: u64,
        result: Result<SendReply, ApiError>,
    },
    HistoryLoaded {
        request_id: u64,
        result: Result<Vec<HistoryEntry>, ApiError>,
    },
    ChatListLoaded {
        seq: u64,
        result: Result<Vec<ChatListItem>, ApiError>,
    },
    Quit,
}

#[derive(Debug)]
pub enum AppCommand {
    Send {
        request: SendRequest,
        cancel_token: CancellationToken,
    },
    LoadHistory(HistoryRequest),
    LoadChatList(ListRequest),
}

#[derive(Clone)]
pub struct AppActionDispatcher {
    tx: mpsc::UnboundedSender<AppAction>,
}

impl AppActionDispatcher {
    pub fn new(tx: mpsc::UnboundedSender<AppAction>) -> Self {
        Self { tx }
    }

    pub fn dispatch(&self, action: AppAction) {
        self.dispatch_many([action]);
    }

    pub fn dispatch_many<I>(&self, actions: I)
    where
        I: IntoIterator<Item = AppAction>,
    {
        for action in actions.into_iter() {
            let _ = self.tx.send(action);
        }
    }
}

pub fn apply_actions(app: &mut App, actions: impl IntoIterator<Item = AppAction>) -> Vec<AppCommand> {
    let mut commands = Vec::new();
    for action in actions {
        if let Some(cmd) = apply_action(app, action) {
            commands.push(cmd);
        }
    }
    commands
}

pub fn apply_action(app: &mut App, action: AppAction) -> Option<AppCommand> {
    match action {
        AppAction::SubmitInput => submit_input(app),
        AppAction::RetryFailed => {
            let request = app.conversation.retry_failed()?;
            app.status = None;
            Some(send_command(app, request))
        }
        AppAction::NewChat => {
            app.cancel_send();
            app.conversation.reset();
            app.sync_location();
            app.scroll_back = 0;
            app.status = None;
            app.clear_input();
            app.focus = Focus::Input;
            Some(AppCommand::LoadChatList(app.sidebar.request_all()))
        }
        AppAction::OpenSelectedChat => {
            let key = app
                .sidebar
                .selected_item()
                .and_then(|item| SessionKey::parse(&item.unique_key))?;
            open_chat(app, key)
        }
        AppAction::SearchTermChanged { term } => {
            Some(AppCommand::LoadChatList(app.sidebar.set_search_term(term)))
        }
        AppAction::RefreshChatList => Some(AppCommand::LoadChatList(app.sidebar.request_current())),
        AppAction::SendCompleted { request_id, result } => send_completed(app, request_id, result),
        AppAction::HistoryLoaded { request_id, result } => {
            match app.conversation.complete_history_load(request_id, result) {
                HistoryOutcome::Loaded { messages } => {
                    debug!(messages, "history loaded");
                    app.scroll_back = 0;
                }
                HistoryOutcome::Failed(err) => {
                    warn!(error = %err, detail = err.detail(), "history load failed");
                    app.set_status(StatusKind::Error, err.to_string());
                }
                HistoryOutcome::Stale => {}
            }
            None
        }
        AppAction::ChatListLoaded { seq, result } => {
            if let ListOutcome::Failed(err) = app.sidebar.apply(seq, result) {
                app.set_status(StatusKind::Error, err.to_string());
            }
            None
        }
        AppAction::Quit => {
            app.cancel_send();
            app.exit_requested = true;
            None
        }
    }
}

fn submit_input(app: &mut App) -> Option<AppCommand> {
    let text = app.input_text();
    let request = app.conversation.begin_send(&text)?;
    app.clear_input();
    app.status = None;
    app.scroll_back = 0;
    Some(send_command(app, request))
}

fn send_command(app: &mut App, request: SendRequest) -> AppCommand {
    let cancel_token = app.start_send();
    AppCommand::Send {
        request,
        cancel_token,
    }
}

fn open_chat(app: &mut App, key: SessionKey) -> Option<AppCommand> {
    app.cancel_send();
    app.conversation.open(key);
    app.sync_location();
    app.scroll_back = 0;
    app.status = None;
    app.focus = Focus::Input;
    app.conversation
        .begin_history_load()
        .map(AppCommand::LoadHistory)
}

fn send_completed(
    app: &mut App,
    request_id: u64,
    result: Result<SendReply, ApiError>,
) -> Option<AppCommand> {
    match app.conversation.complete_send(request_id, result) {
        SendOutcome::Delivered {
            assigned,
            prompt,
            reply,
        } => {
            app.finish_send();
            app.log_transcript(&Message::user(prompt));
            app.log_transcript(&Message::bot(reply));

            // New chats show up in the sidebar once the server has them.
            assigned.as_ref()?;
            app.sync_location();
            info!(location = %app.location.path(), "new chat started");
            app.set_status(StatusKind::Info, format!("Chat saved at {}", app.location.path()));
            Some(AppCommand::LoadChatList(app.sidebar.request_current()))
        }
        SendOutcome::Failed(err) => {
            app.finish_send();
            app.set_status(
                StatusKind::Error,
                format!("{err} Press Ctrl+R to retry."),
            );
            None
        }
        SendOutcome::Stale => None,
    }
}
