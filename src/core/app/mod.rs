//! Application state shared by the event loop and the renderer.
//!
//! [`App`] owns the conversation, the sidebar and the UI-only state (focus,
//! input box, status line, scroll). It is only mutated through
//! [`apply_action`] or directly by key handlers; network work is described as
//! [`AppCommand`]s and executed elsewhere.

pub mod actions;


use std::error::Error;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::warn;
use tui_textarea::TextArea;

use crate::core::conversation::Conversation;
use crate::core::message::Message;
use crate::core::session::{SessionKey, SessionLocation};
use crate::core::sidebar::SidebarState;
use crate::utils::logging::TranscriptLog;

pub use actions::{apply_action, apply_actions, AppAction, AppActionDispatcher, AppCommand};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    Input,
    Sidebar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub kind: StatusKind,
    pub text: String,
}

pub struct AppInitConfig {
    pub base_url: String,
    pub session: Option<SessionKey>,
    pub log_file: Option<String>,
}

pub struct App {
    pub conversation: Conversation,
    pub sidebar: SidebarState,
    pub location: SessionLocation,
    pub base_url: String,
    pub focus: Focus,
    pub input: TextArea<'static>,
    pub status: Option<StatusLine>,
    pub transcript: TranscriptLog,
    /// Lines scrolled up from the newest message.
    pub scroll_back: u16,
    pub exit_requested: bool,
    pub pulse_start: Instant,
    send_cancel: Option<CancellationToken>,
}

impl App {
    pub fn new(config: AppInitConfig) -> Result<Self, Box<dyn Error>> {
        let transcript = TranscriptLog::new(config.log_file)?;
        Ok(Self::with_transcript(config.base_url, config.session, transcript))
    }

    pub(crate) fn with_transcript(
        base_url: String,
        session: Option<SessionKey>,
        transcript: TranscriptLog,
    ) -> Self {
        let location = SessionLocation::from_key(session.clone());
        Self {
            conversation: Conversation::new(session),
            sidebar: SidebarState::default(),
            location,
            base_url,
            focus: Focus::Input,
            input: new_input(),
            status: None,
            transcript,
            scroll_back: 0,
            exit_requested: false,
            pulse_start: Instant::now(),
            send_cancel: None,
        }
    }

    /// Initial sidebar fetch, plus the history load when a key was supplied.
    pub fn startup_commands(&mut self) -> Vec<AppCommand> {
        let mut commands = vec![AppCommand::LoadChatList(self.sidebar.request_all())];
        if let Some(request) = self.conversation.begin_history_load() {
            commands.push(AppCommand::LoadHistory(request));
        }
        commands
    }

    /// Writes the conversation's session into the shareable location. This
    /// is the only place the location changes after startup.
    pub fn sync_location(&mut self) {
        let key = self.conversation.session_key().cloned();
        if self.location.sync(key.as_ref()) && key.is_some() {
            let note = format!("Session: {}", self.location.share_url(&self.base_url));
            self.log_transcript_note(&note);
        }
    }

    pub fn is_loading(&self) -> bool {
        self.conversation.is_loading()
    }

    pub fn input_text(&self) -> String {
        self.input.lines().join("\n")
    }

    pub fn clear_input(&mut self) {
        self.input = new_input();
    }

    pub fn set_status(&mut self, kind: StatusKind, text: impl Into<String>) {
        self.status = Some(StatusLine {
            kind,
            text: text.into(),
        });
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Input => Focus::Sidebar,
            Focus::Sidebar => Focus::Input,
        };
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.scroll_back = self.scroll_back.saturating_add(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.scroll_back = self.scroll_back.saturating_sub(lines);
    }

    pub fn logging_status(&self) -> String {
        self.transcript.get_status_string()
    }

    pub(crate) fn start_send(&mut self) -> CancellationToken {
        self.cancel_send();
        let token = CancellationToken::new();
        self.send_cancel = Some(token.clone());
        self.pulse_start = Instant::now();
        token
    }

    pub(crate) fn cancel_send(&mut self) {
        if let Some(token) = self.send_cancel.take() {
            token.cancel();
        }
    }

    pub(crate) fn finish_send(&mut self) {
        self.send_cancel = None;
    }

    pub(crate) fn log_transcript(&self, message: &Message) {
        if let Err(err) = self.transcript.log_message(message) {
            warn!(%err, "failed to write transcript");
        }
    }

    pub(crate) fn log_transcript_note(&self, note: &str) {
        if let Err(err) = self.transcript.log_note(note) {
            warn!(%err, "failed to write transcript");
        }
    }
}

fn new_input() -> TextArea<'static> {
    let mut input = TextArea::default();
    input.set_placeholder_text("Ask about a build log...");
    input
}
