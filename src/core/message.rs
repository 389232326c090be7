use serde::{Deserialize, Serialize};

use crate::api::HistoryEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

/// Delivery state of a message in the local transcript.
///
/// User messages start `Pending` when they are shown optimistically and move
/// to `Delivered` or `Failed` once the server answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Delivery {
    Pending,
    #[default]
    Delivered,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub sender: Sender,
    pub text: String,
    pub delivery: Delivery,
}

impl Message {
    pub fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            sender,
            text: text.into(),
            delivery: Delivery::Delivered,
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Sender::User, text)
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self::new(Sender::Bot, text)
    }

    pub fn pending_user(text: impl Into<String>) -> Self {
        Self {
            delivery: Delivery::Pending,
            ..Self::user(text)
        }
    }

    pub fn is_user(&self) -> bool {
        self.sender == Sender::User
    }

    pub fn is_failed(&self) -> bool {
        self.delivery == Delivery::Failed
    }
}

/// Expands persisted exchanges into transcript order: each entry becomes the
/// user message followed by the bot reply.
pub fn flatten_history<I>(entries: I) -> Vec<Message>
where
    I: IntoIterator<Item = HistoryEntry>,
{
    entries
        .into_iter()
        .flat_map(|entry| [Message::user(entry.user), Message::bot(entry.reply)])
        .collect()
}
