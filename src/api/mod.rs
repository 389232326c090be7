//! Wire types for the chatbot API and the client that speaks it.
//!
//! The server is loose about shapes: timestamps arrive as strings or
//! numbers, empty lists come back as `{"message": ...}` objects, and search
//! results are keyed maps of full records. Everything is normalized here so
//! the rest of the crate only sees [`ChatListItem`] and [`HistoryEntry`].

pub mod client;
pub mod error;

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::core::session::SessionKey;

pub use client::{ApiClient, ChatApi};
pub use error::{ApiError, ApiErrorKind, ApiOperation};

/// Summary of one chat session, as listed in the sidebar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatListItem {
    #[serde(rename = "uniqueKey")]
    pub unique_key: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub job_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub build_number: Option<String>,
    /// Epoch seconds of the most recent exchange.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub latest_time: Option<i64>,
}

impl ChatListItem {
    pub fn title(&self) -> String {
        match (self.job_name.as_deref(), self.build_number.as_deref()) {
            (Some(job), Some(build)) => format!("{job} - {build}"),
            (Some(job), None) => job.to_string(),
            (None, Some(build)) => format!("Untitled - {build}"),
            (None, None) => self.unique_key.clone(),
        }
    }
}

/// One persisted user/bot exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub user: String,
    /// The bot reply. The server names this field after its upstream model.
    #[serde(rename = "gemini")]
    pub reply: String,
}

impl HistoryEntry {
    pub fn new(user: impl Into<String>, reply: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            reply: reply.into(),
        }
    }
}

/// Reply to the first message of a new conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChatReply {
    pub key: SessionKey,
    pub response: String,
}

/// Build log to register with the server.
#[derive(Debug, Clone, Serialize)]
pub struct LogUpload {
    pub job_name: String,
    pub build_number: String,
    pub log: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub key: SessionKey,
    pub message: String,
}

#[derive(Serialize)]
pub(crate) struct PromptRequest<'a> {
    pub prompt: &'a str,
}

/// Body of every `/chatbot*` and `/logs/*` reply.
#[derive(Deserialize)]
pub(crate) struct ChatbotResponse {
    #[serde(default)]
    pub status_code: Option<u16>,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub unique_key: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct HistoryResponse {
    #[serde(default)]
    pub status_code: Option<u16>,
    #[serde(default)]
    pub history: Option<BTreeMap<String, HistoryEntry>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum ChatListBody {
    Items(Vec<ChatListItem>),
    /// The server answers `{"message": "No build history found."}` instead
    /// of an empty array.
    Notice {
        #[allow(dead_code)]
        #[serde(default)]
        message: Option<String>,
    },
}

impl ChatListBody {
    pub fn into_items(self) -> Vec<ChatListItem> {
        match self {
            ChatListBody::Items(items) => items,
            ChatListBody::Notice { .. } => Vec::new(),
        }
    }
}

#[derive(Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub results: SearchResults,
}

#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum SearchResults {
    List(Vec<ChatListItem>),
    Records(BTreeMap<String, StoredChat>),
}

impl Default for SearchResults {
    fn default() -> Self {
        SearchResults::List(Vec::new())
    }
}

impl SearchResults {
    pub fn into_items(self) -> Vec<ChatListItem> {
        match self {
            SearchResults::List(items) => items,
            SearchResults::Records(records) => records
                .into_iter()
                .map(|(key, record)| record.into_list_item(key))
                .collect(),
        }
    }
}

/// Full server-side record of a chat, as returned inside search results.
#[derive(Debug, Deserialize)]
pub(crate) struct StoredChat {
    #[serde(default, deserialize_with = "lenient_string")]
    pub job_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub build_number: Option<String>,
    #[serde(default)]
    pub history: Option<BTreeMap<String, Value>>,
}

impl StoredChat {
    fn into_list_item(self, unique_key: String) -> ChatListItem {
        let latest_time = self
            .history
            .as_ref()
            .and_then(|history| history.keys().max_by(|a, b| history_key_order(a, b)))
            .and_then(|key| key.trim().parse::<i64>().ok());

        ChatListItem {
            unique_key,
            job_name: self.job_name,
            build_number: self.build_number,
            latest_time,
        }
    }
}

/// Orders history keys the way the server writes them: numeric timestamps
/// ascending, then any non-numeric keys lexically.
pub fn history_key_order(a: &str, b: &str) -> Ordering {
    match (a.trim().parse::<u64>(), b.trim().parse::<u64>()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// Converts a timestamp-keyed history map into conversation order.
pub fn order_history<I>(history: I) -> Vec<HistoryEntry>
where
    I: IntoIterator<Item = (String, HistoryEntry)>,
{
    let mut entries: Vec<(String, HistoryEntry)> = history.into_iter().collect();
    entries.sort_by(|(a, _), (b, _)| history_key_order(a, b));
    entries.into_iter().map(|(_, entry)| entry).collect()
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            trimmed
                .parse::<i64>()
                .ok()
                .or_else(|| trimmed.parse::<f64>().ok().map(|f| f as i64))
        }
        _ => None,
    })
}
