use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::api::{
    ApiError, ApiErrorKind, ApiOperation, ChatApi, ChatListItem, HistoryEntry, LogUpload,
    NewChatReply, UploadReceipt,
};
use crate::core::app::App;
use crate::core::session::SessionKey;
use crate::utils::logging::TranscriptLog;

pub fn create_test_app() -> App {
    App::with_transcript(
        "http://chat.test".to_string(),
        None,
        TranscriptLog::default(),
    )
}

pub fn create_test_app_with_session(key: &str) -> App {
    App::with_transcript(
        "http://chat.test".to_string(),
        SessionKey::parse(key),
        TranscriptLog::default(),
    )
}

pub fn chat_item(key: &str, latest_time: Option<i64>) -> ChatListItem {
    ChatListItem {
        unique_key: key.to_string(),
        job_name: Some(format!("job-{key}")),
        build_number: Some("1".to_string()),
        latest_time,
    }
}

#[derive(Default)]
struct FakeState {
    calls: Vec<String>,
    chats: Vec<ChatListItem>,
    search_results: Vec<ChatListItem>,
    histories: HashMap<String, Vec<HistoryEntry>>,
    new_chats: VecDeque<Result<NewChatReply, ApiError>>,
    replies: VecDeque<Result<String, ApiError>>,
}

/// In-memory [`ChatApi`] that records every call. Sends without a queued
/// answer fail with a transport error.
#[derive(Default)]
pub struct FakeApi {
    state: Mutex<FakeState>,
}

impl FakeApi {
    fn with_state<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        let mut state = self.state.lock().expect("fake api state poisoned");
        f(&mut state)
    }

    pub fn calls(&self) -> Vec<String> {
        self.with_state(|state| state.calls.clone())
    }

    pub fn set_chats(&self, chats: Vec<ChatListItem>) {
        self.with_state(|state| state.chats = chats);
    }

    pub fn set_search_results(&self, results: Vec<ChatListItem>) {
        self.with_state(|state| state.search_results = results);
    }

    pub fn set_history(&self, key: &str, entries: Vec<HistoryEntry>) {
        self.with_state(|state| {
            state.histories.insert(key.to_string(), entries);
        });
    }

    pub fn queue_new_chat(&self, key: &str, response: &str) {
        let reply = NewChatReply {
            key: SessionKey::parse(key).expect("test key must not be blank"),
            response: response.to_string(),
        };
        self.with_state(|state| state.new_chats.push_back(Ok(reply)));
    }

    pub fn queue_reply(&self, response: &str) {
        self.with_state(|state| state.replies.push_back(Ok(response.to_string())));
    }

    fn unavailable(operation: ApiOperation) -> ApiError {
        ApiError::new(operation, ApiErrorKind::Transport, "fake api has no answer")
    }
}

#[async_trait]
impl ChatApi for FakeApi {
    async fn get_chats(&self) -> Result<Vec<ChatListItem>, ApiError> {
        self.with_state(|state| {
            state.calls.push("get_chats".to_string());
            Ok(state.chats.clone())
        })
    }

    async fn get_chat_history(&self, key: &SessionKey) -> Result<Vec<HistoryEntry>, ApiError> {
        self.with_state(|state| {
            state.calls.push(format!("get_chat_history {key}"));
            state.histories.get(key.as_str()).cloned().ok_or_else(|| {
                ApiError::new(ApiOperation::ChatHistory, ApiErrorKind::NotFound, "")
            })
        })
    }

    async fn send_message(&self, prompt: &str) -> Result<NewChatReply, ApiError> {
        self.with_state(|state| {
            state.calls.push(format!("send_message {prompt}"));
            state
                .new_chats
                .pop_front()
                .unwrap_or_else(|| Err(Self::unavailable(ApiOperation::SendMessage)))
        })
    }

    async fn send_message_to_chat(
        &self,
        key: &SessionKey,
        prompt: &str,
    ) -> Result<String, ApiError> {
        self.with_state(|state| {
            state.calls.push(format!("send_message_to_chat {key} {prompt}"));
            state
                .replies
                .pop_front()
                .unwrap_or_else(|| Err(Self::unavailable(ApiOperation::SendToChat)))
        })
    }

    async fn get_specific_log(&self, key: &SessionKey) -> Result<Value, ApiError> {
        self.with_state(|state| {
            state.calls.push(format!("get_specific_log {key}"));
            Ok(Value::Null)
        })
    }

    async fn search_logs(&self, keyword: &str) -> Result<Vec<ChatListItem>, ApiError> {
        self.with_state(|state| {
            state.calls.push(format!("search_logs {keyword}"));
            Ok(state.search_results.clone())
        })
    }

    async fn upload_log(&self, upload: &LogUpload) -> Result<UploadReceipt, ApiError> {
        self.with_state(|state| {
            state
                .calls
                .push(format!("upload_log {} {}", upload.job_name, upload.build_number));
            Err(Self::unavailable(ApiOperation::UploadLog))
        })
    }

    async fn get_log_by_build(
        &self,
        job_name: &str,
        build_number: &str,
    ) -> Result<String, ApiError> {
        self.with_state(|state| {
            state
                .calls
                .push(format!("get_log_by_build {job_name} {build_number}"));
            Err(Self::unavailable(ApiOperation::BuildLog))
        })
    }
}
