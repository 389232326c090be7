use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use super::{
    order_history, ApiError, ApiErrorKind, ApiOperation, ChatListBody, ChatListItem,
    ChatbotResponse, HistoryEntry, HistoryResponse, LogUpload, NewChatReply, PromptRequest,
    SearchResponse, UploadReceipt,
};
use crate::core::session::SessionKey;
use crate::utils::url::normalize_base_url;

/// Operations the chatbot server offers.
///
/// Every call is a single request with no retry. Failures are logged where
/// they happen and surface as [`ApiError`], whose `Display` is safe to show
/// to the user.
#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn get_chats(&self) -> Result<Vec<ChatListItem>, ApiError>;

    /// History of a chat in conversation order.
    async fn get_chat_history(&self, key: &SessionKey) -> Result<Vec<HistoryEntry>, ApiError>;

    /// Starts a new chat; the server assigns its key.
    async fn send_message(&self, prompt: &str) -> Result<NewChatReply, ApiError>;

    /// Continues an existing chat and returns the bot reply.
    async fn send_message_to_chat(&self, key: &SessionKey, prompt: &str)
        -> Result<String, ApiError>;

    async fn get_specific_log(&self, key: &SessionKey) -> Result<Value, ApiError>;

    /// Server-side keyword search. Matching semantics are the server's.
    async fn search_logs(&self, keyword: &str) -> Result<Vec<ChatListItem>, ApiError>;

    async fn upload_log(&self, upload: &LogUpload) -> Result<UploadReceipt, ApiError>;

    async fn get_log_by_build(&self, job_name: &str, build_number: &str)
        -> Result<String, ApiError>;
}

#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

fn failure(operation: ApiOperation, kind: ApiErrorKind, detail: impl Into<String>) -> ApiError {
    let err = ApiError::new(operation, kind, detail);
    warn!(
        operation = operation.label(),
        kind = ?err.kind(),
        detail = err.detail(),
        "API request failed"
    );
    err
}

/// Maps an in-body `status_code` onto the error taxonomy. The server reports
/// some missing resources with a 200 response carrying `status_code: 404`.
fn check_body_status(operation: ApiOperation, status_code: Option<u16>) -> Result<(), ApiError> {
    match status_code {
        Some(404) => Err(failure(
            operation,
            ApiErrorKind::NotFound,
            "response body reported status 404",
        )),
        Some(code) if code >= 400 => Err(failure(
            operation,
            ApiErrorKind::Status(code),
            format!("response body reported status {code}"),
        )),
        _ => Ok(()),
    }
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("logchat/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self::with_client(builder.build()?, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: normalize_base_url(base_url),
        }
    }

    /// Appends percent-encoded path segments to the base URL.
    fn endpoint(&self, operation: ApiOperation, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = Url::parse(&self.base_url).map_err(|err| {
            failure(
                operation,
                ApiErrorKind::Transport,
                format!("invalid base URL '{}': {err}", self.base_url),
            )
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                failure(
                    operation,
                    ApiErrorKind::Transport,
                    format!("base URL '{}' cannot carry a path", self.base_url),
                )
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        operation: ApiOperation,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = request
            .send()
            .await
            .map_err(|err| failure(operation, ApiErrorKind::Transport, err.to_string()))?;

        let status = response.status();
        debug!(operation = operation.label(), %status, "API response received");

        if status == StatusCode::NOT_FOUND {
            let body = response.text().await.unwrap_or_default();
            return Err(failure(operation, ApiErrorKind::NotFound, body));
        }

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            return Err(failure(
                operation,
                ApiErrorKind::Status(status.as_u16()),
                format!("status {status}: {body}"),
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|err| failure(operation, ApiErrorKind::Transport, err.to_string()))?;

        serde_json::from_slice(&bytes)
            .map_err(|err| failure(operation, ApiErrorKind::Decode, err.to_string()))
    }
}

#[async_trait]
impl ChatApi for ApiClient {
    async fn get_chats(&self) -> Result<Vec<ChatListItem>, ApiError> {
        let operation = ApiOperation::ListChats;
        let url = self.endpoint(operation, &["chat"])?;
        let body: ChatListBody = self.execute(operation, self.client.get(url)).await?;
        Ok(body.into_items())
    }

    async fn get_chat_history(&self, key: &SessionKey) -> Result<Vec<HistoryEntry>, ApiError> {
        let operation = ApiOperation::ChatHistory;
        let url = self.endpoint(operation, &["history", key.as_str()])?;
        let body: HistoryResponse = self.execute(operation, self.client.get(url)).await?;
        check_body_status(operation, body.status_code)?;
        Ok(order_history(body.history.unwrap_or_default()))
    }

    async fn send_message(&self, prompt: &str) -> Result<NewChatReply, ApiError> {
        let operation = ApiOperation::SendMessage;
        let url = self.endpoint(operation, &["chatbot"])?;
        let request = self.client.post(url).json(&PromptRequest { prompt });
        let body: ChatbotResponse = self.execute(operation, request).await?;
        check_body_status(operation, body.status_code)?;

        let key = body
            .unique_key
            .as_deref()
            .and_then(SessionKey::parse)
            .ok_or_else(|| {
                failure(
                    operation,
                    ApiErrorKind::Decode,
                    "response did not include a unique_key",
                )
            })?;
        Ok(NewChatReply {
            key,
            response: body.response.unwrap_or_default(),
        })
    }

    async fn send_message_to_chat(
        &self,
        key: &SessionKey,
        prompt: &str,
    ) -> Result<String, ApiError> {
        let operation = ApiOperation::SendToChat;
        let url = self.endpoint(operation, &["chatbot", key.as_str()])?;
        let request = self.client.post(url).json(&PromptRequest { prompt });
        let body: ChatbotResponse = self.execute(operation, request).await?;
        check_body_status(operation, body.status_code)?;
        Ok(body.response.unwrap_or_default())
    }

    async fn get_specific_log(&self, key: &SessionKey) -> Result<Value, ApiError> {
        let operation = ApiOperation::SpecificLog;
        let url = self.endpoint(operation, &["chatbot", key.as_str()])?;
        self.execute(operation, self.client.get(url)).await
    }

    async fn search_logs(&self, keyword: &str) -> Result<Vec<ChatListItem>, ApiError> {
        let operation = ApiOperation::SearchLogs;
        let url = self.endpoint(operation, &["search"])?;
        let request = self.client.get(url).query(&[("keyword", keyword)]);
        let body: SearchResponse = self.execute(operation, request).await?;
        Ok(body.results.into_items())
    }

    async fn upload_log(&self, upload: &LogUpload) -> Result<UploadReceipt, ApiError> {
        let operation = ApiOperation::UploadLog;
        let url = self.endpoint(operation, &["chatbot", "load"])?;
        let body: ChatbotResponse = self
            .execute(operation, self.client.post(url).json(upload))
            .await?;
        check_body_status(operation, body.status_code)?;

        let key = body
            .unique_key
            .as_deref()
            .and_then(SessionKey::parse)
            .ok_or_else(|| {
                failure(
                    operation,
                    ApiErrorKind::Decode,
                    "response did not include a unique_key",
                )
            })?;
        Ok(UploadReceipt {
            key,
            message: body.response.unwrap_or_default(),
        })
    }

    async fn get_log_by_build(
        &self,
        job_name: &str,
        build_number: &str,
    ) -> Result<String, ApiError> {
        let operation = ApiOperation::BuildLog;
        let url = self.endpoint(operation, &["logs", job_name, build_number])?;
        let body: ChatbotResponse = self.execute(operation, self.client.get(url)).await?;
        check_body_status(operation, body.status_code)?;
        Ok(body.response.unwrap_or_default())
    }
}
