use std::error::Error as StdError;
use std::fmt;

/// The API call an error came from. Each operation carries its own
/// user-facing failure text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiOperation {
    ListChats,
    ChatHistory,
    SendMessage,
    SendToChat,
    SpecificLog,
    SearchLogs,
    UploadLog,
    BuildLog,
}

impl ApiOperation {
    pub fn label(self) -> &'static str {
        match self {
            ApiOperation::ListChats => "list chats",
            ApiOperation::ChatHistory => "chat history",
            ApiOperation::SendMessage => "send message",
            ApiOperation::SendToChat => "send message to chat",
            ApiOperation::SpecificLog => "specific log",
            ApiOperation::SearchLogs => "search logs",
            ApiOperation::UploadLog => "upload log",
            ApiOperation::BuildLog => "build log",
        }
    }

    fn failure_message(self) -> &'static str {
        match self {
            ApiOperation::ListChats => "Failed to fetch build history. Please try again later.",
            ApiOperation::ChatHistory => "Failed to fetch chat history. Please try again later.",
            ApiOperation::SendMessage | ApiOperation::SendToChat => {
                "Failed to send message. Please try again later."
            }
            ApiOperation::SpecificLog => "Failed to fetch specific log. Please try again later.",
            ApiOperation::SearchLogs => "Failed to search logs. Please try again later.",
            ApiOperation::UploadLog => "Failed to upload log. Please try again later.",
            ApiOperation::BuildLog => "Failed to fetch build log. Please try again later.",
        }
    }

    fn not_found_message(self) -> &'static str {
        match self {
            ApiOperation::ChatHistory => "Chat history not found.",
            ApiOperation::SpecificLog | ApiOperation::BuildLog => "Log not found.",
            _ => "Chat not found.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// The request never produced an HTTP response.
    Transport,
    /// The server answered with a non-success status.
    Status(u16),
    /// The server reported a missing resource, either through the HTTP
    /// status or through a `status_code` field inside a success body.
    NotFound,
    /// The response body did not match the expected shape.
    Decode,
}

/// Failure of a single API call.
///
/// `Display` yields only the generic user-facing text; the technical detail
/// stays available through [`ApiError::detail`] for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    operation: ApiOperation,
    kind: ApiErrorKind,
    detail: String,
}

impl ApiError {
    pub fn new(operation: ApiOperation, kind: ApiErrorKind, detail: impl Into<String>) -> Self {
        Self {
            operation,
            kind,
            detail: detail.into(),
        }
    }

    pub fn operation(&self) -> ApiOperation {
        self.operation
    }

    pub fn kind(&self) -> &ApiErrorKind {
        &self.kind
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ApiErrorKind::NotFound
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ApiErrorKind::NotFound => f.write_str(self.operation.not_found_message()),
            _ => f.write_str(self.operation.failure_message()),
        }
    }
}

impl StdError for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_hides_transport_detail() {
        let err = ApiError::new(
            ApiOperation::SendMessage,
            ApiErrorKind::Transport,
            "connection refused (os error 111)",
        );
        assert_eq!(
            err.to_string(),
            "Failed to send message. Please try again later."
        );
        assert_eq!(err.detail(), "connection refused (os error 111)");
    }

    #[test]
    fn not_found_has_dedicated_message() {
        let err = ApiError::new(ApiOperation::ChatHistory, ApiErrorKind::NotFound, "");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Chat history not found.");
    }
}
