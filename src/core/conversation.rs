//! Conversation state for one chat panel.
//!
//! A conversation is either without a session or bound to a server-issued
//! key. Sends are two-phase: the user message is shown immediately as
//! pending and is later marked delivered or failed. Every request gets an id;
//! completions carrying an older id are stale and ignored.

use tracing::{debug, info};

use crate::api::{ApiError, ChatApi, HistoryEntry};
use crate::core::message::{flatten_history, Delivery, Message};
use crate::core::session::SessionKey;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    NoSession,
    Active(SessionKey),
}

/// A send ready to be dispatched. `key` is `None` when the server should
/// create a new chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendRequest {
    pub request_id: u64,
    pub key: Option<SessionKey>,
    pub prompt: String,
}

/// Server answer to a [`SendRequest`]. `key` is set only when a new chat
/// was created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReply {
    pub key: Option<SessionKey>,
    pub response: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRequest {
    pub request_id: u64,
    pub key: SessionKey,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Stale,
    Delivered {
        /// The key adopted by this reply, on the first send of a chat.
        assigned: Option<SessionKey>,
        prompt: String,
        reply: String,
    },
    Failed(ApiError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryOutcome {
    Stale,
    Loaded { messages: usize },
    Failed(ApiError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InFlight {
    Send {
        request_id: u64,
        message_index: usize,
    },
    History {
        request_id: u64,
    },
}

#[derive(Debug, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    session: SessionState,
    in_flight: Option<InFlight>,
    last_request_id: u64,
}

impl Conversation {
    pub fn new(key: Option<SessionKey>) -> Self {
        Self {
            session: key.map(SessionState::Active).unwrap_or_default(),
            ..Self::default()
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn session_key(&self) -> Option<&SessionKey> {
        match &self.session {
            SessionState::Active(key) => Some(key),
            SessionState::NoSession => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn has_failed_message(&self) -> bool {
        self.messages.iter().any(Message::is_failed)
    }

    fn next_request_id(&mut self) -> u64 {
        self.last_request_id += 1;
        self.last_request_id
    }

    /// Appends `input` as a pending user message and returns the request to
    /// dispatch. Blank input, or input while another request is in flight,
    /// is ignored.
    pub fn begin_send(&mut self, input: &str) -> Option<SendRequest> {
        if input.trim().is_empty() || self.is_loading() {
            return None;
        }
        self.messages.push(Message::pending_user(input));
        let message_index = self.messages.len() - 1;
        Some(self.dispatch(message_index, input.to_string()))
    }

    /// Re-sends the most recent failed user message. The message moves to
    /// the end of the transcript so its reply follows it directly.
    pub fn retry_failed(&mut self) -> Option<SendRequest> {
        if self.is_loading() {
            return None;
        }
        let failed_index = self.messages.iter().rposition(Message::is_failed)?;
        let prompt = self.messages.remove(failed_index).text;
        self.messages.push(Message::pending_user(prompt.clone()));
        let message_index = self.messages.len() - 1;
        Some(self.dispatch(message_index, prompt))
    }

    fn dispatch(&mut self, message_index: usize, prompt: String) -> SendRequest {
        let request_id = self.next_request_id();
        self.in_flight = Some(InFlight::Send {
            request_id,
            message_index,
        });
        SendRequest {
            request_id,
            key: self.session_key().cloned(),
            prompt,
        }
    }

    pub fn complete_send(
        &mut self,
        request_id: u64,
        result: Result<SendReply, ApiError>,
    ) -> SendOutcome {
        let message_index = match self.in_flight {
            Some(InFlight::Send {
                request_id: current,
                message_index,
            }) if current == request_id => message_index,
            _ => {
                debug!(request_id, "discarding stale send completion");
                return SendOutcome::Stale;
            }
        };
        self.in_flight = None;

        match result {
            Ok(reply) => {
                let mut prompt = String::new();
                if let Some(message) = self.messages.get_mut(message_index) {
                    message.delivery = Delivery::Delivered;
                    prompt = message.text.clone();
                }

                let assigned = match (&self.session, reply.key) {
                    (SessionState::NoSession, Some(key)) => {
                        info!(key = %key, "session assigned");
                        self.session = SessionState::Active(key.clone());
                        Some(key)
                    }
                    _ => None,
                };

                self.messages.push(Message::bot(reply.response.clone()));
                SendOutcome::Delivered {
                    assigned,
                    prompt,
                    reply: reply.response,
                }
            }
            Err(err) => {
                if let Some(message) = self.messages.get_mut(message_index) {
                    message.delivery = Delivery::Failed;
                }
                SendOutcome::Failed(err)
            }
        }
    }

    /// Starts loading history for the current session, if there is one.
    pub fn begin_history_load(&mut self) -> Option<HistoryRequest> {
        let key = self.session_key()?.clone();
        let request_id = self.next_request_id();
        self.in_flight = Some(InFlight::History { request_id });
        Some(HistoryRequest { request_id, key })
    }

    pub fn complete_history_load(
        &mut self,
        request_id: u64,
        result: Result<Vec<HistoryEntry>, ApiError>,
    ) -> HistoryOutcome {
        match self.in_flight {
            Some(InFlight::History {
                request_id: current,
            }) if current == request_id => {}
            _ => {
                debug!(request_id, "discarding stale history completion");
                return HistoryOutcome::Stale;
            }
        }
        self.in_flight = None;

        match result {
            Ok(entries) => {
                self.messages = flatten_history(entries);
                HistoryOutcome::Loaded {
                    messages: self.messages.len(),
                }
            }
            Err(err) => HistoryOutcome::Failed(err),
        }
    }

    /// Drops all local state. Outstanding requests become stale.
    pub fn reset(&mut self) {
        self.messages.clear();
        self.session = SessionState::NoSession;
        self.in_flight = None;
    }

    /// Switches to an existing chat. History still has to be loaded.
    pub fn open(&mut self, key: SessionKey) {
        self.reset();
        self.session = SessionState::Active(key);
    }
}

/// Routes a send by session state: no key creates a chat, a key appends.
pub async fn perform_send(api: &dyn ChatApi, request: &SendRequest) -> Result<SendReply, ApiError> {
    match &request.key {
        Some(key) => api
            .send_message_to_chat(key, &request.prompt)
            .await
            .map(|response| SendReply {
                key: None,
                response,
            }),
        None => api
            .send_message(&request.prompt)
            .await
            .map(|reply| SendReply {
                key: Some(reply.key),
                response: reply.response,
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiErrorKind, ApiOperation};
    use crate::core::message::Sender;
    use crate::utils::test_utils::FakeApi;

    fn key(raw: &str) -> SessionKey {
        SessionKey::parse(raw).unwrap()
    }

    fn send_failure() -> ApiError {
        ApiError::new(ApiOperation::SendMessage, ApiErrorKind::Transport, "refused")
    }

    #[test]
    fn first_send_adopts_server_key_and_appends_in_order() {
        let mut conversation = Conversation::new(None);
        let request = conversation.begin_send("why did it fail?").unwrap();
        assert_eq!(request.key, None);
        assert!(conversation.is_loading());
        assert_eq!(conversation.messages()[0].delivery, Delivery::Pending);

        let outcome = conversation.complete_send(
            request.request_id,
            Ok(SendReply {
                key: Some(key("k1")),
                response: "Missing dependency.".into(),
            }),
        );

        assert_eq!(
            outcome,
            SendOutcome::Delivered {
                assigned: Some(key("k1")),
                prompt: "why did it fail?".into(),
                reply: "Missing dependency.".into(),
            }
        );
        assert_eq!(conversation.session(), &SessionState::Active(key("k1")));
        assert!(!conversation.is_loading());
        let messages = conversation.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].sender, Sender::User);
        assert_eq!(messages[0].delivery, Delivery::Delivered);
        assert_eq!(messages[1].sender, Sender::Bot);
        assert_eq!(messages[1].text, "Missing dependency.");
    }

    #[test]
    fn existing_key_is_reused_and_never_reassigned() {
        let mut conversation = Conversation::new(Some(key("k1")));
        let request = conversation.begin_send("next question").unwrap();
        assert_eq!(request.key, Some(key("k1")));

        let outcome = conversation.complete_send(
            request.request_id,
            Ok(SendReply {
                key: Some(key("other")),
                response: "answer".into(),
            }),
        );

        assert!(matches!(
            outcome,
            SendOutcome::Delivered { assigned: None, .. }
        ));
        assert_eq!(conversation.session_key(), Some(&key("k1")));
    }

    #[test]
    fn blank_input_and_busy_conversation_are_ignored() {
        let mut conversation = Conversation::new(None);
        assert!(conversation.begin_send("   \n ").is_none());
        assert!(conversation.messages().is_empty());

        conversation.begin_send("first").unwrap();
        assert!(conversation.begin_send("second").is_none());
        assert_eq!(conversation.messages().len(), 1);
    }

    #[test]
    fn failed_send_marks_message_instead_of_dropping_it() {
        let mut conversation = Conversation::new(None);
        let request = conversation.begin_send("hello").unwrap();

        let outcome = conversation.complete_send(request.request_id, Err(send_failure()));

        assert!(matches!(outcome, SendOutcome::Failed(_)));
        assert!(!conversation.is_loading());
        assert_eq!(conversation.messages().len(), 1);
        assert!(conversation.messages()[0].is_failed());
        assert_eq!(conversation.session(), &SessionState::NoSession);
    }

    #[test]
    fn retried_reply_follows_its_prompt_after_later_exchanges() {
        let mut conversation = Conversation::new(None);
        let a = conversation.begin_send("A").unwrap();
        conversation.complete_send(a.request_id, Err(send_failure()));

        let b = conversation.begin_send("B").unwrap();
        conversation.complete_send(
            b.request_id,
            Ok(SendReply {
                key: Some(key("k1")),
                response: "reply-B".into(),
            }),
        );

        let retry = conversation.retry_failed().unwrap();
        assert_eq!(retry.prompt, "A");
        assert_eq!(retry.key, Some(key("k1")));
        conversation.complete_send(
            retry.request_id,
            Ok(SendReply {
                key: None,
                response: "reply-A".into(),
            }),
        );

        let transcript: Vec<&str> = conversation
            .messages()
            .iter()
            .map(|m| m.text.as_str())
            .collect();
        assert_eq!(transcript, vec!["B", "reply-B", "A", "reply-A"]);
        assert!(conversation
            .messages()
            .iter()
            .all(|m| m.delivery == Delivery::Delivered));
    }

    #[test]
    fn retry_resends_failed_message() {
        let mut conversation = Conversation::new(None);
        let first = conversation.begin_send("hello").unwrap();
        conversation.complete_send(first.request_id, Err(send_failure()));

        let retry = conversation.retry_failed().unwrap();
        assert_eq!(retry.prompt, "hello");
        assert_ne!(retry.request_id, first.request_id);
        assert_eq!(conversation.messages()[0].delivery, Delivery::Pending);

        conversation.complete_send(
            retry.request_id,
            Ok(SendReply {
                key: Some(key("k2")),
                response: "hi".into(),
            }),
        );
        assert_eq!(conversation.messages().len(), 2);
        assert!(!conversation.has_failed_message());
        assert!(conversation.retry_failed().is_none());
    }

    #[test]
    fn completions_after_reset_are_stale() {
        let mut conversation = Conversation::new(None);
        let request = conversation.begin_send("hello").unwrap();
        conversation.reset();

        let outcome = conversation.complete_send(
            request.request_id,
            Ok(SendReply {
                key: Some(key("late")),
                response: "late reply".into(),
            }),
        );

        assert_eq!(outcome, SendOutcome::Stale);
        assert!(conversation.messages().is_empty());
        assert_eq!(conversation.session(), &SessionState::NoSession);
    }

    #[test]
    fn history_load_flattens_entries() {
        let mut conversation = Conversation::new(Some(key("abc123")));
        let request = conversation.begin_history_load().unwrap();
        assert_eq!(request.key, key("abc123"));

        let outcome = conversation.complete_history_load(
            request.request_id,
            Ok(vec![HistoryEntry::new("hi", "hello")]),
        );

        assert_eq!(outcome, HistoryOutcome::Loaded { messages: 2 });
        assert_eq!(
            conversation.messages(),
            &[Message::user("hi"), Message::bot("hello")]
        );
    }

    #[test]
    fn no_session_means_no_history_request() {
        let mut conversation = Conversation::new(None);
        assert!(conversation.begin_history_load().is_none());
        assert!(!conversation.is_loading());
    }

    #[test]
    fn superseded_history_load_is_discarded() {
        let mut conversation = Conversation::new(Some(key("a")));
        let first = conversation.begin_history_load().unwrap();
        conversation.open(key("b"));
        let second = conversation.begin_history_load().unwrap();

        let stale = conversation.complete_history_load(
            first.request_id,
            Ok(vec![HistoryEntry::new("from a", "a")]),
        );
        assert_eq!(stale, HistoryOutcome::Stale);

        conversation.complete_history_load(
            second.request_id,
            Ok(vec![HistoryEntry::new("from b", "b")]),
        );
        assert_eq!(conversation.messages()[0].text, "from b");
    }

    #[tokio::test]
    async fn perform_send_routes_by_session_state() {
        let api = FakeApi::default();
        api.queue_new_chat("k1", "created");
        api.queue_reply("appended");

        let created = perform_send(
            &api,
            &SendRequest {
                request_id: 1,
                key: None,
                prompt: "first".into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(created.key, Some(key("k1")));

        let appended = perform_send(
            &api,
            &SendRequest {
                request_id: 2,
                key: Some(key("k1")),
                prompt: "second".into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(appended.key, None);
        assert_eq!(appended.response, "appended");

        assert_eq!(
            api.calls(),
            vec!["send_message first".to_string(), "send_message_to_chat k1 second".to_string()]
        );
    }
}
