//! Background execution of [`AppCommand`]s.
//!
//! Each command runs on its own task and reports back through the action
//! dispatcher. Sends race their cancellation token; a cancelled send reports
//! nothing.

use std::sync::Arc;

use tracing::debug;

use crate::api::ChatApi;
use crate::core::app::{AppAction, AppActionDispatcher, AppCommand};
use crate::core::conversation::perform_send;
use crate::core::sidebar::fetch_list;

pub fn spawn_command(
    api: Arc<dyn ChatApi>,
    dispatcher: AppActionDispatcher,
    command: AppCommand,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        match command {
            AppCommand::Send {
                request,
                cancel_token,
            } => {
                tokio::select! {
                    biased;
                    _ = cancel_token.cancelled() => {
                        debug!(request_id = request.request_id, "send abandoned");
                    }
                    result = perform_send(api.as_ref(), &request) => {
                        dispatcher.dispatch(AppAction::SendCompleted {
                            request_id: request.request_id,
                            result,
                        });
                    }
                }
            }
            AppCommand::LoadHistory(request) => {
                let result = api.get_chat_history(&request.key).await;
                dispatcher.dispatch(AppAction::HistoryLoaded {
                    request_id: request.request_id,
                    result,
                });
            }
            AppCommand::LoadChatList(request) => {
                let result = fetch_list(api.as_ref(), &request.query).await;
                dispatcher.dispatch(AppAction::ChatListLoaded {
                    seq: request.seq,
                    result,
                });
            }
        }
    })
}
