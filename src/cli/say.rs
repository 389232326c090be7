//! TUI-less "say" command

use std::error::Error;

use crate::api::ChatApi;
use crate::core::conversation::{perform_send, Conversation, SendOutcome};
use crate::core::session::{SessionKey, SessionLocation};

pub async fn run_say(
    api: &dyn ChatApi,
    base_url: &str,
    prompt: Vec<String>,
    chat: Option<SessionKey>,
) -> Result<(), Box<dyn Error>> {
    let prompt = prompt.join(" ");
    if prompt.trim().is_empty() {
        eprintln!("Usage: logchat say <prompt>");
        std::process::exit(1);
    }

    let mut conversation = Conversation::new(chat);
    let Some(request) = conversation.begin_send(&prompt) else {
        return Err("nothing to send".into());
    };
    let result = perform_send(api, &request).await;

    match conversation.complete_send(request.request_id, result) {
        SendOutcome::Delivered {
            assigned, reply, ..
        } => {
            println!("{reply}");
            if let Some(key) = assigned {
                let location = SessionLocation::from_key(Some(key.clone()));
                eprintln!();
                eprintln!("💾 Chat saved as {key}");
                eprintln!("   {}", location.share_url(base_url));
            }
            Ok(())
        }
        SendOutcome::Failed(err) => Err(err.into()),
        SendOutcome::Stale => Err("send completion was discarded".into()),
    }
}
