//! One-shot commands that print server data.

use std::error::Error;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Local};

use crate::api::{ChatApi, ChatListItem, LogUpload};
use crate::core::message::{flatten_history, Sender};
use crate::core::session::SessionKey;
use crate::core::sidebar::{fetch_list, sort_by_latest, ListQuery};

fn format_time(latest_time: Option<i64>) -> String {
    latest_time
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|utc| {
            utc.with_timezone(&Local)
                .format("%Y-%m-%d %H:%M")
                .to_string()
        })
        .unwrap_or_else(|| "-".to_string())
}

/// Table rows for a chat list, already in display order.
pub(crate) fn format_chat_rows(items: &[ChatListItem]) -> Vec<String> {
    let key_width = items
        .iter()
        .map(|item| item.unique_key.chars().count())
        .max()
        .unwrap_or(0);
    items
        .iter()
        .map(|item| {
            format!(
                "  {:<key_width$}  {:<16}  {}",
                item.unique_key,
                format_time(item.latest_time),
                item.title(),
            )
        })
        .collect()
}

fn print_chats(heading: &str, mut items: Vec<ChatListItem>) {
    if items.is_empty() {
        println!("No chats found.");
        return;
    }
    sort_by_latest(&mut items);
    println!("{heading}");
    for row in format_chat_rows(&items) {
        println!("{row}");
    }
}

pub async fn list_chats(api: &dyn ChatApi) -> Result<(), Box<dyn Error>> {
    let items = fetch_list(api, &ListQuery::All).await?;
    print_chats("💬 Chats (newest first):", items);
    Ok(())
}

pub async fn search_chats(api: &dyn ChatApi, keyword: Vec<String>) -> Result<(), Box<dyn Error>> {
    let query = ListQuery::for_term(&keyword.join(" "));
    let heading = match &query {
        ListQuery::All => "💬 Chats (newest first):".to_string(),
        ListQuery::Search(term) => format!("🔍 Results for \"{term}\":"),
    };
    let items = fetch_list(api, &query).await?;
    print_chats(&heading, items);
    Ok(())
}

pub async fn print_history(api: &dyn ChatApi, key: &SessionKey) -> Result<(), Box<dyn Error>> {
    let entries = api.get_chat_history(key).await?;
    let messages = flatten_history(entries);
    if messages.is_empty() {
        println!("No messages in chat {key}.");
        return Ok(());
    }
    for message in messages {
        match message.sender {
            Sender::User => println!("You: {}", message.text),
            Sender::Bot => println!("{}", message.text),
        }
        println!();
    }
    Ok(())
}

pub async fn print_log(api: &dyn ChatApi, key: &SessionKey) -> Result<(), Box<dyn Error>> {
    let value = api.get_specific_log(key).await?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

pub async fn upload_log(
    api: &dyn ChatApi,
    job_name: String,
    build_number: String,
    file: &Path,
) -> Result<(), Box<dyn Error>> {
    let log = fs::read_to_string(file)
        .map_err(|err| format!("Failed to read {}: {err}", file.display()))?;
    let upload = LogUpload {
        job_name,
        build_number,
        log,
    };
    let receipt = api.upload_log(&upload).await?;
    println!("✅ {}", receipt.message);
    println!("   Chat key: {}", receipt.key);
    Ok(())
}

pub async fn print_build_log(
    api: &dyn ChatApi,
    job_name: &str,
    build_number: &str,
) -> Result<(), Box<dyn Error>> {
    let log = api.get_log_by_build(job_name, build_number).await?;
    println!("{log}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::{chat_item, FakeApi};

    #[test]
    fn rows_align_keys_and_show_missing_times() {
        let items = vec![chat_item("abc", Some(0)), chat_item("a", None)];
        let rows = format_chat_rows(&items);
        assert_eq!(rows.len(), 2);
        assert!(rows[0].starts_with("  abc  "));
        assert!(rows[1].starts_with("  a    "));
        assert!(rows[1].contains("  -  "));
        assert!(rows[1].ends_with("job-a - 1"));
    }

    #[tokio::test]
    async fn blank_search_lists_every_chat() {
        let api = FakeApi::default();
        api.set_chats(vec![chat_item("one", Some(1))]);
        search_chats(&api, vec!["  ".to_string()]).await.unwrap();
        assert_eq!(api.calls(), vec!["get_chats".to_string()]);
    }

    #[tokio::test]
    async fn upload_reports_unreadable_files() {
        let api = FakeApi::default();
        let err = upload_log(
            &api,
            "job".into(),
            "7".into(),
            Path::new("/definitely/not/here.log"),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().starts_with("Failed to read"));
        assert!(api.calls().is_empty());
    }
}
