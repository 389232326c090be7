use crate::core::message::{Message, Sender};
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Plain-text transcript of a chat, appended as messages are delivered.
#[derive(Debug, Default)]
pub struct TranscriptLog {
    file_path: Option<String>,
}

impl TranscriptLog {
    pub fn new(log_file: Option<String>) -> Result<Self, Box<dyn std::error::Error>> {
        if let Some(path) = &log_file {
            test_file_access(path)?;
        }
        Ok(TranscriptLog {
            file_path: log_file,
        })
    }

    pub fn log_message(&self, message: &Message) -> Result<(), Box<dyn std::error::Error>> {
        match message.sender {
            Sender::User => self.write_to_log(&format!("You: {}", message.text)),
            Sender::Bot => self.write_to_log(&message.text),
        }
    }

    /// Writes an out-of-band note such as the session location.
    pub fn log_note(&self, note: &str) -> Result<(), Box<dyn std::error::Error>> {
        self.write_to_log(&format!("## {note}"))
    }

    fn write_to_log(&self, content: &str) -> Result<(), Box<dyn std::error::Error>> {
        let Some(file_path) = &self.file_path else {
            return Ok(());
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(file_path)?;
        let mut writer = BufWriter::with_capacity(64 * 1024, file);

        for line in content.lines() {
            writeln!(writer, "{line}")?;
        }
        // Blank line between messages, as on screen.
        writeln!(writer)?;

        writer.flush()?;
        Ok(())
    }

    pub fn get_status_string(&self) -> String {
        match &self.file_path {
            None => "disabled".to_string(),
            Some(path) => format!(
                "active ({})",
                Path::new(path)
                    .file_name()
                    .unwrap_or_default()
                    .to_string_lossy()
            ),
        }
    }
}

fn test_file_access(path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn disabled_log_writes_nothing() {
        let log = TranscriptLog::new(None).unwrap();
        log.log_message(&Message::user("hello")).unwrap();
        assert_eq!(log.get_status_string(), "disabled");
    }

    #[test]
    fn messages_and_notes_are_appended() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chat.log");
        let log = TranscriptLog::new(Some(path.to_string_lossy().into_owned())).unwrap();

        log.log_message(&Message::user("why red?")).unwrap();
        log.log_message(&Message::bot("line one\nline two")).unwrap();
        log.log_note("Session: /?chat=k1").unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents,
            "You: why red?\n\nline one\nline two\n\n## Session: /?chat=k1\n\n"
        );
        assert_eq!(log.get_status_string(), "active (chat.log)");
    }

    #[test]
    fn unwritable_path_is_rejected_up_front() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("chat.log");
        assert!(TranscriptLog::new(Some(path.to_string_lossy().into_owned())).is_err());
    }
}
