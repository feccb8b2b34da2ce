//! Saving conversations to disk.
//!
//! Files are write-only from the application's point of view; nothing reads
//! them back.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::llm::ChatMessage;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("Failed to write conversation file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize conversation: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SaveMetadata {
    /// Unix seconds at save time.
    pub timestamp: i64,
    pub message_count: usize,
    pub model: String,
    pub provider: String,
}

/// On-disk document.
#[derive(Debug, Serialize)]
pub struct SavedConversation<'a> {
    pub metadata: SaveMetadata,
    pub conversation: &'a [ChatMessage],
}

impl SavedConversation<'_> {
    pub fn file_name(&self) -> String {
        format!(
            "conversation_{}_{}.json",
            self.metadata.message_count, self.metadata.timestamp
        )
    }
}

/// Write `doc` into `dir` and return the final path.
///
/// The document is written to a temporary file in the same directory and
/// then renamed, so a crash never leaves a half-written conversation behind.
pub async fn save_conversation(
    dir: &Path,
    doc: &SavedConversation<'_>,
) -> Result<PathBuf, PersistError> {
    let contents = serde_json::to_string_pretty(doc)?;

    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(doc.file_name());
    let tmp = dir.join(format!(".{}.tmp", doc.file_name()));

    if let Err(e) = tokio::fs::write(&tmp, contents).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    if let Err(e) = tokio::fs::rename(&tmp, &path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }

    tracing::info!("Saved conversation to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ChatMessage;
    use serde_json::Value;

    fn metadata() -> SaveMetadata {
        SaveMetadata {
            timestamp: 1_700_000_000,
            message_count: 2,
            model: "gpt-4o-mini".to_string(),
            provider: "OpenAI".to_string(),
        }
    }

    #[tokio::test]
    async fn writes_pretty_document_with_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let messages = vec![
            ChatMessage::system("sys"),
            ChatMessage::user("hi"),
            ChatMessage::assistant("hello"),
        ];
        let doc = SavedConversation {
            metadata: metadata(),
            conversation: &messages,
        };

        let path = save_conversation(dir.path(), &doc).await.unwrap();
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "conversation_2_1700000000.json"
        );

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\n  \"metadata\""));
        let value: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["metadata"]["provider"], "OpenAI");
        assert_eq!(value["metadata"]["message_count"], 2);
        assert_eq!(value["conversation"].as_array().unwrap().len(), 3);
        assert_eq!(value["conversation"][1]["role"], "user");
    }

    #[tokio::test]
    async fn leaves_no_temp_files_and_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("saves").join("today");
        let messages = vec![ChatMessage::system("sys")];
        let doc = SavedConversation {
            metadata: metadata(),
            conversation: &messages,
        };

        tokio_test::assert_ok!(save_conversation(&nested, &doc).await);

        let names: Vec<String> = std::fs::read_dir(&nested)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["conversation_2_1700000000.json".to_string()]);
    }
}
