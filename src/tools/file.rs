//! File operation tool: read, write, list, info, exists.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Local};

use super::{str_arg, Arguments, ParamType, Tool, ToolParameter};

/// Local filesystem access relative to the process working directory.
pub struct FileOperations;

#[async_trait]
impl Tool for FileOperations {
    fn name(&self) -> &str {
        "file_operations"
    }

    fn description(&self) -> &str {
        "Perform file operations like reading, writing, listing files, and checking file information."
    }

    fn parameters(&self) -> Vec<ToolParameter> {
        vec![
            ToolParameter::required(
                "action",
                ParamType::String,
                "The action to perform: 'read', 'write', 'list', 'info', 'exists'",
            )
            .with_enum(["read", "write", "list", "info", "exists"]),
            ToolParameter::optional("filepath", ParamType::String, "Path to the file or directory"),
            ToolParameter::optional(
                "content",
                ParamType::String,
                "Content to write to the file (for write action)",
            ),
            ToolParameter::optional(
                "directory",
                ParamType::String,
                "Directory to list files from (for list action)",
            ),
        ]
    }

    async fn execute(&self, args: &Arguments) -> anyhow::Result<String> {
        let action = str_arg(args, "action").unwrap_or_default();
        let filepath = str_arg(args, "filepath").filter(|p| !p.is_empty());

        match action.as_str() {
            "read" => {
                let Some(path) = filepath else {
                    return Ok("Error: filepath parameter required for read action".to_string());
                };
                if !Path::new(&path).exists() {
                    return Ok(format!("Error: File '{}' does not exist", path));
                }
                let content = tokio::fs::read_to_string(&path).await?;
                Ok(format!("File content of '{}':\n{}", path, content))
            }
            "write" => {
                let (Some(path), Some(content)) = (filepath, str_arg(args, "content")) else {
                    return Ok(
                        "Error: filepath and content parameters required for write action"
                            .to_string(),
                    );
                };
                if let Some(parent) = Path::new(&path).parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
                tokio::fs::write(&path, content).await?;
                Ok(format!("Successfully wrote content to '{}'", path))
            }
            "list" => {
                let dir = str_arg(args, "directory")
                    .filter(|d| !d.is_empty())
                    .unwrap_or_else(|| ".".to_string());
                list_directory(&dir).await
            }
            "info" => {
                let Some(path) = filepath else {
                    return Ok("Error: filepath parameter required for info action".to_string());
                };
                if !Path::new(&path).exists() {
                    return Ok(format!("Error: File '{}' does not exist", path));
                }
                let meta = tokio::fs::metadata(&path).await?;
                let modified = meta
                    .modified()
                    .map(|t| DateTime::<Local>::from(t).format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|_| "unknown".to_string());
                Ok(format!(
                    "File Information for '{}':\n- Size: {}\n- Modified: {}\n- Type: {}",
                    path,
                    human_size(meta.len()),
                    modified,
                    if meta.is_dir() { "Directory" } else { "File" }
                ))
            }
            "exists" => {
                let Some(path) = filepath else {
                    return Ok("Error: filepath parameter required for exists action".to_string());
                };
                let exists = Path::new(&path).exists();
                Ok(format!(
                    "File '{}' {}",
                    path,
                    if exists { "exists" } else { "does not exist" }
                ))
            }
            other => Ok(format!("Error: unknown action '{}'", other)),
        }
    }
}

async fn list_directory(dir: &str) -> anyhow::Result<String> {
    let path = Path::new(dir);
    if !path.exists() {
        return Ok(format!("Error: Directory '{}' does not exist", dir));
    }
    if !path.is_dir() {
        return Ok(format!("Error: '{}' is not a directory", dir));
    }

    let mut entries = Vec::new();
    let mut reader = tokio::fs::read_dir(path).await?;
    while let Some(entry) = reader.next_entry().await? {
        let name = entry.file_name().to_string_lossy().to_string();
        let file_type = entry.file_type().await?;
        if file_type.is_dir() {
            entries.push(format!("{}/", name));
        } else {
            entries.push(name);
        }
    }
    entries.sort();

    if entries.is_empty() {
        return Ok(format!("Directory '{}' is empty", dir));
    }
    Ok(format!("Contents of '{}':\n{}", dir, entries.join("\n")))
}

fn human_size(size: u64) -> String {
    if size < 1024 {
        format!("{} bytes", size)
    } else if size < 1024 * 1024 {
        format!("{:.1} KB", size as f64 / 1024.0)
    } else {
        format!("{:.1} MB", size as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(pairs: &[(&str, &str)]) -> Arguments {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), json!(v)))
            .collect()
    }

    #[tokio::test]
    async fn write_then_read_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/notes.txt");
        let path = path.to_string_lossy().to_string();

        let out = FileOperations
            .execute(&args(&[("action", "write"), ("filepath", path.as_str()), ("content", "hello")]))
            .await
            .unwrap();
        assert!(out.starts_with("Successfully wrote"));

        let out = FileOperations
            .execute(&args(&[("action", "read"), ("filepath", path.as_str())]))
            .await
            .unwrap();
        assert!(out.ends_with(":\nhello"));

        let out = FileOperations
            .execute(&args(&[("action", "exists"), ("filepath", path.as_str())]))
            .await
            .unwrap();
        assert!(out.ends_with("exists"));
        assert!(!out.ends_with("does not exist"));
    }

    #[tokio::test]
    async fn list_marks_directories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("a.txt"), "x").unwrap();
        let dir_str = dir.path().to_string_lossy().to_string();

        let out = FileOperations
            .execute(&args(&[("action", "list"), ("directory", dir_str.as_str())]))
            .await
            .unwrap();
        assert!(out.contains("a.txt"));
        assert!(out.contains("sub/"));
    }

    #[tokio::test]
    async fn semantic_errors_are_text() {
        let out = FileOperations
            .execute(&args(&[("action", "read")]))
            .await
            .unwrap();
        assert_eq!(out, "Error: filepath parameter required for read action");

        let out = FileOperations
            .execute(&args(&[("action", "read"), ("filepath", "/definitely/not/here")]))
            .await
            .unwrap();
        assert_eq!(out, "Error: File '/definitely/not/here' does not exist");

        let out = FileOperations
            .execute(&args(&[("action", "shred")]))
            .await
            .unwrap();
        assert_eq!(out, "Error: unknown action 'shred'");
    }

    #[test]
    fn sizes_are_humanized() {
        assert_eq!(human_size(10), "10 bytes");
        assert_eq!(human_size(2048), "2.0 KB");
        assert_eq!(human_size(3 * 1024 * 1024), "3.0 MB");
    }
}
