//! Progress reporting for the operator.
//!
//! Components that want to show tool activity receive an [`OutputSink`]
//! instead of writing to the terminal directly.

use std::sync::Mutex;

use serde_json::Value;

/// Severity of an operator notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

pub trait OutputSink: Send + Sync {
    /// A tool is about to run.
    fn tool_call(&self, name: &str, arguments: &Value);

    /// A tool produced its (possibly error) result text.
    fn tool_result(&self, name: &str, content: &str, is_error: bool);

    fn notice(&self, level: NoticeLevel, message: &str);
}

/// Writes to stdout.
pub struct ConsoleSink {
    max_result_chars: usize,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self {
            max_result_chars: 500,
        }
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputSink for ConsoleSink {
    fn tool_call(&self, name: &str, arguments: &Value) {
        println!("[tool] {} {}", name, arguments);
    }

    fn tool_result(&self, name: &str, content: &str, is_error: bool) {
        let label = if is_error { "failed" } else { "result" };
        println!(
            "[tool] {} {}:\n{}",
            name,
            label,
            truncate(content, self.max_result_chars)
        );
    }

    fn notice(&self, level: NoticeLevel, message: &str) {
        let prefix = match level {
            NoticeLevel::Info => "[info]",
            NoticeLevel::Success => "[ok]",
            NoticeLevel::Warning => "[warn]",
            NoticeLevel::Error => "[error]",
        };
        println!("{} {}", prefix, message);
    }
}

/// Discards everything.
pub struct NullSink;

impl OutputSink for NullSink {
    fn tool_call(&self, _name: &str, _arguments: &Value) {}

    fn tool_result(&self, _name: &str, _content: &str, _is_error: bool) {}

    fn notice(&self, _level: NoticeLevel, _message: &str) {}
}

/// Recorded sink event.
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    ToolCall { name: String, arguments: Value },
    ToolResult { name: String, content: String, is_error: bool },
    Notice { level: NoticeLevel, message: String },
}

/// Keeps events in memory, for tests and embedding.
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<SinkEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    fn push(&self, event: SinkEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl OutputSink for MemorySink {
    fn tool_call(&self, name: &str, arguments: &Value) {
        self.push(SinkEvent::ToolCall {
            name: name.to_string(),
            arguments: arguments.clone(),
        });
    }

    fn tool_result(&self, name: &str, content: &str, is_error: bool) {
        self.push(SinkEvent::ToolResult {
            name: name.to_string(),
            content: content.to_string(),
            is_error,
        });
    }

    fn notice(&self, level: NoticeLevel, message: &str) {
        self.push(SinkEvent::Notice {
            level,
            message: message.to_string(),
        });
    }
}

/// Truncate on a char boundary, marking the cut.
pub fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}... [truncated]", &s[..idx]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("héllo wörld", 4), "héll... [truncated]");
    }

    #[test]
    fn memory_sink_records_in_order() {
        let sink = MemorySink::new();
        sink.tool_call("calculator", &json!({"expression": "1+1"}));
        sink.tool_result("calculator", "Result: 2", false);
        sink.notice(NoticeLevel::Warning, "careful");

        let events = sink.events();
        assert_eq!(events.len(), 3);
        assert!(matches!(&events[0], SinkEvent::ToolCall { name, .. } if name == "calculator"));
        assert_eq!(
            events[2],
            SinkEvent::Notice {
                level: NoticeLevel::Warning,
                message: "careful".to_string()
            }
        );
    }
}
