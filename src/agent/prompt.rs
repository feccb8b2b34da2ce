//! System prompt templates for the assistant.

use crate::tools::ToolRegistry;

/// Built-in prompt used when no override is configured.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant with access to tools and real-time data capabilities.

## Your Capabilities

- Use tools automatically when needed to provide accurate, up-to-date information
- Perform calculations when mathematical operations are requested
- Look up weather, news and stock data when asked for them
- Search the web for current information not in your training data
- Read, write and inspect files when the user asks you to

## Guidelines

1. **Prefer tools for facts** - Don't guess at real-time data. Call the matching tool.

2. **Report tool errors honestly** - If a tool fails, explain what went wrong and what the user could try instead.

3. **Be clear** - Provide well-formatted responses with the relevant details.";

/// Append the registered tools to the base prompt.
///
/// With an empty registry the base prompt is returned unchanged.
pub fn build_system_prompt(base: &str, tools: &ToolRegistry) -> String {
    if tools.is_empty() {
        return base.to_string();
    }

    let tool_descriptions = tools
        .infos()
        .iter()
        .map(|t| format!("- **{}**: {}", t.name, t.description))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "{base}\n\n## Available Tools\n\n{tool_descriptions}",
        base = base.trim_end(),
        tool_descriptions = tool_descriptions
    )
}
