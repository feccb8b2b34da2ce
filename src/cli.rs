//! Interactive command-line surface.
//!
//! A line of input is either one of the fixed commands or a chat message.
//! Rendering is kept in pure functions so it can be tested without a
//! terminal.

use std::path::PathBuf;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::agent::Chat;
use crate::config::Config;
use crate::tools::{ToolInfo, ToolRegistry};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Tools,
    ToolDetails,
    Clear,
    Stats,
    Save,
    Config,
    Reset,
    Quit,
    /// Anything else is sent to the model.
    Message(String),
    /// Blank line.
    Empty,
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        match trimmed.to_lowercase().as_str() {
            "" => Command::Empty,
            "help" => Command::Help,
            "tools" => Command::Tools,
            "tool-details" => Command::ToolDetails,
            "clear" => Command::Clear,
            "stats" => Command::Stats,
            "save" => Command::Save,
            "config" => Command::Config,
            "reset" => Command::Reset,
            "quit" | "exit" => Command::Quit,
            _ => Command::Message(trimmed.to_string()),
        }
    }
}

pub fn render_welcome() -> String {
    "toolchat\nType 'help' for commands, 'tools' to list tools, 'exit' to quit.".to_string()
}

pub fn render_help(tools: &ToolRegistry) -> String {
    let names = tools.list();
    let available = if names.is_empty() {
        "none".to_string()
    } else {
        names.join(", ")
    };
    format!(
        "Available Commands:\n\
         - help          Show this help message\n\
         - tools         List all available tools\n\
         - tool-details  Show detailed tool information\n\
         - clear         Clear conversation history\n\
         - stats         Show conversation statistics\n\
         - save          Save conversation to file\n\
         - config        Show current configuration\n\
         - reset         Reset to initial state\n\
         - exit          Quit\n\n\
         Available Tools: {}",
        available
    )
}

/// One row per tool: name, description, parameter counts.
pub fn render_tools_table(tools: &ToolRegistry) -> String {
    let infos = tools.infos();
    if infos.is_empty() {
        return "No tools registered".to_string();
    }

    let width = infos
        .iter()
        .map(|i| i.name.len())
        .max()
        .unwrap_or(0)
        .max("Tool Name".len());

    let mut out = format!("{:<width$}  {}\n", "Tool Name", "Description / Parameters", width = width);
    for info in &infos {
        out.push_str(&format!(
            "{:<width$}  {} ({} total, {} required)\n",
            info.name,
            info.description,
            info.parameters.len(),
            info.required_count(),
            width = width
        ));
    }
    out.trim_end().to_string()
}

pub fn render_tool_details(info: &ToolInfo) -> String {
    let mut out = format!(
        "Tool Details: {}\nDescription: {}\nParameters:",
        info.name, info.description
    );
    if info.parameters.is_empty() {
        out.push_str(" none");
    }
    for param in &info.parameters {
        let required = if param.is_required() { "required" } else { "optional" };
        out.push_str(&format!(
            "\n  - {} ({}, {}): {}",
            param.name(),
            param.param_type().as_str(),
            required,
            param.description()
        ));
        if let Some(choices) = param.choices() {
            out.push_str(&format!("\n    Options: {}", choices.join(", ")));
        }
    }
    out
}

pub fn render_all_tool_details(tools: &ToolRegistry) -> String {
    let infos = tools.infos();
    if infos.is_empty() {
        return "No tools available".to_string();
    }
    infos
        .iter()
        .map(render_tool_details)
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn render_stats(chat: &Chat) -> String {
    let stats = chat.tools().stats();
    let mut out = format!(
        "Conversation Statistics:\n\
         - Messages exchanged: {}\n\
         - Model: {}\n\
         - API: {}\n\
         - Tools available: {}\n\
         - Tool registrations: {}\n\
         - Tool discovery errors: {}\n\n\
         Tool Registry:\n\
         - Tool names: {}",
        chat.message_count(),
        chat.options().model,
        chat.provider(),
        stats.tool_count,
        stats.registrations,
        stats.error_count,
        stats.names.join(", ")
    );
    for err in &stats.error_messages {
        out.push_str(&format!("\n- Error: {}", err));
    }
    out
}

pub fn render_config(config: &Config) -> String {
    let timeout = config
        .turn_timeout
        .map(|d| format!("{}s", d.as_secs()))
        .unwrap_or_else(|| "none".to_string());
    let tools_dir = config
        .tools_dir
        .as_ref()
        .map(|d| d.display().to_string())
        .unwrap_or_else(|| "built-in catalog".to_string());
    format!(
        "Current Configuration:\n\
         - Model: {}\n\
         - API Provider: {}\n\
         - Base URL: {}\n\
         - Max Tokens: {}\n\
         - Temperature: {}\n\
         - System Prompt: {} characters\n\
         - Tools: {}\n\
         - Save Directory: {}\n\
         - Turn Timeout: {}",
        config.model,
        config.provider,
        config.base_url,
        config.max_tokens,
        config.temperature,
        config.system_prompt.chars().count(),
        tools_dir,
        config.save_dir.display(),
        timeout
    )
}

/// Read-eval-print loop over a [`Chat`].
pub struct Repl {
    chat: Chat,
    config: Config,
    save_dir: PathBuf,
    turn_timeout: Option<Duration>,
}

impl Repl {
    pub fn new(chat: Chat, config: Config) -> Self {
        let save_dir = config.save_dir.clone();
        let turn_timeout = config.turn_timeout;
        Self {
            chat,
            config,
            save_dir,
            turn_timeout,
        }
    }

    pub fn chat(&self) -> &Chat {
        &self.chat
    }

    /// Process lines until `quit`/`exit` or end of input.
    pub async fn run<R, W>(&mut self, input: R, output: &mut W) -> anyhow::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        write_block(output, &render_welcome()).await?;

        let mut lines = input.lines();
        loop {
            output.write_all(b"\nYou: ").await?;
            output.flush().await?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            if !self.handle(Command::parse(&line), output).await? {
                break;
            }
        }

        write_block(output, "Goodbye!").await?;
        Ok(())
    }

    /// Returns `false` when the loop should stop.
    async fn handle<W>(&mut self, command: Command, output: &mut W) -> anyhow::Result<bool>
    where
        W: AsyncWrite + Unpin,
    {
        let text = match command {
            Command::Empty => return Ok(true),
            Command::Quit => return Ok(false),
            Command::Help => render_help(self.chat.tools()),
            Command::Tools => render_tools_table(self.chat.tools()),
            Command::ToolDetails => render_all_tool_details(self.chat.tools()),
            Command::Stats => render_stats(&self.chat),
            Command::Config => render_config(&self.config),
            Command::Clear => {
                self.chat.clear();
                "Conversation history cleared!".to_string()
            }
            Command::Reset => match self.chat.reset() {
                Some(report) => format!(
                    "Reset to initial state! {} tool(s) loaded, {} error(s).",
                    report.tools_found,
                    report.errors.len()
                ),
                None => "Reset to initial state!".to_string(),
            },
            Command::Save => match self.chat.save(&self.save_dir).await {
                Ok(path) => format!("Conversation saved to {}", path.display()),
                Err(e) => {
                    tracing::error!("Error saving conversation: {}", e);
                    format!("Error saving conversation: {}", e)
                }
            },
            Command::Message(message) => {
                let outcome = match self.turn_timeout {
                    Some(limit) => self.chat.send_with_timeout(&message, limit).await,
                    None => self.chat.send(&message).await,
                };
                match outcome {
                    Ok(answer) => format!("Assistant: {}", answer),
                    Err(e) => format!("Sorry, I encountered an error: {}", e),
                }
            }
        };

        write_block(output, &text).await?;
        Ok(true)
    }
}

async fn write_block<W>(output: &mut W, text: &str) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    output.write_all(text.as_bytes()).await?;
    output.write_all(b"\n").await?;
    output.flush().await
}
