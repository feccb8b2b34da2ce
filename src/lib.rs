//! # toolchat
//!
//! A terminal chat assistant that lets a language model call local tools.
//!
//! This library provides:
//! - A tool contract and a registry that validates and dispatches calls
//! - Plugin discovery from a built-in catalog or a directory of manifests
//! - A conversation loop that allows one round of tool use per turn
//! - An OpenAI/OpenRouter compatible chat-completions client
//!
//! ## Architecture
//!
//! Each turn:
//! 1. Append the user message to the transcript
//! 2. Call the model with the registered tool schemas
//! 3. Dispatch any requested tool calls, in order, and record the results
//! 4. Call the model again without tools for the final answer
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use toolchat::{agent::Chat, config::Config, llm::OpenAiClient, tools::CatalogSource};
//!
//! let config = Config::from_env()?;
//! let llm = Arc::new(OpenAiClient::new(&config.api_key, &config.base_url));
//! let mut chat = Chat::new(config.completion_options(), llm, &config.system_prompt);
//! chat.discover(&CatalogSource::builtin());
//! let answer = chat.send("what is 2+2?").await?;
//! ```

pub mod agent;
pub mod cli;
pub mod config;
pub mod conversation;
pub mod llm;
pub mod output;
pub mod persistence;
pub mod tools;

pub use config::Config;
