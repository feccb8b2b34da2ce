//! Core conversation loop implementation.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::conversation::Conversation;
use crate::llm::{ChatMessage, ChatResponse, CompletionOptions, LlmClient, ToolCall};
use crate::output::{NoticeLevel, NullSink, OutputSink};
use crate::persistence::{self, PersistError, SaveMetadata, SavedConversation};
use crate::tools::{
    parse_arguments, DiscoveryReport, InvocationResult, PluginSource, Tool, ToolRegistry,
};

use super::prompt::build_system_prompt;
use super::ChatError;

/// Answer returned when the model produced no text.
pub const NO_RESPONSE_PLACEHOLDER: &str = "I don't have a response for that.";

/// Where a turn currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    AwaitingUserInput,
    ModelCall1,
    ToolDispatch,
    ModelCall2,
    Done,
}

/// A single conversation with a model and its tools.
///
/// Turns take `&mut self`, so registration and discovery can never overlap
/// with a turn in flight.
pub struct Chat {
    options: CompletionOptions,
    llm: Arc<dyn LlmClient>,
    tools: ToolRegistry,
    conversation: Conversation,
    base_prompt: String,
    source: Option<Arc<dyn PluginSource>>,
    sink: Arc<dyn OutputSink>,
    provider: String,
    message_count: usize,
    state: TurnState,
}

impl Chat {
    /// Create a chat with an empty registry and a fresh transcript.
    pub fn new(
        options: CompletionOptions,
        llm: Arc<dyn LlmClient>,
        system_prompt: impl Into<String>,
    ) -> Self {
        let base_prompt = system_prompt.into();
        let tools = ToolRegistry::new();
        let conversation = Conversation::new(build_system_prompt(&base_prompt, &tools));

        Self {
            options,
            llm,
            tools,
            conversation,
            base_prompt,
            source: None,
            sink: Arc::new(NullSink),
            provider: "OpenAI".to_string(),
            message_count: 0,
            state: TurnState::AwaitingUserInput,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn OutputSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Plugin source used by [`Chat::reset`] to re-populate the registry.
    pub fn with_source(mut self, source: Arc<dyn PluginSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Provider label recorded in stats and saved conversations.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    /// Register one tool.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> bool {
        let stored = self.tools.register(tool);
        self.refresh_system_prompt();
        stored
    }

    /// Register every tool found in `source`.
    pub fn discover(&mut self, source: &dyn PluginSource) -> DiscoveryReport {
        let report = self.tools.discover(source);
        for err in &report.errors {
            self.sink.notice(NoticeLevel::Warning, err);
        }
        self.refresh_system_prompt();
        report
    }

    /// Discover from the configured source, if any.
    pub fn discover_configured(&mut self) -> Option<DiscoveryReport> {
        let source = self.source.clone()?;
        Some(self.discover(source.as_ref()))
    }

    /// Run one user turn and return the assistant's answer.
    pub async fn send(&mut self, input: &str) -> Result<String, ChatError> {
        self.message_count += 1;
        self.enter(TurnState::AwaitingUserInput);
        self.conversation.append(ChatMessage::user(input));

        let schemas = self.tools.model_tool_schemas();
        let offered = (!schemas.is_empty()).then_some(schemas.as_slice());

        self.enter(TurnState::ModelCall1);
        let response = self.call_model(offered).await?;

        if !response.has_tool_calls() {
            return Ok(self.finish(response.content));
        }

        self.enter(TurnState::ToolDispatch);
        tracing::debug!("Model requested {} tool call(s)", response.tool_calls.len());
        for call in response.tool_calls {
            let result = self.run_tool_call(&call).await;
            let content = result.content();
            let name = call.function.name.clone();
            let id = call.id.clone();
            self.conversation
                .append(ChatMessage::assistant_tool_calls(vec![call]));
            self.conversation
                .append(ChatMessage::tool_result(id, name, content));
        }

        // Single round of tool use: the follow-up call offers no tools.
        self.enter(TurnState::ModelCall2);
        let response = self.call_model(None).await?;
        Ok(self.finish(response.content))
    }

    /// Like [`Chat::send`] but abandons the turn after `limit`.
    ///
    /// Completed tool exchanges stay in the transcript; an exchange still in
    /// flight is dropped whole.
    pub async fn send_with_timeout(
        &mut self,
        input: &str,
        limit: Duration,
    ) -> Result<String, ChatError> {
        let outcome = tokio::time::timeout(limit, self.send(input)).await;
        match outcome {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!("Turn abandoned after {:?}", limit);
                self.state = TurnState::AwaitingUserInput;
                Err(ChatError::TimedOut(limit))
            }
        }
    }

    /// Start a fresh transcript and reset the message counter.
    pub fn clear(&mut self) {
        self.conversation
            .reset(build_system_prompt(&self.base_prompt, &self.tools));
        self.message_count = 0;
        self.state = TurnState::AwaitingUserInput;
        tracing::info!("Conversation history cleared");
    }

    /// Clear, then rebuild the registry from the configured source.
    pub fn reset(&mut self) -> Option<DiscoveryReport> {
        self.tools = ToolRegistry::new();
        let report = self.discover_configured();
        self.clear();
        report
    }

    /// Save the transcript into `dir`.
    pub async fn save(&self, dir: &Path) -> Result<PathBuf, PersistError> {
        let doc = SavedConversation {
            metadata: SaveMetadata {
                timestamp: chrono::Utc::now().timestamp(),
                message_count: self.message_count,
                model: self.options.model.clone(),
                provider: self.provider.clone(),
            },
            conversation: self.conversation.snapshot(),
        };
        persistence::save_conversation(dir, &doc).await
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn options(&self) -> &CompletionOptions {
        &self.options
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// User messages sent since the last clear.
    pub fn message_count(&self) -> usize {
        self.message_count
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn base_prompt(&self) -> &str {
        &self.base_prompt
    }

    async fn call_model(
        &self,
        tools: Option<&[Value]>,
    ) -> Result<ChatResponse, ChatError> {
        self.llm
            .chat_completion(&self.options, self.conversation.snapshot(), tools)
            .await
            .map_err(|e| {
                tracing::error!("Model call failed: {}", e);
                ChatError::Model(e)
            })
    }

    async fn run_tool_call(&self, call: &ToolCall) -> InvocationResult {
        let name = call.function.name.as_str();
        match parse_arguments(&call.function.arguments) {
            Ok(arguments) => {
                self.sink
                    .tool_call(name, &Value::Object(arguments.clone()));
                let result = self.tools.dispatch(name, arguments).await;
                self.sink
                    .tool_result(name, &result.content(), result.is_error());
                result
            }
            Err(e) => {
                tracing::warn!("Unparseable arguments for tool '{}': {}", name, e);
                self.sink.tool_call(
                    name,
                    &Value::String(call.function.arguments.clone()),
                );
                let result = InvocationResult {
                    tool: name.to_string(),
                    arguments: Default::default(),
                    outcome: Err(e),
                };
                self.sink.tool_result(name, &result.content(), true);
                result
            }
        }
    }

    fn finish(&mut self, content: Option<String>) -> String {
        let text = content.unwrap_or_default();
        self.conversation.append(ChatMessage::assistant(text.clone()));
        self.enter(TurnState::Done);
        self.state = TurnState::AwaitingUserInput;

        if text.trim().is_empty() {
            NO_RESPONSE_PLACEHOLDER.to_string()
        } else {
            text
        }
    }

    fn enter(&mut self, state: TurnState) {
        tracing::debug!("Turn {}: {:?}", self.message_count, state);
        self.state = state;
    }

    /// Keep the tool list in the system prompt current until the first turn.
    fn refresh_system_prompt(&mut self) {
        if self.conversation.len() == 1 {
            self.conversation
                .reset(build_system_prompt(&self.base_prompt, &self.tools));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ModelCallError, Role};
    use crate::output::{MemorySink, SinkEvent};
    use crate::tools::{Calculator, CatalogSource, PluginUnit, StaticSource};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Recorded model call: transcript length and offered tool names.
    #[derive(Debug, Clone)]
    struct RecordedCall {
        messages: Vec<ChatMessage>,
        tools: Option<Vec<String>>,
    }

    #[derive(Default)]
    struct ScriptedLlm {
        replies: Mutex<VecDeque<Result<ChatResponse, ModelCallError>>>,
        calls: Mutex<Vec<RecordedCall>>,
    }

    impl ScriptedLlm {
        fn new(replies: Vec<Result<ChatResponse, ModelCallError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<RecordedCall> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn chat_completion(
            &self,
            _options: &CompletionOptions,
            messages: &[ChatMessage],
            tools: Option<&[Value]>,
        ) -> Result<ChatResponse, ModelCallError> {
            let names = tools.map(|schemas| {
                schemas
                    .iter()
                    .map(|s| s["function"]["name"].as_str().unwrap_or_default().to_string())
                    .collect()
            });
            self.calls.lock().unwrap().push(RecordedCall {
                messages: messages.to_vec(),
                tools: names,
            });
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(ChatResponse::text("script exhausted")))
        }
    }

    struct SlowLlm;

    #[async_trait]
    impl LlmClient for SlowLlm {
        async fn chat_completion(
            &self,
            _options: &CompletionOptions,
            _messages: &[ChatMessage],
            _tools: Option<&[Value]>,
        ) -> Result<ChatResponse, ModelCallError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(ChatResponse::text("too late"))
        }
    }

    fn options() -> CompletionOptions {
        CompletionOptions {
            model: "test-model".to_string(),
            max_tokens: 100,
            temperature: 0.0,
        }
    }

    fn chat_with(llm: Arc<dyn LlmClient>) -> Chat {
        let mut chat = Chat::new(options(), llm, "You are a test assistant.");
        chat.register(Arc::new(Calculator));
        chat
    }

    fn calc_call(id: &str, expression: &str) -> ToolCall {
        ToolCall::new(
            id,
            "calculator",
            serde_json::json!({ "expression": expression }).to_string(),
        )
    }

    #[tokio::test]
    async fn calculator_round_trip_answers_with_result() {
        let llm = ScriptedLlm::new(vec![
            Ok(ChatResponse::with_tool_calls(vec![calc_call("call_1", "2+2")])),
            Ok(ChatResponse::text("2 + 2 = 4")),
        ]);
        let sink = Arc::new(MemorySink::new());
        let mut chat = chat_with(llm.clone()).with_sink(sink.clone());

        let answer = chat.send("what is 2+2 using calculator").await.unwrap();
        assert!(answer.contains('4'));

        let calls = llm.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].tools, Some(vec!["calculator".to_string()]));
        assert_eq!(calls[1].tools, None);

        let messages = chat.conversation().snapshot();
        let roles: Vec<Role> = messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::Tool, Role::Assistant]
        );
        assert_eq!(messages[3].content.as_deref(), Some("Result: 4"));
        assert_eq!(messages[3].tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(messages[2].tool_calls.as_ref().unwrap().len(), 1);

        assert!(sink.events().contains(&SinkEvent::ToolResult {
            name: "calculator".to_string(),
            content: "Result: 4".to_string(),
            is_error: false,
        }));
        assert_eq!(chat.state(), TurnState::AwaitingUserInput);
    }

    #[tokio::test]
    async fn unknown_tool_is_reported_to_the_model() {
        let llm = ScriptedLlm::new(vec![
            Ok(ChatResponse::with_tool_calls(vec![ToolCall::new(
                "call_t",
                "teleport",
                "{}",
            )])),
            Ok(ChatResponse::text("Sorry, I cannot teleport.")),
        ]);
        let mut chat = chat_with(llm.clone());

        let answer = chat.send("beam me up").await.unwrap();
        assert_eq!(answer, "Sorry, I cannot teleport.");

        let tool_msg = chat
            .conversation()
            .snapshot()
            .iter()
            .find(|m| m.role == Role::Tool)
            .unwrap();
        let content = tool_msg.content.as_deref().unwrap();
        assert!(content.starts_with("Error: Tool 'teleport' not found"));
        assert!(content.contains("calculator"));

        // The failed dispatch is visible to the second model call.
        let second = &llm.calls()[1];
        assert!(second.messages.iter().any(|m| m.role == Role::Tool));
    }

    #[tokio::test]
    async fn tool_results_follow_request_order() {
        let llm = ScriptedLlm::new(vec![
            Ok(ChatResponse::with_tool_calls(vec![
                calc_call("c1", "1+1"),
                calc_call("c2", "2*3"),
                calc_call("c3", "10/4"),
            ])),
            Ok(ChatResponse::text("done")),
        ]);
        let mut chat = chat_with(llm);

        chat.send("three sums").await.unwrap();

        let tool_messages: Vec<(String, String)> = chat
            .conversation()
            .snapshot()
            .iter()
            .filter(|m| m.role == Role::Tool)
            .map(|m| {
                (
                    m.tool_call_id.clone().unwrap(),
                    m.content.clone().unwrap(),
                )
            })
            .collect();
        assert_eq!(
            tool_messages,
            vec![
                ("c1".to_string(), "Result: 2".to_string()),
                ("c2".to_string(), "Result: 6".to_string()),
                ("c3".to_string(), "Result: 2.5".to_string()),
            ]
        );

        // Each assistant call message is immediately answered.
        let messages = chat.conversation().snapshot();
        for (i, m) in messages.iter().enumerate() {
            if let Some(calls) = &m.tool_calls {
                assert_eq!(calls.len(), 1);
                assert_eq!(messages[i + 1].tool_call_id.as_ref(), Some(&calls[0].id));
            }
        }
    }

    #[tokio::test]
    async fn transcript_only_grows_until_clear() {
        let llm = ScriptedLlm::new(vec![
            Ok(ChatResponse::text("hello")),
            Ok(ChatResponse::with_tool_calls(vec![calc_call("c1", "3*3")])),
            Ok(ChatResponse::text("9")),
            Ok(ChatResponse::text("bye")),
        ]);
        let mut chat = chat_with(llm);

        let mut last = chat.conversation().len();
        for input in ["hi", "3*3?", "thanks"] {
            chat.send(input).await.unwrap();
            let now = chat.conversation().len();
            assert!(now > last);
            last = now;
        }
        assert_eq!(chat.message_count(), 3);

        chat.clear();
        assert_eq!(chat.conversation().len(), 1);
        assert_eq!(chat.message_count(), 0);
    }

    #[tokio::test]
    async fn second_model_failure_keeps_tool_exchange() {
        let llm = ScriptedLlm::new(vec![
            Ok(ChatResponse::with_tool_calls(vec![calc_call("c1", "5-1")])),
            Err(ModelCallError::Status {
                status: 502,
                body: "bad gateway".to_string(),
            }),
            Ok(ChatResponse::text("recovered")),
        ]);
        let mut chat = chat_with(llm.clone());

        let err = tokio_test::assert_err!(chat.send("5-1").await);
        assert!(matches!(
            err,
            ChatError::Model(ModelCallError::Status { status: 502, .. })
        ));
        assert_eq!(chat.conversation().len(), 4);
        assert_eq!(
            chat.conversation().last().unwrap().content.as_deref(),
            Some("Result: 4")
        );

        // Next turn proceeds with full context.
        let answer = chat.send("and now?").await.unwrap();
        assert_eq!(answer, "recovered");
        assert_eq!(llm.calls()[2].messages.len(), 5);
    }

    #[tokio::test]
    async fn empty_registry_offers_no_tools() {
        let llm = ScriptedLlm::new(vec![Ok(ChatResponse::text("plain"))]);
        let mut chat = Chat::new(options(), llm.clone(), "sys");

        let answer = tokio_test::assert_ok!(chat.send("hi").await);
        assert_eq!(answer, "plain");
        assert_eq!(llm.calls()[0].tools, None);
    }

    #[tokio::test]
    async fn empty_answer_uses_placeholder() {
        let llm = ScriptedLlm::new(vec![Ok(ChatResponse::default())]);
        let mut chat = chat_with(llm);

        let answer = chat.send("say nothing").await.unwrap();
        assert_eq!(answer, NO_RESPONSE_PLACEHOLDER);
        assert_eq!(chat.conversation().last().unwrap().role, Role::Assistant);
    }

    #[tokio::test]
    async fn malformed_arguments_become_error_result() {
        let llm = ScriptedLlm::new(vec![
            Ok(ChatResponse::with_tool_calls(vec![ToolCall::new(
                "c1",
                "calculator",
                "{not json",
            )])),
            Ok(ChatResponse::text("I sent bad arguments.")),
        ]);
        let mut chat = chat_with(llm);

        let answer = chat.send("break it").await.unwrap();
        assert_eq!(answer, "I sent bad arguments.");
        let tool_msg = &chat.conversation().snapshot()[3];
        assert_eq!(tool_msg.role, Role::Tool);
        assert!(tool_msg
            .content
            .as_deref()
            .unwrap()
            .starts_with("Error: Invalid tool arguments"));
    }

    #[tokio::test]
    async fn missing_required_argument_is_reported() {
        let llm = ScriptedLlm::new(vec![
            Ok(ChatResponse::with_tool_calls(vec![ToolCall::new(
                "c1",
                "calculator",
                "{}",
            )])),
            Ok(ChatResponse::text("oops")),
        ]);
        let mut chat = chat_with(llm);

        chat.send("calc").await.unwrap();
        assert_eq!(
            chat.conversation().snapshot()[3].content.as_deref(),
            Some("Error: Missing required parameters: expression")
        );
    }

    #[tokio::test]
    async fn timeout_abandons_turn_without_corrupting_transcript() {
        let mut chat = Chat::new(options(), Arc::new(SlowLlm), "sys");

        let err = chat
            .send_with_timeout("hello?", Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::TimedOut(_)));

        let messages = chat.conversation().snapshot();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(chat.state(), TurnState::AwaitingUserInput);
    }

    #[tokio::test]
    async fn reset_rebuilds_registry_from_source() {
        let llm = ScriptedLlm::new(vec![Ok(ChatResponse::text("hi"))]);
        let source = Arc::new(CatalogSource::builtin());
        let mut chat = Chat::new(options(), llm, "sys").with_source(source);

        let report = chat.discover_configured().unwrap();
        assert_eq!(report.tools_found, 7);
        chat.register(Arc::new(Calculator));
        chat.send("hi").await.unwrap();

        let report = chat.reset().unwrap();
        assert_eq!(report.tools_found, 7);
        assert_eq!(chat.tools().stats().registrations, 7);
        assert_eq!(chat.conversation().len(), 1);
        assert!(chat
            .conversation()
            .system_prompt()
            .contains("- **calculator**"));
    }

    #[tokio::test]
    async fn discovery_errors_reach_the_sink() {
        let llm = ScriptedLlm::new(vec![]);
        let sink = Arc::new(MemorySink::new());
        let mut chat = Chat::new(options(), llm, "sys").with_sink(sink.clone());

        let source = StaticSource::new(
            "test",
            vec![PluginUnit::loadable("broken", || anyhow::bail!("boom"))],
        );
        let report = chat.discover(&source);
        assert_eq!(report.errors.len(), 1);
        assert!(matches!(
            &sink.events()[0],
            SinkEvent::Notice { level: NoticeLevel::Warning, message } if message.contains("boom")
        ));
    }

    #[tokio::test]
    async fn save_writes_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let llm = ScriptedLlm::new(vec![Ok(ChatResponse::text("hey"))]);
        let mut chat = chat_with(llm).with_provider("OpenRouter");
        chat.send("hi").await.unwrap();

        let path = chat.save(dir.path()).await.unwrap();
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("conversation_1_"));

        let doc: Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(doc["metadata"]["model"], "test-model");
        assert_eq!(doc["metadata"]["provider"], "OpenRouter");
        assert_eq!(doc["conversation"].as_array().unwrap().len(), 3);
    }
}
