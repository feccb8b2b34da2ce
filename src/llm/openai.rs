//! OpenAI-compatible chat-completions client (OpenAI and OpenRouter).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    ChatMessage, ChatResponse, CompletionOptions, FunctionCall, LlmClient, ModelCallError,
    TokenUsage, ToolCall,
};

/// Client for `{base_url}/chat/completions`.
pub struct OpenAiClient {
    api_key: String,
    base_url: String,
    extra_headers: Vec<(String, String)>,
    client: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            extra_headers: Vec::new(),
            client: reqwest::Client::new(),
        }
    }

    /// Attach a header sent with every request (e.g. OpenRouter attribution).
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.push((name.into(), value.into()));
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [Value]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<TokenUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ResponseToolCall>>,
}

#[derive(Deserialize)]
struct ResponseToolCall {
    #[serde(default)]
    id: Option<String>,
    function: FunctionCall,
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn chat_completion(
        &self,
        options: &CompletionOptions,
        messages: &[ChatMessage],
        tools: Option<&[Value]>,
    ) -> Result<ChatResponse, ModelCallError> {
        let tools = tools.filter(|t| !t.is_empty());
        let body = CompletionRequest {
            model: &options.model,
            messages,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            tools,
            tool_choice: tools.map(|_| "auto"),
        };

        tracing::debug!(
            model = %options.model,
            messages = messages.len(),
            tools = tools.map_or(0, |t| t.len()),
            "Calling chat completions"
        );

        let mut request = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body);
        for (name, value) in &self.extra_headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelCallError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await?;
        let parsed: CompletionResponse =
            serde_json::from_str(&text).map_err(|e| ModelCallError::Decode(e.to_string()))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or(ModelCallError::EmptyChoices)?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| ToolCall {
                id: tc
                    .id
                    .filter(|id| !id.is_empty())
                    .unwrap_or_else(|| format!("call_{}", uuid::Uuid::new_v4().simple())),
                kind: "function".to_string(),
                function: tc.function,
            })
            .collect();

        Ok(ChatResponse {
            content: choice.message.content,
            tool_calls,
            finish_reason: choice.finish_reason,
            usage: parsed.usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_omits_tool_keys_without_tools() {
        let messages = vec![ChatMessage::user("hi")];
        let body = CompletionRequest {
            model: "gpt-4o-mini",
            messages: &messages,
            max_tokens: 100,
            temperature: 0.5,
            tools: None,
            tool_choice: None,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert!(value.get("tools").is_none());
        assert!(value.get("tool_choice").is_none());
        assert_eq!(value["messages"][0]["role"], "user");
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = OpenAiClient::new("key", "https://openrouter.ai/api/v1/");
        assert_eq!(
            client.endpoint(),
            "https://openrouter.ai/api/v1/chat/completions"
        );
    }

    #[test]
    fn response_tool_calls_decode() {
        let raw = json!({
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": { "name": "calculator", "arguments": "{\"expression\":\"2+2\"}" }
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        });
        let parsed: CompletionResponse = serde_json::from_value(raw).unwrap();
        let calls = parsed.choices[0].message.tool_calls.as_ref().unwrap();
        assert_eq!(calls[0].function.name, "calculator");
        assert!(parsed.usage.is_none());
    }
}
