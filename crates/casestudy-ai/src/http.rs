//! HTTP clients for the Anthropic Messages and OpenAI Chat Completions APIs.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use casestudy_core::{ChatMessage, Role};
use futures::stream::{self, BoxStream};
use futures::{StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::model::{GenerateRequest, LanguageModel, TextStream};
use crate::sse::{SseDecoder, SseEvent};
use crate::AiError;

const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const OPENAI_BASE_URL: &str = "https://api.openai.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Anthropic,
    OpenAi,
}

impl Provider {
    /// Choose the provider by model-name prefix.
    pub fn for_model(model: &str) -> Result<Self, AiError> {
        if model.starts_with("claude") {
            return Ok(Self::Anthropic);
        }
        const OPENAI_PREFIXES: [&str; 5] = ["gpt", "o1", "o3", "o4", "chatgpt"];
        if OPENAI_PREFIXES.iter().any(|p| model.starts_with(p)) {
            return Ok(Self::OpenAi);
        }
        Err(AiError::UnknownModel(model.to_string()))
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::Anthropic => ANTHROPIC_BASE_URL,
            Self::OpenAi => OPENAI_BASE_URL,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Anthropic => "Anthropic",
            Self::OpenAi => "OpenAI",
        })
    }
}

// ── Wire formats ──

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicBlock>,
}

#[derive(Deserialize)]
struct AnthropicBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

/// Chat Completions body. `max_completion_tokens` is accepted by every current
/// chat model and is the only limit the o-series reasoning models take.
#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    max_completion_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

impl<'a> OpenAiRequest<'a> {
    fn new(model: &'a str, request: &'a GenerateRequest, stream: bool) -> Self {
        // Reasoning models only run at their default temperature.
        let temperature = if is_reasoning_model(model) {
            None
        } else {
            request.temperature
        };
        Self {
            model,
            messages: wire_messages(&request.messages),
            max_completion_tokens: request.max_tokens,
            temperature,
            response_format: request.json.then_some(ResponseFormat {
                kind: "json_object",
            }),
            stream,
        }
    }
}

fn is_reasoning_model(model: &str) -> bool {
    ["o1", "o3", "o4"].iter().any(|p| model.starts_with(p))
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Deserialize)]
struct OpenAiMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Anthropic takes system text as a top-level field, not as a turn.
fn split_system(messages: &[ChatMessage]) -> (Option<String>, Vec<WireMessage<'_>>) {
    let system: Vec<&str> = messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| m.content.as_str())
        .collect();
    let turns = messages
        .iter()
        .filter(|m| m.role != Role::System)
        .map(|m| WireMessage {
            role: m.role.as_str(),
            content: &m.content,
        })
        .collect();
    let system = (!system.is_empty()).then(|| system.join("\n\n"));
    (system, turns)
}

fn wire_messages(messages: &[ChatMessage]) -> Vec<WireMessage<'_>> {
    messages
        .iter()
        .map(|m| WireMessage {
            role: m.role.as_str(),
            content: &m.content,
        })
        .collect()
}

/// What one decoded stream event contributes.
#[derive(Debug, PartialEq)]
enum StreamEvent {
    Text(String),
    Done,
    Skip,
}

fn anthropic_event(event: &SseEvent) -> Result<StreamEvent, AiError> {
    let value: Value = serde_json::from_str(&event.data)?;
    match value["type"].as_str() {
        Some("content_block_delta") if value["delta"]["type"] == "text_delta" => Ok(
            StreamEvent::Text(value["delta"]["text"].as_str().unwrap_or_default().to_string()),
        ),
        Some("message_stop") => Ok(StreamEvent::Done),
        Some("error") => Err(AiError::Provider(
            value["error"]["message"]
                .as_str()
                .unwrap_or("unknown streaming error")
                .to_string(),
        )),
        _ => Ok(StreamEvent::Skip),
    }
}

fn openai_event(event: &SseEvent) -> Result<StreamEvent, AiError> {
    if event.data.trim() == "[DONE]" {
        return Ok(StreamEvent::Done);
    }
    let value: Value = serde_json::from_str(&event.data)?;
    if let Some(message) = value["error"]["message"].as_str() {
        return Err(AiError::Provider(message.to_string()));
    }
    match value["choices"][0]["delta"]["content"].as_str() {
        Some(text) if !text.is_empty() => Ok(StreamEvent::Text(text.to_string())),
        _ => Ok(StreamEvent::Skip),
    }
}

struct StreamState {
    body: BoxStream<'static, Result<Vec<u8>, reqwest::Error>>,
    decoder: SseDecoder,
    pending: VecDeque<String>,
    provider: Provider,
    done: bool,
}

impl StreamState {
    fn accept(&mut self, event: &SseEvent) -> Result<(), AiError> {
        if self.done {
            return Ok(());
        }
        let parsed = match self.provider {
            Provider::Anthropic => anthropic_event(event)?,
            Provider::OpenAi => openai_event(event)?,
        };
        match parsed {
            StreamEvent::Text(text) if !text.is_empty() => self.pending.push_back(text),
            StreamEvent::Done => self.done = true,
            _ => {}
        }
        Ok(())
    }
}

/// Turn a server-sent-event body into text deltas.
fn text_deltas(
    provider: Provider,
    body: BoxStream<'static, Result<Vec<u8>, reqwest::Error>>,
) -> TextStream {
    let state = StreamState {
        body,
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        provider,
        done: false,
    };
    stream::try_unfold(state, |mut state| async move {
        loop {
            if let Some(text) = state.pending.pop_front() {
                return Ok::<_, AiError>(Some((text, state)));
            }
            if state.done {
                return Ok::<_, AiError>(None);
            }
            match state.body.next().await {
                Some(chunk) => {
                    for event in state.decoder.push(&chunk?) {
                        state.accept(&event)?;
                    }
                }
                None => {
                    if let Some(event) = state.decoder.finish() {
                        state.accept(&event)?;
                    }
                    state.done = true;
                }
            }
        }
    })
    .boxed()
}

/// A model served over HTTPS by its provider.
pub struct HttpModel {
    client: reqwest::Client,
    provider: Provider,
    model: String,
    api_key: String,
    base_url: String,
}

impl HttpModel {
    /// The provider is chosen from the model name.
    pub fn new(model: impl Into<String>, api_key: impl Into<String>) -> Result<Self, AiError> {
        let model = model.into();
        let provider = Provider::for_model(&model)?;
        Ok(Self {
            client: reqwest::Client::new(),
            provider,
            model,
            api_key: api_key.into(),
            base_url: provider.default_base_url().to_string(),
        })
    }

    /// Point at an alternative endpoint, e.g. a proxy or a local mock.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    async fn send(
        &self,
        request: &GenerateRequest,
        stream: bool,
    ) -> Result<reqwest::Response, AiError> {
        let builder = match self.provider {
            Provider::Anthropic => {
                let (system, messages) = split_system(&request.messages);
                let body = AnthropicRequest {
                    model: &self.model,
                    max_tokens: request.max_tokens,
                    system,
                    messages,
                    temperature: request.temperature,
                    stream,
                };
                let url = format!("{}/v1/messages", self.base_url);
                info!(url = %url, model = %self.model, stream, "calling Anthropic");
                self.client
                    .post(&url)
                    .header("x-api-key", &self.api_key)
                    .header("anthropic-version", ANTHROPIC_VERSION)
                    .json(&body)
            }
            Provider::OpenAi => {
                let body = OpenAiRequest::new(&self.model, request, stream);
                let url = format!("{}/v1/chat/completions", self.base_url);
                info!(url = %url, model = %self.model, stream, "calling OpenAI");
                self.client
                    .post(&url)
                    .bearer_auth(&self.api_key)
                    .json(&body)
            }
        };

        let resp = builder.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AiError::Server {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp)
    }
}

#[async_trait]
impl LanguageModel for HttpModel {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<String, AiError> {
        let resp = self.send(request, false).await?;
        let text = match self.provider {
            Provider::Anthropic => {
                let body: AnthropicResponse = resp.json().await?;
                body.content
                    .into_iter()
                    .filter(|block| block.kind == "text")
                    .map(|block| block.text)
                    .collect::<String>()
            }
            Provider::OpenAi => {
                let body: OpenAiResponse = resp.json().await?;
                body.choices
                    .into_iter()
                    .next()
                    .and_then(|choice| choice.message.content)
                    .ok_or_else(|| AiError::Provider("response had no choices".into()))?
            }
        };
        debug!(model = %self.model, chars = text.len(), "completion received");
        Ok(text)
    }

    async fn stream(&self, request: &GenerateRequest) -> Result<TextStream, AiError> {
        let resp = self.send(request, true).await?;
        let body = resp.bytes_stream().map_ok(|bytes| bytes.to_vec()).boxed();
        Ok(text_deltas(self.provider, body))
    }
}

/// Builds the right [`HttpModel`] for a model name from the configured keys.
#[derive(Debug, Clone, Default)]
pub struct ModelRouter {
    pub anthropic_key: Option<String>,
    pub openai_key: Option<String>,
    pub anthropic_base_url: Option<String>,
    pub openai_base_url: Option<String>,
}

impl ModelRouter {
    pub fn new(anthropic_key: Option<String>, openai_key: Option<String>) -> Self {
        Self {
            anthropic_key,
            openai_key,
            ..Self::default()
        }
    }

    pub fn model(&self, name: &str) -> Result<Arc<dyn LanguageModel>, AiError> {
        let provider = Provider::for_model(name)?;
        let (key, base_url) = match provider {
            Provider::Anthropic => (&self.anthropic_key, &self.anthropic_base_url),
            Provider::OpenAi => (&self.openai_key, &self.openai_base_url),
        };
        let key = key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(AiError::MissingApiKey(provider))?;
        let mut model = HttpModel::new(name, key)?;
        if let Some(url) = base_url {
            model = model.with_base_url(url);
        }
        Ok(Arc::new(model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(data: &str) -> SseEvent {
        SseEvent {
            event: None,
            data: data.to_string(),
        }
    }

    #[test]
    fn provider_from_model_name() {
        assert_eq!(Provider::for_model("claude-sonnet-4-20250514").unwrap(), Provider::Anthropic);
        assert_eq!(Provider::for_model("gpt-4o").unwrap(), Provider::OpenAi);
        assert_eq!(Provider::for_model("o3-mini").unwrap(), Provider::OpenAi);
        assert!(matches!(
            Provider::for_model("llama-3"),
            Err(AiError::UnknownModel(name)) if name == "llama-3"
        ));
    }

    #[test]
    fn system_messages_are_hoisted() {
        let messages = vec![
            ChatMessage::system("You are a coach."),
            ChatMessage::user("Hi"),
            ChatMessage::assistant("Hello"),
        ];
        let (system, turns) = split_system(&messages);
        assert_eq!(system.as_deref(), Some("You are a coach."));
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, "user");
    }

    #[test]
    fn anthropic_request_shape() {
        let messages = vec![ChatMessage::user("Hi")];
        let (system, turns) = split_system(&messages);
        let body = AnthropicRequest {
            model: "claude-3-7-sonnet-20250219",
            max_tokens: 100,
            system,
            messages: turns,
            temperature: None,
            stream: false,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("system").is_none());
        assert!(json.get("stream").is_none());
        assert_eq!(json["messages"][0]["content"], "Hi");
    }

    #[test]
    fn openai_json_mode_sets_response_format() {
        let mut request = GenerateRequest::new(vec![ChatMessage::user("Quiz me")]);
        request.max_tokens = 100;
        request.temperature = Some(0.2);
        request.json = true;
        let json = serde_json::to_value(OpenAiRequest::new("gpt-4o", &request, true)).unwrap();
        assert_eq!(json["response_format"]["type"], "json_object");
        assert_eq!(json["stream"], true);
        assert_eq!(json["max_completion_tokens"], 100);
        assert!(json["temperature"].is_number());
    }

    #[test]
    fn reasoning_model_request_uses_completion_token_limit() {
        let mut request = GenerateRequest::new(vec![ChatMessage::user("Outline negligence")]);
        request.temperature = Some(0.7);
        let json = serde_json::to_value(OpenAiRequest::new("o3-mini", &request, false)).unwrap();
        assert_eq!(json["model"], "o3-mini");
        assert_eq!(json["max_completion_tokens"], request.max_tokens);
        assert!(json.get("max_tokens").is_none());
        assert!(json.get("temperature").is_none());
        assert!(json.get("stream").is_none());
    }

    #[test]
    fn anthropic_stream_events() {
        let delta = event(r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Duty"}}"#);
        assert_eq!(anthropic_event(&delta).unwrap(), StreamEvent::Text("Duty".into()));
        let ping = event(r#"{"type":"ping"}"#);
        assert_eq!(anthropic_event(&ping).unwrap(), StreamEvent::Skip);
        let stop = event(r#"{"type":"message_stop"}"#);
        assert_eq!(anthropic_event(&stop).unwrap(), StreamEvent::Done);
        let err = event(r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#);
        assert!(matches!(anthropic_event(&err), Err(AiError::Provider(m)) if m == "Overloaded"));
    }

    #[test]
    fn openai_stream_events() {
        let delta = event(r#"{"choices":[{"index":0,"delta":{"content":"Breach"}}]}"#);
        assert_eq!(openai_event(&delta).unwrap(), StreamEvent::Text("Breach".into()));
        let role = event(r#"{"choices":[{"index":0,"delta":{"role":"assistant"}}]}"#);
        assert_eq!(openai_event(&role).unwrap(), StreamEvent::Skip);
        assert_eq!(openai_event(&event("[DONE]")).unwrap(), StreamEvent::Done);
    }

    #[tokio::test]
    async fn body_chunks_become_text_deltas() {
        let chunks: Vec<Result<Vec<u8>, reqwest::Error>> = vec![
            Ok(b"event: content_block_delta\ndata: {\"type\":\"content_block_delta\",\"delta\":{\"type\":\"text_delta\",\"text\":\"Neg\"}}\n\n".to_vec()),
            Ok(b"data: {\"type\":\"content_block_delta\",\"delta\":{\"type\":\"text_delta\",\"text\":\"ligence\"}}\n\ndata: {\"type\":\"message_stop\"}\n\n".to_vec()),
            Ok(b"data: {\"type\":\"content_block_delta\",\"delta\":{\"type\":\"text_delta\",\"text\":\"ignored\"}}\n\n".to_vec()),
        ];
        let deltas: Vec<String> = text_deltas(Provider::Anthropic, stream::iter(chunks).boxed())
            .try_collect()
            .await
            .unwrap();
        assert_eq!(deltas, vec!["Neg", "ligence"]);
    }

    #[test]
    fn router_requires_key_for_selected_provider() {
        let router = ModelRouter::new(Some("sk-ant".into()), None);
        assert!(router.model("claude-sonnet-4-20250514").is_ok());
        assert!(matches!(
            router.model("gpt-4o"),
            Err(AiError::MissingApiKey(Provider::OpenAi))
        ));
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let model = HttpModel::new("gpt-4o", "sk").unwrap().with_base_url("http://localhost:8080/");
        assert_eq!(model.base_url, "http://localhost:8080");
        assert_eq!(model.provider(), Provider::OpenAi);
    }
}
