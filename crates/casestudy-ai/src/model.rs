use async_trait::async_trait;
use casestudy_core::ChatMessage;
use futures::stream::BoxStream;

use crate::AiError;

/// Text deltas from a streaming completion.
pub type TextStream = BoxStream<'static, Result<String, AiError>>;

const DEFAULT_MAX_TOKENS: u32 = 4096;

/// One completion request. System messages may appear anywhere in
/// `messages`; providers that want them separately hoist them.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
    /// Ask the provider for a JSON object where it supports that.
    pub json: bool,
}

impl GenerateRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: None,
            json: false,
        }
    }

    /// A single user turn.
    pub fn prompt(text: impl Into<String>) -> Self {
        Self::new(vec![ChatMessage::user(text)])
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn json(mut self) -> Self {
        self.json = true;
        self
    }
}

/// A hosted chat-completion model.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn model_name(&self) -> &str;

    /// Complete the request and return the whole response text.
    async fn generate(&self, request: &GenerateRequest) -> Result<String, AiError>;

    /// Complete the request, yielding text as it is produced.
    async fn stream(&self, request: &GenerateRequest) -> Result<TextStream, AiError>;
}
