//! Scripted in-process model for tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream;

use crate::{AiError, GenerateRequest, LanguageModel, TextStream};

/// Replies with canned text, in order, and records every request.
pub(crate) struct ScriptedModel {
    name: String,
    replies: Mutex<VecDeque<Result<String, String>>>,
    pub(crate) requests: Mutex<Vec<GenerateRequest>>,
}

impl ScriptedModel {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn reply(self, text: &str) -> Self {
        self.replies.lock().unwrap().push_back(Ok(text.to_string()));
        self
    }

    pub(crate) fn fail(self, message: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
        self
    }

    pub(crate) fn last_request(&self) -> GenerateRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }

    fn next_reply(&self, request: &GenerateRequest) -> Result<String, AiError> {
        self.requests.lock().unwrap().push(request.clone());
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(AiError::Provider(message)),
            None => Err(AiError::Provider("script exhausted".into())),
        }
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn model_name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<String, AiError> {
        self.next_reply(request)
    }

    /// Streams the scripted reply one word at a time.
    async fn stream(&self, request: &GenerateRequest) -> Result<TextStream, AiError> {
        let text = self.next_reply(request)?;
        let words: Vec<Result<String, AiError>> = text
            .split_inclusive(' ')
            .map(|w| Ok(w.to_string()))
            .collect();
        Ok(stream::iter(words).boxed())
    }
}
