//! Hosted language models and the study features built on them.
//!
//! Everything that talks to a model goes through [`LanguageModel`], so the
//! coach, the evaluator and the generators can be driven by [`HttpModel`] in
//! production and by scripted stubs in tests.

mod coach;
mod error;
mod evaluator;
mod generate;
mod http;
mod model;
pub mod models;
mod sse;
mod stream;

#[cfg(test)]
pub(crate) mod testing;

pub use coach::{Coach, CoachReply};
pub use error::{AiError, StudyError};
pub use evaluator::{Evaluation, Evaluator};
pub use generate::{
    AnalysisPreset, analyze_document, chat, generate_fact_pattern, generate_flashcards,
    generate_quiz,
};
pub use http::{HttpModel, ModelRouter, Provider};
pub use model::{GenerateRequest, LanguageModel, TextStream};
pub use sse::{SseDecoder, SseEvent};
pub use stream::ReplyStream;
