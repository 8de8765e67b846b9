//! Turns a transcript into the coach's next reply.
//!
//! [`ResponseGenerator::generate`] never fails: backend errors become
//! [`FALLBACK_REPLY`](crate::constants::FALLBACK_REPLY) and identity leaks
//! become [`IDENTITY_LEAK_REDIRECT`](crate::constants::IDENTITY_LEAK_REDIRECT).

use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::config::ModelChoice;
use crate::constants;
use crate::llm_interaction::{CompletionBackend, CompletionRequest};
use crate::prompt::build_prompt;
use crate::transcript::Transcript;

pub struct ResponseGenerator {
    backend: Arc<dyn CompletionBackend>,
    model: ModelChoice,
    temperature: f32,
}

impl ResponseGenerator {
    pub fn new(backend: Arc<dyn CompletionBackend>, model: ModelChoice, temperature: f32) -> Self {
        Self {
            backend,
            model,
            temperature,
        }
    }

    pub fn model(&self) -> ModelChoice {
        self.model
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub async fn generate(&self, transcript: &Transcript, persona: &str) -> String {
        let request = CompletionRequest {
            model: self.model.id().to_string(),
            temperature: self.temperature,
            messages: build_prompt(persona, transcript.all()),
        };

        match self.backend.complete(&request).await {
            Ok(reply) => filter_reply(reply),
            Err(e) => {
                error!(model = %self.model, error = %e, "AI Error");
                constants::FALLBACK_REPLY.to_string()
            }
        }
    }
}

/// Literal, case-sensitive check for the model introducing itself.
pub fn filter_reply(reply: String) -> String {
    if reply.contains(constants::IDENTITY_LEAK_MARKER) {
        warn!("Replacing reply that leaked the model identity");
        debug!(%reply, "Discarded reply");
        constants::IDENTITY_LEAK_REDIRECT.to_string()
    } else {
        reply
    }
}
