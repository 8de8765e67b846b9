//! One interactive conversation.
//!
//! A [`ChatSession`] exclusively owns its [`Transcript`]; the generator and
//! persona are shared read-only, so any number of sessions can run side by
//! side without touching each other's history.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::config::{CoachConfig, ModelChoice};
use crate::generator::ResponseGenerator;
use crate::llm_interaction::{CompletionBackend, OllamaClient};
use crate::transcript::{Role, Transcript, Turn};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("message is empty")]
    EmptyMessage,
}

pub struct ChatSession {
    id: Uuid,
    transcript: Transcript,
    generator: Arc<ResponseGenerator>,
    persona: Arc<str>,
}

impl ChatSession {
    pub fn new(generator: Arc<ResponseGenerator>, persona: Arc<str>) -> Self {
        let id = Uuid::new_v4();
        info!(
            session = %id,
            model = %generator.model(),
            temperature = generator.temperature(),
            "Chat session started"
        );
        Self {
            id,
            transcript: Transcript::new(),
            generator,
            persona,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn model(&self) -> ModelChoice {
        self.generator.model()
    }

    /// Switch the model used for replies from now on. Earlier turns stay as they are.
    pub fn set_generator(&mut self, generator: Arc<ResponseGenerator>) {
        info!(session = %self.id, from = %self.model(), to = %generator.model(), "Model switched");
        self.generator = generator;
    }

    pub fn transcript(&self) -> &[Turn] {
        self.transcript.all()
    }

    pub fn reset(&mut self) {
        info!(session = %self.id, "Transcript reset");
        self.transcript.reset();
    }

    /// Record the user's message before the reply is generated, so a UI can
    /// render it while the completion call is in flight.
    pub fn push_user(&mut self, text: &str) -> Result<(), SessionError> {
        if text.trim().is_empty() {
            return Err(SessionError::EmptyMessage);
        }
        self.transcript.append(Role::User, text);
        Ok(())
    }

    /// Generate and append the assistant reply for the current transcript.
    #[instrument(skip(self), fields(session = %self.id, turns = self.transcript.len()))]
    pub async fn respond(&mut self) -> &Turn {
        let reply = self.generator.generate(&self.transcript, &self.persona).await;
        self.transcript.append(Role::Assistant, reply);
        // Just appended, so the transcript cannot be empty here.
        &self.transcript.all()[self.transcript.len() - 1]
    }

    /// Full user → assistant round trip. Returns the updated transcript.
    pub async fn submit(&mut self, text: &str) -> Result<&[Turn], SessionError> {
        self.push_user(text)?;
        self.respond().await;
        Ok(self.transcript.all())
    }
}

/// Opens sessions against a shared backend. Holds one generator per model, so
/// model and temperature are fixed inside each generator.
pub struct SessionFactory {
    generators: [Arc<ResponseGenerator>; 2],
    default_model: ModelChoice,
    persona: Arc<str>,
}

impl SessionFactory {
    pub fn new(backend: Arc<dyn CompletionBackend>, config: &CoachConfig) -> Self {
        let generators = ModelChoice::ALL
            .map(|model| Arc::new(ResponseGenerator::new(backend.clone(), model, config.temperature)));
        Self {
            generators,
            default_model: config.model,
            persona: Arc::from(config.persona.as_str()),
        }
    }

    /// Factory talking to the Ollama instance at `config.ollama_url`.
    pub fn ollama(config: &CoachConfig) -> Self {
        Self::new(Arc::new(OllamaClient::new(&config.ollama_url)), config)
    }

    pub fn default_model(&self) -> ModelChoice {
        self.default_model
    }

    pub fn generator_for(&self, model: ModelChoice) -> Arc<ResponseGenerator> {
        // Same order as ModelChoice::ALL.
        match model {
            ModelChoice::DeepSeekR1Small => self.generators[0].clone(),
            ModelChoice::DeepSeekR1Medium => self.generators[1].clone(),
        }
    }

    pub fn open(&self, model: Option<ModelChoice>) -> ChatSession {
        let model = model.unwrap_or(self.default_model);
        ChatSession::new(self.generator_for(model), self.persona.clone())
    }
}
