//! Runtime configuration assembled from CLI flags and the environment.

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use thiserror::Error;

use crate::constants;

/// The two Ollama model tags a session may run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ModelChoice {
    #[default]
    #[value(name = "deepseek-r1:1.5b")]
    DeepSeekR1Small,
    #[value(name = "deepseek-r1:3b")]
    DeepSeekR1Medium,
}

impl ModelChoice {
    pub const ALL: [ModelChoice; 2] = [ModelChoice::DeepSeekR1Small, ModelChoice::DeepSeekR1Medium];

    pub fn id(&self) -> &'static str {
        match self {
            ModelChoice::DeepSeekR1Small => "deepseek-r1:1.5b",
            ModelChoice::DeepSeekR1Medium => "deepseek-r1:3b",
        }
    }
}

impl fmt::Display for ModelChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown model '{0}', expected one of: deepseek-r1:1.5b, deepseek-r1:3b")]
pub struct UnknownModel(pub String);

impl FromStr for ModelChoice {
    type Err = UnknownModel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelChoice::ALL
            .into_iter()
            .find(|m| m.id() == s)
            .ok_or_else(|| UnknownModel(s.to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct CoachConfig {
    pub ollama_url: String,
    pub model: ModelChoice,
    pub temperature: f32,
    pub persona: String,
}

impl Default for CoachConfig {
    fn default() -> Self {
        Self {
            ollama_url: constants::OLLAMA_URL.clone(),
            model: ModelChoice::default(),
            temperature: constants::DEFAULT_TEMPERATURE,
            persona: constants::DEFAULT_PERSONA.to_string(),
        }
    }
}
