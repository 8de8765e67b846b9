// Prompt assembly: persona first, then every turn in transcript order.

use serde::{Deserialize, Serialize};

use crate::transcript::{Role, Turn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptRole {
    System,
    User,
    Assistant,
}

impl From<Role> for PromptRole {
    fn from(role: Role) -> Self {
        match role {
            Role::User => PromptRole::User,
            Role::Assistant => PromptRole::Assistant,
        }
    }
}

/// One `(role, text)` pair sent to the completion backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptEntry {
    pub role: PromptRole,
    pub content: String,
}

impl PromptEntry {
    pub fn new(role: PromptRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

pub fn build_prompt(persona: &str, turns: &[Turn]) -> Vec<PromptEntry> {
    let mut entries = Vec::with_capacity(turns.len() + 1);
    entries.push(PromptEntry::new(PromptRole::System, persona));
    entries.extend(
        turns
            .iter()
            .map(|turn| PromptEntry::new(turn.role().into(), turn.content())),
    );
    entries
}
