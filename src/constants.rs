// Fixed strings and env-backed defaults.

use std::env;

pub const APP_TITLE: &str = "🔥 Valorant Rank-Up Coach";
pub const APP_CAPTION: &str = "🚀 AI-powered gaming assistant for improving your Valorant skills! 🎯";

/// Seed turn of every transcript.
pub const GREETING: &str = "Hi! I'm your Valorant Coach! 🎮 How can I help you rank up?";

pub const DEFAULT_PERSONA: &str = "You are a professional Valorant coach helping a player improve their skills. \
You provide guidance on aim training, crosshair placement, team coordination, and game sense. \
Focus on giving **practical and concise tips**.";

/// Case-sensitive marker of the underlying model introducing itself.
pub const IDENTITY_LEAK_MARKER: &str = "I'm DeepSeek";
pub const IDENTITY_LEAK_REDIRECT: &str = "Let's focus on improving your Valorant gameplay! 🎯";

pub const FALLBACK_REPLY: &str = "⚠️ AI is currently unavailable. Please try again later!";

pub const COACHING_FEATURES: [&str; 3] = [
    "🎯 Aim & Crosshair Training",
    "🔥 Game Sense & Strategy",
    "🛠️ Role & Agent Mastery",
];

pub const INPUT_PLACEHOLDER: &str =
    "Ask me anything about Valorant strategies, agent selection, or game mechanics...";

pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_PORT: u16 = 8501;

lazy_static::lazy_static! {
    pub static ref OLLAMA_URL: String = env::var("OLLAMA_URL").unwrap_or_else(|_| "http://localhost:11434".to_string());
    pub static ref TEMPLATES_DIR: String = env::var("RANKUP_TEMPLATES_DIR").unwrap_or_else(|_| "templates".to_string());
    pub static ref STATIC_DIR: String = env::var("RANKUP_STATIC_DIR").unwrap_or_else(|_| "static".to_string());
}
