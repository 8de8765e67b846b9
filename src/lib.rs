pub mod chat;
pub mod config;
pub mod constants;
pub mod generator;
pub mod llm_interaction;
pub mod prompt;
pub mod session;
pub mod transcript;
pub mod web_server;
