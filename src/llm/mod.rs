//! Single-turn response generation.

pub mod generator;
pub mod llama;

pub use generator::{ChatModel, ConversationTurn, ResponseGenerator};
pub use llama::{LlamaChatModel, LlamaConfig};
