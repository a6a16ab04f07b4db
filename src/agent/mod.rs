//! Agent module — conversation transcript, model gateway, and the loop.
//!
//! This module contains:
//! - Message types for the transcript
//! - LLM client trait and the Gemini implementation
//! - The school-parameterized system prompt
//! - The agent loop that alternates model calls and tool execution

mod loop_impl;
mod message;
pub mod prompt;

pub mod llm;

pub use llm::{GeminiClient, LlmClient, LlmResponse, ProviderRegistry, Usage};
pub use loop_impl::{ChatAgent, UNABLE_TO_COMPLETE};
pub use message::{Message, Role, ToolCallRequest};
