//! Tools module - capabilities the model may request
//!
//! The assistant exposes exactly two tools: school knowledge-base
//! retrieval and web search. The set is closed: dispatch goes through
//! [`ToolKind`], so adding a tool is a compile-checked change rather
//! than a string lookup into a map.

mod retriever;
mod web_search;

pub use retriever::RetrieverTool;
pub use web_search::WebSearchTool;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::Result;

/// Sentinel returned when the model asks for a tool that does not exist.
/// Fed back as a tool result so the model can react instead of the turn
/// aborting.
pub const INCORRECT_TOOL_NAME: &str = "Incorrect Tool Name";

/// Tool definition advertised to the LLM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Tool trait - interface for the assistant's capabilities
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name used in function calls
    fn name(&self) -> &str;

    /// Description of what the tool does
    fn description(&self) -> &str;

    /// JSON Schema for parameters
    fn parameters(&self) -> Value;

    /// Execute the tool with given parameters
    async fn execute(&self, params: Value) -> Result<String>;

    /// Convert to tool definition for the LLM
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

/// The closed set of supported tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    Retriever,
    WebSearch,
}

impl ToolKind {
    /// Parse a tool name as emitted by the model.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "retriever_tool" => Some(Self::Retriever),
            "web_search_tool" => Some(Self::WebSearch),
            _ => None,
        }
    }
}

/// The tools available to one session, bound to that session's school
/// context. Dispatch never returns an error: tool faults become text the
/// model can react to.
pub struct ToolSet {
    retriever: RetrieverTool,
    web_search: WebSearchTool,
}

impl ToolSet {
    pub fn new(retriever: RetrieverTool, web_search: WebSearchTool) -> Self {
        Self {
            retriever,
            web_search,
        }
    }

    /// Tool definitions for the LLM, in a stable order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        vec![self.retriever.to_definition(), self.web_search.to_definition()]
    }

    /// Execute one requested call. Unknown names yield the sentinel,
    /// tool errors are folded into text.
    pub async fn dispatch(&self, name: &str, params: Value) -> String {
        debug!(tool = name, "dispatching tool call");

        let result = match ToolKind::parse(name) {
            None => return INCORRECT_TOOL_NAME.to_string(),
            Some(ToolKind::Retriever) => self.retriever.execute(params).await,
            Some(ToolKind::WebSearch) => self.web_search.execute(params).await,
        };

        match result {
            Ok(text) => text,
            Err(e) => {
                debug!(tool = name, error = %e, "tool call failed");
                format!("Error: {e}")
            }
        }
    }
}
