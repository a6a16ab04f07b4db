//! Retriever tool - school-scoped knowledge-base search

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::error::Error;
use crate::retrieval::KnowledgeBase;
use crate::schools::SchoolContext;
use crate::Result;

use super::Tool;

/// Documents returned per query.
const TOP_K: usize = 5;

/// Similarity search over the session's school partition. The tool is
/// bound to one `SchoolContext` at construction and can never be steered
/// to another school's collection by the model.
pub struct RetrieverTool {
    kb: Arc<dyn KnowledgeBase>,
    school: SchoolContext,
    school_name: String,
}

impl RetrieverTool {
    pub fn new(kb: Arc<dyn KnowledgeBase>, school: SchoolContext, school_name: &str) -> Self {
        Self {
            kb,
            school,
            school_name: school_name.to_string(),
        }
    }
}

#[async_trait]
impl Tool for RetrieverTool {
    fn name(&self) -> &str {
        "retriever_tool"
    }

    fn description(&self) -> &str {
        "Okulun bilgi bankasından sorguyla ilgili belgeleri döner. Akademik takvim, Erasmus ve öğrenci programları gibi okula özgü konular için kullanılır."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Aranacak konu"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, params: Value) -> Result<String> {
        let query = params
            .get("query")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::Tool("Missing 'query' parameter".to_string()))?;

        let docs = self
            .kb
            .similarity_search(&self.school, query, TOP_K)
            .await
            .map_err(|e| Error::Tool(format!("Knowledge base search failed: {e}")))?;

        if docs.is_empty() {
            return Ok(format!(
                "No relevant information found for {}.",
                self.school_name
            ));
        }

        let excerpts: Vec<String> = docs
            .iter()
            .enumerate()
            .map(|(i, doc)| {
                format!("[{}] Document {}:\n{}", self.school_name, i + 1, doc.content)
            })
            .collect();

        Ok(excerpts.join("\n\n"))
    }
}
