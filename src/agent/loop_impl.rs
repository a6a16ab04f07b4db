//! Agent loop - alternates model calls and tool execution
//!
//! One `ChatAgent` owns one conversation. A turn starts by appending the
//! user's message, then alternates between calling the model and
//! executing the tools it requests until the model answers with plain
//! text. The transcript is append-only and grows across turns; retention
//! or windowing is the caller's concern.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::tools::ToolSet;
use crate::Result;

use super::llm::LlmClient;
use super::message::Message;
use super::prompt;

/// Fail-closed answer when a turn exhausts its model round-trips.
pub const UNABLE_TO_COMPLETE: &str =
    "Üzgünüm, isteğinizi şu anda tamamlayamıyorum. Lütfen daha sonra tekrar deneyin.";

/// A single conversation bound to one school context.
pub struct ChatAgent {
    client: Arc<dyn LlmClient>,
    tools: ToolSet,
    school_name: String,
    transcript: Vec<Message>,
    max_rounds: usize,
}

impl ChatAgent {
    pub fn new(
        client: Arc<dyn LlmClient>,
        tools: ToolSet,
        school_name: &str,
        max_rounds: usize,
    ) -> Self {
        Self {
            client,
            tools,
            school_name: school_name.to_string(),
            transcript: Vec::new(),
            max_rounds,
        }
    }

    /// Run one turn to completion and return the final answer text.
    ///
    /// Model transport errors propagate; tool faults never do — they are
    /// appended as tool-result text the model reacts to on the next round.
    pub async fn ask(&mut self, text: &str) -> Result<String> {
        info!(school = %self.school_name, "starting turn");
        self.transcript.push(Message::user(text));

        for round in 0..self.max_rounds {
            debug!("round {}/{}", round + 1, self.max_rounds);

            let messages = self.build_messages();
            let response = self
                .client
                .chat(&messages, &self.tools.definitions())
                .await?;

            let content = response.content.clone().unwrap_or_default();
            self.transcript.push(Message::assistant_with_tools(
                content.clone(),
                response.tool_calls.clone(),
            ));

            if !response.has_tool_calls() {
                info!("turn completed in {} round(s)", round + 1);
                return Ok(content);
            }

            // Requests are executed in the order the model emitted them;
            // each produces exactly one tool-result message.
            for call in &response.tool_calls {
                let result = self.tools.dispatch(&call.name, call.arguments.clone()).await;
                self.transcript
                    .push(Message::tool_result(&call.id, &call.name, result));
            }
        }

        warn!(
            "turn exceeded {} rounds, failing closed",
            self.max_rounds
        );
        self.transcript.push(Message::assistant(UNABLE_TO_COMPLETE));
        Ok(UNABLE_TO_COMPLETE.to_string())
    }

    /// Prepend the freshly generated system prompt to the transcript.
    fn build_messages(&self) -> Vec<Message> {
        let mut messages = Vec::with_capacity(self.transcript.len() + 1);
        messages.push(Message::system(prompt::system_prompt(&self.school_name)));
        messages.extend(self.transcript.iter().cloned());
        messages
    }

    /// The conversation so far (excluding the system prompt).
    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::llm::{FakeLlmClient, LlmResponse};
    use crate::agent::message::Role;
    use crate::retrieval::InMemoryKnowledgeBase;
    use crate::schools::AliasTable;
    use crate::tools::{RetrieverTool, WebSearchTool, INCORRECT_TOOL_NAME};
    use serde_json::json;

    fn agent_with(responses: Vec<LlmResponse>) -> (Arc<FakeLlmClient>, ChatAgent) {
        let client = Arc::new(FakeLlmClient::from_responses(responses));

        let mut kb = InMemoryKnowledgeBase::new();
        kb.add_document("ytüadvanced", "Erasmus başvuruları şubat ayında açılır.");
        let school = AliasTable::builtin().resolve("YTÜ");
        let tools = ToolSet::new(
            RetrieverTool::new(Arc::new(kb), school, "YTÜ"),
            WebSearchTool::new(None),
        );

        let agent = ChatAgent::new(client.clone(), tools, "YTÜ", 8);
        (client, agent)
    }

    #[tokio::test]
    async fn test_plain_answer_terminates_in_one_call() {
        let (client, mut agent) = agent_with(vec![LlmResponse::text("Merhaba, nasıl yardımcı olabilirim?")]);

        let answer = agent.ask("Selam").await.unwrap();

        assert_eq!(answer, "Merhaba, nasıl yardımcı olabilirim?");
        assert_eq!(client.call_count(), 1);
        // transcript: user + assistant
        assert_eq!(agent.transcript().len(), 2);
    }

    #[tokio::test]
    async fn test_tool_round_trip() {
        let (client, mut agent) = agent_with(vec![
            FakeLlmClient::tool_call_response(vec![(
                "call_1",
                "retriever_tool",
                json!({"query": "Erasmus başvuru tarihleri"}),
            )]),
            LlmResponse::text("Erasmus başvuruları şubat ayında açılır."),
        ]);

        let answer = agent.ask("Erasmus başvuru tarihleri nedir?").await.unwrap();

        assert!(answer.contains("şubat"));
        assert_eq!(client.call_count(), 2);

        // transcript: user, assistant(tool call), tool result, assistant
        let transcript = agent.transcript();
        assert_eq!(transcript.len(), 4);
        assert_eq!(transcript[2].role, Role::Tool);
        assert_eq!(transcript[2].tool_call_id.as_deref(), Some("call_1"));
        assert!(transcript[2].content.contains("[YTÜ] Document 1:"));
    }

    #[tokio::test]
    async fn test_n_tool_calls_yield_n_results_before_next_round() {
        let (client, mut agent) = agent_with(vec![
            FakeLlmClient::tool_call_response(vec![
                ("call_1", "retriever_tool", json!({"query": "erasmus"})),
                ("call_2", "web_search_tool", json!({"query": "haberler"})),
                ("call_3", "retriever_tool", json!({"query": "yurt"})),
            ]),
            LlmResponse::text("tamam"),
        ]);

        agent.ask("soru").await.unwrap();

        let transcript = agent.transcript();
        // user, assistant, 3x tool result, assistant
        assert_eq!(transcript.len(), 6);
        let tool_ids: Vec<&str> = transcript
            .iter()
            .filter(|m| m.role == Role::Tool)
            .map(|m| m.tool_call_id.as_deref().unwrap())
            .collect();
        assert_eq!(tool_ids, vec!["call_1", "call_2", "call_3"]);
        assert_eq!(client.call_count(), 2);
    }

    #[tokio::test]
    async fn test_unknown_tool_does_not_abort_the_loop() {
        let (_, mut agent) = agent_with(vec![
            FakeLlmClient::tool_call_response(vec![(
                "call_1",
                "make_coffee",
                json!({}),
            )]),
            LlmResponse::text("Bunu yapamıyorum."),
        ]);

        let answer = agent.ask("kahve yap").await.unwrap();

        assert_eq!(answer, "Bunu yapamıyorum.");
        let transcript = agent.transcript();
        assert_eq!(transcript[2].content, INCORRECT_TOOL_NAME);
    }

    #[tokio::test]
    async fn test_round_cap_fails_closed() {
        // Model asks for a tool on every round, forever.
        let looping: Vec<LlmResponse> = (0..20)
            .map(|_| {
                FakeLlmClient::tool_call_response(vec![(
                    "call_1",
                    "retriever_tool",
                    json!({"query": "erasmus"}),
                )])
            })
            .collect();
        let (client, mut agent) = agent_with(looping);

        let answer = agent.ask("soru").await.unwrap();

        assert_eq!(answer, UNABLE_TO_COMPLETE);
        assert_eq!(client.call_count(), 8);
        // The fail-closed answer is part of the transcript.
        assert_eq!(
            agent.transcript().last().unwrap().content,
            UNABLE_TO_COMPLETE
        );
    }

    #[tokio::test]
    async fn test_model_error_propagates_without_corrupting_transcript() {
        // An exhausted fake fails the chat call itself.
        let (client, mut agent) = agent_with(vec![]);

        let result = agent.ask("Selam").await;

        assert!(matches!(result, Err(crate::error::Error::Llm(_))));
        assert_eq!(client.call_count(), 1);
        // Only the user message made it in; no partial assistant or
        // tool-result entries.
        assert_eq!(agent.transcript().len(), 1);
        assert_eq!(agent.transcript()[0].role, Role::User);
        assert_eq!(agent.transcript()[0].content, "Selam");
    }

    #[tokio::test]
    async fn test_transcript_accumulates_across_turns() {
        let (_, mut agent) = agent_with(vec![
            LlmResponse::text("ilk cevap"),
            LlmResponse::text("ikinci cevap"),
        ]);

        agent.ask("ilk soru").await.unwrap();
        agent.ask("ikinci soru").await.unwrap();

        assert_eq!(agent.transcript().len(), 4);
        assert_eq!(agent.transcript()[0].content, "ilk soru");
        assert_eq!(agent.transcript()[3].content, "ikinci cevap");
    }
}
