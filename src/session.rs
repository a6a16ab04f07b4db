//! Session management - per-login isolated conversations
//!
//! Each login gets its own [`ChatAgent`] with a fresh transcript, bound
//! to the school context resolved at login time. The registry is the only
//! shared mutable structure: a `RwLock`ed map serializes creation and
//! lookup, while a per-session mutex keeps turns within one session
//! strictly sequential. Different sessions run concurrently.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::agent::{ChatAgent, LlmClient};
use crate::config::Config;
use crate::error::Error;
use crate::retrieval::KnowledgeBase;
use crate::schools::{AliasTable, SchoolContext};
use crate::tools::{RetrieverTool, ToolSet, WebSearchTool};
use crate::Result;

/// One login session: a conversation bound to a resolved school.
pub struct Session {
    pub id: String,
    pub token: String,
    pub email: String,
    pub school_name: String,
    pub school: SchoolContext,
    pub created_at: DateTime<Utc>,
    last_active: std::sync::Mutex<DateTime<Utc>>,
    agent: Mutex<ChatAgent>,
}

impl Session {
    /// Run one chat turn. Turns within a session are serialized by the
    /// agent mutex; the transcript is never mutated concurrently.
    pub async fn chat(&self, text: &str) -> Result<String> {
        *self.last_active.lock().unwrap() = Utc::now();
        let mut agent = self.agent.lock().await;
        agent.ask(text).await
    }

    fn last_active(&self) -> DateTime<Utc> {
        *self.last_active.lock().unwrap()
    }
}

/// School context preset for a caller who has not gone through the login
/// flow. Kept per email so concurrent callers cannot interfere.
#[derive(Debug, Clone)]
pub struct Preset {
    pub school_name: String,
    pub school: SchoolContext,
}

/// Process-wide registry of active sessions.
pub struct SessionRegistry {
    config: Config,
    aliases: AliasTable,
    kb: Arc<dyn KnowledgeBase>,
    llm: Arc<dyn LlmClient>,
    sessions: RwLock<HashMap<String, Arc<Session>>>,
    presets: RwLock<HashMap<String, Preset>>,
}

impl SessionRegistry {
    pub fn new(config: Config, kb: Arc<dyn KnowledgeBase>, llm: Arc<dyn LlmClient>) -> Self {
        Self {
            config,
            aliases: AliasTable::builtin(),
            kb,
            llm,
            sessions: RwLock::new(HashMap::new()),
            presets: RwLock::new(HashMap::new()),
        }
    }

    /// Create a session for an email/school pair.
    ///
    /// Resolves the school, verifies the partition is provisioned (unless
    /// it resolved to the general fallback), and binds a fresh agent with
    /// an empty transcript to the resolved context. Fails without side
    /// effects: a rejected login leaves no session entry.
    pub async fn create_session(&self, email: &str, school_name: &str) -> Result<Arc<Session>> {
        let email = email.trim();
        let school_name = school_name.trim();

        if email.is_empty() {
            return Err(Error::MissingField("email"));
        }
        if school_name.is_empty() {
            return Err(Error::MissingField("school"));
        }

        let school = self.aliases.resolve(school_name);

        if !school.is_general() {
            let count = self.kb.document_count(&school.collection).await?;
            if count == 0 {
                return Err(Error::SchoolNotRegistered(school_name.to_string()));
            }
        }

        let id = uuid::Uuid::new_v4().to_string();
        let token = generate_session_token(email, school_name);
        let agent = ChatAgent::new(
            self.llm.clone(),
            self.toolset_for(&school, school_name),
            school_name,
            self.config.max_rounds,
        );

        let now = Utc::now();
        let session = Arc::new(Session {
            id: id.clone(),
            token,
            email: email.to_string(),
            school_name: school_name.to_string(),
            school,
            created_at: now,
            last_active: std::sync::Mutex::new(now),
            agent: Mutex::new(agent),
        });

        let mut sessions = self.sessions.write().await;
        self.evict(&mut sessions);
        sessions.insert(id, session.clone());
        info!(
            session = %session.id,
            school = %session.school.code,
            "session created"
        );

        Ok(session)
    }

    /// Look up a session by id.
    pub async fn get(&self, session_id: &str) -> Option<Arc<Session>> {
        self.sessions.read().await.get(session_id).cloned()
    }

    /// Run one turn in an existing session.
    pub async fn chat(&self, session_id: &str, text: &str) -> Result<String> {
        let session = self
            .get(session_id)
            .await
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))?;
        session.chat(text).await
    }

    /// Store the preset school/email context for a caller. Returns the
    /// resolved context.
    pub async fn set_preset(&self, email: &str, school_name: &str) -> Preset {
        let preset = Preset {
            school_name: school_name.to_string(),
            school: self.aliases.resolve(school_name),
        };
        self.presets
            .write()
            .await
            .insert(email.to_string(), preset.clone());
        preset
    }

    /// Look up a caller's preset context.
    pub async fn preset(&self, email: &str) -> Option<Preset> {
        self.presets.read().await.get(email).cloned()
    }

    /// Run one turn for a caller identified by email only, without a
    /// session. The agent and its system prompt are built from the
    /// caller's preset context; callers who never set one get the
    /// general fallback. Each call starts from an empty transcript.
    pub async fn preset_chat(&self, email: &str, text: &str) -> Result<String> {
        let email = email.trim();
        if email.is_empty() {
            return Err(Error::MissingField("email"));
        }

        let (school_name, school) = match self.preset(email).await {
            Some(preset) => (preset.school_name, preset.school),
            None => ("Genel".to_string(), SchoolContext::general()),
        };

        debug!(email, school = %school.code, "preset chat turn");
        let mut agent = ChatAgent::new(
            self.llm.clone(),
            self.toolset_for(&school, &school_name),
            &school_name,
            self.config.max_rounds,
        );
        agent.ask(text).await
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    fn toolset_for(&self, school: &SchoolContext, school_name: &str) -> ToolSet {
        let serper_key = if self.config.serper_api_key.is_empty() {
            None
        } else {
            Some(self.config.serper_api_key.clone())
        };
        ToolSet::new(
            RetrieverTool::new(self.kb.clone(), school.clone(), school_name),
            WebSearchTool::new(serper_key),
        )
    }

    /// Drop idle sessions, then enforce the capacity bound by evicting
    /// the least-recently-active. Runs under the write lock taken by
    /// `create_session`.
    fn evict(&self, sessions: &mut HashMap<String, Arc<Session>>) {
        let ttl = chrono::Duration::seconds(self.config.session_ttl_secs as i64);
        let now = Utc::now();

        let expired: Vec<String> = sessions
            .iter()
            .filter(|(_, s)| now - s.last_active() > ttl)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &expired {
            debug!(session = %id, "evicting idle session");
            sessions.remove(id);
        }

        while sessions.len() >= self.config.max_sessions {
            let Some(oldest) = sessions
                .iter()
                .min_by_key(|(_, s)| s.last_active())
                .map(|(id, _)| id.clone())
            else {
                break;
            };
            debug!(session = %oldest, "evicting over-capacity session");
            sessions.remove(&oldest);
        }
    }
}

/// Generate an opaque session token: SHA-256 over the login pair plus a
/// random nonce, URL-safe base64 encoded.
fn generate_session_token(email: &str, school_name: &str) -> String {
    let nonce: [u8; 32] = rand::thread_rng().gen();
    let mut hasher = Sha256::new();
    hasher.update(email.as_bytes());
    hasher.update(school_name.as_bytes());
    hasher.update(nonce);
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::llm::{FakeLlmClient, LlmResponse};
    use crate::retrieval::InMemoryKnowledgeBase;
    use serde_json::json;

    fn provisioned_kb() -> Arc<InMemoryKnowledgeBase> {
        let mut kb = InMemoryKnowledgeBase::new();
        kb.add_document("ytüadvanced", "YTÜ Erasmus başvuruları şubat ayında açılır.");
        kb.add_document("boun", "BOUN Erasmus ofisi Güney Kampüs'tedir.");
        Arc::new(kb)
    }

    fn registry(responses: Vec<LlmResponse>) -> SessionRegistry {
        SessionRegistry::new(
            Config::default(),
            provisioned_kb(),
            Arc::new(FakeLlmClient::from_responses(responses)),
        )
    }

    #[tokio::test]
    async fn test_create_session_resolves_school() {
        let registry = registry(vec![]);
        let session = registry.create_session("ali@ytu.edu.tr", "YTÜ").await.unwrap();

        assert_eq!(session.school.code, "ytu");
        assert_eq!(session.school.collection, "ytüadvanced");
        assert!(!session.token.is_empty());
        assert_eq!(registry.session_count().await, 1);
    }

    #[tokio::test]
    async fn test_missing_fields_rejected_without_side_effects() {
        let registry = registry(vec![]);

        assert!(matches!(
            registry.create_session("", "YTÜ").await,
            Err(Error::MissingField("email"))
        ));
        assert!(matches!(
            registry.create_session("a@b.c", "  ").await,
            Err(Error::MissingField("school"))
        ));
        assert_eq!(registry.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_unprovisioned_school_rejected_without_entry() {
        let registry = SessionRegistry::new(
            Config::default(),
            Arc::new(InMemoryKnowledgeBase::new()),
            Arc::new(FakeLlmClient::from_responses(vec![])),
        );

        let result = registry.create_session("a@b.c", "Cerrahpaşa").await;
        assert!(matches!(result, Err(Error::SchoolNotRegistered(_))));
        assert_eq!(registry.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_general_fallback_skips_provisioning_check() {
        let registry = SessionRegistry::new(
            Config::default(),
            Arc::new(InMemoryKnowledgeBase::new()),
            Arc::new(FakeLlmClient::from_responses(vec![])),
        );

        let session = registry.create_session("a@b.c", "Bilinmeyen Okul").await.unwrap();
        assert!(session.school.is_general());
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let registry = registry(vec![
            FakeLlmClient::tool_call_response(vec![(
                "call_1",
                "retriever_tool",
                json!({"query": "Erasmus"}),
            )]),
            LlmResponse::text("YTÜ cevabı"),
            FakeLlmClient::tool_call_response(vec![(
                "call_1",
                "retriever_tool",
                json!({"query": "Erasmus"}),
            )]),
            LlmResponse::text("BOUN cevabı"),
        ]);

        let ytu = registry.create_session("a@ytu.edu.tr", "YTÜ").await.unwrap();
        let boun = registry.create_session("b@boun.edu.tr", "Boğaziçi").await.unwrap();
        assert_ne!(ytu.id, boun.id);

        ytu.chat("Erasmus?").await.unwrap();
        boun.chat("Erasmus?").await.unwrap();

        // Each retrieval stayed inside its own partition and each
        // transcript belongs to exactly one session.
        let ytu_agent = ytu.agent.lock().await;
        let boun_agent = boun.agent.lock().await;
        let ytu_tool = &ytu_agent.transcript()[2];
        let boun_tool = &boun_agent.transcript()[2];
        assert!(ytu_tool.content.contains("şubat"));
        assert!(!ytu_tool.content.contains("Güney Kampüs"));
        assert!(boun_tool.content.contains("Güney Kampüs"));
        assert_eq!(ytu_agent.transcript().len(), 4);
    }

    #[tokio::test]
    async fn test_chat_unknown_session() {
        let registry = registry(vec![]);
        let result = registry.chat("no-such-id", "merhaba").await;
        assert!(matches!(result, Err(Error::SessionNotFound(_))));
    }

    #[tokio::test]
    async fn test_idle_sessions_are_evicted() {
        let config = Config {
            session_ttl_secs: 0,
            ..Config::default()
        };
        let registry = SessionRegistry::new(
            config,
            provisioned_kb(),
            Arc::new(FakeLlmClient::from_responses(vec![])),
        );

        let first = registry.create_session("a@b.c", "YTÜ").await.unwrap();
        // The next create sweeps: with a zero TTL the first session is idle.
        registry.create_session("b@b.c", "YTÜ").await.unwrap();

        assert!(registry.get(&first.id).await.is_none());
        assert_eq!(registry.session_count().await, 1);
    }

    #[tokio::test]
    async fn test_capacity_evicts_least_recently_active() {
        let config = Config {
            max_sessions: 2,
            ..Config::default()
        };
        let registry = SessionRegistry::new(
            config,
            provisioned_kb(),
            Arc::new(FakeLlmClient::from_responses(vec![])),
        );

        let s1 = registry.create_session("a@b.c", "YTÜ").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let s2 = registry.create_session("b@b.c", "YTÜ").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        registry.create_session("c@b.c", "YTÜ").await.unwrap();

        assert!(registry.get(&s1.id).await.is_none());
        assert!(registry.get(&s2.id).await.is_some());
        assert_eq!(registry.session_count().await, 2);
    }

    #[tokio::test]
    async fn test_presets_are_per_email() {
        let registry = registry(vec![]);
        registry.set_preset("a@b.c", "YTÜ").await;
        registry.set_preset("x@y.z", "Boğaziçi").await;

        assert_eq!(registry.preset("a@b.c").await.unwrap().school.code, "ytu");
        assert_eq!(registry.preset("x@y.z").await.unwrap().school.code, "boun");
        assert!(registry.preset("nobody").await.is_none());
    }

    #[tokio::test]
    async fn test_preset_chat_consumes_stored_context() {
        let registry = registry(vec![
            FakeLlmClient::tool_call_response(vec![(
                "call_1",
                "retriever_tool",
                json!({"query": "Erasmus ofisi"}),
            )]),
            LlmResponse::text("Erasmus ofisi Güney Kampüs'tedir."),
        ]);
        registry.set_preset("x@y.z", "Boğaziçi").await;

        let answer = registry
            .preset_chat("x@y.z", "Erasmus ofisi nerede?")
            .await
            .unwrap();

        assert!(answer.contains("Güney Kampüs"));
        // No session entry: the preset path is sessionless.
        assert_eq!(registry.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_preset_chat_without_preset_uses_general_fallback() {
        let registry = registry(vec![LlmResponse::text("Genel cevap")]);
        let answer = registry.preset_chat("nobody@y.z", "merhaba").await.unwrap();
        assert_eq!(answer, "Genel cevap");
    }

    #[tokio::test]
    async fn test_preset_chat_requires_email() {
        let registry = registry(vec![]);
        assert!(matches!(
            registry.preset_chat("  ", "merhaba").await,
            Err(Error::MissingField("email"))
        ));
    }

    #[test]
    fn test_session_tokens_are_unique() {
        let t1 = generate_session_token("a@b.c", "YTÜ");
        let t2 = generate_session_token("a@b.c", "YTÜ");
        assert_ne!(t1, t2);
        assert!(!t1.contains('='));
    }
}
