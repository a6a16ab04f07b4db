//! Knowledge-base retrieval interface.
//!
//! The embedding model and vector index are external collaborators; this
//! module only defines the narrow similarity-search seam the retriever
//! tool and the login provisioning check depend on, plus two
//! implementations: an HTTP client against the retrieval service and an
//! in-memory store for tests and local demos.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::Error;
use crate::schools::SchoolContext;
use crate::Result;

/// A retrieved document excerpt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub content: String,
}

/// Narrow similarity-search interface over school-partitioned documents.
/// Partitions are read-only from this crate's point of view.
#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    /// Top-k similarity search inside the school's partition.
    async fn similarity_search(
        &self,
        school: &SchoolContext,
        query: &str,
        k: usize,
    ) -> Result<Vec<Document>>;

    /// Number of documents provisioned in a collection. Used as the
    /// login-time check that a school's partition actually has content.
    async fn document_count(&self, collection: &str) -> Result<u64>;
}

/// HTTP client for the retrieval service fronting the vector store.
#[derive(Clone)]
pub struct HttpKnowledgeBase {
    base_url: String,
    db_name: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    db: &'a str,
    collection: &'a str,
    index: &'a str,
    query: &'a str,
    k: usize,
}

#[derive(Deserialize)]
struct SearchResponse {
    documents: Vec<Document>,
}

#[derive(Deserialize)]
struct CountResponse {
    count: u64,
}

impl HttpKnowledgeBase {
    pub fn new(base_url: &str, db_name: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            db_name: db_name.to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl KnowledgeBase for HttpKnowledgeBase {
    async fn similarity_search(
        &self,
        school: &SchoolContext,
        query: &str,
        k: usize,
    ) -> Result<Vec<Document>> {
        let request = SearchRequest {
            db: &self.db_name,
            collection: &school.collection,
            index: &school.index,
            query,
            k,
        };

        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Retrieval(format!(
                "search failed with status {}",
                response.status()
            )));
        }

        let body: SearchResponse = response.json().await?;
        Ok(body.documents)
    }

    async fn document_count(&self, collection: &str) -> Result<u64> {
        let response = self
            .client
            .get(format!(
                "{}/collections/{}/count?db={}",
                self.base_url, collection, self.db_name
            ))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Retrieval(format!(
                "count failed with status {}",
                response.status()
            )));
        }

        let body: CountResponse = response.json().await?;
        Ok(body.count)
    }
}

/// In-memory knowledge base for tests and local demos. Scoring is a naive
/// term-overlap count, enough to make top-k ordering observable.
#[derive(Default)]
pub struct InMemoryKnowledgeBase {
    collections: HashMap<String, Vec<Document>>,
}

impl InMemoryKnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document to a collection, creating it when missing.
    pub fn add_document(&mut self, collection: &str, content: &str) {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .push(Document {
                content: content.to_string(),
            });
    }

    fn score(query: &str, content: &str) -> usize {
        let content = content.to_lowercase();
        query
            .to_lowercase()
            .split_whitespace()
            .filter(|term| content.contains(*term))
            .count()
    }
}

#[async_trait]
impl KnowledgeBase for InMemoryKnowledgeBase {
    async fn similarity_search(
        &self,
        school: &SchoolContext,
        query: &str,
        k: usize,
    ) -> Result<Vec<Document>> {
        let Some(docs) = self.collections.get(&school.collection) else {
            return Ok(vec![]);
        };

        let mut scored: Vec<(usize, &Document)> = docs
            .iter()
            .map(|d| (Self::score(query, &d.content), d))
            .filter(|(score, _)| *score > 0)
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(scored.into_iter().take(k).map(|(_, d)| d.clone()).collect())
    }

    async fn document_count(&self, collection: &str) -> Result<u64> {
        Ok(self
            .collections
            .get(collection)
            .map(|docs| docs.len() as u64)
            .unwrap_or(0))
    }
}
