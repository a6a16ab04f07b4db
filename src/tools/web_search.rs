//! Web search tool - Serper-backed search with soft failures
//!
//! Every provider fault (missing key, timeout, transport error, bad
//! status) is converted to a distinct human-readable string and returned
//! as the tool result, never raised. The model decides how to react.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

use crate::error::Error;
use crate::Result;

use super::Tool;

const SERPER_URL: &str = "https://google.serper.dev/search";

/// How many results Serper is asked for.
const REQUESTED_RESULTS: usize = 5;

/// How many organic results make it into the tool output.
const SHOWN_RESULTS: usize = 3;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Web search over the Serper API. Without an API key the tool stays
/// registered and reports unavailability as its result.
pub struct WebSearchTool {
    api_key: Option<String>,
    url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl WebSearchTool {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.is_empty()),
            url: SERPER_URL.to_string(),
            timeout: REQUEST_TIMEOUT,
            client: reqwest::Client::new(),
        }
    }

    /// Point the tool at a stand-in endpoint with a short deadline.
    #[cfg(test)]
    fn with_endpoint(api_key: &str, url: &str, timeout: Duration) -> Self {
        Self {
            api_key: Some(api_key.to_string()),
            url: url.to_string(),
            timeout,
            client: reqwest::Client::new(),
        }
    }

    async fn search(&self, api_key: &str, query: &str) -> String {
        let payload = json!({
            "q": query,
            "num": REQUESTED_RESULTS,
            "gl": "tr",
            "hl": "tr"
        });

        let response = self
            .client
            .post(&self.url)
            .header("X-API-KEY", api_key)
            .header("Content-Type", "application/json")
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) if e.is_timeout() => {
                return "Web arama zaman aşımına uğradı.".to_string();
            }
            Err(e) if e.is_connect() || e.is_request() => {
                return format!("Web arama bağlantı hatası: {e}");
            }
            Err(e) => {
                return format!("Web arama genel hatası: {e}");
            }
        };

        if !response.status().is_success() {
            return format!("Web arama hatası: {}", response.status().as_u16());
        }

        match response.json::<Value>().await {
            Ok(data) => format_organic_results(&data, query),
            Err(e) => format!("Web arama genel hatası: {e}"),
        }
    }
}

/// Format the top organic results as title/snippet/link blocks.
fn format_organic_results(data: &Value, query: &str) -> String {
    let organic = data
        .get("organic")
        .and_then(|v| v.as_array())
        .map(|a| a.as_slice())
        .unwrap_or(&[]);

    let blocks: Vec<String> = organic
        .iter()
        .take(SHOWN_RESULTS)
        .enumerate()
        .map(|(i, result)| {
            let field = |key: &str| result.get(key).and_then(|v| v.as_str()).unwrap_or("");
            format!(
                "Sonuç {}:\nBaşlık: {}\nÖzet: {}\nLink: {}",
                i + 1,
                field("title"),
                field("snippet"),
                field("link")
            )
        })
        .collect();

    if blocks.is_empty() {
        format!("'{query}' için web'de sonuç bulunamadı.")
    } else {
        blocks.join("\n\n")
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search_tool"
    }

    fn description(&self) -> &str {
        "İnternette arama yapar ve güncel bilgileri döner. Haberler, güncel etkinlikler ve okul dışı güncel bilgiler için kullanılır."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Arama sorgusu"
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

        let Some(api_key) = self.api_key.clone() else {
            return Ok("Web arama servisi kullanılamıyor. API key bulunamadı.".to_string());
        };

        Ok(self.search(&api_key, query).await)
    }
}
