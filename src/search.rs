//! Breach search API client
//!
//! Issues a single JSON `POST` per query and decodes the loosely typed
//! response into [`SearchResponse`].

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::Settings;

/// Errors that can occur while talking to the search API
#[derive(Debug, Error)]
pub enum SearchError {
    /// Connection, TLS or timeout failure
    #[error("network error: {0}")]
    Network(String),
    /// Non-success HTTP status with a body that is not a JSON object
    #[error("HTTP {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body (possibly truncated)
        body: String,
    },
    /// Response body could not be decoded
    #[error("malformed response: {0}")]
    Json(String),
    /// The HTTP client could not be constructed
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// Request body sent to the search API
#[derive(Debug, Serialize)]
pub struct SearchRequest<'a> {
    /// API credential
    pub token: &'a str,
    /// Raw user query
    pub request: &'a str,
    /// Maximum number of records
    pub limit: u32,
    /// Response language code
    pub lang: &'a str,
}

/// Decoded search API response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    /// Database name -> details, in API order
    #[serde(rename = "List", default)]
    pub list: Map<String, Value>,
    /// Logical error reported by the API
    #[serde(rename = "Error code", default)]
    pub error_code: Option<Value>,
}

/// Details of a single matched database
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseHit {
    /// Description of the leak source
    #[serde(rename = "InfoLeak", default)]
    pub info_leak: Option<Value>,
    /// Leaked records, each a field -> value mapping
    #[serde(rename = "Data", default)]
    pub data: Vec<Map<String, Value>>,
}

impl SearchResponse {
    /// Returns the matched databases in API order.
    ///
    /// # Errors
    ///
    /// Returns `SearchError::Json` if a database entry has an unexpected shape.
    pub fn databases(&self) -> Result<Vec<(String, DatabaseHit)>, SearchError> {
        self.list
            .iter()
            .map(|(name, details)| {
                let hit = match details {
                    Value::Null => DatabaseHit::default(),
                    other => serde_json::from_value(other.clone())
                        .map_err(|e| SearchError::Json(format!("database {name}: {e}")))?,
                };
                Ok((name.clone(), hit))
            })
            .collect()
    }
}

/// Interface for breach search backends
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Runs one search for the raw user query
    async fn search(&self, query: &str) -> Result<SearchResponse, SearchError>;
}

/// HTTP implementation of [`SearchProvider`]
pub struct SearchClient {
    http_client: HttpClient,
    api_url: String,
    api_token: String,
    limit: u32,
    lang: String,
}

impl SearchClient {
    /// Creates a client from application settings
    ///
    /// # Errors
    ///
    /// Returns `SearchError::Client` if the HTTP client (TLS backend) cannot
    /// be initialized with the configured timeout.
    pub fn new(settings: &Settings) -> Result<Self, SearchError> {
        let timeout = Duration::from_secs(settings.search_http_timeout_secs);
        let http_client = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SearchError::Client(e.to_string()))?;

        Ok(Self {
            http_client,
            api_url: settings.api_url.clone(),
            api_token: settings.api_token.clone(),
            limit: settings.limit,
            lang: settings.lang.clone(),
        })
    }
}

#[async_trait]
impl SearchProvider for SearchClient {
    #[instrument(skip(self, query), fields(query_len = query.len()))]
    async fn search(&self, query: &str) -> Result<SearchResponse, SearchError> {
        let body = SearchRequest {
            token: &self.api_token,
            request: query,
            limit: self.limit,
            lang: &self.lang,
        };

        let response = self
            .http_client
            .post(&self.api_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| SearchError::Network(e.without_url().to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| SearchError::Network(e.without_url().to_string()))?;

        debug!(status = status.as_u16(), bytes = text.len(), "Search API responded");

        // The API reports logical errors in the JSON body, sometimes with a
        // non-2xx status, so the body is decoded before the status is checked.
        match serde_json::from_str::<SearchResponse>(&text) {
            Ok(parsed) => Ok(parsed),
            Err(_) if !status.is_success() => Err(SearchError::Status {
                status: status.as_u16(),
                body: crate::utils::truncate_str(&text, 200),
            }),
            Err(e) => Err(SearchError::Json(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_shape() -> Result<(), serde_json::Error> {
        let body = SearchRequest {
            token: "secret",
            request: "test@example.com",
            limit: 100,
            lang: "en",
        };
        assert_eq!(
            serde_json::to_value(&body)?,
            json!({"token": "secret", "request": "test@example.com", "limit": 100, "lang": "en"})
        );
        Ok(())
    }

    #[test]
    fn test_databases_preserve_api_order() -> Result<(), Box<dyn std::error::Error>> {
        let response: SearchResponse = serde_json::from_str(
            r#"{"List": {
                "Zeta": {"InfoLeak": "z", "Data": []},
                "Alpha": {"InfoLeak": "a", "Data": [{"Email": "a@b.c"}]}
            }}"#,
        )?;

        let dbs = response.databases()?;
        let names: Vec<&str> = dbs.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["Zeta", "Alpha"]);
        assert_eq!(dbs[1].1.data.len(), 1);
        assert!(response.error_code.is_none());
        Ok(())
    }

    #[test]
    fn test_error_code_and_missing_list() -> Result<(), serde_json::Error> {
        let response: SearchResponse =
            serde_json::from_str(r#"{"Error code": "bad token"}"#)?;
        assert_eq!(response.error_code, Some(json!("bad token")));
        assert!(response.list.is_empty());
        Ok(())
    }

    #[test]
    fn test_malformed_database_entry() -> Result<(), serde_json::Error> {
        let response: SearchResponse =
            serde_json::from_str(r#"{"List": {"Broken": {"Data": "not a list"}}}"#)?;
        assert!(matches!(response.databases(), Err(SearchError::Json(_))));
        Ok(())
    }
}
