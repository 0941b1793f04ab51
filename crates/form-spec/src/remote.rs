//! Transport-free helpers for remote search and upload collaborators.
//!
//! The engine never performs requests. These types describe what an
//! autocomplete or file input sends and how its responses are read, so
//! hosts can plug in whichever HTTP client they use.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("invalid search endpoint '{endpoint}': {source}")]
    InvalidEndpoint {
        endpoint: String,
        #[source]
        source: url::ParseError,
    },
    #[error("search response is not an array, {{results: [...]}} or {{data: [...]}}")]
    UnexpectedShape,
    #[error("upload response is malformed: {0}")]
    Upload(#[source] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SearchMethod {
    #[default]
    Get,
    Post,
}

/// Fully described search request.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub method: SearchMethod,
    pub url: Url,
    pub headers: BTreeMap<String, String>,
    /// JSON body for `POST`; `None` for `GET`.
    pub body: Option<Value>,
}

impl SearchRequest {
    /// `GET` carries the query as `?q=`, `POST` as `{"q": ...}`.
    pub fn new(
        endpoint: &str,
        method: SearchMethod,
        query: &str,
        headers: BTreeMap<String, String>,
    ) -> Result<Self, RemoteError> {
        let mut url = Url::parse(endpoint).map_err(|source| RemoteError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            source,
        })?;
        let body = match method {
            SearchMethod::Get => {
                url.query_pairs_mut().append_pair("q", query);
                None
            }
            SearchMethod::Post => Some(json!({ "q": query })),
        };
        Ok(Self {
            method,
            url,
            headers,
            body,
        })
    }
}

/// Extracts option objects from a search response.
pub fn normalize_search_response(response: Value) -> Result<Vec<Value>, RemoteError> {
    match response {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => {
            for key in ["results", "data"] {
                if let Some(Value::Array(items)) = map.remove(key) {
                    return Ok(items);
                }
            }
            Err(RemoteError::UnexpectedShape)
        }
        _ => Err(RemoteError::UnexpectedShape),
    }
}

/// Successful upload reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub url: String,
}

impl UploadResponse {
    pub fn parse(response: Value) -> Result<Self, RemoteError> {
        serde_json::from_value(response).map_err(RemoteError::Upload)
    }
}

/// Last-write-wins ticketing for in-flight requests on one field.
///
/// Each new request takes a ticket; a reply is applied only if its ticket
/// is still the latest one issued.
#[derive(Debug, Default)]
pub struct LatestRequest {
    latest: AtomicU64,
}

impl LatestRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_current(&self, ticket: u64) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket
    }
}
