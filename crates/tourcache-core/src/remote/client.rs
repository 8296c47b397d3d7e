//! HTTP client for the remote document store.
//!
//! Collections are served as `GET {base}/collections/{name}`, optionally
//! filtered with `?userId=`. The body is either a JSON array of documents or
//! an object with a `documents` array.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use serde_json::Value;
use tracing::debug;

use crate::models::{EntityKind, RemoteDocument};

use super::{RemoteError, RemoteStore};

/// HTTP request timeout in seconds.
/// Whole collections come back in one response, so this is generous.
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Client for the remote document store.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpRemoteStore {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpRemoteStore {
    pub fn new(base_url: impl Into<String>) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Create a new store client with the given token, sharing the connection pool.
    pub fn with_token(&self, token: impl Into<String>) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            token: Some(token.into()),
        }
    }

    fn collection_url(&self, kind: EntityKind) -> String {
        format!("{}/collections/{}", self.base_url, kind.collection())
    }

    async fn fetch(
        &self,
        kind: EntityKind,
        user_id: Option<&str>,
    ) -> Result<Vec<RemoteDocument>, RemoteError> {
        let url = self.collection_url(kind);
        let mut request = self
            .client
            .get(&url)
            .header(header::ACCEPT, "application/json");
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token);
        }
        if let Some(user_id) = user_id {
            request = request.query(&[("userId", user_id)]);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::from_status(status, &body));
        }

        let body: Value = response.json().await?;
        let documents = parse_documents(body)?;
        debug!(kind = %kind, count = documents.len(), "Fetched remote collection");
        Ok(documents)
    }
}

/// Accept either a bare array or `{"documents": [...]}`.
/// Entries that are not objects are dropped here; the mapper decides about the rest.
fn parse_documents(body: Value) -> Result<Vec<RemoteDocument>, RemoteError> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.remove("documents") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(RemoteError::InvalidResponse(
                    "expected an array of documents".to_string(),
                ))
            }
        },
        _ => {
            return Err(RemoteError::InvalidResponse(
                "expected an array of documents".to_string(),
            ))
        }
    };

    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<RemoteDocument>(item).ok())
        .collect())
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn fetch_all(&self, kind: EntityKind) -> Result<Vec<RemoteDocument>, RemoteError> {
        self.fetch(kind, None).await
    }

    async fn fetch_for_user(
        &self,
        kind: EntityKind,
        user_id: &str,
    ) -> Result<Vec<RemoteDocument>, RemoteError> {
        self.fetch(kind, Some(user_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_bare_array() {
        let docs = parse_documents(json!([
            {"id": "a", "name": "One"},
            {"id": "b", "name": "Two"},
            "garbage"
        ]))
        .unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1].id, "b");
    }

    #[test]
    fn test_parse_wrapped_documents() {
        let docs = parse_documents(json!({"documents": [{"id": "a"}]})).unwrap();
        assert_eq!(docs.len(), 1);
    }

    #[test]
    fn test_parse_rejects_other_shapes() {
        assert!(parse_documents(json!({"items": []})).is_err());
        assert!(parse_documents(json!("nope")).is_err());
    }

    #[test]
    fn test_collection_url_trims_trailing_slash() {
        let store = HttpRemoteStore::new("https://api.example.com/v1/").unwrap();
        assert_eq!(
            store.collection_url(EntityKind::Spots),
            "https://api.example.com/v1/collections/touristSpots"
        );
    }
}
