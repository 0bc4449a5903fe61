//! REST client for the persistence collaborator.
//!
//! Endpoints:
//! - `POST {base}/groups/{roomId}/messages` with `{userId, username, content}`
//! - `GET {base}/banned-words`
//! - `GET {base}/highlighted-users`

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, Url};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};

use crate::ports::{MessageStore, ModerationListSource, PersistenceError, StoredMessage};

/// Configuration for the persistence client.
#[derive(Debug, Clone)]
pub struct HttpPersistenceConfig {
    /// Base URL of the REST backend, e.g. `https://api.example.com`.
    pub base_url: String,
    /// Bearer token sent with every request, if set.
    api_token: Option<Secret<String>>,
    /// Request timeout.
    pub timeout: Duration,
}

impl HttpPersistenceConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_token: None,
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(Secret::new(token.into()));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn api_token(&self) -> Option<&str> {
        self.api_token.as_ref().map(|t| t.expose_secret().as_str())
    }
}

/// Body of a store-message request. The room travels in the path.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StoreMessageBody<'a> {
    user_id: &'a str,
    username: &'a str,
    content: &'a str,
}

/// The backend has served banned words both as plain strings and as
/// `{"word": ...}` rows.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BannedWordEntry {
    Plain(String),
    Row { word: String },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum HighlightPayload {
    Map(HashMap<String, String>),
    Rows(Vec<HighlightRow>),
}

#[derive(Debug, Deserialize)]
struct HighlightRow {
    username: String,
    color: String,
}

/// reqwest-backed [`MessageStore`] and [`ModerationListSource`].
pub struct HttpPersistenceClient {
    config: HttpPersistenceConfig,
    base: Url,
    client: Client,
}

impl HttpPersistenceClient {
    pub fn new(config: HttpPersistenceConfig) -> Result<Self, PersistenceError> {
        let base = Url::parse(&config.base_url)
            .map_err(|e| PersistenceError::Transport(format!("Invalid base URL: {}", e)))?;
        if base.cannot_be_a_base() {
            return Err(PersistenceError::Transport(format!(
                "Invalid base URL: {}",
                config.base_url
            )));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PersistenceError::Transport(e.to_string()))?;

        Ok(Self {
            config,
            base,
            client,
        })
    }

    /// Appends path segments to the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.config.api_token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, PersistenceError> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(PersistenceError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn get_text(&self, segments: &[&str]) -> Result<String, PersistenceError> {
        let response = self.send(self.client.get(self.endpoint(segments))).await?;
        response
            .text()
            .await
            .map_err(|e| PersistenceError::Decode(e.to_string()))
    }

    fn map_send_error(&self, e: reqwest::Error) -> PersistenceError {
        if e.is_timeout() {
            PersistenceError::Transport(format!(
                "Request timed out after {}s",
                self.config.timeout.as_secs()
            ))
        } else if e.is_connect() {
            PersistenceError::Transport(format!("Connection failed: {}", e))
        } else {
            PersistenceError::Transport(e.to_string())
        }
    }
}

#[async_trait]
impl MessageStore for HttpPersistenceClient {
    async fn store_message(&self, message: StoredMessage) -> Result<(), PersistenceError> {
        let url = self.endpoint(&["groups", message.room_id.as_str(), "messages"]);
        let body = StoreMessageBody {
            user_id: message.user_id.as_str(),
            username: message.username.as_str(),
            content: &message.content,
        };

        self.send(self.client.post(url).json(&body)).await?;
        tracing::debug!(room_id = %message.room_id, "Message persisted");
        Ok(())
    }
}

#[async_trait]
impl ModerationListSource for HttpPersistenceClient {
    async fn banned_patterns(&self) -> Result<Vec<String>, PersistenceError> {
        parse_banned_words(&self.get_text(&["banned-words"]).await?)
    }

    async fn highlighted_users(&self) -> Result<HashMap<String, String>, PersistenceError> {
        parse_highlights(&self.get_text(&["highlighted-users"]).await?)
    }
}

fn parse_banned_words(body: &str) -> Result<Vec<String>, PersistenceError> {
    let entries: Vec<BannedWordEntry> =
        serde_json::from_str(body).map_err(|e| PersistenceError::Decode(e.to_string()))?;
    Ok(entries
        .into_iter()
        .map(|entry| match entry {
            BannedWordEntry::Plain(word) | BannedWordEntry::Row { word } => word,
        })
        .collect())
}

fn parse_highlights(body: &str) -> Result<HashMap<String, String>, PersistenceError> {
    let payload: HighlightPayload =
        serde_json::from_str(body).map_err(|e| PersistenceError::Decode(e.to_string()))?;
    Ok(match payload {
        HighlightPayload::Map(map) => map,
        HighlightPayload::Rows(rows) => rows.into_iter().map(|r| (r.username, r.color)).collect(),
    })
}
