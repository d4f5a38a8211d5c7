//! Token and identity collaborators
//!
//! The realtime layer never logs in. It reads an opaque token through a
//! [`TokenSource`] and resolves "who am I" through an [`IdentitySource`].

use crate::domain::UserId;
use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use thiserror::Error;
use tracing::{debug, warn};

/// Key the login flow stores the session token under
pub const AUTH_TOKEN_KEY: &str = "auth-token";

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("No auth token available")]
    NoToken,

    #[error("Token rejected with status {0}")]
    Unauthorized(u16),

    #[error("API error: {0}")]
    ApiError(String),
}

pub type Result<T> = std::result::Result<T, IdentityError>;

// =============================================================================
// Tokens
// =============================================================================

/// Synchronous accessor for the current auth token
pub trait TokenSource: Send + Sync {
    fn token(&self) -> Option<String>;

    /// Forget the token after the server rejected it
    fn clear(&self) {}
}

/// Process-wide in-memory key/value store
#[derive(Debug, Clone)]
pub struct KeyValueStore {
    entries: Arc<RwLock<HashMap<String, String>>>,
    token_key: String,
}

impl KeyValueStore {
    pub fn new() -> Self {
        Self::with_token_key(AUTH_TOKEN_KEY)
    }

    pub fn with_token_key(token_key: impl Into<String>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            token_key: token_key.into(),
        }
    }

    /// The shared store for this process
    pub fn global() -> &'static KeyValueStore {
        static GLOBAL: OnceLock<KeyValueStore> = OnceLock::new();
        GLOBAL.get_or_init(KeyValueStore::new)
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.write().insert(key.into(), value.into());
    }

    pub fn remove(&self, key: &str) -> Option<String> {
        self.entries.write().remove(key)
    }

    pub fn set_token(&self, token: impl Into<String>) {
        self.set(self.token_key.clone(), token);
    }
}

impl Default for KeyValueStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenSource for KeyValueStore {
    fn token(&self) -> Option<String> {
        self.get(&self.token_key).filter(|t| !t.is_empty())
    }

    fn clear(&self) {
        if self.remove(&self.token_key).is_some() {
            debug!(key = %self.token_key, "Cleared stored auth token");
        }
    }
}

/// A fixed token, or none
#[derive(Debug, Clone, Default)]
pub struct StaticToken(pub Option<String>);

impl TokenSource for StaticToken {
    fn token(&self) -> Option<String> {
        self.0.clone()
    }
}

// =============================================================================
// Identity
// =============================================================================

/// The signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: UserId,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Resolves the current user, or fails
#[async_trait]
pub trait IdentitySource: Send + Sync {
    async fn current_user(&self) -> Result<Identity>;
}

/// `GET {api}/api/v1/auth/me` with the stored bearer token
pub struct HttpIdentity {
    base_url: String,
    client: Client,
    tokens: Arc<dyn TokenSource>,
}

impl HttpIdentity {
    pub fn new(base_url: impl Into<String>, tokens: Arc<dyn TokenSource>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: Client::new(),
            tokens,
        }
    }

    fn me_url(&self) -> String {
        format!("{}/api/v1/auth/me", self.base_url)
    }
}

#[async_trait]
impl IdentitySource for HttpIdentity {
    async fn current_user(&self) -> Result<Identity> {
        let token = self.tokens.token().ok_or(IdentityError::NoToken)?;

        let response = self
            .client
            .get(self.me_url())
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            warn!(%status, "Auth token rejected, clearing it");
            self.tokens.clear();
            return Err(IdentityError::Unauthorized(status.as_u16()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IdentityError::ApiError(format!("{}: {}", status, body)));
        }

        let identity = response.json::<Identity>().await?;
        debug!(user_id = %identity.id, "Resolved current user");
        Ok(identity)
    }
}

/// A fixed identity, or a failure when `None`
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity(pub Option<Identity>);

impl StaticIdentity {
    pub fn user(id: i64) -> Self {
        Self(Some(Identity {
            id: UserId(id),
            username: None,
            display_name: None,
        }))
    }
}

#[async_trait]
impl IdentitySource for StaticIdentity {
    async fn current_user(&self) -> Result<Identity> {
        self.0.clone().ok_or(IdentityError::NoToken)
    }
}
