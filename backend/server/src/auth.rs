//! # Authentication
//!
//! Tokens are issued by the external identity service, this server only resolves them.
//!
//! - Request carries `Authorization: Bearer <token>`
//! - Session lives at `roomify_session_<token>` as `{ "uuid": "<user id>" }`
//! - No header, or not a bearer header: `401 Unauthorized: Authentication Failed`
//! - Token that resolves to nobody, or whose lookup fails: `401 Unauthorized: User Not Found`
//!
//! Both checks run before any project key is touched.
use std::{convert::Infallible, fmt, sync::Arc};

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};
use serde_json::Value;
use tracing::warn;

use crate::{
    database::{KvStore, StoreError, UserStore},
    error::AppError,
    state::State,
};

pub const SESSION_PREFIX: &str = "roomify_session_";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, token: &str) -> Result<Option<UserId>, StoreError>;
}

/// Looks sessions up in the shared store.
pub struct SessionIdentity {
    sessions: Arc<dyn KvStore>,
}

impl SessionIdentity {
    pub fn new(sessions: Arc<dyn KvStore>) -> Self {
        Self { sessions }
    }
}

pub fn session_key(token: &str) -> String {
    format!("{SESSION_PREFIX}{token}")
}

#[async_trait]
impl IdentityResolver for SessionIdentity {
    async fn resolve(&self, token: &str) -> Result<Option<UserId>, StoreError> {
        let session = self.sessions.get(&session_key(token)).await?;

        Ok(session
            .as_ref()
            .and_then(|session| session.get("uuid"))
            .and_then(Value::as_str)
            .filter(|uuid| !uuid.is_empty())
            .map(UserId::new))
    }
}

/// Everything a handler may learn about its caller.
pub struct RequestContext {
    token: Option<String>,
    identity: Arc<dyn IdentityResolver>,
    store: Arc<dyn KvStore>,
}

impl FromRequestParts<Arc<State>> for RequestContext {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<State>,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self {
            token: bearer_token(&parts.headers),
            identity: state.identity.clone(),
            store: state.store.clone(),
        })
    }
}

impl RequestContext {
    /// Absent when there is no token, the token is unknown, or the lookup failed.
    pub async fn identity(&self) -> Option<UserId> {
        let token = self.token.as_deref()?;

        match self.identity.resolve(token).await {
            Ok(user_id) => user_id,
            Err(e) => {
                warn!("Identity lookup failed: {e}");
                None
            }
        }
    }

    pub fn store(&self, user_id: &UserId) -> UserStore {
        UserStore::new(self.store.clone(), user_id.as_str())
    }

    pub async fn authorize(&self) -> Result<UserContext, AppError> {
        if self.token.is_none() {
            return Err(AppError::AuthenticationFailed);
        }

        let user_id = self.identity().await.ok_or(AppError::UserNotFound)?;
        let store = self.store(&user_id);

        Ok(UserContext { user_id, store })
    }
}

pub struct UserContext {
    user_id: UserId,
    store: UserStore,
}

impl UserContext {
    pub fn identity(&self) -> &UserId {
        &self.user_id
    }

    pub fn store(&self) -> &UserStore {
        &self.store
    }
}

pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}
