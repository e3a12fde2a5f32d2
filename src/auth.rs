//! Authentication collaborator. Session issuance lives elsewhere; the core
//! only resolves a bearer token to a user, treating absence as 401.

use std::collections::HashMap;

use async_trait::async_trait;
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use serde::Serialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::store::StoreError;

#[derive(Clone, Debug, Serialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub is_admin: bool,
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn resolve(&self, token: &str) -> Result<Option<User>, StoreError>;
}

/// Looks up the bearer token from request headers and resolves the caller.
pub async fn current_user(
    auth: &dyn Authenticator,
    headers: &HeaderMap,
) -> Result<User, ApiError> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)?;
    auth.resolve(token)
        .await?
        .ok_or(ApiError::Unauthorized)
}

pub async fn current_admin(
    auth: &dyn Authenticator,
    headers: &HeaderMap,
) -> Result<User, ApiError> {
    let user = current_user(auth, headers).await?;
    if !user.is_admin {
        return Err(ApiError::Forbidden);
    }
    Ok(user)
}

/// Token-table lookup against the database.
pub struct PgAuthenticator {
    pool: sqlx::PgPool,
}

impl PgAuthenticator {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Authenticator for PgAuthenticator {
    async fn resolve(&self, token: &str) -> Result<Option<User>, StoreError> {
        let row: Option<(Uuid, String, bool)> =
            sqlx::query_as("SELECT user_id, email, is_admin FROM api_tokens WHERE token = $1")
                .bind(token)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(id, email, is_admin)| User {
            id,
            email,
            is_admin,
        }))
    }
}

/// Static token map for tests and the no-database dev mode.
#[derive(Default)]
pub struct StaticAuthenticator {
    users: HashMap<String, User>,
}

impl StaticAuthenticator {
    pub fn with_user(mut self, token: impl Into<String>, user: User) -> Self {
        self.users.insert(token.into(), user);
        self
    }
}

#[async_trait]
impl Authenticator for StaticAuthenticator {
    async fn resolve(&self, token: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.get(token).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "t@example.com".into(),
            is_admin: false,
        }
    }

    #[tokio::test]
    async fn missing_header_is_unauthorized() {
        let auth = StaticAuthenticator::default();
        let headers = HeaderMap::new();
        assert!(matches!(
            current_user(&auth, &headers).await,
            Err(ApiError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn bearer_token_resolves() {
        let auth = StaticAuthenticator::default().with_user("tok", user());
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer tok"));
        assert!(current_user(&auth, &headers).await.is_ok());
    }

    #[tokio::test]
    async fn non_admin_is_forbidden() {
        let auth = StaticAuthenticator::default().with_user("tok", user());
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer tok"));
        assert!(matches!(
            current_admin(&auth, &headers).await,
            Err(ApiError::Forbidden)
        ));
    }
}
