use crate::entities::users;
use crate::services::user_store::UserStore;
use crate::utils::auth::validate_jwt;
use axum::http::{HeaderMap, header};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("No session")]
    Missing,

    #[error("Invalid session: {0}")]
    Invalid(String),

    #[error("Session user {0} no longer exists")]
    UnknownUser(i32),

    #[error(transparent)]
    Database(#[from] sea_orm::DbErr),
}

/// Maps the caller's session token to a row in `users`.
///
/// The token is read from the session cookie first and then from an
/// `Authorization: Bearer` header.
pub struct SessionResolver {
    users: UserStore,
    secret: String,
    cookie_name: String,
}

impl SessionResolver {
    pub fn new(users: UserStore, secret: impl Into<String>, cookie_name: impl Into<String>) -> Self {
        Self {
            users,
            secret: secret.into(),
            cookie_name: cookie_name.into(),
        }
    }

    pub fn token_from_headers(&self, headers: &HeaderMap) -> Option<String> {
        let from_cookie = headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, value)| *name == self.cookie_name && !value.is_empty())
            .map(|(_, value)| value.to_string());

        from_cookie.or_else(|| {
            headers
                .get(header::AUTHORIZATION)
                .and_then(|h| h.to_str().ok())
                .and_then(|h| h.strip_prefix("Bearer "))
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
    }

    pub async fn user_for_session(&self, headers: &HeaderMap) -> Result<users::Model, SessionError> {
        let token = self.token_from_headers(headers).ok_or(SessionError::Missing)?;

        let claims =
            validate_jwt(&token, &self.secret).map_err(|e| SessionError::Invalid(e.to_string()))?;
        let user_id = claims
            .user_id()
            .map_err(|e| SessionError::Invalid(e.to_string()))?;

        self.users
            .find_by_id(user_id)
            .await?
            .ok_or(SessionError::UnknownUser(user_id))
    }

    /// `Set-Cookie` value that drops the session cookie on the client.
    pub fn clear_cookie(&self) -> String {
        format!("{}=; Path=/; Max-Age=0; HttpOnly", self.cookie_name)
    }
}
