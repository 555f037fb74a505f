//! Login, logout, and token-to-user resolution.

use std::sync::Arc;
use thiserror::Error;

use crate::auth::password;
use crate::auth::tokens::TokenStore;
use crate::directory::{DirectoryError, PublicUser, UserDirectory};

/// Well-formed bcrypt hash compared against when the username is unknown,
/// so that path costs roughly as much as a real verification.
const DUMMY_BCRYPT_HASH: &str = "$2a$10$N9qo8uLOickgx2ZMRZoMyeIjZAgcfl7p92ldGxad68LJZdL17lhWy";

/// Caller-visible authentication failure.
///
/// Unknown user and wrong password intentionally share one variant, and
/// therefore one message, so responses cannot be used to enumerate
/// usernames.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing credentials")]
    MissingCredentials,
    #[error("Invalid username or password")]
    InvalidCredentials,
    /// Directory failure, surfaced as a generic message; detail stays in
    /// the logs.
    #[error("Authentication service unavailable")]
    Directory(#[from] DirectoryError),
}

impl AuthError {
    /// HTTP status the gateway maps this error to.
    pub fn status(&self) -> u16 {
        match self {
            AuthError::MissingCredentials => 400,
            AuthError::InvalidCredentials => 401,
            AuthError::Directory(_) => 500,
        }
    }
}

/// Login request fields as received from the caller.
#[derive(Debug, Clone)]
pub struct LoginCredentials {
    pub username: String,
    pub password: String,
}

/// Successful login: a fresh bearer token plus the public user record.
#[derive(Debug, Clone)]
pub struct LoginSuccess {
    pub token: String,
    pub user: PublicUser,
}

/// Orchestrates credential verification and the token lifecycle over an
/// injected directory and token store.
pub struct AuthService {
    directory: Arc<dyn UserDirectory>,
    tokens: Arc<TokenStore>,
}

impl AuthService {
    pub fn new(directory: Arc<dyn UserDirectory>, tokens: Arc<TokenStore>) -> Self {
        Self { directory, tokens }
    }

    /// Verify credentials and issue a bearer token.
    ///
    /// Stateless request/response: no retries, no multi-step protocol, and
    /// token issuance is a single atomic insert.
    pub async fn login(&self, credentials: LoginCredentials) -> Result<LoginSuccess, AuthError> {
        let username = credentials.username.trim();
        if username.is_empty() || credentials.password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        tracing::info!(username, "login attempt");

        let user = match self.directory.find_by_username(username).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                // Burn comparable time before answering, then answer exactly
                // as for a wrong password.
                let _ = password::verify_password(&credentials.password, Some(DUMMY_BCRYPT_HASH));
                tracing::info!(username, "login rejected: no such user");
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => {
                tracing::warn!(username, error = %e, "directory lookup failed");
                return Err(e.into());
            }
        };

        if !password::verify_password(&credentials.password, user.password_hash.as_deref()) {
            tracing::info!(username, user_id = %user.id, "login rejected: bad password");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.tokens.issue(&user.id);
        tracing::info!(username, user_id = %user.id, "login succeeded");

        Ok(LoginSuccess {
            token,
            user: user.to_public(),
        })
    }

    /// Revoke a token if one was supplied. Idempotent and infallible from
    /// the caller's point of view: absent, malformed, unknown, and
    /// already-revoked tokens all degrade to success.
    pub fn logout(&self, token: Option<&str>) {
        if let Some(token) = token {
            self.tokens.revoke(token);
        }
    }

    /// Resolve a bearer token to the current public user record.
    ///
    /// `Ok(None)` means "no authenticated user": an unknown token, or a
    /// user record deleted since issuance. Both are valid anonymous states,
    /// not errors; only directory failures are.
    pub async fn current_user(&self, token: &str) -> Result<Option<PublicUser>, AuthError> {
        let Some(user_id) = self.tokens.resolve(token) else {
            return Ok(None);
        };
        let user = self.directory.find_by_id(&user_id).await?;
        Ok(user.map(|u| u.to_public()))
    }

    /// Number of live tokens, for the health endpoint.
    pub fn active_tokens(&self) -> usize {
        self.tokens.active_tokens()
    }
}
