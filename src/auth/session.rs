use serde::{Deserialize, Serialize};
use std::fmt;

use crate::auth::token_store::TokenStore;
use crate::error::{Error, Result};

/// Bearer credential handed out by the backend. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw value, for the `Authorization` header only.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(<redacted>)")
    }
}

/// Body of `POST /login`.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Reply of `POST /login`.
#[derive(Debug, Default, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Owns the token lifecycle: created by a successful login, read by every
/// authenticated call, destroyed on logout, failed login or server rejection.
pub struct SessionManager {
    store: Box<dyn TokenStore>,
}

impl SessionManager {
    pub fn new(store: Box<dyn TokenStore>) -> Self {
        Self { store }
    }

    /// Turns a login reply into a stored session. Any reply without a token
    /// also wipes the previous session.
    pub fn establish(&self, reply: LoginResponse) -> Result<SessionToken> {
        match reply.token.filter(|t| !t.is_empty()) {
            Some(token) if reply.success => {
                self.store.save(&token)?;
                log::info!("session established");
                Ok(SessionToken(token))
            }
            _ => {
                let message = reply
                    .error
                    .filter(|e| !e.trim().is_empty())
                    .unwrap_or_else(|| "Login failed".to_string());
                self.reject(message)
            }
        }
    }

    /// Records a failed (re-)authentication.
    pub fn reject(&self, message: String) -> Result<SessionToken> {
        log::warn!("login rejected: {message}");
        self.store.clear()?;
        Err(Error::Auth(message))
    }

    pub fn current_token(&self) -> Result<Option<SessionToken>> {
        Ok(self.store.load()?.map(SessionToken))
    }

    /// Token for an authenticated call, or `Unauthenticated` when logged out.
    pub fn require_token(&self) -> Result<SessionToken> {
        self.current_token()?.ok_or(Error::Unauthenticated)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.current_token(), Ok(Some(_)))
    }

    pub fn invalidate(&self) -> Result<()> {
        log::info!("session invalidated");
        self.store.clear()
    }
}
