//! Session state and the operations that mutate it.
//!
//! DESIGN
//! ======
//! `Session` is owned by [`SessionStore`] and published through a
//! `tokio::sync::watch` channel; consumers read snapshots or subscribe.
//! Operations never return errors. Login and signup resolve to an
//! [`AuthResult`], the session check to a [`CheckOutcome`], logout to a
//! cleared session.

pub mod gate;
pub mod store;

use serde::Serialize;

use crate::net::{ApiError, UserRecord};

pub use gate::RedirectGate;
pub use store::SessionStore;

// =============================================================================
// SESSION
// =============================================================================

/// Client-held belief about the current user's authentication status.
///
/// `is_authenticated` implies `user.is_some()`. While `is_loading` is set,
/// `is_authenticated` is the last known value and not a trustworthy answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    pub user: Option<UserRecord>,
    pub is_authenticated: bool,
    pub is_loading: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self::unresolved()
    }
}

impl Session {
    /// Initial state before the first session check settles.
    #[must_use]
    pub fn unresolved() -> Self {
        Self { user: None, is_authenticated: false, is_loading: true }
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        if self.is_loading {
            SessionPhase::Unresolved
        } else if self.is_authenticated {
            SessionPhase::Authenticated
        } else {
            SessionPhase::Unauthenticated
        }
    }

    pub(crate) fn authenticate(&mut self, user: UserRecord) {
        self.user = Some(user);
        self.is_authenticated = true;
    }

    pub(crate) fn end(&mut self) {
        self.user = None;
        self.is_authenticated = false;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Unresolved,
    Authenticated,
    Unauthenticated,
}

// =============================================================================
// RESULTS
// =============================================================================

/// Failure surfaced to the UI. The payload is the display string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum AuthFailure {
    /// Rejected credentials or a malformed login/signup response.
    #[error("{0}")]
    AuthenticationFailed(String),

    /// Transport failure or server-side error.
    #[error("{0}")]
    NetworkOrServerError(String),
}

impl AuthFailure {
    /// Classify a transport error, picking the message in priority order:
    /// server-provided message, the error's own message, then `fallback`.
    #[must_use]
    pub fn from_api_error(err: &ApiError, fallback: &str) -> Self {
        let message = err
            .server_message()
            .map(str::to_owned)
            .or_else(|| Some(err.to_string()).filter(|m| !m.trim().is_empty()))
            .unwrap_or_else(|| fallback.to_owned());
        if err.is_server_side() {
            Self::NetworkOrServerError(message)
        } else {
            Self::AuthenticationFailed(message)
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::AuthenticationFailed(m) | Self::NetworkOrServerError(m) => m,
        }
    }
}

/// `{success, message?, user?}` result returned by login and signup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<AuthFailure>,
}

impl AuthResult {
    #[must_use]
    pub fn succeeded(user: Option<UserRecord>) -> Self {
        Self { success: true, message: None, user, failure: None }
    }

    #[must_use]
    pub fn failed(failure: AuthFailure) -> Self {
        Self { success: false, message: Some(failure.message().to_owned()), user: None, failure: Some(failure) }
    }
}

/// What a session check concluded.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CheckOutcome {
    /// The backend confirmed the session.
    Authenticated { user: UserRecord },
    /// The backend answered 401.
    Unauthenticated,
    /// Anything else; the previous authentication state was kept.
    Retained { reason: String },
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;

#[cfg(test)]
#[path = "mock_test.rs"]
pub(crate) mod mock;
