//! Route guard for protected locations.
//!
//! SYSTEM CONTEXT
//! ==============
//! A guard wraps one protected location. While the session is loading it
//! shows a placeholder and does nothing else. Once resolved it either renders
//! or redirects to the login view, remembering the attempted location.
//!
//! An unauthenticated result triggers one extra session check per
//! unauthenticated episode, to recover from a transient false negative. The
//! retry budget resets only after the guard sees an authenticated session,
//! which bounds the redirect/retry cycle.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;

use crate::navigate::Redirect;
use crate::session::{Session, SessionStore};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GuardDecision {
    /// Session unresolved; show a spinner, issue no navigation.
    Placeholder,
    /// Not authenticated; go to the login view.
    Redirect(Redirect),
    /// Authenticated; show the protected content.
    Render,
}

pub struct RouteGuard {
    store: SessionStore,
    location: String,
    retried: AtomicBool,
}

impl RouteGuard {
    #[must_use]
    pub fn new(store: SessionStore, location: impl Into<String>) -> Self {
        Self { store, location: location.into(), retried: AtomicBool::new(false) }
    }

    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Pure decision for `session` at `location`.
    #[must_use]
    pub fn decide(session: &Session, location: &str, login_path: &str) -> GuardDecision {
        if session.is_loading {
            GuardDecision::Placeholder
        } else if session.is_authenticated {
            GuardDecision::Render
        } else {
            GuardDecision::Redirect(Redirect::replace(login_path, Some(location.to_owned())))
        }
    }

    /// Decide against the current session and apply the side effects.
    pub async fn evaluate(&self) -> GuardDecision {
        let session = self.store.snapshot();
        let decision = Self::decide(&session, &self.location, self.store.login_path());

        match &decision {
            GuardDecision::Placeholder => {}
            GuardDecision::Render => self.retried.store(false, Ordering::Release),
            GuardDecision::Redirect(_) => {
                self.store.redirect_to_login(Some(&self.location));
                if !self.retried.swap(true, Ordering::AcqRel) {
                    tracing::debug!(location = %self.location, "retrying session check once");
                    self.store.check_session().await;
                }
            }
        }
        decision
    }

    /// Wait until the session is resolved, then evaluate.
    pub async fn resolve(&self) -> GuardDecision {
        let mut changes = self.store.subscribe();
        let resolved = changes.wait_for(|s| !s.is_loading).await.is_ok();
        if !resolved {
            tracing::warn!("session store dropped while waiting for resolution");
        }
        self.evaluate().await
    }
}

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;
