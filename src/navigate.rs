//! Navigation capability.
//!
//! SYSTEM CONTEXT
//! ==============
//! Only the session store and route guard navigate, and only through this
//! trait. [`MemoryNavigator`] keeps the current location and a history of
//! redirects; the CLI uses it as its location bar and tests assert on it.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;

/// A navigation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Redirect {
    /// Target location.
    pub to: String,
    /// Location the user attempted before being redirected, kept so a
    /// post-login redirect can send them back.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Replace the current history entry instead of pushing one.
    pub replace: bool,
}

impl Redirect {
    #[must_use]
    pub fn replace(to: impl Into<String>, from: Option<String>) -> Self {
        Self { to: to.into(), from, replace: true }
    }
}

pub trait Navigator: Send + Sync {
    /// Current location, possibly with a query string.
    fn current_path(&self) -> String;

    fn navigate(&self, redirect: &Redirect);
}

/// Path component of a location, without query string or fragment.
#[must_use]
pub fn path_of(location: &str) -> &str {
    location.split(['?', '#']).next().unwrap_or(location)
}

// =============================================================================
// MEMORY NAVIGATOR
// =============================================================================

#[derive(Debug)]
pub struct MemoryNavigator {
    inner: Mutex<NavigatorInner>,
}

#[derive(Debug)]
struct NavigatorInner {
    current: String,
    history: Vec<Redirect>,
}

impl MemoryNavigator {
    #[must_use]
    pub fn new(start: impl Into<String>) -> Self {
        Self { inner: Mutex::new(NavigatorInner { current: start.into(), history: Vec::new() }) }
    }

    /// User-initiated move (typing a URL, clicking a link). Not recorded as a
    /// redirect.
    pub fn visit(&self, location: impl Into<String>) {
        self.lock().current = location.into();
    }

    /// Redirects issued so far, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<Redirect> {
        self.lock().history.clone()
    }

    /// Number of redirects that targeted `to`.
    #[must_use]
    pub fn redirects_to(&self, to: &str) -> usize {
        self.lock().history.iter().filter(|r| r.to == to).count()
    }

    fn lock(&self) -> MutexGuard<'_, NavigatorInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Navigator for MemoryNavigator {
    fn current_path(&self) -> String {
        self.lock().current.clone()
    }

    fn navigate(&self, redirect: &Redirect) {
        tracing::info!(to = %redirect.to, from = redirect.from.as_deref().unwrap_or(""), "navigate");
        let mut inner = self.lock();
        inner.current.clone_from(&redirect.to);
        inner.history.push(redirect.clone());
    }
}

#[cfg(test)]
#[path = "navigate_test.rs"]
mod tests;
