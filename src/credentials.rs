//! Bearer-token persistence.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every outgoing request reads the token and every auth rejection clears it,
//! so the store is injected as `Arc<dyn CredentialStore>` rather than reached
//! through ambient global state. Tests use [`MemoryCredentials`]; the CLI uses
//! [`FileCredentials`] so the token survives between runs.
//!
//! ERROR HANDLING
//! ==============
//! Like browser local storage, the trait is infallible. File I/O failures are
//! logged and treated as "no token".

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::{Map, Value};

/// Key the token is stored under.
pub const TOKEN_KEY: &str = "authToken";

/// Get/set/clear access to the persisted bearer token.
pub trait CredentialStore: Send + Sync {
    fn get(&self) -> Option<String>;
    fn set(&self, token: &str);
    fn clear(&self);
}

// =============================================================================
// IN-MEMORY
// =============================================================================

#[derive(Debug, Default)]
pub struct MemoryCredentials {
    token: Mutex<Option<String>>,
}

impl MemoryCredentials {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_token(token: &str) -> Self {
        Self { token: Mutex::new(Some(token.to_owned())) }
    }

    fn slot(&self) -> MutexGuard<'_, Option<String>> {
        self.token.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CredentialStore for MemoryCredentials {
    fn get(&self) -> Option<String> {
        self.slot().clone()
    }

    fn set(&self, token: &str) {
        *self.slot() = Some(token.to_owned());
    }

    fn clear(&self) {
        *self.slot() = None;
    }
}

// =============================================================================
// FILE-BACKED
// =============================================================================

/// Token persisted as `{"authToken": "<token>"}` in a JSON file.
///
/// Other keys in the file are preserved on write so the file can be shared
/// with other local state.
#[derive(Debug)]
pub struct FileCredentials {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileCredentials {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), lock: Mutex::new(()) }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Map<String, Value> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Map::new(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "token file unreadable");
                return Map::new();
            }
        };
        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => map,
            Ok(_) | Err(_) => {
                tracing::warn!(path = %self.path.display(), "token file is not a JSON object; ignoring");
                Map::new()
            }
        }
    }

    fn write_map(&self, map: &Map<String, Value>) {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(e) = fs::create_dir_all(parent) {
                    tracing::warn!(path = %parent.display(), error = %e, "token directory create failed");
                    return;
                }
            }
        }
        let raw = match serde_json::to_string_pretty(map) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "token encode failed");
                return;
            }
        };
        if let Err(e) = fs::write(&self.path, raw) {
            tracing::warn!(path = %self.path.display(), error = %e, "token file write failed");
        }
    }
}

impl CredentialStore for FileCredentials {
    fn get(&self) -> Option<String> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.read_map()
            .get(TOKEN_KEY)
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .map(str::to_owned)
    }

    fn set(&self, token: &str) {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut map = self.read_map();
        map.insert(TOKEN_KEY.to_owned(), Value::String(token.to_owned()));
        self.write_map(&map);
    }

    fn clear(&self) {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut map = self.read_map();
        if map.remove(TOKEN_KEY).is_some() {
            self.write_map(&map);
        }
    }
}

#[cfg(test)]
#[path = "credentials_test.rs"]
mod tests;
