//! User-facing notifications.
//!
//! The session store emits transient toasts (title + description) for login,
//! signup and logout outcomes. Rendering them is the host's job; the default
//! [`TracingNotifier`] writes them to the log.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToastVariant {
    Success,
    Destructive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    pub title: String,
    pub description: String,
    pub variant: ToastVariant,
}

impl Toast {
    #[must_use]
    pub fn success(description: impl Into<String>) -> Self {
        Self { title: "Success".to_owned(), description: description.into(), variant: ToastVariant::Success }
    }

    #[must_use]
    pub fn error(description: impl Into<String>) -> Self {
        Self { title: "Error".to_owned(), description: description.into(), variant: ToastVariant::Destructive }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, toast: Toast);
}

/// Logs toasts instead of rendering them.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, toast: Toast) {
        match toast.variant {
            ToastVariant::Success => tracing::info!(title = %toast.title, "{}", toast.description),
            ToastVariant::Destructive => tracing::warn!(title = %toast.title, "{}", toast.description),
        }
    }
}
