//! Transport layer for the auth backend.
//!
//! DESIGN
//! ======
//! `ApiClient` wraps one shared `reqwest::Client` and runs every request
//! through the same outgoing hook (bearer token) and incoming hook (token
//! rotation, auth-rejection reporting). The session store talks to it through
//! the [`AuthApi`] trait so store logic can be exercised against a mock.

pub mod client;
pub mod error;
pub mod types;

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::credentials::CredentialStore;

pub use client::ApiClient;
pub use error::ApiError;
pub use types::{AuthRejection, LoginResponse, MeResponse, SignupResponse, UserRecord};

pub const ME_PATH: &str = "/auth/me";
pub const LOGIN_PATH: &str = "/auth/login";
pub const SIGNUP_PATH: &str = "/auth/signup";
pub const LOGOUT_PATH: &str = "/auth/logout";

/// The four auth endpoints plus the hooks the session store depends on.
#[async_trait::async_trait]
pub trait AuthApi: Send + Sync {
    /// `GET /auth/me`.
    async fn me(&self) -> Result<MeResponse, ApiError>;

    /// `POST /auth/login` with an already-trimmed email.
    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError>;

    /// `POST /auth/signup` with already-trimmed name and email.
    async fn signup(&self, name: &str, email: &str, password: &str) -> Result<SignupResponse, ApiError>;

    /// `POST /auth/logout`. The response body is ignored.
    async fn logout(&self) -> Result<(), ApiError>;

    /// Subscribe to 401/403 reports from every call made through this API.
    fn subscribe_rejections(&self) -> broadcast::Receiver<AuthRejection>;

    /// Credential store the outgoing hook reads from.
    fn credentials(&self) -> Arc<dyn CredentialStore>;
}
