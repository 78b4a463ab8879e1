//! Shared HTTP client with bearer-token hooks.
//!
//! ARCHITECTURE
//! ============
//! Outgoing: attach `Authorization: Bearer <token>` when a token is stored and
//! the caller did not set the header explicitly.
//!
//! Incoming (success): a non-empty string `token` in the JSON body is
//! persisted, so servers can rotate tokens on any response.
//!
//! Incoming (401/403): the stored token is cleared and an [`AuthRejection`] is
//! published. The client never navigates; subscribers decide what to do.
//!
//! ERROR HANDLING
//! ==============
//! Every failure is returned to the caller as an [`ApiError`] after logging.

use std::sync::Arc;

use reqwest::Method;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::broadcast;

use super::error::{ApiError, extract_server_message};
use super::types::{AuthRejection, LoginRequest, LoginResponse, MeResponse, SignupRequest, SignupResponse};
use super::{AuthApi, LOGIN_PATH, LOGOUT_PATH, ME_PATH, SIGNUP_PATH};
use crate::config::AuthConfig;
use crate::credentials::CredentialStore;

/// Buffered rejection reports per subscriber before older ones are dropped.
const REJECTION_CHANNEL_CAPACITY: usize = 64;

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Arc<str>,
    credentials: Arc<dyn CredentialStore>,
    rejections: broadcast::Sender<AuthRejection>,
}

impl ApiClient {
    /// Build the shared client from config.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying `reqwest` client cannot be built.
    pub fn new(config: &AuthConfig, credentials: Arc<dyn CredentialStore>) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .cookie_store(true)
            .default_headers(headers)
            .build()
            .map_err(|e| ApiError::ClientBuild(e.to_string()))?;
        let (rejections, _) = broadcast::channel(REJECTION_CHANNEL_CAPACITY);

        Ok(Self { http, base_url: Arc::from(config.api_base_url.as_str()), credentials, rejections })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for an API path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    /// `GET` a JSON body.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::send`].
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send::<(), T>(Method::GET, path, None, HeaderMap::new()).await
    }

    /// `POST` a JSON body and decode a JSON response.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::send`].
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        self.send(Method::POST, path, Some(body), HeaderMap::new()).await
    }

    /// Send a request through both hooks.
    ///
    /// An `Authorization` entry in `headers` suppresses token injection.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` for 401/403, `Http` for other non-success
    /// statuses, `Timeout`/`Network` for transport failures, and `Decode` when
    /// a success body does not match `T`.
    pub async fn send<B, T>(&self, method: Method, path: &str, body: Option<&B>, headers: HeaderMap) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let mut builder = self.http.request(method.clone(), self.url(path)).headers(headers);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let mut request = builder.build().map_err(|e| ApiError::ClientBuild(e.to_string()))?;
        self.attach_token(&mut request)?;

        tracing::debug!(%method, path, "request");
        let response = match self.http.execute(request).await {
            Ok(response) => response,
            Err(e) => {
                let err = ApiError::from(e);
                tracing::warn!(%method, path, error = %err, "request failed");
                return Err(err);
            }
        };

        let value = self.handle_response(&method, path, response).await?;
        serde_json::from_value(value).map_err(|e| {
            tracing::warn!(%method, path, error = %e, "response shape mismatch");
            ApiError::Decode(e.to_string())
        })
    }

    /// Outgoing hook.
    fn attach_token(&self, request: &mut reqwest::Request) -> Result<(), ApiError> {
        if request.headers().contains_key(AUTHORIZATION) {
            return Ok(());
        }
        if let Some(token) = self.credentials.get() {
            let mut value =
                HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| ApiError::InvalidHeader(e.to_string()))?;
            value.set_sensitive(true);
            request.headers_mut().insert(AUTHORIZATION, value);
        }
        Ok(())
    }

    /// Incoming hook. Returns the body as JSON on success.
    async fn handle_response(&self, method: &Method, path: &str, response: reqwest::Response) -> Result<Value, ApiError> {
        let status = response.status().as_u16();
        let text = response.text().await.map_err(ApiError::from)?;

        if (200..300).contains(&status) {
            tracing::debug!(%method, path, status, "response");
            let body = parse_body(text);
            self.capture_token(&body);
            return Ok(body);
        }

        let message = extract_server_message(&text);
        tracing::warn!(%method, path, status, message = message.as_deref().unwrap_or(""), "request rejected");

        if status == 401 || status == 403 {
            self.credentials.clear();
            let rejection = AuthRejection { status, method: method.to_string(), path: path.to_owned() };
            if self.rejections.send(rejection).is_err() {
                tracing::debug!(status, path, "auth rejection had no subscribers");
            }
            return Err(ApiError::Unauthorized { status, message });
        }
        Err(ApiError::Http { status, message })
    }

    /// Persist a rotated token carried in a success body.
    fn capture_token(&self, body: &Value) {
        if let Some(token) = body.get("token").and_then(Value::as_str) {
            if !token.is_empty() {
                tracing::debug!("storing token from response");
                self.credentials.set(token);
            }
        }
    }
}

#[async_trait::async_trait]
impl AuthApi for ApiClient {
    async fn me(&self) -> Result<MeResponse, ApiError> {
        self.get_json(ME_PATH).await
    }

    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        self.post_json(LOGIN_PATH, &LoginRequest { email, password }).await
    }

    async fn signup(&self, name: &str, email: &str, password: &str) -> Result<SignupResponse, ApiError> {
        self.post_json(SIGNUP_PATH, &SignupRequest { name, email, password }).await
    }

    async fn logout(&self) -> Result<(), ApiError> {
        self.send::<(), serde::de::IgnoredAny>(Method::POST, LOGOUT_PATH, None, HeaderMap::new())
            .await
            .map(|_| ())
    }

    fn subscribe_rejections(&self) -> broadcast::Receiver<AuthRejection> {
        self.rejections.subscribe()
    }

    fn credentials(&self) -> Arc<dyn CredentialStore> {
        Arc::clone(&self.credentials)
    }
}

fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim().trim_start_matches('/');
    if path.is_empty() { base.to_owned() } else { format!("{base}/{path}") }
}

/// Decode a success body; non-JSON bodies become a JSON string, empty ones `null`.
fn parse_body(text: String) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
