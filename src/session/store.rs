//! Session store.
//!
//! ARCHITECTURE
//! ============
//! `SessionStore` is a cheap `Clone` handle over shared state. It owns the
//! [`Session`] (published through a watch channel), runs the four auth
//! operations against an [`AuthApi`], and is the only place that decides to
//! navigate to the login view.
//!
//! TRADE-OFFS
//! ==========
//! `check_session` is single-flight: concurrent callers share one request and
//! one outcome. `login` is not serialized against it; whichever settles last
//! writes the session.
//!
//! Auth rejections reported by the transport request a redirect; only a 401
//! also ends the session. Redirects pass through a [`RedirectGate`] and are
//! skipped when already on the login view. The gate stays raised until the
//! navigator reports the login view or the session re-authenticates, so a
//! burst of 401s yields a single navigation even with a deferred navigator.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use super::gate::RedirectGate;
use super::{AuthFailure, AuthResult, CheckOutcome, Session};
use crate::config::AuthConfig;
use crate::navigate::{Navigator, Redirect, path_of};
use crate::net::{AuthApi, AuthRejection, LoginResponse, MeResponse};
use crate::notify::{Notifier, Toast};

pub const LOGIN_FALLBACK_MESSAGE: &str = "Login failed. Please try again.";
pub const SIGNUP_FALLBACK_MESSAGE: &str = "Signup failed. Please try again.";
const LOGIN_SUCCESS_MESSAGE: &str = "Login successful!";
const SIGNUP_SUCCESS_MESSAGE: &str = "Account created successfully! Please login to continue.";
const LOGOUT_SUCCESS_MESSAGE: &str = "Logged out successfully!";

type CheckFlight = Shared<BoxFuture<'static, CheckOutcome>>;

#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

struct Inner {
    api: Arc<dyn AuthApi>,
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn Notifier>,
    login_path: String,
    home_path: String,
    state: watch::Sender<Session>,
    /// Pending `/auth/me` request shared by concurrent checks.
    check_flight: Mutex<Option<CheckFlight>>,
    redirect_gate: RedirectGate,
    /// Location remembered by the last login redirect.
    return_to: Mutex<Option<String>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn non_empty(message: Option<String>) -> Option<String> {
    message.map(|m| m.trim().to_owned()).filter(|m| !m.is_empty())
}

impl SessionStore {
    #[must_use]
    pub fn new(
        api: Arc<dyn AuthApi>,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn Notifier>,
        config: &AuthConfig,
    ) -> Self {
        let (state, _) = watch::channel(Session::unresolved());
        Self {
            inner: Arc::new(Inner {
                api,
                navigator,
                notifier,
                login_path: config.login_path.clone(),
                home_path: config.home_path.clone(),
                state,
                check_flight: Mutex::new(None),
                redirect_gate: RedirectGate::new(),
                return_to: Mutex::new(None),
            }),
        }
    }

    /// Current session value.
    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.inner.state.borrow().clone()
    }

    /// Receiver that observes every session change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.inner.state.subscribe()
    }

    #[must_use]
    pub fn login_path(&self) -> &str {
        &self.inner.login_path
    }

    /// Location a successful login will return to, if a redirect remembered one.
    #[must_use]
    pub fn return_path(&self) -> Option<String> {
        lock(&self.inner.return_to).clone()
    }

    /// Start listening for auth rejections and run the initial session check.
    ///
    /// The returned handle owns the listener; aborting it stops ambient
    /// rejection handling.
    pub async fn mount(&self) -> JoinHandle<()> {
        let listener = self.spawn_rejection_listener();
        self.check_session().await;
        listener
    }

    /// Handle every [`AuthRejection`] the API publishes from now on.
    ///
    /// The task holds only a weak reference and exits once the store is gone
    /// or the API's channel closes.
    #[must_use]
    pub fn spawn_rejection_listener(&self) -> JoinHandle<()> {
        let mut rejections = self.inner.api.subscribe_rejections();
        let weak = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            loop {
                match rejections.recv().await {
                    Ok(rejection) => {
                        let Some(inner) = weak.upgrade() else {
                            break;
                        };
                        SessionStore { inner }.handle_rejection(&rejection);
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "auth rejection reports dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            tracing::debug!("auth rejection listener stopped");
        })
    }

    /// Request a login redirect for a 401/403 seen anywhere. A 401 also ends
    /// the session; a 403 leaves it as the last check found it.
    pub fn handle_rejection(&self, rejection: &AuthRejection) {
        tracing::info!(
            status = rejection.status,
            method = %rejection.method,
            path = %rejection.path,
            "auth rejected"
        );
        if rejection.status == 401 {
            self.inner.state.send_if_modified(|s| {
                let changed = s.is_authenticated || s.user.is_some();
                s.end();
                changed
            });
        }
        let current = self.inner.navigator.current_path();
        self.inner.redirect_to_login(Some(&current));
    }

    /// Ask for a redirect to the login view, remembering `from` for after login.
    ///
    /// Returns `false` when another redirect is pending or the login view is
    /// already showing.
    pub fn redirect_to_login(&self, from: Option<&str>) -> bool {
        self.inner.redirect_to_login(from)
    }

    /// Confirm the session with `GET /auth/me`.
    ///
    /// Only a 401 ends the session; transient failures keep the previous
    /// state. Always clears the loading flag.
    pub async fn check_session(&self) -> CheckOutcome {
        let flight = {
            let mut slot = lock(&self.inner.check_flight);
            if slot.is_some() {
                tracing::debug!("joining in-flight session check");
            }
            let inner = &self.inner;
            slot.get_or_insert_with(|| {
                let inner = Arc::clone(inner);
                async move { inner.run_check().await }.boxed().shared()
            })
            .clone()
        };

        let outcome = flight.clone().await;

        let mut slot = lock(&self.inner.check_flight);
        if slot.as_ref().is_some_and(|current| current.ptr_eq(&flight)) {
            *slot = None;
        }
        outcome
    }

    /// Log in with `email` (trimmed) and `password`.
    pub async fn login(&self, email: &str, password: &str) -> AuthResult {
        let email = email.trim();
        tracing::info!("login requested");
        self.inner.state.send_modify(|s| s.is_loading = true);

        let failure = match self.inner.api.login(email, password).await {
            Ok(LoginResponse { success: true, user: Some(user), .. }) => {
                self.inner.state.send_modify(|s| {
                    s.authenticate(user.clone());
                    s.is_loading = false;
                });
                self.inner.redirect_gate.release();
                self.inner.notifier.notify(Toast::success(LOGIN_SUCCESS_MESSAGE));
                let target = self.inner.take_return_path().unwrap_or_else(|| self.inner.home_path.clone());
                self.inner.navigator.navigate(&Redirect::replace(target, None));
                return AuthResult::succeeded(Some(user));
            }
            Ok(response) => {
                tracing::warn!(success = response.success, has_user = response.user.is_some(), "login response unusable");
                AuthFailure::AuthenticationFailed(
                    non_empty(response.message).unwrap_or_else(|| LOGIN_FALLBACK_MESSAGE.to_owned()),
                )
            }
            Err(e) => {
                tracing::warn!(error = %e, "login failed");
                AuthFailure::from_api_error(&e, LOGIN_FALLBACK_MESSAGE)
            }
        };

        self.inner.state.send_modify(|s| s.is_loading = false);
        self.inner.notifier.notify(Toast::error(failure.message()));
        AuthResult::failed(failure)
    }

    /// Register an account. Never changes authentication state.
    pub async fn signup(&self, name: &str, email: &str, password: &str) -> AuthResult {
        let (name, email) = (name.trim(), email.trim());
        tracing::info!("signup requested");

        let failure = match self.inner.api.signup(name, email, password).await {
            Ok(response) if response.success => {
                self.inner.notifier.notify(Toast::success(SIGNUP_SUCCESS_MESSAGE));
                return AuthResult::succeeded(None);
            }
            Ok(response) => AuthFailure::AuthenticationFailed(
                non_empty(response.message).unwrap_or_else(|| SIGNUP_FALLBACK_MESSAGE.to_owned()),
            ),
            Err(e) => {
                tracing::warn!(error = %e, "signup failed");
                AuthFailure::from_api_error(&e, SIGNUP_FALLBACK_MESSAGE)
            }
        };

        self.inner.notifier.notify(Toast::error(failure.message()));
        AuthResult::failed(failure)
    }

    /// Log out. Local state is cleared even when the server call fails.
    pub async fn logout(&self) {
        if let Err(e) = self.inner.api.logout().await {
            tracing::warn!(error = %e, "server logout failed; clearing local session anyway");
        }
        self.inner.api.credentials().clear();
        self.inner.state.send_modify(Session::end);
        self.inner.take_return_path();
        self.inner.notifier.notify(Toast::success(LOGOUT_SUCCESS_MESSAGE));
        self.inner.redirect_to_login(None);
    }
}

impl Inner {
    async fn run_check(&self) -> CheckOutcome {
        let outcome = match self.api.me().await {
            Ok(MeResponse { success: true, user: Some(user) }) => CheckOutcome::Authenticated { user },
            Ok(response) => CheckOutcome::Retained {
                reason: format!(
                    "malformed session payload (success={}, user={})",
                    response.success,
                    response.user.is_some()
                ),
            },
            Err(e) if e.status() == Some(401) => CheckOutcome::Unauthenticated,
            Err(e) => CheckOutcome::Retained { reason: e.to_string() },
        };

        match &outcome {
            CheckOutcome::Authenticated { .. } => {
                tracing::debug!("session confirmed");
                self.redirect_gate.release();
            }
            CheckOutcome::Unauthenticated => tracing::info!("no active session"),
            CheckOutcome::Retained { reason } => tracing::warn!(%reason, "session check inconclusive; keeping state"),
        }

        self.state.send_modify(|s| {
            match &outcome {
                CheckOutcome::Authenticated { user } => s.authenticate(user.clone()),
                CheckOutcome::Unauthenticated => s.end(),
                CheckOutcome::Retained { .. } => {}
            }
            s.is_loading = false;
        });
        outcome
    }

    fn redirect_to_login(&self, from: Option<&str>) -> bool {
        if self.on_login_view() {
            // Any pending redirect has landed.
            self.redirect_gate.release();
            return false;
        }
        let Some(permit) = self.redirect_gate.try_acquire() else {
            tracing::debug!("login redirect already pending");
            return false;
        };

        let from = from.filter(|f| path_of(f) != self.login_path).map(str::to_owned);
        lock(&self.return_to).clone_from(&from);
        self.navigator.navigate(&Redirect::replace(self.login_path.clone(), from));
        if !self.on_login_view() {
            tracing::debug!("login redirect pending; holding gate");
            permit.hold();
        }
        true
    }

    fn on_login_view(&self) -> bool {
        path_of(&self.navigator.current_path()) == self.login_path
    }

    fn take_return_path(&self) -> Option<String> {
        lock(&self.return_to).take()
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
