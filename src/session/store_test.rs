use std::time::Duration;

use super::*;
use crate::credentials::CredentialStore;
use crate::net::{ApiError, SignupResponse};
use crate::notify::ToastVariant;
use crate::session::SessionPhase;
use crate::session::mock::{
    Call, DeferredNavigator, Harness, MockApi, me_ok, settle, store_with, unauthorized, user, wait_until,
};

// =============================================================================
// check_session
// =============================================================================

#[tokio::test]
async fn check_success_authenticates_with_exact_user() {
    let h = Harness::new(MockApi::new().with_me(me_ok("a@b.com")), "/");

    let outcome = h.store.check_session().await;

    assert_eq!(outcome, CheckOutcome::Authenticated { user: user("a@b.com") });
    let session = h.store.snapshot();
    assert_eq!(session.user, Some(user("a@b.com")));
    assert!(session.is_authenticated);
    assert!(!session.is_loading);
    assert_eq!(session.phase(), SessionPhase::Authenticated);
}

#[tokio::test]
async fn check_server_error_keeps_authenticated_state() {
    let h = Harness::new(
        MockApi::new()
            .with_me(me_ok("a@b.com"))
            .with_me(Err(ApiError::Http { status: 500, message: None })),
        "/",
    );
    h.store.check_session().await;

    let outcome = h.store.check_session().await;

    assert!(matches!(outcome, CheckOutcome::Retained { .. }));
    let session = h.store.snapshot();
    assert!(session.is_authenticated);
    assert_eq!(session.user, Some(user("a@b.com")));
    assert!(!session.is_loading);
}

#[tokio::test]
async fn check_timeout_keeps_state_and_clears_loading() {
    let h = Harness::new(MockApi::new().with_me(Err(ApiError::Timeout)), "/");

    let outcome = h.store.check_session().await;

    assert_eq!(outcome, CheckOutcome::Retained { reason: "request timed out".into() });
    let session = h.store.snapshot();
    assert!(!session.is_authenticated);
    assert!(!session.is_loading);
}

#[tokio::test]
async fn check_malformed_payload_keeps_state() {
    let h = Harness::new(
        MockApi::new()
            .with_me(me_ok("a@b.com"))
            .with_me(Ok(MeResponse { success: true, user: None })),
        "/",
    );
    h.store.check_session().await;

    let outcome = h.store.check_session().await;

    assert!(matches!(outcome, CheckOutcome::Retained { .. }));
    assert!(h.store.snapshot().is_authenticated);
}

#[tokio::test]
async fn check_unauthorized_ends_session() {
    let h = Harness::new(MockApi::new().with_me(me_ok("a@b.com")).with_me(Err(unauthorized())), "/");
    h.store.check_session().await;

    let outcome = h.store.check_session().await;

    assert_eq!(outcome, CheckOutcome::Unauthenticated);
    let session = h.store.snapshot();
    assert!(!session.is_authenticated);
    assert!(session.user.is_none());
    assert_eq!(session.phase(), SessionPhase::Unauthenticated);
}

#[tokio::test]
async fn concurrent_checks_share_one_request() {
    let h = Harness::new(
        MockApi::new()
            .with_me(me_ok("a@b.com"))
            .with_me_delay(Duration::from_millis(30)),
        "/",
    );

    let (a, b, c) = tokio::join!(h.store.check_session(), h.store.check_session(), h.store.check_session());

    assert_eq!(h.api.me_calls(), 1);
    assert_eq!(a, b);
    assert_eq!(b, c);
    assert!(matches!(a, CheckOutcome::Authenticated { .. }));

    // A settled flight is not reused.
    h.store.check_session().await;
    assert_eq!(h.api.me_calls(), 2);
}

#[tokio::test]
async fn subscribers_observe_resolution() {
    let h = Harness::new(MockApi::new().with_me(me_ok("a@b.com")), "/");
    let mut changes = h.store.subscribe();
    assert!(changes.borrow().is_loading);

    h.store.check_session().await;

    assert!(changes.has_changed().unwrap());
    let session = changes.borrow_and_update().clone();
    assert!(session.is_authenticated);
    assert!(!session.is_loading);
}

// =============================================================================
// mount / rejection handling
// =============================================================================

#[tokio::test]
async fn mount_resolves_and_redirects_on_401() {
    let h = Harness::new(MockApi::new(), "/dashboard");

    let listener = h.store.mount().await;
    wait_until(|| h.nav.redirects_to("/login") == 1).await;

    assert_eq!(h.store.snapshot().phase(), SessionPhase::Unauthenticated);
    assert_eq!(h.api.credentials.get(), None);
    assert_eq!(h.store.return_path().as_deref(), Some("/dashboard"));
    listener.abort();
}

#[tokio::test]
async fn burst_of_rejections_navigates_once() {
    let h = Harness::new(MockApi::new().with_me(me_ok("a@b.com")), "/dashboard");
    h.store.check_session().await;
    let listener = h.store.spawn_rejection_listener();

    let api = Arc::clone(&h.api);
    let burst = (0..10).map(|_| {
        let api = Arc::clone(&api);
        async move { api.me().await }
    });
    let results = futures::future::join_all(burst).await;
    assert!(results.iter().all(|r| matches!(r, Err(ApiError::Unauthorized { status: 401, .. }))));

    wait_until(|| h.nav.redirects_to("/login") >= 1).await;
    settle().await;

    assert_eq!(h.nav.redirects_to("/login"), 1);
    assert_eq!(h.nav.current_path(), "/login");
    assert!(!h.store.snapshot().is_authenticated);
    assert_eq!(h.api.credentials.get(), None);
    listener.abort();
}

#[tokio::test]
async fn rejection_on_login_view_does_not_navigate() {
    let h = Harness::new(MockApi::new(), "/login");

    h.store.handle_rejection(&AuthRejection { status: 403, method: "GET".into(), path: "/reports".into() });

    assert!(h.nav.history().is_empty());
    assert!(!h.store.snapshot().is_authenticated);
}

#[tokio::test]
async fn rejection_remembers_attempted_location() {
    let h = Harness::new(MockApi::new(), "/reports?page=2");

    h.store.handle_rejection(&AuthRejection { status: 401, method: "GET".into(), path: "/reports".into() });

    let history = h.nav.history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].to, "/login");
    assert_eq!(history[0].from.as_deref(), Some("/reports?page=2"));
    assert!(history[0].replace);
}

#[tokio::test]
async fn listener_exits_when_store_dropped() {
    let Harness { api, store, .. } = Harness::new(MockApi::new(), "/dashboard");
    let listener = store.spawn_rejection_listener();
    drop(store);

    let _ = api.me().await;

    tokio::time::timeout(Duration::from_secs(1), listener).await.unwrap().unwrap();
}

#[tokio::test]
async fn forbidden_check_keeps_session_but_redirects() {
    let h = Harness::new(
        MockApi::new()
            .with_me(me_ok("a@b.com"))
            .with_me(Err(ApiError::Unauthorized { status: 403, message: None })),
        "/reports",
    );
    let listener = h.store.mount().await;
    assert!(h.store.snapshot().is_authenticated);

    let outcome = h.store.check_session().await;
    wait_until(|| h.nav.redirects_to("/login") == 1).await;
    settle().await;

    assert!(matches!(outcome, CheckOutcome::Retained { .. }));
    let session = h.store.snapshot();
    assert!(session.is_authenticated);
    assert_eq!(session.user, Some(user("a@b.com")));
    assert_eq!(h.api.credentials.get(), None);
    assert_eq!(h.nav.redirects_to("/login"), 1);
    assert_eq!(h.store.return_path().as_deref(), Some("/reports"));
    listener.abort();
}

#[tokio::test]
async fn deferred_redirect_holds_gate_until_it_lands() {
    let api = Arc::new(MockApi::new());
    let nav = Arc::new(DeferredNavigator::new("/dashboard"));
    let store = store_with(&api, Arc::clone(&nav) as Arc<dyn Navigator>);
    let rejection = AuthRejection { status: 401, method: "GET".into(), path: "/auth/me".into() };

    for _ in 0..3 {
        store.handle_rejection(&rejection);
    }
    assert_eq!(nav.requested(), 1);

    nav.land();
    store.handle_rejection(&rejection);
    assert_eq!(nav.requested(), 1);

    // Landing lowered the gate; leaving the login view allows a new redirect.
    nav.visit("/reports");
    store.handle_rejection(&rejection);
    assert_eq!(nav.requested(), 2);
}

#[tokio::test]
async fn reauthentication_releases_pending_redirect() {
    let api = Arc::new(MockApi::new().with_me(me_ok("a@b.com")));
    let nav = Arc::new(DeferredNavigator::new("/dashboard"));
    let store = store_with(&api, Arc::clone(&nav) as Arc<dyn Navigator>);

    assert!(store.redirect_to_login(Some("/dashboard")));
    assert!(!store.redirect_to_login(Some("/dashboard")));

    store.check_session().await;

    assert!(store.redirect_to_login(Some("/dashboard")));
    assert_eq!(nav.requested(), 2);
}

#[tokio::test]
async fn login_success_releases_pending_redirect() {
    let api = Arc::new(MockApi::new().with_login(Ok(LoginResponse {
        success: true,
        user: Some(user("a@b.com")),
        message: None,
        token: None,
    })));
    let nav = Arc::new(DeferredNavigator::new("/dashboard"));
    let store = store_with(&api, Arc::clone(&nav) as Arc<dyn Navigator>);
    assert!(store.redirect_to_login(Some("/dashboard")));

    assert!(store.login("a@b.com", "pw").await.success);

    // The login's own navigation plus a fresh redirect.
    assert!(store.redirect_to_login(None));
    assert_eq!(nav.requested(), 3);
}

// =============================================================================
// login
// =============================================================================

#[tokio::test]
async fn login_trims_email_and_authenticates() {
    let h = Harness::new(
        MockApi::new().with_login(Ok(LoginResponse {
            success: true,
            user: Some(user("a@b.com")),
            message: None,
            token: Some("t".into()),
        })),
        "/login",
    );

    let result = h.store.login("  a@b.com  ", "pw").await;

    assert_eq!(h.api.calls(), vec![Call::Login { email: "a@b.com".into(), password: "pw".into() }]);
    assert!(result.success);
    assert_eq!(result.user, Some(user("a@b.com")));
    let session = h.store.snapshot();
    assert!(session.is_authenticated);
    assert!(!session.is_loading);
    assert_eq!(h.notes.toasts(), vec![Toast::success("Login successful!")]);
    assert_eq!(h.nav.current_path(), "/dashboard");
}

#[tokio::test]
async fn login_malformed_success_is_a_failure_not_a_panic() {
    let h = Harness::new(
        MockApi::new().with_login(Ok(LoginResponse { success: true, user: None, message: None, token: None })),
        "/login",
    );

    let result = h.store.login("  a@b.com  ", "pw").await;

    assert!(!result.success);
    assert_eq!(result.message.as_deref(), Some(LOGIN_FALLBACK_MESSAGE));
    assert_eq!(result.failure, Some(AuthFailure::AuthenticationFailed(LOGIN_FALLBACK_MESSAGE.into())));
    let session = h.store.snapshot();
    assert!(!session.is_authenticated);
    assert!(!session.is_loading);
    let toasts = h.notes.toasts();
    assert_eq!(toasts.len(), 1);
    assert_eq!(toasts[0].variant, ToastVariant::Destructive);
}

#[tokio::test]
async fn login_prefers_server_message() {
    let h = Harness::new(
        MockApi::new().with_login(Err(ApiError::Unauthorized { status: 401, message: Some("Invalid credentials".into()) })),
        "/login",
    );

    let result = h.store.login("a@b.com", "bad").await;

    assert_eq!(result.message.as_deref(), Some("Invalid credentials"));
    assert!(matches!(result.failure, Some(AuthFailure::AuthenticationFailed(_))));
}

#[tokio::test]
async fn login_payload_message_used_when_unsuccessful() {
    let h = Harness::new(
        MockApi::new().with_login(Ok(LoginResponse {
            success: false,
            user: None,
            message: Some("Account locked".into()),
            token: None,
        })),
        "/login",
    );

    let result = h.store.login("a@b.com", "pw").await;

    assert_eq!(result.message.as_deref(), Some("Account locked"));
}

#[tokio::test]
async fn login_network_failure_keeps_existing_session() {
    let h = Harness::new(
        MockApi::new()
            .with_me(me_ok("old@b.com"))
            .with_login(Err(ApiError::Network("connection refused".into()))),
        "/settings",
    );
    h.store.check_session().await;

    let result = h.store.login("new@b.com", "pw").await;

    assert!(!result.success);
    assert_eq!(result.message.as_deref(), Some("unable to reach the server: connection refused"));
    assert!(matches!(result.failure, Some(AuthFailure::NetworkOrServerError(_))));
    let session = h.store.snapshot();
    assert!(session.is_authenticated);
    assert_eq!(session.user, Some(user("old@b.com")));
}

#[tokio::test]
async fn login_returns_to_remembered_location() {
    let h = Harness::new(
        MockApi::new().with_login(Ok(LoginResponse {
            success: true,
            user: Some(user("a@b.com")),
            message: None,
            token: None,
        })),
        "/reports",
    );
    assert!(h.store.redirect_to_login(Some("/reports")));
    assert_eq!(h.store.return_path().as_deref(), Some("/reports"));

    h.store.login("a@b.com", "pw").await;

    assert_eq!(h.nav.current_path(), "/reports");
    assert_eq!(h.store.return_path(), None);
}

// =============================================================================
// signup
// =============================================================================

#[tokio::test]
async fn signup_trims_and_does_not_log_in() {
    let h = Harness::new(
        MockApi::new().with_signup(Ok(SignupResponse { success: true, message: Some("Signup successful".into()) })),
        "/signup",
    );

    let result = h.store.signup("  Ann ", " a@b.com ", " pw ").await;

    assert_eq!(
        h.api.calls(),
        vec![Call::Signup { name: "Ann".into(), email: "a@b.com".into(), password: " pw ".into() }]
    );
    assert!(result.success);
    assert!(result.user.is_none());
    let session = h.store.snapshot();
    assert!(!session.is_authenticated);
    assert!(session.is_loading);
    assert_eq!(
        h.notes.toasts(),
        vec![Toast::success("Account created successfully! Please login to continue.")]
    );
    assert!(h.nav.history().is_empty());
}

#[tokio::test]
async fn signup_failure_uses_fallback_message() {
    let h = Harness::new(MockApi::new().with_signup(Ok(SignupResponse { success: false, message: None })), "/signup");

    let result = h.store.signup("Ann", "a@b.com", "pw").await;

    assert!(!result.success);
    assert_eq!(result.message.as_deref(), Some(SIGNUP_FALLBACK_MESSAGE));
}

#[tokio::test]
async fn signup_server_message_surfaces() {
    let h = Harness::new(
        MockApi::new().with_signup(Err(ApiError::Http { status: 409, message: Some("Email already registered".into()) })),
        "/signup",
    );

    let result = h.store.signup("Ann", "a@b.com", "pw").await;

    assert_eq!(result.message.as_deref(), Some("Email already registered"));
    assert_eq!(h.notes.toasts(), vec![Toast::error("Email already registered")]);
}

// =============================================================================
// logout
// =============================================================================

#[tokio::test]
async fn logout_clears_local_state_when_server_fails() {
    let h = Harness::new(
        MockApi::new()
            .with_me(me_ok("a@b.com"))
            .with_logout(Err(ApiError::Http { status: 500, message: None })),
        "/dashboard",
    );
    h.store.check_session().await;

    h.store.logout().await;

    let session = h.store.snapshot();
    assert!(session.user.is_none());
    assert!(!session.is_authenticated);
    assert_eq!(h.nav.redirects_to("/login"), 1);
    assert_eq!(h.nav.history()[0].from, None);
    assert_eq!(h.api.credentials.get(), None);
    assert_eq!(h.notes.toasts(), vec![Toast::success("Logged out successfully!")]);
}

#[tokio::test]
async fn logout_clears_local_state_when_server_unreachable() {
    let h = Harness::new(
        MockApi::new()
            .with_me(me_ok("a@b.com"))
            .with_logout(Err(ApiError::Network("connection reset".into()))),
        "/dashboard",
    );
    h.store.check_session().await;

    h.store.logout().await;

    assert!(!h.store.snapshot().is_authenticated);
    assert_eq!(h.nav.current_path(), "/login");
}

#[tokio::test]
async fn logout_with_rejection_navigates_once() {
    let h = Harness::new(MockApi::new().with_me(me_ok("a@b.com")).with_logout(Err(unauthorized())), "/dashboard");
    h.store.check_session().await;
    let listener = h.store.spawn_rejection_listener();

    h.store.logout().await;
    settle().await;

    assert_eq!(h.nav.redirects_to("/login"), 1);
    assert!(!h.store.snapshot().is_authenticated);
    listener.abort();
}
