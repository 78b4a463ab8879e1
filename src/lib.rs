//! # authgate
//!
//! Client-side authentication session layer for applications backed by a
//! REST auth API (`/auth/me`, `/auth/login`, `/auth/signup`, `/auth/logout`).
//!
//! This crate contains the HTTP client with bearer-token hooks, the session
//! store and its state machine, the route guard, and the capability traits
//! (credentials, navigation, notifications) those pieces are wired through.
//!
//! DESIGN
//! ======
//! The transport only reports authentication failures. Navigation decisions
//! belong to the session store, which funnels every redirect to the login view
//! through a single gate so bursts of 401s collapse into one navigation.

pub mod config;
pub mod credentials;
pub mod guard;
pub mod navigate;
pub mod net;
pub mod notify;
pub mod session;

pub use config::{AuthConfig, ConfigError};
pub use credentials::{CredentialStore, FileCredentials, MemoryCredentials};
pub use guard::{GuardDecision, RouteGuard};
pub use navigate::{MemoryNavigator, Navigator, Redirect};
pub use net::{ApiClient, ApiError, AuthApi, AuthRejection, UserRecord};
pub use notify::{Notifier, Toast, ToastVariant, TracingNotifier};
pub use session::{AuthFailure, AuthResult, CheckOutcome, Session, SessionPhase, SessionStore};
