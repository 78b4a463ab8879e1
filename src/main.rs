use std::sync::Arc;

use authgate::{
    ApiClient, ApiError, AuthApi, AuthConfig, ConfigError, FileCredentials, MemoryNavigator, Navigator, RouteGuard,
    SessionStore, TracingNotifier,
};
use clap::{Parser, Subcommand};
use serde_json::{Value, json};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("client setup failed: {0}")]
    Api(#[from] ApiError),
    #[error("invalid JSON output: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "authgate", about = "Session client for a REST auth backend")]
struct Cli {
    /// Overrides `AUTH_API_BASE_URL`.
    #[arg(long)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check the current session with `GET /auth/me`.
    Me,
    /// Log in with `POST /auth/login` and store the returned token.
    Login {
        email: String,
        #[arg(long, env = "AUTH_PASSWORD")]
        password: String,
    },
    /// Create an account with `POST /auth/signup`. Does not log in.
    Signup {
        name: String,
        email: String,
        #[arg(long, env = "AUTH_PASSWORD")]
        password: String,
    },
    /// Log out with `POST /auth/logout` and clear the stored token.
    Logout,
    /// Resolve the route guard for a protected location.
    Visit { path: String },
}

struct Runtime {
    store: SessionStore,
    nav: Arc<MemoryNavigator>,
}

impl Runtime {
    fn new(config: &AuthConfig, start: &str) -> Result<Self, CliError> {
        let credentials = Arc::new(FileCredentials::new(config.token_file.clone()));
        tracing::debug!(token_file = %credentials.path().display(), "using file credentials");
        let client = ApiClient::new(config, credentials)?;
        tracing::debug!(base_url = client.base_url(), "api client ready");
        let nav = Arc::new(MemoryNavigator::new(start));
        let store = SessionStore::new(
            Arc::new(client) as Arc<dyn AuthApi>,
            Arc::clone(&nav) as Arc<dyn Navigator>,
            Arc::new(TracingNotifier),
            config,
        );
        Ok(Self { store, nav })
    }

    fn location(&self) -> String {
        self.nav.current_path()
    }
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let mut config = AuthConfig::from_env()?;
    if let Some(base_url) = cli.base_url {
        config.api_base_url = AuthConfig::with_base_url(&base_url)?.api_base_url;
    }

    let output = match cli.command {
        Command::Me => run_me(&config).await?,
        Command::Login { email, password } => run_login(&config, &email, &password).await?,
        Command::Signup { name, email, password } => run_signup(&config, &name, &email, &password).await?,
        Command::Logout => run_logout(&config).await?,
        Command::Visit { path } => run_visit(&config, &path).await?,
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn run_me(config: &AuthConfig) -> Result<Value, CliError> {
    let rt = Runtime::new(config, &config.home_path)?;
    let outcome = rt.store.check_session().await;
    Ok(json!({
        "outcome": serde_json::to_value(&outcome)?,
        "session": serde_json::to_value(rt.store.snapshot())?,
    }))
}

async fn run_login(config: &AuthConfig, email: &str, password: &str) -> Result<Value, CliError> {
    let rt = Runtime::new(config, &config.login_path)?;
    let listener = rt.store.spawn_rejection_listener();
    let result = rt.store.login(email, password).await;
    listener.abort();
    Ok(json!({
        "result": serde_json::to_value(&result)?,
        "location": rt.location(),
    }))
}

async fn run_signup(config: &AuthConfig, name: &str, email: &str, password: &str) -> Result<Value, CliError> {
    let rt = Runtime::new(config, "/signup")?;
    let result = rt.store.signup(name, email, password).await;
    Ok(json!({ "result": serde_json::to_value(&result)? }))
}

async fn run_logout(config: &AuthConfig) -> Result<Value, CliError> {
    let rt = Runtime::new(config, &config.home_path)?;
    rt.store.logout().await;
    Ok(json!({
        "session": serde_json::to_value(rt.store.snapshot())?,
        "location": rt.location(),
    }))
}

async fn run_visit(config: &AuthConfig, path: &str) -> Result<Value, CliError> {
    let rt = Runtime::new(config, path)?;
    let listener = rt.store.mount().await;
    let guard = RouteGuard::new(rt.store.clone(), path);
    let decision = guard.resolve().await;
    listener.abort();
    Ok(json!({
        "decision": serde_json::to_value(&decision)?,
        "location": rt.location(),
        "return_to": rt.store.return_path(),
    }))
}
