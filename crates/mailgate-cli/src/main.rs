//! mailgate - command-line access to the Aomail API.
//!
//! Stores an access token once, then issues authenticated requests through
//! the gateway, which renews the token transparently when it expires.

use std::io;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mailgate_core::api::{MultipartForm, RequestDescriptor};
use mailgate_core::auth::{NavigationEvent, Session};
use mailgate_core::config::CredentialBackend;
use mailgate_core::preferences::{self, PreferenceKind};
use mailgate_core::{Gateway, GatewayConfig};
use serde_json::{json, Value};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ============================================================================
// Constants
// ============================================================================

/// Directory for a daily rolling log file, in addition to stderr
const LOG_DIR_ENV: &str = "MAILGATE_LOG_DIR";

const LOG_FILE_PREFIX: &str = "mailgate.log";

#[derive(Parser)]
#[command(name = "mailgate", version, about = "Authenticated access to the Aomail API")]
struct Cli {
    /// Override the API base URL (e.g. https://dev.aomail.ai/aomail/)
    #[arg(long, global = true)]
    api_base: Option<String>,

    /// Credential backend: keyring, file or memory
    #[arg(long, global = true, value_parser = parse_backend)]
    backend: Option<CredentialBackend>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Store an access token issued by the web app
    Login {
        /// Token to store; prompted for when omitted
        #[arg(long)]
        token: Option<String>,
    },
    /// Forget the stored token and cached preferences
    Logout,
    /// Show authentication and subscription state
    Status,
    /// GET a path under the API base
    Get { path: String },
    /// POST a JSON body
    Post {
        path: String,
        #[arg(long)]
        data: Option<String>,
    },
    /// PUT a JSON body
    Put {
        path: String,
        #[arg(long)]
        data: Option<String>,
    },
    /// DELETE a path
    Delete { path: String },
    /// POST a multipart form
    Upload {
        path: String,
        /// Text field, NAME=VALUE (repeatable)
        #[arg(long = "field", value_name = "NAME=VALUE")]
        fields: Vec<String>,
        /// File part, NAME=PATH (repeatable)
        #[arg(long = "file", value_name = "NAME=PATH")]
        files: Vec<String>,
    },
    /// Show or change user preferences
    Preferences {
        #[command(subcommand)]
        action: Option<PreferenceAction>,
    },
}

#[derive(Subcommand)]
enum PreferenceAction {
    /// Print language, theme and timezone
    Show,
    /// Change one preference
    Set {
        #[arg(value_parser = parse_kind)]
        kind: PreferenceKind,
        value: String,
    },
}

fn parse_backend(s: &str) -> Result<CredentialBackend, String> {
    s.parse().map_err(|e: mailgate_core::config::ConfigError| e.to_string())
}

fn parse_kind(s: &str) -> Result<PreferenceKind, String> {
    PreferenceKind::ALL
        .into_iter()
        .find(|kind| kind.field() == s)
        .ok_or_else(|| format!("unknown preference {:?} (expected language, theme or timezone)", s))
}

/// Initialize the tracing subscriber for logging
fn init_tracing() -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match std::env::var_os(LOG_DIR_ENV) {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

fn build_gateway(cli: &Cli) -> Result<Gateway> {
    let mut config = GatewayConfig::load().context("Failed to load configuration")?;
    if let Some(ref url) = cli.api_base {
        config.api_base_url = url.clone();
    }
    if let Some(backend) = cli.backend {
        config.credential_backend = backend;
    }

    let store = config.open_store().context("Failed to open credential store")?;
    let session = Session::with_key(store, config.credential_key.clone());
    let navigator = Arc::new(|event: NavigationEvent| match event {
        NavigationEvent::NotAuthorized => {
            eprintln!("Session expired. Run `mailgate login` to sign in again.")
        }
        NavigationEvent::LoginRequired => eprintln!("Not logged in. Run `mailgate login` first."),
    });

    Gateway::new(&config, session, navigator).context("Failed to create gateway")
}

fn parse_body(data: Option<&str>) -> Result<Value> {
    match data {
        Some(data) => serde_json::from_str(data).context("--data must be valid JSON"),
        None => Ok(json!({})),
    }
}

fn split_pair<'a>(pair: &'a str, flag: &str) -> Result<(&'a str, &'a str)> {
    pair.split_once('=')
        .ok_or_else(|| anyhow::anyhow!("--{} expects NAME=VALUE, got {:?}", flag, pair))
}

fn build_form(fields: &[String], files: &[String]) -> Result<MultipartForm> {
    let mut form = MultipartForm::new();
    for field in fields {
        let (name, value) = split_pair(field, "field")?;
        form = form.text(name, value);
    }
    for file in files {
        let (name, path) = split_pair(file, "file")?;
        let path = Path::new(path);
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        form = form.file(name, file_name, bytes, None);
    }
    Ok(form)
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let gateway = build_gateway(&cli)?;

    match cli.command {
        Command::Login { token } => {
            let token = match token {
                Some(token) => token,
                None => rpassword::prompt_password("Access token: ")
                    .context("Failed to read token")?,
            };
            let token = token.trim();
            anyhow::ensure!(!token.is_empty(), "Access token must not be empty");

            gateway
                .session()
                .set_credential(token)
                .context("Failed to store access token")?;
            info!("Access token stored");

            let status = gateway.is_authenticated().await;
            if status.authenticated {
                eprintln!("Logged in.");
            } else {
                eprintln!("Token stored, but the API did not accept it.");
            }
        }
        Command::Logout => {
            gateway.session().clear().context("Failed to clear session")?;
            eprintln!("Logged out.");
        }
        Command::Status => {
            let (status, prefs) = futures::future::join(
                gateway.is_authenticated(),
                preferences::initialize_preferences(&gateway),
            )
            .await;
            print_json(&json!({
                "apiBaseUrl": gateway.api_base_url(),
                "isAuthenticated": status.authenticated,
                "isActive": status.subscription_active,
                "lastRenewal": gateway.session().last_renewal(),
                "preferences": prefs,
            }))?;
        }
        Command::Get { path } => {
            let data = gateway.get_data(&path).await.with_context(|| format!("GET {} failed", path))?;
            print_json(&data)?;
        }
        Command::Post { path, data } => {
            let body = parse_body(data.as_deref())?;
            let data = gateway
                .post_data(&path, body)
                .await
                .with_context(|| format!("POST {} failed", path))?;
            print_json(&data)?;
        }
        Command::Put { path, data } => {
            let body = parse_body(data.as_deref())?;
            let data = gateway
                .put_data(&path, body)
                .await
                .with_context(|| format!("PUT {} failed", path))?;
            print_json(&data)?;
        }
        Command::Delete { path } => {
            let data = gateway
                .delete_data(&path)
                .await
                .with_context(|| format!("DELETE {} failed", path))?;
            print_json(&data)?;
        }
        Command::Upload { path, fields, files } => {
            let form = build_form(&fields, &files)?;
            let request = RequestDescriptor::post(gateway.endpoint(&path)).form(form);
            let data = gateway
                .send(request)
                .await
                .with_context(|| format!("Upload to {} failed", path))?;
            print_json(&data)?;
        }
        Command::Preferences { action } => match action.unwrap_or(PreferenceAction::Show) {
            PreferenceAction::Show => {
                let prefs = preferences::initialize_preferences(&gateway).await;
                print_json(&serde_json::to_value(prefs)?)?;
            }
            PreferenceAction::Set { kind, value } => {
                preferences::save_preference(&gateway, kind, &value)
                    .await
                    .with_context(|| format!("Failed to set {}", kind))?;
                eprintln!("{} set to {}.", kind, value);
            }
        },
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let _guard = init_tracing();
    let cli = Cli::parse();
    run(cli).await
}
