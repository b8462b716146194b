// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command-line client for the tablemap restaurant directory API.
//!
//! A thin shell over the `tablemap` library: it owns the tracing setup and
//! argument parsing, and every API call goes through the library's
//! authenticated client.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::error;

use tablemap::config::{state_dir, ClientConfig};
use tablemap::expiry;
use tablemap::session::SessionService;
use tablemap::store::CredentialStore;

#[derive(Debug, Parser)]
#[command(name = "tablemap", version, about)]
struct Cli {
    /// Base URL of the directory API.
    #[arg(long, env = "TABLEMAP_API_URL", default_value = "http://127.0.0.1:8080")]
    api_url: String,

    /// Log filter (tracing EnvFilter syntax).
    #[arg(long, env = "TABLEMAP_LOG", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Log in and persist the session.
    Login {
        email: String,
        /// Password; prompted on stdin when omitted.
        #[arg(long, env = "TABLEMAP_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Clear the persisted session.
    Logout,
    /// Print the current user's profile.
    Whoami,
    /// Print session status.
    Status,
    /// Authenticated GET against an API path, printing status and body.
    Get { path: String },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    if let Err(e) = run(cli).await {
        error!("fatal: {e:#}");
        std::process::exit(1);
    }
}

fn init_tracing(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let store = Arc::new(CredentialStore::open(state_dir().join("session.json")));
    let service = SessionService::new(&ClientConfig::new(&cli.api_url), store);

    match cli.command {
        Command::Login { email, password } => {
            let password = match password {
                Some(p) => p,
                None => prompt_password()?,
            };
            let user = service.login(&email, &password).await?;
            println!("logged in as {}", user.id);
        }
        Command::Logout => {
            service.logout();
            println!("logged out");
        }
        Command::Whoami => match service.current_user().await? {
            Some(user) => println!("{}", serde_json::to_string_pretty(&user)?),
            None => println!("not logged in"),
        },
        Command::Status => {
            let session = service.api().store().read();
            match session.user_id {
                Some(ref id) => {
                    let fresh = expiry::is_usable(
                        &session,
                        expiry::epoch_secs(),
                        expiry::DEFAULT_SAFETY_MARGIN_SECS,
                    );
                    println!(
                        "logged in as {id} (token {}, refresh token {})",
                        if fresh { "fresh" } else { "stale" },
                        if session.refresh_token.is_some() { "present" } else { "absent" },
                    );
                }
                None => println!("logged out"),
            }
        }
        Command::Get { path } => {
            let resp = service.api().get(&path).await?;
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            println!("{status}");
            if !body.is_empty() {
                println!("{body}");
            }
        }
    }

    Ok(())
}

fn prompt_password() -> anyhow::Result<String> {
    use std::io::Write as _;

    eprint!("password: ");
    std::io::stderr().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_owned())
}
