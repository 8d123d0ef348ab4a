//! pardot - command-line client for the Pardot API.
//!
//! Loads configuration, authenticates (reusing a cached api key when one is
//! on disk), runs a single command and prints the JSON result.

mod commands;
mod credentials;
mod logging;
mod settings;

use std::process::ExitCode;

use anyhow::{Context, Result};
use pardot_core::{ClientConfig, OperationResult, PardotClient, TokenCache};
use tracing::{info, warn};

use commands::{Command, Request, USAGE};
use credentials::CredentialStore;

/// Fill in a missing password from the keychain, or ask for it
fn resolve_password(config: &mut ClientConfig) -> Result<()> {
    if !config.password.is_empty() || config.email.trim().is_empty() {
        return Ok(());
    }
    match CredentialStore::get_password(&config.email) {
        Ok(password) => config.password = password,
        Err(e) => {
            info!(error = %e, "No stored password, prompting");
            config.password = rpassword::prompt_password(format!(
                "Pardot password for {}: ",
                config.email
            ))
            .context("Failed to read password")?;
        }
    }
    Ok(())
}

fn print_result(result: &OperationResult) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(result)?);
    Ok(())
}

fn logout(config: &ClientConfig) -> Result<()> {
    if let Some(path) = &config.token_cache {
        TokenCache::new(path)
            .clear()
            .context("Failed to remove cached api key")?;
    }
    if !config.email.trim().is_empty() {
        if let Err(e) = CredentialStore::delete(&config.email) {
            warn!(error = %e, "Failed to remove stored password");
        }
    }
    println!("Logged out");
    Ok(())
}

/// Always log in fresh so bad credentials are reported now
async fn login(client: &PardotClient, config: &ClientConfig) -> bool {
    if let Err(e) = client.session().authenticate().await {
        eprintln!("FATAL Pardot API Authentication Failed: {}", e);
        return false;
    }
    if let Err(e) = CredentialStore::store(&config.email, &config.password) {
        warn!(error = %e, "Failed to store password in keychain");
    }
    println!("Authenticated as {}", config.email);
    true
}

async fn send(client: &PardotClient, request: Request) -> OperationResult {
    match request {
        Request::ById {
            object,
            operation,
            id,
            fields,
        } => {
            client
                .operation_by_id(object, operation, &id, Some(fields))
                .await
        }
        Request::ByField {
            object,
            operation,
            field,
            value,
            fields,
        } => {
            client
                .operation_by_field(object, operation, &field, &value, Some(fields))
                .await
        }
        Request::Query { object, filters } => client.query(object, Some(filters)).await,
    }
}

fn build_client(config: &mut ClientConfig) -> Result<PardotClient> {
    resolve_password(config)?;
    PardotClient::from_config(config).context("Invalid configuration")
}

async fn run(command: Command, mut config: ClientConfig) -> Result<bool> {
    match command {
        Command::Logout => {
            logout(&config)?;
            Ok(true)
        }
        Command::Login => {
            let client = build_client(&mut config)?;
            Ok(login(&client, &config).await)
        }
        Command::Data(request) => {
            let client = build_client(&mut config)?;

            // authenticate or stop here, before any data request
            if let Err(e) = client.connect().await {
                eprintln!("FATAL Pardot API Authentication Failed: {}", e);
                return Ok(false);
            }

            let result = send(&client, request).await;
            print_result(&result)?;
            Ok(result.success)
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        println!("{}", USAGE);
        return Ok(ExitCode::SUCCESS);
    }
    let command = match Command::parse(&args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("Error: {}\n\n{}", e, USAGE);
            return Ok(ExitCode::from(2));
        }
    };

    let config = settings::load()?;
    let _guard = logging::init_tracing(&config);
    info!(?config, "Configuration loaded");

    if run(command, config).await? {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
