use std::io::{self, IsTerminal, Write as _};
use std::time::Duration;

use anyhow::anyhow;
use libroadcast_config::{CredentialStore, DEFAULT_DOMAIN, StoredCredentials};
use tracing::info;

use crate::cli::LoginArgs;
use crate::client::{CliError, CliResult, parse_domain, plain_client, token_scopes};

const TOKEN_PREFIX: &str = "lip_";
const TOKEN_CREATE_URL: &str = "https://lichess.org/account/oauth/token/create?scopes[]=study:write&scopes[]=study:read&scopes[]=web:mod&description=Broadcast+CLI";

pub(crate) async fn handle_login(
    store: &CredentialStore,
    args: LoginArgs,
    timeout: Duration,
) -> CliResult<()> {
    if args.logout {
        if store.clear()? {
            println!("Credentials cleared successfully. You are now logged out.");
        } else {
            println!("No stored credentials found at {}.", store.path().display());
        }
        return Ok(());
    }

    let (token, domain) = match args.token {
        Some(token) => (token, args.domain),
        None => prompt_credentials()?,
    };
    let token = check_token(&token)?;
    let domain = domain
        .map(|domain| domain.trim().to_string())
        .filter(|domain| !domain.is_empty())
        .unwrap_or_else(|| DEFAULT_DOMAIN.to_string());
    let base_url = parse_domain(&domain)?;

    let scopes = if args.skip_validation {
        println!("Skipping token validation...");
        Vec::new()
    } else {
        println!("Validating token and fetching scopes...");
        let http = plain_client(timeout)?;
        let scopes = token_scopes(&http, &base_url, &token)
            .await
            .map_err(|err| CliError::auth(format!("failed to validate token: {err}")))?;
        println!("Token valid with scopes: {}", scopes.join(", "));
        scopes
    };

    store.save(&StoredCredentials {
        lichess_token: token,
        lichess_domain: Some(base_url.as_str().trim_end_matches('/').to_string()),
        scopes,
    })?;
    info!(path = %store.path().display(), "credentials saved");
    println!(
        "Credentials saved successfully! You can now use the CLI without setting environment variables."
    );
    Ok(())
}

fn check_token(raw: &str) -> CliResult<String> {
    let token = raw.trim();
    if token.is_empty() {
        return Err(CliError::validation("Token cannot be empty."));
    }
    if !token.starts_with(TOKEN_PREFIX) {
        return Err(CliError::validation(
            "Invalid token format. Token must start with 'lip_'. Please check your token.",
        ));
    }
    Ok(token.to_string())
}

fn prompt_credentials() -> CliResult<(String, Option<String>)> {
    if !io::stdin().is_terminal() {
        return Err(CliError::validation(
            "token required; pass it as an argument when running non-interactively",
        ));
    }

    println!("Lichess Token Login");
    println!("Please enter your Lichess token");
    println!("You can generate one at {TOKEN_CREATE_URL}");
    println!();
    let token = rpassword::prompt_password("Lichess Token: ")
        .map_err(|err| CliError::failure(anyhow!("failed to read token from stdin: {err}")))?;
    check_token(&token)?;

    print!("Lichess Domain (default: {DEFAULT_DOMAIN}): ");
    io::stdout()
        .flush()
        .map_err(|err| CliError::failure(anyhow!("failed to write prompt: {err}")))?;
    let mut domain = String::new();
    io::stdin()
        .read_line(&mut domain)
        .map_err(|err| CliError::failure(anyhow!("failed to read domain from stdin: {err}")))?;
    Ok((token, Some(domain)))
}
