//! Token and domain precedence: explicit flag or environment first, then the
//! credentials file, then the public Lichess instance.

use crate::credentials::StoredCredentials;

/// Environment variable holding the access token.
pub const TOKEN_ENV: &str = "LICHESS_TOKEN";
/// Environment variable holding the Lichess base URL.
pub const DOMAIN_ENV: &str = "LICHESS_DOMAIN";
/// Lichess instance used when no domain is configured.
pub const DEFAULT_DOMAIN: &str = "https://lichess.org";

/// Credentials in effect for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Bearer token.
    pub token: String,
    /// Base URL, always ending with `/`.
    pub domain: String,
    /// Scopes recorded at login for this token; empty when unknown.
    pub stored_scopes: Vec<String>,
}

/// Ensure `raw` ends with exactly one `/`; blank input yields [`DEFAULT_DOMAIN`].
#[must_use]
pub fn normalize_domain(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        format!("{DEFAULT_DOMAIN}/")
    } else {
        format!("{trimmed}/")
    }
}

/// Combine explicit values with stored ones.
///
/// Returns `None` when no token is available from any source. Stored scopes
/// are only carried over when the stored token and domain are the ones in
/// effect.
#[must_use]
pub fn resolve_credentials(
    token: Option<&str>,
    domain: Option<&str>,
    stored: Option<&StoredCredentials>,
) -> Option<Credentials> {
    let explicit_token = token.map(str::trim).filter(|token| !token.is_empty());
    let stored_token = stored
        .map(|stored| stored.lichess_token.trim())
        .filter(|token| !token.is_empty());
    let token = explicit_token.or(stored_token)?;

    let domain = domain
        .map(str::trim)
        .filter(|domain| !domain.is_empty())
        .or_else(|| stored.and_then(|stored| stored.lichess_domain.as_deref()))
        .unwrap_or(DEFAULT_DOMAIN);
    let domain = normalize_domain(domain);

    let stored_scopes = stored
        .filter(|stored| stored.lichess_token.trim() == token)
        .filter(|stored| {
            normalize_domain(stored.lichess_domain.as_deref().unwrap_or(DEFAULT_DOMAIN)) == domain
        })
        .map(|stored| stored.scopes.clone())
        .unwrap_or_default();

    Some(Credentials {
        token: token.to_string(),
        domain,
        stored_scopes,
    })
}
