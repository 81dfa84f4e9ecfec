#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Credential storage and resolution for the libroadcast CLI.
//!
//! Layout: `credentials.rs` (on-disk store), `resolve.rs` (environment and
//! flag precedence), `error.rs` (configuration errors).

pub mod credentials;
pub mod error;
pub mod resolve;

pub use credentials::{CredentialStore, StoredCredentials};
pub use error::{ConfigError, ConfigResult};
pub use resolve::{
    Credentials, DEFAULT_DOMAIN, DOMAIN_ENV, TOKEN_ENV, normalize_domain, resolve_credentials,
};
