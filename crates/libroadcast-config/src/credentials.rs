//! On-disk credential store at `~/.libroadcast/credentials.json`.

use std::env;
use std::fs;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};

const CONFIG_DIR: &str = ".libroadcast";
const CREDENTIALS_FILE: &str = "credentials.json";

/// Credentials persisted by `login`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCredentials {
    /// Personal access token (`lip_...`).
    pub lichess_token: String,
    /// Lichess base URL the token belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lichess_domain: Option<String>,
    /// Scopes granted to the token when it was validated.
    #[serde(default)]
    pub scopes: Vec<String>,
}

/// File-backed credential store.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// Store under the current user's home directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::HomeDirectoryMissing`] when no home directory is set.
    pub fn default_location() -> ConfigResult<Self> {
        let home = env::var_os("HOME")
            .filter(|value| !value.is_empty())
            .or_else(|| env::var_os("USERPROFILE").filter(|value| !value.is_empty()))
            .ok_or(ConfigError::HomeDirectoryMissing)?;
        Ok(Self::at(
            PathBuf::from(home).join(CONFIG_DIR).join(CREDENTIALS_FILE),
        ))
    }

    /// Store backed by an explicit file.
    #[must_use]
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// File backing the store.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read stored credentials; `None` when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error when the file exists but cannot be read or decoded.
    pub fn load(&self) -> ConfigResult<Option<StoredCredentials>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigError::Io {
                    operation: "read",
                    path: self.path.clone(),
                    source,
                });
            }
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| ConfigError::Malformed {
                path: self.path.clone(),
                source,
            })
    }

    /// Write `credentials`, creating the parent directory when needed.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory or file cannot be written.
    pub fn save(&self, credentials: &StoredCredentials) -> ConfigResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                operation: "create directory for",
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let encoded =
            serde_json::to_string_pretty(credentials).map_err(|source| ConfigError::Malformed {
                path: self.path.clone(),
                source,
            })?;
        let write_error = |source| ConfigError::Io {
            operation: "write",
            path: self.path.clone(),
            source,
        };
        let mut file = open_private(&self.path).map_err(write_error)?;
        // An existing file keeps its old mode on open.
        restrict_permissions(&self.path)?;
        file.write_all(encoded.as_bytes()).map_err(write_error)?;
        debug!(path = %self.path.display(), "credentials saved");
        Ok(())
    }

    /// Remove the credentials file. Returns `false` when there was nothing to remove.
    ///
    /// # Errors
    ///
    /// Returns an error when the file exists but cannot be removed.
    pub fn clear(&self) -> ConfigResult<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(ConfigError::Io {
                operation: "remove",
                path: self.path.clone(),
                source,
            }),
        }
    }
}

fn open_private(path: &Path) -> io::Result<fs::File> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path)
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> ConfigResult<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|source| {
        ConfigError::Io {
            operation: "restrict permissions on",
            path: path.to_path_buf(),
            source,
        }
    })
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> ConfigResult<()> {
    Ok(())
}
