//! Secret resolution for the cloud credential.
//!
//! Two sources are supported, in priority order:
//!
//! 1. **Direct value** - e.g. `SUPABASE_SERVICE_KEY=...` in the environment or `.env`
//! 2. **File reference** - Docker secrets pattern, e.g. `SUPABASE_SERVICE_KEY_FILE=/run/secrets/key`

use secrecy::SecretString;
use std::fs;

/// Error type for secret resolution failures.
#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("No secret source provided (need a direct value or a file path)")]
    NoSourceProvided,

    #[error("Failed to read secret from file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Secret file '{path}' is empty")]
    EmptyFile { path: String },
}

/// Result type for secret resolution.
pub type Result<T> = std::result::Result<T, SecretError>;

/// Resolves a secret from a direct value or, failing that, from a file.
///
/// Whitespace is trimmed from both sources (files and env vars often carry a
/// trailing newline).
pub fn resolve_secret(direct: Option<&str>, file_path: Option<&str>) -> Result<SecretString> {
    if let Some(value) = direct {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            return Ok(SecretString::from(trimmed.to_string()));
        }
    }

    if let Some(path) = file_path {
        if !path.trim().is_empty() {
            let expanded = expand_home(path.trim());
            let content = fs::read_to_string(&expanded).map_err(|e| SecretError::FileReadError {
                path: expanded.clone(),
                source: e,
            })?;
            let trimmed = content.trim();
            if trimmed.is_empty() {
                return Err(SecretError::EmptyFile { path: expanded });
            }
            return Ok(SecretString::from(trimmed.to_string()));
        }
    }

    Err(SecretError::NoSourceProvided)
}

/// Resolves a secret, returning None if no source is provided instead of an error.
///
/// A missing credential is a legitimate state here: cloud upload degrades to local-only.
pub fn resolve_secret_optional(
    direct: Option<&str>,
    file_path: Option<&str>,
) -> Result<Option<SecretString>> {
    match resolve_secret(direct, file_path) {
        Ok(secret) => Ok(Some(secret)),
        Err(SecretError::NoSourceProvided) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Expands `~` to the user's home directory.
///
/// Handles both `~/path` and standalone `~`; `~user/path` is not supported.
pub(crate) fn expand_home(path: &str) -> String {
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = dirs::home_dir() {
            if path == "~" {
                return home.to_string_lossy().into_owned();
            }
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}
