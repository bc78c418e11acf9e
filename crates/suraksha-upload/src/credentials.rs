//! Bearer credential providers.
//!
//! Every backend call asks its provider for a token right before sending, so a
//! token refreshed on disk is picked up by the next request. Providers are
//! read-only.

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use suraksha_core::ClientConfig;

use crate::error::{UploadError, UploadResult};

/// Key under which token files store the bearer token.
pub const ACCESS_TOKEN_KEY: &str = "access_token";

/// Source of the `Authorization: Bearer` token.
pub trait CredentialProvider: Send + Sync + fmt::Debug {
    /// Returns the token, or [`UploadError::MissingCredential`] when none is available.
    fn bearer_token(&self) -> UploadResult<String>;
}

/// A fixed token.
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StaticToken").field(&"<redacted>").finish()
    }
}

impl CredentialProvider for StaticToken {
    fn bearer_token(&self) -> UploadResult<String> {
        let token = self.0.trim();
        if token.is_empty() {
            return Err(UploadError::MissingCredential);
        }
        Ok(token.to_string())
    }
}

/// No credential configured; every authenticated call fails before hitting the network.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCredentials;

impl CredentialProvider for NoCredentials {
    fn bearer_token(&self) -> UploadResult<String> {
        Err(UploadError::MissingCredential)
    }
}

/// Token persisted in a JSON file, e.g. `{"access_token": "eyJ..."}`.
#[derive(Debug, Clone)]
pub struct TokenFile {
    path: PathBuf,
}

impl TokenFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialProvider for TokenFile {
    fn bearer_token(&self) -> UploadResult<String> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(UploadError::MissingCredential)
            }
            Err(e) => {
                return Err(UploadError::Credential(format!(
                    "Failed to read token file {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        let value: serde_json::Value = serde_json::from_str(&contents).map_err(|e| {
            UploadError::Credential(format!(
                "Token file {} is not valid JSON: {}",
                self.path.display(),
                e
            ))
        })?;

        value
            .get(ACCESS_TOKEN_KEY)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .ok_or(UploadError::MissingCredential)
    }
}

/// Build the provider described by the configuration: a static token wins over
/// a token file; with neither, uploads fail with `MissingCredential`.
pub fn credentials_from_config(config: &ClientConfig) -> Arc<dyn CredentialProvider> {
    if let Some(token) = &config.access_token {
        return Arc::new(StaticToken::new(token.clone()));
    }
    if let Some(path) = &config.token_file {
        return Arc::new(TokenFile::new(path.clone()));
    }
    tracing::debug!("No credential configured");
    Arc::new(NoCredentials)
}
