//! Configuration module
//!
//! Client configuration for the upload workflow: backend location, credential
//! sources, signed-URL endpoint style, HTTP timeout, retry and batch settings.

use std::env;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::PathBuf;
use std::str::FromStr;

const API_URL: &str = "http://localhost:3000";
const REQUEST_TIMEOUT_SECS: u64 = 60;
const SIGNED_URL_EXPIRES_IN_SECS: u64 = 600;
const UPLOAD_MAX_RETRIES: u32 = 0;
const RETRY_BASE_DELAY_MS: u64 = 1000;
const RETRY_MAX_DELAY_MS: u64 = 10_000;
const MAX_CONCURRENT_UPLOADS: usize = 3;

/// Which flavor of the signed-URL endpoint the backend exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignedUrlEndpoint {
    /// `GET /upload/{folder}/get-signed-url?fileName=&contentType=&fileSize=`
    #[default]
    FolderPath,
    /// `GET /upload/get-signed-url?folder=&fileName=&contentType=&fileSize=&expiresIn=`
    FolderQuery,
}

impl FromStr for SignedUrlEndpoint {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "path" => Ok(SignedUrlEndpoint::FolderPath),
            "query" => Ok(SignedUrlEndpoint::FolderQuery),
            _ => Err(anyhow::anyhow!(
                "Invalid signed URL style: {}. Must be 'path' or 'query'",
                s
            )),
        }
    }
}

impl Display for SignedUrlEndpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            SignedUrlEndpoint::FolderPath => write!(f, "path"),
            SignedUrlEndpoint::FolderQuery => write!(f, "query"),
        }
    }
}

/// Upload client configuration
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub api_url: String,
    /// Static bearer token; wins over `token_file`
    pub access_token: Option<String>,
    /// JSON file holding the bearer token under the `access_token` key
    pub token_file: Option<PathBuf>,
    pub request_timeout_secs: u64,
    pub signed_url_endpoint: SignedUrlEndpoint,
    pub signed_url_expires_in_secs: u64,
    pub upload_max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    pub max_concurrent_uploads: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: API_URL.to_string(),
            access_token: None,
            token_file: None,
            request_timeout_secs: REQUEST_TIMEOUT_SECS,
            signed_url_endpoint: SignedUrlEndpoint::default(),
            signed_url_expires_in_secs: SIGNED_URL_EXPIRES_IN_SECS,
            upload_max_retries: UPLOAD_MAX_RETRIES,
            retry_base_delay_ms: RETRY_BASE_DELAY_MS,
            retry_max_delay_ms: RETRY_MAX_DELAY_MS,
            max_concurrent_uploads: MAX_CONCURRENT_UPLOADS,
        }
    }
}

impl ClientConfig {
    /// Create a config for a backend URL with every other setting at its default.
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let api_url = env::var("SURAKSHA_API_URL")
            .or_else(|_| env::var("API_URL"))
            .unwrap_or_else(|_| API_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let signed_url_endpoint = match env::var("SURAKSHA_SIGNED_URL_STYLE") {
            Ok(style) => style.parse()?,
            Err(_) => SignedUrlEndpoint::default(),
        };

        let config = ClientConfig {
            api_url,
            access_token: env::var("SURAKSHA_ACCESS_TOKEN")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            token_file: env::var("SURAKSHA_TOKEN_FILE")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            request_timeout_secs: env::var("SURAKSHA_REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| REQUEST_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(REQUEST_TIMEOUT_SECS),
            signed_url_endpoint,
            signed_url_expires_in_secs: env::var("SURAKSHA_SIGNED_URL_EXPIRES_IN")
                .unwrap_or_else(|_| SIGNED_URL_EXPIRES_IN_SECS.to_string())
                .parse()
                .unwrap_or(SIGNED_URL_EXPIRES_IN_SECS),
            upload_max_retries: env::var("SURAKSHA_UPLOAD_MAX_RETRIES")
                .unwrap_or_else(|_| UPLOAD_MAX_RETRIES.to_string())
                .parse()
                .unwrap_or(UPLOAD_MAX_RETRIES),
            retry_base_delay_ms: env::var("SURAKSHA_RETRY_BASE_DELAY_MS")
                .unwrap_or_else(|_| RETRY_BASE_DELAY_MS.to_string())
                .parse()
                .unwrap_or(RETRY_BASE_DELAY_MS),
            retry_max_delay_ms: env::var("SURAKSHA_RETRY_MAX_DELAY_MS")
                .unwrap_or_else(|_| RETRY_MAX_DELAY_MS.to_string())
                .parse()
                .unwrap_or(RETRY_MAX_DELAY_MS),
            max_concurrent_uploads: env::var("SURAKSHA_MAX_CONCURRENT_UPLOADS")
                .unwrap_or_else(|_| MAX_CONCURRENT_UPLOADS.to_string())
                .parse()
                .unwrap_or(MAX_CONCURRENT_UPLOADS),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            return Err(anyhow::anyhow!(
                "SURAKSHA_API_URL must start with http:// or https://"
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(anyhow::anyhow!(
                "SURAKSHA_REQUEST_TIMEOUT_SECS must be greater than zero"
            ));
        }

        if self.max_concurrent_uploads == 0 {
            return Err(anyhow::anyhow!(
                "SURAKSHA_MAX_CONCURRENT_UPLOADS must be greater than zero"
            ));
        }

        if self.retry_base_delay_ms > self.retry_max_delay_ms {
            return Err(anyhow::anyhow!(
                "SURAKSHA_RETRY_BASE_DELAY_MS must not exceed SURAKSHA_RETRY_MAX_DELAY_MS"
            ));
        }

        Ok(())
    }
}
