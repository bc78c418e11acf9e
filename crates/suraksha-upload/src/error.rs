//! Error types for the upload workflow.
//!
//! Every failure names the network step it happened at (when there is one) and
//! self-describes how it should be reported: a machine-readable code, whether
//! the whole flow may be retried, the log level and a user-facing message.

use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::Serialize;
use suraksha_core::ValidationError;

/// Network step of the upload workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum UploadStep {
    SignedUrl,
    StorageUpload,
    VerifyPublish,
}

impl Display for UploadStep {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            UploadStep::SignedUrl => write!(f, "signed URL request"),
            UploadStep::StorageUpload => write!(f, "storage upload"),
            UploadStep::VerifyPublish => write!(f, "verify-and-publish"),
        }
    }
}

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Expected failures such as validation
    Debug,
    /// Recoverable failures
    Warn,
    /// Unexpected failures
    Error,
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Missing bearer token")]
    MissingCredential,

    #[error("Credential error: {0}")]
    Credential(String),

    #[error("{step} failed with status {status}: {message}")]
    Request {
        step: UploadStep,
        status: u16,
        message: String,
    },

    #[error("{step} failed: {source}")]
    Transport {
        step: UploadStep,
        #[source]
        source: reqwest::Error,
    },

    #[error("{step} returned an unexpected response: {message}")]
    InvalidResponse { step: UploadStep, message: String },

    #[error("{step} was rejected: {message}")]
    Rejected { step: UploadStep, message: String },

    #[error("Image processing error: {0}")]
    Image(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for upload operations
pub type UploadResult<T> = Result<T, UploadError>;

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 425 | 429 | 500..=599)
}

impl UploadError {
    pub fn transport(step: UploadStep, source: reqwest::Error) -> Self {
        UploadError::Transport { step, source }
    }

    /// Network step the error happened at, if any.
    pub fn step(&self) -> Option<UploadStep> {
        match self {
            UploadError::Request { step, .. }
            | UploadError::Transport { step, .. }
            | UploadError::InvalidResponse { step, .. }
            | UploadError::Rejected { step, .. } => Some(*step),
            _ => None,
        }
    }

    /// HTTP status for non-2xx responses.
    pub fn status(&self) -> Option<u16> {
        match self {
            UploadError::Request { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether re-running the whole flow may succeed. Validation, credential,
    /// permission and size failures never are.
    pub fn is_retryable(&self) -> bool {
        match self {
            UploadError::Request { status, .. } => is_retryable_status(*status),
            UploadError::Transport { .. } => true,
            _ => false,
        }
    }

    /// Machine-readable error code (e.g., "STORAGE_UPLOAD_FAILED")
    pub fn error_code(&self) -> &'static str {
        match self {
            UploadError::Validation(_) => "VALIDATION_FAILED",
            UploadError::MissingCredential => "MISSING_CREDENTIAL",
            UploadError::Credential(_) => "CREDENTIAL_ERROR",
            UploadError::Request { step, .. } | UploadError::Transport { step, .. } => {
                match step {
                    UploadStep::SignedUrl => "SIGNED_URL_FAILED",
                    UploadStep::StorageUpload => "STORAGE_UPLOAD_FAILED",
                    UploadStep::VerifyPublish => "VERIFY_PUBLISH_FAILED",
                }
            }
            UploadError::InvalidResponse { .. } => "INVALID_RESPONSE",
            UploadError::Rejected { .. } => "REJECTED",
            UploadError::Image(_) => "IMAGE_PROCESSING_ERROR",
            UploadError::Io(_) => "IO_ERROR",
            UploadError::Config(_) => "CONFIG_ERROR",
        }
    }

    pub fn log_level(&self) -> LogLevel {
        match self {
            UploadError::Validation(_) | UploadError::Image(_) => LogLevel::Debug,
            UploadError::MissingCredential | UploadError::Credential(_) => LogLevel::Warn,
            UploadError::Request { status, .. } if *status < 500 => LogLevel::Warn,
            UploadError::Transport { .. } => LogLevel::Warn,
            _ => LogLevel::Error,
        }
    }

    /// Message suitable for a user-facing notification.
    pub fn client_message(&self) -> String {
        match self {
            UploadError::Validation(e) => e.to_string(),
            UploadError::MissingCredential | UploadError::Credential(_) => {
                "You are not signed in. Please sign in and try again".to_string()
            }
            UploadError::Request {
                step: UploadStep::StorageUpload,
                status,
                message,
            } => format!("Upload to storage failed (HTTP {}): {}", status, message),
            UploadError::Request {
                step,
                status,
                message,
            } => format!("Upload failed during {} (HTTP {}): {}", step, status, message),
            UploadError::Transport { step, .. } => {
                format!("Network error during {}. Check your connection", step)
            }
            UploadError::InvalidResponse { step, .. } => {
                format!("Unexpected server response during {}", step)
            }
            UploadError::Rejected { message, .. } => message.clone(),
            UploadError::Image(msg) => msg.clone(),
            UploadError::Io(_) => "Could not read the selected file".to_string(),
            UploadError::Config(msg) => msg.clone(),
        }
    }
}
