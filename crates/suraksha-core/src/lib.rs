//! Suraksha Core Library
//!
//! Domain types shared by the upload client and the CLI: folder categories and
//! their policies, the signed-upload wire models, pre-flight file validation and
//! client configuration.

pub mod config;
pub mod models;
pub mod validation;

// Re-export commonly used types
pub use config::{ClientConfig, SignedUrlEndpoint};
pub use models::{
    FolderPolicy, PublishReceipt, SchemaMismatch, SignedUploadGrant, SignedUrlResponse,
    UploadFolder, UploadOutcome, UploadRequest, VerifyPublishRequest, VerifyPublishResponse,
};
pub use validation::{content_type_for_file_name, validate_upload, ValidationError};
