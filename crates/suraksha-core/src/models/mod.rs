pub mod folder;
pub mod upload;

pub use folder::{FolderPolicy, UploadFolder};
pub use upload::{
    PublishReceipt, SchemaMismatch, SignedUploadGrant, SignedUrlResponse, UploadOutcome,
    UploadRequest, VerifyPublishRequest, VerifyPublishResponse,
};
