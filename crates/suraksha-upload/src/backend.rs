//! The three network steps of an upload behind one trait.
//!
//! [`HttpUploadBackend`] talks to the real backend and storage provider; tests
//! drive the [`Uploader`](crate::Uploader) with their own implementations.

use async_trait::async_trait;
use suraksha_core::{
    ClientConfig, PublishReceipt, SignedUploadGrant, SignedUrlEndpoint, UploadFolder,
    UploadRequest,
};

use crate::error::UploadResult;
use crate::file::UploadFile;
use crate::storage;
use crate::ApiClient;

pub use crate::storage::ByteProgress;

#[async_trait]
pub trait UploadBackend: Send + Sync {
    /// Obtain a signed upload grant for `request`.
    async fn request_grant(&self, request: &UploadRequest) -> UploadResult<SignedUploadGrant>;

    /// Transmit the file bytes to the storage endpoint of `grant`.
    async fn send_object(
        &self,
        folder: UploadFolder,
        grant: &SignedUploadGrant,
        file: &UploadFile,
        progress: ByteProgress,
    ) -> UploadResult<()>;

    /// Ask the backend to verify and publish the object at `relative_path`.
    async fn verify_and_publish(&self, relative_path: &str) -> UploadResult<PublishReceipt>;
}

/// Backend over HTTP: signed URL and verify calls go to the Suraksha API,
/// object bytes go straight to the storage provider.
#[derive(Clone, Debug)]
pub struct HttpUploadBackend {
    api: ApiClient,
    endpoint: SignedUrlEndpoint,
    expires_in_secs: u64,
}

impl HttpUploadBackend {
    pub fn new(api: ApiClient, endpoint: SignedUrlEndpoint, expires_in_secs: u64) -> Self {
        Self {
            api,
            endpoint,
            expires_in_secs,
        }
    }

    pub fn from_config(config: &ClientConfig) -> UploadResult<Self> {
        Ok(Self::new(
            ApiClient::from_config(config)?,
            config.signed_url_endpoint,
            config.signed_url_expires_in_secs,
        ))
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }
}

#[async_trait]
impl UploadBackend for HttpUploadBackend {
    async fn request_grant(&self, request: &UploadRequest) -> UploadResult<SignedUploadGrant> {
        self.api
            .request_signed_url(self.endpoint, request, self.expires_in_secs)
            .await
    }

    async fn send_object(
        &self,
        folder: UploadFolder,
        grant: &SignedUploadGrant,
        file: &UploadFile,
        progress: ByteProgress,
    ) -> UploadResult<()> {
        storage::send_object(
            self.api.client(),
            grant,
            file,
            folder.policy().max_size_bytes,
            progress,
        )
        .await
    }

    async fn verify_and_publish(&self, relative_path: &str) -> UploadResult<PublishReceipt> {
        self.api.verify_and_publish(relative_path).await
    }
}
