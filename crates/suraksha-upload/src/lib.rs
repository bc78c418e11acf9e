//! Direct-to-storage upload client for the Suraksha LMS backend.
//!
//! An upload runs four strictly sequential steps:
//!
//! 1. validate the file against its folder policy (no network),
//! 2. request a signed upload grant from the backend,
//! 3. send the bytes straight to the storage provider (multipart form POST when
//!    the grant carries policy fields, raw PUT otherwise),
//! 4. ask the backend to verify and publish the object.
//!
//! [`ApiClient`] is the authenticated backend client, [`HttpUploadBackend`] wires
//! it to the storage strategies and [`Uploader`] drives the flow, reporting
//! progress to a [`ProgressSink`].

pub mod api;
pub mod backend;
pub mod batch;
pub mod credentials;
#[cfg(feature = "image-crop")]
pub mod crop;
pub mod error;
pub mod file;
pub mod progress;
pub mod retry;
pub mod storage;
pub mod uploader;

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use suraksha_core::ClientConfig;

pub use backend::{ByteProgress, HttpUploadBackend, UploadBackend};
pub use batch::{BatchFailure, BatchReport, FailureSummary};
pub use credentials::{
    credentials_from_config, CredentialProvider, NoCredentials, StaticToken, TokenFile,
};
#[cfg(feature = "image-crop")]
pub use crop::CropRegion;
pub use error::{LogLevel, UploadError, UploadResult, UploadStep};
pub use file::UploadFile;
pub use progress::{NoopProgress, ProgressSink, ProgressUpdate, TracingProgress, UploadStage};
pub use retry::RetryPolicy;
pub use storage::UploadStrategy;
pub use uploader::Uploader;

/// HTTP client for the Suraksha backend with an injected bearer credential.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    credentials: Arc<dyn CredentialProvider>,
}

impl ApiClient {
    pub fn new(
        base_url: impl Into<String>,
        credentials: Arc<dyn CredentialProvider>,
        timeout: Duration,
    ) -> UploadResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| UploadError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
        })
    }

    /// Create client from configuration, resolving the credential provider it describes.
    pub fn from_config(config: &ClientConfig) -> UploadResult<Self> {
        Self::new(
            config.api_url.clone(),
            credentials_from_config(config),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Attach `Authorization: Bearer`. Fails before anything is sent when no
    /// token is available.
    fn authorize(&self, request: RequestBuilder) -> UploadResult<RequestBuilder> {
        let token = self.credentials.bearer_token()?;
        Ok(request.bearer_auth(token))
    }

    /// GET request with query parameters. Deserializes JSON response.
    pub async fn get<T: DeserializeOwned>(
        &self,
        step: UploadStep,
        path: &str,
        query: &[(&str, String)],
    ) -> UploadResult<T> {
        let mut request = self.authorize(self.client.get(self.build_url(path)))?;

        if !query.is_empty() {
            request = request.query(query);
        }

        let response = request
            .send()
            .await
            .map_err(|e| UploadError::transport(step, e))?;

        read_json(step, response).await
    }

    /// POST JSON body and deserialize response.
    pub async fn post_json<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        step: UploadStep,
        path: &str,
        body: &B,
    ) -> UploadResult<T> {
        let request = self.authorize(self.client.post(self.build_url(path)).json(body))?;

        let response = request
            .send()
            .await
            .map_err(|e| UploadError::transport(step, e))?;

        read_json(step, response).await
    }

    /// Raw client for requests that must not carry the bearer token (storage uploads).
    pub fn client(&self) -> &Client {
        &self.client
    }
}

/// Turn a non-2xx response into [`UploadError::Request`], preferring the
/// backend's `message` field over the raw body.
pub(crate) async fn ensure_success(step: UploadStep, response: Response) -> UploadResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string()
            } else {
                body
            }
        });

    Err(UploadError::Request {
        step,
        status: status.as_u16(),
        message,
    })
}

async fn read_json<T: DeserializeOwned>(step: UploadStep, response: Response) -> UploadResult<T> {
    let response = ensure_success(step, response).await?;
    let bytes = response
        .bytes()
        .await
        .map_err(|e| UploadError::transport(step, e))?;

    serde_json::from_slice(&bytes).map_err(|e| UploadError::InvalidResponse {
        step,
        message: format!("Failed to parse response as JSON: {}", e),
    })
}
