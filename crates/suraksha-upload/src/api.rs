//! Backend endpoints of the upload workflow.
//!
//! Responses are checked once here and normalized into `SignedUploadGrant` /
//! `PublishReceipt`; anything that does not fit fails with
//! [`UploadError::InvalidResponse`].

use suraksha_core::{
    PublishReceipt, SignedUploadGrant, SignedUrlEndpoint, SignedUrlResponse, UploadRequest,
    VerifyPublishRequest, VerifyPublishResponse,
};

use crate::{ApiClient, UploadError, UploadResult, UploadStep};

pub const VERIFY_AND_PUBLISH_PATH: &str = "/upload/verify-and-publish";

/// Path and query for the signed-URL request in the given endpoint style.
pub fn signed_url_request(
    endpoint: SignedUrlEndpoint,
    request: &UploadRequest,
    expires_in_secs: u64,
) -> (String, Vec<(&'static str, String)>) {
    let mut query = Vec::with_capacity(5);
    let path = match endpoint {
        SignedUrlEndpoint::FolderPath => format!("/upload/{}/get-signed-url", request.folder),
        SignedUrlEndpoint::FolderQuery => {
            query.push(("folder", request.folder.to_string()));
            "/upload/get-signed-url".to_string()
        }
    };

    query.push(("fileName", request.file_name.clone()));
    query.push(("contentType", request.content_type.clone()));
    query.push(("fileSize", request.file_size.to_string()));

    if endpoint == SignedUrlEndpoint::FolderQuery {
        query.push(("expiresIn", expires_in_secs.to_string()));
    }

    (path, query)
}

impl ApiClient {
    /// Ask the backend for a one-time upload target for `request`.
    pub async fn request_signed_url(
        &self,
        endpoint: SignedUrlEndpoint,
        request: &UploadRequest,
        expires_in_secs: u64,
    ) -> UploadResult<SignedUploadGrant> {
        let step = UploadStep::SignedUrl;
        let (path, query) = signed_url_request(endpoint, request, expires_in_secs);

        let response: SignedUrlResponse = self.get(step, &path, &query).await?;
        if !response.success {
            return Err(UploadError::Rejected {
                step,
                message: response
                    .message
                    .unwrap_or_else(|| "Signed URL request was not successful".to_string()),
            });
        }

        SignedUploadGrant::try_from(response).map_err(|e| UploadError::InvalidResponse {
            step,
            message: e.to_string(),
        })
    }

    /// Tell the backend the object at `relative_path` exists so it gets published.
    pub async fn verify_and_publish(&self, relative_path: &str) -> UploadResult<PublishReceipt> {
        let step = UploadStep::VerifyPublish;
        let body = VerifyPublishRequest {
            relative_path: relative_path.to_string(),
        };

        let response: VerifyPublishResponse =
            self.post_json(step, VERIFY_AND_PUBLISH_PATH, &body).await?;
        if !response.success {
            return Err(UploadError::Rejected {
                step,
                message: response
                    .message
                    .unwrap_or_else(|| "Verification failed".to_string()),
            });
        }

        PublishReceipt::try_from(response).map_err(|e| UploadError::InvalidResponse {
            step,
            message: e.to_string(),
        })
    }
}
