//! Direct transmission of object bytes to the storage provider.
//!
//! The storage endpoint comes from the grant and is called without the bearer
//! token. Two strategies exist:
//!
//! - **Form POST** when the grant carries policy fields: a multipart form with
//!   every field in grant order and the file last under `file`. The provider
//!   checks the policy signature against the fields preceding the file, so the
//!   order is significant.
//! - **Direct PUT** (legacy) when it does not: raw bytes with explicit
//!   `Content-Type`, `Content-Length` and a content-length-range header.
//!
//! Either way the whole object goes in one request.

use std::sync::Arc;

use bytes::Bytes;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client};
use suraksha_core::{SignedUploadGrant, ValidationError};

use crate::error::{UploadError, UploadResult, UploadStep};
use crate::file::UploadFile;

/// Size of the chunks the body is streamed in; progress is reported per chunk.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Header bounding the object size the provider accepts on a PUT.
pub const CONTENT_LENGTH_RANGE_HEADER: &str = "x-goog-content-length-range";

/// Byte progress callback: `(bytes_sent, total_bytes)`.
pub type ByteProgress = Arc<dyn Fn(u64, u64) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStrategy {
    FormPost,
    DirectPut,
}

impl UploadStrategy {
    pub fn for_grant(grant: &SignedUploadGrant) -> Self {
        if grant.has_policy_fields() {
            UploadStrategy::FormPost
        } else {
            UploadStrategy::DirectPut
        }
    }
}

fn progress_body(data: Bytes, progress: ByteProgress) -> Body {
    let total = data.len() as u64;
    let chunks: Vec<Bytes> = (0..data.len())
        .step_by(CHUNK_SIZE)
        .map(|start| data.slice(start..(start + CHUNK_SIZE).min(data.len())))
        .collect();

    let mut sent = 0u64;
    let stream = futures::stream::iter(chunks.into_iter().map(move |chunk| {
        sent += chunk.len() as u64;
        progress(sent, total);
        Ok::<Bytes, std::io::Error>(chunk)
    }));

    Body::wrap_stream(stream)
}

/// Send `file` to the storage endpoint named by `grant`.
///
/// `max_size_bytes` bounds the content-length-range header on the PUT path.
pub async fn send_object(
    client: &Client,
    grant: &SignedUploadGrant,
    file: &UploadFile,
    max_size_bytes: u64,
    progress: ByteProgress,
) -> UploadResult<()> {
    let step = UploadStep::StorageUpload;
    let strategy = UploadStrategy::for_grant(grant);
    tracing::debug!(
        strategy = ?strategy,
        relative_path = %grant.relative_path,
        size = file.size(),
        "Sending object to storage"
    );

    let request = match strategy {
        UploadStrategy::FormPost => {
            let mut form = Form::new();
            for (key, value) in &grant.fields {
                form = form.text(key.clone(), value.clone());
            }

            let part = Part::stream_with_length(
                progress_body(file.data.clone(), progress),
                file.size(),
            )
            .file_name(file.file_name.clone())
            .mime_str(&file.content_type)
            .map_err(|_| {
                ValidationError::InvalidRequest(format!(
                    "Invalid content type: {}",
                    file.content_type
                ))
            })?;

            // No explicit Content-Type: reqwest sets the multipart boundary
            client.post(&grant.upload_url).multipart(form.part("file", part))
        }
        UploadStrategy::DirectPut => client
            .put(&grant.upload_url)
            .header(CONTENT_TYPE, file.content_type.as_str())
            .header(CONTENT_LENGTH, file.size())
            .header(CONTENT_LENGTH_RANGE_HEADER, format!("0,{}", max_size_bytes))
            .body(progress_body(file.data.clone(), progress)),
    };

    let response = request
        .send()
        .await
        .map_err(|e| UploadError::transport(step, e))?;

    crate::ensure_success(step, response).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grant(fields: Vec<(&str, &str)>) -> SignedUploadGrant {
        SignedUploadGrant {
            upload_url: "https://storage.example.com/bucket".to_string(),
            relative_path: "profile-images/a.png".to_string(),
            public_url: None,
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn strategy_follows_policy_fields() {
        assert_eq!(
            UploadStrategy::for_grant(&grant(vec![("key", "profile-images/a.png")])),
            UploadStrategy::FormPost
        );
        assert_eq!(
            UploadStrategy::for_grant(&grant(vec![])),
            UploadStrategy::DirectPut
        );
    }
}
