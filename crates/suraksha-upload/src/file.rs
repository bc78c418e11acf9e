use std::path::Path;

use bytes::Bytes;
use suraksha_core::{content_type_for_file_name, UploadFolder, UploadRequest};

use crate::error::{UploadError, UploadResult};

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// File bytes plus the name and content type declared for them.
///
/// Cloning is cheap: the payload is reference counted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl UploadFile {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    /// Read a local file. Without an explicit content type it is derived from
    /// the extension.
    pub async fn from_path(path: &Path, content_type: Option<String>) -> UploadResult<Self> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                UploadError::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("Invalid file path: {}", path.display()),
                ))
            })?
            .to_string();

        let data = tokio::fs::read(path).await?;

        let content_type = content_type.unwrap_or_else(|| {
            content_type_for_file_name(&file_name)
                .unwrap_or(FALLBACK_CONTENT_TYPE)
                .to_string()
        });

        Ok(Self::new(file_name, content_type, data))
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// The upload intent for this file in `folder`.
    pub fn request(&self, folder: UploadFolder) -> UploadRequest {
        UploadRequest::new(
            folder,
            self.file_name.clone(),
            self.content_type.clone(),
            self.size(),
        )
    }
}
