use futures::stream::{self, StreamExt};
use serde::Serialize;
use suraksha_core::{UploadFolder, UploadOutcome};

use crate::backend::UploadBackend;
use crate::error::UploadError;
use crate::file::UploadFile;
use crate::uploader::Uploader;

/// One file of a batch that did not make it.
#[derive(Debug)]
pub struct BatchFailure {
    pub file_name: String,
    pub error: UploadError,
}

/// Serializable view of a [`BatchFailure`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureSummary {
    pub file_name: String,
    pub code: &'static str,
    pub message: String,
}

impl From<&BatchFailure> for FailureSummary {
    fn from(failure: &BatchFailure) -> Self {
        Self {
            file_name: failure.file_name.clone(),
            code: failure.error.error_code(),
            message: failure.error.client_message(),
        }
    }
}

/// Per-file results of [`Uploader::upload_many`], in input order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub uploaded: Vec<UploadOutcome>,
    pub failed: Vec<BatchFailure>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.uploaded.len() + self.failed.len()
    }

    pub fn failure_summaries(&self) -> Vec<FailureSummary> {
        self.failed.iter().map(FailureSummary::from).collect()
    }
}

impl<B: UploadBackend> Uploader<B> {
    /// Upload several files into one folder, at most `max_concurrent_uploads`
    /// at a time. Each file runs its own flow (with retries); one failure does
    /// not stop the others.
    pub async fn upload_many(&self, folder: UploadFolder, files: Vec<UploadFile>) -> BatchReport {
        let count = files.len();
        tracing::info!(folder = %folder, count, "Starting batch upload");

        let results: Vec<_> = stream::iter(files.into_iter().map(move |file| async move {
            let result = self.upload_with_retry(folder, &file).await;
            (file.file_name, result)
        }))
        .buffered(self.max_concurrent_uploads())
        .collect()
        .await;

        let mut report = BatchReport::default();
        for (file_name, result) in results {
            match result {
                Ok(outcome) => report.uploaded.push(outcome),
                Err(error) => report.failed.push(BatchFailure { file_name, error }),
            }
        }

        tracing::info!(
            folder = %folder,
            uploaded = report.uploaded.len(),
            failed = report.failed.len(),
            "Batch upload finished"
        );
        report
    }
}
