//! Upload orchestration.
//!
//! Steps run strictly in sequence and each one gates the next:
//! validate → request grant → send object → verify and publish. Bytes are never
//! sent before the grant resolves and verification never starts before the
//! storage upload succeeded. A failure after the bytes reached storage leaves
//! an unpublished object behind; no cleanup is attempted.

use std::sync::Arc;

use suraksha_core::{validate_upload, ClientConfig, UploadFolder, UploadOutcome};

use crate::backend::{ByteProgress, HttpUploadBackend, UploadBackend};
use crate::error::{UploadError, UploadResult, UploadStep};
use crate::file::UploadFile;
use crate::progress::{
    NoopProgress, ProgressSink, StageTracker, UploadStage, COMPLETE_PERCENT,
    GETTING_URL_PERCENT, GRANT_RECEIVED_PERCENT, UPLOAD_START_PERCENT, VERIFYING_PERCENT,
};
use crate::retry::RetryPolicy;
use crate::storage::UploadStrategy;

const MAX_CONCURRENT_UPLOADS: usize = 3;

/// Drives uploads against an [`UploadBackend`].
///
/// Each call is an independent flow; nothing is shared between concurrent
/// uploads except the read-only backend.
pub struct Uploader<B> {
    backend: Arc<B>,
    retry: RetryPolicy,
    max_concurrent_uploads: usize,
    progress: Arc<dyn ProgressSink>,
}

impl<B> Clone for Uploader<B> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            retry: self.retry,
            max_concurrent_uploads: self.max_concurrent_uploads,
            progress: self.progress.clone(),
        }
    }
}

impl Uploader<HttpUploadBackend> {
    /// HTTP uploader with the retry and concurrency settings of `config`.
    pub fn from_config(config: &ClientConfig) -> UploadResult<Self> {
        Ok(Self::new(HttpUploadBackend::from_config(config)?)
            .with_retry(RetryPolicy::from_config(config))
            .with_max_concurrent_uploads(config.max_concurrent_uploads))
    }
}

impl<B: UploadBackend> Uploader<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend: Arc::new(backend),
            retry: RetryPolicy::none(),
            max_concurrent_uploads: MAX_CONCURRENT_UPLOADS,
            progress: Arc::new(NoopProgress),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_max_concurrent_uploads(mut self, max: usize) -> Self {
        self.max_concurrent_uploads = max.max(1);
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub(crate) fn max_concurrent_uploads(&self) -> usize {
        self.max_concurrent_uploads
    }

    /// Run the full flow once for `file` into `folder`.
    #[tracing::instrument(
        skip(self, file),
        fields(folder = %folder, file_name = %file.file_name, size = file.size())
    )]
    pub async fn upload(
        &self,
        folder: UploadFolder,
        file: &UploadFile,
    ) -> UploadResult<UploadOutcome> {
        let tracker = StageTracker::new(file.file_name.clone(), self.progress.clone());

        let result = self.run(folder, file, &tracker).await;
        if let Err(e) = &result {
            tracker.fail(e.client_message());
            tracing::debug!(error = %e, code = e.error_code(), "Upload failed");
        }
        result
    }

    /// [`upload`](Self::upload), re-running the whole flow on retryable failures
    /// according to the retry policy. Each attempt requests a fresh grant.
    pub async fn upload_with_retry(
        &self,
        folder: UploadFolder,
        file: &UploadFile,
    ) -> UploadResult<UploadOutcome> {
        let mut retries = 0;
        loop {
            match self.upload(folder, file).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) if self.retry.should_retry(retries, &e) => {
                    let delay = self.retry.delay_for(retries);
                    tracing::warn!(
                        file_name = %file.file_name,
                        retry = retries + 1,
                        max_retries = self.retry.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Upload failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    retries += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn run(
        &self,
        folder: UploadFolder,
        file: &UploadFile,
        tracker: &Arc<StageTracker>,
    ) -> UploadResult<UploadOutcome> {
        let request = file.request(folder);
        validate_upload(&request)?;

        tracker.enter(
            UploadStage::GettingUrl,
            GETTING_URL_PERCENT,
            "Requesting upload URL",
        );
        let grant = self.backend.request_grant(&request).await?;
        tracker.enter(
            UploadStage::GettingUrl,
            GRANT_RECEIVED_PERCENT,
            "Upload URL received",
        );

        let strategy = UploadStrategy::for_grant(&grant);
        tracing::debug!(
            relative_path = %grant.relative_path,
            strategy = ?strategy,
            "Received upload grant"
        );

        tracker.enter(
            UploadStage::Uploading,
            UPLOAD_START_PERCENT,
            "Uploading to storage",
        );
        let byte_tracker = tracker.clone();
        let progress: ByteProgress =
            Arc::new(move |sent, total| byte_tracker.bytes_sent(sent, total));
        self.backend
            .send_object(folder, &grant, file, progress)
            .await?;

        tracker.enter(
            UploadStage::Verifying,
            VERIFYING_PERCENT,
            "Verifying upload",
        );
        let receipt = self.backend.verify_and_publish(&grant.relative_path).await?;

        if let Some(echoed) = &receipt.relative_path {
            if echoed != &grant.relative_path {
                return Err(UploadError::InvalidResponse {
                    step: UploadStep::VerifyPublish,
                    message: format!(
                        "published '{}' but '{}' was uploaded",
                        echoed, grant.relative_path
                    ),
                });
            }
        }

        tracker.enter(UploadStage::Complete, COMPLETE_PERCENT, "Upload complete");
        tracing::info!(
            relative_path = %grant.relative_path,
            public_url = %receipt.public_url,
            "Upload published"
        );

        Ok(UploadOutcome {
            folder,
            file_name: file.file_name.clone(),
            file_size: file.size(),
            relative_path: grant.relative_path,
            public_url: receipt.public_url,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::progress::ProgressUpdate;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use suraksha_core::{PublishReceipt, SignedUploadGrant, UploadRequest};

    const MB: usize = 1024 * 1024;

    /// Backend double recording every call in order.
    #[derive(Default)]
    pub(crate) struct RecordingBackend {
        pub calls: Mutex<Vec<String>>,
        grants_issued: AtomicUsize,
        pub fields: Vec<(String, String)>,
        /// Storage status to fail with, for the first `upload_failures` uploads
        pub upload_failure_status: Option<u16>,
        pub upload_failures: AtomicU32,
        pub echo_relative_path: Option<String>,
    }

    impl RecordingBackend {
        pub fn with_fields() -> Self {
            Self {
                fields: vec![
                    ("key".to_string(), "k".to_string()),
                    ("policy".to_string(), "p".to_string()),
                ],
                ..Self::default()
            }
        }

        pub fn failing_upload(status: u16, times: u32) -> Self {
            Self {
                upload_failure_status: Some(status),
                upload_failures: AtomicU32::new(times),
                ..Self::default()
            }
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl UploadBackend for RecordingBackend {
        async fn request_grant(&self, request: &UploadRequest) -> UploadResult<SignedUploadGrant> {
            tokio::task::yield_now().await;
            let n = self.grants_issued.fetch_add(1, Ordering::SeqCst);
            let relative_path = format!("{}/{}-{}", request.folder, n, request.file_name);
            self.record(format!("grant:{}", request.file_name));
            Ok(SignedUploadGrant {
                upload_url: "https://storage.example.com/bucket".to_string(),
                public_url: None,
                relative_path,
                fields: self.fields.clone(),
            })
        }

        async fn send_object(
            &self,
            _folder: UploadFolder,
            grant: &SignedUploadGrant,
            file: &UploadFile,
            progress: ByteProgress,
        ) -> UploadResult<()> {
            tokio::task::yield_now().await;
            self.record(format!("upload:{}", grant.relative_path));

            if let Some(status) = self.upload_failure_status {
                let remaining = self.upload_failures.load(Ordering::SeqCst);
                if remaining > 0 {
                    self.upload_failures.store(remaining - 1, Ordering::SeqCst);
                    return Err(UploadError::Request {
                        step: UploadStep::StorageUpload,
                        status,
                        message: "storage unavailable".to_string(),
                    });
                }
            }

            progress(file.size() / 2, file.size());
            progress(file.size(), file.size());
            Ok(())
        }

        async fn verify_and_publish(&self, relative_path: &str) -> UploadResult<PublishReceipt> {
            tokio::task::yield_now().await;
            self.record(format!("verify:{}", relative_path));
            Ok(PublishReceipt {
                public_url: format!("https://cdn.example.com/{}", relative_path),
                relative_path: Some(
                    self.echo_relative_path
                        .clone()
                        .unwrap_or_else(|| relative_path.to_string()),
                ),
            })
        }
    }

    fn png(size: usize) -> UploadFile {
        UploadFile::new("avatar.png", "image/png", vec![0u8; size])
    }

    fn collecting_sink() -> (Arc<Mutex<Vec<ProgressUpdate>>>, Arc<dyn ProgressSink>) {
        let updates = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let updates = updates.clone();
            move |u: ProgressUpdate| updates.lock().unwrap().push(u)
        };
        (updates, Arc::new(sink))
    }

    #[tokio::test]
    async fn happy_path_runs_steps_in_order() {
        let uploader = Uploader::new(RecordingBackend::with_fields());
        let outcome = uploader
            .upload(UploadFolder::ProfileImages, &png(2 * MB))
            .await
            .unwrap();

        assert_eq!(outcome.relative_path, "profile-images/0-avatar.png");
        assert_eq!(
            outcome.public_url,
            "https://cdn.example.com/profile-images/0-avatar.png"
        );
        assert_eq!(outcome.file_size, (2 * MB) as u64);
        assert_eq!(
            uploader.backend().calls(),
            vec![
                "grant:avatar.png".to_string(),
                "upload:profile-images/0-avatar.png".to_string(),
                "verify:profile-images/0-avatar.png".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn verifier_gets_grant_relative_path_unmodified() {
        let uploader = Uploader::new(RecordingBackend::default());
        let file = UploadFile::new("hw.pdf", "application/pdf", vec![1u8; 10]);
        let outcome = uploader
            .upload(UploadFolder::HomeworkFiles, &file)
            .await
            .unwrap();

        let calls = uploader.backend().calls();
        assert_eq!(calls[2], format!("verify:{}", outcome.relative_path));
    }

    #[tokio::test]
    async fn oversized_file_makes_no_calls() {
        let uploader = Uploader::new(RecordingBackend::default());
        let err = uploader
            .upload(UploadFolder::ProfileImages, &png(25 * MB))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            UploadError::Validation(suraksha_core::ValidationError::FileTooLarge { .. })
        ));
        assert!(err.to_string().contains("5 MB"));
        assert!(uploader.backend().calls().is_empty());
    }

    #[tokio::test]
    async fn disallowed_type_makes_no_calls() {
        let uploader = Uploader::new(RecordingBackend::default());
        let file = UploadFile::new("notes.pdf", "application/pdf", vec![1u8; 10]);
        let err = uploader
            .upload(UploadFolder::StudentImages, &file)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("student-images"));
        assert!(uploader.backend().calls().is_empty());
    }

    #[tokio::test]
    async fn storage_failure_skips_verification() {
        let uploader = Uploader::new(RecordingBackend::failing_upload(500, 1));
        let err = uploader
            .upload(UploadFolder::ProfileImages, &png(1024))
            .await
            .unwrap_err();

        assert_eq!(err.step(), Some(UploadStep::StorageUpload));
        let calls = uploader.backend().calls();
        assert_eq!(calls.len(), 2);
        assert!(calls.iter().all(|c| !c.starts_with("verify:")));
    }

    #[tokio::test]
    async fn repeated_uploads_get_distinct_paths() {
        let uploader = Uploader::new(RecordingBackend::with_fields());
        let file = png(1024);
        let first = uploader.upload(UploadFolder::ProfileImages, &file).await.unwrap();
        let second = uploader.upload(UploadFolder::ProfileImages, &file).await.unwrap();

        assert_ne!(first.relative_path, second.relative_path);
        let grants = uploader
            .backend()
            .calls()
            .iter()
            .filter(|c| c.starts_with("grant:"))
            .count();
        assert_eq!(grants, 2);
    }

    #[tokio::test]
    async fn mismatched_publish_echo_fails() {
        let backend = RecordingBackend {
            echo_relative_path: Some("profile-images/someone-else.png".to_string()),
            ..RecordingBackend::default()
        };
        let uploader = Uploader::new(backend);
        let err = uploader
            .upload(UploadFolder::ProfileImages, &png(1024))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            UploadError::InvalidResponse {
                step: UploadStep::VerifyPublish,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn progress_follows_stage_order() {
        let (updates, sink) = collecting_sink();
        let uploader = Uploader::new(RecordingBackend::with_fields()).with_progress(sink);
        uploader
            .upload(UploadFolder::ProfileImages, &png(2 * MB))
            .await
            .unwrap();

        let updates = updates.lock().unwrap();
        let stages: Vec<UploadStage> = updates.iter().map(|u| u.stage).collect();
        assert_eq!(stages.first(), Some(&UploadStage::GettingUrl));
        assert_eq!(stages.last(), Some(&UploadStage::Complete));
        for pair in stages.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{:?}", pair);
        }

        for update in updates.iter().filter(|u| u.stage == UploadStage::Uploading) {
            assert!((33..=80).contains(&update.percent));
        }
        assert!(updates
            .iter()
            .any(|u| u.stage == UploadStage::Uploading && u.percent == 80));
        assert_eq!(updates.last().unwrap().percent, 100);
        assert!(updates.iter().all(|u| u.file_name == "avatar.png"));
    }

    #[tokio::test]
    async fn failure_is_reported_as_error_stage() {
        let (updates, sink) = collecting_sink();
        let uploader =
            Uploader::new(RecordingBackend::failing_upload(500, 1)).with_progress(sink);
        let _ = uploader.upload(UploadFolder::ProfileImages, &png(1024)).await;

        let updates = updates.lock().unwrap();
        let last = updates.last().unwrap();
        assert_eq!(last.stage, UploadStage::Error);
        assert_eq!(last.percent, UPLOAD_START_PERCENT);
        assert!(last.message.contains("500"));
    }

    #[tokio::test]
    async fn retry_reruns_whole_flow_with_fresh_grant() {
        let uploader = Uploader::new(RecordingBackend::failing_upload(503, 2))
            .with_retry(RetryPolicy::new(3, Duration::ZERO, Duration::ZERO));
        let outcome = uploader
            .upload_with_retry(UploadFolder::ProfileImages, &png(1024))
            .await
            .unwrap();

        let calls = uploader.backend().calls();
        assert_eq!(calls.iter().filter(|c| c.starts_with("grant:")).count(), 3);
        assert_eq!(calls.iter().filter(|c| c.starts_with("verify:")).count(), 1);
        assert_eq!(outcome.relative_path, "profile-images/2-avatar.png");
    }

    #[tokio::test]
    async fn retry_gives_up_after_limit() {
        let uploader = Uploader::new(RecordingBackend::failing_upload(500, 10))
            .with_retry(RetryPolicy::new(2, Duration::ZERO, Duration::ZERO));
        let err = uploader
            .upload_with_retry(UploadFolder::ProfileImages, &png(1024))
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(500));
        let grants = uploader
            .backend()
            .calls()
            .iter()
            .filter(|c| c.starts_with("grant:"))
            .count();
        assert_eq!(grants, 3);
    }

    #[tokio::test]
    async fn retry_skips_permission_failures() {
        let uploader = Uploader::new(RecordingBackend::failing_upload(403, 10))
            .with_retry(RetryPolicy::new(5, Duration::ZERO, Duration::ZERO));
        let err = uploader
            .upload_with_retry(UploadFolder::ProfileImages, &png(1024))
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(403));
        assert_eq!(uploader.backend().calls().len(), 2);
    }

    #[tokio::test]
    async fn retry_never_retries_validation() {
        let uploader = Uploader::new(RecordingBackend::default())
            .with_retry(RetryPolicy::new(5, Duration::ZERO, Duration::ZERO));
        let err = uploader
            .upload_with_retry(UploadFolder::ProfileImages, &png(25 * MB))
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::Validation(_)));
        assert!(uploader.backend().calls().is_empty());
    }
}
