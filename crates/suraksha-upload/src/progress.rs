//! Coarse progress reporting for display (spinners, progress bars).
//!
//! Updates are informational only: nothing in the workflow waits on a sink and
//! percentages are nominal per-stage windows rather than exact measurements.

use std::sync::{Arc, Mutex};

use serde::Serialize;

/// Percent reported while the signed URL is requested.
pub const GETTING_URL_PERCENT: u8 = 10;
/// Percent reported once the grant has arrived.
pub const GRANT_RECEIVED_PERCENT: u8 = 30;
/// Start of the byte-progress window of the storage upload.
pub const UPLOAD_START_PERCENT: u8 = 33;
/// End of the byte-progress window of the storage upload.
pub const UPLOAD_END_PERCENT: u8 = 80;
pub const VERIFYING_PERCENT: u8 = 90;
pub const COMPLETE_PERCENT: u8 = 100;

/// Stage of a single upload.
///
/// `Idle → GettingUrl → Uploading → Verifying → Complete`, with `Error`
/// reachable from every non-terminal stage. `Complete` and `Error` are
/// absorbing; a retry starts a fresh flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum UploadStage {
    Idle,
    GettingUrl,
    Uploading,
    Verifying,
    Complete,
    Error,
}

impl UploadStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadStage::Complete | UploadStage::Error)
    }

    /// Whether the workflow may move from `self` to `next`. Staying in the same
    /// non-terminal stage is allowed so percentages can advance within it.
    pub fn can_transition_to(&self, next: UploadStage) -> bool {
        use UploadStage::*;

        match (*self, next) {
            (Complete | Error, _) => false,
            (_, Error) => true,
            (current, next) if current == next => true,
            (Idle, GettingUrl)
            | (GettingUrl, Uploading)
            | (Uploading, Verifying)
            | (Verifying, Complete) => true,
            _ => false,
        }
    }
}

/// Map storage byte progress into the upload window of overall progress.
pub fn upload_percent(sent: u64, total: u64) -> u8 {
    if total == 0 {
        return UPLOAD_END_PERCENT;
    }
    let window = (UPLOAD_END_PERCENT - UPLOAD_START_PERCENT) as u64;
    let offset = sent.min(total) * window / total;
    UPLOAD_START_PERCENT + offset as u8
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    pub file_name: String,
    pub stage: UploadStage,
    pub percent: u8,
    pub message: String,
}

/// Receives progress updates.
pub trait ProgressSink: Send + Sync {
    fn report(&self, update: ProgressUpdate);
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        self(update)
    }
}

/// Discards every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn report(&self, _update: ProgressUpdate) {}
}

/// Emits updates as `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn report(&self, update: ProgressUpdate) {
        match update.stage {
            UploadStage::Error => tracing::warn!(
                file_name = %update.file_name,
                percent = update.percent,
                "{}",
                update.message
            ),
            UploadStage::Uploading => tracing::debug!(
                file_name = %update.file_name,
                percent = update.percent,
                "{}",
                update.message
            ),
            _ => tracing::info!(
                file_name = %update.file_name,
                stage = ?update.stage,
                percent = update.percent,
                "{}",
                update.message
            ),
        }
    }
}

/// Tracks the stage of one upload and forwards legal transitions to the sink.
pub(crate) struct StageTracker {
    file_name: String,
    sink: Arc<dyn ProgressSink>,
    state: Mutex<(UploadStage, u8)>,
}

impl StageTracker {
    pub(crate) fn new(file_name: impl Into<String>, sink: Arc<dyn ProgressSink>) -> Arc<Self> {
        Arc::new(Self {
            file_name: file_name.into(),
            sink,
            state: Mutex::new((UploadStage::Idle, 0)),
        })
    }

    pub(crate) fn stage(&self) -> UploadStage {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).0
    }

    /// Move to `stage`. Illegal transitions are dropped.
    pub(crate) fn enter(&self, stage: UploadStage, percent: u8, message: impl Into<String>) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if !state.0.can_transition_to(stage) {
            tracing::warn!(
                from = ?state.0,
                to = ?stage,
                file_name = %self.file_name,
                "Ignoring illegal upload stage transition"
            );
            return;
        }

        *state = (stage, percent);
        self.sink.report(ProgressUpdate {
            file_name: self.file_name.clone(),
            stage,
            percent,
            message: message.into(),
        });
    }

    /// Byte progress while uploading; only reports when the percentage moves.
    pub(crate) fn bytes_sent(&self, sent: u64, total: u64) {
        let percent = upload_percent(sent, total);
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.0 != UploadStage::Uploading || percent <= state.1 {
            return;
        }

        state.1 = percent;
        self.sink.report(ProgressUpdate {
            file_name: self.file_name.clone(),
            stage: UploadStage::Uploading,
            percent,
            message: format!("Uploading {} of {} bytes", sent, total),
        });
    }

    /// Absorb into `Error`, keeping the last percentage.
    pub(crate) fn fail(&self, message: impl Into<String>) {
        let percent = self.state.lock().unwrap_or_else(|e| e.into_inner()).1;
        if !self.stage().is_terminal() {
            self.enter(UploadStage::Error, percent, message);
        }
    }
}
