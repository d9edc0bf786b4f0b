use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tracing::Instrument;

use crate::error::{Error, Result};
use crate::models::notification::Notification;
use crate::models::quiz_session::QuizSession;
use crate::models::user::Identity;
use crate::services::ai_service::AIService;
use crate::services::quiz_store::QuizStore;
use crate::services::storage_service::ObjectStorage;

pub const INVALID_UPLOAD_MESSAGE: &str = "Please upload a valid PDF file";
pub const SUCCESS_MESSAGE: &str = "Quiz generated successfully!";

/// One file taken from the user's selection.
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

/// Result of one upload cycle as seen by the user.
#[derive(Debug)]
pub struct UploadReport {
    pub notification: Notification,
    pub outcome: Result<QuizSession>,
}

#[derive(Clone)]
pub struct UploadService {
    storage: Arc<dyn ObjectStorage>,
    ai_service: AIService,
    store: QuizStore,
    busy: Arc<AtomicBool>,
}

/// Clears the busy flag when the cycle ends, however it ends.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl UploadService {
    pub fn new(storage: Arc<dyn ObjectStorage>, ai_service: AIService, store: QuizStore) -> Self {
        Self {
            storage,
            ai_service,
            store,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Runs one upload-to-quiz cycle and always answers with a notification.
    /// Failures are logged here and never escape; the stored session is only
    /// replaced when a complete, non-empty quiz was generated.
    pub async fn handle_file_selection(
        &self,
        files: Vec<SelectedFile>,
        identity: &Identity,
    ) -> UploadReport {
        let outcome = self.process(files, identity).await;
        let notification = match &outcome {
            Ok(_) => Notification::success(SUCCESS_MESSAGE),
            Err(e) => {
                tracing::error!(error = %e, "Error processing PDF");
                Notification::failure(failure_message(e))
            }
        };
        UploadReport {
            notification,
            outcome,
        }
    }

    pub async fn process(&self, files: Vec<SelectedFile>, identity: &Identity) -> Result<QuizSession> {
        let (file, user_id) = validate_selection(files, identity)?;
        let _busy = self.try_begin()?;

        let key = storage_key(user_id, crate::utils::time::now_millis(), &file.file_name);
        let span = tracing::info_span!("upload_cycle", cycle_id = %uuid::Uuid::new_v4(), %key);
        self.run_cycle(key, file).instrument(span).await
    }

    async fn run_cycle(&self, key: String, file: SelectedFile) -> Result<QuizSession> {
        tracing::info!(size = file.bytes.len(), "uploading document");
        self.storage.upload(&key, file.bytes, &file.content_type).await?;
        let public_url = self.storage.public_url(&key);

        let quiz = self.ai_service.generate_quiz(&public_url).await?;
        if quiz.questions.is_empty() {
            return Err(Error::EmptyQuiz);
        }

        tracing::info!(questions = quiz.questions.len(), "storing generated quiz");
        Ok(self.store.set_quiz(quiz.questions))
    }

    fn try_begin(&self) -> Result<BusyGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| BusyGuard(&self.busy))
            .map_err(|_| Error::Busy)
    }
}

fn validate_selection(mut files: Vec<SelectedFile>, identity: &Identity) -> Result<(SelectedFile, &str)> {
    let invalid = || Error::Validation(INVALID_UPLOAD_MESSAGE.to_string());

    if files.len() != 1 {
        return Err(invalid());
    }
    let user_id = identity.user_id().ok_or_else(invalid)?;
    let file = files.pop().ok_or_else(invalid)?;
    if !file.content_type.to_ascii_lowercase().contains("pdf") {
        return Err(invalid());
    }
    Ok((file, user_id))
}

/// `<user>/<millis>-<file name>`, with path separators removed from the
/// file name so the key keeps exactly two levels.
pub fn storage_key(user_id: &str, millis: i64, file_name: &str) -> String {
    let name: String = file_name
        .chars()
        .map(|c| if matches!(c, '/' | '\\') || c.is_control() { '_' } else { c })
        .collect();
    let name = name.trim_start_matches('.');
    let name = if name.is_empty() { "document.pdf" } else { name };
    format!("{}/{}-{}", user_id, millis, name)
}

fn failure_message(err: &Error) -> String {
    match err {
        Error::Validation(msg) => msg.clone(),
        Error::Busy => err.to_string(),
        other => format!("Failed to process PDF: {}", other),
    }
}
