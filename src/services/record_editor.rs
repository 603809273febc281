//! Edit session over one record.
//!
//! A session keeps the record as it was opened plus a draft of the form
//! fields. Photo evidence is uploaded before the textual fields are saved;
//! a failed upload is reported but does not block the save. After a
//! successful save the board is patched so every view reflects the change.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::cleaning_record::{CleaningRecord, CompletionUpdate, PhotoChange};
use crate::domain::ports::{CleaningRecordRepository, CleaningTaskRepository, PhotoStorage};
use crate::services::compliance_evaluator::ComplianceEvaluator;
use crate::services::record_board::RecordBoard;

/// Editable fields of a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordDraft {
    pub is_completed: bool,
    /// `None` until someone judges the work.
    pub is_compliant: Option<bool>,
    pub completion_date: Option<DateTime<Utc>>,
    pub comments: Option<String>,
    pub photo_url: Option<String>,
}

impl RecordDraft {
    pub fn from_record(record: &CleaningRecord) -> Self {
        Self {
            is_completed: record.is_completed(),
            is_compliant: record.is_compliant(),
            completion_date: record.completion_date(),
            comments: record.comments.clone(),
            photo_url: record.photo_url.clone(),
        }
    }

    /// Toggle completion. Completing fills a missing date with `now`;
    /// reverting to pending drops compliance and date.
    pub fn set_completed(&mut self, completed: bool, now: DateTime<Utc>) {
        self.is_completed = completed;
        if completed {
            self.completion_date.get_or_insert(now);
        } else {
            self.is_compliant = None;
            self.completion_date = None;
        }
    }

    /// The draft as submitted; inconsistent fields are left for the
    /// evaluator to reject.
    fn to_update(&self, original: &CleaningRecord) -> CompletionUpdate {
        let mut update = CompletionUpdate {
            is_completed: self.is_completed,
            is_compliant: self.is_compliant,
            completion_date: self.completion_date,
            ..CompletionUpdate::default()
        };

        update.comments = Some(self.comments.clone());
        if self.photo_url != original.photo_url {
            update.photo_url = Some(match &self.photo_url {
                Some(url) => PhotoChange::Set(url.clone()),
                None => PhotoChange::Clear,
            });
        }
        update
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditSession {
    /// Record as last read or saved.
    pub original: CleaningRecord,
    pub draft: RecordDraft,
}

impl EditSession {
    pub fn record_id(&self) -> Uuid {
        self.original.id
    }

    pub fn is_dirty(&self) -> bool {
        self.draft != RecordDraft::from_record(&self.original)
    }
}

/// Image attached to a submit.
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    pub record: CleaningRecord,
    pub changed: bool,
    /// Photo upload or deletion problem; the textual save still happened.
    pub photo_error: Option<String>,
}

pub struct RecordEditor<T: CleaningTaskRepository, R: CleaningRecordRepository> {
    records: Arc<R>,
    evaluator: Arc<ComplianceEvaluator<R>>,
    board: Arc<RecordBoard<T, R>>,
    photos: Arc<dyn PhotoStorage>,
}

impl<T: CleaningTaskRepository, R: CleaningRecordRepository> RecordEditor<T, R> {
    pub fn new(
        records: Arc<R>,
        evaluator: Arc<ComplianceEvaluator<R>>,
        board: Arc<RecordBoard<T, R>>,
        photos: Arc<dyn PhotoStorage>,
    ) -> Self {
        Self {
            records,
            evaluator,
            board,
            photos,
        }
    }

    pub async fn open(&self, record_id: Uuid) -> DomainResult<EditSession> {
        let record = self
            .records
            .get(record_id)
            .await
            .map_err(|e| DomainError::fetch_failed("cleaning record", &e))?
            .ok_or(DomainError::RecordNotFound(record_id))?;

        Ok(EditSession {
            draft: RecordDraft::from_record(&record),
            original: record,
        })
    }

    /// Save the draft, uploading `photo` first when given.
    ///
    /// On error the session is left as it was so the caller can retry; a
    /// photo uploaded for the failed save is deleted again. A photo replaced
    /// or cleared by a successful save is deleted from storage.
    pub async fn submit(&self, session: &mut EditSession, photo: Option<PhotoUpload>) -> DomainResult<SubmitOutcome> {
        let record_id = session.record_id();
        let mut photo_error = None;
        let mut uploaded = None;

        if let Some(photo) = photo {
            match self.photos.upload(record_id, &photo.file_name, &photo.bytes).await {
                Ok(url) => uploaded = Some(url),
                Err(e) => {
                    warn!(%record_id, error = %e, "photo upload failed, keeping previous photo");
                    photo_error = Some(e.to_string());
                }
            }
        }

        let mut update = session.draft.clone();
        if let Some(url) = &uploaded {
            update.photo_url = Some(url.clone());
        }
        let result = self
            .evaluator
            .set_completion(
                record_id,
                update.to_update(&session.original),
                Some(session.original.version),
            )
            .await;

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                if let Some(url) = uploaded {
                    self.discard_photo(record_id, &url).await;
                }
                return Err(e);
            }
        };

        if outcome.changed {
            self.board.apply_update(outcome.record.clone()).await;
        }
        info!(%record_id, changed = outcome.changed, "record edit saved");

        if let Some(previous) = &session.original.photo_url {
            if outcome.record.photo_url.as_ref() != Some(previous) {
                if let Err(e) = self.photos.delete(previous).await {
                    warn!(%record_id, url = %previous, error = %e, "failed to delete replaced photo");
                    photo_error.get_or_insert_with(|| e.to_string());
                }
            }
        }

        session.original = outcome.record.clone();
        session.draft = RecordDraft::from_record(&outcome.record);

        Ok(SubmitOutcome {
            record: outcome.record,
            changed: outcome.changed,
            photo_error,
        })
    }

    /// Delete the stored photo and clear the reference. A storage failure is
    /// logged and reported; the reference is cleared regardless.
    pub async fn remove_photo(&self, session: &mut EditSession) -> DomainResult<SubmitOutcome> {
        let record_id = session.record_id();
        let Some(url) = session.original.photo_url.clone() else {
            return Ok(SubmitOutcome {
                record: session.original.clone(),
                changed: false,
                photo_error: None,
            });
        };

        let photo_error = match self.photos.delete(&url).await {
            Ok(()) => None,
            Err(e) => {
                warn!(%record_id, %url, error = %e, "failed to delete stored photo");
                Some(e.to_string())
            }
        };

        let outcome = self
            .evaluator
            .update_notes(record_id, None, Some(PhotoChange::Clear))
            .await?;
        if outcome.changed {
            self.board.apply_update(outcome.record.clone()).await;
        }

        session.original = outcome.record.clone();
        session.draft.photo_url = None;

        Ok(SubmitOutcome {
            record: outcome.record,
            changed: outcome.changed,
            photo_error,
        })
    }

    async fn discard_photo(&self, record_id: Uuid, url: &str) {
        if let Err(e) = self.photos.delete(url).await {
            warn!(%record_id, %url, error = %e, "failed to delete photo of a failed save");
        }
    }
}
