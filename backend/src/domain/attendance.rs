//! Session-based attendance entry.
//!
//! Tutors record a day's attendance by setting up a session context
//! (date, level, class, location, time range, tutor), staging one draft
//! entry per student, and committing the whole batch in one atomic
//! write. The aggregator owns this state explicitly; the UI layer holds
//! an instance per editing session and calls into it, with no ambient
//! globals.

use chrono::{Local, Utc};
use log::{info, warn};
use std::sync::Arc;
use thiserror::Error;

use shared::{
    AttendanceRecord, AttendanceStatus, BatchSubmitResult, EducationLevel, RecordSubmitResult,
    Student, StudentStatus, TimeSlot,
};

use crate::domain::schedule;
use crate::storage::AttendanceStorage;

/// Local validation failures. These never mutate aggregator state and
/// never reach the storage collaborator.
#[derive(Debug, Error, PartialEq)]
pub enum DraftError {
    #[error("{0} is required before adding a student")]
    MissingField(&'static str),
    #[error("student {name} is unavailable ({status})")]
    StudentUnavailable { name: String, status: StudentStatus },
    #[error("no staged attendance entries to commit")]
    NothingToCommit,
    #[error("a commit is already in progress")]
    CommitInProgress,
}

/// The shared fields every entry staged under the current session gets.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionContext {
    /// Session date, `YYYY-MM-DD`.
    pub date: String,
    pub education_level: Option<EducationLevel>,
    pub class_type: String,
    pub location: String,
    pub time_start: String,
    pub time_end: String,
    pub default_status: AttendanceStatus,
    pub tutor: String,
}

impl SessionContext {
    fn blank(date: String, tutor: String) -> Self {
        Self {
            date,
            education_level: None,
            class_type: String::new(),
            location: String::new(),
            time_start: String::new(),
            time_end: String::new(),
            default_status: AttendanceStatus::Hadir,
            tutor,
        }
    }
}

/// Grouping key of the session the first staged entry locked in; drives
/// the "N students in this session" counter.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveSession {
    pub time_start: String,
    pub time_end: String,
    pub education_level: Option<EducationLevel>,
    pub class_type: String,
    pub location: String,
}

/// One staged, not-yet-persisted attendance entry. The local id exists
/// only within the draft set and is stripped before submission.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftEntry {
    pub local_id: u64,
    pub record: AttendanceRecord,
}

/// Stages per-student attendance entries under one session context and
/// submits them as a single batch.
pub struct SessionDraftAggregator {
    store: Arc<dyn AttendanceStorage>,
    default_tutor: String,
    /// Admins pick the tutor per session; tutors always record under
    /// their own name.
    tutor_selection: bool,
    context: SessionContext,
    drafts: Vec<DraftEntry>,
    active_session: Option<ActiveSession>,
    available_slots: Vec<TimeSlot>,
    manual_time: bool,
    next_local_id: u64,
    commit_in_flight: bool,
}

impl SessionDraftAggregator {
    pub fn new(store: Arc<dyn AttendanceStorage>, tutor: &str, tutor_selection: bool) -> Self {
        let today = Local::now().date_naive().format("%Y-%m-%d").to_string();
        Self {
            store,
            default_tutor: tutor.to_string(),
            tutor_selection,
            context: SessionContext::blank(today, tutor.to_string()),
            drafts: Vec::new(),
            active_session: None,
            available_slots: Vec::new(),
            manual_time: false,
            next_local_id: 1,
            commit_in_flight: false,
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn drafts(&self) -> &[DraftEntry] {
        &self.drafts
    }

    pub fn has_drafts(&self) -> bool {
        !self.drafts.is_empty()
    }

    pub fn active_session(&self) -> Option<&ActiveSession> {
        self.active_session.as_ref()
    }

    /// Slots valid for the currently selected education level.
    pub fn available_slots(&self) -> &[TimeSlot] {
        &self.available_slots
    }

    /// Whether the time range is being entered by hand rather than
    /// picked from the generated slots.
    pub fn manual_time(&self) -> bool {
        self.manual_time
    }

    pub fn set_date(&mut self, date: &str) {
        self.context.date = date.to_string();
    }

    pub fn set_class_type(&mut self, class_type: &str) {
        self.context.class_type = class_type.to_string();
    }

    pub fn set_location(&mut self, location: &str) {
        self.context.location = location.to_string();
    }

    pub fn set_default_status(&mut self, status: AttendanceStatus) {
        self.context.default_status = status;
    }

    pub fn set_tutor(&mut self, tutor: &str) {
        self.context.tutor = tutor.to_string();
    }

    /// Change the education level and regenerate the valid slots.
    ///
    /// When drafts already exist for an active session the session's
    /// time range is preserved and the aggregator switches to manual
    /// time, so staged entries are not orphaned by the new slot grid;
    /// otherwise the time range resets.
    pub fn set_education_level(&mut self, level: EducationLevel) {
        self.context.education_level = Some(level);
        self.available_slots = schedule::generate_time_slots(level);

        match (&self.active_session, self.drafts.is_empty()) {
            (Some(active), false) => {
                self.context.time_start = active.time_start.clone();
                self.context.time_end = active.time_end.clone();
                self.manual_time = true;
            }
            _ => {
                self.context.time_start.clear();
                self.context.time_end.clear();
                self.manual_time = false;
            }
        }
    }

    /// Pick a generated slot by its `"start-end"` key. An empty key
    /// clears the selection; an unknown key is ignored.
    pub fn select_time_slot(&mut self, key: &str) -> bool {
        if key.is_empty() {
            self.context.time_start.clear();
            self.context.time_end.clear();
            return true;
        }
        match self.available_slots.iter().find(|s| s.key() == key) {
            Some(slot) => {
                self.context.time_start = slot.start.clone();
                self.context.time_end = slot.end.clone();
                self.manual_time = false;
                true
            }
            None => false,
        }
    }

    pub fn set_manual_time(&mut self, start: &str, end: &str) {
        self.context.time_start = start.to_string();
        self.context.time_end = end.to_string();
        self.manual_time = true;
    }

    /// Selection-time roster check, upstream of `add_entry`: students on
    /// leave or inactive cannot be added to a session.
    pub fn check_eligibility(&self, student: &Student) -> Result<(), DraftError> {
        match student.status {
            StudentStatus::Aktif => Ok(()),
            status => Err(DraftError::StudentUnavailable {
                name: student.name.clone(),
                status,
            }),
        }
    }

    /// Stage one entry for the current session. Required fields are
    /// checked in a fixed order and the first failure wins; on success
    /// the entry gets a fresh local id and, if this is the session's
    /// first entry, the current time range becomes the active session.
    ///
    /// The same student may be staged more than once; warning about
    /// duplicates is the caller's concern.
    pub fn add_entry(&mut self, student_name: &str, notes: &str) -> Result<u64, DraftError> {
        if self.context.date.is_empty() {
            return Err(DraftError::MissingField("session date"));
        }
        let Some(level) = self.context.education_level else {
            return Err(DraftError::MissingField("education level"));
        };
        if self.context.class_type.is_empty() {
            return Err(DraftError::MissingField("class type"));
        }
        if self.context.location.is_empty() {
            return Err(DraftError::MissingField("location"));
        }
        if self.tutor_selection && self.context.tutor.is_empty() {
            return Err(DraftError::MissingField("tutor"));
        }
        if self.context.time_start.is_empty() || self.context.time_end.is_empty() {
            return Err(DraftError::MissingField("time range"));
        }
        let student_name = student_name.trim();
        if student_name.is_empty() {
            return Err(DraftError::MissingField("student name"));
        }

        let tutor = if self.context.tutor.is_empty() {
            self.default_tutor.clone()
        } else {
            self.context.tutor.clone()
        };
        let record = AttendanceRecord {
            id: String::new(),
            date: self.context.date.clone(),
            education_level: level,
            class_type: self.context.class_type.clone(),
            location: self.context.location.clone(),
            time_start: self.context.time_start.clone(),
            time_end: self.context.time_end.clone(),
            time_slot: format!("{}-{}", self.context.time_start, self.context.time_end),
            student_name: student_name.to_string(),
            status: self.context.default_status,
            notes: notes.to_string(),
            tutor,
            timestamp: Utc::now().to_rfc3339(),
        };

        let local_id = self.next_local_id;
        self.next_local_id += 1;
        self.drafts.push(DraftEntry { local_id, record });

        if self.active_session.is_none() {
            self.active_session = Some(ActiveSession {
                time_start: self.context.time_start.clone(),
                time_end: self.context.time_end.clone(),
                education_level: self.context.education_level,
                class_type: self.context.class_type.clone(),
                location: self.context.location.clone(),
            });
        }

        Ok(local_id)
    }

    /// Drop one staged entry; no-op when the id is unknown.
    pub fn remove_entry(&mut self, local_id: u64) {
        self.drafts.retain(|d| d.local_id != local_id);
    }

    /// Number of staged entries belonging to the active session's time
    /// range (the "added so far" counter).
    pub fn session_entry_count(&self) -> usize {
        match &self.active_session {
            Some(active) => self
                .drafts
                .iter()
                .filter(|d| {
                    d.record.time_start == active.time_start
                        && d.record.time_end == active.time_end
                })
                .count(),
            None => 0,
        }
    }

    /// Reset the session context for a new session, preserving the date
    /// being worked on and (under tutor selection) the chosen tutor.
    /// Staged drafts survive so several sessions can be committed
    /// together; asking the user to confirm is the UI's job.
    pub fn start_new_session(&mut self) {
        let tutor = if self.tutor_selection && !self.context.tutor.is_empty() {
            self.context.tutor.clone()
        } else {
            self.default_tutor.clone()
        };
        self.context = SessionContext::blank(self.context.date.clone(), tutor);
        self.active_session = None;
        self.available_slots.clear();
        self.manual_time = false;
    }

    /// Staged drafts grouped by their `"start-end"` session key, groups
    /// and entries both in insertion order.
    pub fn grouped_drafts(&self) -> Vec<(String, Vec<&DraftEntry>)> {
        let mut groups: Vec<(String, Vec<&DraftEntry>)> = Vec::new();
        for draft in &self.drafts {
            let key = draft.record.time_slot.clone();
            match groups.iter_mut().find(|(k, _)| *k == key) {
                Some((_, entries)) => entries.push(draft),
                None => groups.push((key, vec![draft])),
            }
        }
        groups
    }

    /// Submit every staged entry as one atomic batch.
    ///
    /// On success drafts are cleared and the context resets to a fresh
    /// blank state dated today. On failure the drafts are left exactly
    /// as they were so the user can retry, and the store's error is
    /// reported per record (the batch is all-or-nothing, so every record
    /// carries the same failure).
    pub async fn commit(&mut self) -> Result<BatchSubmitResult, DraftError> {
        if self.commit_in_flight {
            return Err(DraftError::CommitInProgress);
        }
        if self.drafts.is_empty() {
            return Err(DraftError::NothingToCommit);
        }

        self.commit_in_flight = true;
        // Strip the draft wrapper; the store assigns real ids.
        let records: Vec<AttendanceRecord> =
            self.drafts.iter().map(|d| d.record.clone()).collect();
        let outcome = self.store.append_batch(&records).await;
        self.commit_in_flight = false;

        match outcome {
            Ok(ids) => {
                let count = records.len();
                info!("committed {} attendance drafts", count);
                let results = records
                    .iter()
                    .zip(ids)
                    .map(|(record, id)| RecordSubmitResult {
                        success: true,
                        student_name: record.student_name.clone(),
                        id: Some(id),
                        error: None,
                    })
                    .collect();

                self.drafts.clear();
                self.active_session = None;
                self.available_slots.clear();
                self.manual_time = false;
                let today = Local::now().date_naive().format("%Y-%m-%d").to_string();
                let tutor = if self.tutor_selection && !self.context.tutor.is_empty() {
                    self.context.tutor.clone()
                } else {
                    self.default_tutor.clone()
                };
                self.context = SessionContext::blank(today, tutor);

                Ok(BatchSubmitResult {
                    success: true,
                    message: format!("Berhasil menyimpan {} data presensi", count),
                    error: None,
                    results,
                })
            }
            Err(e) => {
                warn!("attendance batch commit failed: {}", e);
                let message = e.to_string();
                let results = records
                    .iter()
                    .map(|record| RecordSubmitResult {
                        success: false,
                        student_name: record.student_name.clone(),
                        id: None,
                        error: Some(message.clone()),
                    })
                    .collect();
                Ok(BatchSubmitResult {
                    success: false,
                    message: "Gagal menyimpan data presensi".to_string(),
                    error: Some(message),
                    results,
                })
            }
        }
    }
}
