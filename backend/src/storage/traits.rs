//! Collaborator contracts consumed by the domain layer.

use anyhow::Result;
use async_trait::async_trait;
use shared::{AttendanceRecord, Student};

/// Interface to the `students` collection.
///
/// Soft deletion is a domain concern: the domain flips `is_deleted` and
/// calls `update_student`; `delete_student` here is the physical
/// (hard) removal used for duplicate cleanup.
#[async_trait]
pub trait StudentStorage: Send + Sync {
    /// Store a new student document.
    async fn store_student(&self, student: &Student) -> Result<()>;

    /// Fetch one student by id, deleted or not.
    async fn get_student(&self, student_id: &str) -> Result<Option<Student>>;

    /// List all student documents ordered by name, including soft-deleted
    /// ones; the domain layer filters.
    async fn list_students(&self) -> Result<Vec<Student>>;

    /// Replace an existing student document.
    async fn update_student(&self, student: &Student) -> Result<()>;

    /// Physically remove one student document.
    /// Returns true if a document was removed.
    async fn delete_student(&self, student_id: &str) -> Result<bool>;

    /// Physically remove several student documents in one batch.
    /// Returns the number removed.
    async fn delete_students(&self, student_ids: &[String]) -> Result<u32>;
}

/// Interface to the `attendance` collection.
#[async_trait]
pub trait AttendanceStorage: Send + Sync {
    /// Write a batch of records atomically (all-or-nothing) and return
    /// the ids assigned by the store, in input order.
    async fn append_batch(&self, records: &[AttendanceRecord]) -> Result<Vec<String>>;

    /// List all records ordered by date descending; the domain layer
    /// applies the finer filters.
    async fn list_records(&self) -> Result<Vec<AttendanceRecord>>;

    /// Replace an existing record. Returns true if it existed.
    async fn update_record(&self, record: &AttendanceRecord) -> Result<bool>;

    /// Remove one record. Returns true if it existed.
    async fn delete_record(&self, record_id: &str) -> Result<bool>;

    /// Remove every record in the collection. Returns the number removed.
    async fn delete_all_records(&self) -> Result<u32>;
}
