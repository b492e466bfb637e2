use anyhow::{anyhow, Context, Result};
use chrono::{Local, NaiveDate, Utc};
use log::{info, warn};
use std::sync::Arc;

use shared::{
    CreateStudentRequest, DateInput, EducationLevel, EducationStats, PaymentGridResponse,
    PaymentStatusRow, RecordPaymentRequest, Student, StudentStatus, UpdateStudentRequest,
};

use crate::domain::billing::BillingEngine;
use crate::storage::StudentStorage;

/// Service for managing the student roster and its payment ledger.
#[derive(Clone)]
pub struct StudentService {
    store: Arc<dyn StudentStorage>,
    billing: BillingEngine,
}

impl StudentService {
    pub fn new(store: Arc<dyn StudentStorage>) -> Self {
        Self {
            store,
            billing: BillingEngine::new(),
        }
    }

    /// Create a new student. Registration date defaults to today and
    /// anchors all of the student's billing deadlines.
    pub async fn create_student(&self, request: CreateStudentRequest) -> Result<Student> {
        info!("Creating student: name={}", request.name);

        let name = request.name.trim();
        if name.is_empty() {
            return Err(anyhow!("Student name is required"));
        }
        let phone = request.phone.trim();
        if !phone.is_empty() && !phone.chars().all(|c| c.is_ascii_digit() || "+- ".contains(c)) {
            return Err(anyhow!("Invalid phone number: {}", phone));
        }

        let student = Student {
            id: Student::generate_id(),
            name: name.to_string(),
            education_level: request.education_level,
            class: request.class.trim().to_string(),
            phone: phone.to_string(),
            parent_name: request.parent_name.trim().to_string(),
            notes: request.notes,
            status: StudentStatus::Aktif,
            created_at: Some(DateInput::from(Local::now().date_naive())),
            updated_at: Some(Utc::now().to_rfc3339()),
            payments: Default::default(),
            is_deleted: false,
            deleted_at: None,
        };

        self.store.store_student(&student).await?;
        info!("Created student: {} with ID: {}", student.name, student.id);
        Ok(student)
    }

    pub async fn get_student(&self, student_id: &str) -> Result<Option<Student>> {
        let student = self.store.get_student(student_id).await?;
        if student.is_none() {
            warn!("Student not found: {}", student_id);
        }
        Ok(student)
    }

    /// List students ordered by name. Soft-deleted rows are hidden
    /// unless explicitly requested.
    pub async fn list_students(&self, include_deleted: bool) -> Result<Vec<Student>> {
        let mut students = self.store.list_students().await?;
        if !include_deleted {
            students.retain(|s| !s.is_deleted);
        }
        info!("Found {} students", students.len());
        Ok(students)
    }

    /// Case-insensitive substring search over name, class and parent
    /// name, active students only.
    pub async fn search_students(&self, query: &str) -> Result<Vec<Student>> {
        let needle = query.trim().to_lowercase();
        let mut students = self.list_students(false).await?;
        if needle.is_empty() {
            return Ok(students);
        }
        students.retain(|s| {
            s.name.to_lowercase().contains(&needle)
                || s.class.to_lowercase().contains(&needle)
                || s.parent_name.to_lowercase().contains(&needle)
        });
        Ok(students)
    }

    pub async fn update_student(
        &self,
        student_id: &str,
        request: UpdateStudentRequest,
    ) -> Result<Student> {
        info!("Updating student: {}", student_id);

        let mut student = self
            .store
            .get_student(student_id)
            .await?
            .ok_or_else(|| anyhow!("Student not found: {}", student_id))?;

        if let Some(name) = request.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(anyhow!("Student name is required"));
            }
            student.name = name;
        }
        if let Some(level) = request.education_level {
            student.education_level = level;
        }
        if let Some(class) = request.class {
            student.class = class.trim().to_string();
        }
        if let Some(phone) = request.phone {
            student.phone = phone.trim().to_string();
        }
        if let Some(parent_name) = request.parent_name {
            student.parent_name = parent_name.trim().to_string();
        }
        if let Some(notes) = request.notes {
            student.notes = notes;
        }
        if let Some(status) = request.status {
            student.status = status;
        }
        student.updated_at = Some(Utc::now().to_rfc3339());

        self.store.update_student(&student).await?;
        Ok(student)
    }

    /// Soft delete: the row stays in storage with its payment history so
    /// the monitoring views keep their totals.
    pub async fn soft_delete_student(&self, student_id: &str) -> Result<Student> {
        info!("Soft-deleting student: {}", student_id);

        let mut student = self
            .store
            .get_student(student_id)
            .await?
            .ok_or_else(|| anyhow!("Student not found: {}", student_id))?;
        student.is_deleted = true;
        student.deleted_at = Some(Utc::now().to_rfc3339());
        student.updated_at = student.deleted_at.clone();
        self.store.update_student(&student).await?;
        Ok(student)
    }

    /// Soft delete every active student. Returns how many were flagged.
    pub async fn soft_delete_all(&self) -> Result<u32> {
        let students = self.list_students(false).await?;
        let mut flagged = 0u32;
        for student in students {
            self.soft_delete_student(&student.id).await?;
            flagged += 1;
        }
        warn!("Soft-deleted all {} active students", flagged);
        Ok(flagged)
    }

    pub async fn reactivate_student(&self, student_id: &str) -> Result<Student> {
        info!("Reactivating student: {}", student_id);

        let mut student = self
            .store
            .get_student(student_id)
            .await?
            .ok_or_else(|| anyhow!("Student not found: {}", student_id))?;
        student.is_deleted = false;
        student.deleted_at = None;
        student.updated_at = Some(Utc::now().to_rfc3339());
        self.store.update_student(&student).await?;
        Ok(student)
    }

    /// Hard delete removes the row and its payment history for good;
    /// used for duplicate cleanup, not day-to-day removal.
    pub async fn hard_delete_student(&self, student_id: &str) -> Result<bool> {
        warn!("Hard-deleting student: {}", student_id);
        self.store.delete_student(student_id).await
    }

    pub async fn hard_delete_students(&self, student_ids: &[String]) -> Result<u32> {
        warn!("Hard-deleting {} students", student_ids.len());
        self.store.delete_students(student_ids).await
    }

    /// Headcount per education level, active students only.
    pub async fn education_stats(&self) -> Result<EducationStats> {
        let students = self.list_students(false).await?;
        let mut stats = EducationStats::default();
        for student in &students {
            match student.education_level {
                EducationLevel::TK => stats.tk += 1,
                EducationLevel::SD => stats.sd += 1,
                EducationLevel::SMP => stats.smp += 1,
                EducationLevel::SMA => stats.sma += 1,
                EducationLevel::Umum => stats.umum += 1,
                EducationLevel::Unknown => stats.unknown += 1,
            }
        }
        Ok(stats)
    }

    /// Record or clear a payment for one billing period. An empty
    /// payment date clears the period.
    pub async fn record_payment(
        &self,
        student_id: &str,
        request: &RecordPaymentRequest,
    ) -> Result<Student> {
        info!(
            "Recording payment: student={} period={}-{:02} date={:?}",
            student_id, request.year, request.month, request.payment_date
        );
        if !(1..=12).contains(&request.month) {
            return Err(anyhow!("Month out of range: {}", request.month));
        }
        let date = request.payment_date.trim();
        if !date.is_empty() {
            NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .with_context(|| format!("Invalid payment date: {}", date))?;
        }

        let mut student = self
            .store
            .get_student(student_id)
            .await?
            .ok_or_else(|| anyhow!("Student not found: {}", student_id))?;
        self.billing
            .apply_payment(&mut student.payments, request.month, request.year, date);
        student.updated_at = Some(Utc::now().to_rfc3339());
        self.store.update_student(&student).await?;
        Ok(student)
    }

    /// Move a student's registration date, shifting every billing
    /// deadline with it.
    pub async fn update_registration_date(
        &self,
        student_id: &str,
        date: &str,
    ) -> Result<Student> {
        info!("Updating registration date: student={} date={}", student_id, date);

        let parsed = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
            .with_context(|| format!("Invalid registration date: {}", date))?;

        let mut student = self
            .store
            .get_student(student_id)
            .await?
            .ok_or_else(|| anyhow!("Student not found: {}", student_id))?;
        student.created_at = Some(DateInput::from(parsed));
        student.updated_at = Some(Utc::now().to_rfc3339());
        self.store.update_student(&student).await?;
        Ok(student)
    }

    /// One monitoring-table row per active student for a billing period.
    pub async fn payment_status_rows(
        &self,
        month: u32,
        year: i32,
    ) -> Result<Vec<PaymentStatusRow>> {
        let students = self.list_students(false).await?;
        let rows = students
            .iter()
            .map(|student| PaymentStatusRow {
                student_id: student.id.clone(),
                name: student.name.clone(),
                education_level: student.education_level,
                deadline: self
                    .billing
                    .deadline(student, month, year)
                    .map(|d| d.format("%Y-%m-%d").to_string()),
                payment: self.billing.payment_status(student, month, year),
            })
            .collect();
        Ok(rows)
    }

    /// Twelve derived statuses (January..December) for one student.
    pub async fn payment_grid(&self, student_id: &str, year: i32) -> Result<PaymentGridResponse> {
        let student = self
            .store
            .get_student(student_id)
            .await?
            .ok_or_else(|| anyhow!("Student not found: {}", student_id))?;
        let months = (1..=12)
            .map(|month| self.billing.payment_status(&student, month, year))
            .collect();
        Ok(PaymentGridResponse {
            student_id: student.id,
            year,
            months,
        })
    }
}
