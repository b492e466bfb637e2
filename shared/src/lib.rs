use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Education level a student is enrolled under. Drives session duration
/// (TK sessions run 60 minutes, everything else 90).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum EducationLevel {
    TK,
    SD,
    SMP,
    SMA,
    Umum,
    /// Legacy documents store `""` (or nothing) when no level was set;
    /// keep that wire form on the way back out.
    #[default]
    #[serde(rename = "", other)]
    Unknown,
}

impl EducationLevel {
    /// Parse the level the way the document store records it. Anything
    /// unrecognized (including empty) maps to `Unknown`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_uppercase().as_str() {
            "TK" => EducationLevel::TK,
            "SD" => EducationLevel::SD,
            "SMP" => EducationLevel::SMP,
            "SMA" => EducationLevel::SMA,
            "UMUM" => EducationLevel::Umum,
            _ => EducationLevel::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EducationLevel::TK => "TK",
            EducationLevel::SD => "SD",
            EducationLevel::SMP => "SMP",
            EducationLevel::SMA => "SMA",
            EducationLevel::Umum => "Umum",
            EducationLevel::Unknown => "",
        }
    }
}

impl fmt::Display for EducationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Roster status. Students on leave (Cuti) or inactive (Off) cannot be
/// added to an attendance session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum StudentStatus {
    #[default]
    Aktif,
    Cuti,
    Off,
}

impl fmt::Display for StudentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StudentStatus::Aktif => "Aktif",
            StudentStatus::Cuti => "Cuti",
            StudentStatus::Off => "Off",
        };
        write!(f, "{}", s)
    }
}

/// Registration date as it arrives from the document store: either a
/// string (RFC 3339 or plain `YYYY-MM-DD`) or the store's timestamp
/// wrapper (`{seconds, nanoseconds}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DateInput {
    Timestamp { seconds: i64, nanoseconds: u32 },
    Text(String),
}

impl DateInput {
    /// Normalize to a calendar date. Malformed input yields `None` —
    /// payment status is advisory display data, never worth a panic.
    pub fn to_calendar_date(&self) -> Option<NaiveDate> {
        match self {
            DateInput::Timestamp { seconds, nanoseconds } => {
                chrono::DateTime::from_timestamp(*seconds, *nanoseconds)
                    .map(|dt| dt.date_naive())
            }
            DateInput::Text(s) => {
                let s = s.trim();
                if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
                    return Some(dt.date_naive());
                }
                // Bare date, with or without a trailing time component.
                let date_part = s.split('T').next().unwrap_or(s);
                NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
            }
        }
    }
}

impl From<NaiveDate> for DateInput {
    fn from(d: NaiveDate) -> Self {
        DateInput::Text(d.format("%Y-%m-%d").to_string())
    }
}

/// A tutoring-center student as stored in the `students` collection.
///
/// `payments` is sparse: a `"YYYY-MM"` key exists only when a payment was
/// recorded for that billing period, and its value is the payment date
/// (`YYYY-MM-DD`). Students are soft-deleted so payment history survives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub education_level: EducationLevel,
    #[serde(default)]
    pub class: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub parent_name: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub status: StudentStatus,
    /// Registration date; absent for legacy rows imported without one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub payments: BTreeMap<String, String>,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<String>,
}

impl Student {
    pub fn generate_id() -> String {
        format!("student::{}", uuid::Uuid::new_v4())
    }

    /// Registration date normalized once at the model boundary; the
    /// billing engine only ever sees this canonical form.
    pub fn registration_date(&self) -> Option<NaiveDate> {
        self.created_at.as_ref().and_then(DateInput::to_calendar_date)
    }
}

/// Attendance outcome for one student in one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AttendanceStatus {
    #[default]
    Hadir,
    #[serde(rename = "Tidak Hadir")]
    TidakHadir,
    Izin,
    Sakit,
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AttendanceStatus::Hadir => "Hadir",
            AttendanceStatus::TidakHadir => "Tidak Hadir",
            AttendanceStatus::Izin => "Izin",
            AttendanceStatus::Sakit => "Sakit",
        };
        write!(f, "{}", s)
    }
}

/// One attendance row in the `attendance` collection. The student is
/// denormalized by name, not referenced by id; identity is assigned by
/// storage when a batch is committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    #[serde(default)]
    pub id: String,
    /// Session date, `YYYY-MM-DD`.
    pub date: String,
    pub education_level: EducationLevel,
    pub class_type: String,
    pub location: String,
    pub time_start: String,
    pub time_end: String,
    /// Derived `"start-end"` grouping key.
    pub time_slot: String,
    pub student_name: String,
    pub status: AttendanceStatus,
    #[serde(default)]
    pub notes: String,
    pub tutor: String,
    /// Staging timestamp, RFC 3339.
    pub timestamp: String,
}

impl AttendanceRecord {
    pub fn generate_id() -> String {
        format!("attendance::{}", uuid::Uuid::new_v4())
    }
}

/// A selectable session time slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start: String,
    pub end: String,
    pub label: String,
}

impl TimeSlot {
    /// The `"start-end"` key drafts are grouped under.
    pub fn key(&self) -> String {
        format!("{}-{}", self.start, self.end)
    }
}

/// Where a billing period stands. Derived on every query, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentState {
    None,
    Pending,
    Overdue,
    Paid,
    PaidLate,
}

/// Derived payment status for one (student, month, year) cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatus {
    pub status: PaymentState,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_date: Option<String>,
    pub is_overdue: bool,
}

// ---- request/response payloads ----

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStudentRequest {
    pub name: String,
    #[serde(default)]
    pub education_level: EducationLevel,
    #[serde(default)]
    pub class: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub parent_name: String,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStudentRequest {
    pub name: Option<String>,
    pub education_level: Option<EducationLevel>,
    pub class: Option<String>,
    pub phone: Option<String>,
    pub parent_name: Option<String>,
    pub notes: Option<String>,
    pub status: Option<StudentStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentListResponse {
    pub students: Vec<Student>,
}

/// Per-level headcount for the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EducationStats {
    pub tk: u32,
    pub sd: u32,
    pub smp: u32,
    pub sma: u32,
    pub umum: u32,
    pub unknown: u32,
}

/// Record (or clear) a payment for one billing period. An empty
/// `payment_date` unsets the period, reverting it to pending/overdue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPaymentRequest {
    pub month: u32,
    pub year: i32,
    #[serde(default)]
    pub payment_date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRegistrationDateRequest {
    /// `YYYY-MM-DD`.
    pub date: String,
}

/// One row of the admin payment-monitoring table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusRow {
    pub student_id: String,
    pub name: String,
    pub education_level: EducationLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,
    pub payment: PaymentStatus,
}

/// Twelve derived statuses for one student, January through December.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentGridResponse {
    pub student_id: String,
    pub year: i32,
    pub months: Vec<PaymentStatus>,
}

/// Optional filters for listing attendance records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceListRequest {
    pub tutor: Option<String>,
    pub class_type: Option<String>,
    pub education_level: Option<EducationLevel>,
    pub location: Option<String>,
    pub month: Option<u32>,
    pub year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceListResponse {
    pub records: Vec<AttendanceRecord>,
}

/// Per-field attendance edit; only the provided fields change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAttendanceRequest {
    pub date: Option<String>,
    pub education_level: Option<EducationLevel>,
    pub class_type: Option<String>,
    pub location: Option<String>,
    pub time_start: Option<String>,
    pub time_end: Option<String>,
    pub student_name: Option<String>,
    pub status: Option<AttendanceStatus>,
    pub notes: Option<String>,
    pub tutor: Option<String>,
}

/// Outcome of one record inside a batch submit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSubmitResult {
    pub success: bool,
    pub student_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregate outcome of an attendance batch submit. The batch is
/// all-or-nothing: on failure every record reports the same error and
/// nothing was written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSubmitResult {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub results: Vec<RecordSubmitResult>,
}
