use anyhow::{anyhow, Result};
use chrono::{Datelike, NaiveDate};
use log::{info, warn};
use std::collections::BTreeMap;
use std::sync::Arc;

use shared::{
    AttendanceListRequest, AttendanceRecord, BatchSubmitResult, RecordSubmitResult,
    UpdateAttendanceRequest,
};

use crate::storage::AttendanceStorage;

/// Class subjects offered by the center. Fixed list, not user-editable.
const CLASS_OPTIONS: &[&str] = &[
    "Matematika",
    "Fisika",
    "Kimia",
    "Biologi",
    "Bahasa Inggris",
    "Bahasa Indonesia",
    "Komputer",
    "Calistung",
    "IPA",
    "IPS",
];

/// Service for querying and editing committed attendance records.
#[derive(Clone)]
pub struct AttendanceService {
    store: Arc<dyn AttendanceStorage>,
}

impl AttendanceService {
    pub fn new(store: Arc<dyn AttendanceStorage>) -> Self {
        Self { store }
    }

    pub fn class_options(&self) -> Vec<String> {
        CLASS_OPTIONS.iter().map(|s| s.to_string()).collect()
    }

    /// List records newest-first, narrowed by whichever filters are set.
    /// The month filter only applies when a year is given too.
    pub async fn list_records(
        &self,
        filters: &AttendanceListRequest,
    ) -> Result<Vec<AttendanceRecord>> {
        let mut records = self.store.list_records().await?;

        if let Some(tutor) = &filters.tutor {
            records.retain(|r| r.tutor == *tutor);
        }
        if let Some(class_type) = &filters.class_type {
            records.retain(|r| r.class_type == *class_type);
        }
        if let Some(level) = filters.education_level {
            records.retain(|r| r.education_level == level);
        }
        if let Some(location) = &filters.location {
            records.retain(|r| r.location == *location);
        }
        if let Some(year) = filters.year {
            records.retain(|r| match record_date(r) {
                Some(d) => d.year() == year && filters.month.map_or(true, |m| d.month() == m),
                None => false,
            });
        }

        info!("Found {} attendance records", records.len());
        Ok(records)
    }

    /// Per-field edit; only the provided fields change. The grouping key
    /// is re-derived whenever either end of the time range moves.
    pub async fn update_record(
        &self,
        record_id: &str,
        request: UpdateAttendanceRequest,
    ) -> Result<AttendanceRecord> {
        info!("Updating attendance record: {}", record_id);

        let mut record = self
            .store
            .list_records()
            .await?
            .into_iter()
            .find(|r| r.id == record_id)
            .ok_or_else(|| anyhow!("Attendance record not found: {}", record_id))?;

        if let Some(date) = request.date {
            record.date = date;
        }
        if let Some(level) = request.education_level {
            record.education_level = level;
        }
        if let Some(class_type) = request.class_type {
            record.class_type = class_type;
        }
        if let Some(location) = request.location {
            record.location = location;
        }
        if let Some(student_name) = request.student_name {
            record.student_name = student_name;
        }
        if let Some(status) = request.status {
            record.status = status;
        }
        if let Some(notes) = request.notes {
            record.notes = notes;
        }
        if let Some(tutor) = request.tutor {
            record.tutor = tutor;
        }
        let time_changed = request.time_start.is_some() || request.time_end.is_some();
        if let Some(time_start) = request.time_start {
            record.time_start = time_start;
        }
        if let Some(time_end) = request.time_end {
            record.time_end = time_end;
        }
        if time_changed {
            record.time_slot = format!("{}-{}", record.time_start, record.time_end);
        }

        if !self.store.update_record(&record).await? {
            return Err(anyhow!("Attendance record not found: {}", record_id));
        }
        Ok(record)
    }

    /// Commit a pre-staged batch on behalf of a remote client. The write
    /// is all-or-nothing; a store failure is reported per record, not as
    /// a transport error, so the client can show row-level detail.
    pub async fn submit_batch(&self, records: &[AttendanceRecord]) -> Result<BatchSubmitResult> {
        if records.is_empty() {
            return Err(anyhow!("No attendance records to submit"));
        }
        match self.store.append_batch(records).await {
            Ok(ids) => {
                info!("committed a batch of {} attendance records", records.len());
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
                Ok(BatchSubmitResult {
                    success: true,
                    message: format!("Berhasil menyimpan {} data presensi", records.len()),
                    error: None,
                    results,
                })
            }
            Err(e) => {
                warn!("attendance batch submit failed: {}", e);
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

    pub async fn delete_record(&self, record_id: &str) -> Result<bool> {
        info!("Deleting attendance record: {}", record_id);
        self.store.delete_record(record_id).await
    }

    /// Wipe the whole collection. Returns how many records were removed.
    pub async fn delete_all_records(&self) -> Result<u32> {
        warn!("Deleting ALL attendance records");
        self.store.delete_all_records().await
    }

    /// Record counts per `"YYYY-MM"` period for the dashboard, ascending
    /// by period. Records with unparseable dates are skipped.
    pub async fn monthly_counts(&self, year: i32) -> Result<BTreeMap<String, u32>> {
        let records = self.store.list_records().await?;
        let mut counts = BTreeMap::new();
        for record in &records {
            if let Some(d) = record_date(record) {
                if d.year() == year {
                    let key = format!("{}-{:02}", d.year(), d.month());
                    *counts.entry(key).or_insert(0) += 1;
                }
            }
        }
        Ok(counts)
    }
}

fn record_date(record: &AttendanceRecord) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&record.date, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use shared::{AttendanceStatus, EducationLevel};

    fn record(date: &str, tutor: &str, class_type: &str, level: EducationLevel) -> AttendanceRecord {
        AttendanceRecord {
            id: String::new(),
            date: date.to_string(),
            education_level: level,
            class_type: class_type.to_string(),
            location: "Rumah Kuning".to_string(),
            time_start: "09:00".to_string(),
            time_end: "10:30".to_string(),
            time_slot: "09:00-10:30".to_string(),
            student_name: "Andi".to_string(),
            status: AttendanceStatus::Hadir,
            notes: String::new(),
            tutor: tutor.to_string(),
            timestamp: "2025-06-02T09:00:00Z".to_string(),
        }
    }

    async fn seeded_service() -> AttendanceService {
        let store = Arc::new(MemoryStore::new());
        store
            .append_batch(&[
                record("2025-06-02", "Bu Rina", "Matematika", EducationLevel::SD),
                record("2025-06-15", "Pak Budi", "Fisika", EducationLevel::SMA),
                record("2025-07-01", "Bu Rina", "Matematika", EducationLevel::SD),
                record("2024-06-02", "Bu Rina", "Kimia", EducationLevel::SMA),
            ])
            .await
            .unwrap();
        AttendanceService::new(store)
    }

    #[tokio::test]
    async fn filters_narrow_the_listing() {
        let svc = seeded_service().await;

        let all = svc
            .list_records(&AttendanceListRequest::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 4);
        // Newest first.
        assert_eq!(all[0].date, "2025-07-01");

        let by_tutor = svc
            .list_records(&AttendanceListRequest {
                tutor: Some("Bu Rina".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_tutor.len(), 3);

        let combined = svc
            .list_records(&AttendanceListRequest {
                tutor: Some("Bu Rina".to_string()),
                class_type: Some("Matematika".to_string()),
                education_level: Some(EducationLevel::SD),
                month: Some(6),
                year: Some(2025),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(combined.len(), 1);
        assert_eq!(combined[0].date, "2025-06-02");
    }

    #[tokio::test]
    async fn month_filter_requires_a_year() {
        let svc = seeded_service().await;
        // Month alone is ignored; both Junes and everything else match.
        let records = svc
            .list_records(&AttendanceListRequest {
                month: Some(6),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(records.len(), 4);

        let year_only = svc
            .list_records(&AttendanceListRequest {
                year: Some(2025),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(year_only.len(), 3);
    }

    #[tokio::test]
    async fn update_rederives_the_grouping_key() {
        let svc = seeded_service().await;
        let target = svc
            .list_records(&AttendanceListRequest::default())
            .await
            .unwrap()
            .into_iter()
            .next()
            .unwrap();

        let updated = svc
            .update_record(
                &target.id,
                UpdateAttendanceRequest {
                    time_end: Some("11:00".to_string()),
                    status: Some(AttendanceStatus::Izin),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.time_slot, "09:00-11:00");
        assert_eq!(updated.status, AttendanceStatus::Izin);

        // A non-time edit leaves the key alone.
        let renamed = svc
            .update_record(
                &target.id,
                UpdateAttendanceRequest {
                    student_name: Some("Budi".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.time_slot, "09:00-11:00");
    }

    #[tokio::test]
    async fn update_unknown_record_fails() {
        let svc = seeded_service().await;
        assert!(svc
            .update_record("attendance::missing", UpdateAttendanceRequest::default())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn delete_one_and_delete_all() {
        let svc = seeded_service().await;
        let first = svc
            .list_records(&AttendanceListRequest::default())
            .await
            .unwrap()
            .remove(0);

        assert!(svc.delete_record(&first.id).await.unwrap());
        assert!(!svc.delete_record(&first.id).await.unwrap());

        assert_eq!(svc.delete_all_records().await.unwrap(), 3);
        assert!(svc
            .list_records(&AttendanceListRequest::default())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn monthly_counts_group_by_period() {
        let svc = seeded_service().await;
        let counts = svc.monthly_counts(2025).await.unwrap();
        assert_eq!(counts.get("2025-06"), Some(&2));
        assert_eq!(counts.get("2025-07"), Some(&1));
        assert_eq!(counts.get("2024-06"), None);
    }

    #[tokio::test]
    async fn submit_batch_assigns_ids_and_rejects_empty() {
        let svc = AttendanceService::new(Arc::new(MemoryStore::new()));
        assert!(svc.submit_batch(&[]).await.is_err());

        let result = svc
            .submit_batch(&[
                record("2025-06-02", "Bu Rina", "Matematika", EducationLevel::SD),
                record("2025-06-02", "Bu Rina", "Matematika", EducationLevel::SD),
            ])
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.results.len(), 2);
        assert!(result.results.iter().all(|r| r.success && r.id.is_some()));
        assert_eq!(
            svc.list_records(&AttendanceListRequest::default())
                .await
                .unwrap()
                .len(),
            2
        );
    }

    #[test]
    fn class_options_are_fixed() {
        let svc = AttendanceService::new(Arc::new(MemoryStore::new()));
        let options = svc.class_options();
        assert_eq!(options.len(), 10);
        assert_eq!(options[0], "Matematika");
        assert!(options.contains(&"Calistung".to_string()));
    }
}
