//! In-memory document store.
//!
//! Stands in for the remote document database during local runs and in
//! tests. Documents live in maps behind an async RwLock; batch writes
//! stage everything before touching the map so they stay all-or-nothing
//! like the real store's batch commit.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::info;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use shared::{AttendanceRecord, Student};

use super::traits::{AttendanceStorage, StudentStorage};

#[derive(Default)]
struct Collections {
    students: HashMap<String, Student>,
    attendance: HashMap<String, AttendanceRecord>,
    /// Insertion order for attendance, so listing is stable.
    attendance_order: Vec<String>,
}

/// Shared in-memory store implementing both storage contracts.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Collections>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StudentStorage for MemoryStore {
    async fn store_student(&self, student: &Student) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.students.contains_key(&student.id) {
            return Err(anyhow!("student already exists: {}", student.id));
        }
        inner.students.insert(student.id.clone(), student.clone());
        Ok(())
    }

    async fn get_student(&self, student_id: &str) -> Result<Option<Student>> {
        let inner = self.inner.read().await;
        Ok(inner.students.get(student_id).cloned())
    }

    async fn list_students(&self) -> Result<Vec<Student>> {
        let inner = self.inner.read().await;
        let mut students: Vec<Student> = inner.students.values().cloned().collect();
        students.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(students)
    }

    async fn update_student(&self, student: &Student) -> Result<()> {
        let mut inner = self.inner.write().await;
        if !inner.students.contains_key(&student.id) {
            return Err(anyhow!("student not found: {}", student.id));
        }
        inner.students.insert(student.id.clone(), student.clone());
        Ok(())
    }

    async fn delete_student(&self, student_id: &str) -> Result<bool> {
        let mut inner = self.inner.write().await;
        Ok(inner.students.remove(student_id).is_some())
    }

    async fn delete_students(&self, student_ids: &[String]) -> Result<u32> {
        let mut inner = self.inner.write().await;
        let mut removed = 0;
        for id in student_ids {
            if inner.students.remove(id).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[async_trait]
impl AttendanceStorage for MemoryStore {
    async fn append_batch(&self, records: &[AttendanceRecord]) -> Result<Vec<String>> {
        // Stage outside the map so a mid-batch failure cannot leave a
        // partial write behind.
        let staged: Vec<AttendanceRecord> = records
            .iter()
            .map(|r| {
                let mut stored = r.clone();
                if stored.id.is_empty() {
                    stored.id = AttendanceRecord::generate_id();
                }
                stored
            })
            .collect();

        let mut inner = self.inner.write().await;
        let mut ids = Vec::with_capacity(staged.len());
        for record in staged {
            ids.push(record.id.clone());
            inner.attendance_order.push(record.id.clone());
            inner.attendance.insert(record.id.clone(), record);
        }
        info!("committed batch of {} attendance records", ids.len());
        Ok(ids)
    }

    async fn list_records(&self) -> Result<Vec<AttendanceRecord>> {
        let inner = self.inner.read().await;
        let mut records: Vec<AttendanceRecord> = inner
            .attendance_order
            .iter()
            .filter_map(|id| inner.attendance.get(id).cloned())
            .collect();
        // Date descending, matching the store's indexed ordering;
        // insertion order breaks ties.
        records.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(records)
    }

    async fn update_record(&self, record: &AttendanceRecord) -> Result<bool> {
        let mut inner = self.inner.write().await;
        if !inner.attendance.contains_key(&record.id) {
            return Ok(false);
        }
        inner.attendance.insert(record.id.clone(), record.clone());
        Ok(true)
    }

    async fn delete_record(&self, record_id: &str) -> Result<bool> {
        let mut inner = self.inner.write().await;
        inner.attendance_order.retain(|id| id != record_id);
        Ok(inner.attendance.remove(record_id).is_some())
    }

    async fn delete_all_records(&self) -> Result<u32> {
        let mut inner = self.inner.write().await;
        let removed = inner.attendance.len() as u32;
        inner.attendance.clear();
        inner.attendance_order.clear();
        info!("deleted all {} attendance records", removed);
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{AttendanceStatus, EducationLevel};

    fn record(name: &str, date: &str) -> AttendanceRecord {
        AttendanceRecord {
            id: String::new(),
            date: date.to_string(),
            education_level: EducationLevel::SD,
            class_type: "Matematika".to_string(),
            location: "Rumah Kuning".to_string(),
            time_start: "09:00".to_string(),
            time_end: "10:30".to_string(),
            time_slot: "09:00-10:30".to_string(),
            student_name: name.to_string(),
            status: AttendanceStatus::Hadir,
            notes: String::new(),
            tutor: "Bu Rina".to_string(),
            timestamp: "2025-06-01T09:00:00+07:00".to_string(),
        }
    }

    fn student(name: &str) -> Student {
        Student {
            id: Student::generate_id(),
            name: name.to_string(),
            education_level: EducationLevel::SD,
            class: String::new(),
            phone: String::new(),
            parent_name: String::new(),
            notes: String::new(),
            status: shared::StudentStatus::Aktif,
            created_at: None,
            updated_at: None,
            payments: Default::default(),
            is_deleted: false,
            deleted_at: None,
        }
    }

    #[tokio::test]
    async fn student_crud_round_trip() {
        let store = MemoryStore::new();
        let mut s = student("Budi Santoso");
        store.store_student(&s).await.unwrap();

        let fetched = store.get_student(&s.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Budi Santoso");

        s.class = "X IPA 1".to_string();
        store.update_student(&s).await.unwrap();
        let fetched = store.get_student(&s.id).await.unwrap().unwrap();
        assert_eq!(fetched.class, "X IPA 1");

        assert!(store.delete_student(&s.id).await.unwrap());
        assert!(store.get_student(&s.id).await.unwrap().is_none());
        assert!(!store.delete_student(&s.id).await.unwrap());
    }

    #[tokio::test]
    async fn listing_students_orders_by_name() {
        let store = MemoryStore::new();
        store.store_student(&student("Citra")).await.unwrap();
        store.store_student(&student("Andi")).await.unwrap();
        store.store_student(&student("Budi")).await.unwrap();

        let names: Vec<String> = store
            .list_students()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["Andi", "Budi", "Citra"]);
    }

    #[tokio::test]
    async fn duplicate_store_is_rejected() {
        let store = MemoryStore::new();
        let s = student("Andi");
        store.store_student(&s).await.unwrap();
        assert!(store.store_student(&s).await.is_err());
    }

    #[tokio::test]
    async fn batch_append_assigns_ids_in_order() {
        let store = MemoryStore::new();
        let ids = store
            .append_batch(&[record("Andi", "2025-06-01"), record("Budi", "2025-06-01")])
            .await
            .unwrap();
        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
        assert!(ids[0].starts_with("attendance::"));

        let records = store.list_records().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].student_name, "Andi");
        assert_eq!(records[1].student_name, "Budi");
    }

    #[tokio::test]
    async fn listing_orders_by_date_descending() {
        let store = MemoryStore::new();
        store
            .append_batch(&[record("Andi", "2025-06-01"), record("Budi", "2025-06-03")])
            .await
            .unwrap();

        let records = store.list_records().await.unwrap();
        assert_eq!(records[0].date, "2025-06-03");
        assert_eq!(records[1].date, "2025-06-01");
    }

    #[tokio::test]
    async fn delete_all_empties_the_collection() {
        let store = MemoryStore::new();
        store
            .append_batch(&[record("Andi", "2025-06-01"), record("Budi", "2025-06-02")])
            .await
            .unwrap();
        assert_eq!(store.delete_all_records().await.unwrap(), 2);
        assert!(store.list_records().await.unwrap().is_empty());
        assert_eq!(store.delete_all_records().await.unwrap(), 0);
    }
}
