use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use log::{error, info};
use serde::Deserialize;

use shared::{
    AttendanceListRequest, AttendanceListResponse, AttendanceRecord, CreateStudentRequest,
    EducationLevel, RecordPaymentRequest, StudentListResponse, UpdateAttendanceRequest,
    UpdateRegistrationDateRequest, UpdateStudentRequest,
};

use crate::domain::{schedule, AttendanceService, StudentService};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub student_service: StudentService,
    pub attendance_service: AttendanceService,
}

impl AppState {
    pub fn new(student_service: StudentService, attendance_service: AttendanceService) -> Self {
        Self {
            student_service,
            attendance_service,
        }
    }
}

/// Query parameters for the student list endpoint.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct StudentListQuery {
    #[serde(default)]
    pub include_deleted: bool,
    pub q: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct PeriodQuery {
    pub month: u32,
    pub year: i32,
}

#[derive(Deserialize, Debug)]
pub struct YearQuery {
    pub year: i32,
}

#[derive(Deserialize, Debug)]
pub struct SlotQuery {
    pub level: EducationLevel,
}

#[derive(Deserialize, Debug)]
pub struct PurgeRequest {
    pub ids: Vec<String>,
}

/// Query parameters for the attendance list endpoint.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceListQuery {
    pub tutor: Option<String>,
    pub class_type: Option<String>,
    pub education_level: Option<EducationLevel>,
    pub location: Option<String>,
    pub month: Option<u32>,
    pub year: Option<i32>,
}

// ---- student handlers ----

/// GET /api/students
pub async fn list_students(
    State(state): State<AppState>,
    Query(query): Query<StudentListQuery>,
) -> impl IntoResponse {
    info!("GET /api/students - query: {:?}", query);

    let result = match &query.q {
        Some(q) => state.student_service.search_students(q).await,
        None => state.student_service.list_students(query.include_deleted).await,
    };
    match result {
        Ok(students) => (StatusCode::OK, Json(StudentListResponse { students })).into_response(),
        Err(e) => {
            error!("Error listing students: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error listing students").into_response()
        }
    }
}

/// POST /api/students
pub async fn create_student(
    State(state): State<AppState>,
    Json(request): Json<CreateStudentRequest>,
) -> impl IntoResponse {
    info!("POST /api/students - name: {}", request.name);

    match state.student_service.create_student(request).await {
        Ok(student) => (StatusCode::CREATED, Json(student)).into_response(),
        Err(e) => {
            error!("Error creating student: {:?}", e);
            (StatusCode::BAD_REQUEST, e.to_string()).into_response()
        }
    }
}

/// GET /api/students/:id
pub async fn get_student(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
) -> impl IntoResponse {
    info!("GET /api/students/{}", student_id);

    match state.student_service.get_student(&student_id).await {
        Ok(Some(student)) => (StatusCode::OK, Json(student)).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, "Student not found").into_response(),
        Err(e) => {
            error!("Error retrieving student: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error retrieving student").into_response()
        }
    }
}

/// PUT /api/students/:id
pub async fn update_student(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
    Json(request): Json<UpdateStudentRequest>,
) -> impl IntoResponse {
    info!("PUT /api/students/{}", student_id);

    match state.student_service.update_student(&student_id, request).await {
        Ok(student) => (StatusCode::OK, Json(student)).into_response(),
        Err(e) => {
            error!("Error updating student: {:?}", e);
            (StatusCode::BAD_REQUEST, e.to_string()).into_response()
        }
    }
}

/// DELETE /api/students/:id — soft delete, payments preserved.
pub async fn delete_student(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
) -> impl IntoResponse {
    info!("DELETE /api/students/{}", student_id);

    match state.student_service.soft_delete_student(&student_id).await {
        Ok(student) => (StatusCode::OK, Json(student)).into_response(),
        Err(e) => {
            error!("Error deleting student: {:?}", e);
            (StatusCode::NOT_FOUND, e.to_string()).into_response()
        }
    }
}

/// DELETE /api/students — soft delete the whole active roster.
pub async fn delete_all_students(State(state): State<AppState>) -> impl IntoResponse {
    info!("DELETE /api/students");

    match state.student_service.soft_delete_all().await {
        Ok(flagged) => (StatusCode::OK, Json(flagged)).into_response(),
        Err(e) => {
            error!("Error deleting students: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error deleting students").into_response()
        }
    }
}

/// DELETE /api/students/:id/purge — physical removal, history and all.
pub async fn purge_student(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
) -> impl IntoResponse {
    info!("DELETE /api/students/{}/purge", student_id);

    match state.student_service.hard_delete_student(&student_id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => (StatusCode::NOT_FOUND, "Student not found").into_response(),
        Err(e) => {
            error!("Error purging student: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error purging student").into_response()
        }
    }
}

/// POST /api/students/:id/reactivate
pub async fn reactivate_student(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
) -> impl IntoResponse {
    info!("POST /api/students/{}/reactivate", student_id);

    match state.student_service.reactivate_student(&student_id).await {
        Ok(student) => (StatusCode::OK, Json(student)).into_response(),
        Err(e) => {
            error!("Error reactivating student: {:?}", e);
            (StatusCode::NOT_FOUND, e.to_string()).into_response()
        }
    }
}

/// POST /api/students/purge — hard delete for duplicate cleanup.
pub async fn purge_students(
    State(state): State<AppState>,
    Json(request): Json<PurgeRequest>,
) -> impl IntoResponse {
    info!("POST /api/students/purge - {} ids", request.ids.len());

    match state.student_service.hard_delete_students(&request.ids).await {
        Ok(removed) => (StatusCode::OK, Json(removed)).into_response(),
        Err(e) => {
            error!("Error purging students: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error purging students").into_response()
        }
    }
}

/// GET /api/students/stats
pub async fn education_stats(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /api/students/stats");

    match state.student_service.education_stats().await {
        Ok(stats) => (StatusCode::OK, Json(stats)).into_response(),
        Err(e) => {
            error!("Error computing stats: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error computing stats").into_response()
        }
    }
}

// ---- payment handlers ----

/// PUT /api/students/:id/payments — record or clear one period.
pub async fn record_payment(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
    Json(request): Json<RecordPaymentRequest>,
) -> impl IntoResponse {
    info!(
        "PUT /api/students/{}/payments - period {}-{:02}",
        student_id, request.year, request.month
    );

    match state.student_service.record_payment(&student_id, &request).await {
        Ok(student) => (StatusCode::OK, Json(student)).into_response(),
        Err(e) => {
            error!("Error recording payment: {:?}", e);
            (StatusCode::BAD_REQUEST, e.to_string()).into_response()
        }
    }
}

/// PUT /api/students/:id/registration-date
pub async fn update_registration_date(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
    Json(request): Json<UpdateRegistrationDateRequest>,
) -> impl IntoResponse {
    info!("PUT /api/students/{}/registration-date", student_id);

    match state
        .student_service
        .update_registration_date(&student_id, &request.date)
        .await
    {
        Ok(student) => (StatusCode::OK, Json(student)).into_response(),
        Err(e) => {
            error!("Error updating registration date: {:?}", e);
            (StatusCode::BAD_REQUEST, e.to_string()).into_response()
        }
    }
}

/// GET /api/payments/status?month=&year= — monitoring-table rows.
pub async fn payment_status_rows(
    State(state): State<AppState>,
    Query(query): Query<PeriodQuery>,
) -> impl IntoResponse {
    info!("GET /api/payments/status - {}-{:02}", query.year, query.month);

    match state
        .student_service
        .payment_status_rows(query.month, query.year)
        .await
    {
        Ok(rows) => (StatusCode::OK, Json(rows)).into_response(),
        Err(e) => {
            error!("Error computing payment status: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error computing payment status").into_response()
        }
    }
}

/// GET /api/students/:id/payments?year= — 12-month grid.
pub async fn payment_grid(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
    Query(query): Query<YearQuery>,
) -> impl IntoResponse {
    info!("GET /api/students/{}/payments - year {}", student_id, query.year);

    match state.student_service.payment_grid(&student_id, query.year).await {
        Ok(grid) => (StatusCode::OK, Json(grid)).into_response(),
        Err(e) => {
            error!("Error computing payment grid: {:?}", e);
            (StatusCode::NOT_FOUND, e.to_string()).into_response()
        }
    }
}

// ---- attendance handlers ----

/// GET /api/attendance
pub async fn list_attendance(
    State(state): State<AppState>,
    Query(query): Query<AttendanceListQuery>,
) -> impl IntoResponse {
    info!("GET /api/attendance - query: {:?}", query);

    let request = AttendanceListRequest {
        tutor: query.tutor,
        class_type: query.class_type,
        education_level: query.education_level,
        location: query.location,
        month: query.month,
        year: query.year,
    };
    match state.attendance_service.list_records(&request).await {
        Ok(records) => (StatusCode::OK, Json(AttendanceListResponse { records })).into_response(),
        Err(e) => {
            error!("Error listing attendance: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error listing attendance").into_response()
        }
    }
}

/// POST /api/attendance/batch — atomic all-or-nothing commit.
pub async fn submit_attendance_batch(
    State(state): State<AppState>,
    Json(records): Json<Vec<AttendanceRecord>>,
) -> impl IntoResponse {
    info!("POST /api/attendance/batch - {} records", records.len());

    match state.attendance_service.submit_batch(&records).await {
        Ok(result) if result.success => (StatusCode::CREATED, Json(result)).into_response(),
        Ok(result) => (StatusCode::UNPROCESSABLE_ENTITY, Json(result)).into_response(),
        Err(e) => {
            error!("Error submitting attendance batch: {:?}", e);
            (StatusCode::BAD_REQUEST, e.to_string()).into_response()
        }
    }
}

/// PUT /api/attendance/:id
pub async fn update_attendance(
    State(state): State<AppState>,
    Path(record_id): Path<String>,
    Json(request): Json<UpdateAttendanceRequest>,
) -> impl IntoResponse {
    info!("PUT /api/attendance/{}", record_id);

    match state.attendance_service.update_record(&record_id, request).await {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(e) => {
            error!("Error updating attendance: {:?}", e);
            (StatusCode::NOT_FOUND, e.to_string()).into_response()
        }
    }
}

/// DELETE /api/attendance/:id
pub async fn delete_attendance(
    State(state): State<AppState>,
    Path(record_id): Path<String>,
) -> impl IntoResponse {
    info!("DELETE /api/attendance/{}", record_id);

    match state.attendance_service.delete_record(&record_id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => (StatusCode::NOT_FOUND, "Attendance record not found").into_response(),
        Err(e) => {
            error!("Error deleting attendance: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error deleting attendance").into_response()
        }
    }
}

/// DELETE /api/attendance — wipe the collection.
pub async fn delete_all_attendance(State(state): State<AppState>) -> impl IntoResponse {
    info!("DELETE /api/attendance");

    match state.attendance_service.delete_all_records().await {
        Ok(removed) => (StatusCode::OK, Json(removed)).into_response(),
        Err(e) => {
            error!("Error deleting attendance: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error deleting attendance").into_response()
        }
    }
}

/// GET /api/attendance/classes
pub async fn class_options(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.attendance_service.class_options())).into_response()
}

/// GET /api/attendance/monthly-counts?year=
pub async fn monthly_counts(
    State(state): State<AppState>,
    Query(query): Query<YearQuery>,
) -> impl IntoResponse {
    info!("GET /api/attendance/monthly-counts - year {}", query.year);

    match state.attendance_service.monthly_counts(query.year).await {
        Ok(counts) => (StatusCode::OK, Json(counts)).into_response(),
        Err(e) => {
            error!("Error counting attendance: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error counting attendance").into_response()
        }
    }
}

// ---- schedule handler ----

/// GET /api/schedule/slots?level=
pub async fn schedule_slots(Query(query): Query<SlotQuery>) -> impl IntoResponse {
    (StatusCode::OK, Json(schedule::generate_time_slots(query.level))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use axum::response::Response;
    use shared::AttendanceStatus;
    use std::sync::Arc;

    fn test_state() -> AppState {
        let store = Arc::new(MemoryStore::new());
        AppState::new(
            StudentService::new(store.clone()),
            AttendanceService::new(store),
        )
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn student_create_and_get_round_trip() {
        let state = test_state();

        let request = CreateStudentRequest {
            name: "Andi".to_string(),
            education_level: EducationLevel::SD,
            class: "3".to_string(),
            phone: String::new(),
            parent_name: String::new(),
            notes: String::new(),
        };
        let created = create_student(State(state.clone()), Json(request))
            .await
            .into_response();
        assert_eq!(created.status(), StatusCode::CREATED);
        let student: shared::Student =
            serde_json::from_str(&body_string(created).await).unwrap();

        let fetched = get_student(State(state.clone()), Path(student.id.clone()))
            .await
            .into_response();
        assert_eq!(fetched.status(), StatusCode::OK);

        let missing = get_student(State(state), Path("student::nope".to_string()))
            .await
            .into_response();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn blank_name_is_a_bad_request() {
        let state = test_state();
        let request = CreateStudentRequest {
            name: "  ".to_string(),
            education_level: EducationLevel::SD,
            class: String::new(),
            phone: String::new(),
            parent_name: String::new(),
            notes: String::new(),
        };
        let response = create_student(State(state), Json(request))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn attendance_batch_and_listing() {
        let state = test_state();
        let record = AttendanceRecord {
            id: String::new(),
            date: "2025-06-02".to_string(),
            education_level: EducationLevel::SD,
            class_type: "Matematika".to_string(),
            location: "Sapphire".to_string(),
            time_start: "09:00".to_string(),
            time_end: "10:30".to_string(),
            time_slot: "09:00-10:30".to_string(),
            student_name: "Andi".to_string(),
            status: AttendanceStatus::Hadir,
            notes: String::new(),
            tutor: "Bu Rina".to_string(),
            timestamp: "2025-06-02T09:00:00Z".to_string(),
        };

        let submitted = submit_attendance_batch(State(state.clone()), Json(vec![record]))
            .await
            .into_response();
        assert_eq!(submitted.status(), StatusCode::CREATED);

        let empty = submit_attendance_batch(State(state.clone()), Json(vec![]))
            .await
            .into_response();
        assert_eq!(empty.status(), StatusCode::BAD_REQUEST);

        let listed = list_attendance(
            State(state),
            Query(AttendanceListQuery {
                tutor: Some("Bu Rina".to_string()),
                class_type: None,
                education_level: None,
                location: None,
                month: None,
                year: None,
            }),
        )
        .await
        .into_response();
        assert_eq!(listed.status(), StatusCode::OK);
        let body: AttendanceListResponse =
            serde_json::from_str(&body_string(listed).await).unwrap();
        assert_eq!(body.records.len(), 1);
    }

    #[tokio::test]
    async fn schedule_slots_handler_respects_level() {
        let response = schedule_slots(Query(SlotQuery {
            level: EducationLevel::TK,
        }))
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let slots: Vec<shared::TimeSlot> =
            serde_json::from_str(&body_string(response).await).unwrap();
        assert!(slots.iter().all(|s| s.end.as_str() <= "22:00"));
    }
}
