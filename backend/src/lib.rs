//! Tutoring-center attendance and billing backend.
//!
//! Layers: `domain` holds the billing engine, time-slot generation, the
//! session draft aggregator and the two orchestration services;
//! `storage` holds the async collection traits and the in-memory store;
//! `io` exposes the REST surface.

use std::sync::Arc;

use axum::{
    http::{HeaderValue, Method},
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

pub mod domain;
pub mod io;
pub mod storage;

pub use io::rest::AppState;

use domain::{AttendanceService, StudentService};
use storage::MemoryStore;

/// Wire all services to a fresh in-memory store.
pub fn initialize_backend() -> AppState {
    let store = Arc::new(MemoryStore::new());
    AppState::new(
        StudentService::new(store.clone()),
        AttendanceService::new(store),
    )
}

/// Build the application router with the full API surface and CORS for
/// the local frontend.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin("http://localhost:8080".parse::<HeaderValue>().unwrap())
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    let api_routes = Router::new()
        .route(
            "/students",
            get(io::rest::list_students)
                .post(io::rest::create_student)
                .delete(io::rest::delete_all_students),
        )
        .route("/students/stats", get(io::rest::education_stats))
        .route("/students/purge", post(io::rest::purge_students))
        .route(
            "/students/:id",
            get(io::rest::get_student)
                .put(io::rest::update_student)
                .delete(io::rest::delete_student),
        )
        .route("/students/:id/reactivate", post(io::rest::reactivate_student))
        .route("/students/:id/purge", delete(io::rest::purge_student))
        .route(
            "/students/:id/payments",
            get(io::rest::payment_grid).put(io::rest::record_payment),
        )
        .route(
            "/students/:id/registration-date",
            put(io::rest::update_registration_date),
        )
        .route("/payments/status", get(io::rest::payment_status_rows))
        .route(
            "/attendance",
            get(io::rest::list_attendance).delete(io::rest::delete_all_attendance),
        )
        .route("/attendance/batch", post(io::rest::submit_attendance_batch))
        .route("/attendance/classes", get(io::rest::class_options))
        .route("/attendance/monthly-counts", get(io::rest::monthly_counts))
        .route(
            "/attendance/:id",
            put(io::rest::update_attendance).delete(io::rest::delete_attendance),
        )
        .route("/schedule/slots", get(io::rest::schedule_slots));

    Router::new()
        .nest("/api", api_routes)
        .layer(cors)
        .with_state(state)
}
