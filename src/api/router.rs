use axum::extract::DefaultBodyLimit;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers;
use super::AppState;

pub fn build(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);
    let body_limit = DefaultBodyLimit::max(state.config.upload_max_bytes);

    Router::new()
        // admin surface (bearer token)
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/dashboard/stats", get(handlers::dashboard::stats))
        .route(
            "/api/students",
            get(handlers::students::list).post(handlers::students::create),
        )
        .route(
            "/api/students/:id",
            get(handlers::students::get).delete(handlers::students::delete),
        )
        .route("/api/students/:id/summary", get(handlers::students::summary))
        .route(
            "/api/classes",
            get(handlers::classes::list).post(handlers::classes::create),
        )
        .route(
            "/api/classes/:id",
            get(handlers::classes::get).delete(handlers::classes::delete),
        )
        .route(
            "/api/classes/upload/timetable",
            post(handlers::classes::upload_timetable),
        )
        .route(
            "/api/attendance/class/:id",
            get(handlers::attendance::class_roster),
        )
        .route("/api/attendance/mark", post(handlers::attendance::mark))
        .route(
            "/api/reports/attendance",
            get(handlers::reports::attendance_report),
        )
        .route(
            "/api/export/attendance",
            get(handlers::export::attendance_export),
        )
        .route(
            "/api/send-attendance-email",
            post(handlers::email::send_attendance_email),
        )
        .route("/api/email/status", get(handlers::email::status))
        .route("/api/logs", post(handlers::logs::recent))
        // disabled by design
        .route(
            "/api/camera-test",
            get(handlers::camera::camera_test).post(handlers::camera::camera_test),
        )
        .route(
            "/api/camera-test/start",
            post(handlers::camera::camera_test),
        )
        // terminal-facing surface (no auth)
        .route("/api/process-frame", post(handlers::frames::process_frame))
        .route(
            "/api/terminal/current-class",
            get(handlers::terminal::current_class),
        )
        .route(
            "/api/terminal/classes",
            get(handlers::terminal::todays_classes),
        )
        .route(
            "/api/terminal/classes/:id",
            get(handlers::terminal::class_by_id),
        )
        .route("/ws", get(handlers::ws::upgrade))
        .layer(body_limit)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(
            origins
                .iter()
                .filter_map(|o| o.parse::<HeaderValue>().ok()),
        )
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
}
