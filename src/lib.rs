pub mod admission;
pub mod analytics;
pub mod auth;
pub mod catalog;
pub mod directory;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod ical;
pub mod ledger;
pub mod models;
pub mod openapi;
pub mod recurrence;
pub mod settings;
pub mod validation;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, routing::get, routing::post};
use handlers::{
    cancel_booking, cancel_session, create_booking, create_class, get_availability,
    get_daily_summary, get_schedule_ical, get_session_analytics, healthz_live, healthz_ready,
    list_sessions, mark_no_show, materialize_sessions, register_instructor, register_venue,
    report_payment, root, sweep_bookings, transition_sessions,
};
use tower_http::LatencyUnit;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{Level, info};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::engine::BookingEngine;
use crate::ical::ScheduleExporter;
use crate::openapi::ApiDoc;
use crate::settings::Settings;

#[derive(Clone)]
pub struct AppState {
    pub settings: Settings,
    pub engine: Arc<BookingEngine>,
    pub exporter: Arc<ScheduleExporter>,
}

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::from_env()?;

    let env_filter = if settings.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .without_time()
        .init();

    let state = AppState {
        settings: settings.clone(),
        engine: Arc::new(BookingEngine::new()),
        exporter: Arc::new(ScheduleExporter::new(settings.calendar_name.clone())),
    };

    let app = build_router(state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], state.settings.port));
    info!("Starting Studio Booking API on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(
            DefaultOnResponse::new()
                .level(Level::INFO)
                .latency_unit(LatencyUnit::Millis),
        );

    let mut router = Router::new()
        .route("/", get(root))
        .route("/healthz/live", get(healthz_live))
        .route("/healthz/ready", get(healthz_ready))
        .route("/venues", post(register_venue))
        .route("/instructors", post(register_instructor))
        .route("/classes", post(create_class))
        .route("/classes/{id}/sessions", post(materialize_sessions))
        .route("/sessions", get(list_sessions))
        .route("/sessions.ical", get(get_schedule_ical))
        .route("/sessions/transition", post(transition_sessions))
        .route("/sessions/{id}/cancel", post(cancel_session))
        .route("/sessions/{id}/availability", get(get_availability))
        .route("/sessions/{id}/analytics", get(get_session_analytics))
        .route("/bookings", post(create_booking))
        .route("/bookings/sweep", post(sweep_bookings))
        .route("/bookings/{id}/cancel", post(cancel_booking))
        .route("/bookings/{id}/payment", post(report_payment))
        .route("/bookings/{id}/no-show", post(mark_no_show))
        .route("/analytics/daily", get(get_daily_summary))
        .with_state(state.clone());

    if state.settings.enable_swagger {
        let openapi = ApiDoc::openapi();
        let swagger = SwaggerUi::new("/docs").url("/openapi.json", openapi);
        router = router.merge(swagger);
    }

    router.layer(trace_layer)
}
