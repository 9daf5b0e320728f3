use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use axum_extra::extract::TypedHeader;
use axum_extra::headers::{Authorization, authorization::Bearer};
use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    AppState,
    auth::verify_token,
    error::ApiError,
    ical::ScheduleEvent,
    models::{Booking, ClassDefinition, ClassSession, SessionStatus},
    validation::{validate_date_range, validate_participant_count},
};

type AuthHeader = Option<TypedHeader<Authorization<Bearer>>>;

#[derive(Debug, Deserialize)]
pub struct AuthQuery {
    pub token: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterVenueRequest {
    pub name: String,
    pub capacity: u32,
    pub address: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterInstructorRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ListSessionsQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub venue_id: Option<Uuid>,
    pub instructor_id: Option<Uuid>,
    pub token: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateBookingRequest {
    pub session_id: Uuid,
    pub user_ref: String,
    pub participant_count: u32,
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentOutcome {
    Succeeded,
    Failed,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PaymentOutcomeRequest {
    pub outcome: PaymentOutcome,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TransitionRequest {
    /// Wall-clock instant to evaluate; defaults to the server's local time.
    #[schema(value_type = Option<String>, format = "date-time")]
    pub now: Option<NaiveDateTime>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SweepRequest {
    #[schema(value_type = Option<String>, format = "date-time")]
    pub now: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MaterializeResponse {
    pub session_count: usize,
    pub sessions: Vec<ClassSession>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SweepResponse {
    pub swept: u32,
}

#[derive(Debug, Deserialize)]
pub struct DailySummaryQuery {
    pub date: NaiveDate,
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ScheduleIcalQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub token: Option<String>,
}

fn authorize(state: &AppState, auth: AuthHeader, token: Option<&str>) -> Result<(), ApiError> {
    let auth_header = auth.map(|TypedHeader(a)| a);
    verify_token(&state.settings, auth_header, token)
}

#[utoipa::path(get, path = "/", tag = "booking")]
pub async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "Studio Booking API",
        "endpoints": {
            "/classes": "Create class definitions",
            "/sessions": "List materialized sessions",
            "/bookings": "Create bookings against session capacity"
        }
    }))
}

#[utoipa::path(get, path = "/healthz/live", tag = "booking")]
pub async fn healthz_live() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

#[utoipa::path(get, path = "/healthz/ready", tag = "booking")]
pub async fn healthz_ready() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

#[utoipa::path(
    post,
    path = "/venues",
    request_body = RegisterVenueRequest,
    responses(
        (status = 201, description = "Venue registered"),
        (status = 401, description = "Invalid authentication token")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "directory"
)]
pub async fn register_venue(
    State(state): State<AppState>,
    auth: AuthHeader,
    Query(query): Query<AuthQuery>,
    Json(body): Json<RegisterVenueRequest>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, auth, query.token.as_deref())?;
    if body.capacity < 1 {
        return Err(ApiError::BadRequest("capacity must be at least 1".into()));
    }
    let venue = state
        .engine
        .directory
        .register_venue(body.name, body.capacity, body.address);
    Ok((StatusCode::CREATED, Json(venue)))
}

#[utoipa::path(
    post,
    path = "/instructors",
    request_body = RegisterInstructorRequest,
    responses(
        (status = 201, description = "Instructor registered"),
        (status = 401, description = "Invalid authentication token")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "directory"
)]
pub async fn register_instructor(
    State(state): State<AppState>,
    auth: AuthHeader,
    Query(query): Query<AuthQuery>,
    Json(body): Json<RegisterInstructorRequest>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, auth, query.token.as_deref())?;
    let instructor = state.engine.directory.register_instructor(body.name);
    Ok((StatusCode::CREATED, Json(instructor)))
}

#[utoipa::path(
    post,
    path = "/classes",
    request_body = crate::models::NewClassDefinition,
    responses(
        (status = 201, description = "Class definition created", body = ClassDefinition),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Invalid authentication token"),
        (status = 404, description = "Unknown venue or instructor")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "booking"
)]
pub async fn create_class(
    State(state): State<AppState>,
    auth: AuthHeader,
    Query(query): Query<AuthQuery>,
    Json(body): Json<crate::models::NewClassDefinition>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, auth, query.token.as_deref())?;
    let definition = state.engine.create_definition(body)?;
    Ok((StatusCode::CREATED, Json(definition)))
}

#[utoipa::path(
    post,
    path = "/classes/{id}/sessions",
    params(("id" = Uuid, Path, description = "Class definition id")),
    responses(
        (status = 200, description = "Sessions materialized (idempotent)", body = MaterializeResponse),
        (status = 401, description = "Invalid authentication token"),
        (status = 404, description = "Unknown class definition")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "booking"
)]
pub async fn materialize_sessions(
    State(state): State<AppState>,
    auth: AuthHeader,
    Path(id): Path<Uuid>,
    Query(query): Query<AuthQuery>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, auth, query.token.as_deref())?;
    let sessions = state.engine.catalog.materialize(id)?;
    Ok(Json(MaterializeResponse {
        session_count: sessions.len(),
        sessions,
    }))
}

#[utoipa::path(
    get,
    path = "/sessions",
    params(
        ("from" = String, Query, description = "First date, inclusive (YYYY-MM-DD)"),
        ("to" = String, Query, description = "Last date, inclusive (YYYY-MM-DD)"),
        ("venue_id" = Option<Uuid>, Query, description = "Restrict to one venue"),
        ("instructor_id" = Option<Uuid>, Query, description = "Restrict to one instructor"),
        ("token" = Option<String>, Query, description = "Authentication token (alternative to Bearer header)")
    ),
    responses(
        (status = 200, description = "Sessions in range", body = [ClassSession]),
        (status = 400, description = "Invalid date range"),
        (status = 401, description = "Invalid authentication token")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "booking"
)]
pub async fn list_sessions(
    State(state): State<AppState>,
    auth: AuthHeader,
    Query(query): Query<ListSessionsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, auth, query.token.as_deref())?;
    validate_date_range(query.from, query.to)?;

    let sessions = state.engine.catalog.list_by_date_range(
        query.from,
        query.to,
        query.venue_id,
        query.instructor_id,
    );
    Ok(Json(sessions))
}

#[utoipa::path(
    get,
    path = "/sessions.ical",
    params(
        ("from" = String, Query, description = "First date, inclusive (YYYY-MM-DD)"),
        ("to" = String, Query, description = "Last date, inclusive (YYYY-MM-DD)"),
        ("token" = Option<String>, Query, description = "Authentication token (alternative to Bearer header)")
    ),
    responses(
        (status = 200, description = "iCal file", content_type = "text/calendar"),
        (status = 401, description = "Invalid authentication token"),
        (status = 404, description = "No sessions found")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "booking"
)]
pub async fn get_schedule_ical(
    State(state): State<AppState>,
    auth: AuthHeader,
    Query(query): Query<ScheduleIcalQuery>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, auth, query.token.as_deref())?;
    validate_date_range(query.from, query.to)?;

    let sessions = state
        .engine
        .catalog
        .list_by_date_range(query.from, query.to, None, None);

    let mut events = Vec::with_capacity(sessions.len());
    for session in sessions {
        if session.status == SessionStatus::Cancelled {
            continue;
        }
        let definition = state.engine.catalog.definition(session.class_definition_id)?;
        let instructor = state.engine.directory.instructor(definition.instructor_id)?;
        let venue = state.engine.directory.venue(session.venue_id)?;
        events.push(ScheduleEvent {
            title: definition.title,
            instructor: instructor.name,
            venue: venue.name,
            start: session.start,
            end: session.end,
        });
    }

    if events.is_empty() {
        return Err(ApiError::NotFound("No sessions found".into()));
    }

    let body = state.exporter.generate(&events);
    Ok((
        StatusCode::OK,
        [
            ("content-type", "text/calendar"),
            (
                "content-disposition",
                "attachment; filename=studio_schedule.ics",
            ),
        ],
        body,
    ))
}

#[utoipa::path(
    post,
    path = "/sessions/{id}/cancel",
    params(("id" = Uuid, Path, description = "Session id")),
    responses(
        (status = 200, description = "Session cancelled, bookings force-cancelled", body = crate::engine::SessionCancellation),
        (status = 401, description = "Invalid authentication token"),
        (status = 404, description = "Unknown session"),
        (status = 409, description = "Session already completed or cancelled")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "booking"
)]
pub async fn cancel_session(
    State(state): State<AppState>,
    auth: AuthHeader,
    Path(id): Path<Uuid>,
    Query(query): Query<AuthQuery>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, auth, query.token.as_deref())?;
    let cancellation = state.engine.cancel_session(id)?;
    Ok(Json(cancellation))
}

#[utoipa::path(
    post,
    path = "/sessions/transition",
    request_body = TransitionRequest,
    responses(
        (status = 200, description = "Due sessions advanced", body = crate::catalog::TransitionReport),
        (status = 401, description = "Invalid authentication token")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "timekeeper"
)]
pub async fn transition_sessions(
    State(state): State<AppState>,
    auth: AuthHeader,
    Query(query): Query<AuthQuery>,
    Json(body): Json<TransitionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, auth, query.token.as_deref())?;
    let now = body.now.unwrap_or_else(|| Local::now().naive_local());
    Ok(Json(state.engine.catalog.transition_due(now)))
}

#[utoipa::path(
    post,
    path = "/bookings",
    request_body = CreateBookingRequest,
    responses(
        (status = 201, description = "Booking created in pending status", body = Booking),
        (status = 400, description = "Invalid participant count"),
        (status = 401, description = "Invalid authentication token"),
        (status = 404, description = "Unknown session"),
        (status = 409, description = "Capacity exceeded or session not bookable")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "booking"
)]
pub async fn create_booking(
    State(state): State<AppState>,
    auth: AuthHeader,
    Query(query): Query<AuthQuery>,
    Json(body): Json<CreateBookingRequest>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, auth, query.token.as_deref())?;
    let participant_count = validate_participant_count(body.participant_count)?;
    let booking =
        state
            .engine
            .ledger
            .create_booking(body.session_id, body.user_ref, participant_count)?;
    Ok((StatusCode::CREATED, Json(booking)))
}

#[utoipa::path(
    post,
    path = "/bookings/{id}/cancel",
    params(("id" = Uuid, Path, description = "Booking id")),
    responses(
        (status = 200, description = "Booking cancelled (idempotent)", body = Booking),
        (status = 401, description = "Invalid authentication token"),
        (status = 404, description = "Unknown booking"),
        (status = 409, description = "Booking is a no-show and cannot be cancelled")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "booking"
)]
pub async fn cancel_booking(
    State(state): State<AppState>,
    auth: AuthHeader,
    Path(id): Path<Uuid>,
    Query(query): Query<AuthQuery>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, auth, query.token.as_deref())?;
    let booking = state.engine.ledger.cancel_booking(id)?;
    Ok(Json(booking))
}

#[utoipa::path(
    post,
    path = "/bookings/{id}/payment",
    params(("id" = Uuid, Path, description = "Booking id")),
    request_body = PaymentOutcomeRequest,
    responses(
        (status = 200, description = "Payment outcome applied", body = Booking),
        (status = 401, description = "Invalid authentication token"),
        (status = 404, description = "Unknown booking"),
        (status = 409, description = "Booking is not pending")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "payments"
)]
pub async fn report_payment(
    State(state): State<AppState>,
    auth: AuthHeader,
    Path(id): Path<Uuid>,
    Query(query): Query<AuthQuery>,
    Json(body): Json<PaymentOutcomeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, auth, query.token.as_deref())?;
    let booking = match body.outcome {
        PaymentOutcome::Succeeded => state.engine.ledger.payment_succeeded(id)?,
        PaymentOutcome::Failed => state.engine.ledger.payment_failed(id)?,
    };
    Ok(Json(booking))
}

#[utoipa::path(
    post,
    path = "/bookings/{id}/no-show",
    params(("id" = Uuid, Path, description = "Booking id")),
    responses(
        (status = 200, description = "Booking marked as no-show", body = Booking),
        (status = 400, description = "Session has not completed"),
        (status = 401, description = "Invalid authentication token"),
        (status = 404, description = "Unknown booking"),
        (status = 409, description = "Booking is not confirmed")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "booking"
)]
pub async fn mark_no_show(
    State(state): State<AppState>,
    auth: AuthHeader,
    Path(id): Path<Uuid>,
    Query(query): Query<AuthQuery>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, auth, query.token.as_deref())?;
    let booking = state.engine.ledger.mark_no_show(id)?;
    Ok(Json(booking))
}

#[utoipa::path(
    post,
    path = "/bookings/sweep",
    request_body = SweepRequest,
    responses(
        (status = 200, description = "Stale pending bookings cancelled", body = SweepResponse),
        (status = 401, description = "Invalid authentication token")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "timekeeper"
)]
pub async fn sweep_bookings(
    State(state): State<AppState>,
    auth: AuthHeader,
    Query(query): Query<AuthQuery>,
    Json(body): Json<SweepRequest>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, auth, query.token.as_deref())?;
    let now = body.now.unwrap_or_else(Utc::now);
    let timeout = Duration::minutes(state.settings.pending_timeout_minutes.into());
    let swept = state.engine.ledger.sweep_expired(now, timeout);
    Ok(Json(SweepResponse { swept }))
}

#[utoipa::path(
    get,
    path = "/sessions/{id}/availability",
    params(("id" = Uuid, Path, description = "Session id")),
    responses(
        (status = 200, description = "Seats left and occupancy", body = crate::analytics::Availability),
        (status = 401, description = "Invalid authentication token"),
        (status = 404, description = "Unknown session")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "analytics"
)]
pub async fn get_availability(
    State(state): State<AppState>,
    auth: AuthHeader,
    Path(id): Path<Uuid>,
    Query(query): Query<AuthQuery>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, auth, query.token.as_deref())?;
    Ok(Json(state.engine.analytics.availability(id)?))
}

#[utoipa::path(
    get,
    path = "/sessions/{id}/analytics",
    params(("id" = Uuid, Path, description = "Session id")),
    responses(
        (status = 200, description = "Revenue and booking counts", body = crate::analytics::SessionAnalytics),
        (status = 401, description = "Invalid authentication token"),
        (status = 404, description = "Unknown session")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "analytics"
)]
pub async fn get_session_analytics(
    State(state): State<AppState>,
    auth: AuthHeader,
    Path(id): Path<Uuid>,
    Query(query): Query<AuthQuery>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, auth, query.token.as_deref())?;
    Ok(Json(state.engine.analytics.session_analytics(id)?))
}

#[utoipa::path(
    get,
    path = "/analytics/daily",
    params(
        ("date" = String, Query, description = "Day to summarize (YYYY-MM-DD)"),
        ("token" = Option<String>, Query, description = "Authentication token (alternative to Bearer header)")
    ),
    responses(
        (status = 200, description = "Per-day aggregation", body = crate::analytics::DailySummary),
        (status = 401, description = "Invalid authentication token")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "analytics"
)]
pub async fn get_daily_summary(
    State(state): State<AppState>,
    auth: AuthHeader,
    Query(query): Query<DailySummaryQuery>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, auth, query.token.as_deref())?;
    Ok(Json(state.engine.analytics.daily_summary(query.date)?))
}
