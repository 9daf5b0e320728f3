use utoipa::openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::analytics::{Availability, DailySummary, SessionAnalytics};
use crate::catalog::TransitionReport;
use crate::engine::SessionCancellation;
use crate::handlers::{
    CreateBookingRequest, MaterializeResponse, PaymentOutcomeRequest, RegisterInstructorRequest,
    RegisterVenueRequest, SweepRequest, SweepResponse, TransitionRequest,
};
use crate::models::{
    Booking, ClassDefinition, ClassSession, Instructor, NewClassDefinition, RecurrencePattern,
    Venue,
};

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.as_mut().unwrap();
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
        components.add_security_scheme(
            "query_token",
            SecurityScheme::ApiKey(ApiKey::Query(ApiKeyValue::new("token"))),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::healthz_live,
        crate::handlers::healthz_ready,
        crate::handlers::register_venue,
        crate::handlers::register_instructor,
        crate::handlers::create_class,
        crate::handlers::materialize_sessions,
        crate::handlers::list_sessions,
        crate::handlers::get_schedule_ical,
        crate::handlers::cancel_session,
        crate::handlers::transition_sessions,
        crate::handlers::create_booking,
        crate::handlers::cancel_booking,
        crate::handlers::report_payment,
        crate::handlers::mark_no_show,
        crate::handlers::sweep_bookings,
        crate::handlers::get_availability,
        crate::handlers::get_session_analytics,
        crate::handlers::get_daily_summary
    ),
    components(schemas(
        Venue,
        Instructor,
        RecurrencePattern,
        NewClassDefinition,
        ClassDefinition,
        ClassSession,
        Booking,
        RegisterVenueRequest,
        RegisterInstructorRequest,
        CreateBookingRequest,
        PaymentOutcomeRequest,
        TransitionRequest,
        SweepRequest,
        SweepResponse,
        MaterializeResponse,
        TransitionReport,
        SessionCancellation,
        Availability,
        SessionAnalytics,
        DailySummary
    )),
    tags(
        (name = "booking", description = "Class definitions, sessions and bookings"),
        (name = "directory", description = "Venue and instructor registry"),
        (name = "payments", description = "Payment collaborator callbacks"),
        (name = "timekeeper", description = "Time-driven sweep and transition hooks"),
        (name = "analytics", description = "Availability and revenue projections")
    ),
    modifiers(&SecurityAddon),
)]
pub struct ApiDoc;
