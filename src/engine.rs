use std::sync::Arc;

use serde::Serialize;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::admission::AdmissionController;
use crate::analytics::AvailabilityQuery;
use crate::catalog::{self, SessionCatalog};
use crate::directory::Directory;
use crate::error::EngineError;
use crate::ledger::BookingLedger;
use crate::models::{ClassDefinition, ClassSession, NewClassDefinition};

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionCancellation {
    pub session: ClassSession,
    pub cancelled_bookings: u32,
}

/// Wires the engine components together in their dependency order and owns
/// the few operations that cut across them.
pub struct BookingEngine {
    pub directory: Directory,
    pub catalog: Arc<SessionCatalog>,
    pub admission: Arc<AdmissionController>,
    pub ledger: Arc<BookingLedger>,
    pub analytics: AvailabilityQuery,
}

impl BookingEngine {
    pub fn new() -> Self {
        let catalog = Arc::new(SessionCatalog::new());
        let admission = Arc::new(AdmissionController::new(catalog.clone()));
        let ledger = Arc::new(BookingLedger::new(admission.clone(), catalog.clone()));
        let analytics = AvailabilityQuery::new(catalog.clone(), ledger.clone());
        Self {
            directory: Directory::new(),
            catalog,
            admission,
            ledger,
            analytics,
        }
    }

    /// Validates the draft against its venue's capacity before the
    /// definition becomes visible to materialization.
    pub fn create_definition(
        &self,
        draft: NewClassDefinition,
    ) -> Result<ClassDefinition, EngineError> {
        let venue = self.directory.venue(draft.venue_id)?;
        self.directory.instructor(draft.instructor_id)?;

        let definition = ClassDefinition::new(draft);
        catalog::validate_definition(&definition, venue.capacity)?;
        self.catalog.insert_definition(definition.clone());
        info!(definition = %definition.id, title = %definition.title, "class definition created");
        Ok(definition)
    }

    /// Cancels the session, then force-cancels every booking still holding
    /// seats on it. Cancellation is a status change; the session record
    /// stays.
    pub fn cancel_session(&self, session_id: Uuid) -> Result<SessionCancellation, EngineError> {
        let session = self.catalog.cancel(session_id)?;
        let cancelled_bookings = self.ledger.force_cancel_for_session(session_id);
        Ok(SessionCancellation { session, cancelled_bookings })
    }
}

impl Default for BookingEngine {
    fn default() -> Self {
        Self::new()
    }
}
