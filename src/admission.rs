use std::sync::Arc;

use tracing::{debug, error};
use uuid::Uuid;

use crate::catalog::SessionCatalog;
use crate::error::EngineError;
use crate::models::SessionStatus;

/// Proof that seats were taken; carried by the ledger into the booking it
/// persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reservation {
    pub session_id: Uuid,
    pub participant_count: u32,
}

/// Capacity guard for session occupancy. Every mutation of
/// `current_participants` goes through here, under the session's own lock,
/// so admissions on one session serialize in arrival order while other
/// sessions proceed untouched.
pub struct AdmissionController {
    catalog: Arc<SessionCatalog>,
}

impl AdmissionController {
    pub fn new(catalog: Arc<SessionCatalog>) -> Self {
        Self { catalog }
    }

    /// Admits `participant_count` seats or rejects outright; requests are
    /// never partially admitted.
    pub fn reserve(
        &self,
        session_id: Uuid,
        participant_count: u32,
    ) -> Result<Reservation, EngineError> {
        self.reserve_then(session_id, participant_count, |reservation| reservation)
    }

    /// Like [`reserve`](Self::reserve), but runs `commit` while the session
    /// lock is still held. A caller that records the reservation somewhere a
    /// cancellation cascade must observe (the booking ledger) publishes that
    /// record inside `commit`, so no cascade can run between the seat grant
    /// and the record becoming visible.
    pub fn reserve_then<T>(
        &self,
        session_id: Uuid,
        participant_count: u32,
        commit: impl FnOnce(Reservation) -> T,
    ) -> Result<T, EngineError> {
        if participant_count < 1 {
            return Err(EngineError::Validation(
                "participant_count must be at least 1".into(),
            ));
        }

        let handle = self.catalog.handle(session_id)?;
        let mut session = handle.lock();

        if session.status != SessionStatus::Scheduled {
            return Err(EngineError::SessionNotBookable { status: session.status });
        }

        let definition = self.catalog.definition(session.class_definition_id)?;
        let available = definition.max_participants - session.current_participants;
        if participant_count > available {
            return Err(EngineError::CapacityExceeded {
                requested: participant_count,
                available,
            });
        }

        session.current_participants += participant_count;
        debug!(
            session = %session_id,
            admitted = participant_count,
            occupied = session.current_participants,
            "seats reserved"
        );
        Ok(commit(Reservation { session_id, participant_count }))
    }

    /// Returns seats to the session. Releasing more than is currently held
    /// means reserve/release pairing broke somewhere; the counter is clamped
    /// to zero and the fault reported as an invariant breach.
    pub fn release(&self, session_id: Uuid, participant_count: u32) -> Result<(), EngineError> {
        let handle = self.catalog.handle(session_id)?;
        let mut session = handle.lock();

        if participant_count > session.current_participants {
            let held = session.current_participants;
            session.current_participants = 0;
            error!(
                session = %session_id,
                released = participant_count,
                held,
                "seat release underflow"
            );
            return Err(EngineError::InternalInvariant(format!(
                "released {participant_count} seats from session {session_id} holding only {held}"
            )));
        }

        session.current_participants -= participant_count;
        debug!(
            session = %session_id,
            released = participant_count,
            occupied = session.current_participants,
            "seats released"
        );
        Ok(())
    }
}
