use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::EngineError;
use crate::models::{ClassDefinition, ClassSession, SessionStatus};
use crate::recurrence;

/// Checks a definition against its venue's capacity. Sessions inherit these
/// bounds, so this is the only place the `min <= max <= capacity` chain is
/// enforced.
pub fn validate_definition(
    definition: &ClassDefinition,
    venue_capacity: u32,
) -> Result<(), EngineError> {
    if definition.title.trim().is_empty() {
        return Err(EngineError::Validation("title must not be empty".into()));
    }
    if definition.min_participants < 1 {
        return Err(EngineError::Validation(
            "min_participants must be at least 1".into(),
        ));
    }
    if definition.min_participants > definition.max_participants {
        return Err(EngineError::Validation(format!(
            "min_participants ({}) exceeds max_participants ({})",
            definition.min_participants, definition.max_participants
        )));
    }
    if definition.max_participants > venue_capacity {
        return Err(EngineError::Validation(format!(
            "max_participants ({}) exceeds venue capacity ({venue_capacity})",
            definition.max_participants
        )));
    }
    if definition.start_time >= definition.end_time {
        return Err(EngineError::Validation(
            "start_time must be before end_time".into(),
        ));
    }
    if let Some(rule) = definition.recurrence_rule() {
        recurrence::validate(&rule)?;
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, Default, Serialize, ToSchema)]
pub struct TransitionReport {
    pub started: u32,
    pub completed: u32,
}

/// Owns class definitions and their materialized sessions. Each session
/// lives behind its own mutex so admission control can serialize writes per
/// session without a global lock.
pub struct SessionCatalog {
    definitions: DashMap<Uuid, ClassDefinition>,
    sessions: DashMap<Uuid, Arc<Mutex<ClassSession>>>,
    // (definition id, start) -> session id; makes materialization idempotent
    slots: DashMap<(Uuid, NaiveDateTime), Uuid>,
}

impl SessionCatalog {
    pub fn new() -> Self {
        Self {
            definitions: DashMap::new(),
            sessions: DashMap::new(),
            slots: DashMap::new(),
        }
    }

    pub fn insert_definition(&self, definition: ClassDefinition) {
        self.definitions.insert(definition.id, definition);
    }

    pub fn definition(&self, id: Uuid) -> Result<ClassDefinition, EngineError> {
        self.definitions
            .get(&id)
            .map(|entry| entry.clone())
            .ok_or(EngineError::NotFound { kind: "class definition", id })
    }

    /// Creates one `scheduled` session per occurrence of the definition's
    /// rule (or a single one for rule-less definitions). Re-invocation
    /// returns the already-materialized sessions instead of duplicating
    /// them.
    pub fn materialize(&self, definition_id: Uuid) -> Result<Vec<ClassSession>, EngineError> {
        let definition = self.definition(definition_id)?;

        let pairs = match definition.recurrence_rule() {
            Some(rule) => recurrence::expand(&rule)?,
            None => vec![(
                definition.anchor_date.and_time(definition.start_time),
                definition.anchor_date.and_time(definition.end_time),
            )],
        };

        let mut created = 0u32;
        let mut sessions = Vec::with_capacity(pairs.len());
        for (start, end) in pairs {
            match self.slots.entry((definition_id, start)) {
                Entry::Occupied(slot) => {
                    sessions.push(self.get(*slot.get())?);
                }
                Entry::Vacant(slot) => {
                    let session =
                        ClassSession::new(definition_id, definition.venue_id, start, end);
                    slot.insert(session.id);
                    self.sessions
                        .insert(session.id, Arc::new(Mutex::new(session.clone())));
                    created += 1;
                    sessions.push(session);
                }
            }
        }

        info!(
            definition = %definition_id,
            created,
            total = sessions.len(),
            "materialized sessions"
        );
        Ok(sessions)
    }

    pub fn get(&self, id: Uuid) -> Result<ClassSession, EngineError> {
        Ok(self.handle(id)?.lock().clone())
    }

    /// Per-session lock handle, used by admission control and the ledger's
    /// cancellation cascade.
    pub(crate) fn handle(&self, id: Uuid) -> Result<Arc<Mutex<ClassSession>>, EngineError> {
        self.sessions
            .get(&id)
            .map(|entry| entry.clone())
            .ok_or(EngineError::NotFound { kind: "session", id })
    }

    pub fn list_by_date_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        venue_id: Option<Uuid>,
        instructor_id: Option<Uuid>,
    ) -> Vec<ClassSession> {
        let mut sessions: Vec<ClassSession> = self
            .sessions
            .iter()
            .map(|entry| entry.value().lock().clone())
            .filter(|session| {
                let date = session.start.date();
                date >= from && date <= to
            })
            .filter(|session| venue_id.is_none_or(|id| session.venue_id == id))
            .filter(|session| {
                instructor_id.is_none_or(|id| {
                    self.definitions
                        .get(&session.class_definition_id)
                        .is_some_and(|definition| definition.instructor_id == id)
                })
            })
            .collect();

        sessions.sort_by(|a, b| a.start.cmp(&b.start).then(a.id.cmp(&b.id)));
        sessions
    }

    /// Marks the session cancelled. Allowed from `scheduled` and `ongoing`
    /// only; the caller is responsible for cascading to the session's
    /// bookings afterwards.
    pub fn cancel(&self, id: Uuid) -> Result<ClassSession, EngineError> {
        let handle = self.handle(id)?;
        let mut session = handle.lock();
        match session.status {
            SessionStatus::Scheduled | SessionStatus::Ongoing => {
                session.status = SessionStatus::Cancelled;
                info!(session = %id, "session cancelled");
                Ok(session.clone())
            }
            SessionStatus::Completed => Err(EngineError::InvalidStateTransition {
                from: "completed",
                to: "cancelled",
            }),
            SessionStatus::Cancelled => Err(EngineError::InvalidStateTransition {
                from: "cancelled",
                to: "cancelled",
            }),
        }
    }

    /// Time-keeper entry point: advances `scheduled` sessions whose start
    /// has passed to `ongoing`, and any non-terminal session whose end has
    /// passed to `completed`.
    pub fn transition_due(&self, now: NaiveDateTime) -> TransitionReport {
        let mut report = TransitionReport::default();
        for entry in self.sessions.iter() {
            let mut session = entry.value().lock();
            match session.status {
                SessionStatus::Scheduled if session.end <= now => {
                    session.status = SessionStatus::Completed;
                    report.completed += 1;
                }
                SessionStatus::Scheduled if session.start <= now => {
                    session.status = SessionStatus::Ongoing;
                    report.started += 1;
                }
                SessionStatus::Ongoing if session.end <= now => {
                    session.status = SessionStatus::Completed;
                    report.completed += 1;
                }
                _ => {}
            }
        }
        report
    }
}

impl Default for SessionCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveTime, Duration};

    use super::*;
    use crate::models::{Frequency, NewClassDefinition, RecurrencePattern};

    fn definition(recurrence: Option<RecurrencePattern>) -> ClassDefinition {
        ClassDefinition::new(NewClassDefinition {
            title: "Morning flow".into(),
            price: 30000,
            min_participants: 2,
            max_participants: 10,
            instructor_id: Uuid::new_v4(),
            venue_id: Uuid::new_v4(),
            anchor_date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            start_time: NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
            recurrence,
        })
    }

    #[test]
    fn test_validate_definition_bounds() {
        let def = definition(None);
        assert!(validate_definition(&def, 10).is_ok());
        assert!(validate_definition(&def, 9).is_err());

        let mut inverted = definition(None);
        inverted.min_participants = 11;
        assert!(validate_definition(&inverted, 20).is_err());

        let mut zero_min = definition(None);
        zero_min.min_participants = 0;
        assert!(validate_definition(&zero_min, 20).is_err());
    }

    #[test]
    fn test_materialize_one_off() {
        let catalog = SessionCatalog::new();
        let def = definition(None);
        catalog.insert_definition(def.clone());

        let sessions = catalog.materialize(def.id).unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].status, SessionStatus::Scheduled);
        assert_eq!(sessions[0].current_participants, 0);
        assert_eq!(
            sessions[0].start,
            NaiveDate::from_ymd_opt(2026, 1, 5).unwrap().and_hms_opt(6, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_materialize_weekly_rule() {
        let catalog = SessionCatalog::new();
        let def = definition(Some(RecurrencePattern {
            frequency: Frequency::Weekly,
            days_of_week: vec![0, 2],
            occurrence_count: 5,
        }));
        catalog.insert_definition(def.clone());

        let sessions = catalog.materialize(def.id).unwrap();
        assert_eq!(sessions.len(), 5);
        for window in sessions.windows(2) {
            assert!(window[0].start < window[1].start);
        }
    }

    #[test]
    fn test_materialize_idempotent() {
        let catalog = SessionCatalog::new();
        let def = definition(Some(RecurrencePattern {
            frequency: Frequency::Daily,
            days_of_week: vec![],
            occurrence_count: 4,
        }));
        catalog.insert_definition(def.clone());

        let first = catalog.materialize(def.id).unwrap();
        let second = catalog.materialize(def.id).unwrap();
        assert_eq!(first.len(), 4);
        assert_eq!(second.len(), 4);
        let mut first_ids: Vec<Uuid> = first.iter().map(|s| s.id).collect();
        let mut second_ids: Vec<Uuid> = second.iter().map(|s| s.id).collect();
        first_ids.sort();
        second_ids.sort();
        assert_eq!(first_ids, second_ids);
    }

    #[test]
    fn test_list_by_date_range_filters() {
        let catalog = SessionCatalog::new();
        let def = definition(Some(RecurrencePattern {
            frequency: Frequency::Daily,
            days_of_week: vec![],
            occurrence_count: 10,
        }));
        catalog.insert_definition(def.clone());
        catalog.materialize(def.id).unwrap();

        let from = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let listed = catalog.list_by_date_range(from, from + Duration::days(2), None, None);
        assert_eq!(listed.len(), 3);

        let by_venue = catalog.list_by_date_range(from, from + Duration::days(2), Some(def.venue_id), None);
        assert_eq!(by_venue.len(), 3);

        let other_venue =
            catalog.list_by_date_range(from, from + Duration::days(2), Some(Uuid::new_v4()), None);
        assert!(other_venue.is_empty());

        let by_instructor =
            catalog.list_by_date_range(from, from + Duration::days(2), None, Some(def.instructor_id));
        assert_eq!(by_instructor.len(), 3);
    }

    #[test]
    fn test_cancel_transitions() {
        let catalog = SessionCatalog::new();
        let def = definition(None);
        catalog.insert_definition(def.clone());
        let session = catalog.materialize(def.id).unwrap().remove(0);

        let cancelled = catalog.cancel(session.id).unwrap();
        assert_eq!(cancelled.status, SessionStatus::Cancelled);

        let err = catalog.cancel(session.id).unwrap_err();
        assert!(matches!(err, EngineError::InvalidStateTransition { .. }));
    }

    #[test]
    fn test_transition_due_walks_lifecycle() {
        let catalog = SessionCatalog::new();
        let def = definition(None);
        catalog.insert_definition(def.clone());
        let session = catalog.materialize(def.id).unwrap().remove(0);

        let before = session.start - Duration::minutes(1);
        assert_eq!(catalog.transition_due(before).started, 0);

        let during = session.start + Duration::minutes(10);
        let report = catalog.transition_due(during);
        assert_eq!(report.started, 1);
        assert_eq!(catalog.get(session.id).unwrap().status, SessionStatus::Ongoing);

        let after = session.end + Duration::minutes(1);
        let report = catalog.transition_due(after);
        assert_eq!(report.completed, 1);
        assert_eq!(catalog.get(session.id).unwrap().status, SessionStatus::Completed);
    }

    #[test]
    fn test_transition_skips_scheduled_straight_to_completed() {
        let catalog = SessionCatalog::new();
        let def = definition(None);
        catalog.insert_definition(def.clone());
        let session = catalog.materialize(def.id).unwrap().remove(0);

        let long_after = session.end + Duration::days(1);
        let report = catalog.transition_due(long_after);
        assert_eq!(report.completed, 1);
        assert_eq!(report.started, 0);
        assert_eq!(catalog.get(session.id).unwrap().status, SessionStatus::Completed);
    }
}
