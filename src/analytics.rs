use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::catalog::SessionCatalog;
use crate::error::EngineError;
use crate::ledger::BookingLedger;
use crate::models::{BookingStatus, PaymentStatus, SessionStatus};

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Availability {
    pub session_id: Uuid,
    pub status: SessionStatus,
    pub available_seats: u32,
    pub occupancy_rate: f64,
    pub bookable: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionAnalytics {
    pub session_id: Uuid,
    /// Price times paid-and-confirmed participants, minor currency units.
    pub revenue: u64,
    pub confirmed_bookings: u32,
    pub pending_bookings: u32,
    pub cancelled_bookings: u32,
    pub no_shows: u32,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DailySummary {
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    pub session_count: u32,
    pub bookable_count: u32,
    pub total_revenue: u64,
}

/// Read-only projections over the catalog and the ledger; never mutates
/// either.
pub struct AvailabilityQuery {
    catalog: Arc<SessionCatalog>,
    ledger: Arc<BookingLedger>,
}

impl AvailabilityQuery {
    pub fn new(catalog: Arc<SessionCatalog>, ledger: Arc<BookingLedger>) -> Self {
        Self { catalog, ledger }
    }

    pub fn availability(&self, session_id: Uuid) -> Result<Availability, EngineError> {
        let session = self.catalog.get(session_id)?;
        let definition = self.catalog.definition(session.class_definition_id)?;

        let max = definition.max_participants;
        let available_seats = max.saturating_sub(session.current_participants);
        let occupancy_rate = if max == 0 {
            0.0
        } else {
            f64::from(session.current_participants) / f64::from(max)
        };
        Ok(Availability {
            session_id,
            status: session.status,
            available_seats,
            occupancy_rate,
            bookable: session.status == SessionStatus::Scheduled && available_seats > 0,
        })
    }

    pub fn is_bookable(&self, session_id: Uuid) -> Result<bool, EngineError> {
        Ok(self.availability(session_id)?.bookable)
    }

    /// Only confirmed-and-paid bookings earn; pending/unpaid ones hold
    /// seats without contributing.
    pub fn revenue(&self, session_id: Uuid) -> Result<u64, EngineError> {
        let session = self.catalog.get(session_id)?;
        let definition = self.catalog.definition(session.class_definition_id)?;

        let paid_participants: u64 = self
            .ledger
            .bookings_for_session(session_id)
            .iter()
            .filter(|booking| {
                booking.status == BookingStatus::Confirmed
                    && booking.payment_status == PaymentStatus::Paid
            })
            .map(|booking| u64::from(booking.participant_count))
            .sum();
        Ok(u64::from(definition.price) * paid_participants)
    }

    pub fn session_analytics(&self, session_id: Uuid) -> Result<SessionAnalytics, EngineError> {
        let revenue = self.revenue(session_id)?;

        let mut analytics = SessionAnalytics {
            session_id,
            revenue,
            confirmed_bookings: 0,
            pending_bookings: 0,
            cancelled_bookings: 0,
            no_shows: 0,
        };
        for booking in self.ledger.bookings_for_session(session_id) {
            match booking.status {
                BookingStatus::Confirmed => analytics.confirmed_bookings += 1,
                BookingStatus::Pending => analytics.pending_bookings += 1,
                BookingStatus::Cancelled => analytics.cancelled_bookings += 1,
                BookingStatus::NoShow => analytics.no_shows += 1,
            }
        }
        Ok(analytics)
    }

    pub fn daily_summary(&self, date: NaiveDate) -> Result<DailySummary, EngineError> {
        let sessions = self.catalog.list_by_date_range(date, date, None, None);

        let mut summary = DailySummary {
            date,
            session_count: sessions.len() as u32,
            bookable_count: 0,
            total_revenue: 0,
        };
        for session in sessions {
            if self.is_bookable(session.id)? {
                summary.bookable_count += 1;
            }
            summary.total_revenue += self.revenue(session.id)?;
        }
        Ok(summary)
    }
}
