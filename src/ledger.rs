use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::admission::AdmissionController;
use crate::catalog::SessionCatalog;
use crate::error::EngineError;
use crate::models::{Booking, BookingStatus, PaymentStatus, SessionStatus};

fn status_name(status: BookingStatus) -> &'static str {
    match status {
        BookingStatus::Pending => "pending",
        BookingStatus::Confirmed => "confirmed",
        BookingStatus::Cancelled => "cancelled",
        BookingStatus::NoShow => "no_show",
    }
}

/// Owns booking records and their status machine. Seats are reserved before
/// a booking exists and released exactly once when it leaves an active
/// status; the ledger never retries a failed admission.
pub struct BookingLedger {
    bookings: DashMap<Uuid, Arc<Mutex<Booking>>>,
    by_session: DashMap<Uuid, Vec<Uuid>>,
    admission: Arc<AdmissionController>,
    catalog: Arc<SessionCatalog>,
}

impl BookingLedger {
    pub fn new(admission: Arc<AdmissionController>, catalog: Arc<SessionCatalog>) -> Self {
        Self {
            bookings: DashMap::new(),
            by_session: DashMap::new(),
            admission,
            catalog,
        }
    }

    /// Reserves seats through admission control and records a `pending`
    /// booking under the same session lock, so a cancellation cascade either
    /// rejects the reservation or sees the booking. Capacity and bookability
    /// errors pass through to the caller untouched.
    pub fn create_booking(
        &self,
        session_id: Uuid,
        user_ref: String,
        participant_count: u32,
    ) -> Result<Booking, EngineError> {
        let booking = self
            .admission
            .reserve_then(session_id, participant_count, |reservation| {
                let booking = Booking::new(
                    reservation.session_id,
                    user_ref,
                    reservation.participant_count,
                );
                self.by_session
                    .entry(session_id)
                    .or_default()
                    .push(booking.id);
                self.bookings
                    .insert(booking.id, Arc::new(Mutex::new(booking.clone())));
                booking
            })?;
        info!(booking = %booking.id, session = %session_id, participants = participant_count, "booking created");
        Ok(booking)
    }

    pub fn get(&self, id: Uuid) -> Result<Booking, EngineError> {
        Ok(self.handle(id)?.lock().clone())
    }

    pub fn bookings_for_session(&self, session_id: Uuid) -> Vec<Booking> {
        let Some(ids) = self.by_session.get(&session_id) else {
            return Vec::new();
        };
        ids.iter()
            .filter_map(|id| self.bookings.get(id).map(|entry| entry.lock().clone()))
            .collect()
    }

    /// Single entry point for every cancellation. Idempotent: cancelling an
    /// already-cancelled booking is a no-op. Seats are released exactly once,
    /// and paid bookings flip to `refunded`.
    pub fn cancel_booking(&self, id: Uuid) -> Result<Booking, EngineError> {
        let handle = self.handle(id)?;
        let mut booking = handle.lock();
        match booking.status {
            BookingStatus::Cancelled => Ok(booking.clone()),
            BookingStatus::NoShow => Err(EngineError::InvalidStateTransition {
                from: "no_show",
                to: "cancelled",
            }),
            BookingStatus::Pending | BookingStatus::Confirmed => {
                self.admission
                    .release(booking.session_id, booking.participant_count)?;
                booking.status = BookingStatus::Cancelled;
                if booking.payment_status == PaymentStatus::Paid {
                    booking.payment_status = PaymentStatus::Refunded;
                }
                info!(booking = %id, "booking cancelled");
                Ok(booking.clone())
            }
        }
    }

    /// Payment collaborator outcome: confirms a pending booking.
    pub fn payment_succeeded(&self, id: Uuid) -> Result<Booking, EngineError> {
        let handle = self.handle(id)?;
        let mut booking = handle.lock();
        if booking.status != BookingStatus::Pending {
            return Err(EngineError::InvalidStateTransition {
                from: status_name(booking.status),
                to: "confirmed",
            });
        }
        booking.status = BookingStatus::Confirmed;
        booking.payment_status = PaymentStatus::Paid;
        info!(booking = %id, "payment confirmed");
        Ok(booking.clone())
    }

    /// Payment collaborator outcome: a failed payment cancels the pending
    /// booking and frees its seats.
    pub fn payment_failed(&self, id: Uuid) -> Result<Booking, EngineError> {
        let handle = self.handle(id)?;
        let mut booking = handle.lock();
        if booking.status != BookingStatus::Pending {
            return Err(EngineError::InvalidStateTransition {
                from: status_name(booking.status),
                to: "cancelled",
            });
        }
        self.admission
            .release(booking.session_id, booking.participant_count)?;
        booking.status = BookingStatus::Cancelled;
        booking.payment_status = PaymentStatus::Failed;
        warn!(booking = %id, "payment failed, booking cancelled");
        Ok(booking.clone())
    }

    /// Marks a confirmed booking as a no-show once its session has
    /// completed. Terminal and distinct from `cancelled` for reporting; the
    /// payment record is left untouched.
    pub fn mark_no_show(&self, id: Uuid) -> Result<Booking, EngineError> {
        let handle = self.handle(id)?;
        let mut booking = handle.lock();
        if booking.status != BookingStatus::Confirmed {
            return Err(EngineError::InvalidStateTransition {
                from: status_name(booking.status),
                to: "no_show",
            });
        }
        let session = self.catalog.get(booking.session_id)?;
        if session.status != SessionStatus::Completed {
            return Err(EngineError::Validation(
                "cannot mark a no-show before the session has completed".into(),
            ));
        }
        self.admission
            .release(booking.session_id, booking.participant_count)?;
        booking.status = BookingStatus::NoShow;
        info!(booking = %id, "booking marked as no-show");
        Ok(booking.clone())
    }

    /// Caller-driven sweep: cancels pending bookings older than the timeout
    /// window. The core owns no timer; an external time-keeper invokes this.
    pub fn sweep_expired(&self, now: DateTime<Utc>, timeout: Duration) -> u32 {
        let cutoff = now - timeout;
        let expired: Vec<Uuid> = self
            .bookings
            .iter()
            .filter_map(|entry| {
                let booking = entry.lock();
                (booking.status == BookingStatus::Pending && booking.created_at <= cutoff)
                    .then_some(booking.id)
            })
            .collect();

        let mut swept = 0;
        for id in expired {
            match self.cancel_booking(id) {
                Ok(_) => swept += 1,
                Err(err) => warn!(booking = %id, error = %err, "sweep skipped booking"),
            }
        }
        if swept > 0 {
            info!(swept, "expired pending bookings cancelled");
        }
        swept
    }

    /// Cascade of a session cancellation: force-cancels every booking still
    /// occupying seats. Returns how many were cancelled.
    pub fn force_cancel_for_session(&self, session_id: Uuid) -> u32 {
        let ids: Vec<Uuid> = self
            .by_session
            .get(&session_id)
            .map(|ids| ids.clone())
            .unwrap_or_default();

        let mut cancelled = 0;
        for id in ids {
            let Some(handle) = self.bookings.get(&id).map(|entry| entry.clone()) else {
                continue;
            };
            let mut booking = handle.lock();
            if !booking.status.is_active() {
                continue;
            }
            if let Err(err) = self
                .admission
                .release(booking.session_id, booking.participant_count)
            {
                warn!(booking = %id, error = %err, "release failed during cascade");
            }
            booking.status = BookingStatus::Cancelled;
            if booking.payment_status == PaymentStatus::Paid {
                booking.payment_status = PaymentStatus::Refunded;
            }
            cancelled += 1;
        }
        if cancelled > 0 {
            info!(session = %session_id, cancelled, "force-cancelled bookings for session");
        }
        cancelled
    }

    fn handle(&self, id: Uuid) -> Result<Arc<Mutex<Booking>>, EngineError> {
        self.bookings
            .get(&id)
            .map(|entry| entry.clone())
            .ok_or(EngineError::NotFound { kind: "booking", id })
    }
}
