use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

/// Repeating part of a class schedule. Days of week are Monday-based
/// (0 = Monday .. 6 = Sunday) and only consulted for weekly rules.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct RecurrencePattern {
    pub frequency: Frequency,
    #[serde(default)]
    pub days_of_week: Vec<u8>,
    pub occurrence_count: u32,
}

/// Fully specified expansion input: pattern plus the anchor date and the
/// fixed start/end time-of-day every occurrence shares.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    #[serde(default)]
    pub days_of_week: Vec<u8>,
    pub occurrence_count: u32,
    #[schema(value_type = String, format = "date", example = "2026-01-05")]
    pub anchor_date: NaiveDate,
    #[schema(value_type = String, example = "06:00:00")]
    pub start_time: NaiveTime,
    #[schema(value_type = String, example = "07:00:00")]
    pub end_time: NaiveTime,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewClassDefinition {
    pub title: String,
    /// Price per participant, in minor currency units.
    pub price: u32,
    pub min_participants: u32,
    pub max_participants: u32,
    pub instructor_id: Uuid,
    pub venue_id: Uuid,
    #[schema(value_type = String, format = "date", example = "2026-01-05")]
    pub anchor_date: NaiveDate,
    #[schema(value_type = String, example = "06:00:00")]
    pub start_time: NaiveTime,
    #[schema(value_type = String, example = "07:00:00")]
    pub end_time: NaiveTime,
    pub recurrence: Option<RecurrencePattern>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct ClassDefinition {
    pub id: Uuid,
    pub title: String,
    pub price: u32,
    pub min_participants: u32,
    pub max_participants: u32,
    pub instructor_id: Uuid,
    pub venue_id: Uuid,
    #[schema(value_type = String, format = "date")]
    pub anchor_date: NaiveDate,
    #[schema(value_type = String)]
    pub start_time: NaiveTime,
    #[schema(value_type = String)]
    pub end_time: NaiveTime,
    pub recurrence: Option<RecurrencePattern>,
}

impl ClassDefinition {
    pub fn new(draft: NewClassDefinition) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: draft.title,
            price: draft.price,
            min_participants: draft.min_participants,
            max_participants: draft.max_participants,
            instructor_id: draft.instructor_id,
            venue_id: draft.venue_id,
            anchor_date: draft.anchor_date,
            start_time: draft.start_time,
            end_time: draft.end_time,
            recurrence: draft.recurrence,
        }
    }

    /// Expansion input for this definition, `None` when it is a one-off.
    pub fn recurrence_rule(&self) -> Option<RecurrenceRule> {
        self.recurrence.as_ref().map(|pattern| RecurrenceRule {
            frequency: pattern.frequency,
            days_of_week: pattern.days_of_week.clone(),
            occurrence_count: pattern.occurrence_count,
            anchor_date: self.anchor_date,
            start_time: self.start_time,
            end_time: self.end_time,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Scheduled,
    Ongoing,
    Completed,
    Cancelled,
}

/// One concrete timed occurrence of a class, in venue-local wall-clock time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct ClassSession {
    pub id: Uuid,
    pub class_definition_id: Uuid,
    pub venue_id: Uuid,
    #[schema(value_type = String, format = "date-time", example = "2026-01-05T06:00:00")]
    pub start: NaiveDateTime,
    #[schema(value_type = String, format = "date-time", example = "2026-01-05T07:00:00")]
    pub end: NaiveDateTime,
    pub status: SessionStatus,
    pub current_participants: u32,
}

impl ClassSession {
    pub fn new(
        class_definition_id: Uuid,
        venue_id: Uuid,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            class_definition_id,
            venue_id,
            start,
            end,
            status: SessionStatus::Scheduled,
            current_participants: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    NoShow,
}

impl BookingStatus {
    /// Whether a booking in this status occupies seats.
    pub fn is_active(self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    Paid,
    Refunded,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct Booking {
    pub id: Uuid,
    pub session_id: Uuid,
    pub user_ref: String,
    pub participant_count: u32,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}

impl Booking {
    pub fn new(session_id: Uuid, user_ref: String, participant_count: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            user_ref,
            participant_count,
            status: BookingStatus::Pending,
            payment_status: PaymentStatus::Unpaid,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct Venue {
    pub id: Uuid,
    pub name: String,
    pub capacity: u32,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct Instructor {
    pub id: Uuid,
    pub name: String,
}
