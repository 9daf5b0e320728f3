use chrono::NaiveDate;

use crate::error::ApiError;

/// Per-booking group size cap.
const MAX_GROUP_SIZE: u32 = 50;

pub fn validate_participant_count(value: u32) -> Result<u32, ApiError> {
    if (1..=MAX_GROUP_SIZE).contains(&value) {
        Ok(value)
    } else {
        Err(ApiError::BadRequest(format!(
            "participant_count must be between 1 and {MAX_GROUP_SIZE}"
        )))
    }
}

pub fn validate_date_range(from: NaiveDate, to: NaiveDate) -> Result<(), ApiError> {
    if from <= to {
        Ok(())
    } else {
        Err(ApiError::BadRequest("from must not be after to".into()))
    }
}
