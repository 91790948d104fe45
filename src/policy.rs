use chrono::{Duration, NaiveDateTime};
use thiserror::Error;

use crate::models::Settings;

/// Slack applied to the "start must not be in the past" check so a form filled
/// a moment ago still submits cleanly.
const PAST_START_TOLERANCE_MINUTES: i64 = 5;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("visit end date must not precede the start date")]
    EndBeforeStart,
    #[error("visit start date must not be in the past")]
    StartInPast,
    #[error("visit start date cannot be more than {0} days from today")]
    StartTooFar(i32),
    #[error("visit cannot last more than {0} days")]
    VisitTooLong(i32),
    #[error("owner already has the maximum of {0} registered vehicles")]
    VehicleQuotaExceeded(i32),
}

/// Validates a requested visit window against the configured policy. `now` is
/// passed in so callers and tests agree on the reference instant.
pub fn validate_visit_window(
    settings: &Settings,
    now: NaiveDateTime,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Result<(), PolicyError> {
    if end < start {
        return Err(PolicyError::EndBeforeStart);
    }
    if start < now - Duration::minutes(PAST_START_TOLERANCE_MINUTES) {
        return Err(PolicyError::StartInPast);
    }
    if start > now + Duration::days(settings.visit_days as i64) {
        return Err(PolicyError::StartTooFar(settings.visit_days));
    }
    if end - start > Duration::days(settings.visit_duration as i64) {
        return Err(PolicyError::VisitTooLong(settings.visit_duration));
    }
    Ok(())
}

/// Default leaving time offered to the client when none is supplied.
pub fn default_visit_end(settings: &Settings, start: NaiveDateTime) -> NaiveDateTime {
    start + Duration::hours(settings.visit_hours as i64)
}

/// Per-owner registration quota from the settings singleton.
pub fn check_vehicle_quota(settings: &Settings, existing_count: i64) -> Result<(), PolicyError> {
    if existing_count >= settings.owner_car as i64 {
        return Err(PolicyError::VehicleQuotaExceeded(settings.owner_car));
    }
    Ok(())
}
