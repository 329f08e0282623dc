use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use shared_models::error::AppError;

#[derive(Error, Debug)]
pub enum AvailabilityError {
    #[error("Invalid date range: {end} is before {start}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("Service not found: {0}")]
    ServiceNotFound(Uuid),

    #[error("Service {service_id} has invalid duration of {minutes} minutes")]
    InvalidServiceDuration { service_id: Uuid, minutes: i32 },

    #[error("Calendar data unavailable: {0}")]
    CalendarFactsUnavailable(String),
}

impl From<AvailabilityError> for AppError {
    fn from(err: AvailabilityError) -> Self {
        let message = err.to_string();
        match err {
            AvailabilityError::InvalidRange { .. } => AppError::BadRequest(message),
            AvailabilityError::ServiceNotFound(_) => AppError::NotFound(message),
            AvailabilityError::InvalidServiceDuration { .. } => AppError::BadRequest(message),
            AvailabilityError::CalendarFactsUnavailable(_) => AppError::ExternalService(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn client_correctable_errors_map_to_4xx_variants() {
        let invalid_range = AvailabilityError::InvalidRange {
            start: date(2025, 6, 10),
            end: date(2025, 6, 2),
        };
        assert_matches!(AppError::from(invalid_range), AppError::BadRequest(_));

        let not_found = AvailabilityError::ServiceNotFound(Uuid::new_v4());
        assert_matches!(AppError::from(not_found), AppError::NotFound(_));

        let bad_duration = AvailabilityError::InvalidServiceDuration {
            service_id: Uuid::new_v4(),
            minutes: -15,
        };
        assert_matches!(AppError::from(bad_duration), AppError::BadRequest(_));
    }

    #[test]
    fn collaborator_failures_map_to_external_service() {
        let unavailable =
            AvailabilityError::CalendarFactsUnavailable("connection reset".to_string());
        assert_matches!(AppError::from(unavailable), AppError::ExternalService(_));
    }
}
