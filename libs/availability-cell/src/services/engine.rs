use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::{AppConfig, DEFAULT_SLOT_STEP_MINUTES};

use crate::error::AvailabilityError;
use crate::models::{
    AvailabilityRequest, AvailabilitySlot, Booking, DailyAvailability, ProviderSchedule,
    ScheduleOverride,
};
use crate::services::blocks::{apply_overrides, build_day_blocks, subtract_bookings};
use crate::services::facts::{CalendarFacts, SupabaseCalendarFacts};
use crate::services::slots::carve_slots;

/// Computes bookable slots for a provider across a date range.
///
/// The engine is a pure computation over one snapshot of calendar facts: it
/// fetches the facts once per request, holds no shared mutable state, and is
/// safe to invoke concurrently for independent requests.
pub struct AvailabilityEngine {
    facts: Arc<dyn CalendarFacts>,
    slot_step_minutes: i32,
}

impl AvailabilityEngine {
    pub fn new(facts: Arc<dyn CalendarFacts>) -> Self {
        Self {
            facts,
            slot_step_minutes: DEFAULT_SLOT_STEP_MINUTES,
        }
    }

    /// Engine wired to Supabase, with the step granularity from configuration.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(Arc::new(SupabaseCalendarFacts::new(config)))
            .with_slot_step(config.slot_step_minutes)
    }

    /// Override the slot step granularity. Non-positive values keep the
    /// current step.
    pub fn with_slot_step(mut self, minutes: i32) -> Self {
        if minutes > 0 {
            self.slot_step_minutes = minutes;
        } else {
            warn!("Ignoring non-positive slot step of {} minutes", minutes);
        }
        self
    }

    /// Compute per-date bookable slots for the requested provider, clinic and
    /// service. Dates with no slots are omitted from the result.
    pub async fn compute_availability(
        &self,
        request: &AvailabilityRequest,
    ) -> Result<Vec<DailyAvailability>, AvailabilityError> {
        if request.end_date < request.start_date {
            return Err(AvailabilityError::InvalidRange {
                start: request.start_date,
                end: request.end_date,
            });
        }

        debug!(
            "Computing availability for provider {} at clinic {} from {} to {}",
            request.provider_id, request.clinic_id, request.start_date, request.end_date
        );

        let service = self
            .facts
            .service(request.service_id)
            .await
            .map_err(|e| AvailabilityError::CalendarFactsUnavailable(e.to_string()))?
            .ok_or(AvailabilityError::ServiceNotFound(request.service_id))?;

        if service.duration_minutes <= 0 {
            return Err(AvailabilityError::InvalidServiceDuration {
                service_id: service.id,
                minutes: service.duration_minutes,
            });
        }

        // The three calendar fetches are independent and read-only; run them
        // concurrently and fail the whole request if any of them fails.
        let (weekly, overrides, bookings) = tokio::try_join!(
            self.facts
                .weekly_schedule(request.provider_id, request.clinic_id),
            self.facts.overrides_in_range(
                request.provider_id,
                request.clinic_id,
                request.start_date,
                request.end_date,
            ),
            self.facts.bookings_in_range(
                request.provider_id,
                request.clinic_id,
                request.start_date,
                request.end_date,
            ),
        )
        .map_err(|e| AvailabilityError::CalendarFactsUnavailable(e.to_string()))?;

        let mut days = Vec::new();
        let mut date = request.start_date;

        while date <= request.end_date {
            let slots = self.compute_day(
                date,
                request.clinic_id,
                &weekly,
                &overrides,
                &bookings,
                service.duration_minutes,
            );
            if !slots.is_empty() {
                days.push(DailyAvailability { date, slots });
            }

            match date.succ_opt() {
                Some(next) => date = next,
                None => break,
            }
        }

        debug!("Found availability on {} of the requested days", days.len());
        Ok(days)
    }

    /// Earliest bookable slot within a forward search horizon of `max_days`
    /// calendar days starting at `from_date`.
    pub async fn first_available_slot(
        &self,
        provider_id: Uuid,
        clinic_id: Uuid,
        service_id: Uuid,
        from_date: NaiveDate,
        max_days: u32,
    ) -> Result<Option<AvailabilitySlot>, AvailabilityError> {
        if max_days == 0 {
            return Ok(None);
        }

        let request = AvailabilityRequest {
            provider_id,
            clinic_id,
            service_id,
            start_date: from_date,
            end_date: from_date + Duration::days(i64::from(max_days) - 1),
        };

        let days = self.compute_availability(&request).await?;
        Ok(days
            .into_iter()
            .next()
            .and_then(|day| day.slots.into_iter().next()))
    }

    /// Run the per-day pipeline: base blocks from the weekly schedule, then
    /// overrides, then booking subtraction, then slot carving.
    fn compute_day(
        &self,
        date: NaiveDate,
        clinic_id: Uuid,
        weekly: &[ProviderSchedule],
        overrides: &[ScheduleOverride],
        bookings: &[Booking],
        duration_minutes: i32,
    ) -> Vec<AvailabilitySlot> {
        let day_overrides: Vec<ScheduleOverride> = overrides
            .iter()
            .filter(|entry| entry.override_date == date && entry.applies_to_clinic(clinic_id))
            .cloned()
            .collect();

        let day_start = date.and_hms_opt(0, 0, 0).unwrap().and_utc();
        let day_end = day_start + Duration::days(1);
        let day_bookings: Vec<Booking> = bookings
            .iter()
            .filter(|booking| {
                booking.start_time < day_end && booking.scheduled_end_time() > day_start
            })
            .cloned()
            .collect();

        let blocks = build_day_blocks(date, weekly, &day_overrides);
        let blocks = apply_overrides(blocks, date, &day_overrides);
        let blocks = subtract_bookings(blocks, &day_bookings);

        carve_slots(&blocks, duration_minutes, self.slot_step_minutes)
    }
}
