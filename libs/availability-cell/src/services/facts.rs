use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{Booking, ProviderSchedule, ScheduleOverride, Service};

/// Read-only calendar facts the engine needs for one request. The engine only
/// depends on this trait; the backing client's lifecycle belongs to the
/// caller.
#[async_trait]
pub trait CalendarFacts: Send + Sync {
    /// Active weekly recurring schedule rows for a provider at a clinic.
    async fn weekly_schedule(
        &self,
        provider_id: Uuid,
        clinic_id: Uuid,
    ) -> Result<Vec<ProviderSchedule>>;

    /// Date-specific overrides in the inclusive date range, scoped to the
    /// clinic or globally scoped.
    async fn overrides_in_range(
        &self,
        provider_id: Uuid,
        clinic_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<ScheduleOverride>>;

    /// Occupying bookings starting within the inclusive date range.
    async fn bookings_in_range(
        &self,
        provider_id: Uuid,
        clinic_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Booking>>;

    async fn service(&self, service_id: Uuid) -> Result<Option<Service>>;
}

pub struct SupabaseCalendarFacts {
    supabase: SupabaseClient,
}

impl SupabaseCalendarFacts {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }
}

#[async_trait]
impl CalendarFacts for SupabaseCalendarFacts {
    async fn weekly_schedule(
        &self,
        provider_id: Uuid,
        clinic_id: Uuid,
    ) -> Result<Vec<ProviderSchedule>> {
        debug!("Fetching weekly schedule for provider: {}", provider_id);

        let path = format!(
            "/rest/v1/provider_schedules?provider_id=eq.{}&clinic_id=eq.{}&is_active=eq.true&order=day_of_week.asc,start_time.asc",
            provider_id, clinic_id
        );
        self.supabase.select(&path).await
    }

    async fn overrides_in_range(
        &self,
        provider_id: Uuid,
        clinic_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<ScheduleOverride>> {
        debug!(
            "Fetching schedule overrides for provider {} between {} and {}",
            provider_id, start, end
        );

        let path = format!(
            "/rest/v1/schedule_overrides?provider_id=eq.{}&override_date=gte.{}&override_date=lte.{}&or=(clinic_id.eq.{},clinic_id.is.null)&order=override_date.asc",
            provider_id, start, end, clinic_id
        );
        self.supabase.select(&path).await
    }

    async fn bookings_in_range(
        &self,
        provider_id: Uuid,
        clinic_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Booking>> {
        debug!(
            "Fetching bookings for provider {} between {} and {}",
            provider_id, start, end
        );

        let range_start = start.and_hms_opt(0, 0, 0).unwrap().and_utc();
        let range_end = (end + Duration::days(1)).and_hms_opt(0, 0, 0).unwrap().and_utc();

        let path = format!(
            "/rest/v1/bookings?provider_id=eq.{}&clinic_id=eq.{}&status=in.(pending,confirmed)&start_time=gte.{}&start_time=lt.{}&order=start_time.asc",
            provider_id,
            clinic_id,
            range_start.to_rfc3339(),
            range_end.to_rfc3339()
        );
        self.supabase.select(&path).await
    }

    async fn service(&self, service_id: Uuid) -> Result<Option<Service>> {
        debug!("Fetching service: {}", service_id);

        let path = format!("/rest/v1/services?id=eq.{}", service_id);
        let mut rows: Vec<Service> = self.supabase.select(&path).await?;

        if rows.is_empty() {
            Ok(None)
        } else {
            Ok(Some(rows.remove(0)))
        }
    }
}
