use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc, NaiveDate, NaiveTime};
use std::fmt;

// ==============================================================================
// CALENDAR FACTS
// ==============================================================================

/// One recurring weekly working window for a provider at a clinic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSchedule {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub clinic_id: Uuid,
    pub day_of_week: i32, // 0 = Sunday, 1 = Monday, etc.
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Date-specific exception to the weekly schedule (vacation, extra shift, etc.).
///
/// Without a time window, `is_available = false` blocks out the whole date.
/// With a window, the window is removed from (`is_available = false`) or added
/// to (`is_available = true`) that date's working time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleOverride {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub clinic_id: Option<Uuid>,
    pub override_date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub is_available: bool,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ScheduleOverride {
    pub fn is_full_day_blockout(&self) -> bool {
        !self.is_available && self.start_time.is_none() && self.end_time.is_none()
    }

    pub fn window(&self) -> Option<(NaiveTime, NaiveTime)> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some((start, end)),
            _ => None,
        }
    }

    pub fn has_partial_bounds(&self) -> bool {
        self.start_time.is_some() != self.end_time.is_some()
    }

    /// Overrides scoped to a clinic apply only there; unscoped overrides
    /// apply regardless of clinic.
    pub fn applies_to_clinic(&self, clinic_id: Uuid) -> bool {
        self.clinic_id.map_or(true, |scoped| scoped == clinic_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
    NoShow,
}

impl BookingStatus {
    /// Whether the booking consumes provider time.
    pub fn is_occupying(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingStatus::Pending => write!(f, "pending"),
            BookingStatus::Confirmed => write!(f, "confirmed"),
            BookingStatus::Completed => write!(f, "completed"),
            BookingStatus::Cancelled => write!(f, "cancelled"),
            BookingStatus::NoShow => write!(f, "no_show"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub clinic_id: Uuid,
    pub patient_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub duration_minutes: i32,
    pub status: BookingStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// Calculate the scheduled end time from start time and duration
    pub fn scheduled_end_time(&self) -> DateTime<Utc> {
        self.start_time + chrono::Duration::minutes(self.duration_minutes as i64)
    }
}

/// A bookable service and its typical appointment length.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: Uuid,
    pub name: String,
    pub duration_minutes: i32,
    pub is_active: bool,
}

// ==============================================================================
// COMPUTATION TYPES
// ==============================================================================

/// Contiguous half-open interval of working time on a single date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBlock {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeBlock {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }
}

/// A candidate bookable interval, exactly as long as the requested service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AvailabilitySlot {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyAvailability {
    pub date: NaiveDate,
    pub slots: Vec<AvailabilitySlot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityRequest {
    pub provider_id: Uuid,
    pub clinic_id: Uuid,
    pub service_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}
