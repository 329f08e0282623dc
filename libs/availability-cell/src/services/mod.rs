pub mod blocks;
pub mod engine;
pub mod facts;
pub mod slots;

pub use engine::AvailabilityEngine;
pub use facts::{CalendarFacts, SupabaseCalendarFacts};
