use chrono::Duration;

use crate::models::{AvailabilitySlot, TimeBlock};

/// Carve candidate slots of the service duration out of the final working
/// blocks. Candidate starts advance by the step granularity rather than the
/// service duration, so consecutive candidates may overlap by up to
/// `duration - step`; callers present them as alternatives and book exactly
/// one. Blocks arrive sorted and disjoint, so the output is ascending.
pub fn carve_slots(
    blocks: &[TimeBlock],
    duration_minutes: i32,
    step_minutes: i32,
) -> Vec<AvailabilitySlot> {
    if duration_minutes <= 0 || step_minutes <= 0 {
        return Vec::new();
    }

    let duration = Duration::minutes(duration_minutes as i64);
    let step = Duration::minutes(step_minutes as i64);
    let mut slots = Vec::new();

    for block in blocks {
        let mut cursor = block.start;
        while cursor + duration <= block.end {
            slots.push(AvailabilitySlot {
                start_time: cursor,
                end_time: cursor + duration,
            });
            cursor += step;
        }
    }

    slots
}
