use chrono::{Datelike, NaiveDate, Weekday};
use tracing::{debug, warn};

use crate::models::{Booking, ProviderSchedule, ScheduleOverride, TimeBlock};

/// Day of week as stored on schedule rows (0 = Sunday, 1 = Monday, etc.)
pub fn day_of_week(date: NaiveDate) -> i32 {
    match date.weekday() {
        Weekday::Sun => 0,
        Weekday::Mon => 1,
        Weekday::Tue => 2,
        Weekday::Wed => 3,
        Weekday::Thu => 4,
        Weekday::Fri => 5,
        Weekday::Sat => 6,
    }
}

/// Base working blocks for a date: the union of the active weekly rows for
/// its day of week, or nothing at all when the date carries a full-day
/// block-out override. Additive overrides are applied later, so a blocked-out
/// day can still be reopened by one.
pub fn build_day_blocks(
    date: NaiveDate,
    weekly: &[ProviderSchedule],
    overrides: &[ScheduleOverride],
) -> Vec<TimeBlock> {
    if overrides.iter().any(|entry| entry.is_full_day_blockout()) {
        debug!("Full-day block-out on {}, weekly schedule suppressed", date);
        return Vec::new();
    }

    let dow = day_of_week(date);
    let mut blocks = Vec::new();

    for entry in weekly {
        if !entry.is_active || entry.day_of_week != dow {
            continue;
        }
        if entry.start_time >= entry.end_time {
            warn!(
                "Skipping malformed schedule row {}: start {} is not before end {}",
                entry.id, entry.start_time, entry.end_time
            );
            continue;
        }
        blocks.push(TimeBlock::new(
            date.and_time(entry.start_time).and_utc(),
            date.and_time(entry.end_time).and_utc(),
        ));
    }

    merge_blocks(blocks)
}

/// Sort blocks and merge overlapping or adjacent ones into a disjoint list.
/// Zero-length and inverted blocks are dropped.
pub fn merge_blocks(mut blocks: Vec<TimeBlock>) -> Vec<TimeBlock> {
    blocks.retain(|block| block.start < block.end);
    blocks.sort_by_key(|block| block.start);

    let mut merged: Vec<TimeBlock> = Vec::with_capacity(blocks.len());
    for block in blocks {
        if let Some(last) = merged.last_mut() {
            if block.start <= last.end {
                last.end = last.end.max(block.end);
                continue;
            }
        }
        merged.push(block);
    }
    merged
}

/// Remove a window from every block it overlaps. A block untouched by the
/// window survives as-is; one fully covered disappears; one pierced in the
/// middle splits in two; one clipped at either edge is truncated.
pub fn subtract_block(blocks: &[TimeBlock], removal: &TimeBlock) -> Vec<TimeBlock> {
    let mut result = Vec::with_capacity(blocks.len() + 1);

    for block in blocks {
        if removal.end <= block.start || removal.start >= block.end {
            result.push(*block);
            continue;
        }
        if removal.start > block.start {
            result.push(TimeBlock::new(block.start, removal.start));
        }
        if removal.end < block.end {
            result.push(TimeBlock::new(removal.end, block.end));
        }
    }

    result
}

/// Apply a date's partial overrides on top of its base blocks. Additions are
/// always applied before removals, so the result does not depend on the order
/// the rows came back from the database.
pub fn apply_overrides(
    blocks: Vec<TimeBlock>,
    date: NaiveDate,
    overrides: &[ScheduleOverride],
) -> Vec<TimeBlock> {
    let mut blocks = blocks;

    for entry in overrides.iter().filter(|entry| entry.is_available) {
        match entry.window() {
            Some((start, end)) if start < end => {
                blocks.push(TimeBlock::new(
                    date.and_time(start).and_utc(),
                    date.and_time(end).and_utc(),
                ));
            }
            Some((start, end)) => {
                warn!(
                    "Skipping malformed override {}: start {} is not before end {}",
                    entry.id, start, end
                );
            }
            None if entry.has_partial_bounds() => {
                warn!(
                    "Skipping malformed override {}: only one of start/end is set",
                    entry.id
                );
            }
            // An availability override without a window only marks the day as
            // open; there is no window to add.
            None => {}
        }
    }
    blocks = merge_blocks(blocks);

    for entry in overrides.iter().filter(|entry| !entry.is_available) {
        if entry.is_full_day_blockout() {
            // Already accounted for when the base blocks were built.
            continue;
        }
        match entry.window() {
            Some((start, end)) if start < end => {
                let removal = TimeBlock::new(
                    date.and_time(start).and_utc(),
                    date.and_time(end).and_utc(),
                );
                blocks = subtract_block(&blocks, &removal);
            }
            _ => {
                warn!("Skipping malformed override {}: invalid removal window", entry.id);
            }
        }
    }

    blocks
}

/// Remove the time occupied by existing bookings. Only occupying statuses
/// block slots; subtraction over a disjoint block list is order-independent.
pub fn subtract_bookings(blocks: Vec<TimeBlock>, bookings: &[Booking]) -> Vec<TimeBlock> {
    let mut blocks = blocks;

    for booking in bookings {
        if !booking.status.is_occupying() {
            continue;
        }
        if booking.duration_minutes <= 0 {
            warn!(
                "Skipping booking {} with non-positive duration of {} minutes",
                booking.id, booking.duration_minutes
            );
            continue;
        }
        let occupied = TimeBlock::new(booking.start_time, booking.scheduled_end_time());
        blocks = subtract_block(&blocks, &occupied);
    }

    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BookingStatus;
    use chrono::{DateTime, NaiveTime, Utc};
    use uuid::Uuid;

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
    }

    fn hm(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        monday().and_hms_opt(hour, minute, 0).unwrap().and_utc()
    }

    fn block(start_h: u32, start_m: u32, end_h: u32, end_m: u32) -> TimeBlock {
        TimeBlock::new(at(start_h, start_m), at(end_h, end_m))
    }

    fn weekly_row(day: i32, start: NaiveTime, end: NaiveTime, active: bool) -> ProviderSchedule {
        ProviderSchedule {
            id: Uuid::new_v4(),
            provider_id: Uuid::new_v4(),
            clinic_id: Uuid::new_v4(),
            day_of_week: day,
            start_time: start,
            end_time: end,
            is_active: active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn override_row(
        is_available: bool,
        window: Option<(NaiveTime, NaiveTime)>,
    ) -> ScheduleOverride {
        ScheduleOverride {
            id: Uuid::new_v4(),
            provider_id: Uuid::new_v4(),
            clinic_id: None,
            override_date: monday(),
            start_time: window.map(|(start, _)| start),
            end_time: window.map(|(_, end)| end),
            is_available,
            reason: None,
            created_at: Utc::now(),
        }
    }

    fn booking(start: DateTime<Utc>, duration_minutes: i32, status: BookingStatus) -> Booking {
        Booking {
            id: Uuid::new_v4(),
            provider_id: Uuid::new_v4(),
            clinic_id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            start_time: start,
            duration_minutes,
            status,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    // ── subtract_block ────────────────────────────────────────────

    #[test]
    fn subtract_no_overlap_keeps_block() {
        let blocks = vec![block(9, 0, 12, 0)];
        let result = subtract_block(&blocks, &block(13, 0, 14, 0));
        assert_eq!(result, blocks);
    }

    #[test]
    fn subtract_full_cover_removes_block() {
        let blocks = vec![block(9, 0, 12, 0)];
        let result = subtract_block(&blocks, &block(8, 0, 13, 0));
        assert!(result.is_empty());
    }

    #[test]
    fn subtract_middle_window_splits_block() {
        let blocks = vec![block(9, 0, 12, 0)];
        let result = subtract_block(&blocks, &block(10, 0, 11, 0));
        assert_eq!(result, vec![block(9, 0, 10, 0), block(11, 0, 12, 0)]);
    }

    #[test]
    fn subtract_overlapping_start_truncates_left() {
        let blocks = vec![block(9, 0, 12, 0)];
        let result = subtract_block(&blocks, &block(8, 0, 10, 0));
        assert_eq!(result, vec![block(10, 0, 12, 0)]);
    }

    #[test]
    fn subtract_overlapping_end_truncates_right() {
        let blocks = vec![block(9, 0, 12, 0)];
        let result = subtract_block(&blocks, &block(11, 0, 13, 0));
        assert_eq!(result, vec![block(9, 0, 11, 0)]);
    }

    #[test]
    fn subtract_spanning_multiple_blocks() {
        let blocks = vec![block(9, 0, 10, 0), block(11, 0, 12, 0), block(14, 0, 16, 0)];
        let result = subtract_block(&blocks, &block(9, 30, 15, 0));
        assert_eq!(result, vec![block(9, 0, 9, 30), block(15, 0, 16, 0)]);
    }

    // ── merge_blocks ──────────────────────────────────────────────

    #[test]
    fn merge_overlapping_blocks() {
        let merged = merge_blocks(vec![block(10, 0, 12, 0), block(9, 0, 11, 0)]);
        assert_eq!(merged, vec![block(9, 0, 12, 0)]);
    }

    #[test]
    fn merge_adjacent_blocks() {
        let merged = merge_blocks(vec![block(9, 0, 10, 0), block(10, 0, 11, 0)]);
        assert_eq!(merged, vec![block(9, 0, 11, 0)]);
    }

    #[test]
    fn merge_drops_inverted_blocks() {
        let merged = merge_blocks(vec![block(12, 0, 9, 0), block(14, 0, 15, 0)]);
        assert_eq!(merged, vec![block(14, 0, 15, 0)]);
    }

    // ── build_day_blocks ──────────────────────────────────────────

    #[test]
    fn weekly_rows_for_other_days_are_ignored() {
        let weekly = vec![
            weekly_row(1, hm(9, 0), hm(12, 0), true),
            weekly_row(2, hm(14, 0), hm(17, 0), true),
        ];
        let blocks = build_day_blocks(monday(), &weekly, &[]);
        assert_eq!(blocks, vec![block(9, 0, 12, 0)]);
    }

    #[test]
    fn inactive_weekly_rows_are_ignored() {
        let weekly = vec![weekly_row(1, hm(9, 0), hm(12, 0), false)];
        let blocks = build_day_blocks(monday(), &weekly, &[]);
        assert!(blocks.is_empty());
    }

    #[test]
    fn malformed_weekly_row_is_skipped_not_fatal() {
        let weekly = vec![
            weekly_row(1, hm(12, 0), hm(9, 0), true),
            weekly_row(1, hm(14, 0), hm(17, 0), true),
        ];
        let blocks = build_day_blocks(monday(), &weekly, &[]);
        assert_eq!(blocks, vec![block(14, 0, 17, 0)]);
    }

    #[test]
    fn duplicate_weekly_rows_are_unioned() {
        let weekly = vec![
            weekly_row(1, hm(9, 0), hm(11, 0), true),
            weekly_row(1, hm(10, 0), hm(12, 0), true),
        ];
        let blocks = build_day_blocks(monday(), &weekly, &[]);
        assert_eq!(blocks, vec![block(9, 0, 12, 0)]);
    }

    #[test]
    fn full_day_blockout_suppresses_weekly_schedule() {
        let weekly = vec![weekly_row(1, hm(9, 0), hm(12, 0), true)];
        let overrides = vec![override_row(false, None)];
        let blocks = build_day_blocks(monday(), &weekly, &overrides);
        assert!(blocks.is_empty());
    }

    // ── apply_overrides ───────────────────────────────────────────

    #[test]
    fn additive_override_adds_window() {
        let overrides = vec![override_row(true, Some((hm(14, 0), hm(16, 0))))];
        let blocks = apply_overrides(vec![block(9, 0, 12, 0)], monday(), &overrides);
        assert_eq!(blocks, vec![block(9, 0, 12, 0), block(14, 0, 16, 0)]);
    }

    #[test]
    fn additive_override_works_without_base_blocks() {
        let overrides = vec![override_row(true, Some((hm(14, 0), hm(16, 0))))];
        let blocks = apply_overrides(Vec::new(), monday(), &overrides);
        assert_eq!(blocks, vec![block(14, 0, 16, 0)]);
    }

    #[test]
    fn removal_override_splits_block() {
        let overrides = vec![override_row(false, Some((hm(10, 0), hm(11, 0))))];
        let blocks = apply_overrides(vec![block(9, 0, 12, 0)], monday(), &overrides);
        assert_eq!(blocks, vec![block(9, 0, 10, 0), block(11, 0, 12, 0)]);
    }

    #[test]
    fn additions_apply_before_removals_regardless_of_row_order() {
        // The removal row comes first, yet still carves the added window.
        let overrides = vec![
            override_row(false, Some((hm(14, 30), hm(15, 0)))),
            override_row(true, Some((hm(14, 0), hm(16, 0)))),
        ];
        let blocks = apply_overrides(Vec::new(), monday(), &overrides);
        assert_eq!(blocks, vec![block(14, 0, 14, 30), block(15, 0, 16, 0)]);
    }

    #[test]
    fn half_bounded_override_is_skipped() {
        let mut entry = override_row(true, Some((hm(14, 0), hm(16, 0))));
        entry.end_time = None;
        let blocks = apply_overrides(vec![block(9, 0, 12, 0)], monday(), &[entry]);
        assert_eq!(blocks, vec![block(9, 0, 12, 0)]);
    }

    #[test]
    fn inverted_removal_window_is_skipped() {
        let overrides = vec![override_row(false, Some((hm(11, 0), hm(10, 0))))];
        let blocks = apply_overrides(vec![block(9, 0, 12, 0)], monday(), &overrides);
        assert_eq!(blocks, vec![block(9, 0, 12, 0)]);
    }

    // ── subtract_bookings ─────────────────────────────────────────

    #[test]
    fn occupying_booking_is_subtracted() {
        let bookings = vec![booking(at(10, 0), 60, BookingStatus::Confirmed)];
        let blocks = subtract_bookings(vec![block(9, 0, 12, 0)], &bookings);
        assert_eq!(blocks, vec![block(9, 0, 10, 0), block(11, 0, 12, 0)]);
    }

    #[test]
    fn cancelled_booking_does_not_block() {
        let bookings = vec![booking(at(10, 0), 60, BookingStatus::Cancelled)];
        let blocks = subtract_bookings(vec![block(9, 0, 12, 0)], &bookings);
        assert_eq!(blocks, vec![block(9, 0, 12, 0)]);
    }

    #[test]
    fn booking_covering_whole_block_consumes_it() {
        let bookings = vec![booking(at(9, 0), 180, BookingStatus::Pending)];
        let blocks = subtract_bookings(vec![block(9, 0, 12, 0)], &bookings);
        assert!(blocks.is_empty());
    }

    #[test]
    fn booking_order_does_not_change_result() {
        let forward = vec![
            booking(at(9, 30), 30, BookingStatus::Confirmed),
            booking(at(11, 0), 30, BookingStatus::Pending),
        ];
        let reversed: Vec<Booking> = forward.iter().rev().cloned().collect();

        let a = subtract_bookings(vec![block(9, 0, 12, 0)], &forward);
        let b = subtract_bookings(vec![block(9, 0, 12, 0)], &reversed);
        assert_eq!(a, b);
        assert_eq!(a, vec![block(9, 0, 9, 30), block(10, 0, 11, 0), block(11, 30, 12, 0)]);
    }

    #[test]
    fn non_positive_duration_booking_is_skipped() {
        let bookings = vec![booking(at(10, 0), 0, BookingStatus::Confirmed)];
        let blocks = subtract_bookings(vec![block(9, 0, 12, 0)], &bookings);
        assert_eq!(blocks, vec![block(9, 0, 12, 0)]);
    }
}
