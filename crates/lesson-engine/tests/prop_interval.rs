//! Property-based tests for interval algebra and the conflict resolver using proptest.
//!
//! These hold for any interval and buffer, not just the fixed scenarios in
//! `interval_tests.rs` and `conflict_tests.rs`.

use chrono::{DateTime, Duration, TimeZone, Utc};
use chrono_tz::Tz;
use lesson_engine::interval::enumerate_slots;
use lesson_engine::{
    overlaps, with_buffer, AvailabilityIndex, Booking, BookingStatus, ConflictResolver,
    EngineConfig, Money, Rejection, TeacherProfile, TimeInterval, WallTime,
    WeeklyAvailabilityRule,
};
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 16, 0, 0, 0).unwrap()
}

/// Intervals starting within one day of `base()`, 1 minute to 4 hours long.
fn arb_interval() -> impl Strategy<Value = TimeInterval> {
    (0i64..1440, 1i64..=240).prop_map(|(offset, len)| {
        TimeInterval::starting_at(base() + Duration::minutes(offset), len).unwrap()
    })
}

fn arb_wall_time() -> impl Strategy<Value = WallTime> {
    (0u32..24, 0u32..60).prop_map(|(h, m)| WallTime::new(h, m).unwrap())
}

fn lesson_start(minute_of_day: i64) -> DateTime<Utc> {
    base() + Duration::minutes(minute_of_day)
}

fn confirmed(start: DateTime<Utc>, minutes: i64) -> Booking {
    Booking {
        id: "existing".to_string(),
        student_id: "s1".to_string(),
        teacher_id: "t1".to_string(),
        interval: TimeInterval::starting_at(start, minutes).unwrap(),
        duration_minutes: minutes,
        status: BookingStatus::Confirmed,
        student_timezone: Tz::UTC,
        teacher_timezone: Tz::UTC,
        meeting_link: None,
        cancel_reason: None,
        notes: None,
        history: Vec::new(),
    }
}

fn all_day_monday() -> AvailabilityIndex {
    let rule = WeeklyAvailabilityRule::recurring(
        "mon",
        "t1",
        1,
        WallTime::MIDNIGHT,
        "23:59".parse().unwrap(),
    )
    .unwrap();
    AvailabilityIndex::with_schedule("t1", Tz::UTC, vec![rule]).unwrap()
}

fn teacher(buffer_minutes: u32) -> TeacherProfile {
    TeacherProfile {
        teacher_id: "t1".to_string(),
        timezone: Tz::UTC,
        buffer_minutes,
        hourly_rate: Money::from_minor(6000),
        active: true,
    }
}

// ---------------------------------------------------------------------------
// Interval properties
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn overlap_is_symmetric(a in arb_interval(), b in arb_interval()) {
        prop_assert_eq!(overlaps(&a, &b), overlaps(&b, &a));
        prop_assert_eq!(a.overlap_minutes(&b), b.overlap_minutes(&a));
    }

    #[test]
    fn interval_overlaps_itself(a in arb_interval()) {
        prop_assert!(overlaps(&a, &a));
        prop_assert_eq!(a.overlap_minutes(&a), a.duration_minutes());
    }

    #[test]
    fn back_to_back_never_overlaps(a in arb_interval(), len in 1i64..=240) {
        let next = TimeInterval::starting_at(a.end(), len).unwrap();
        prop_assert!(!overlaps(&a, &next));
        prop_assert!(!overlaps(&next, &a));
    }

    #[test]
    fn overlap_minutes_never_exceed_either_length(a in arb_interval(), b in arb_interval()) {
        let shared = a.overlap_minutes(&b);
        prop_assert!(shared >= 0);
        prop_assert!(shared <= a.duration_minutes().min(b.duration_minutes()));
        prop_assert_eq!(shared > 0, overlaps(&a, &b));
    }

    #[test]
    fn buffer_grows_duration_by_twice_the_buffer(a in arb_interval(), buffer in 0u32..=60) {
        let padded = with_buffer(&a, buffer);
        prop_assert_eq!(padded.duration_minutes(), a.duration_minutes() + 2 * i64::from(buffer));
        prop_assert!(overlaps(&padded, &a));
    }

    #[test]
    fn wall_time_display_parses_back(t in arb_wall_time()) {
        let parsed: WallTime = t.to_string().parse().unwrap();
        prop_assert_eq!(parsed, t);
    }

    #[test]
    fn slots_are_stepped_and_below_end(
        start in arb_wall_time(),
        end in arb_wall_time(),
        step in 1u32..=120,
    ) {
        let slots: Vec<WallTime> = enumerate_slots(start, end, step).collect();
        prop_assert!(slots.iter().all(|s| *s >= start && *s < end));
        prop_assert!(slots.windows(2).all(|w| w[1].minutes() - w[0].minutes() == step));
        if start < end {
            prop_assert_eq!(slots.first().copied(), Some(start));
        } else {
            prop_assert!(slots.is_empty());
        }
    }
}

// ---------------------------------------------------------------------------
// Resolver properties
// ---------------------------------------------------------------------------

proptest! {
    /// A candidate starting less than `buffer` minutes after an existing lesson ends
    /// is always rejected; one starting exactly `buffer` minutes after is never
    /// rejected for a conflict.
    #[test]
    fn buffer_gap_is_enforced(buffer in 1u32..=60, gap in 0u32..=60) {
        let config = EngineConfig::default();
        let index = all_day_monday();
        let resolver = ConflictResolver::new(&config, &index);
        let existing = vec![confirmed(lesson_start(8 * 60), 60)];
        let now = base() - Duration::days(1);

        let start = existing[0].interval.end() + Duration::minutes(i64::from(gap));
        let candidate = TimeInterval::starting_at(start, 45).unwrap();
        let verdict = resolver.can_book(&candidate, &teacher(buffer), &existing, None, now);

        if gap < buffer {
            let is_slot_unavailable = matches!(verdict, Err(Rejection::SlotUnavailable { .. }));
            prop_assert!(is_slot_unavailable);
        } else {
            prop_assert!(verdict.is_ok());
        }
    }

    /// Excluding the only existing booking makes any in-hours candidate conflict-free.
    #[test]
    fn excluding_the_only_booking_removes_conflicts(
        existing_start in 60i64..1200,
        candidate_start in 60i64..1200,
        buffer in 0u32..=60,
    ) {
        let config = EngineConfig::default();
        let index = all_day_monday();
        let resolver = ConflictResolver::new(&config, &index);
        let existing = vec![confirmed(lesson_start(existing_start), 60)];
        let now = base() - Duration::days(1);
        let candidate = TimeInterval::starting_at(lesson_start(candidate_start), 60).unwrap();

        let verdict =
            resolver.can_book(&candidate, &teacher(buffer), &existing, Some("existing"), now);
        prop_assert!(verdict.is_ok());
    }
}
