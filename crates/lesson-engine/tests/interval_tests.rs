//! Tests for interval algebra, wall-clock parsing and slot enumeration.

use chrono::{TimeZone, Utc};
use lesson_engine::interval::{enumerate_slots, merge_windows};
use lesson_engine::timezone::{day_of_week, from_local, parse_timezone, to_local, DstPolicy};
use lesson_engine::{overlaps, with_buffer, TimeInterval, ValidationError, WallTime};

// ── Helpers ─────────────────────────────────────────────────────────────────

fn iv(start: &str, end: &str) -> TimeInterval {
    TimeInterval::new(start.parse().unwrap(), end.parse().unwrap()).unwrap()
}

fn wt(s: &str) -> WallTime {
    s.parse().unwrap()
}

// ── TimeInterval ────────────────────────────────────────────────────────────

#[test]
fn interval_requires_start_before_end() {
    let t = Utc.with_ymd_and_hms(2026, 3, 16, 10, 0, 0).unwrap();
    assert_eq!(
        TimeInterval::new(t, t).unwrap_err(),
        ValidationError::InvalidInterval
    );
    assert!(TimeInterval::starting_at(t, 0).is_err());
    assert!(TimeInterval::starting_at(t, -15).is_err());
}

#[test]
fn starting_at_sets_duration() {
    let t = Utc.with_ymd_and_hms(2026, 3, 16, 10, 0, 0).unwrap();
    let lesson = TimeInterval::starting_at(t, 45).unwrap();
    assert_eq!(lesson.duration_minutes(), 45);
    assert_eq!(lesson.end(), Utc.with_ymd_and_hms(2026, 3, 16, 10, 45, 0).unwrap());
}

#[test]
fn deserializing_inverted_interval_fails() {
    let json = r#"{"start":"2026-03-16T11:00:00Z","end":"2026-03-16T10:00:00Z"}"#;
    assert!(serde_json::from_str::<TimeInterval>(json).is_err());
}

#[test]
fn touching_intervals_do_not_overlap() {
    let a = iv("2026-03-16T10:00:00Z", "2026-03-16T11:00:00Z");
    let b = iv("2026-03-16T11:00:00Z", "2026-03-16T12:00:00Z");
    assert!(!overlaps(&a, &b));
    assert!(!overlaps(&b, &a));
    assert_eq!(a.overlap_minutes(&b), 0);
}

#[test]
fn partial_overlap_is_symmetric() {
    let a = iv("2026-03-16T10:00:00Z", "2026-03-16T11:00:00Z");
    let b = iv("2026-03-16T10:30:00Z", "2026-03-16T11:30:00Z");
    assert!(overlaps(&a, &b));
    assert!(overlaps(&b, &a));
    assert_eq!(a.overlap_minutes(&b), 30);
}

#[test]
fn contained_interval_overlaps() {
    let outer = iv("2026-03-16T09:00:00Z", "2026-03-16T17:00:00Z");
    let inner = iv("2026-03-16T12:00:00Z", "2026-03-16T12:20:00Z");
    assert!(overlaps(&outer, &inner));
    assert_eq!(outer.overlap_minutes(&inner), 20);
}

#[test]
fn buffer_expands_both_ends() {
    let lesson = iv("2026-03-16T10:00:00Z", "2026-03-16T11:00:00Z");
    let padded = with_buffer(&lesson, 10);
    assert_eq!(padded, iv("2026-03-16T09:50:00Z", "2026-03-16T11:10:00Z"));
    assert_eq!(with_buffer(&lesson, 0), lesson);
}

#[test]
fn starting_at_rejects_lengths_past_the_representable_range() {
    let t = Utc.with_ymd_and_hms(2026, 3, 16, 10, 0, 0).unwrap();
    for minutes in [i64::MAX, i64::MAX / 2, 1_000_000_000_000] {
        assert_eq!(
            TimeInterval::starting_at(t, minutes).unwrap_err(),
            ValidationError::InvalidDuration(minutes)
        );
    }
}

#[test]
fn whole_minute_lengths_are_detected() {
    let exact = iv("2026-03-16T10:00:00Z", "2026-03-16T10:45:00Z");
    assert!(exact.is_whole_minutes());

    let ragged = iv("2026-03-16T10:00:00Z", "2026-03-16T10:45:59Z");
    assert!(!ragged.is_whole_minutes());
    assert_eq!(ragged.duration_minutes(), 45);

    let sub_second = iv("2026-03-16T10:00:00Z", "2026-03-16T10:45:00.250Z");
    assert!(!sub_second.is_whole_minutes());
}

// ── WallTime ────────────────────────────────────────────────────────────────

#[test]
fn wall_time_parses_strict_hh_mm() {
    assert_eq!(wt("09:05").minutes(), 545);
    assert_eq!(wt("23:59").hour(), 23);
    for bad in ["9:00", "24:00", "12:60", "12-00", "", "ab:cd", "12:000"] {
        assert!(bad.parse::<WallTime>().is_err(), "{bad} should be rejected");
    }
}

#[test]
fn wall_time_serializes_as_string() {
    let json = serde_json::to_string(&wt("07:30")).unwrap();
    assert_eq!(json, r#""07:30""#);
    let back: WallTime = serde_json::from_str(&json).unwrap();
    assert_eq!(back, wt("07:30"));
}

// ── Slot enumeration ────────────────────────────────────────────────────────

#[test]
fn slots_are_half_open_on_the_end() {
    let slots: Vec<String> = enumerate_slots(wt("09:00"), wt("10:00"), 15)
        .map(|s| s.to_string())
        .collect();
    assert_eq!(slots, vec!["09:00", "09:15", "09:30", "09:45"]);
}

#[test]
fn slots_stop_before_end_when_step_does_not_divide() {
    let slots: Vec<WallTime> = enumerate_slots(wt("09:00"), wt("10:00"), 25).collect();
    assert_eq!(slots, vec![wt("09:00"), wt("09:25"), wt("09:50")]);
}

#[test]
fn slot_iterator_is_restartable_and_sized() {
    let iter = enumerate_slots(wt("09:00"), wt("12:00"), 30);
    assert_eq!(iter.len(), 6);
    let first_pass: Vec<WallTime> = iter.clone().collect();
    let second_pass: Vec<WallTime> = iter.collect();
    assert_eq!(first_pass, second_pass);
}

#[test]
fn empty_or_zero_step_ranges_yield_nothing() {
    assert_eq!(enumerate_slots(wt("10:00"), wt("10:00"), 15).count(), 0);
    assert_eq!(enumerate_slots(wt("11:00"), wt("10:00"), 15).count(), 0);
    assert_eq!(enumerate_slots(wt("09:00"), wt("10:00"), 0).count(), 0);
}

#[test]
fn merge_windows_joins_overlapping_and_adjacent() {
    let merged = merge_windows(&[
        (wt("13:00"), wt("15:00")),
        (wt("09:00"), wt("11:00")),
        (wt("11:00"), wt("12:00")),
        (wt("14:00"), wt("16:00")),
    ]);
    assert_eq!(
        merged,
        vec![(wt("09:00"), wt("12:00")), (wt("13:00"), wt("16:00"))]
    );
}

// ── Timezones ───────────────────────────────────────────────────────────────

#[test]
fn unknown_timezone_is_a_validation_error() {
    assert!(matches!(
        parse_timezone("Mars/Olympus_Mons"),
        Err(ValidationError::InvalidTimezone(_))
    ));
}

#[test]
fn to_local_follows_daylight_saving() {
    let ny = parse_timezone("America/New_York").unwrap();
    // US clocks moved forward on 2026-03-08.
    let before = to_local(Utc.with_ymd_and_hms(2026, 3, 2, 14, 0, 0).unwrap(), ny);
    let after = to_local(Utc.with_ymd_and_hms(2026, 3, 16, 14, 0, 0).unwrap(), ny);
    assert_eq!(before.time().to_string(), "09:00:00");
    assert_eq!(after.time().to_string(), "10:00:00");
}

#[test]
fn from_local_shifts_out_of_spring_gap() {
    let ny = parse_timezone("America/New_York").unwrap();
    let date = chrono::NaiveDate::from_ymd_opt(2026, 3, 8).unwrap();
    assert_eq!(from_local(date, wt("02:30"), ny, DstPolicy::Skip), None);
    // 03:00 EDT is the first valid minute after the gap.
    assert_eq!(
        from_local(date, wt("02:30"), ny, DstPolicy::ShiftForward),
        Some(Utc.with_ymd_and_hms(2026, 3, 8, 7, 0, 0).unwrap())
    );
}

#[test]
fn from_local_takes_earliest_of_repeated_hour() {
    let ny = parse_timezone("America/New_York").unwrap();
    let date = chrono::NaiveDate::from_ymd_opt(2026, 11, 1).unwrap();
    assert_eq!(
        from_local(date, wt("01:30"), ny, DstPolicy::default()),
        Some(Utc.with_ymd_and_hms(2026, 11, 1, 5, 30, 0).unwrap())
    );
}

#[test]
fn day_of_week_counts_from_sunday() {
    let sunday = chrono::NaiveDate::from_ymd_opt(2026, 3, 15).unwrap();
    let monday = chrono::NaiveDate::from_ymd_opt(2026, 3, 16).unwrap();
    let saturday = chrono::NaiveDate::from_ymd_opt(2026, 3, 21).unwrap();
    assert_eq!(day_of_week(sunday), 0);
    assert_eq!(day_of_week(monday), 1);
    assert_eq!(day_of_week(saturday), 6);
}
