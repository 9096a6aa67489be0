//! Property-based tests for slot generation and the overlap guard using proptest.
//!
//! These tests verify laws that should hold for *any* valid business day,
//! not just the scenarios in `slots_tests.rs`.

use chrono::{NaiveDate, NaiveTime, Timelike};
use proptest::prelude::*;
use slot_engine::{generate_slots, has_overlap, BookedInterval, BookingStatus, TimeInterval};

// ---------------------------------------------------------------------------
// Strategies — generate valid days, durations and bookings
// ---------------------------------------------------------------------------

/// Opening and closing as minutes of the day with `opening < closing`.
fn arb_hours() -> impl Strategy<Value = (u32, u32)> {
    (0u32..1439).prop_flat_map(|open| (Just(open), (open + 1)..1440))
}

/// Service duration in the 5-240 minute range.
fn arb_duration() -> impl Strategy<Value = i64> {
    5i64..=240
}

fn arb_interval() -> impl Strategy<Value = TimeInterval> {
    (0u32..1439)
        .prop_flat_map(|start| (Just(start), (start + 1)..1440))
        .prop_map(|(start, end)| TimeInterval::new(time(start), time(end)).unwrap())
}

fn arb_bookings() -> impl Strategy<Value = Vec<BookedInterval>> {
    prop::collection::vec(arb_interval().prop_map(booked), 0..12)
}

fn config() -> ProptestConfig {
    ProptestConfig {
        cases: 256,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn time(minute_of_day: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(minute_of_day / 60, minute_of_day % 60, 0).unwrap()
}

fn minute_of_day(t: NaiveTime) -> u32 {
    t.hour() * 60 + t.minute()
}

fn booked(interval: TimeInterval) -> BookedInterval {
    BookedInterval {
        id: 0,
        business_id: 1,
        service_id: 1,
        staff_id: 1,
        date: NaiveDate::from_ymd_opt(2026, 3, 16).unwrap(),
        interval,
        client_name: "prop".to_string(),
        client_phone: None,
        status: BookingStatus::Pending,
    }
}

// ---------------------------------------------------------------------------
// Property 1: With no bookings, floor(span / duration) contiguous windows
//   starting at opening and never extending past closing
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn empty_day_is_fully_tiled(
        (open, close) in arb_hours(),
        dur in arb_duration(),
    ) {
        let slots = generate_slots(time(open), time(close), dur, &[]).unwrap();

        let expected = ((close - open) as i64 / dur) as usize;
        prop_assert_eq!(slots.len(), expected);

        if let Some(first) = slots.first() {
            prop_assert_eq!(first.start(), time(open));
        }
        for slot in &slots {
            prop_assert_eq!(slot.duration_minutes(), dur);
            prop_assert!(slot.end() <= time(close), "{} past closing", slot);
        }
        for pair in slots.windows(2) {
            prop_assert_eq!(pair[0].end(), pair[1].start(), "windows not contiguous");
        }
    }
}

// ---------------------------------------------------------------------------
// Property 2: Generator and guard never disagree
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn generated_windows_pass_the_guard(
        (open, close) in arb_hours(),
        dur in arb_duration(),
        bookings in arb_bookings(),
    ) {
        let slots = generate_slots(time(open), time(close), dur, &bookings).unwrap();
        let existing: Vec<TimeInterval> = bookings.iter().map(|b| b.interval).collect();

        for slot in &slots {
            prop_assert!(
                !has_overlap(slot, &existing),
                "advertised {} collides with a booking",
                slot
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Property 3: Every aligned candidate missing from the output is blocked
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn dropped_candidates_are_blocked(
        (open, close) in arb_hours(),
        dur in arb_duration(),
        bookings in arb_bookings(),
    ) {
        let all = generate_slots(time(open), time(close), dur, &[]).unwrap();
        let free = generate_slots(time(open), time(close), dur, &bookings).unwrap();
        let existing: Vec<TimeInterval> = bookings.iter().map(|b| b.interval).collect();

        for candidate in &all {
            let offered = free.contains(candidate);
            prop_assert_eq!(offered, !has_overlap(candidate, &existing));
        }
    }
}

// ---------------------------------------------------------------------------
// Property 4: Windows stay aligned to opening time
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn windows_are_aligned_to_opening(
        (open, close) in arb_hours(),
        dur in arb_duration(),
        bookings in arb_bookings(),
    ) {
        let slots = generate_slots(time(open), time(close), dur, &bookings).unwrap();
        for slot in &slots {
            let offset = (minute_of_day(slot.start()) - open) as i64;
            prop_assert_eq!(offset % dur, 0, "{} is misaligned", slot);
        }
    }
}

// ---------------------------------------------------------------------------
// Property 5: Overlap is symmetric for single intervals
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn overlap_is_symmetric(a in arb_interval(), b in arb_interval()) {
        prop_assert_eq!(has_overlap(&a, &[b]), has_overlap(&b, &[a]));
    }
}

// ---------------------------------------------------------------------------
// Property 6: Touching intervals never overlap
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn touching_intervals_never_overlap(
        start in 0u32..1438,
        first_len in 1u32..=60,
        second_len in 1u32..=60,
    ) {
        let mid = (start + first_len).min(1438);
        let end = (mid + second_len).min(1439);
        prop_assume!(start < mid && mid < end);

        let first = TimeInterval::new(time(start), time(mid)).unwrap();
        let second = TimeInterval::new(time(mid), time(end)).unwrap();
        prop_assert!(!has_overlap(&first, &[second]));
        prop_assert!(!has_overlap(&second, &[first]));
    }
}

// ---------------------------------------------------------------------------
// Property 7: Non-positive durations are always rejected
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn non_positive_duration_rejected(
        (open, close) in arb_hours(),
        dur in -1000i64..=0,
    ) {
        prop_assert!(generate_slots(time(open), time(close), dur, &[]).is_err());
    }
}
