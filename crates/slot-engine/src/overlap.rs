//! The overlap guard: decides whether a proposed interval collides with existing ones.
//!
//! Two intervals overlap when `a.start < b.end && b.start < a.end`.
//! Adjacent intervals (where one ends exactly when another starts) are NOT overlaps.
//! The slot generator and the booking commit path both go through [`has_overlap`].

use crate::interval::{BookedInterval, TimeInterval};

/// Returns true if `candidate` overlaps any interval in `existing`.
///
/// Accepts anything that yields `&TimeInterval`: a slice, a `Vec`, or an
/// iterator such as `booked.iter().map(BookedInterval::interval)`.
pub fn has_overlap<'a, I>(candidate: &TimeInterval, existing: I) -> bool
where
    I: IntoIterator<Item = &'a TimeInterval>,
{
    existing.into_iter().any(|other| candidate.overlaps(other))
}

/// Find the first booking that blocks `candidate`, if any.
pub fn find_conflict<'a>(
    candidate: &TimeInterval,
    booked: &'a [BookedInterval],
) -> Option<&'a BookedInterval> {
    booked
        .iter()
        .find(|b| has_overlap(candidate, [b.interval()]))
}

/// Minutes shared by `a` and `b`; zero when they do not overlap.
///
/// The overlap is `min(a.end, b.end) - max(a.start, b.start)`.
pub fn overlap_minutes(a: &TimeInterval, b: &TimeInterval) -> i64 {
    if !a.overlaps(b) {
        return 0;
    }
    let start = a.start().max(b.start());
    let end = a.end().min(b.end());
    (end - start).num_minutes()
}
