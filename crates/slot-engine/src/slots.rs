//! Compute bookable windows for a business day.
//!
//! Walks a cursor from opening time in steps of the service duration, emitting
//! every full-length window that does not collide with a booked interval.

use chrono::NaiveTime;
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::interval::{minutes, whole_minute, AvailabilityWindow, BookedInterval, TimeInterval};
use crate::overlap::has_overlap;

/// Generate the ordered availability windows for one day.
///
/// Candidates are `[opening + k*d, opening + (k+1)*d)` for every `k` whose end
/// is at or before `closing`. A trailing remainder shorter than the duration is
/// never offered. Candidates overlapping any entry of `booked` are dropped;
/// `booked` need not be sorted.
///
/// # Errors
/// Returns `EngineError::InvalidInput` if `opening >= closing` or
/// `duration_minutes <= 0`.
pub fn generate_slots(
    opening: NaiveTime,
    closing: NaiveTime,
    duration_minutes: i64,
    booked: &[BookedInterval],
) -> Result<Vec<AvailabilityWindow>> {
    validate_day(opening, closing)?;
    let step = minutes(duration_minutes)?;

    let mut windows = Vec::new();
    let mut cursor = opening;
    let mut candidates = 0usize;

    // `closing - cursor` never goes negative, so `cursor + step` cannot wrap.
    while closing - cursor >= step {
        let end = cursor + step;
        let candidate = TimeInterval::from_ordered(cursor, end);
        candidates += 1;

        if !has_overlap(&candidate, booked.iter().map(BookedInterval::interval)) {
            windows.push(candidate);
        }
        cursor = end;
    }

    debug!(
        opening = %opening,
        closing = %closing,
        duration_minutes,
        booked = booked.len(),
        candidates,
        available = windows.len(),
        "generated slots"
    );

    Ok(windows)
}

/// Number of candidate windows before any booking is subtracted:
/// `floor((closing - opening) / duration)`.
///
/// # Errors
/// Same input validation as [`generate_slots`].
pub fn candidate_count(opening: NaiveTime, closing: NaiveTime, duration_minutes: i64) -> Result<usize> {
    validate_day(opening, closing)?;
    let step = minutes(duration_minutes)?;
    let span = (closing - opening).num_seconds();
    Ok((span / step.num_seconds()) as usize)
}

/// The earliest open window of the day, if any.
///
/// Delegates to [`generate_slots`].
pub fn first_available(
    opening: NaiveTime,
    closing: NaiveTime,
    duration_minutes: i64,
    booked: &[BookedInterval],
) -> Result<Option<AvailabilityWindow>> {
    Ok(generate_slots(opening, closing, duration_minutes, booked)?
        .into_iter()
        .next())
}

fn validate_day(opening: NaiveTime, closing: NaiveTime) -> Result<()> {
    whole_minute(opening)?;
    whole_minute(closing)?;
    if opening >= closing {
        return Err(EngineError::InvalidInput(format!(
            "opening {} must be before closing {}",
            opening.format("%H:%M"),
            closing.format("%H:%M")
        )));
    }
    Ok(())
}
