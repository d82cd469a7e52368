//! SM-2 spaced repetition scheduler.
//!
//! Pure function from (current state, quality grade) to the next state and
//! due date. Callable from any thread; all I/O lives in the device crate.

use chrono::{DateTime, Duration, Utc};

use crate::types::{Quality, Sm2State};

/// Minimum ease factor. SM-2 never lets ease drop below this.
pub const MINIMUM_EASE: f64 = 1.3;

/// Upper bound on the review interval, about a century. The ladder grows
/// geometrically, so without a cap a long run of perfect grades overflows
/// both the day count and the calendar.
pub const MAXIMUM_INTERVAL_DAYS: u32 = 36_500;

/// Result of advancing the repetition state after one review.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sm2Outcome {
    pub state: Sm2State,
    pub next_due_at: DateTime<Utc>,
}

/// Advance the repetition state by one graded review.
///
/// A failing grade (< 3) resets the repetition streak and schedules the item
/// for tomorrow without touching the ease factor. A passing grade grows the
/// interval on the 1 / 6 / interval * ease ladder and nudges the ease factor
/// by the grade. The interval stays within 1..=[`MAXIMUM_INTERVAL_DAYS`] and
/// the due date saturates at the calendar limit, so the function is total
/// over every valid state.
pub fn advance(state: &Sm2State, quality: Quality, now: DateTime<Utc>) -> Sm2Outcome {
    let mut repetition = state.repetition;
    let mut interval_days = state.interval_days;
    let mut ease_factor = state.ease_factor;

    if quality.is_pass() {
        repetition += 1;
        interval_days = match repetition {
            1 => 1,
            2 => 6,
            // Round half away from zero, clamped to the valid range.
            _ => (interval_days as f64 * ease_factor)
                .round()
                .clamp(1.0, MAXIMUM_INTERVAL_DAYS as f64) as u32,
        };
        ease_factor =
            (ease_factor + 0.1 - (5.0 - quality.value() as f64) * 0.08).max(MINIMUM_EASE);
    } else {
        repetition = 0;
        interval_days = 1;
    }

    Sm2Outcome {
        state: Sm2State {
            repetition,
            interval_days,
            ease_factor,
        },
        next_due_at: now
            .checked_add_signed(Duration::days(interval_days as i64))
            .unwrap_or(DateTime::<Utc>::MAX_UTC),
    }
}
