use chrono::{NaiveDateTime, Utc};

use crate::model::{DayState, Slot};

use super::EngineError;

pub(crate) fn now_utc() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// `[start, end)` must be a non-empty forward interval.
pub(crate) fn validate_slot(slot: &Slot) -> Result<(), EngineError> {
    if slot.start >= slot.end {
        return Err(EngineError::InvalidRange);
    }
    Ok(())
}

/// Scan the date's reservations for an overlap with `slot`.
///
/// `DayState::overlapping` yields in ascending start order, so the first hit
/// is the earliest-starting conflict — that one is reported.
pub(crate) fn check_no_conflict(day: &DayState, slot: &Slot) -> Result<(), EngineError> {
    if let Some(existing) = day.overlapping(slot).next() {
        return Err(EngineError::Conflict {
            name: existing.name.clone(),
            slot: existing.slot,
        });
    }
    Ok(())
}
