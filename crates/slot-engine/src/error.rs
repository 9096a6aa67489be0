//! Error types for slot-engine operations.

use chrono::NaiveDate;
use thiserror::Error;

use crate::interval::TimeInterval;
use crate::schedule::StaffId;

#[derive(Error, Debug)]
pub enum EngineError {
    /// Rejected before any work was done: non-positive duration, inverted
    /// hours or interval, or a booking request that does not fit the business.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The proposed interval overlaps a committed booking on the same calendar.
    #[error("Slot no longer available: staff {staff_id} on {date} requested {requested}, already booked {existing}")]
    Conflict {
        staff_id: StaffId,
        date: NaiveDate,
        requested: TimeInterval,
        existing: TimeInterval,
    },

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: u64 },

    /// Failure reported by the datastore collaborator. Never retried here.
    #[error("Datastore error: {0}")]
    Datastore(String),
}

impl EngineError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, EngineError::Conflict { .. })
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
