use std::fmt;

use super::domain::{HallId, PersonId, SeatLabel};
use super::repository::RepositoryError;
use super::service::{AllocationPhase, AllocationSummary};

/// Kind of record a lookup failed to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Hall,
    Department,
    Person,
    Assignment,
}

impl EntityKind {
    pub const fn label(self) -> &'static str {
        match self {
            EntityKind::Hall => "exam hall",
            EntityKind::Department => "department",
            EntityKind::Person => "person",
            EntityKind::Assignment => "seat assignment",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Input rejected before any write is attempted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("no departments selected")]
    EmptySelection,
    #[error("level groups must both be specified and non-empty")]
    EmptyLevelGroup,
    #[error("level {level} appears in both level groups")]
    OverlappingLevelGroups { level: u32 },
    #[error("seat number cannot be empty")]
    EmptySeatLabel,
    #[error("malformed seat number '{raw}'")]
    MalformedSeatLabel { raw: String },
    #[error("seat {seat} is reserved for staff; person {person} is not staff")]
    StageReservedForStaff { person: PersonId, seat: SeatLabel },
    #[error("mismatched exam hall id at row {row}: expected {expected}, found {found}")]
    HallMismatch {
        row: usize,
        expected: HallId,
        found: HallId,
    },
    #[error("invalid {field} at row {row}: '{value}'")]
    InvalidRow {
        row: usize,
        field: &'static str,
        value: String,
    },
    #[error("person {person} appears more than once in the batch (row {row})")]
    DuplicatePersonInBatch { row: usize, person: PersonId },
    #[error("seat {seat} appears more than once in the batch (row {row})")]
    DuplicateSeatInBatch { row: usize, seat: SeatLabel },
    #[error("invalid import headers: expected [{expected}], found [{found}]")]
    InvalidHeaders { expected: String, found: String },
    #[error("no valid records found in the import")]
    EmptyBatch,
    #[error("new capacity {capacity} is less than the {assigned} current assignments")]
    CapacityBelowAssignments { capacity: u32, assigned: u32 },
    #[error("invalid seating grid: {reason}")]
    InvalidGrid { reason: String },
}

/// A seat write that was refused by a uniqueness or capacity rule.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SeatConflict {
    #[error("seat {seat} is already taken in hall {hall}")]
    SeatTaken { hall: HallId, seat: SeatLabel },
    #[error("person {person} is already seated in hall {hall}")]
    AlreadySeated { person: PersonId, hall: HallId },
    #[error("no available slots in hall {hall}")]
    HallFull { hall: HallId },
    #[error("batch needs {requested} seats but hall {hall} has {available} available")]
    InsufficientCapacity {
        hall: HallId,
        requested: usize,
        available: u32,
    },
}

/// Error raised by the seat allocation service.
#[derive(Debug, thiserror::Error)]
pub enum SeatingError {
    #[error("{entity} not found: {key}")]
    NotFound { entity: EntityKind, key: String },
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Conflict(#[from] SeatConflict),
    #[error("storage failure: {0}")]
    Internal(RepositoryError),
    #[error("allocation interrupted while {phase}: {source}")]
    Interrupted {
        phase: AllocationPhase,
        summary: Box<AllocationSummary>,
        source: RepositoryError,
    },
}

impl SeatingError {
    pub(crate) fn not_found(entity: EntityKind, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }
}

impl From<RepositoryError> for SeatingError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::SeatTaken { hall, seat } => {
                Self::Conflict(SeatConflict::SeatTaken { hall, seat })
            }
            RepositoryError::PersonSeated { person, hall } => {
                Self::Conflict(SeatConflict::AlreadySeated { person, hall })
            }
            other => Self::Internal(other),
        }
    }
}
