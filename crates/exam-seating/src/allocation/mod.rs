//! Exam-hall seat allocation.
//!
//! Selected departments are split into two cohorts by academic level and interleaved across
//! the hall grid column by column, so neighbouring candidates never share a cohort. Staff take
//! the stage seat first. Seat writes go through a committer that re-checks uniqueness and
//! capacity, and the store enforces both unique indexes atomically with the write.

pub mod capacity;
pub mod cohort;
pub mod committer;
pub mod domain;
pub mod error;
pub mod grid;
pub mod import;
pub mod level;
pub mod notify;
pub mod pool;
pub mod repository;
pub mod router;
pub mod scheduler;
pub mod service;
pub mod store;

#[cfg(test)]
mod tests;

pub use capacity::CapacityAccountant;
pub use cohort::{partition, CohortSide, Cohorts, LevelGroups};
pub use committer::{AssignmentCommitter, CommitOutcome, CommittedSeat};
pub use domain::{
    Department, DepartmentId, ExamHall, HallId, HallUpdate, NewHall, Person, PersonId,
    PersonRole, SeatAssignment, SeatLabel, SeatView,
};
pub use error::{EntityKind, SeatConflict, SeatingError, ValidationError};
pub use grid::SeatingGrid;
pub use import::{parse_requests, ImportError, SeatRequest};
pub use level::{resolve_level, UNLEVELED};
pub use notify::{NotificationDispatcher, NotifyError, SeatNotice};
pub use pool::{CandidatePoolBuilder, CandidatePools, CandidateQueues, StaffCandidate};
pub use repository::{RepositoryError, SeatingStore};
pub use router::seating_router;
pub use scheduler::{AllocationScheduler, GridReport, GridWalk, RejectedSeat, SeatPlacement};
pub use service::{
    AllocationPhase, AllocationRequest, AllocationSummary, ImportSummary, SeatAllocationService,
    SeatingPolicy,
};
pub use store::InMemorySeatingStore;
