use serde::Serialize;
use tracing::{debug, error, info};

use super::cohort::Cohorts;
use super::committer::CommitOutcome;
use super::domain::{Person, PersonId, SeatLabel};
use super::grid::SeatingGrid;
use super::pool::CandidateQueues;
use super::repository::RepositoryError;

/// A candidate that now holds a grid seat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeatPlacement {
    pub seat: SeatLabel,
    pub person_id: PersonId,
    pub department: String,
    #[serde(skip)]
    pub contact: Option<String>,
}

/// A candidate whose seat write was refused; the cell stays empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedSeat {
    pub seat: SeatLabel,
    pub person_id: PersonId,
    pub department: String,
    pub reason: String,
}

/// Outcome of one grid walk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GridReport {
    pub placements: Vec<SeatPlacement>,
    pub rejected: Vec<RejectedSeat>,
    pub empty_cells: Vec<SeatLabel>,
    /// Candidates still queued when the walk ended.
    pub unseated: usize,
}

impl GridReport {
    pub fn seated(&self) -> usize {
        self.placements.len()
    }

    pub fn seat_of(&self, person: PersonId) -> Option<&SeatLabel> {
        self.placements
            .iter()
            .find(|placement| placement.person_id == person)
            .map(|placement| &placement.seat)
    }
}

#[derive(Debug)]
pub struct GridWalk {
    pub report: GridReport,
    /// Storage failure that stopped the walk early. Seats placed before it stay committed.
    pub interrupted: Option<RepositoryError>,
}

/// Round-robin walk over the grid, column by column and row by row.
///
/// Each cohort keeps its own department cursor, preserved across the columns it owns, and the
/// cursor advances once per attempted seat whether or not the write succeeded.
pub struct AllocationScheduler<'g> {
    grid: &'g SeatingGrid,
    limit: usize,
}

impl<'g> AllocationScheduler<'g> {
    pub fn new(grid: &'g SeatingGrid) -> Self {
        Self {
            grid,
            limit: grid.capacity(),
        }
    }

    /// Caps the number of grid seats below the grid capacity (e.g. remaining hall slots).
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = self.limit.min(limit);
        self
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn run<F>(&self, cohorts: &Cohorts, mut queues: CandidateQueues, mut commit: F) -> GridWalk
    where
        F: FnMut(&Person, SeatLabel) -> Result<CommitOutcome, RepositoryError>,
    {
        let mut report = GridReport::default();
        let mut cursors = [0usize; 2];

        'columns: for (column_index, column) in self.grid.columns().iter().enumerate() {
            let side = self.grid.cohort_for(column_index);
            let departments = cohorts.side(side);
            if departments.is_empty() {
                debug!(%column, cohort = side.number(), "no departments for column");
                continue;
            }

            let mut cursor = cursors[side.index()];
            debug!(%column, cohort = side.number(), "seating column");

            for row in 1..=self.grid.rows() {
                if report.seated() >= self.limit {
                    info!(limit = self.limit, "grid limit reached");
                    break 'columns;
                }

                let seat = self.grid.label(column_index, row);
                cursor %= departments.len();

                let Some((found_at, person)) = next_candidate(departments, cursor, &mut queues)
                else {
                    debug!(%seat, "no candidates left in cohort");
                    report.empty_cells.push(seat);
                    continue;
                };
                cursor = found_at;
                let department = departments[cursor].clone();

                match commit(&person, seat.clone()) {
                    Ok(CommitOutcome::Committed(committed)) => {
                        report.placements.push(SeatPlacement {
                            seat: committed.assignment.seat,
                            person_id: person.id,
                            department,
                            contact: committed.contact,
                        });
                    }
                    Ok(CommitOutcome::Rejected(conflict)) => {
                        report.rejected.push(RejectedSeat {
                            seat: seat.clone(),
                            person_id: person.id,
                            department,
                            reason: conflict.to_string(),
                        });
                        report.empty_cells.push(seat);
                    }
                    Err(err) => {
                        error!(%seat, person = %person.id, error = %err, "grid walk aborted");
                        report.unseated = queues.remaining();
                        return GridWalk {
                            report,
                            interrupted: Some(err),
                        };
                    }
                }

                cursor = (cursor + 1) % departments.len();
            }

            cursors[side.index()] = cursor;
        }

        report.unseated = queues.remaining();
        GridWalk {
            report,
            interrupted: None,
        }
    }
}

/// Pops from the department at `start`, rotating at most once through the cohort.
fn next_candidate(
    departments: &[String],
    start: usize,
    queues: &mut CandidateQueues,
) -> Option<(usize, Person)> {
    (0..departments.len())
        .map(|offset| (start + offset) % departments.len())
        .find_map(|index| queues.pop(&departments[index]).map(|person| (index, person)))
}
