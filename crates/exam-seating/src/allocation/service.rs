use std::collections::HashSet;
use std::fmt;
use std::io::Read;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use super::capacity::CapacityAccountant;
use super::cohort::{partition, LevelGroups};
use super::committer::{AssignmentCommitter, CommitOutcome};
use super::domain::{
    ExamHall, HallId, HallUpdate, NewHall, Person, PersonId, SeatAssignment, SeatLabel, SeatView,
};
use super::error::{EntityKind, SeatConflict, SeatingError, ValidationError};
use super::grid::SeatingGrid;
use super::import::{parse_requests, SeatRequest};
use super::notify::{NotificationDispatcher, SeatNotice};
use super::pool::{CandidatePoolBuilder, StaffCandidate};
use super::repository::{RepositoryError, SeatingStore};
use super::scheduler::{AllocationScheduler, GridReport, RejectedSeat, SeatPlacement};

/// Grid layout and stage label applied to every allocation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatingPolicy {
    pub grid: SeatingGrid,
    pub stage_label: SeatLabel,
}

impl SeatingPolicy {
    pub fn new(grid: SeatingGrid, stage_label: SeatLabel) -> Self {
        Self { grid, stage_label }
    }
}

impl Default for SeatingPolicy {
    fn default() -> Self {
        Self::new(SeatingGrid::reference(), SeatLabel::stage())
    }
}

/// Allocation trigger: a hall, the selected departments and optional level groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationRequest {
    pub hall_id: HallId,
    pub departments: Vec<String>,
    #[serde(default)]
    pub first_level_group: Option<Vec<u32>>,
    #[serde(default)]
    pub second_level_group: Option<Vec<u32>>,
}

impl AllocationRequest {
    pub fn new(hall_id: HallId, departments: Vec<String>) -> Self {
        Self {
            hall_id,
            departments,
            first_level_group: None,
            second_level_group: None,
        }
    }

    pub fn with_level_groups(mut self, first: Vec<u32>, second: Vec<u32>) -> Self {
        self.first_level_group = Some(first);
        self.second_level_group = Some(second);
        self
    }
}

/// Steps of one allocation run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationPhase {
    Validating,
    BuildingPools,
    SeatingStaff,
    SeatingGrid,
    UpdatingCapacity,
    Notifying,
    Done,
}

impl AllocationPhase {
    pub const fn label(self) -> &'static str {
        match self {
            AllocationPhase::Validating => "validating",
            AllocationPhase::BuildingPools => "building pools",
            AllocationPhase::SeatingStaff => "seating staff",
            AllocationPhase::SeatingGrid => "seating grid",
            AllocationPhase::UpdatingCapacity => "updating capacity",
            AllocationPhase::Notifying => "notifying",
            AllocationPhase::Done => "done",
        }
    }
}

impl fmt::Display for AllocationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What an allocation run changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllocationSummary {
    pub hall_id: HallId,
    pub staff: Vec<SeatPlacement>,
    pub staff_rejected: Vec<RejectedSeat>,
    pub grid: GridReport,
    pub excluded_departments: Vec<String>,
    /// Hall slots after the capacity step; absent when that step failed.
    pub available_slots: Option<u32>,
    pub notified: usize,
}

impl AllocationSummary {
    fn new(hall_id: HallId) -> Self {
        Self {
            hall_id,
            staff: Vec::new(),
            staff_rejected: Vec::new(),
            grid: GridReport::default(),
            excluded_departments: Vec::new(),
            available_slots: None,
            notified: 0,
        }
    }

    pub fn seated_total(&self) -> usize {
        self.staff.len() + self.grid.seated()
    }

    /// Every seat written by the run, stage first.
    pub fn placements(&self) -> impl Iterator<Item = &SeatPlacement> {
        self.staff.iter().chain(self.grid.placements.iter())
    }
}

/// Outcome of a bulk import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub hall_id: HallId,
    pub committed: Vec<SeatAssignment>,
    pub available_slots: u32,
}

/// Service composing the store, the seating policy and the notification hook.
pub struct SeatAllocationService<S, N> {
    store: Arc<S>,
    notifier: Arc<N>,
    policy: SeatingPolicy,
}

impl<S, N> SeatAllocationService<S, N>
where
    S: SeatingStore + 'static,
    N: NotificationDispatcher + 'static,
{
    pub fn new(store: Arc<S>, notifier: Arc<N>, policy: SeatingPolicy) -> Self {
        Self {
            store,
            notifier,
            policy,
        }
    }

    pub fn policy(&self) -> &SeatingPolicy {
        &self.policy
    }

    /// Seats unseated staff and candidates of the selected departments into a hall.
    ///
    /// Seat conflicts are skipped cell by cell. A storage failure after pooling stops the run
    /// with [`SeatingError::Interrupted`], which carries the seats already written; the
    /// capacity ledger is still refreshed for them.
    pub fn allocate(&self, request: AllocationRequest) -> Result<AllocationSummary, SeatingError> {
        let (hall, selection, groups) = self.validate_allocation(request)?;
        info!(hall = %hall.id, name = %hall.name, departments = ?selection, "starting seat allocation");

        let store = self.store.as_ref();
        let pools = CandidatePoolBuilder::new(store).build(&selection)?;
        let cohorts = partition(&selection, &groups);

        let mut summary = AllocationSummary::new(hall.id);
        summary.excluded_departments = cohorts.excluded().to_vec();
        let committer = AssignmentCommitter::new(store, &self.policy.stage_label);

        if let Err(source) = self.seat_staff(&committer, &hall, pools.staff, &mut summary) {
            return Err(self.interrupted(AllocationPhase::SeatingStaff, summary, source));
        }

        let taken = match store.count_in_hall(hall.id) {
            Ok(taken) => taken,
            Err(source) => {
                return Err(self.interrupted(AllocationPhase::SeatingGrid, summary, source))
            }
        };
        let remaining = hall.capacity.saturating_sub(taken) as usize;
        let scheduler = AllocationScheduler::new(&self.policy.grid).with_limit(remaining);

        let walk = scheduler.run(&cohorts, pools.queues, |person, seat| {
            committer.commit(&hall, person, seat)
        });
        summary.grid = walk.report;
        if let Some(source) = walk.interrupted {
            return Err(self.interrupted(AllocationPhase::SeatingGrid, summary, source));
        }

        summary.available_slots = self.update_capacity(hall.id);
        summary.notified = self.notify(&hall, &summary);

        info!(
            hall = %hall.id,
            staff = summary.staff.len(),
            seated = summary.grid.seated(),
            rejected = summary.grid.rejected.len(),
            unseated = summary.grid.unseated,
            phase = AllocationPhase::Done.label(),
            "completed seat allocation"
        );
        Ok(summary)
    }

    fn validate_allocation(
        &self,
        request: AllocationRequest,
    ) -> Result<(ExamHall, Vec<String>, LevelGroups), SeatingError> {
        let selection: Vec<String> = request
            .departments
            .into_iter()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();
        if selection.is_empty() {
            return Err(ValidationError::EmptySelection.into());
        }

        let groups =
            LevelGroups::from_request(request.first_level_group, request.second_level_group)?;
        let hall = self.hall(request.hall_id)?;
        Ok((hall, selection, groups))
    }

    fn seat_staff(
        &self,
        committer: &AssignmentCommitter<'_, S>,
        hall: &ExamHall,
        staff: Vec<StaffCandidate>,
        summary: &mut AllocationSummary,
    ) -> Result<(), RepositoryError> {
        for StaffCandidate { person, department } in staff {
            let stage = self.policy.stage_label.clone();
            match committer.commit(hall, &person, stage.clone())? {
                CommitOutcome::Committed(committed) => summary.staff.push(SeatPlacement {
                    seat: committed.assignment.seat,
                    person_id: person.id,
                    department,
                    contact: committed.contact,
                }),
                CommitOutcome::Rejected(conflict) => summary.staff_rejected.push(RejectedSeat {
                    seat: stage,
                    person_id: person.id,
                    department,
                    reason: conflict.to_string(),
                }),
            }
        }

        info!(
            hall = %hall.id,
            seated = summary.staff.len(),
            rejected = summary.staff_rejected.len(),
            "seated staff on stage"
        );
        Ok(())
    }

    fn interrupted(
        &self,
        phase: AllocationPhase,
        mut summary: AllocationSummary,
        source: RepositoryError,
    ) -> SeatingError {
        error!(hall = %summary.hall_id, phase = phase.label(), error = %source, "allocation interrupted");
        summary.available_slots = self.update_capacity(summary.hall_id);
        SeatingError::Interrupted {
            phase,
            summary: Box::new(summary),
            source,
        }
    }

    fn update_capacity(&self, hall_id: HallId) -> Option<u32> {
        match CapacityAccountant::new(self.store.as_ref()).reconcile(hall_id) {
            Ok(hall) => Some(hall.available_slots),
            Err(err) => {
                error!(hall = %hall_id, error = %err, "failed to update available slots");
                None
            }
        }
    }

    /// Hands the seat map to the dispatcher; delivery failures are only logged.
    fn notify(&self, hall: &ExamHall, summary: &AllocationSummary) -> usize {
        let mut notice = SeatNotice::new(hall);
        for placement in summary.placements() {
            if let Some(contact) = placement.contact.as_deref() {
                notice.add(contact, placement.seat.clone());
            }
        }

        if notice.is_empty() {
            info!(hall = %hall.id, "no contacts to notify");
            return 0;
        }

        let recipients = notice.recipients.len();
        match self.notifier.dispatch(notice) {
            Ok(()) => {
                info!(hall = %hall.id, recipients, "dispatched seat notifications");
                recipients
            }
            Err(err) => {
                error!(hall = %hall.id, error = %err, "failed to dispatch seat notifications");
                0
            }
        }
    }

    pub fn create_hall(&self, hall: NewHall) -> Result<ExamHall, SeatingError> {
        let created = self.store.insert_hall(hall)?;
        info!(hall = %created.id, name = %created.name, capacity = created.capacity, "created exam hall");
        Ok(created)
    }

    pub fn hall(&self, id: HallId) -> Result<ExamHall, SeatingError> {
        self.store
            .hall(id)?
            .ok_or_else(|| SeatingError::not_found(EntityKind::Hall, id))
    }

    pub fn halls(&self) -> Result<Vec<ExamHall>, SeatingError> {
        Ok(self.store.halls()?)
    }

    /// Halls with at least one free slot.
    pub fn available_halls(&self) -> Result<Vec<ExamHall>, SeatingError> {
        let mut halls = self.store.halls()?;
        halls.retain(|hall| !hall.is_full());
        Ok(halls)
    }

    /// Applies a partial update; a capacity change re-derives the available slots.
    pub fn update_hall(&self, id: HallId, update: HallUpdate) -> Result<ExamHall, SeatingError> {
        let mut hall = self.hall(id)?;

        if let Some(number) = update.number {
            hall.number = number;
        }
        if let Some(name) = update.name {
            hall.name = name;
        }
        if let Some(rows) = update.rows {
            hall.rows = rows;
        }
        if let Some(columns) = update.columns {
            hall.columns = columns;
        }
        if let Some(capacity) = update.capacity {
            let assigned = self.store.count_in_hall(id)?;
            if capacity < assigned {
                return Err(ValidationError::CapacityBelowAssignments { capacity, assigned }.into());
            }
            hall.capacity = capacity;
            hall.available_slots = capacity - assigned;
        }
        hall.updated_at = chrono::Utc::now();

        self.store.save_hall(hall.clone())?;
        Ok(hall)
    }

    /// Deletes a hall and every assignment in it.
    pub fn delete_hall(&self, id: HallId) -> Result<Vec<SeatAssignment>, SeatingError> {
        match self.store.delete_hall(id) {
            Ok(removed) => {
                info!(hall = %id, released = removed.len(), "deleted exam hall");
                Ok(removed)
            }
            Err(RepositoryError::NotFound) => Err(SeatingError::not_found(EntityKind::Hall, id)),
            Err(other) => Err(other.into()),
        }
    }

    fn person(&self, id: PersonId) -> Result<Person, SeatingError> {
        self.store
            .person(id)?
            .ok_or_else(|| SeatingError::not_found(EntityKind::Person, id))
    }

    /// Seats one person at a given label, outside of any allocation run.
    pub fn add_person(
        &self,
        hall_id: HallId,
        person_id: PersonId,
        seat: &str,
    ) -> Result<SeatAssignment, SeatingError> {
        let hall = self.hall(hall_id)?;
        let person = self.person(person_id)?;
        let committer = AssignmentCommitter::new(self.store.as_ref(), &self.policy.stage_label);
        let seat = committer.seat_for(&person, SeatLabel::parse(seat)?)?;

        if hall.is_full() {
            return Err(SeatConflict::HallFull { hall: hall.id }.into());
        }

        let assignment = match committer.commit(&hall, &person, seat)? {
            CommitOutcome::Committed(committed) => committed.assignment,
            CommitOutcome::Rejected(conflict) => return Err(conflict.into()),
        };

        self.update_capacity(hall.id);
        Ok(assignment)
    }

    /// Releases a person's seat in a hall.
    pub fn remove_person(
        &self,
        hall_id: HallId,
        person_id: PersonId,
    ) -> Result<SeatAssignment, SeatingError> {
        let hall = self.hall(hall_id)?;
        self.person(person_id)?;

        let removed = self
            .store
            .delete_assignment(hall.id, person_id)?
            .ok_or_else(|| {
                SeatingError::not_found(EntityKind::Assignment, format!("{person_id} in hall {hall_id}"))
            })?;

        info!(hall = %hall.id, person = %person_id, seat = %removed.seat, "released seat");
        self.update_capacity(hall.id);
        Ok(removed)
    }

    /// Moves a seated person to another label in the same hall. Staff stay on the stage.
    pub fn move_person(
        &self,
        hall_id: HallId,
        person_id: PersonId,
        seat: &str,
    ) -> Result<SeatAssignment, SeatingError> {
        let hall = self.hall(hall_id)?;
        let person = self.person(person_id)?;
        let committer = AssignmentCommitter::new(self.store.as_ref(), &self.policy.stage_label);
        let seat = committer.seat_for(&person, SeatLabel::parse(seat)?)?;

        match self.store.reseat(hall.id, person.id, seat) {
            Ok(assignment) => {
                info!(hall = %hall.id, person = %person.id, seat = %assignment.seat, "moved seat");
                Ok(assignment)
            }
            Err(RepositoryError::NotFound) => Err(SeatingError::not_found(
                EntityKind::Assignment,
                format!("{person_id} in hall {hall_id}"),
            )),
            Err(other) => Err(other.into()),
        }
    }

    /// People seated in a hall, ordered by seat label.
    pub fn roster(&self, hall_id: HallId) -> Result<Vec<SeatView>, SeatingError> {
        let hall = self.hall(hall_id)?;
        let mut assignments = self.store.assignments_in_hall(hall.id)?;
        assignments.sort_by(|left, right| left.seat.seat_order().cmp(&right.seat.seat_order()));

        let mut roster = Vec::new();
        for assignment in assignments {
            match self.store.person(assignment.person_id)? {
                Some(person) => roster.push(SeatView::new(&person, assignment.seat)),
                None => warn!(hall = %hall.id, person = %assignment.person_id, "assignment references a missing person"),
            }
        }
        Ok(roster)
    }

    /// The person's seat in this hall; `NotFound` when they are not seated here.
    pub fn seat_in_hall(&self, hall_id: HallId, person_id: PersonId) -> Result<SeatView, SeatingError> {
        let hall = self.hall(hall_id)?;
        let person = self.person(person_id)?;
        self.store
            .assignment_for_person(person.id)?
            .filter(|assignment| assignment.hall_id == hall.id)
            .map(|assignment| SeatView::new(&person, assignment.seat))
            .ok_or_else(|| {
                SeatingError::not_found(EntityKind::Assignment, format!("{person_id} in hall {hall_id}"))
            })
    }

    pub fn halls_for_person(&self, person_id: PersonId) -> Result<Vec<ExamHall>, SeatingError> {
        self.person(person_id)?;
        let Some(assignment) = self.store.assignment_for_person(person_id)? else {
            return Ok(Vec::new());
        };
        Ok(self.store.hall(assignment.hall_id)?.into_iter().collect())
    }

    /// Parses a sheet and commits it as one batch.
    pub fn import_sheet<R: Read>(
        &self,
        hall_id: HallId,
        reader: R,
    ) -> Result<ImportSummary, SeatingError> {
        let requests = parse_requests(reader, hall_id)?;
        self.import_batch(hall_id, requests)
    }

    /// Commits pre-parsed requests. Every row is validated before the first write.
    pub fn import_batch(
        &self,
        hall_id: HallId,
        requests: Vec<SeatRequest>,
    ) -> Result<ImportSummary, SeatingError> {
        let hall = self.hall(hall_id)?;
        let committer = AssignmentCommitter::new(self.store.as_ref(), &self.policy.stage_label);
        let planned = self.validate_batch(&hall, &committer, requests)?;

        let mut committed = Vec::with_capacity(planned.len());
        for (row, person, seat) in planned {
            info!(row, hall = %hall.id, person = %person.id, %seat, "importing seat");
            match committer.commit(&hall, &person, seat) {
                Ok(CommitOutcome::Committed(seat)) => committed.push(seat.assignment),
                Ok(CommitOutcome::Rejected(conflict)) => {
                    error!(row, error = %conflict, kept = committed.len(), "import stopped by a concurrent write");
                    self.update_capacity(hall.id);
                    return Err(conflict.into());
                }
                Err(source) => {
                    error!(row, error = %source, kept = committed.len(), "import stopped by a storage failure");
                    self.update_capacity(hall.id);
                    return Err(SeatingError::Internal(source));
                }
            }
        }

        let available_slots = self
            .update_capacity(hall.id)
            .unwrap_or_else(|| hall.available_slots.saturating_sub(committed.len() as u32));
        info!(hall = %hall.id, imported = committed.len(), "completed seat import");
        Ok(ImportSummary {
            hall_id: hall.id,
            committed,
            available_slots,
        })
    }

    fn validate_batch(
        &self,
        hall: &ExamHall,
        committer: &AssignmentCommitter<'_, S>,
        requests: Vec<SeatRequest>,
    ) -> Result<Vec<(usize, Person, SeatLabel)>, SeatingError> {
        if requests.is_empty() {
            return Err(ValidationError::EmptyBatch.into());
        }

        let mut persons = HashSet::new();
        let mut seats = HashSet::new();
        let mut planned = Vec::with_capacity(requests.len());

        for request in requests {
            let row = request.row;
            if request.hall_id != hall.id {
                return Err(ValidationError::HallMismatch {
                    row,
                    expected: hall.id,
                    found: request.hall_id,
                }
                .into());
            }
            let person = self.person(request.person_id)?;
            let seat = committer.seat_for(&person, request.seat)?;

            if !persons.insert(person.id) {
                return Err(ValidationError::DuplicatePersonInBatch {
                    row,
                    person: person.id,
                }
                .into());
            }
            if !seats.insert(seat.clone()) {
                return Err(ValidationError::DuplicateSeatInBatch { row, seat }.into());
            }
            if let Some(existing) = self.store.assignment_for_person(person.id)? {
                return Err(SeatConflict::AlreadySeated {
                    person: person.id,
                    hall: existing.hall_id,
                }
                .into());
            }
            if self.store.assignment_at(hall.id, &seat)?.is_some() {
                return Err(SeatConflict::SeatTaken { hall: hall.id, seat }.into());
            }

            planned.push((row, person, seat));
        }

        let taken = self.store.count_in_hall(hall.id)?;
        let available = hall.capacity.saturating_sub(taken);
        if planned.len() > available as usize {
            return Err(SeatConflict::InsufficientCapacity {
                hall: hall.id,
                requested: planned.len(),
                available,
            }
            .into());
        }

        Ok(planned)
    }
}
