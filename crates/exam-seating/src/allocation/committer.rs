use tracing::{info, warn};

use super::domain::{ExamHall, Person, SeatAssignment, SeatLabel};
use super::error::{SeatConflict, ValidationError};
use super::repository::{RepositoryError, SeatingStore};

/// Assignment written by a successful commit plus the address to notify.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedSeat {
    pub assignment: SeatAssignment,
    pub contact: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed(CommittedSeat),
    Rejected(SeatConflict),
}

impl CommitOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, CommitOutcome::Committed(_))
    }
}

/// Re-validates and writes a single seat.
///
/// Uniqueness and capacity violations come back as [`CommitOutcome::Rejected`] so a caller
/// walking many seats can skip the cell; only storage failures are returned as errors.
pub struct AssignmentCommitter<'a, S: ?Sized> {
    store: &'a S,
    stage_label: &'a SeatLabel,
}

impl<'a, S> AssignmentCommitter<'a, S>
where
    S: SeatingStore + ?Sized,
{
    pub fn new(store: &'a S, stage_label: &'a SeatLabel) -> Self {
        Self { store, stage_label }
    }

    /// Staff always land on the stage label regardless of the requested seat.
    pub fn effective_seat(&self, person: &Person, requested: SeatLabel) -> SeatLabel {
        if person.is_staff() {
            self.stage_label.clone()
        } else {
            requested
        }
    }

    /// Checks a hand-picked label and resolves the seat the person actually takes.
    ///
    /// The label must be a grid label or the stage label. Staff move to the stage and
    /// everyone else must stay on the grid.
    pub fn seat_for(&self, person: &Person, requested: SeatLabel) -> Result<SeatLabel, ValidationError> {
        let on_stage = &requested == self.stage_label;
        if !on_stage && !requested.is_grid_label() {
            return Err(ValidationError::MalformedSeatLabel {
                raw: requested.to_string(),
            });
        }
        if person.is_staff() {
            return Ok(self.stage_label.clone());
        }
        if on_stage {
            return Err(ValidationError::StageReservedForStaff {
                person: person.id,
                seat: requested,
            });
        }
        Ok(requested)
    }

    pub fn commit(
        &self,
        hall: &ExamHall,
        person: &Person,
        requested: SeatLabel,
    ) -> Result<CommitOutcome, RepositoryError> {
        let seat = self.effective_seat(person, requested);

        if let Some(conflict) = self.precheck(hall, person, &seat)? {
            warn!(hall = %hall.id, person = %person.id, %seat, %conflict, "seat not committed");
            return Ok(CommitOutcome::Rejected(conflict));
        }

        let assignment = SeatAssignment {
            hall_id: hall.id,
            person_id: person.id,
            seat,
        };

        match self.store.insert_assignment(assignment) {
            Ok(assignment) => {
                info!(
                    hall = %hall.id,
                    person = %person.id,
                    name = %person.full_name(),
                    seat = %assignment.seat,
                    "seat assigned"
                );
                Ok(CommitOutcome::Committed(CommittedSeat {
                    assignment,
                    contact: person.contact().map(str::to_string),
                }))
            }
            // the store's unique indexes caught a concurrent writer
            Err(RepositoryError::SeatTaken { hall, seat }) => {
                warn!(%hall, %seat, "seat claimed concurrently");
                Ok(CommitOutcome::Rejected(SeatConflict::SeatTaken { hall, seat }))
            }
            Err(RepositoryError::PersonSeated { person, hall }) => {
                warn!(%hall, %person, "person seated concurrently");
                Ok(CommitOutcome::Rejected(SeatConflict::AlreadySeated {
                    person,
                    hall,
                }))
            }
            Err(other) => Err(other),
        }
    }

    fn precheck(
        &self,
        hall: &ExamHall,
        person: &Person,
        seat: &SeatLabel,
    ) -> Result<Option<SeatConflict>, RepositoryError> {
        if self.store.assignment_at(hall.id, seat)?.is_some() {
            return Ok(Some(SeatConflict::SeatTaken {
                hall: hall.id,
                seat: seat.clone(),
            }));
        }

        if let Some(existing) = self.store.assignment_for_person(person.id)? {
            return Ok(Some(SeatConflict::AlreadySeated {
                person: person.id,
                hall: existing.hall_id,
            }));
        }

        if self.store.count_in_hall(hall.id)? >= hall.capacity {
            return Ok(Some(SeatConflict::HallFull { hall: hall.id }));
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::domain::{NewHall, PersonId, PersonRole};
    use crate::allocation::store::InMemorySeatingStore;

    fn hall(store: &InMemorySeatingStore, capacity: u32) -> ExamHall {
        store
            .insert_hall(NewHall {
                number: 4,
                name: "East".to_string(),
                capacity,
                rows: 2,
                columns: 2,
            })
            .expect("hall inserts")
    }

    fn person(id: u64, role: PersonRole) -> Person {
        Person {
            id: PersonId(id),
            first_name: "Rebin".to_string(),
            last_name: format!("T{id}"),
            email: Some(format!("p{id}@campus.example")),
            role,
            department_id: None,
        }
    }

    fn seat(raw: &str) -> SeatLabel {
        SeatLabel::parse(raw).expect("valid seat")
    }

    #[test]
    fn staff_are_forced_to_the_stage() {
        let store = InMemorySeatingStore::new();
        let target = hall(&store, 4);
        let stage = SeatLabel::stage();
        let committer = AssignmentCommitter::new(&store, &stage);

        let outcome = committer
            .commit(&target, &person(1, PersonRole::Staff), seat("A1"))
            .expect("store available");

        match outcome {
            CommitOutcome::Committed(committed) => {
                assert_eq!(committed.assignment.seat, stage);
                assert_eq!(committed.contact.as_deref(), Some("p1@campus.example"));
            }
            other => panic!("expected commit, got {other:?}"),
        }
        assert!(store.assignment_at(target.id, &seat("A1")).unwrap().is_none());
    }

    #[test]
    fn taken_seats_and_seated_people_are_rejected() {
        let store = InMemorySeatingStore::new();
        let target = hall(&store, 4);
        let stage = SeatLabel::stage();
        let committer = AssignmentCommitter::new(&store, &stage);

        let first = committer
            .commit(&target, &person(1, PersonRole::Candidate), seat("A1"))
            .unwrap();
        assert!(first.is_committed());

        let same_seat = committer
            .commit(&target, &person(2, PersonRole::Candidate), seat("A1"))
            .unwrap();
        assert_eq!(
            same_seat,
            CommitOutcome::Rejected(SeatConflict::SeatTaken {
                hall: target.id,
                seat: seat("A1"),
            })
        );

        let same_person = committer
            .commit(&target, &person(1, PersonRole::Candidate), seat("A2"))
            .unwrap();
        assert_eq!(
            same_person,
            CommitOutcome::Rejected(SeatConflict::AlreadySeated {
                person: PersonId(1),
                hall: target.id,
            })
        );
    }

    #[test]
    fn hand_picked_labels_keep_the_stage_for_staff() {
        let store = InMemorySeatingStore::new();
        let stage = SeatLabel::stage();
        let committer = AssignmentCommitter::new(&store, &stage);
        let student = person(1, PersonRole::Candidate);
        let proctor = person(2, PersonRole::Staff);

        assert_eq!(committer.seat_for(&student, seat("C3")), Ok(seat("C3")));
        assert_eq!(committer.seat_for(&proctor, seat("C3")), Ok(stage.clone()));
        assert_eq!(committer.seat_for(&proctor, stage.clone()), Ok(stage.clone()));
        assert_eq!(
            committer.seat_for(&student, stage.clone()),
            Err(ValidationError::StageReservedForStaff {
                person: PersonId(1),
                seat: stage.clone(),
            })
        );
        for raw in ["#?!", "1A", "A"] {
            assert!(matches!(
                committer.seat_for(&student, seat(raw)),
                Err(ValidationError::MalformedSeatLabel { .. })
            ));
            assert!(matches!(
                committer.seat_for(&proctor, seat(raw)),
                Err(ValidationError::MalformedSeatLabel { .. })
            ));
        }
    }

    #[test]
    fn full_halls_reject_further_seats() {
        let store = InMemorySeatingStore::new();
        let target = hall(&store, 1);
        let stage = SeatLabel::stage();
        let committer = AssignmentCommitter::new(&store, &stage);

        committer
            .commit(&target, &person(1, PersonRole::Candidate), seat("A1"))
            .unwrap();
        let outcome = committer
            .commit(&target, &person(2, PersonRole::Candidate), seat("A2"))
            .unwrap();

        assert_eq!(
            outcome,
            CommitOutcome::Rejected(SeatConflict::HallFull { hall: target.id })
        );
        assert_eq!(store.count_in_hall(target.id).unwrap(), 1);
    }
}
