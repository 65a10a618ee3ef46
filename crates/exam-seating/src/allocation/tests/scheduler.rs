use super::common::*;

use crate::allocation::cohort::{partition, LevelGroups};
use crate::allocation::committer::{CommitOutcome, CommittedSeat};
use crate::allocation::domain::{HallId, Person, PersonId, SeatAssignment, SeatLabel};
use crate::allocation::error::SeatConflict;
use crate::allocation::grid::SeatingGrid;
use crate::allocation::pool::CandidateQueues;
use crate::allocation::repository::RepositoryError;
use crate::allocation::scheduler::{AllocationScheduler, GridReport};

fn accept(person: &Person, seat: SeatLabel) -> Result<CommitOutcome, RepositoryError> {
    Ok(CommitOutcome::Committed(CommittedSeat {
        assignment: SeatAssignment {
            hall_id: HallId(1),
            person_id: person.id,
            seat,
        },
        contact: person.contact().map(str::to_string),
    }))
}

fn seated(report: &GridReport, id: u64) -> Option<&str> {
    report.seat_of(PersonId(id)).map(SeatLabel::as_str)
}

#[test]
fn interleaves_cohorts_by_column() {
    let grid = small_grid();
    let cohorts = partition(&selection(&["D 1", "D 2"]), &LevelGroups::standard());
    let queues = CandidateQueues::from([
        ("D 1", vec![candidate(11, 1), candidate(12, 1), candidate(13, 1)]),
        ("D 2", vec![candidate(21, 2)]),
    ]);

    let walk = AllocationScheduler::new(&grid).run(&cohorts, queues, accept);

    assert!(walk.interrupted.is_none());
    let report = walk.report;
    assert_eq!(seated(&report, 11), Some("A1"));
    assert_eq!(seated(&report, 12), Some("A2"));
    assert_eq!(seated(&report, 21), Some("C1"));
    assert_eq!(seated(&report, 13), None);
    assert_eq!(report.empty_cells, vec![seat("C2")]);
    assert_eq!(report.unseated, 1);
}

#[test]
fn cohort_cursor_carries_across_its_columns() {
    let grid = SeatingGrid::new(["A", "C", "D"], 3).expect("valid grid");
    let cohorts = partition(&selection(&["X 1", "Y 3"]), &LevelGroups::standard());
    let queues = CandidateQueues::from([
        ("X 1", vec![candidate(1, 1), candidate(2, 1), candidate(3, 1)]),
        ("Y 3", vec![candidate(4, 3), candidate(5, 3), candidate(6, 3)]),
    ]);

    let report = AllocationScheduler::new(&grid)
        .run(&cohorts, queues, accept)
        .report;

    // column A: X, Y, X; column D resumes on Y
    assert_eq!(seated(&report, 1), Some("A1"));
    assert_eq!(seated(&report, 4), Some("A2"));
    assert_eq!(seated(&report, 2), Some("A3"));
    assert_eq!(seated(&report, 5), Some("D1"));
    assert_eq!(seated(&report, 3), Some("D2"));
    assert_eq!(seated(&report, 6), Some("D3"));
    assert_eq!(report.seated(), 6);
}

#[test]
fn rejected_commit_leaves_cell_empty_and_advances_cursor() {
    let grid = small_grid();
    let cohorts = partition(&selection(&["X 1", "Y 3"]), &LevelGroups::standard());
    let queues = CandidateQueues::from([
        ("X 1", vec![candidate(1, 1), candidate(2, 1)]),
        ("Y 3", vec![candidate(4, 3)]),
    ]);

    let walk = AllocationScheduler::new(&grid).run(&cohorts, queues, |person, seat| {
        if person.id == PersonId(1) {
            return Ok(CommitOutcome::Rejected(SeatConflict::SeatTaken {
                hall: HallId(1),
                seat,
            }));
        }
        accept(person, seat)
    });

    let report = walk.report;
    assert_eq!(report.rejected.len(), 1);
    assert_eq!(report.rejected[0].person_id, PersonId(1));
    assert_eq!(report.rejected[0].seat, seat("A1"));
    assert!(report.empty_cells.contains(&seat("A1")));
    assert_eq!(seated(&report, 4), Some("A2"));
    assert_eq!(seated(&report, 1), None);
    // candidate 2 is still queued: column C belongs to the empty second cohort
    assert_eq!(report.unseated, 1);
}

#[test]
fn exhausted_department_rotates_to_the_next_one() {
    let grid = small_grid();
    let cohorts = partition(&selection(&["X 1", "Y 3"]), &LevelGroups::standard());
    let queues = CandidateQueues::from([
        ("X 1", Vec::new()),
        ("Y 3", vec![candidate(4, 3), candidate(5, 3)]),
    ]);

    let report = AllocationScheduler::new(&grid)
        .run(&cohorts, queues, accept)
        .report;

    assert_eq!(seated(&report, 4), Some("A1"));
    assert_eq!(seated(&report, 5), Some("A2"));
}

#[test]
fn limit_caps_grid_placements() {
    let grid = small_grid();
    let cohorts = partition(&selection(&["D 1", "D 2"]), &LevelGroups::standard());
    let queues = CandidateQueues::from([
        ("D 1", vec![candidate(11, 1), candidate(12, 1)]),
        ("D 2", vec![candidate(21, 2), candidate(22, 2)]),
    ]);

    let scheduler = AllocationScheduler::new(&grid).with_limit(3);
    assert_eq!(scheduler.limit(), 3);
    let report = scheduler.run(&cohorts, queues, accept).report;

    assert_eq!(report.seated(), 3);
    assert_eq!(seated(&report, 22), None);
    assert_eq!(report.unseated, 1);
}

#[test]
fn limit_never_exceeds_grid_capacity() {
    let grid = small_grid();
    assert_eq!(AllocationScheduler::new(&grid).with_limit(500).limit(), 4);
}

#[test]
fn storage_failure_stops_the_walk_and_keeps_earlier_seats() {
    let grid = small_grid();
    let cohorts = partition(&selection(&["D 1", "D 2"]), &LevelGroups::standard());
    let queues = CandidateQueues::from([
        ("D 1", vec![candidate(11, 1), candidate(12, 1)]),
        ("D 2", vec![candidate(21, 2)]),
    ]);

    let walk = AllocationScheduler::new(&grid).run(&cohorts, queues, |person, seat| {
        if person.id == PersonId(12) {
            return Err(RepositoryError::Unavailable("write timeout".to_string()));
        }
        accept(person, seat)
    });

    assert!(matches!(
        walk.interrupted,
        Some(RepositoryError::Unavailable(_))
    ));
    assert_eq!(walk.report.seated(), 1);
    assert_eq!(seated(&walk.report, 11), Some("A1"));
    assert_eq!(walk.report.unseated, 1);
}
