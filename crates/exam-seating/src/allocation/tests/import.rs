use super::common::*;

use crate::allocation::domain::{HallId, PersonId, SeatLabel};
use crate::allocation::error::{EntityKind, SeatConflict, SeatingError, ValidationError};
use crate::allocation::import::{parse_requests, ImportError};

const HEADER: &str = "id,seatNumber,examHoleId,userId\n";

fn sheet(rows: &[&str]) -> String {
    let mut sheet = HEADER.to_string();
    for row in rows {
        sheet.push_str(row);
        sheet.push('\n');
    }
    sheet
}

#[test]
fn parses_rows_and_normalizes_fields() {
    let csv = sheet(&["1, a1 ,1,11", "2,C2,1.0,21.0"]);

    let requests = parse_requests(csv.as_bytes(), HallId(1)).expect("sheet parses");

    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].seat, seat("A1"));
    assert_eq!(requests[0].person_id, PersonId(11));
    assert_eq!(requests[0].row, 2);
    assert_eq!(requests[1].person_id, PersonId(21));
    assert_eq!(requests[1].hall_id, HallId(1));
}

#[test]
fn rejects_unexpected_headers() {
    let csv = "id,seat,hall,user\n1,A1,1,11\n";

    let error = parse_requests(csv.as_bytes(), HallId(1)).expect_err("headers rejected");

    assert!(matches!(
        error,
        ImportError::Invalid(ValidationError::InvalidHeaders { .. })
    ));
}

#[test]
fn rejects_rows_for_another_hall() {
    let csv = sheet(&["1,A1,1,11", "2,A2,7,12"]);

    let error = parse_requests(csv.as_bytes(), HallId(1)).expect_err("mismatch rejected");

    assert!(matches!(
        error,
        ImportError::Invalid(ValidationError::HallMismatch {
            row: 3,
            expected: HallId(1),
            found: HallId(7),
        })
    ));
}

#[test]
fn rejects_non_numeric_ids() {
    let csv = sheet(&["1,A1,1,eleven"]);

    let error = parse_requests(csv.as_bytes(), HallId(1)).expect_err("bad id rejected");

    assert!(matches!(
        error,
        ImportError::Invalid(ValidationError::InvalidRow {
            field: "userId",
            ..
        })
    ));
}

#[test]
fn sheet_without_records_is_empty() {
    let csv = sheet(&[",,,"]);

    let error = parse_requests(csv.as_bytes(), HallId(1)).expect_err("empty sheet");

    assert!(matches!(
        error,
        ImportError::Invalid(ValidationError::EmptyBatch)
    ));
}

#[test]
fn import_commits_every_row_and_reconciles_capacity() {
    let fixture = fixture(
        &[department(1, "D 1")],
        &[candidate(11, 1), candidate(12, 1), staff(1, 1)],
        5,
    );
    let csv = sheet(&["1,A1,1,11", "2,A2,1,12", "3,B9,1,1"]);

    let summary = fixture
        .service
        .import_sheet(fixture.hall.id, csv.as_bytes())
        .expect("import succeeds");

    assert_eq!(summary.committed.len(), 3);
    assert_eq!(summary.available_slots, 2);
    assert_eq!(fixture.seat_of(12), Some(seat("A2")));
    assert_eq!(fixture.seat_of(1), Some(SeatLabel::stage()));
}

#[test]
fn duplicate_person_in_batch_rejects_the_whole_sheet() {
    let fixture = two_department_fixture();
    let csv = sheet(&["1,A1,1,11", "2,A2,1,11"]);

    let result = fixture.service.import_sheet(fixture.hall.id, csv.as_bytes());

    assert!(matches!(
        result,
        Err(SeatingError::Validation(
            ValidationError::DuplicatePersonInBatch { row: 3, .. }
        ))
    ));
    assert_eq!(fixture.store.assignment_count().unwrap(), 0);
}

#[test]
fn duplicate_seat_in_batch_rejects_the_whole_sheet() {
    let fixture = two_department_fixture();
    let csv = sheet(&["1,A1,1,11", "2,a1,1,12"]);

    let result = fixture.service.import_sheet(fixture.hall.id, csv.as_bytes());

    assert!(matches!(
        result,
        Err(SeatingError::Validation(
            ValidationError::DuplicateSeatInBatch { .. }
        ))
    ));
    assert_eq!(fixture.store.assignment_count().unwrap(), 0);
}

#[test]
fn batch_larger_than_remaining_capacity_is_refused() {
    let fixture = fixture(
        &[department(1, "D 1")],
        &[candidate(11, 1), candidate(12, 1), candidate(13, 1)],
        2,
    );
    let csv = sheet(&["1,A1,1,11", "2,A2,1,12", "3,C1,1,13"]);

    let result = fixture.service.import_sheet(fixture.hall.id, csv.as_bytes());

    assert!(matches!(
        result,
        Err(SeatingError::Conflict(SeatConflict::InsufficientCapacity {
            requested: 3,
            available: 2,
            ..
        }))
    ));
    assert_eq!(fixture.store.assignment_count().unwrap(), 0);
}

#[test]
fn candidate_rows_on_the_stage_reject_the_whole_sheet() {
    let fixture = fixture(
        &[department(1, "D 1")],
        &[staff(1, 1), candidate(11, 1), candidate(12, 1)],
        4,
    );
    let csv = sheet(&["1,A1,1,11", "2,STAGE,1,12"]);

    let result = fixture.service.import_sheet(fixture.hall.id, csv.as_bytes());

    assert!(matches!(
        result,
        Err(SeatingError::Validation(
            ValidationError::StageReservedForStaff { .. }
        ))
    ));
    assert_eq!(fixture.store.assignment_count().unwrap(), 0);
}

#[test]
fn rows_for_seated_people_or_taken_seats_are_refused() {
    let fixture = two_department_fixture();
    let hall = fixture.hall.id;
    fixture.service.add_person(hall, PersonId(11), "A1").unwrap();

    let seated_again = sheet(&["1,C1,1,21", "2,A2,1,11"]);
    assert!(matches!(
        fixture.service.import_sheet(hall, seated_again.as_bytes()),
        Err(SeatingError::Conflict(SeatConflict::AlreadySeated { .. }))
    ));

    let taken = sheet(&["1,A1,1,12"]);
    assert!(matches!(
        fixture.service.import_sheet(hall, taken.as_bytes()),
        Err(SeatingError::Conflict(SeatConflict::SeatTaken { .. }))
    ));

    assert_eq!(fixture.store.assignment_count().unwrap(), 1);
}

#[test]
fn unknown_people_and_malformed_seats_are_refused() {
    let fixture = two_department_fixture();
    let hall = fixture.hall.id;

    assert!(matches!(
        fixture
            .service
            .import_sheet(hall, sheet(&["1,A1,1,404"]).as_bytes()),
        Err(SeatingError::NotFound {
            entity: EntityKind::Person,
            ..
        })
    ));
    assert!(matches!(
        fixture
            .service
            .import_sheet(hall, sheet(&["1,12,1,11"]).as_bytes()),
        Err(SeatingError::Validation(
            ValidationError::MalformedSeatLabel { .. }
        ))
    ));
}
