use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::Value;

use crate::allocation::domain::{
    Department, DepartmentId, ExamHall, HallId, NewHall, Person, PersonId, PersonRole,
    SeatAssignment, SeatLabel,
};
use crate::allocation::grid::SeatingGrid;
use crate::allocation::notify::{NotificationDispatcher, NotifyError, SeatNotice};
use crate::allocation::repository::{RepositoryError, SeatingStore};
use crate::allocation::service::{SeatAllocationService, SeatingPolicy};
use crate::allocation::store::InMemorySeatingStore;

pub(super) fn seat(raw: &str) -> SeatLabel {
    SeatLabel::parse(raw).expect("valid seat label")
}

pub(super) fn person(id: u64, department: u64, role: PersonRole) -> Person {
    Person {
        id: PersonId(id),
        first_name: format!("Person{id}"),
        last_name: "Tester".to_string(),
        email: Some(format!("person{id}@example.edu")),
        role,
        department_id: Some(DepartmentId(department)),
    }
}

pub(super) fn candidate(id: u64, department: u64) -> Person {
    person(id, department, PersonRole::Candidate)
}

pub(super) fn staff(id: u64, department: u64) -> Person {
    person(id, department, PersonRole::Staff)
}

pub(super) fn department(id: u64, name: &str) -> Department {
    Department {
        id: DepartmentId(id),
        name: name.to_string(),
        description: None,
    }
}

pub(super) fn new_hall(capacity: u32) -> NewHall {
    NewHall {
        number: 101,
        name: "Hall 101".to_string(),
        capacity,
        rows: 2,
        columns: 2,
    }
}

/// Columns `A` and `C`, two rows each.
pub(super) fn small_grid() -> SeatingGrid {
    SeatingGrid::new(["A", "C"], 2).expect("valid grid")
}

pub(super) fn small_policy() -> SeatingPolicy {
    SeatingPolicy::new(small_grid(), SeatLabel::stage())
}

pub(super) type MemoryService = SeatAllocationService<InMemorySeatingStore, RecordingNotifier>;

pub(super) struct Fixture {
    pub(super) service: MemoryService,
    pub(super) store: Arc<InMemorySeatingStore>,
    pub(super) notifier: Arc<RecordingNotifier>,
    pub(super) hall: ExamHall,
}

impl Fixture {
    pub(super) fn seat_of(&self, id: u64) -> Option<SeatLabel> {
        self.store
            .assignment_for_person(PersonId(id))
            .expect("store readable")
            .map(|assignment| assignment.seat)
    }

    pub(super) fn refreshed_hall(&self) -> ExamHall {
        self.service.hall(self.hall.id).expect("hall exists")
    }
}

/// Seeds `departments` and `people` and creates one hall with `capacity`.
pub(super) fn fixture(departments: &[Department], people: &[Person], capacity: u32) -> Fixture {
    let store = Arc::new(InMemorySeatingStore::new());
    for entry in departments {
        store.add_department(entry.clone()).expect("department seeds");
    }
    for entry in people {
        store.add_person(entry.clone()).expect("person seeds");
    }
    let notifier = Arc::new(RecordingNotifier::default());
    let service = SeatAllocationService::new(store.clone(), notifier.clone(), small_policy());
    let hall = service.create_hall(new_hall(capacity)).expect("hall created");
    Fixture {
        service,
        store,
        notifier,
        hall,
    }
}

/// `D 1` (level 1) with candidates 11-13 and `D 2` (level 2) with candidate 21, capacity 4.
pub(super) fn two_department_fixture() -> Fixture {
    fixture(
        &[department(1, "D 1"), department(2, "D 2")],
        &[candidate(11, 1), candidate(12, 1), candidate(13, 1), candidate(21, 2)],
        4,
    )
}

pub(super) fn selection(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

#[derive(Default)]
pub(super) struct RecordingNotifier {
    notices: Mutex<Vec<SeatNotice>>,
}

impl RecordingNotifier {
    pub(super) fn notices(&self) -> Vec<SeatNotice> {
        self.notices.lock().expect("notifier mutex poisoned").clone()
    }
}

impl NotificationDispatcher for RecordingNotifier {
    fn dispatch(&self, notice: SeatNotice) -> Result<(), NotifyError> {
        self.notices
            .lock()
            .expect("notifier mutex poisoned")
            .push(notice);
        Ok(())
    }
}

pub(super) struct FailingNotifier;

impl NotificationDispatcher for FailingNotifier {
    fn dispatch(&self, _notice: SeatNotice) -> Result<(), NotifyError> {
        Err(NotifyError::Transport("smtp offline".to_string()))
    }
}

/// Store whose every call fails.
pub(super) struct UnavailableStore;

fn offline<T>() -> Result<T, RepositoryError> {
    Err(RepositoryError::Unavailable("database offline".to_string()))
}

impl SeatingStore for UnavailableStore {
    fn hall(&self, _id: HallId) -> Result<Option<ExamHall>, RepositoryError> {
        offline()
    }

    fn halls(&self) -> Result<Vec<ExamHall>, RepositoryError> {
        offline()
    }

    fn insert_hall(&self, _hall: NewHall) -> Result<ExamHall, RepositoryError> {
        offline()
    }

    fn save_hall(&self, _hall: ExamHall) -> Result<(), RepositoryError> {
        offline()
    }

    fn delete_hall(&self, _id: HallId) -> Result<Vec<SeatAssignment>, RepositoryError> {
        offline()
    }

    fn department_by_name(&self, _name: &str) -> Result<Option<Department>, RepositoryError> {
        offline()
    }

    fn department_containing(
        &self,
        _fragment: &str,
    ) -> Result<Option<Department>, RepositoryError> {
        offline()
    }

    fn person(&self, _id: PersonId) -> Result<Option<Person>, RepositoryError> {
        offline()
    }

    fn persons_in_department(&self, _id: DepartmentId) -> Result<Vec<Person>, RepositoryError> {
        offline()
    }

    fn assignment_for_person(
        &self,
        _person: PersonId,
    ) -> Result<Option<SeatAssignment>, RepositoryError> {
        offline()
    }

    fn assignment_at(
        &self,
        _hall: HallId,
        _seat: &SeatLabel,
    ) -> Result<Option<SeatAssignment>, RepositoryError> {
        offline()
    }

    fn assignments_in_hall(&self, _hall: HallId) -> Result<Vec<SeatAssignment>, RepositoryError> {
        offline()
    }

    fn insert_assignment(
        &self,
        _assignment: SeatAssignment,
    ) -> Result<SeatAssignment, RepositoryError> {
        offline()
    }

    fn reseat(
        &self,
        _hall: HallId,
        _person: PersonId,
        _seat: SeatLabel,
    ) -> Result<SeatAssignment, RepositoryError> {
        offline()
    }

    fn delete_assignment(
        &self,
        _hall: HallId,
        _person: PersonId,
    ) -> Result<Option<SeatAssignment>, RepositoryError> {
        offline()
    }
}

/// In-memory store that starts failing seat writes after `budget` successful inserts.
pub(super) struct FlakyStore {
    pub(super) inner: InMemorySeatingStore,
    budget: AtomicUsize,
}

impl FlakyStore {
    pub(super) fn new(inner: InMemorySeatingStore, budget: usize) -> Self {
        Self {
            inner,
            budget: AtomicUsize::new(budget),
        }
    }
}

impl SeatingStore for FlakyStore {
    fn hall(&self, id: HallId) -> Result<Option<ExamHall>, RepositoryError> {
        self.inner.hall(id)
    }

    fn halls(&self) -> Result<Vec<ExamHall>, RepositoryError> {
        self.inner.halls()
    }

    fn insert_hall(&self, hall: NewHall) -> Result<ExamHall, RepositoryError> {
        self.inner.insert_hall(hall)
    }

    fn save_hall(&self, hall: ExamHall) -> Result<(), RepositoryError> {
        self.inner.save_hall(hall)
    }

    fn delete_hall(&self, id: HallId) -> Result<Vec<SeatAssignment>, RepositoryError> {
        self.inner.delete_hall(id)
    }

    fn department_by_name(&self, name: &str) -> Result<Option<Department>, RepositoryError> {
        self.inner.department_by_name(name)
    }

    fn department_containing(
        &self,
        fragment: &str,
    ) -> Result<Option<Department>, RepositoryError> {
        self.inner.department_containing(fragment)
    }

    fn person(&self, id: PersonId) -> Result<Option<Person>, RepositoryError> {
        self.inner.person(id)
    }

    fn persons_in_department(&self, id: DepartmentId) -> Result<Vec<Person>, RepositoryError> {
        self.inner.persons_in_department(id)
    }

    fn assignment_for_person(
        &self,
        person: PersonId,
    ) -> Result<Option<SeatAssignment>, RepositoryError> {
        self.inner.assignment_for_person(person)
    }

    fn assignment_at(
        &self,
        hall: HallId,
        seat: &SeatLabel,
    ) -> Result<Option<SeatAssignment>, RepositoryError> {
        self.inner.assignment_at(hall, seat)
    }

    fn assignments_in_hall(&self, hall: HallId) -> Result<Vec<SeatAssignment>, RepositoryError> {
        self.inner.assignments_in_hall(hall)
    }

    fn insert_assignment(
        &self,
        assignment: SeatAssignment,
    ) -> Result<SeatAssignment, RepositoryError> {
        let remaining = self.budget.load(Ordering::SeqCst);
        if remaining == 0 {
            return Err(RepositoryError::Unavailable("write timeout".to_string()));
        }
        self.budget.store(remaining - 1, Ordering::SeqCst);
        self.inner.insert_assignment(assignment)
    }

    fn reseat(
        &self,
        hall: HallId,
        person: PersonId,
        seat: SeatLabel,
    ) -> Result<SeatAssignment, RepositoryError> {
        self.inner.reseat(hall, person, seat)
    }

    fn delete_assignment(
        &self,
        hall: HallId,
        person: PersonId,
    ) -> Result<Option<SeatAssignment>, RepositoryError> {
        self.inner.delete_assignment(hall, person)
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
