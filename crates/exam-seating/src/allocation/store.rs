use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;

use super::domain::{
    Department, DepartmentId, ExamHall, HallId, NewHall, Person, PersonId, SeatAssignment,
    SeatLabel,
};
use super::repository::{RepositoryError, SeatingStore};

/// Process-local store backing the API service, demos and tests.
///
/// All tables live behind one mutex so the `(hall, seat)` and `person` unique indexes are
/// checked and updated in the same critical section as the write.
#[derive(Debug, Default)]
pub struct InMemorySeatingStore {
    state: Mutex<StoreState>,
}

#[derive(Debug, Default)]
struct StoreState {
    next_hall_id: u64,
    halls: BTreeMap<HallId, ExamHall>,
    departments: BTreeMap<DepartmentId, Department>,
    persons: BTreeMap<PersonId, Person>,
    // seat assignments, keyed by person (global unique index)
    seated: HashMap<PersonId, SeatAssignment>,
    // (hall, seat) unique index
    seats: HashMap<(HallId, SeatLabel), PersonId>,
}

impl InMemorySeatingStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreState>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("store mutex poisoned".to_string()))
    }

    /// Seeds a department. Department CRUD lives outside the allocation engine.
    pub fn add_department(&self, department: Department) -> Result<(), RepositoryError> {
        self.lock()?.departments.insert(department.id, department);
        Ok(())
    }

    /// Seeds a person record.
    pub fn add_person(&self, person: Person) -> Result<(), RepositoryError> {
        self.lock()?.persons.insert(person.id, person);
        Ok(())
    }

    pub fn assignment_count(&self) -> Result<usize, RepositoryError> {
        Ok(self.lock()?.seated.len())
    }
}

impl SeatingStore for InMemorySeatingStore {
    fn hall(&self, id: HallId) -> Result<Option<ExamHall>, RepositoryError> {
        Ok(self.lock()?.halls.get(&id).cloned())
    }

    fn halls(&self) -> Result<Vec<ExamHall>, RepositoryError> {
        Ok(self.lock()?.halls.values().cloned().collect())
    }

    fn insert_hall(&self, hall: NewHall) -> Result<ExamHall, RepositoryError> {
        let mut state = self.lock()?;
        state.next_hall_id += 1;
        let now = Utc::now();
        let record = ExamHall {
            id: HallId(state.next_hall_id),
            number: hall.number,
            name: hall.name,
            capacity: hall.capacity,
            available_slots: hall.capacity,
            rows: hall.rows,
            columns: hall.columns,
            created_at: now,
            updated_at: now,
        };
        state.halls.insert(record.id, record.clone());
        Ok(record)
    }

    fn save_hall(&self, hall: ExamHall) -> Result<(), RepositoryError> {
        let mut state = self.lock()?;
        match state.halls.get_mut(&hall.id) {
            Some(existing) => {
                *existing = hall;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn delete_hall(&self, id: HallId) -> Result<Vec<SeatAssignment>, RepositoryError> {
        let mut state = self.lock()?;
        if state.halls.remove(&id).is_none() {
            return Err(RepositoryError::NotFound);
        }

        let removed: Vec<SeatAssignment> = state
            .seated
            .values()
            .filter(|assignment| assignment.hall_id == id)
            .cloned()
            .collect();
        for assignment in &removed {
            state.seated.remove(&assignment.person_id);
            state.seats.remove(&(id, assignment.seat.clone()));
        }
        Ok(removed)
    }

    fn department_by_name(&self, name: &str) -> Result<Option<Department>, RepositoryError> {
        Ok(self
            .lock()?
            .departments
            .values()
            .find(|department| department.name == name)
            .cloned())
    }

    fn department_containing(
        &self,
        fragment: &str,
    ) -> Result<Option<Department>, RepositoryError> {
        let needle = fragment.to_lowercase();
        Ok(self
            .lock()?
            .departments
            .values()
            .find(|department| department.name.to_lowercase().contains(&needle))
            .cloned())
    }

    fn person(&self, id: PersonId) -> Result<Option<Person>, RepositoryError> {
        Ok(self.lock()?.persons.get(&id).cloned())
    }

    fn persons_in_department(&self, id: DepartmentId) -> Result<Vec<Person>, RepositoryError> {
        Ok(self
            .lock()?
            .persons
            .values()
            .filter(|person| person.department_id == Some(id))
            .cloned()
            .collect())
    }

    fn assignment_for_person(
        &self,
        person: PersonId,
    ) -> Result<Option<SeatAssignment>, RepositoryError> {
        Ok(self.lock()?.seated.get(&person).cloned())
    }

    fn assignment_at(
        &self,
        hall: HallId,
        seat: &SeatLabel,
    ) -> Result<Option<SeatAssignment>, RepositoryError> {
        let state = self.lock()?;
        Ok(state
            .seats
            .get(&(hall, seat.clone()))
            .and_then(|person| state.seated.get(person))
            .cloned())
    }

    fn assignments_in_hall(&self, hall: HallId) -> Result<Vec<SeatAssignment>, RepositoryError> {
        let state = self.lock()?;
        let mut assignments: Vec<SeatAssignment> = state
            .seated
            .values()
            .filter(|assignment| assignment.hall_id == hall)
            .cloned()
            .collect();
        assignments.sort_by(|left, right| left.seat.seat_order().cmp(&right.seat.seat_order()));
        Ok(assignments)
    }

    fn insert_assignment(
        &self,
        assignment: SeatAssignment,
    ) -> Result<SeatAssignment, RepositoryError> {
        let mut state = self.lock()?;
        if !state.halls.contains_key(&assignment.hall_id) {
            return Err(RepositoryError::NotFound);
        }
        if let Some(existing) = state.seated.get(&assignment.person_id) {
            return Err(RepositoryError::PersonSeated {
                person: assignment.person_id,
                hall: existing.hall_id,
            });
        }
        let key = (assignment.hall_id, assignment.seat.clone());
        if state.seats.contains_key(&key) {
            return Err(RepositoryError::SeatTaken {
                hall: assignment.hall_id,
                seat: assignment.seat,
            });
        }

        state.seats.insert(key, assignment.person_id);
        state
            .seated
            .insert(assignment.person_id, assignment.clone());
        Ok(assignment)
    }

    fn reseat(
        &self,
        hall: HallId,
        person: PersonId,
        seat: SeatLabel,
    ) -> Result<SeatAssignment, RepositoryError> {
        let mut state = self.lock()?;
        let current = match state.seated.get(&person) {
            Some(assignment) if assignment.hall_id == hall => assignment.seat.clone(),
            _ => return Err(RepositoryError::NotFound),
        };
        if current == seat {
            return Ok(SeatAssignment { hall_id: hall, person_id: person, seat });
        }
        if state.seats.contains_key(&(hall, seat.clone())) {
            return Err(RepositoryError::SeatTaken { hall, seat });
        }

        state.seats.remove(&(hall, current));
        state.seats.insert((hall, seat.clone()), person);
        let updated = SeatAssignment {
            hall_id: hall,
            person_id: person,
            seat,
        };
        state.seated.insert(person, updated.clone());
        Ok(updated)
    }

    fn delete_assignment(
        &self,
        hall: HallId,
        person: PersonId,
    ) -> Result<Option<SeatAssignment>, RepositoryError> {
        let mut state = self.lock()?;
        let matches_hall = state
            .seated
            .get(&person)
            .is_some_and(|assignment| assignment.hall_id == hall);
        if !matches_hall {
            return Ok(None);
        }

        let removed = state.seated.remove(&person);
        if let Some(assignment) = &removed {
            state.seats.remove(&(hall, assignment.seat.clone()));
        }
        Ok(removed)
    }

    fn count_in_hall(&self, hall: HallId) -> Result<u32, RepositoryError> {
        let count = self
            .lock()?
            .seats
            .keys()
            .filter(|(seat_hall, _)| *seat_hall == hall)
            .count();
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }
}
