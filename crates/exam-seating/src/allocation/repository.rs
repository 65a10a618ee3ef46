use super::domain::{
    Department, DepartmentId, ExamHall, HallId, NewHall, Person, PersonId, SeatAssignment,
    SeatLabel,
};

/// Storage abstraction for halls, people and seat assignments.
///
/// Implementations must enforce the two uniqueness rules inside
/// [`SeatingStore::insert_assignment`] and [`SeatingStore::reseat`]: a seat label is unique
/// within a hall and a person holds at most one assignment across every hall. The service
/// re-checks both before writing, but only the store can make the check and the write atomic.
pub trait SeatingStore: Send + Sync {
    fn hall(&self, id: HallId) -> Result<Option<ExamHall>, RepositoryError>;
    fn halls(&self) -> Result<Vec<ExamHall>, RepositoryError>;
    fn insert_hall(&self, hall: NewHall) -> Result<ExamHall, RepositoryError>;
    fn save_hall(&self, hall: ExamHall) -> Result<(), RepositoryError>;
    /// Removes the hall together with its assignments, returning the removed assignments.
    fn delete_hall(&self, id: HallId) -> Result<Vec<SeatAssignment>, RepositoryError>;

    fn department_by_name(&self, name: &str) -> Result<Option<Department>, RepositoryError>;
    /// First department whose name contains `fragment`, ignoring case.
    fn department_containing(&self, fragment: &str)
        -> Result<Option<Department>, RepositoryError>;

    fn person(&self, id: PersonId) -> Result<Option<Person>, RepositoryError>;
    fn persons_in_department(&self, id: DepartmentId) -> Result<Vec<Person>, RepositoryError>;

    fn assignment_for_person(
        &self,
        person: PersonId,
    ) -> Result<Option<SeatAssignment>, RepositoryError>;
    fn assignment_at(
        &self,
        hall: HallId,
        seat: &SeatLabel,
    ) -> Result<Option<SeatAssignment>, RepositoryError>;
    fn assignments_in_hall(&self, hall: HallId) -> Result<Vec<SeatAssignment>, RepositoryError>;

    fn insert_assignment(
        &self,
        assignment: SeatAssignment,
    ) -> Result<SeatAssignment, RepositoryError>;
    /// Moves an existing assignment to another seat in the same hall.
    fn reseat(
        &self,
        hall: HallId,
        person: PersonId,
        seat: SeatLabel,
    ) -> Result<SeatAssignment, RepositoryError>;
    fn delete_assignment(
        &self,
        hall: HallId,
        person: PersonId,
    ) -> Result<Option<SeatAssignment>, RepositoryError>;

    fn count_in_hall(&self, hall: HallId) -> Result<u32, RepositoryError> {
        let count = self.assignments_in_hall(hall)?.len();
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    /// People of a department that hold no assignment in any hall.
    fn unassigned_in_department(&self, id: DepartmentId) -> Result<Vec<Person>, RepositoryError> {
        let mut unassigned = Vec::new();
        for person in self.persons_in_department(id)? {
            if self.assignment_for_person(person.id)?.is_none() {
                unassigned.push(person);
            }
        }
        Ok(unassigned)
    }
}

/// Error enumeration for storage failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("seat {seat} is already taken in hall {hall}")]
    SeatTaken { hall: HallId, seat: SeatLabel },
    #[error("person {person} already holds a seat in hall {hall}")]
    PersonSeated { person: PersonId, hall: HallId },
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
