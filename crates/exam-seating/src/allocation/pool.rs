use std::collections::{HashMap, VecDeque};

use tracing::info;

use super::domain::{Department, Person};
use super::error::{EntityKind, SeatingError};
use super::repository::SeatingStore;

/// Per-department FIFO queues of unseated candidates.
///
/// Owned by one allocation run and consumed destructively by the scheduler.
#[derive(Debug, Default)]
pub struct CandidateQueues {
    queues: HashMap<String, VecDeque<Person>>,
}

impl CandidateQueues {
    pub fn insert(&mut self, department: impl Into<String>, candidates: VecDeque<Person>) {
        self.queues.insert(department.into(), candidates);
    }

    pub fn contains(&self, department: &str) -> bool {
        self.queues.contains_key(department)
    }

    /// Removes the next candidate of `department`, if any.
    pub fn pop(&mut self, department: &str) -> Option<Person> {
        self.queues.get_mut(department)?.pop_front()
    }

    pub fn len_of(&self, department: &str) -> usize {
        self.queues.get(department).map_or(0, VecDeque::len)
    }

    pub fn remaining(&self) -> usize {
        self.queues.values().map(VecDeque::len).sum()
    }
}

impl<const N: usize> From<[(&str, Vec<Person>); N]> for CandidateQueues {
    fn from(entries: [(&str, Vec<Person>); N]) -> Self {
        let mut queues = Self::default();
        for (department, candidates) in entries {
            queues.insert(department, candidates.into());
        }
        queues
    }
}

/// Staff member waiting for the stage seat, tagged with the department that surfaced them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaffCandidate {
    pub person: Person,
    pub department: String,
}

/// Result of pooling a department selection.
#[derive(Debug, Default)]
pub struct CandidatePools {
    pub staff: Vec<StaffCandidate>,
    pub queues: CandidateQueues,
}

/// Loads unseated people for the selected departments. Read-only.
pub struct CandidatePoolBuilder<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S> CandidatePoolBuilder<'a, S>
where
    S: SeatingStore + ?Sized,
{
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn build(&self, selection: &[String]) -> Result<CandidatePools, SeatingError> {
        let mut pools = CandidatePools::default();

        for name in selection {
            if pools.queues.contains(name) {
                continue;
            }

            let department = self.resolve(name)?;
            let unassigned = self.store.unassigned_in_department(department.id)?;

            let mut candidates = VecDeque::new();
            for person in unassigned {
                if person.is_staff() {
                    pools.staff.push(StaffCandidate {
                        person,
                        department: name.clone(),
                    });
                } else {
                    candidates.push_back(person);
                }
            }

            info!(
                department = %name,
                resolved = %department.name,
                candidates = candidates.len(),
                "collected unseated candidates"
            );
            pools.queues.insert(name.clone(), candidates);
        }

        Ok(pools)
    }

    /// Exact name first, then the first case-insensitive substring match.
    fn resolve(&self, name: &str) -> Result<Department, SeatingError> {
        if let Some(department) = self.store.department_by_name(name)? {
            return Ok(department);
        }

        self.store
            .department_containing(name)?
            .ok_or_else(|| SeatingError::not_found(EntityKind::Department, name))
    }
}
