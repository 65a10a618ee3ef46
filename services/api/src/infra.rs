use exam_seating::allocation::{
    Department, DepartmentId, InMemorySeatingStore, NotificationDispatcher, NotifyError, Person,
    PersonId, PersonRole, RepositoryError, SeatNotice,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Dispatcher that logs each notice and keeps it for inspection instead of sending mail.
#[derive(Default, Clone)]
pub(crate) struct LoggingNotifier {
    outbox: Arc<Mutex<Vec<SeatNotice>>>,
}

impl NotificationDispatcher for LoggingNotifier {
    fn dispatch(&self, notice: SeatNotice) -> Result<(), NotifyError> {
        info!(
            hall = %notice.hall_id,
            subject = %notice.subject(),
            recipients = notice.recipients.len(),
            "queued seat notice"
        );
        let mut guard = self
            .outbox
            .lock()
            .map_err(|_| NotifyError::Transport("outbox mutex poisoned".to_string()))?;
        guard.push(notice);
        Ok(())
    }
}

impl LoggingNotifier {
    pub(crate) fn sent(&self) -> Vec<SeatNotice> {
        self.outbox
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

/// Department name and (staff, candidates) head count used by the sample campus.
pub(crate) const SAMPLE_DEPARTMENTS: [(&str, usize, usize); 5] = [
    ("Computer Science 1", 1, 12),
    ("Computer Science 2", 0, 10),
    ("Mathematics 3", 1, 9),
    ("Mathematics 4", 0, 8),
    ("Student Affairs", 1, 4),
];

const FIRST_NAMES: [&str; 8] = [
    "Aram", "Bahar", "Dilan", "Hana", "Karwan", "Lana", "Rebin", "Shilan",
];

/// Seeds departments and people so allocations have something to seat.
pub(crate) fn seed_sample_campus(store: &InMemorySeatingStore) -> Result<usize, RepositoryError> {
    let mut next_person = 1_u64;

    for (index, (name, staff, candidates)) in SAMPLE_DEPARTMENTS.iter().enumerate() {
        let department_id = DepartmentId(index as u64 + 1);
        store.add_department(Department {
            id: department_id,
            name: (*name).to_string(),
            description: None,
        })?;

        for position in 0..(staff + candidates) {
            let role = if position < *staff {
                PersonRole::Staff
            } else {
                PersonRole::Candidate
            };
            let first_name = FIRST_NAMES[next_person as usize % FIRST_NAMES.len()];
            store.add_person(Person {
                id: PersonId(next_person),
                first_name: first_name.to_string(),
                last_name: format!("Sample{next_person}"),
                email: Some(format!(
                    "{}.{}@campus.example",
                    first_name.to_lowercase(),
                    next_person
                )),
                role,
                department_id: Some(department_id),
            })?;
            next_person += 1;
        }
    }

    let seeded = (next_person - 1) as usize;
    info!(people = seeded, departments = SAMPLE_DEPARTMENTS.len(), "seeded sample campus");
    Ok(seeded)
}
