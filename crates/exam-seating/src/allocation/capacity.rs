use chrono::Utc;
use tracing::info;

use super::domain::{ExamHall, HallId};
use super::repository::{RepositoryError, SeatingStore};

/// Recomputes `available_slots` from the assignments actually stored for a hall.
pub struct CapacityAccountant<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S> CapacityAccountant<'a, S>
where
    S: SeatingStore + ?Sized,
{
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn reconcile(&self, hall_id: HallId) -> Result<ExamHall, RepositoryError> {
        let mut hall = self.store.hall(hall_id)?.ok_or(RepositoryError::NotFound)?;
        let seated = self.store.count_in_hall(hall_id)?;

        hall.available_slots = hall.capacity.saturating_sub(seated);
        hall.updated_at = Utc::now();
        self.store.save_hall(hall.clone())?;

        info!(
            hall = %hall_id,
            capacity = hall.capacity,
            seated,
            available = hall.available_slots,
            "updated available slots"
        );
        Ok(hall)
    }
}
