use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{ExamHall, HallId, SeatLabel};

/// Seat map handed to the notification collaborator after an allocation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatNotice {
    pub hall_id: HallId,
    pub hall_name: String,
    pub hall_number: u32,
    /// Contact address to seat label; one entry per address.
    pub recipients: BTreeMap<String, SeatLabel>,
}

impl SeatNotice {
    pub fn new(hall: &ExamHall) -> Self {
        Self {
            hall_id: hall.id,
            hall_name: hall.name.clone(),
            hall_number: hall.number,
            recipients: BTreeMap::new(),
        }
    }

    /// Records an address. Addresses are compared case-insensitively; the first seat wins.
    pub fn add(&mut self, address: &str, seat: SeatLabel) {
        let key = address.trim().to_lowercase();
        if key.is_empty() {
            return;
        }
        self.recipients.entry(key).or_insert(seat);
    }

    pub fn is_empty(&self) -> bool {
        self.recipients.is_empty()
    }

    pub fn subject(&self) -> String {
        format!("Exam Hall Assignment - {}", self.hall_name)
    }

    /// Plain-text body shared by every recipient (sent blind-copied).
    pub fn body(&self) -> String {
        format!(
            "Dear candidate,\n\n\
             You have been assigned to the upcoming exam in {name}.\n\
             Your seat assignment can be found by logging into the exam system.\n\n\
             Exam location: {name}\n\
             Hall number: {number}\n\n\
             Please remember to:\n\
             - bring your ID card\n\
             - arrive at least 30 minutes before the exam starts\n\
             - turn off mobile phones before entering the exam hall\n\
             - bring the stationery you need\n\n\
             This is an automated message. Please do not reply.\n",
            name = self.hall_name,
            number = self.hall_number,
        )
    }
}

/// Outbound hook for seat notifications (e-mail or similar adapters).
pub trait NotificationDispatcher: Send + Sync {
    fn dispatch(&self, notice: SeatNotice) -> Result<(), NotifyError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}
