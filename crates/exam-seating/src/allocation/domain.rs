use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::ValidationError;

/// Identifier wrapper for exam halls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HallId(pub u64);

/// Identifier wrapper for people that can be seated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PersonId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DepartmentId(pub u64);

impl fmt::Display for HallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Physical exam hall with its capacity ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamHall {
    pub id: HallId,
    pub number: u32,
    pub name: String,
    pub capacity: u32,
    pub available_slots: u32,
    pub rows: u32,
    pub columns: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ExamHall {
    pub fn is_full(&self) -> bool {
        self.available_slots == 0
    }
}

/// Payload used to register a hall; the store assigns the identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewHall {
    pub number: u32,
    pub name: String,
    pub capacity: u32,
    #[serde(default)]
    pub rows: u32,
    #[serde(default)]
    pub columns: u32,
}

/// Partial update for an existing hall. Omitted fields keep their value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HallUpdate {
    #[serde(default)]
    pub number: Option<u32>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub capacity: Option<u32>,
    #[serde(default)]
    pub rows: Option<u32>,
    #[serde(default)]
    pub columns: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub id: DepartmentId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Seating role. Staff sit on the stage, candidates on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonRole {
    Staff,
    Candidate,
}

impl PersonRole {
    pub const fn label(self) -> &'static str {
        match self {
            PersonRole::Staff => "staff",
            PersonRole::Candidate => "candidate",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    pub role: PersonRole,
    #[serde(default)]
    pub department_id: Option<DepartmentId>,
}

impl Person {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn is_staff(&self) -> bool {
        self.role == PersonRole::Staff
    }

    /// Contact address usable for notifications, if one is on file.
    pub fn contact(&self) -> Option<&str> {
        self.email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty())
    }
}

/// Normalised seat identifier (trimmed, upper-cased).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeatLabel(String);

impl SeatLabel {
    pub const MAX_LEN: usize = 10;
    pub const DEFAULT_STAGE: &'static str = "STAGE";

    /// Default label for the staff seat in front of the grid.
    pub fn stage() -> Self {
        Self(Self::DEFAULT_STAGE.to_string())
    }

    /// Normalises free-form input. Only emptiness and length are checked here.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let normalized = raw.trim().to_uppercase();
        if normalized.is_empty() {
            return Err(ValidationError::EmptySeatLabel);
        }
        if normalized.chars().count() > Self::MAX_LEN {
            return Err(ValidationError::MalformedSeatLabel {
                raw: raw.to_string(),
            });
        }
        Ok(Self(normalized))
    }

    /// Builds a grid label such as `A1` from a column and a 1-based row.
    pub fn grid(column: &str, row: u32) -> Self {
        Self(format!("{}{}", column.trim().to_uppercase(), row))
    }

    /// True for letters followed by digits, e.g. `A1` or `AB12`.
    pub fn is_grid_label(&self) -> bool {
        let letters = self
            .0
            .chars()
            .take_while(|ch| ch.is_ascii_uppercase())
            .count();
        let rest = &self.0[letters..];
        letters > 0 && !rest.is_empty() && rest.chars().all(|ch| ch.is_ascii_digit())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Seat-map ordering: grid labels by column then numeric row (`A2` before `A10`),
    /// other labels such as the stage after them.
    pub fn seat_order(&self) -> (bool, usize, &str, u64) {
        if !self.is_grid_label() {
            return (true, 0, &self.0, 0);
        }
        let split = self
            .0
            .find(|ch: char| ch.is_ascii_digit())
            .unwrap_or(self.0.len());
        let (column, row) = self.0.split_at(split);
        (false, column.len(), column, row.parse().unwrap_or(u64::MAX))
    }
}

impl FromStr for SeatLabel {
    type Err = ValidationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::parse(raw)
    }
}

impl fmt::Display for SeatLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A person occupying a seat in a hall.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatAssignment {
    pub hall_id: HallId,
    pub person_id: PersonId,
    pub seat: SeatLabel,
}

/// Roster entry exposed through the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeatView {
    pub person_id: PersonId,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub role: &'static str,
    pub seat: SeatLabel,
}

impl SeatView {
    pub fn new(person: &Person, seat: SeatLabel) -> Self {
        Self {
            person_id: person.id,
            first_name: person.first_name.clone(),
            last_name: person.last_name.clone(),
            email: person.email.clone(),
            role: person.role.label(),
            seat,
        }
    }
}
