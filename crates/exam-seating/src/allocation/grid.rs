use std::collections::HashSet;

use serde::Serialize;

use super::cohort::CohortSide;
use super::domain::SeatLabel;
use super::error::ValidationError;

/// Physical seating layout: ordered column labels and a row bound.
///
/// Even column indices (0, 2, ...) seat the first cohort, odd indices the second, so
/// neighbouring columns never hold the same cohort.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeatingGrid {
    columns: Vec<String>,
    rows: u32,
}

impl SeatingGrid {
    pub const REFERENCE_COLUMNS: [&'static str; 7] = ["A", "C", "D", "G", "I", "J", "L"];
    pub const REFERENCE_ROWS: u32 = 8;

    pub fn new<I, S>(columns: I, rows: u32) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let columns: Vec<String> = columns
            .into_iter()
            .map(|column| column.as_ref().trim().to_uppercase())
            .collect();

        if columns.is_empty() {
            return Err(ValidationError::InvalidGrid {
                reason: "at least one column label is required".to_string(),
            });
        }
        if rows == 0 {
            return Err(ValidationError::InvalidGrid {
                reason: "row count must be positive".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for column in &columns {
            if column.is_empty() || !column.chars().all(|ch| ch.is_ascii_uppercase()) {
                return Err(ValidationError::InvalidGrid {
                    reason: format!("column '{column}' must be made of letters"),
                });
            }
            if !seen.insert(column.as_str()) {
                return Err(ValidationError::InvalidGrid {
                    reason: format!("column '{column}' is listed twice"),
                });
            }
        }

        Ok(Self { columns, rows })
    }

    /// Seven columns by eight rows, 56 seats.
    pub fn reference() -> Self {
        Self {
            columns: Self::REFERENCE_COLUMNS
                .iter()
                .map(|column| column.to_string())
                .collect(),
            rows: Self::REFERENCE_ROWS,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn capacity(&self) -> usize {
        self.columns.len() * self.rows as usize
    }

    pub fn cohort_for(&self, column_index: usize) -> CohortSide {
        if column_index % 2 == 0 {
            CohortSide::First
        } else {
            CohortSide::Second
        }
    }

    /// Label for a cell; `row` is 1-based.
    pub fn label(&self, column_index: usize, row: u32) -> SeatLabel {
        SeatLabel::grid(&self.columns[column_index], row)
    }
}

impl Default for SeatingGrid {
    fn default() -> Self {
        Self::reference()
    }
}
