//! Sheet import for bulk seat assignment.
//!
//! Rows are read from a CSV export with the columns `id,seatNumber,examHoleId,userId`. Every
//! row must target the hall the import was started for; the first invalid row rejects the
//! whole sheet.

use std::io::Read;

use csv::StringRecord;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::domain::{HallId, PersonId, SeatLabel};
use super::error::{SeatingError, ValidationError};

pub const EXPECTED_HEADERS: [&str; 4] = ["id", "seatNumber", "examHoleId", "userId"];

/// One validated import row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatRequest {
    /// Sheet line the request came from (the header is line 1).
    pub row: usize,
    pub person_id: PersonId,
    pub hall_id: HallId,
    pub seat: SeatLabel,
}

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("failed to read import: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

impl From<ImportError> for SeatingError {
    fn from(value: ImportError) -> Self {
        match value {
            ImportError::Invalid(err) => SeatingError::Validation(err),
            ImportError::Csv(err) => SeatingError::Validation(ValidationError::InvalidRow {
                row: err.position().map_or(0, |position| position.line() as usize),
                field: "record",
                value: err.to_string(),
            }),
        }
    }
}

/// Parses a sheet into seat requests for `hall_id`.
pub fn parse_requests<R: Read>(reader: R, hall_id: HallId) -> Result<Vec<SeatRequest>, ImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    validate_headers(csv_reader.headers()?)?;

    let mut requests = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        let row = record.position().map_or(0, |position| position.line() as usize);

        if record.iter().all(str::is_empty) {
            debug!(row, "skipping empty row");
            continue;
        }

        requests.push(parse_row(&record, row, hall_id)?);
    }

    if requests.is_empty() {
        return Err(ValidationError::EmptyBatch.into());
    }
    Ok(requests)
}

fn validate_headers(headers: &StringRecord) -> Result<(), ValidationError> {
    let found: Vec<&str> = (0..EXPECTED_HEADERS.len())
        .map(|index| headers.get(index).unwrap_or(""))
        .collect();

    if found != EXPECTED_HEADERS {
        return Err(ValidationError::InvalidHeaders {
            expected: EXPECTED_HEADERS.join(", "),
            found: found.join(", "),
        });
    }
    Ok(())
}

fn parse_row(record: &StringRecord, row: usize, hall_id: HallId) -> Result<SeatRequest, ValidationError> {
    let field = |index: usize| record.get(index).unwrap_or("");

    // the sheet's own id column must be present and numeric, but it is not used
    parse_id(field(0), "id", row)?.ok_or_else(|| invalid(row, "id", field(0)))?;

    let seat = SeatLabel::parse(field(1)).map_err(|err| match err {
        ValidationError::EmptySeatLabel => invalid(row, "seatNumber", field(1)),
        other => other,
    })?;

    let found = parse_id(field(2), "examHoleId", row)?.map(HallId);
    if found != Some(hall_id) {
        return Err(ValidationError::HallMismatch {
            row,
            expected: hall_id,
            found: found.unwrap_or(HallId(0)),
        });
    }

    let person_id = parse_id(field(3), "userId", row)?
        .map(PersonId)
        .ok_or_else(|| invalid(row, "userId", field(3)))?;

    Ok(SeatRequest {
        row,
        person_id,
        hall_id,
        seat,
    })
}

/// Accepts integers and whole-number decimals such as `12.0`, as spreadsheet exports emit.
fn parse_id(raw: &str, field: &'static str, row: usize) -> Result<Option<u64>, ValidationError> {
    if raw.is_empty() {
        return Ok(None);
    }
    if let Ok(value) = raw.parse::<u64>() {
        return Ok(Some(value));
    }
    match raw.parse::<f64>() {
        Ok(value) if value >= 0.0 && value.fract() == 0.0 && value <= u64::MAX as f64 => {
            Ok(Some(value as u64))
        }
        _ => Err(invalid(row, field, raw)),
    }
}

fn invalid(row: usize, field: &'static str, value: &str) -> ValidationError {
    ValidationError::InvalidRow {
        row,
        field,
        value: value.to_string(),
    }
}
