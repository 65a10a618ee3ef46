use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::error::ValidationError;
use super::level::resolve_level;

/// Which of the two interleaved cohorts a column or department belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CohortSide {
    First,
    Second,
}

impl CohortSide {
    pub const fn index(self) -> usize {
        match self {
            CohortSide::First => 0,
            CohortSide::Second => 1,
        }
    }

    pub const fn number(self) -> u8 {
        match self {
            CohortSide::First => 1,
            CohortSide::Second => 2,
        }
    }
}

/// Two disjoint, non-empty lists of department levels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelGroups {
    first: Vec<u32>,
    second: Vec<u32>,
}

impl LevelGroups {
    pub fn new(first: Vec<u32>, second: Vec<u32>) -> Result<Self, ValidationError> {
        if first.is_empty() || second.is_empty() {
            return Err(ValidationError::EmptyLevelGroup);
        }

        let first_levels: BTreeSet<u32> = first.iter().copied().collect();
        if let Some(level) = second.iter().find(|level| first_levels.contains(level)) {
            return Err(ValidationError::OverlappingLevelGroups { level: *level });
        }

        Ok(Self { first, second })
    }

    /// Levels 1 and 3 against levels 2 and 4.
    pub fn standard() -> Self {
        Self {
            first: vec![1, 3],
            second: vec![2, 4],
        }
    }

    /// Resolves optional caller groups: both absent means the standard pairing.
    pub fn from_request(
        first: Option<Vec<u32>>,
        second: Option<Vec<u32>>,
    ) -> Result<Self, ValidationError> {
        match (first, second) {
            (None, None) => Ok(Self::standard()),
            (Some(first), Some(second)) => Self::new(first, second),
            _ => Err(ValidationError::EmptyLevelGroup),
        }
    }

    pub fn first(&self) -> &[u32] {
        &self.first
    }

    pub fn second(&self) -> &[u32] {
        &self.second
    }

    pub fn side_for(&self, level: u32) -> Option<CohortSide> {
        if self.first.contains(&level) {
            Some(CohortSide::First)
        } else if self.second.contains(&level) {
            Some(CohortSide::Second)
        } else {
            None
        }
    }
}

impl Default for LevelGroups {
    fn default() -> Self {
        Self::standard()
    }
}

/// Department names split into the two cohorts, in selection order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Cohorts {
    first: Vec<String>,
    second: Vec<String>,
    excluded: Vec<String>,
}

impl Cohorts {
    pub fn side(&self, side: CohortSide) -> &[String] {
        match side {
            CohortSide::First => &self.first,
            CohortSide::Second => &self.second,
        }
    }

    /// Selected departments whose level matched neither group.
    pub fn excluded(&self) -> &[String] {
        &self.excluded
    }

    pub fn is_empty(&self) -> bool {
        self.first.is_empty() && self.second.is_empty()
    }
}

/// Assigns every selected department to a cohort by its resolved level.
pub fn partition(selection: &[String], groups: &LevelGroups) -> Cohorts {
    let mut cohorts = Cohorts::default();

    for name in selection {
        let level = resolve_level(name);
        match groups.side_for(level) {
            Some(CohortSide::First) => cohorts.first.push(name.clone()),
            Some(CohortSide::Second) => cohorts.second.push(name.clone()),
            None => {
                debug!(department = %name, level, "department level outside both level groups");
                cohorts.excluded.push(name.clone());
            }
        }
    }

    info!(
        first_levels = ?groups.first(),
        second_levels = ?groups.second(),
        first = ?cohorts.first,
        second = ?cohorts.second,
        "partitioned departments into cohorts"
    );
    cohorts
}
