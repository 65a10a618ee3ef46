//! Department level resolution.
//!
//! Levels are not stored on departments; they are read from the naming convention
//! (`"IT 4"` is a level 4 department). Keeping the rule here means it can be replaced by a
//! stored field without touching the scheduler.

/// Level used for department names that carry no numeric token.
pub const UNLEVELED: u32 = 0;

/// Returns the first whitespace-delimited token made only of ASCII digits, parsed as a level.
pub fn resolve_level(department_name: &str) -> u32 {
    department_name
        .split_whitespace()
        .filter(|token| token.bytes().all(|byte| byte.is_ascii_digit()))
        .find_map(|token| token.parse::<u32>().ok())
        .unwrap_or(UNLEVELED)
}
