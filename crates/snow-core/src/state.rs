//! Static state-code lookup tables.
//!
//! ServiceNow stores `state` as an integer choice value serialised as a
//! string. Codes missing from a table fall through unchanged.

/// State labels for `sc_task`, `sc_req_item` and `sc_request`.
pub const TASK_STATES: &[(&str, &str)] = &[
    ("-5", "Pending"),
    ("1", "Open"),
    ("2", "Work in Progress"),
    ("3", "Closed Complete"),
    ("4", "Closed Incomplete"),
    ("7", "Closed Skipped"),
];

/// State labels for `incident`.
pub const INCIDENT_STATES: &[(&str, &str)] = &[
    ("1", "New"),
    ("2", "In Progress"),
    ("3", "On Hold"),
    ("6", "Resolved"),
    ("7", "Closed"),
    ("8", "Canceled"),
];

/// Looks up `code` in `table`, returning the code itself when unmapped.
///
/// # Examples
///
/// ```
/// use snow_core::state::{TASK_STATES, label};
///
/// assert_eq!(label(TASK_STATES, "2"), "Work in Progress");
/// assert_eq!(label(TASK_STATES, "42"), "42");
/// ```
pub fn label<'a>(table: &[(&str, &'a str)], code: &'a str) -> &'a str {
    let code_trimmed = code.trim();
    table
        .iter()
        .find(|(c, _)| *c == code_trimmed)
        .map_or(code, |&(_, l)| l)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_map_task_states() {
        assert_eq!(label(TASK_STATES, "-5"), "Pending");
        assert_eq!(label(TASK_STATES, "1"), "Open");
        assert_eq!(label(TASK_STATES, "3"), "Closed Complete");
        assert_eq!(label(TASK_STATES, "7"), "Closed Skipped");
    }

    #[test]
    fn test_should_map_incident_states() {
        assert_eq!(label(INCIDENT_STATES, "1"), "New");
        assert_eq!(label(INCIDENT_STATES, "6"), "Resolved");
        assert_eq!(label(INCIDENT_STATES, "8"), "Canceled");
    }

    #[test]
    fn test_should_pass_unknown_codes_through() {
        assert_eq!(label(INCIDENT_STATES, "-5"), "-5");
        assert_eq!(label(TASK_STATES, "N/A"), "N/A");
    }

    #[test]
    fn test_should_be_stable_for_repeated_lookups() {
        for (code, _) in TASK_STATES {
            assert_eq!(label(TASK_STATES, code), label(TASK_STATES, code));
        }
    }

    #[test]
    fn test_should_not_share_codes_across_tables() {
        // "2" means different things for tasks and incidents
        assert_ne!(label(TASK_STATES, "2"), label(INCIDENT_STATES, "2"));
    }
}
