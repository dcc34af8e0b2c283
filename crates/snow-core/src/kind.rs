//! The closed set of ServiceNow record kinds the bot understands.

use std::fmt;
use std::str::FromStr;

use crate::SnowError;

/// A ServiceNow record kind with its REST table.
///
/// # Examples
///
/// ```
/// use snow_core::RecordKind;
///
/// let kind: RecordKind = "sc_task.do".parse().unwrap();
/// assert_eq!(kind, RecordKind::Task);
/// assert_eq!(kind.table(), "sc_task");
/// assert_eq!(kind.ui_target(), "sc_task.do");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// Catalog task (`sc_task`).
    Task,
    /// Requested item (`sc_req_item`).
    RequestItem,
    /// Request (`sc_request`).
    Request,
    /// Incident (`incident`).
    Incident,
    /// Change request (`change_request`).
    ChangeRequest,
}

impl RecordKind {
    /// Every kind, in the order the reaction handler scans for them.
    pub const ALL: [RecordKind; 5] = [
        RecordKind::Task,
        RecordKind::RequestItem,
        RecordKind::Request,
        RecordKind::Incident,
        RecordKind::ChangeRequest,
    ];

    /// REST table name, as used under `/api/now/table/`.
    pub fn table(self) -> &'static str {
        match self {
            RecordKind::Task => "sc_task",
            RecordKind::RequestItem => "sc_req_item",
            RecordKind::Request => "sc_request",
            RecordKind::Incident => "incident",
            RecordKind::ChangeRequest => "change_request",
        }
    }

    /// Classic UI target (`<table>.do`).
    pub fn ui_target(self) -> String {
        format!("{}.do", self.table())
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

impl FromStr for RecordKind {
    type Err = SnowError;

    /// Accepts a bare table name or a UI target ending in `.do`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let table = s.strip_suffix(".do").unwrap_or(s);
        Self::ALL
            .into_iter()
            .find(|kind| kind.table() == table)
            .ok_or_else(|| SnowError::Validation(format!("unsupported table: {s}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_parse_bare_table_names() {
        assert_eq!("sc_req_item".parse::<RecordKind>().unwrap(), RecordKind::RequestItem);
        assert_eq!("sc_request".parse::<RecordKind>().unwrap(), RecordKind::Request);
        assert_eq!("incident".parse::<RecordKind>().unwrap(), RecordKind::Incident);
    }

    #[test]
    fn test_should_parse_ui_targets() {
        assert_eq!(
            "change_request.do".parse::<RecordKind>().unwrap(),
            RecordKind::ChangeRequest
        );
        assert_eq!("sc_task.do".parse::<RecordKind>().unwrap(), RecordKind::Task);
    }

    #[test]
    fn test_should_reject_unknown_table() {
        let err = "problem.do".parse::<RecordKind>().unwrap_err();
        assert!(matches!(err, SnowError::Validation(_)));
        assert!(err.to_string().contains("problem.do"));
    }

    #[test]
    fn test_should_round_trip_every_kind_through_its_table() {
        for kind in RecordKind::ALL {
            assert_eq!(kind.table().parse::<RecordKind>().unwrap(), kind);
            assert_eq!(kind.ui_target().parse::<RecordKind>().unwrap(), kind);
        }
    }
}
