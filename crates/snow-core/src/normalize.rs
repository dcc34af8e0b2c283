//! Normalisation of raw records into [`CanonicalTicket`].
//!
//! One mapping per [`RecordKind`]. Every display field falls back to
//! [`NOT_AVAILABLE`]; `target_link` does not, and a record without `sys_id`
//! is rejected instead.

use tracing::debug;

use crate::state::{self, INCIDENT_STATES, TASK_STATES};
use crate::ticket::{CanonicalTicket, NOT_AVAILABLE, RawTicket};
use crate::link::build_ui_url;
use crate::{RecordKind, SnowError};

/// Normalises `raw` as a record of `kind`.
///
/// `request_item` is only consulted for [`RecordKind::Task`], where it
/// supplies `sys_created_by` (the task itself is created by the workflow,
/// not the requester).
///
/// # Errors
///
/// Returns `SnowError::Validation` if `raw` has no `sys_id`.
///
/// # Examples
///
/// ```
/// use snow_core::{RawTicket, RecordKind, normalize};
///
/// let raw: RawTicket = serde_json::from_str(
///     r#"{"task_effective_number": "TASK001", "sys_id": "abc123", "sys_class_name": "sc_task"}"#,
/// )
/// .unwrap();
/// let ticket = normalize(RecordKind::RequestItem, "acme.service-now.com", &raw, None).unwrap();
/// assert_eq!(ticket.short_description, "N/A");
/// assert_eq!(
///     ticket.target_link,
///     "https://acme.service-now.com/now/nav/ui/classic/params/target/sc_task.do?sys_id=abc123",
/// );
/// ```
pub fn normalize(
    kind: RecordKind,
    host: &str,
    raw: &RawTicket,
    request_item: Option<&RawTicket>,
) -> Result<CanonicalTicket, SnowError> {
    let ticket = match kind {
        RecordKind::Task => task(host, raw, request_item)?,
        RecordKind::RequestItem | RecordKind::Request => request_item_like(kind, host, raw)?,
        RecordKind::Incident => incident(host, raw)?,
        RecordKind::ChangeRequest => change_request(host, raw)?,
    };
    debug!(
        kind = %kind,
        number = ticket.task_effective_number,
        state = ticket.state,
        "Normalised ticket"
    );
    Ok(ticket)
}

fn task(
    host: &str,
    raw: &RawTicket,
    request_item: Option<&RawTicket>,
) -> Result<CanonicalTicket, SnowError> {
    let mut ticket = common(raw, mapped_state(raw, TASK_STATES), link(host, raw, "sc_task.do")?);
    ticket.sys_created_by = request_item
        .map(|item| or_na(item, "sys_created_by"))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());
    Ok(ticket)
}

/// Requested items and requests share one mapping; the link follows the
/// record's `sys_class_name`.
fn request_item_like(
    kind: RecordKind,
    host: &str,
    raw: &RawTicket,
) -> Result<CanonicalTicket, SnowError> {
    let target = raw
        .field("sys_class_name")
        .filter(|class| !class.is_empty())
        .map_or_else(|| kind.ui_target(), |class| format!("{class}.do"));
    Ok(common(raw, mapped_state(raw, TASK_STATES), link(host, raw, &target)?))
}

fn incident(host: &str, raw: &RawTicket) -> Result<CanonicalTicket, SnowError> {
    Ok(common(
        raw,
        mapped_state(raw, INCIDENT_STATES),
        link(host, raw, "incident.do")?,
    ))
}

/// Change-request state is not mapped: there is no change table yet, so
/// the raw code is shown.
fn change_request(host: &str, raw: &RawTicket) -> Result<CanonicalTicket, SnowError> {
    Ok(common(
        raw,
        or_na(raw, "state"),
        link(host, raw, "change_request.do")?,
    ))
}

fn common(raw: &RawTicket, state: String, target_link: String) -> CanonicalTicket {
    CanonicalTicket {
        task_effective_number: or_na(raw, "task_effective_number"),
        short_description: or_na(raw, "short_description"),
        sys_created_on: or_na(raw, "sys_created_on"),
        priority: or_na(raw, "priority"),
        sys_updated_by: or_na(raw, "sys_updated_by"),
        approval: or_na(raw, "approval"),
        state,
        sys_created_by: or_na(raw, "sys_created_by"),
        target_link,
        sys_updated_on: or_na(raw, "sys_updated_on"),
    }
}

fn or_na(raw: &RawTicket, key: &str) -> String {
    raw.field(key).unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn mapped_state(raw: &RawTicket, table: &[(&str, &'static str)]) -> String {
    match raw.field("state") {
        Some(code) => state::label(table, &code).to_string(),
        None => NOT_AVAILABLE.to_string(),
    }
}

fn link(host: &str, raw: &RawTicket, target: &str) -> Result<String, SnowError> {
    let sys_id = raw
        .sys_id()
        .ok_or_else(|| SnowError::Validation(format!("record for {target} has no sys_id")))?;
    Ok(build_ui_url(host, target, sys_id))
}
