//! Raw and canonical ticket shapes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::SnowError;

/// Placeholder for any field missing from a raw record.
pub const NOT_AVAILABLE: &str = "N/A";

/// One record as returned inside the table API's `result` envelope.
///
/// Kept as an untyped JSON object: the five record kinds share few fields
/// and every field is optional.
///
/// # Examples
///
/// ```
/// use snow_core::RawTicket;
///
/// let raw: RawTicket = serde_json::from_str(
///     r#"{"number": "INC0010001", "priority": 3, "caller_id": {"value": "u1"}}"#,
/// )
/// .unwrap();
/// assert_eq!(raw.field("number").as_deref(), Some("INC0010001"));
/// assert_eq!(raw.field("priority").as_deref(), Some("3"));
/// assert_eq!(raw.reference_id("caller_id"), Some("u1"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawTicket(Map<String, Value>);

impl RawTicket {
    /// Returns a field rendered as display text.
    ///
    /// Strings are returned verbatim, numbers and booleans as their text,
    /// reference objects as their `display_value` (or `value`). Absent and
    /// `null` fields yield `None`.
    pub fn field(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Object(reference) => reference
                .get("display_value")
                .or_else(|| reference.get("value"))
                .and_then(Value::as_str)
                .map(str::to_string),
            Value::Array(_) => None,
        }
    }

    /// Returns the `sys_id` a reference field points at.
    pub fn reference_id(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)?
            .get("value")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
    }

    /// Returns the record's own `sys_id`.
    pub fn sys_id(&self) -> Option<&str> {
        self.0
            .get("sys_id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
    }
}

impl TryFrom<Value> for RawTicket {
    type Error = SnowError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(fields) => Ok(Self(fields)),
            other => Err(SnowError::Parse(format!(
                "expected a record object, got {}",
                json_kind(&other)
            ))),
        }
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// The display shape every record kind is normalised into.
///
/// Every field is always populated; missing source data shows as
/// [`NOT_AVAILABLE`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalTicket {
    /// Human ticket number, e.g. `INC0010001`.
    pub task_effective_number: String,
    /// One-line summary.
    pub short_description: String,
    /// Creation timestamp as sent by ServiceNow.
    pub sys_created_on: String,
    /// Priority code, unmapped.
    pub priority: String,
    /// Last updater's user name.
    pub sys_updated_by: String,
    /// Approval status.
    pub approval: String,
    /// State label (raw code for change requests).
    pub state: String,
    /// Creator's user name.
    pub sys_created_by: String,
    /// Link back into the ServiceNow UI.
    pub target_link: String,
    /// Last update timestamp as sent by ServiceNow.
    pub sys_updated_on: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(value: Value) -> RawTicket {
        RawTicket::try_from(value).expect("object")
    }

    #[test]
    fn test_should_render_scalar_fields() {
        let t = raw(serde_json::json!({
            "a": "text",
            "b": 4,
            "c": true,
            "d": null,
        }));
        assert_eq!(t.field("a").as_deref(), Some("text"));
        assert_eq!(t.field("b").as_deref(), Some("4"));
        assert_eq!(t.field("c").as_deref(), Some("true"));
        assert_eq!(t.field("d"), None);
        assert_eq!(t.field("missing"), None);
    }

    #[test]
    fn test_should_prefer_display_value_for_references() {
        let t = raw(serde_json::json!({
            "assigned_to": {"link": "https://x/api", "value": "u1", "display_value": "Ada"},
            "request_item": {"link": "https://x/api", "value": "ritm1"},
        }));
        assert_eq!(t.field("assigned_to").as_deref(), Some("Ada"));
        assert_eq!(t.field("request_item").as_deref(), Some("ritm1"));
        assert_eq!(t.reference_id("request_item"), Some("ritm1"));
    }

    #[test]
    fn test_should_treat_blank_reference_as_absent() {
        let t = raw(serde_json::json!({"request_item": ""}));
        assert_eq!(t.reference_id("request_item"), None);
        let t = raw(serde_json::json!({"request_item": {"value": ""}}));
        assert_eq!(t.reference_id("request_item"), None);
    }

    #[test]
    fn test_should_reject_non_object_record() {
        let err = RawTicket::try_from(serde_json::json!([1, 2])).unwrap_err();
        assert!(matches!(err, SnowError::Parse(_)));
        assert!(err.to_string().contains("array"));
    }

    #[test]
    fn test_should_read_sys_id() {
        assert_eq!(raw(serde_json::json!({"sys_id": "abc"})).sys_id(), Some("abc"));
        assert_eq!(raw(serde_json::json!({"sys_id": ""})).sys_id(), None);
        assert_eq!(raw(serde_json::json!({})).sys_id(), None);
    }
}
