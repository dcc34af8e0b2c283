//! Translation between ServiceNow classic-UI links and `(table, sys_id)`.
//!
//! Links shared in chat look like
//! `https://<host>/now/nav/ui/classic/params/target/sc_task.do%3Fsys_id%3D<id>`.
//! Both that encoded form and the plain `?sys_id=` form are accepted. A
//! link is decoded exactly once, so ids built by [`build_ui_url`] come back
//! unchanged.

use url::Url;

use crate::SnowError;

/// Table and record id recovered from a ServiceNow link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketUrl {
    /// Last path segment, e.g. `sc_task.do`.
    pub table: String,
    /// Value of the `sys_id` query parameter.
    pub record_id: String,
}

/// Parses a ServiceNow UI link into its table and `sys_id`.
///
/// # Errors
///
/// Returns `SnowError::Validation` if the link is not an absolute URL or
/// its query string has no non-empty `sys_id`.
///
/// # Examples
///
/// ```
/// use snow_core::link::parse_ticket_url;
///
/// let parsed = parse_ticket_url(
///     "https://acme.service-now.com/now/nav/ui/classic/params/target/incident.do%3Fsys_id%3Dxyz",
/// )
/// .unwrap();
/// assert_eq!(parsed.table, "incident.do");
/// assert_eq!(parsed.record_id, "xyz");
/// ```
pub fn parse_ticket_url(url: &str) -> Result<TicketUrl, SnowError> {
    let mut parsed = parse_absolute(url)?;
    // Shared links often carry the whole query encoded into the last path
    // segment; only then is the link decoded, and only once.
    if parsed.query().is_none() {
        let decoded = urlencoding::decode(url).map_err(|e| {
            SnowError::Validation(format!("url is not valid UTF-8 once decoded: {e}"))
        })?;
        parsed = parse_absolute(&decoded)?;
    }

    let last_segment = parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default();
    let table = urlencoding::decode(last_segment)
        .map_err(|e| SnowError::Validation(format!("table is not valid UTF-8: {e}")))?
        .into_owned();

    let record_id = parsed
        .query_pairs()
        .find(|(key, value)| key == "sys_id" && !value.is_empty())
        .map(|(_, value)| value.into_owned())
        .ok_or_else(|| SnowError::Validation("sys_id not found in the url".into()))?;

    Ok(TicketUrl { table, record_id })
}

fn parse_absolute(url: &str) -> Result<Url, SnowError> {
    Url::parse(url).map_err(|e| SnowError::Validation(format!("cannot parse url {url}: {e}")))
}

/// Builds the classic-UI link for a record.
///
/// The host is used as given. `table` and `record_id` are percent-encoded
/// except for `/`.
///
/// # Examples
///
/// ```
/// use snow_core::link::build_ui_url;
///
/// assert_eq!(
///     build_ui_url("acme.service-now.com", "incident.do", "xyz"),
///     "https://acme.service-now.com/now/nav/ui/classic/params/target/incident.do?sys_id=xyz",
/// );
/// ```
pub fn build_ui_url(host: &str, table: &str, record_id: &str) -> String {
    format!(
        "https://{host}/now/nav/ui/classic/params/target/{}?sys_id={}",
        encode_keeping_slashes(table),
        encode_keeping_slashes(record_id),
    )
}

fn encode_keeping_slashes(raw: &str) -> String {
    raw.split('/')
        .map(|part| urlencoding::encode(part).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOST: &str = "acme.service-now.com";

    #[test]
    fn test_should_parse_encoded_classic_link() {
        let parsed = parse_ticket_url(
            "https://acme.service-now.com/now/nav/ui/classic/params/target/sc_task.do%3Fsys_id%3Dabc123%26sysparm_view%3D",
        )
        .expect("parse");
        assert_eq!(parsed.table, "sc_task.do");
        assert_eq!(parsed.record_id, "abc123");
    }

    #[test]
    fn test_should_parse_plain_query_link() {
        let parsed = parse_ticket_url("https://acme.service-now.com/sc_req_item.do?sys_id=42")
            .expect("parse");
        assert_eq!(parsed.table, "sc_req_item.do");
        assert_eq!(parsed.record_id, "42");
    }

    #[test]
    fn test_should_decode_plain_query_only_once() {
        let parsed = parse_ticket_url("https://acme.service-now.com/incident.do?sys_id=a%2520b")
            .expect("parse");
        assert_eq!(parsed.table, "incident.do");
        assert_eq!(parsed.record_id, "a%20b");
    }

    #[test]
    fn test_should_reject_link_without_sys_id() {
        for url in [
            "https://acme.service-now.com/now/nav/ui/classic/params/target/incident.do",
            "https://acme.service-now.com/incident.do?sysparm_query=active%3Dtrue",
            "https://acme.service-now.com/",
            "https://acme.service-now.com/incident.do?sys_id=",
        ] {
            let err = parse_ticket_url(url).unwrap_err();
            assert!(matches!(err, SnowError::Validation(_)), "url: {url}");
        }
    }

    #[test]
    fn test_should_reject_relative_link() {
        let err = parse_ticket_url("incident.do?sys_id=1").unwrap_err();
        assert!(matches!(err, SnowError::Validation(_)));
    }

    #[test]
    fn test_should_build_exact_ui_url() {
        assert_eq!(
            build_ui_url(HOST, "sc_task.do", "abc123"),
            "https://acme.service-now.com/now/nav/ui/classic/params/target/sc_task.do?sys_id=abc123"
        );
    }

    #[test]
    fn test_should_encode_components_but_keep_slashes() {
        let url = build_ui_url(HOST, "a b/c.do", "x&y");
        assert_eq!(
            url,
            "https://acme.service-now.com/now/nav/ui/classic/params/target/a%20b/c.do?sys_id=x%26y"
        );
    }

    #[test]
    fn test_should_round_trip_build_and_parse() {
        for (table, id) in [
            ("incident.do", "xyz"),
            ("sc_task.do", "9d385017c611228701d22104cc95c371"),
            ("change_request.do", "id with space"),
            ("incident.do", "a&b"),
            ("incident.do", "a+b"),
            ("incident.do", "a#b"),
            ("incident.do", "a%2Fb"),
        ] {
            let parsed = parse_ticket_url(&build_ui_url(HOST, table, id)).expect("parse");
            assert_eq!(parsed.table, table);
            assert_eq!(parsed.record_id, id);
        }
    }
}
