//! Block Kit builders for Slack responses.
//!
//! Pure functions that build `serde_json::Value` blocks. The ticket card is
//! shared by link unfurls and threaded replies.

use snow_core::CanonicalTicket;

/// Builds the summary card for one ticket.
///
/// Layout: number as header, description, then Created/Priority,
/// Last updated by/Last updated and Created by/State field pairs, and a
/// link back to ServiceNow.
pub fn ticket_card(ticket: &CanonicalTicket) -> Vec<serde_json::Value> {
    vec![
        header(&ticket.task_effective_number),
        section(&format!("*Description*:\n{}", ticket.short_description)),
        fields(&[
            ("Created:", &ticket.sys_created_on),
            ("Priority:", &ticket.priority),
        ]),
        fields(&[
            ("Last updated by:", &ticket.sys_updated_by),
            ("Last updated:", &ticket.sys_updated_on),
        ]),
        fields(&[
            ("Created by:", &ticket.sys_created_by),
            ("State:", &ticket.state),
        ]),
        section(&format!("<{}|View item>", ticket.target_link)),
    ]
}

/// Wraps a ticket card for one entry of a `chat.unfurl` map.
pub fn unfurl(ticket: &CanonicalTicket) -> serde_json::Value {
    serde_json::json!({ "blocks": ticket_card(ticket) })
}

/// Builds the App Home view.
pub fn home_view(version: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "home",
        "blocks": [
            header(&format!(
                "Hi Im your friendly SNOW Bot :robot_face:, version: {version}"
            )),
            section("*Welcome home :house:*"),
        ]
    })
}

// ---------------------------------------------------------------------------
// Block Kit primitives
// ---------------------------------------------------------------------------

fn header(text: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "header",
        "text": { "type": "plain_text", "text": text, "emoji": true }
    })
}

fn section(text: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "section",
        "text": { "type": "mrkdwn", "text": text }
    })
}

fn fields(pairs: &[(&str, &String)]) -> serde_json::Value {
    let fields: Vec<serde_json::Value> = pairs
        .iter()
        .map(|(label, value)| {
            serde_json::json!({ "type": "mrkdwn", "text": format!("*{label}*\n{value}") })
        })
        .collect();
    serde_json::json!({ "type": "section", "fields": fields })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticket() -> CanonicalTicket {
        CanonicalTicket {
            task_effective_number: "INC0010001".into(),
            short_description: "VPN down".into(),
            sys_created_on: "2024-03-01 10:00:00".into(),
            priority: "1".into(),
            sys_updated_by: "jdoe".into(),
            approval: "not requested".into(),
            state: "In Progress".into(),
            sys_created_by: "asmith".into(),
            target_link:
                "https://acme.service-now.com/now/nav/ui/classic/params/target/incident.do?sys_id=x"
                    .into(),
            sys_updated_on: "2024-03-02 11:30:00".into(),
        }
    }

    #[test]
    fn test_should_build_card_with_header_and_link() {
        let blocks = ticket_card(&ticket());
        assert_eq!(blocks.len(), 6);
        assert_eq!(blocks[0]["type"], "header");
        assert_eq!(blocks[0]["text"]["text"], "INC0010001");
        assert_eq!(blocks[0]["text"]["emoji"], true);
        assert_eq!(blocks[1]["text"]["text"], "*Description*:\nVPN down");
        assert_eq!(
            blocks[5]["text"]["text"],
            "<https://acme.service-now.com/now/nav/ui/classic/params/target/incident.do?sys_id=x|View item>"
        );
    }

    #[test]
    fn test_should_pair_fields_in_card_order() {
        let blocks = ticket_card(&ticket());
        assert_eq!(blocks[2]["fields"][0]["text"], "*Created:*\n2024-03-01 10:00:00");
        assert_eq!(blocks[2]["fields"][1]["text"], "*Priority:*\n1");
        assert_eq!(blocks[3]["fields"][0]["text"], "*Last updated by:*\njdoe");
        assert_eq!(blocks[3]["fields"][1]["text"], "*Last updated:*\n2024-03-02 11:30:00");
        assert_eq!(blocks[4]["fields"][0]["text"], "*Created by:*\nasmith");
        assert_eq!(blocks[4]["fields"][1]["text"], "*State:*\nIn Progress");
    }

    #[test]
    fn test_should_wrap_card_for_unfurl() {
        let value = unfurl(&ticket());
        assert_eq!(value["blocks"].as_array().map(Vec::len), Some(6));
    }

    #[test]
    fn test_should_build_home_view_with_version() {
        let view = home_view("v0.11");
        assert_eq!(view["type"], "home");
        let greeting = view["blocks"][0]["text"]["text"].as_str().expect("text");
        assert!(greeting.ends_with("version: v0.11"));
        assert_eq!(view["blocks"][1]["text"]["text"], "*Welcome home :house:*");
    }
}
