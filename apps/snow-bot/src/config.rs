//! Server configuration types and loading.
//!
//! Defines [`ServerConfig`] which is loaded from `~/.snow-bot/config.yml`
//! (or the path in `SNOW_BOT_CONFIG`). Holds the Slack tokens, the
//! ServiceNow instance credentials and the ticket-number patterns the
//! reaction handler scans for.

use std::path::{Path, PathBuf};

use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use snow_core::{RecordKind, SnowConfig};
use tracing::info;

use crate::error::ServerError;

/// Environment variable that overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "SNOW_BOT_CONFIG";

/// Top-level server configuration.
///
/// # Examples
///
/// ```
/// use snow_bot::config::ServerConfig;
///
/// let yaml = r#"
/// slack:
///   app_token: "xapp-1-test"
///   bot_token: "xoxb-test"
///   reaction_emoji: "snow"
/// servicenow:
///   host: "acme.service-now.com"
///   username: "svc-bot"
///   password: "secret"
/// patterns:
///   task: "SCTASK\\d{7}"
///   request_item: "RITM\\d{7}"
///   request: "REQ\\d{7}"
///   incident: "INC\\d{7}"
/// "#;
///
/// let config: ServerConfig = serde_yaml::from_str(yaml).unwrap();
/// assert_eq!(config.servicenow.host, "acme.service-now.com");
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Slack API token configuration.
    pub slack: SlackConfig,

    /// ServiceNow instance and credentials.
    pub servicenow: SnowConfig,

    /// Ticket-number patterns, one per record kind.
    pub patterns: PatternConfig,
}

/// Slack API token configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SlackConfig {
    /// App-level token for Socket Mode (`xapp-...`).
    pub app_token: String,

    /// Bot User OAuth Token for Web API calls (`xoxb-...`).
    pub bot_token: String,

    /// This app's id; events authored by it are ignored.
    #[serde(default)]
    pub app_id: Option<String>,

    /// Reaction name that triggers a ticket lookup, with or without colons.
    pub reaction_emoji: String,
}

impl SlackConfig {
    /// Returns the trigger emoji name without surrounding colons.
    pub fn reaction_name(&self) -> &str {
        self.reaction_emoji.trim().trim_matches(':')
    }
}

/// Regular expressions recognising ticket numbers in message text.
#[derive(Debug, Clone, Deserialize)]
pub struct PatternConfig {
    /// Catalog task numbers, e.g. `SCTASK\d{7}`.
    pub task: String,
    /// Requested item numbers, e.g. `RITM\d{7}`.
    pub request_item: String,
    /// Request numbers, e.g. `REQ\d{7}`.
    pub request: String,
    /// Incident numbers, e.g. `INC\d{7}`.
    pub incident: String,
}

impl PatternConfig {
    /// Compiles the patterns in scan order: task, request item, request,
    /// incident. Matching is case-insensitive and multi-line.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Config` naming the first pattern that does not
    /// compile.
    pub fn compile(&self) -> Result<TicketPatterns, ServerError> {
        let entries = [
            (RecordKind::Task, "task", &self.task),
            (RecordKind::RequestItem, "request_item", &self.request_item),
            (RecordKind::Request, "request", &self.request),
            (RecordKind::Incident, "incident", &self.incident),
        ];
        let mut compiled = Vec::with_capacity(entries.len());
        for (kind, name, pattern) in entries {
            if pattern.trim().is_empty() {
                return Err(ServerError::Config(format!(
                    "patterns.{name} must not be empty"
                )));
            }
            let regex = RegexBuilder::new(pattern)
                .case_insensitive(true)
                .multi_line(true)
                .build()
                .map_err(|e| ServerError::Config(format!("patterns.{name} is invalid: {e}")))?;
            compiled.push((kind, regex));
        }
        Ok(TicketPatterns(compiled))
    }
}

/// Compiled ticket-number patterns.
#[derive(Debug, Clone)]
pub struct TicketPatterns(Vec<(RecordKind, Regex)>);

impl TicketPatterns {
    /// Returns every `(kind, number)` found in `text`, grouped by kind in
    /// scan order and in text order within a kind.
    pub fn find_all<'t>(&self, text: &'t str) -> Vec<(RecordKind, &'t str)> {
        self.0
            .iter()
            .flat_map(|(kind, regex)| regex.find_iter(text).map(move |m| (*kind, m.as_str())))
            .collect()
    }
}

/// Returns the default configuration directory path (`~/.snow-bot/`).
///
/// # Errors
///
/// Returns `ServerError::Config` if the `HOME` environment variable is not set.
pub fn default_config_dir() -> Result<PathBuf, ServerError> {
    let home = std::env::var("HOME")
        .map_err(|_| ServerError::Config("HOME environment variable not set".into()))?;
    Ok(PathBuf::from(home).join(".snow-bot"))
}

/// Returns the configuration file path: `SNOW_BOT_CONFIG` if set, otherwise
/// `~/.snow-bot/config.yml`.
///
/// # Errors
///
/// Returns `ServerError::Config` if neither is available.
pub fn config_path() -> Result<PathBuf, ServerError> {
    match std::env::var_os(CONFIG_PATH_ENV) {
        Some(path) if !path.is_empty() => Ok(PathBuf::from(path)),
        _ => Ok(default_config_dir()?.join("config.yml")),
    }
}

impl ServerConfig {
    /// Loads configuration from the given YAML file path.
    ///
    /// Returns the configuration together with its compiled ticket patterns.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Config` if the file cannot be read, contains
    /// invalid YAML, or fails validation.
    pub fn load(path: &Path) -> Result<(Self, TicketPatterns), ServerError> {
        info!(path = %path.display(), "Loading configuration");
        let content = std::fs::read_to_string(path).map_err(|e| {
            ServerError::Config(format!("Cannot read config at {}: {e}", path.display()))
        })?;
        let config: Self = serde_yaml::from_str(&content).map_err(|e| {
            ServerError::Config(format!("Invalid YAML in config at {}: {e}", path.display()))
        })?;
        let patterns = config.validate()?;
        Ok((config, patterns))
    }

    /// Validates that required fields are present and well-formed, returning
    /// the compiled patterns.
    fn validate(&self) -> Result<TicketPatterns, ServerError> {
        if !self.slack.app_token.starts_with("xapp-") {
            return Err(ServerError::Config(
                "slack.app_token must start with 'xapp-'".into(),
            ));
        }
        if !self.slack.bot_token.starts_with("xoxb-") {
            return Err(ServerError::Config(
                "slack.bot_token must start with 'xoxb-'".into(),
            ));
        }
        if self.slack.reaction_name().is_empty() {
            return Err(ServerError::Config(
                "slack.reaction_emoji must not be empty".into(),
            ));
        }
        if self.servicenow.host.trim().is_empty() {
            return Err(ServerError::Config(
                "servicenow.host must not be empty".into(),
            ));
        }
        if self.servicenow.host.contains("://") {
            return Err(ServerError::Config(
                "servicenow.host must be a bare host name without scheme".into(),
            ));
        }
        if self.servicenow.username.is_empty() {
            return Err(ServerError::Config(
                "servicenow.username must not be empty".into(),
            ));
        }
        self.patterns.compile()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
slack:
  app_token: "xapp-1-A123-456"
  bot_token: "xoxb-789-012"
  app_id: "A0SNOW"
  reaction_emoji: ":snow:"
servicenow:
  host: "acme.service-now.com"
  username: "svc-bot"
  password: "secret"
patterns:
  task: "SCTASK\\d{7}"
  request_item: "RITM\\d{7}"
  request: "REQ\\d{7}"
  incident: "INC\\d{7}"
"#;

    fn valid() -> ServerConfig {
        serde_yaml::from_str(VALID).expect("deserialize")
    }

    #[test]
    fn test_should_deserialize_full_config() {
        let config = valid();
        assert_eq!(config.slack.app_token, "xapp-1-A123-456");
        assert_eq!(config.slack.app_id.as_deref(), Some("A0SNOW"));
        assert_eq!(config.servicenow.username, "svc-bot");
        assert_eq!(config.patterns.incident, "INC\\d{7}");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_should_strip_colons_from_reaction() {
        assert_eq!(valid().slack.reaction_name(), "snow");
    }

    #[test]
    fn test_should_reject_invalid_app_token_prefix() {
        let mut config = valid();
        config.slack.app_token = "wrong-prefix".into();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("xapp-"));
    }

    #[test]
    fn test_should_reject_invalid_bot_token_prefix() {
        let mut config = valid();
        config.slack.bot_token = String::new();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("xoxb-"));
    }

    #[test]
    fn test_should_reject_blank_reaction() {
        let mut config = valid();
        config.slack.reaction_emoji = "::".into();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("reaction_emoji"));
    }

    #[test]
    fn test_should_reject_host_with_scheme() {
        let mut config = valid();
        config.servicenow.host = "https://acme.service-now.com".into();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("servicenow.host"));
    }

    #[test]
    fn test_should_reject_invalid_pattern() {
        let mut config = valid();
        config.patterns.request = "REQ(\\d+".into();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("patterns.request"));
    }

    #[test]
    fn test_should_find_numbers_in_scan_order() {
        let patterns = valid().patterns.compile().expect("compile");
        let text = "see inc0000042 and\nRITM0000001, also SCTASK0000007 / INC0000043";
        let found = patterns.find_all(text);
        assert_eq!(
            found,
            vec![
                (RecordKind::Task, "SCTASK0000007"),
                (RecordKind::RequestItem, "RITM0000001"),
                (RecordKind::Incident, "inc0000042"),
                (RecordKind::Incident, "INC0000043"),
            ]
        );
    }

    #[test]
    fn test_should_find_nothing_in_plain_text() {
        let patterns = valid().patterns.compile().expect("compile");
        assert!(patterns.find_all("nothing to see here").is_empty());
    }

    #[test]
    fn test_should_load_from_file() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("config.yml");
        std::fs::write(&path, VALID).expect("write config");

        let (config, patterns) = ServerConfig::load(&path).expect("load");
        assert_eq!(config.servicenow.host, "acme.service-now.com");
        let found = patterns.find_all("see inc0000042");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0], (RecordKind::Incident, "inc0000042"));
    }

    #[test]
    fn test_should_error_on_missing_file() {
        let result = ServerConfig::load(Path::new("/nonexistent/config.yml"));
        assert!(result.unwrap_err().to_string().contains("Cannot read"));
    }

    #[test]
    fn test_should_error_on_missing_section() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("config.yml");
        std::fs::write(
            &path,
            "slack:\n  app_token: xapp-1\n  bot_token: xoxb-1\n  reaction_emoji: snow\n",
        )
        .expect("write config");

        let err = ServerConfig::load(&path).unwrap_err().to_string();
        assert!(err.contains("Invalid YAML"));
    }
}
