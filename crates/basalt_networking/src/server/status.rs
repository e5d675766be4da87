//! # Status Provider
//!
//! Supplies the text sent back for a status request. The session treats it
//! as an opaque string; [`JsonStatus`] renders the usual server-list JSON.

use basalt_shared::StatusConfig;
use serde::Serialize;

/// Source of the status-response text.
///
/// Shared by every connection, so implementations must be thread-safe.
pub trait StatusProvider: Send + Sync {
    /// Returns the text for one status response.
    fn status_json(&self) -> String;
}

impl<F> StatusProvider for F
where
    F: Fn() -> String + Send + Sync,
{
    fn status_json(&self) -> String {
        self()
    }
}

#[derive(Serialize)]
struct StatusDocument<'a> {
    version: VersionInfo<'a>,
    players: PlayerInfo,
    description: Description<'a>,
}

#[derive(Serialize)]
struct VersionInfo<'a> {
    name: &'a str,
    protocol: i32,
}

#[derive(Serialize)]
struct PlayerInfo {
    max: u32,
    online: u32,
}

#[derive(Serialize)]
struct Description<'a> {
    text: &'a str,
}

/// Server-list JSON rendered once from [`StatusConfig`].
///
/// No connection ever reaches the play phase, so `players.online` is
/// always zero.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JsonStatus {
    rendered: String,
}

impl JsonStatus {
    /// Renders the document for `config`.
    ///
    /// # Errors
    ///
    /// Propagates serializer failures.
    pub fn from_config(config: &StatusConfig) -> serde_json::Result<Self> {
        let document = StatusDocument {
            version: VersionInfo {
                name: &config.version_name,
                protocol: config.protocol_version,
            },
            players: PlayerInfo {
                max: config.max_players,
                online: 0,
            },
            description: Description { text: &config.motd },
        };
        Ok(Self {
            rendered: serde_json::to_string(&document)?,
        })
    }

    /// Returns the rendered document.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.rendered
    }
}

impl StatusProvider for JsonStatus {
    fn status_json(&self) -> String {
        self.rendered.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_status_document() {
        let status = JsonStatus::from_config(&StatusConfig::default()).unwrap();
        let value: serde_json::Value = serde_json::from_str(status.as_str()).unwrap();

        assert_eq!(value["version"]["name"], "1.21.1");
        assert_eq!(value["version"]["protocol"], 767);
        assert_eq!(value["players"]["max"], 20);
        assert_eq!(value["players"]["online"], 0);
        assert_eq!(value["description"]["text"], "A Basalt Server");
    }

    #[test]
    fn test_json_status_escapes_motd() {
        let config = StatusConfig {
            motd: "say \"hi\"".to_owned(),
            ..StatusConfig::default()
        };
        let status = JsonStatus::from_config(&config).unwrap();
        assert!(status.status_json().contains(r#""text":"say \"hi\"""#));
    }

    #[test]
    fn test_closure_provider() {
        let provider = || "{}".to_owned();
        assert_eq!(provider.status_json(), "{}");
    }
}
