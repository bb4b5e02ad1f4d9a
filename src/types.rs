use crate::error::QueryError;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Player {
    pub name: String,
    pub uuid: String,
}

/// A plugin or mod reported by the server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Addon {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Protocol {
    pub version: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MapName {
    pub raw: String,
    pub clean: String,
    pub html: String,
}

/// Message of the day. The three renderings are parallel, one entry per line.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Motd {
    pub raw: Vec<String>,
    pub clean: Vec<String>,
    pub html: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Players {
    pub online: u32,
    pub max: u32,
    pub list: Option<Vec<Player>>,
}

/// Everything the status API reports for a server that answered.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OnlineStatus {
    pub ip: String,
    pub port: u16,
    pub hostname: Option<String>,
    pub version: String,
    pub protocol: Option<Protocol>,
    pub icon: Option<String>,
    pub software: Option<String>,
    pub map: Option<MapName>,
    pub gamemode: Option<String>,
    pub players: Players,
    pub plugins: Option<Vec<Addon>>,
    pub mods: Option<Vec<Addon>>,
    pub motd: Motd,
}

/// What the API echoes back for a server that did not answer. Read
/// leniently: a field of the wrong shape is dropped, never an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OfflineStatus {
    pub ip: Option<String>,
    pub port: Option<u16>,
    pub hostname: Option<String>,
}

impl OfflineStatus {
    fn from_value(value: &Value) -> Self {
        let text = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_string);
        OfflineStatus {
            ip: text("ip"),
            port: value
                .get("port")
                .and_then(Value::as_u64)
                .and_then(|port| u16::try_from(port).ok()),
            hostname: text("hostname"),
        }
    }
}

/// A parsed status response. Nothing but the address is kept for an
/// offline server, since the API gives no trustworthy details for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerStatus {
    Online(OnlineStatus),
    Offline(OfflineStatus),
}

impl ServerStatus {
    pub fn is_online(&self) -> bool {
        matches!(self, ServerStatus::Online(_))
    }

    /// Decodes a response body, keyed on its `online` flag.
    pub fn from_json(body: &str) -> Result<Self, QueryError> {
        let value: Value =
            serde_json::from_str(body).map_err(|e| QueryError::Malformed(e.to_string()))?;
        let online = match value.get("online") {
            Some(Value::Bool(online)) => *online,
            Some(_) => {
                return Err(QueryError::Malformed(
                    "`online` is not a boolean".to_string(),
                ))
            }
            None if value.is_object() => {
                return Err(QueryError::Malformed("missing `online` field".to_string()))
            }
            None => {
                return Err(QueryError::Malformed(
                    "expected a JSON object".to_string(),
                ))
            }
        };

        if online {
            OnlineStatus::deserialize(value)
                .map(ServerStatus::Online)
                .map_err(|e| QueryError::Incomplete(e.to_string()))
        } else {
            Ok(ServerStatus::Offline(OfflineStatus::from_value(&value)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HYPIXEL: &str = r#"{
        "online": true,
        "ip": "209.222.115.47",
        "port": 25565,
        "hostname": "mc.hypixel.net",
        "debug": {"ping": true, "query": false},
        "version": "Requires MC 1.8 / 1.20",
        "protocol": {"version": 47, "name": "1.8.9"},
        "players": {"online": 25556, "max": 200000},
        "motd": {
            "raw": ["§aHypixel Network", "§cSHEEP WARS"],
            "clean": ["Hypixel Network", "SHEEP WARS"],
            "html": ["<span>Hypixel Network</span>", "<span>SHEEP WARS</span>"]
        },
        "eula_blocked": false
    }"#;

    #[test]
    fn decodes_online_record_and_ignores_unknown_fields() {
        let status = ServerStatus::from_json(HYPIXEL).unwrap();
        let ServerStatus::Online(online) = status else {
            panic!("expected an online record");
        };
        assert_eq!(online.ip, "209.222.115.47");
        assert_eq!(online.port, 25565);
        assert_eq!(online.hostname.as_deref(), Some("mc.hypixel.net"));
        assert_eq!(
            online.protocol,
            Some(Protocol {
                version: 47,
                name: "1.8.9".to_string()
            })
        );
        assert_eq!(online.players.online, 25556);
        assert_eq!(online.players.list, None);
        assert_eq!(online.motd.clean, vec!["Hypixel Network", "SHEEP WARS"]);
        assert!(online.icon.is_none());
        assert!(online.plugins.is_none());
    }

    #[test]
    fn offline_body_without_details_decodes() {
        let body = r#"{"online": false, "ip": "127.0.0.1", "port": 25565,
                       "hostname": "down.example.net", "debug": {}}"#;
        let status = ServerStatus::from_json(body).unwrap();
        assert!(!status.is_online());
        assert_eq!(
            status,
            ServerStatus::Offline(OfflineStatus {
                ip: Some("127.0.0.1".to_string()),
                port: Some(25565),
                hostname: Some("down.example.net".to_string()),
            })
        );
    }

    #[test]
    fn offline_flag_wins_over_populated_fields() {
        let body = HYPIXEL.replacen("\"online\": true", "\"online\": false", 1);
        let status = ServerStatus::from_json(&body).unwrap();
        assert!(matches!(status, ServerStatus::Offline(_)));
    }

    #[test]
    fn offline_body_with_odd_fields_is_still_offline() {
        let body = r#"{"online": false, "ip": 5, "port": 70000, "hostname": "down.example.net"}"#;
        assert_eq!(
            ServerStatus::from_json(body).unwrap(),
            ServerStatus::Offline(OfflineStatus {
                ip: None,
                port: None,
                hostname: Some("down.example.net".to_string()),
            })
        );
    }

    #[test]
    fn non_json_is_malformed() {
        let err = ServerStatus::from_json("<html>502 Bad Gateway</html>").unwrap_err();
        assert!(matches!(err, QueryError::Malformed(_)));
    }

    #[test]
    fn missing_or_mistyped_online_is_malformed() {
        assert!(matches!(
            ServerStatus::from_json(r#"{"ip": "x"}"#),
            Err(QueryError::Malformed(_))
        ));
        assert!(matches!(
            ServerStatus::from_json(r#"{"online": "yes"}"#),
            Err(QueryError::Malformed(_))
        ));
        assert!(matches!(
            ServerStatus::from_json("[1, 2, 3]"),
            Err(QueryError::Malformed(_))
        ));
    }

    #[test]
    fn online_record_missing_players_is_incomplete() {
        let body = r#"{"online": true, "ip": "x", "port": 1, "version": "v",
                       "motd": {"raw": [], "clean": [], "html": []}}"#;
        let err = ServerStatus::from_json(body).unwrap_err();
        match err {
            QueryError::Incomplete(msg) => assert!(msg.contains("players"), "{}", msg),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
