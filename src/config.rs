use log::warn;
use std::{env, str::FromStr, time::Duration};

pub const DEFAULT_API_BASE: &str = "https://api.mcsrvstat.us/3";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub user_agent: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub credentials: Option<(String, String)>,
    pub client_id: String,
    pub topic_prefix: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api: ApiConfig,
    pub mqtt: MqttConfig,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let credentials = match (lookup("MQTT_USERNAME"), lookup("MQTT_PASSWORD")) {
            (Some(user), Some(pass)) => Some((user, pass)),
            (Some(user), None) => Some((user, String::new())),
            _ => None,
        };

        Config {
            api: ApiConfig {
                base_url: lookup("MCSTATUS_API_BASE")
                    .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
                timeout: Duration::from_secs(parse_or(
                    &lookup,
                    "MCSTATUS_TIMEOUT_SECS",
                    DEFAULT_TIMEOUT_SECS,
                )),
                user_agent: lookup("MCSTATUS_USER_AGENT").unwrap_or_else(|| {
                    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
                }),
            },
            mqtt: MqttConfig {
                host: lookup("MQTT_HOST").unwrap_or("localhost".to_string()),
                port: parse_or(&lookup, "MQTT_PORT", 1883),
                credentials,
                client_id: lookup("MQTT_CLIENT_ID").unwrap_or("mcstatus".to_string()),
                topic_prefix: lookup("MQTT_TOPIC_PREFIX").unwrap_or("mcstatus".to_string()),
            },
        }
    }
}

/// Parses `key`, falling back to `default` when it is unset, unparseable or zero.
fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + Default + PartialEq + std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => match raw.trim().parse() {
            Ok(value) if value != T::default() => value,
            _ => {
                warn!("{} is not valid ({:?}), using {}", key, raw, default);
                default
            }
        },
        None => default,
    }
}
