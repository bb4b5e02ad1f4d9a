use crate::{
    config::MqttConfig,
    controller::{QueryController, QueryState},
    render::{render, Panel},
};

use rumqttc::{AsyncClient, Event, EventLoop, Incoming, MqttOptions, QoS};
use serde::Serialize;
use std::{sync::Arc, time::Duration};
use tokio::{sync::watch, task::JoinHandle};

use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use log::{debug, error, info};

const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Topic names of one panel under the configured prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    pub query: String,
    pub submit: String,
    pub close: String,
    pub panel: String,
    pub panel_json: String,
    pub active: String,
}

impl Topics {
    pub fn new(prefix: &str) -> Self {
        let prefix = prefix.trim_end_matches('/');
        Topics {
            query: format!("{}/query", prefix),
            submit: format!("{}/submit", prefix),
            close: format!("{}/close", prefix),
            panel: format!("{}/panel", prefix),
            panel_json: format!("{}/panel/json", prefix),
            active: format!("{}/active", prefix),
        }
    }

    fn inputs(&self) -> [&str; 3] {
        [&self.query, &self.submit, &self.close]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SetQuery(String),
    /// Submit, first replacing the query when the payload is non-empty.
    Submit(Option<String>),
    Close,
}

impl Command {
    pub fn parse(topics: &Topics, topic: &str, payload: &[u8]) -> Option<Command> {
        let payload = match std::str::from_utf8(payload) {
            Ok(s) => s,
            Err(e) => {
                error!("Failed to parse payload on {}: {}", topic, e);
                return None;
            }
        };
        if topic == topics.query {
            Some(Command::SetQuery(payload.to_string()))
        } else if topic == topics.submit {
            Some(Command::Submit(
                (!payload.is_empty()).then(|| payload.to_string()),
            ))
        } else if topic == topics.close {
            Some(Command::Close)
        } else {
            None
        }
    }

    /// Runs the command; a submit hands back the spawned fetch.
    pub fn apply(self, controller: &QueryController) -> Option<JoinHandle<()>> {
        match self {
            Command::SetQuery(text) => {
                controller.set_query(text);
                None
            }
            Command::Submit(text) => {
                if let Some(text) = text {
                    controller.set_query(text);
                }
                Some(controller.submit())
            }
            Command::Close => {
                controller.close();
                None
            }
        }
    }
}

#[derive(Serialize)]
struct PanelMessage<'a> {
    updated: String,
    #[serde(flatten)]
    panel: &'a Panel,
}

pub fn setup(
    config: &MqttConfig,
    controller: Arc<QueryController>,
) -> (Arc<AsyncClient>, JoinHandle<()>) {
    let topics = Topics::new(&config.topic_prefix);
    let mut mqtt_options = MqttOptions::new(&config.client_id, &config.host, config.port);
    debug!("MQTT Server: {:?}", mqtt_options.broker_address());
    mqtt_options.set_keep_alive(Duration::from_secs(5));
    if let Some((username, password)) = &config.credentials {
        mqtt_options.set_credentials(username, password);
    }
    mqtt_options.set_last_will(rumqttc::LastWill::new(
        &topics.active,
        "down",
        QoS::AtLeastOnce,
        true,
    ));
    let (mqtt, eventloop) = AsyncClient::new(mqtt_options, 100);
    let mqtt_rc = Arc::new(mqtt);
    let evloop = tokio::spawn(main_loop(eventloop, mqtt_rc.clone(), topics, controller));

    (mqtt_rc, evloop)
}

async fn main_loop(
    mut ev: EventLoop,
    mqtt: Arc<AsyncClient>,
    topics: Topics,
    controller: Arc<QueryController>,
) {
    loop {
        match ev.poll().await {
            Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                debug!("MQTT Connected");
                post_to_mqtt(&mqtt, &topics.active, "up").await;
                for topic in topics.inputs() {
                    match mqtt.try_subscribe(topic, QoS::AtLeastOnce) {
                        Ok(_) => info!("Subscribed to {}", topic),
                        Err(e) => error!("Failed to subscribe to {}: {}", topic, e),
                    }
                }
            }
            Ok(Event::Incoming(Incoming::Publish(p))) => {
                debug!("publish on {}: {:?}", p.topic, p.payload);
                if let Some(command) = Command::parse(&topics, &p.topic, &p.payload) {
                    command.apply(&controller);
                }
            }
            Ok(_) => (),
            Err(e) => {
                error!("Connection error: {}", e);
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
}

/// Republishes the rendered panel each time the controller's state changes.
pub async fn publish_panel(
    mqtt: Arc<AsyncClient>,
    topics: Topics,
    mut state: watch::Receiver<QueryState>,
) {
    loop {
        let panel = render(&state.borrow_and_update());
        post_to_mqtt(&mqtt, &topics.panel, panel.to_string()).await;

        let message = PanelMessage {
            updated: timestamp(),
            panel: &panel,
        };
        match serde_json::to_string(&message) {
            Ok(json) => post_to_mqtt(&mqtt, &topics.panel_json, json).await,
            Err(e) => error!("Failed to serialize panel: {}", e),
        }

        if state.changed().await.is_err() {
            debug!("Panel state closed, stopping publisher");
            break;
        }
    }
}

fn timestamp() -> String {
    OffsetDateTime::now_local()
        .unwrap_or_else(|_| OffsetDateTime::now_utc())
        .format(&Rfc3339)
        .unwrap_or_default()
}

pub async fn post_to_mqtt(client: &AsyncClient, topic: &str, data: impl Into<Vec<u8>>) {
    let data = data.into();
    match client.try_publish(topic, QoS::AtLeastOnce, true, data.clone()) {
        Ok(_) => (),
        Err(e) => {
            error!("Failed to publish to MQTT: {}", e);
            debug!(
                "was attempting to MQTT: {} -> {}",
                topic,
                String::from_utf8_lossy(&data)
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::minecraft::tests::{client_for, serve_stub};
    use crate::types::ServerStatus;

    fn topics() -> Topics {
        Topics::new("home/mc/")
    }

    #[test]
    fn topics_hang_off_the_prefix() {
        let topics = topics();
        assert_eq!(topics.query, "home/mc/query");
        assert_eq!(topics.submit, "home/mc/submit");
        assert_eq!(topics.close, "home/mc/close");
        assert_eq!(topics.panel, "home/mc/panel");
        assert_eq!(topics.panel_json, "home/mc/panel/json");
        assert_eq!(topics.active, "home/mc/active");
    }

    #[test]
    fn parses_input_topics() {
        let topics = topics();
        assert_eq!(
            Command::parse(&topics, "home/mc/query", b" mc.hypixel.net"),
            Some(Command::SetQuery(" mc.hypixel.net".to_string()))
        );
        assert_eq!(
            Command::parse(&topics, "home/mc/submit", b""),
            Some(Command::Submit(None))
        );
        assert_eq!(
            Command::parse(&topics, "home/mc/submit", b"mc.hypixel.net"),
            Some(Command::Submit(Some("mc.hypixel.net".to_string())))
        );
        assert_eq!(
            Command::parse(&topics, "home/mc/close", b"anything"),
            Some(Command::Close)
        );
    }

    #[test]
    fn ignores_own_output_and_bad_payloads() {
        let topics = topics();
        assert_eq!(Command::parse(&topics, "home/mc/panel", b"Online: Yes"), None);
        assert_eq!(Command::parse(&topics, "home/mc/query", &[0xff, 0xfe]), None);
    }

    #[test]
    fn panel_message_carries_timestamp_and_elements() {
        let panel = Panel {
            elements: vec![crate::render::Element::Line {
                text: "Server is offline".to_string(),
            }],
        };
        let json = serde_json::to_value(PanelMessage {
            updated: "2024-01-01T00:00:00Z".to_string(),
            panel: &panel,
        })
        .unwrap();
        assert_eq!(json["updated"], "2024-01-01T00:00:00Z");
        assert_eq!(json["elements"][0]["text"], "Server is offline");
    }

    #[tokio::test]
    async fn commands_drive_the_controller() {
        let addr = serve_stub().await;
        let controller = QueryController::new(client_for(addr, Duration::from_secs(2)));

        let fetch = Command::Submit(Some("online".to_string())).apply(&controller);
        fetch.unwrap().await.unwrap();
        assert_eq!(controller.query(), "online");
        match controller.state() {
            QueryState::Ready(status) => assert!(status.is_online()),
            other => panic!("unexpected state {:?}", other),
        }

        assert!(Command::SetQuery("offline".to_string())
            .apply(&controller)
            .is_none());
        let fetch = Command::Submit(None).apply(&controller);
        fetch.unwrap().await.unwrap();
        assert_eq!(controller.query(), "offline");
        match controller.state() {
            QueryState::Ready(status) => {
                assert!(matches!(status.as_ref(), ServerStatus::Offline(_)))
            }
            other => panic!("unexpected state {:?}", other),
        }

        assert!(Command::Close.apply(&controller).is_none());
        assert_eq!(controller.state(), QueryState::Idle);
        assert_eq!(controller.query(), "");
    }
}
