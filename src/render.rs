use crate::{
    controller::QueryState,
    types::{OnlineStatus, ServerStatus},
};
use serde::Serialize;
use std::fmt;

pub const OFFLINE: &str = "Server is offline";
pub const ICON_SIZE: u32 = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Element {
    Line { text: String },
    Icon { src: String, width: u32, height: u32 },
    List { title: String, items: Vec<String> },
}

impl Element {
    fn line(text: impl Into<String>) -> Self {
        Element::Line { text: text.into() }
    }
}

/// Display content of the status panel, top to bottom.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Panel {
    pub elements: Vec<Element>,
}

impl Panel {
    /// Text lines of the panel. A list yields its title followed by its items.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for element in &self.elements {
            match element {
                Element::Line { text } => lines.push(text.clone()),
                Element::Icon { width, height, .. } => {
                    lines.push(format!("Icon: [{}x{} image]", width, height))
                }
                Element::List { title, items } => {
                    lines.push(title.clone());
                    lines.extend(items.iter().map(|item| format!("  {}", item)));
                }
            }
        }
        lines
    }
}

impl fmt::Display for Panel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.lines().join("\n"))
    }
}

pub fn render(state: &QueryState) -> Panel {
    match state {
        QueryState::Idle => Panel::default(),
        QueryState::Failed(e) => Panel {
            elements: vec![Element::line(format!("Could not reach server: {}", e))],
        },
        QueryState::Ready(status) => render_status(status),
    }
}

pub fn render_status(status: &ServerStatus) -> Panel {
    let elements = match status {
        ServerStatus::Offline(_) => vec![Element::line(OFFLINE)],
        ServerStatus::Online(online) => render_online(online),
    };
    Panel { elements }
}

fn render_online(status: &OnlineStatus) -> Vec<Element> {
    let mut out = vec![
        Element::line("Online: Yes"),
        Element::line(format!("IP: {}", status.ip)),
        Element::line(format!("Port: {}", status.port)),
    ];
    if let Some(hostname) = &status.hostname {
        out.push(Element::line(format!("Hostname: {}", hostname.to_uppercase())));
    }
    out.push(Element::line(format!("Version: {}", status.version)));
    if let Some(protocol) = &status.protocol {
        out.push(Element::line(format!(
            "Protocol: {} (v{})",
            protocol.name, protocol.version
        )));
    }
    if let Some(icon) = &status.icon {
        out.push(Element::Icon {
            src: icon.clone(),
            width: ICON_SIZE,
            height: ICON_SIZE,
        });
    }
    if let Some(software) = &status.software {
        out.push(Element::line(format!("Software: {}", software)));
    }
    if let Some(map) = &status.map {
        out.push(Element::line(format!("Map: {}", map.clean)));
    }
    if let Some(gamemode) = &status.gamemode {
        out.push(Element::line(format!("Gamemode: {}", gamemode)));
    }
    out.push(Element::line(format!(
        "Players: {} / {}",
        status.players.online, status.players.max
    )));
    if let Some(players) = &status.players.list {
        out.push(Element::List {
            title: "Player List:".to_string(),
            items: players
                .iter()
                .map(|p| format!("{} (UUID: {})", p.name, p.uuid))
                .collect(),
        });
    }
    for (title, addons) in [("Plugins:", &status.plugins), ("Mods:", &status.mods)] {
        if let Some(addons) = addons {
            out.push(Element::List {
                title: title.to_string(),
                items: addons
                    .iter()
                    .map(|a| format!("{} (v{})", a.name, a.version))
                    .collect(),
            });
        }
    }
    out.push(Element::line("MOTD:"));
    out.push(Element::line(status.motd.clean.join("\n")));
    out
}
