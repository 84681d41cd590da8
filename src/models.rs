use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tokio::sync::oneshot;
use uuid::Uuid;

pub const ANONYMOUS: &str = "Anonymous";
pub const MAX_NAME_LEN: usize = 50;

// Stored wish - field names match what the page script reads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wish {
    pub id: Uuid,
    #[serde(rename = "name")]
    pub display_name: String,
    #[serde(rename = "wish")]
    pub text: String,
    #[serde(rename = "date")]
    pub submitted_at: DateTime<Utc>,
}

// Persisted heart document: {"count": n}
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartCounter {
    pub count: u64,
}

// Full store contents, sent as `init` and served over HTTP
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub greetings: Vec<Wish>,
    pub hearts: u64,
}

// Payload of `new-wish`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct WishSubmission {
    #[serde(default)]
    pub name: Option<String>,
    // missing or null text is an empty wish, rejected by the filter
    #[serde(default, deserialize_with = "null_as_empty")]
    pub wish: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl WishSubmission {
    // Trimmed display name cut to MAX_NAME_LEN chars, "Anonymous" when missing or blank
    pub fn display_name(&self) -> String {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.chars().take(MAX_NAME_LEN).collect(),
            _ => ANONYMOUS.to_string(),
        }
    }
}

/// Commands a client may send over the channel.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientCommand {
    NewWish(WishSubmission),
    AddHeart,
}

/// Events the server pushes to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    Init(Snapshot),
    UpdateWishes(Wish),
    WishError(String),
    UpdateHearts(u64),
    HeartError(String),
}

/// Result of dispatching one command: at most one event for everybody,
/// at most one event for the sender alone.
#[derive(Debug, Default, PartialEq)]
pub struct Outcome {
    pub broadcast: Option<ServerEvent>,
    pub reply: Option<ServerEvent>,
}

impl Outcome {
    pub fn broadcast(event: ServerEvent) -> Self {
        Self {
            broadcast: Some(event),
            reply: None,
        }
    }

    pub fn reply(event: ServerEvent) -> Self {
        Self {
            broadcast: None,
            reply: Some(event),
        }
    }
}

// Work item for the gateway worker - one queue for every mutation and read
pub enum Job {
    Join {
        session: crate::hub::SessionHandle,
    },
    Command {
        session_id: Uuid,
        identity: String,
        command: ClientCommand,
    },
    Leave {
        session_id: Uuid,
    },
    Snapshot {
        response_tx: oneshot::Sender<Snapshot>,
    },
    Shutdown {
        done_tx: oneshot::Sender<()>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_wish_command_parses_with_and_without_name() {
        let cmd: ClientCommand = serde_json::from_value(json!({
            "event": "new-wish",
            "data": { "name": "Ana", "wish": "Happy birthday!" }
        }))
        .unwrap();
        assert_eq!(
            cmd,
            ClientCommand::NewWish(WishSubmission {
                name: Some("Ana".into()),
                wish: "Happy birthday!".into(),
            })
        );

        let cmd: ClientCommand = serde_json::from_value(json!({
            "event": "new-wish",
            "data": { "wish": "hi" }
        }))
        .unwrap();
        match cmd {
            ClientCommand::NewWish(sub) => assert_eq!(sub.display_name(), ANONYMOUS),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn missing_or_null_wish_text_parses_as_empty() {
        for data in [json!({ "name": "Ana" }), json!({ "name": "Ana", "wish": null })] {
            let cmd: ClientCommand =
                serde_json::from_value(json!({ "event": "new-wish", "data": data })).unwrap();
            match cmd {
                ClientCommand::NewWish(sub) => assert_eq!(sub.wish, ""),
                other => panic!("unexpected command {other:?}"),
            }
        }
    }

    #[test]
    fn long_names_are_cut() {
        let sub = WishSubmission {
            name: Some("я".repeat(10_000)),
            wish: "x".into(),
        };
        assert_eq!(sub.display_name().chars().count(), MAX_NAME_LEN);
    }

    #[test]
    fn add_heart_needs_no_payload() {
        let cmd: ClientCommand = serde_json::from_str(r#"{"event":"add-heart"}"#).unwrap();
        assert_eq!(cmd, ClientCommand::AddHeart);
    }

    #[test]
    fn unknown_event_is_rejected() {
        let res = serde_json::from_str::<ClientCommand>(r#"{"event":"drop-table"}"#);
        assert!(res.is_err());
    }

    #[test]
    fn blank_name_becomes_anonymous() {
        let sub = WishSubmission {
            name: Some("   ".into()),
            wish: "x".into(),
        };
        assert_eq!(sub.display_name(), ANONYMOUS);

        let sub = WishSubmission {
            name: Some("  Ivo ".into()),
            wish: "x".into(),
        };
        assert_eq!(sub.display_name(), "Ivo");
    }

    #[test]
    fn server_events_use_page_field_names() {
        let wish = Wish {
            id: Uuid::nil(),
            display_name: "Ana".into(),
            text: "Many happy returns".into(),
            submitted_at: "2024-05-01T10:00:00Z".parse().unwrap(),
        };
        let value = serde_json::to_value(ServerEvent::UpdateWishes(wish)).unwrap();
        assert_eq!(value["event"], "update-wishes");
        assert_eq!(value["data"]["name"], "Ana");
        assert_eq!(value["data"]["wish"], "Many happy returns");
        assert_eq!(value["data"]["date"], "2024-05-01T10:00:00Z");

        let value = serde_json::to_value(ServerEvent::UpdateHearts(7)).unwrap();
        assert_eq!(value, json!({ "event": "update-hearts", "data": 7 }));

        let init = ServerEvent::Init(Snapshot {
            greetings: vec![],
            hearts: 3,
        });
        let value = serde_json::to_value(init).unwrap();
        assert_eq!(
            value,
            json!({ "event": "init", "data": { "greetings": [], "hearts": 3 } })
        );
    }
}
