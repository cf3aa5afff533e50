// src/protocol.rs
// Wire envelopes for the game server's event channel. Every frame is a JSON
// object `{ "event": <name>, "data": <payload> }`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shoot::ShootEvent;
use crate::world::WorldState;

/// Messages the client sends to the server.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    Shoot(ShootEvent),
}

/// Messages the server pushes to the client.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    // Authoritative world snapshot, sent every server tick.
    GameUpdate(WorldState),
    // Greeting sent once per connection.
    TestEvent(Greeting),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Greeting {
    #[serde(default)]
    pub data: String,
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed server message: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ClientMessage {
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl ServerMessage {
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::Heading;
    use serde_json::{json, Value};

    #[test]
    fn shoot_is_wrapped_in_event_envelope() {
        let msg = ClientMessage::Shoot(ShootEvent { x: 1024.0, y: 360.0 });
        let value: Value = serde_json::from_str(&msg.encode().unwrap()).unwrap();
        assert_eq!(value, json!({ "event": "shoot", "data": { "x": 1024.0, "y": 360.0 } }));
    }

    #[test]
    fn game_update_decodes() {
        let text = json!({
            "event": "game_update",
            "data": {
                "ducks": [
                    { "id": 1001, "x": 1280, "y": 300, "size": 80, "direction": 1 },
                    { "id": 1002, "x": 0, "y": 200, "size": 80, "direction": -1 }
                ],
                "score": 3
            }
        })
        .to_string();
        let ServerMessage::GameUpdate(state) = ServerMessage::decode(&text).unwrap() else {
            panic!("expected game update");
        };
        assert_eq!(state.score, 3);
        assert_eq!(state.ducks.len(), 2);
        assert_eq!(state.ducks[1].direction, Heading::Reversed);
    }

    #[test]
    fn greeting_decodes() {
        let text = r#"{"event":"test_event","data":{"data":"Server says hello upon connection!"}}"#;
        let msg = ServerMessage::decode(text).unwrap();
        assert!(matches!(msg, ServerMessage::TestEvent(g) if g.data.starts_with("Server says")));
    }

    #[test]
    fn unknown_event_is_an_error() {
        assert!(ServerMessage::decode(r#"{"event":"lobby","data":{}}"#).is_err());
        assert!(ServerMessage::decode("not json").is_err());
    }
}
