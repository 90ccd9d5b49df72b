//! Frames of the newline-delimited JSON protocol between bridge and game server.
//!
//! The browser-facing bridge forwards payloads mostly as-received, so inbound
//! fields are deliberately lenient: identifiers may be absent and resolved
//! from connection state, and a couple of flags arrive with JavaScript-style
//! looseness that the deserializers here normalize.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::state::game::GameWire;

/// Outbound frames pushed from the game server to its clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ServerFrame {
    #[serde(rename = "REGISTER_OK")]
    RegisterOk { username: String },
    #[serde(rename = "GAMES_LIST")]
    GamesList { games: Vec<GameWire> },
    #[serde(rename = "GAME_CREATED")]
    GameCreated { game: GameWire },
    #[serde(rename = "JOINED_GAME")]
    JoinedGame { game: GameWire },
    #[serde(rename = "PLAYER_JOINED")]
    PlayerJoined { pin: String, game: GameWire },
    #[serde(rename = "PLAYER_LEFT")]
    PlayerLeft { pin: String, game: GameWire },
    #[serde(rename = "QUESTION_SUBMITTED", rename_all = "camelCase")]
    QuestionSubmitted {
        pin: String,
        username: String,
        question: String,
        answer_true: bool,
    },
    #[serde(rename = "GAME_STARTED")]
    GameStarted { pin: String, game: GameWire },
    #[serde(rename = "SCORE_UPDATE", rename_all = "camelCase")]
    ScoreUpdate {
        pin: String,
        game: GameWire,
        answered_by: String,
        correct: bool,
        #[serde(skip_serializing_if = "std::ops::Not::not")]
        duplicate: bool,
    },
    #[serde(rename = "NEXT_QUESTION")]
    NextQuestion { pin: String, game: GameWire },
    #[serde(rename = "GAME_ENDED")]
    GameEnded { pin: String, game: GameWire },
    #[serde(rename = "CHAT")]
    Chat {
        pin: String,
        from: String,
        message: String,
    },
    #[serde(rename = "ERROR")]
    Error { message: String },
}

/// REGISTER payload binding a username to the connection.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Register {
    pub username: Option<String>,
}

/// CREATE_GAME payload.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateGame {
    pub username: Option<String>,
    pub theme: Option<String>,
    pub is_public: Option<bool>,
    pub max_players: Option<usize>,
}

/// JOIN_GAME payload.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct JoinGame {
    #[serde(deserialize_with = "lenient_pin")]
    pub pin: Option<String>,
    pub username: Option<String>,
}

/// EXIT_GAME payload; the pin may come from connection state instead.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ExitGame {
    #[serde(deserialize_with = "lenient_pin")]
    pub pin: Option<String>,
    pub username: Option<String>,
}

/// SUBMIT_QUESTION payload; `answerTrue` is coerced with plain truthiness.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubmitQuestion {
    #[serde(deserialize_with = "lenient_pin")]
    pub pin: Option<String>,
    pub question: Option<String>,
    pub answer_true: Value,
    pub username: Option<String>,
}

/// START_GAME payload.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StartGame {
    #[serde(deserialize_with = "lenient_pin")]
    pub pin: Option<String>,
    pub username: Option<String>,
}

/// ANSWER payload; `correct` accepts `true`, `"true"`, `1` and `"1"`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Answer {
    #[serde(deserialize_with = "lenient_pin")]
    pub pin: Option<String>,
    pub correct: Value,
    pub username: Option<String>,
}

/// NEXT_QUESTION payload.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NextQuestion {
    #[serde(deserialize_with = "lenient_pin")]
    pub pin: Option<String>,
    pub username: Option<String>,
}

/// END_GAME payload.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EndGame {
    #[serde(deserialize_with = "lenient_pin")]
    pub pin: Option<String>,
    pub username: Option<String>,
}

/// CHAT payload.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Chat {
    #[serde(deserialize_with = "lenient_pin")]
    pub pin: Option<String>,
    pub message: Option<String>,
    pub username: Option<String>,
}

/// JavaScript-style truthiness for flags the browser sends unnormalized.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|f| f != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Coercion for answer correctness: only `true`, `"true"`, `1` and `"1"`
/// count as correct.
pub fn loose_bool(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64() == Some(1.0),
        Value::String(text) => text == "true" || text == "1",
        _ => false,
    }
}

/// Accept a PIN sent either as a JSON string or as a bare number.
fn lenient_pin<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|value| match value {
        Value::String(text) => Some(text),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn server_frame_carries_type_tag() {
        let frame = ServerFrame::Error {
            message: "Game not found".into(),
        };
        let value = serde_json::to_value(&frame).unwrap();
        assert_eq!(value["type"], "ERROR");
        assert_eq!(value["message"], "Game not found");
    }

    #[test]
    fn question_submitted_uses_camel_case() {
        let frame = serde_json::to_value(ServerFrame::QuestionSubmitted {
            pin: "123456".into(),
            username: "Alice".into(),
            question: "2+2=4".into(),
            answer_true: true,
        })
        .unwrap();
        assert_eq!(frame["type"], "QUESTION_SUBMITTED");
        assert_eq!(frame["answerTrue"], true);
    }

    #[test]
    fn loose_bool_accepts_the_four_spellings() {
        for value in [json!(true), json!("true"), json!(1), json!("1")] {
            assert!(loose_bool(&value), "{value} should count as correct");
        }
        for value in [
            json!(false),
            json!("false"),
            json!(0),
            json!("yes"),
            json!(null),
        ] {
            assert!(!loose_bool(&value), "{value} should not count as correct");
        }
    }

    #[test]
    fn truthiness_follows_javascript() {
        assert!(truthy(&json!("x")));
        assert!(truthy(&json!(2)));
        assert!(truthy(&json!({})));
        assert!(!truthy(&json!("")));
        assert!(!truthy(&json!(0)));
        assert!(!truthy(&json!(null)));
    }

    #[test]
    fn pin_accepts_numbers() {
        let msg: JoinGame = serde_json::from_value(json!({"pin": 123456})).unwrap();
        assert_eq!(msg.pin.as_deref(), Some("123456"));

        let msg: JoinGame = serde_json::from_value(json!({"pin": "654321"})).unwrap();
        assert_eq!(msg.pin.as_deref(), Some("654321"));
    }
}
