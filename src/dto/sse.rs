use serde::Serialize;
use serde_json::json;

/// Dispatched payload carried across the per-user SSE channels.
#[derive(Clone, Debug)]
pub struct ServerEvent {
    /// Optional event type name for the SSE message.
    pub event: Option<String>,
    /// The serialized JSON data for the event.
    pub data: String,
}

impl ServerEvent {
    /// Wrap an already-serialized frame observed on a bridge session.
    pub fn raw(data: impl Into<String>) -> Self {
        Self {
            event: None,
            data: data.into(),
        }
    }

    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }

    /// Internal bridge-side error surfaced to the browser alongside the
    /// frames relayed from the game server.
    pub fn error_frame(message: &str) -> Self {
        Self::raw(json!({"type": "ERROR", "message": message}).to_string())
    }
}
