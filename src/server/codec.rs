//! Line framing for the game protocol.
//!
//! Frames are LF-separated UTF-8 JSON. Browsers occasionally probe the TCP
//! port with plain HTTP; those connections are cut immediately instead of
//! being fed garbage replies.

use serde_json::Value;
use tracing::debug;

/// HTTP request-line prefixes that get a connection terminated.
const HTTP_PREFIXES: [&str; 3] = ["GET ", "HEAD ", "POST "];

/// Classification of one received line.
#[derive(Debug, PartialEq, Eq)]
pub enum Frame {
    /// A decoded JSON payload.
    Json(Value),
    /// Blank line, non-JSON noise, or an undecodable payload.
    Ignore,
    /// The peer is speaking HTTP; the connection must be closed.
    HttpProbe,
}

/// Classify a raw line read off the socket.
pub fn classify(line: &str) -> Frame {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Frame::Ignore;
    }
    if HTTP_PREFIXES
        .iter()
        .any(|prefix| trimmed.starts_with(prefix))
    {
        return Frame::HttpProbe;
    }
    if !trimmed.starts_with('{') && !trimmed.starts_with('[') {
        return Frame::Ignore;
    }
    match serde_json::from_str(trimmed) {
        Ok(value) => Frame::Json(value),
        Err(err) => {
            debug!(error = %err, "dropping undecodable frame");
            Frame::Ignore
        }
    }
}

/// Serialize a payload into its wire form, LF included.
pub fn encode<T: serde::Serialize>(payload: &T) -> serde_json::Result<String> {
    let mut line = serde_json::to_string(payload)?;
    line.push('\n');
    Ok(line)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn json_objects_and_arrays_decode() {
        assert_eq!(
            classify(r#"{"type":"LIST_GAMES"}"#),
            Frame::Json(json!({"type": "LIST_GAMES"}))
        );
        assert_eq!(classify("[1,2]"), Frame::Json(json!([1, 2])));
    }

    #[test]
    fn whitespace_is_trimmed_before_classification() {
        assert_eq!(
            classify("  {\"type\":\"CHAT\"}\r"),
            Frame::Json(json!({"type": "CHAT"}))
        );
    }

    #[test]
    fn blank_and_noise_lines_are_ignored() {
        assert_eq!(classify(""), Frame::Ignore);
        assert_eq!(classify("   "), Frame::Ignore);
        assert_eq!(classify("hello there"), Frame::Ignore);
        assert_eq!(classify("{not json"), Frame::Ignore);
    }

    #[test]
    fn http_request_lines_kill_the_connection() {
        assert_eq!(classify("GET / HTTP/1.1"), Frame::HttpProbe);
        assert_eq!(classify("HEAD /health HTTP/1.1"), Frame::HttpProbe);
        assert_eq!(classify("POST /api HTTP/1.1"), Frame::HttpProbe);
    }

    #[test]
    fn encode_appends_a_newline() {
        let line = encode(&json!({"type": "ERROR"})).unwrap();
        assert!(line.ends_with('\n'));
        assert!(!line[..line.len() - 1].contains('\n'));
    }
}
