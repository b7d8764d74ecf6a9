//! Offer / answer / candidate messages.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::MessageError;
use crate::transport::Payload;

/// A signaling message, tagged by `type` on the wire.
///
/// ```json
/// {"type":"offer","connectionId":"c1","sdp":"v=0..."}
/// {"type":"candidate","connectionId":"c1","candidate":"candidate:...","sdpMid":"0","sdpMLineIndex":0}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SignalingMessage {
    /// Session description offer.
    Offer {
        /// Logical connection the offer belongs to.
        #[serde(rename = "connectionId")]
        connection_id: String,
        /// SDP body.
        sdp: String,
    },
    /// Session description answer.
    Answer {
        /// Logical connection the answer belongs to.
        #[serde(rename = "connectionId")]
        connection_id: String,
        /// SDP body.
        sdp: String,
    },
    /// Trickled ICE candidate.
    Candidate {
        /// Logical connection the candidate belongs to.
        #[serde(rename = "connectionId")]
        connection_id: String,
        /// Candidate line.
        candidate: String,
        /// Media stream identification tag.
        #[serde(rename = "sdpMid")]
        sdp_mid: String,
        /// Index of the m-line the candidate applies to.
        #[serde(rename = "sdpMLineIndex")]
        sdp_m_line_index: u32,
    },
}

impl SignalingMessage {
    /// Build an offer.
    pub fn offer(connection_id: impl Into<String>, sdp: impl Into<String>) -> Self {
        SignalingMessage::Offer {
            connection_id: connection_id.into(),
            sdp: sdp.into(),
        }
    }

    /// Build an answer.
    pub fn answer(connection_id: impl Into<String>, sdp: impl Into<String>) -> Self {
        SignalingMessage::Answer {
            connection_id: connection_id.into(),
            sdp: sdp.into(),
        }
    }

    /// Build a candidate.
    pub fn candidate(
        connection_id: impl Into<String>,
        candidate: impl Into<String>,
        sdp_mid: impl Into<String>,
        sdp_m_line_index: u32,
    ) -> Self {
        SignalingMessage::Candidate {
            connection_id: connection_id.into(),
            candidate: candidate.into(),
            sdp_mid: sdp_mid.into(),
            sdp_m_line_index,
        }
    }

    /// Wire discriminator.
    pub fn kind(&self) -> &'static str {
        match self {
            SignalingMessage::Offer { .. } => "offer",
            SignalingMessage::Answer { .. } => "answer",
            SignalingMessage::Candidate { .. } => "candidate",
        }
    }

    /// Connection this message belongs to.
    pub fn connection_id(&self) -> &str {
        match self {
            SignalingMessage::Offer { connection_id, .. }
            | SignalingMessage::Answer { connection_id, .. }
            | SignalingMessage::Candidate { connection_id, .. } => connection_id,
        }
    }

    /// Encode as JSON text.
    pub fn to_json(&self) -> Result<String, MessageError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode from a received frame.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, MessageError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Encode as a text payload ready for `send`.
    pub fn to_payload(&self) -> Result<Payload, MessageError> {
        self.to_json().map(Payload::Text)
    }
}

impl FromStr for SignalingMessage {
    type Err = MessageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_slice(s.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    #[test]
    fn test_offer_wire_shape() {
        let msg = SignalingMessage::offer("c1", "v=0");
        let value: Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(value, json!({"type": "offer", "connectionId": "c1", "sdp": "v=0"}));
    }

    #[test]
    fn test_candidate_from_browser() {
        let raw = br#"{
            "type": "candidate",
            "connectionId": "abc",
            "candidate": "candidate:1 1 udp 2122260223 10.0.0.2 54321 typ host",
            "sdpMid": "0",
            "sdpMLineIndex": 1
        }"#;

        let msg = SignalingMessage::from_slice(raw).unwrap();
        assert_eq!(msg.kind(), "candidate");
        assert_eq!(msg.connection_id(), "abc");
        assert_eq!(
            msg,
            SignalingMessage::candidate(
                "abc",
                "candidate:1 1 udp 2122260223 10.0.0.2 54321 typ host",
                "0",
                1
            )
        );
    }

    #[test]
    fn test_unknown_type_rejected() {
        let err = "{\"type\":\"bye\",\"connectionId\":\"x\"}"
            .parse::<SignalingMessage>()
            .unwrap_err();
        assert!(matches!(err, MessageError::Json(_)));
    }

    #[test]
    fn test_payload_is_text() {
        let payload = SignalingMessage::answer("c2", "v=0").to_payload().unwrap();
        match payload {
            Payload::Text(text) => assert!(text.contains("\"type\":\"answer\"")),
            Payload::Binary(_) => panic!("expected text payload"),
        }
    }
}
